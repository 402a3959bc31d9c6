//! 调度参数配置
//!
//! Leitner 盒式调度的可调常量。这些值不是固定契约，
//! 宿主应用可以持久化并覆盖它们，但必须通过 [`SchedulerConfig::validate`]。

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("调度参数不合法: {0}")]
    Invalid(String),
}

/// 调度器配置
///
/// 间隔函数: `interval(p) = min(base_interval * growth^(p-1), max_interval)`，
/// 单位为小时，对 `p` 单调非减。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// 第 1 盒的复习间隔（小时）
    pub base_interval_hours: i64,
    /// 每升一盒间隔的增长倍率
    pub growth: f64,
    /// 间隔上限（小时）
    pub max_interval_hours: i64,
    /// 最高盒号
    pub max_box: i32,
    /// 达到该盒号即视为已掌握
    pub learned_threshold: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            base_interval_hours: 24,
            growth: 2.0,
            max_interval_hours: 24 * 30,
            max_box: 7,
            learned_threshold: 5,
        }
    }
}

impl SchedulerConfig {
    /// 校验配置约束
    ///
    /// 要求: `base_interval > 0`，`growth >= 1`，`max_interval >= base_interval`，
    /// `max_box >= learned_threshold >= 2`。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_interval_hours <= 0 {
            return Err(ConfigError::Invalid(format!(
                "base_interval_hours 必须为正数: {}",
                self.base_interval_hours
            )));
        }
        if self.growth < 1.0 || !self.growth.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "growth 必须为 >= 1 的有限值: {}",
                self.growth
            )));
        }
        if self.max_interval_hours < self.base_interval_hours {
            return Err(ConfigError::Invalid(format!(
                "max_interval_hours ({}) 不能小于 base_interval_hours ({})",
                self.max_interval_hours, self.base_interval_hours
            )));
        }
        if self.learned_threshold < 2 {
            return Err(ConfigError::Invalid(format!(
                "learned_threshold 必须 >= 2: {}",
                self.learned_threshold
            )));
        }
        if self.max_box < self.learned_threshold {
            return Err(ConfigError::Invalid(format!(
                "max_box ({}) 不能小于 learned_threshold ({})",
                self.max_box, self.learned_threshold
            )));
        }
        Ok(())
    }

    /// 计算指定盒号的复习间隔
    ///
    /// `priority` 小于 1 时按 1 处理。
    pub fn interval(&self, priority: i32) -> Duration {
        let p = priority.max(1);
        let hours = (self.base_interval_hours as f64) * self.growth.powi(p - 1);
        let capped = hours.min(self.max_interval_hours as f64);
        Duration::hours(capped.round() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        SchedulerConfig::default()
            .validate()
            .expect("Default config should validate");
    }

    #[test]
    fn test_interval_doubles_per_box() {
        let config = SchedulerConfig {
            base_interval_hours: 1,
            growth: 2.0,
            max_interval_hours: 1000,
            ..SchedulerConfig::default()
        };

        // 1, 2, 4, 8 ...
        assert_eq!(config.interval(1), Duration::hours(1));
        assert_eq!(config.interval(2), Duration::hours(2));
        assert_eq!(config.interval(3), Duration::hours(4));
        assert_eq!(config.interval(4), Duration::hours(8));
    }

    #[test]
    fn test_interval_is_capped() {
        let config = SchedulerConfig {
            base_interval_hours: 24,
            growth: 2.0,
            max_interval_hours: 100,
            ..SchedulerConfig::default()
        };

        assert_eq!(config.interval(10), Duration::hours(100));
        assert_eq!(config.interval(30), Duration::hours(100));
    }

    #[test]
    fn test_interval_clamps_low_priority_to_one() {
        let config = SchedulerConfig::default();
        assert_eq!(config.interval(0), config.interval(1));
        assert_eq!(config.interval(-3), config.interval(1));
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let config = SchedulerConfig {
            max_box: 3,
            learned_threshold: 5,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_shrinking_growth() {
        let config = SchedulerConfig {
            growth: 0.5,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_base_interval() {
        let config = SchedulerConfig {
            base_interval_hours: 0,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
