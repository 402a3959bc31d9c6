//! 每日目标与连续天数跟踪
//!
//! 调度器每次改变 `reviewed_today` / `learned_today` 时都会经过这里。
//! 跨日判定集中在唯一的更新路径 [`GoalTracker::record_internal`] 中，
//! 并且与计数递增在同一个事务内完成，避免并发调用把"跨日清零"
//! 和"计数 +1"拆成两步导致漏计或重复计。

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::error::{CoreError, CoreResult};
use crate::storage::models::LearnerStats;
use crate::storage::stats::LearnerStatsRepository;
use crate::storage::{Storage, StorageError, StorageResult};

// ============================================================
// 类型定义
// ============================================================

/// 会影响每日计数的学习活动
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    /// 完成一次复习
    Reviewed,
    /// 掌握一个单词
    Learned,
}

/// 一次活动记录后的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityOutcome {
    /// 更新后的统计快照
    pub stats: LearnerStats,
    /// 本次调用是否恰好把"今日达标"从未达标翻转为达标
    ///
    /// 一次性信号，UI 层据此弹出达标提示。
    pub goal_achieved_now: bool,
}

// ============================================================
// GoalTracker
// ============================================================

/// 每日目标与连续天数跟踪器
pub struct GoalTracker {
    conn: Arc<Mutex<Connection>>,
}

impl GoalTracker {
    /// 创建跟踪器
    pub fn new(storage: &Storage) -> Self {
        Self {
            conn: storage.connection(),
        }
    }

    /// 读取当前统计快照（不触发跨日清零）
    pub async fn stats(&self, now: DateTime<Utc>) -> CoreResult<LearnerStats> {
        let conn = self.lock()?;
        let stats = LearnerStatsRepository::load_internal(&conn, now.date_naive())?;
        Ok(stats)
    }

    /// 应用跨日清零（若需要），不记录任何活动
    ///
    /// 同一天内重复调用不改变任何字段。
    pub async fn refresh(&self, now: DateTime<Utc>) -> CoreResult<LearnerStats> {
        let outcome = self.in_transaction(|conn| {
            Self::record_internal(conn, None, now.date_naive())
        })?;
        Ok(outcome.stats)
    }

    /// 设置每日目标
    ///
    /// 目标必须为正数；修改后立即重算今日达标状态。
    pub async fn set_daily_goal(&self, goal: i32, now: DateTime<Utc>) -> CoreResult<ActivityOutcome> {
        if goal <= 0 {
            return Err(CoreError::InvalidCriteria(format!(
                "每日目标必须为正数: {}",
                goal
            )));
        }

        let outcome = self.in_transaction(|conn| {
            let today = now.date_naive();
            let mut stats = LearnerStatsRepository::load_internal(conn, today)?;
            rollover_if_needed(&mut stats, today);
            stats.daily_goal = goal;
            let flipped = recompute_goal(&mut stats);
            LearnerStatsRepository::save_internal(conn, &stats)?;
            Ok(ActivityOutcome {
                stats,
                goal_achieved_now: flipped,
            })
        })?;
        Ok(outcome)
    }

    /// 设置显示名称
    pub async fn set_display_name(&self, name: &str, now: DateTime<Utc>) -> CoreResult<LearnerStats> {
        let stats = self.in_transaction(|conn| {
            let mut stats = LearnerStatsRepository::load_internal(conn, now.date_naive())?;
            stats.display_name = name.to_string();
            LearnerStatsRepository::save_internal(conn, &stats)?;
            Ok(stats)
        })?;
        Ok(stats)
    }

    /// 用户主动重置全部统计
    pub async fn reset(&self, now: DateTime<Utc>) -> CoreResult<LearnerStats> {
        let stats = self.in_transaction(|conn| {
            let today = now.date_naive();
            let mut stats = LearnerStatsRepository::load_internal(conn, today)?;
            stats.streak_days = 0;
            stats.reviewed_today = 0;
            stats.learned_today = 0;
            stats.goal_achieved_today = false;
            stats.last_active_date = today;
            LearnerStatsRepository::save_internal(conn, &stats)?;
            Ok(stats)
        })?;
        tracing::info!("学习者统计已重置");
        Ok(stats)
    }

    // ============================================================
    // 内部实现
    // ============================================================

    /// 记录一次活动（内部实现，供调度器在自身事务内调用）
    ///
    /// 跨日清零、计数递增与达标重算作为一个原子单元执行。
    pub(crate) fn record_internal(
        conn: &Connection,
        activity: Option<Activity>,
        today: NaiveDate,
    ) -> StorageResult<ActivityOutcome> {
        let mut stats = LearnerStatsRepository::load_internal(conn, today)?;

        rollover_if_needed(&mut stats, today);

        match activity {
            Some(Activity::Reviewed) => stats.reviewed_today += 1,
            Some(Activity::Learned) => stats.learned_today += 1,
            None => {}
        }

        let flipped = recompute_goal(&mut stats);
        if flipped {
            tracing::info!(
                reviewed = stats.reviewed_today,
                learned = stats.learned_today,
                goal = stats.daily_goal,
                "今日目标达成"
            );
        }

        LearnerStatsRepository::save_internal(conn, &stats)?;

        Ok(ActivityOutcome {
            stats,
            goal_achieved_now: flipped,
        })
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    fn in_transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
}

// ============================================================
// 跨日与达标的纯函数
// ============================================================

/// 跨日清零
///
/// 只有日期前进时才触发；昨天达标则连续天数 +1，
/// 中断一天以上或昨天未达标则清零。时钟回拨视为同一天。
fn rollover_if_needed(stats: &mut LearnerStats, today: NaiveDate) {
    if today <= stats.last_active_date {
        return;
    }

    let consecutive = stats.last_active_date.succ_opt() == Some(today);
    if stats.goal_achieved_today && consecutive {
        stats.streak_days += 1;
    } else {
        stats.streak_days = 0;
    }

    tracing::debug!(
        from = %stats.last_active_date,
        to = %today,
        streak = stats.streak_days,
        "跨日清零"
    );

    stats.reviewed_today = 0;
    stats.learned_today = 0;
    stats.goal_achieved_today = false;
    stats.last_active_date = today;
}

/// 重算今日达标状态，返回是否发生了未达标 → 达标的翻转
fn recompute_goal(stats: &mut LearnerStats) -> bool {
    let was_achieved = stats.goal_achieved_today;
    stats.goal_achieved_today = stats.reviewed_today + stats.learned_today >= stats.daily_goal;
    !was_achieved && stats.goal_achieved_today
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn setup_storage() -> Storage {
        Storage::in_memory().expect("Failed to create storage")
    }

    fn record(storage: &Storage, activity: Option<Activity>, today: NaiveDate) -> ActivityOutcome {
        storage
            .transaction(|conn| GoalTracker::record_internal(conn, activity, today))
            .expect("Failed to record activity")
    }

    #[test]
    fn test_goal_flip_fires_exactly_once() {
        let storage = setup_storage();
        let today = Utc::now().date_naive();

        // daily_goal = 5
        storage
            .transaction(|conn| {
                let mut stats = LearnerStatsRepository::load_internal(conn, today)?;
                stats.daily_goal = 5;
                stats.reviewed_today = 4;
                LearnerStatsRepository::save_internal(conn, &stats)
            })
            .unwrap();

        // 第 5 次复习恰好翻转
        let outcome = record(&storage, Some(Activity::Reviewed), today);
        assert!(outcome.goal_achieved_now);
        assert!(outcome.stats.goal_achieved_today);

        // 继续复习不再重复触发
        let again = record(&storage, Some(Activity::Reviewed), today);
        assert!(!again.goal_achieved_now);
        assert!(again.stats.goal_achieved_today);
    }

    #[test]
    fn test_learned_counts_toward_goal() {
        let storage = setup_storage();
        let today = Utc::now().date_naive();

        storage
            .transaction(|conn| {
                let mut stats = LearnerStatsRepository::load_internal(conn, today)?;
                stats.daily_goal = 2;
                LearnerStatsRepository::save_internal(conn, &stats)
            })
            .unwrap();

        record(&storage, Some(Activity::Reviewed), today);
        let outcome = record(&storage, Some(Activity::Learned), today);
        assert!(outcome.goal_achieved_now);
        assert_eq!(outcome.stats.reviewed_today, 1);
        assert_eq!(outcome.stats.learned_today, 1);
    }

    #[test]
    fn test_rollover_increments_streak_after_achieved_day() {
        let storage = setup_storage();
        let day1 = Utc::now().date_naive();
        let day2 = day1.succ_opt().unwrap();

        storage
            .transaction(|conn| {
                let mut stats = LearnerStatsRepository::load_internal(conn, day1)?;
                stats.daily_goal = 1;
                LearnerStatsRepository::save_internal(conn, &stats)
            })
            .unwrap();

        // 第一天达标
        let outcome = record(&storage, Some(Activity::Reviewed), day1);
        assert!(outcome.goal_achieved_now);

        // 第二天首次活动触发跨日：连续 +1，计数清零
        let outcome = record(&storage, None, day2);
        assert_eq!(outcome.stats.streak_days, 1);
        assert_eq!(outcome.stats.reviewed_today, 0);
        assert!(!outcome.stats.goal_achieved_today);
    }

    #[test]
    fn test_rollover_resets_streak_when_goal_missed() {
        let storage = setup_storage();
        let day1 = Utc::now().date_naive();
        let day2 = day1.succ_opt().unwrap();

        storage
            .transaction(|conn| {
                let mut stats = LearnerStatsRepository::load_internal(conn, day1)?;
                stats.daily_goal = 10;
                stats.streak_days = 6;
                LearnerStatsRepository::save_internal(conn, &stats)
            })
            .unwrap();

        // 第一天只复习了一次，未达标
        record(&storage, Some(Activity::Reviewed), day1);

        let outcome = record(&storage, None, day2);
        assert_eq!(outcome.stats.streak_days, 0);
    }

    #[test]
    fn test_rollover_resets_streak_after_gap() {
        let storage = setup_storage();
        let day1 = Utc::now().date_naive();
        let day4 = day1 + Duration::days(3);

        storage
            .transaction(|conn| {
                let mut stats = LearnerStatsRepository::load_internal(conn, day1)?;
                stats.daily_goal = 1;
                LearnerStatsRepository::save_internal(conn, &stats)
            })
            .unwrap();

        record(&storage, Some(Activity::Reviewed), day1);

        // 隔了两天才回来：即使当天达过标，连续也中断
        let outcome = record(&storage, None, day4);
        assert_eq!(outcome.stats.streak_days, 0);
    }

    #[test]
    fn test_rollover_is_idempotent_within_same_day() {
        let storage = setup_storage();
        let day1 = Utc::now().date_naive();
        let day2 = day1.succ_opt().unwrap();

        storage
            .transaction(|conn| {
                let mut stats = LearnerStatsRepository::load_internal(conn, day1)?;
                stats.daily_goal = 1;
                LearnerStatsRepository::save_internal(conn, &stats)
            })
            .unwrap();

        record(&storage, Some(Activity::Reviewed), day1);

        let first = record(&storage, None, day2);
        let second = record(&storage, None, day2);
        assert_eq!(first.stats.streak_days, second.stats.streak_days);
        assert_eq!(first.stats.reviewed_today, second.stats.reviewed_today);
    }

    #[test]
    fn test_clock_rewind_does_not_rollover() {
        let storage = setup_storage();
        let day2 = Utc::now().date_naive();
        let day1 = day2.pred_opt().unwrap();

        record(&storage, Some(Activity::Reviewed), day2);

        // 时钟回拨到昨天：不清零、不动连续天数
        let outcome = record(&storage, None, day1);
        assert_eq!(outcome.stats.reviewed_today, 1);
        assert_eq!(outcome.stats.last_active_date, day2);
    }

    #[tokio::test]
    async fn test_set_daily_goal_recomputes_achievement() {
        let storage = setup_storage();
        let tracker = GoalTracker::new(&storage);
        let now = Utc::now();

        record(&storage, Some(Activity::Reviewed), now.date_naive());
        record(&storage, Some(Activity::Reviewed), now.date_naive());

        // 把目标降到 2，应立即判定达标
        let outcome = tracker
            .set_daily_goal(2, now)
            .await
            .expect("Failed to set goal");
        assert!(outcome.stats.goal_achieved_today);
        assert!(outcome.goal_achieved_now);
    }

    #[tokio::test]
    async fn test_set_daily_goal_rejects_non_positive() {
        let storage = setup_storage();
        let tracker = GoalTracker::new(&storage);

        let result = tracker.set_daily_goal(0, Utc::now()).await;
        assert!(matches!(result, Err(CoreError::InvalidCriteria(_))));
    }

    #[tokio::test]
    async fn test_refresh_and_stats_accessors() {
        let storage = setup_storage();
        let tracker = GoalTracker::new(&storage);
        let now = Utc::now();

        let stats = tracker.refresh(now).await.expect("Failed to refresh");
        assert_eq!(stats.last_active_date, now.date_naive());

        let snapshot = tracker.stats(now).await.expect("Failed to read stats");
        assert_eq!(snapshot.streak_days, stats.streak_days);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let storage = setup_storage();
        let tracker = GoalTracker::new(&storage);
        let now = Utc::now();

        record(&storage, Some(Activity::Reviewed), now.date_naive());

        let stats = tracker.reset(now).await.expect("Failed to reset");
        assert_eq!(stats.streak_days, 0);
        assert_eq!(stats.reviewed_today, 0);
        assert!(!stats.goal_achieved_today);
    }
}
