//! 学习者统计数据库操作
//!
//! learner_stats 是单行表（id 恒为 1）。首次读取时自动创建初始行，
//! 对应应用启动时的一次性初始化。

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::storage::models::LearnerStats;
use crate::storage::{StorageError, StorageResult};

/// 学习者统计仓储
pub struct LearnerStatsRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LearnerStatsRepository {
    /// 创建新的仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取连接锁
    fn get_conn(&self) -> StorageResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))
    }

    /// 读取统计（不存在时创建初始行）
    pub fn load(&self, today: NaiveDate) -> StorageResult<LearnerStats> {
        let conn = self.get_conn()?;
        Self::load_internal(&conn, today)
    }

    /// 保存统计
    pub fn save(&self, stats: &LearnerStats) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::save_internal(&conn, stats)
    }

    /// 用户主动重置
    ///
    /// 清零所有计数和连续天数，最后活跃日期变为今天。
    pub fn reset(&self, today: NaiveDate) -> StorageResult<LearnerStats> {
        let conn = self.get_conn()?;
        let mut stats = Self::load_internal(&conn, today)?;

        stats.streak_days = 0;
        stats.reviewed_today = 0;
        stats.learned_today = 0;
        stats.goal_achieved_today = false;
        stats.last_active_date = today;

        Self::save_internal(&conn, &stats)?;
        Ok(stats)
    }

    // ============================================================
    // 内部实现方法
    // ============================================================

    /// 读取统计（内部实现）
    pub fn load_internal(conn: &Connection, today: NaiveDate) -> StorageResult<LearnerStats> {
        let existing = conn
            .query_row("SELECT * FROM learner_stats WHERE id = 1", [], |row| {
                LearnerStats::from_row(row)
            })
            .optional()?;

        match existing {
            Some(stats) => Ok(stats),
            None => {
                let stats = LearnerStats::new(today);
                stats.upsert(conn)?;
                Ok(stats)
            }
        }
    }

    /// 保存统计（内部实现）
    pub fn save_internal(conn: &Connection, stats: &LearnerStats) -> StorageResult<()> {
        stats.upsert(conn)
    }
}
