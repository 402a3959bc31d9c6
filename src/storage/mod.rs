//! SQLite 本地存储模块
//!
//! 提供本地 SQLite 数据库存储功能，支持：
//! - 单词 / 分类 / 翻译记录的持久化
//! - 组合式查询条件与 keyset 分页
//! - 学习者统计的单行存储
//! - 版本化迁移

// ============================================================
// 子模块声明
// ============================================================

pub mod category;
pub mod criteria;
pub mod migrations;
pub mod models;
pub mod stats;
pub mod translation;
pub mod word;

// ============================================================
// 重新导出主要类型
// ============================================================

pub use category::CategoryRepository;
pub use criteria::{Criteria, Cursor, QueryParts, SortDirection};
pub use migrations::run_migrations;
pub use models::*;
pub use stats::LearnerStatsRepository;
pub use translation::TranslationRepository;
pub use word::{LearningOverview, WordRepository};

// ============================================================
// 依赖导入
// ============================================================

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

// ============================================================
// 错误类型定义
// ============================================================

/// 存储模块错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("迁移错误: {0}")]
    Migration(String),

    #[error("无效的查询条件: {0}")]
    InvalidCriteria(String),

    #[error("数据约束被违反: {0}")]
    Constraint(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("数据未找到: {0}")]
    NotFound(String),

    #[error("锁获取失败: {0}")]
    LockError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// ============================================================
// Storage - 数据库连接管理器
// ============================================================

/// 统一存储结构体
///
/// 持有共享数据库连接，提供对各 Repository 的便捷访问。
pub struct Storage {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl Storage {
    /// 打开文件数据库
    ///
    /// 自动启用 WAL 模式、外键约束，并运行数据库迁移。
    pub fn new<P: AsRef<Path>>(db_path: P) -> StorageResult<Self> {
        let path_str = db_path.as_ref().to_string_lossy().to_string();
        let connection = Connection::open(&db_path)?;

        // 启用 WAL 模式以提高并发性能
        connection.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;

        Self::from_connection(connection, path_str)
    }

    /// 创建内存数据库（用于测试）
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::from_connection(connection, ":memory:".to_string())
    }

    fn from_connection(connection: Connection, db_path: String) -> StorageResult<Self> {
        migrations::run_migrations(&connection)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(connection)),
            db_path,
        })
    }

    /// 获取数据库连接
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    /// 获取数据库路径
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// 获取单词仓储
    pub fn words(&self) -> WordRepository {
        WordRepository::new(Arc::clone(&self.conn))
    }

    /// 获取分类仓储
    pub fn categories(&self) -> CategoryRepository {
        CategoryRepository::new(Arc::clone(&self.conn))
    }

    /// 获取翻译记录仓储
    pub fn translations(&self) -> TranslationRepository {
        TranslationRepository::new(Arc::clone(&self.conn))
    }

    /// 获取学习者统计仓储
    pub fn learner_stats(&self) -> LearnerStatsRepository {
        LearnerStatsRepository::new(Arc::clone(&self.conn))
    }

    /// 执行事务
    ///
    /// 闭包返回错误时整个事务回滚，不会留下部分写入。
    pub fn transaction<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Connection) -> StorageResult<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::LockError(e.to_string()))?;

        let tx = conn.transaction()?;
        let result = f(&tx)?;
        tx.commit()?;

        Ok(result)
    }
}

// ============================================================
// 测试
// ============================================================
