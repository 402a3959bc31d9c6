//! 数据库迁移模块
//!
//! 管理 SQLite 数据库的版本迁移，确保数据库结构与应用版本保持一致。
//!
//! ## 迁移策略
//! - 每个迁移在独立事务中执行
//! - 迁移记录存储在 schema_migrations 表中
//! - 重复运行是幂等的

use rusqlite::{params, Connection};

use crate::storage::{StorageError, StorageResult};

/// 当前数据库 schema 版本
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// 初始化 schema SQL (V1)
const INIT_SCHEMA: &str = include_str!("schema.sql");

/// 迁移记录
#[derive(Debug, Clone)]
pub struct Migration {
    /// 迁移版本号
    pub version: i32,
    /// 迁移名称/描述
    pub name: String,
    /// 迁移 SQL 语句
    pub sql: String,
}

impl Migration {
    /// 创建新的迁移
    pub fn new(version: i32, name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            version,
            name: name.into(),
            sql: sql.into(),
        }
    }
}

/// 获取所有迁移定义
///
/// 返回按版本号排序的迁移列表
pub fn get_migrations() -> Vec<Migration> {
    vec![
        // V1: 初始表结构
        Migration::new(1, "初始表结构", INIT_SCHEMA),
        // V2: 复习查询的覆盖索引
        Migration::new(
            2,
            "复习查询索引优化",
            r#"
            CREATE INDEX IF NOT EXISTS idx_word_due_order
                ON word(learning_state, priority, next_review_at, id);

            CREATE INDEX IF NOT EXISTS idx_translation_created
                ON translation(created_at);
            "#,
        ),
    ]
}

/// 运行所有未应用的迁移
///
/// 在 schema_migrations 表中记录已应用的版本，重复调用是幂等的。
pub fn run_migrations(conn: &Connection) -> StorageResult<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
        [],
    )?;

    let applied_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    for migration in get_migrations() {
        if migration.version <= applied_version {
            continue;
        }

        conn.execute_batch(&migration.sql).map_err(|e| {
            StorageError::Migration(format!(
                "迁移 V{} ({}) 执行失败: {}",
                migration.version, migration.name, e
            ))
        })?;

        conn.execute(
            "INSERT INTO schema_migrations (version, name) VALUES (?1, ?2)",
            params![migration.version, migration.name],
        )?;

        tracing::info!(version = migration.version, name = %migration.name, "数据库迁移已应用");
    }

    Ok(())
}
