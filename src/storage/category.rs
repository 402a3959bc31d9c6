//! 分类数据库操作

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::storage::models::{format_datetime, Category, WordOrigin};
use crate::storage::{StorageError, StorageResult};

/// 分类仓储
pub struct CategoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl CategoryRepository {
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

    /// 根据 ID 获取分类
    pub fn get(&self, id: i64) -> StorageResult<Option<Category>> {
        let conn = self.get_conn()?;
        Self::get_internal(&conn, id)
    }

    /// 获取所有分类（按 id 排序）
    pub fn list(&self) -> StorageResult<Vec<Category>> {
        let conn = self.get_conn()?;
        Self::list_internal(&conn)
    }

    /// 插入新分类
    pub fn insert(
        &self,
        name: &str,
        icon: Option<&str>,
        origin: WordOrigin,
    ) -> StorageResult<Category> {
        let conn = self.get_conn()?;
        Self::insert_internal(&conn, name, icon, origin)
    }

    /// 删除分类
    ///
    /// 只允许删除学习者自行添加的分类；该分类下的单词不会被删除，
    /// 其 category_id 会被置空（弱引用语义）。
    pub fn delete(&self, id: i64) -> StorageResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(StorageError::Database)?;
        Self::delete_internal(&tx, id)?;
        tx.commit()?;
        Ok(())
    }

    // ============================================================
    // 内部实现方法
    // ============================================================

    /// 根据 ID 获取分类（内部实现）
    pub fn get_internal(conn: &Connection, id: i64) -> StorageResult<Option<Category>> {
        let category = conn
            .query_row("SELECT * FROM category WHERE id = ?1", params![id], |row| {
                Category::from_row(row)
            })
            .optional()?;
        Ok(category)
    }

    /// 获取所有分类（内部实现）
    pub fn list_internal(conn: &Connection) -> StorageResult<Vec<Category>> {
        let mut stmt = conn.prepare("SELECT * FROM category ORDER BY id ASC")?;
        let categories = stmt
            .query_map([], |row| Category::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// 插入新分类（内部实现）
    pub fn insert_internal(
        conn: &Connection,
        name: &str,
        icon: Option<&str>,
        origin: WordOrigin,
    ) -> StorageResult<Category> {
        conn.execute(
            "INSERT INTO category (name, icon, origin, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, icon, origin.as_str(), format_datetime(Utc::now())],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_internal(conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("刚插入的分类 {} 不存在", id)))
    }

    /// 删除分类（内部实现）
    pub fn delete_internal(conn: &Connection, id: i64) -> StorageResult<()> {
        let category = Self::get_internal(conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("分类 {} 不存在", id)))?;

        if category.origin != WordOrigin::UserAdded {
            return Err(StorageError::Constraint(format!(
                "预置分类 {} 不允许删除",
                id
            )));
        }

        // 先解除单词的弱引用，再删除分类
        conn.execute(
            "UPDATE word SET category_id = NULL WHERE category_id = ?1",
            params![id],
        )?;
        conn.execute("DELETE FROM category WHERE id = ?1", params![id])?;

        Ok(())
    }
}
