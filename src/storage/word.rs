//! 单词数据库操作
//!
//! 提供单词的类型化读写接口。读取返回不可变快照；
//! 写入是单行的 last-write-wins（单学习者、单写者，无需乐观锁）。
//!
//! 支持两种使用方式：
//! 1. 使用 `Arc<Mutex<Connection>>` 进行线程安全操作
//! 2. 使用静态 `*_internal` 方法在事务内直接操作

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::storage::criteria::{self, Criteria, Cursor};
use crate::storage::models::{format_datetime, NewWord, Word, WordOrigin};
use crate::storage::{StorageError, StorageResult};

// ============================================================
// LearningOverview - 学习进度总览
// ============================================================

/// 学习进度总览
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearningOverview {
    /// 词库总词数
    pub total: i64,
    /// 未开始学习的词数
    pub new_words: i64,
    /// 学习中的词数
    pub learning_words: i64,
    /// 已掌握的词数
    pub learned_words: i64,
    /// 当前到期待复习的词数
    pub due_now: i64,
}

// ============================================================
// WordRepository - 单词仓储
// ============================================================

/// 单词仓储
pub struct WordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl WordRepository {
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

    /// 根据 ID 获取单词
    pub fn get(&self, id: i64) -> StorageResult<Option<Word>> {
        let conn = self.get_conn()?;
        Self::get_internal(&conn, id)
    }

    /// 获取到期待复习的单词
    ///
    /// 盒号低的、逾期久的排在前面。
    pub fn find_due(&self, now: DateTime<Utc>) -> StorageResult<Vec<Word>> {
        let conn = self.get_conn()?;
        Self::find_due_internal(&conn, now)
    }

    /// 获取尚未开始学习的单词（按入库顺序）
    pub fn find_new(&self, limit: i64) -> StorageResult<Vec<Word>> {
        let conn = self.get_conn()?;
        Self::find_new_internal(&conn, limit)
    }

    /// 按条件与游标查询单词
    pub fn find_by_criteria(&self, criteria: &Criteria, cursor: &Cursor) -> StorageResult<Vec<Word>> {
        let conn = self.get_conn()?;
        Self::find_by_criteria_internal(&conn, criteria, cursor)
    }

    /// 插入新单词
    pub fn insert(&self, new_word: NewWord) -> StorageResult<Word> {
        let conn = self.get_conn()?;
        Self::insert_internal(&conn, new_word, Utc::now())
    }

    /// 保存单词（按 id 整行更新）
    pub fn save(&self, word: &Word) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::save_internal(&conn, word)
    }

    /// 删除单词
    ///
    /// 只允许删除学习者自行添加的单词。
    pub fn delete(&self, id: i64) -> StorageResult<()> {
        let conn = self.get_conn()?;
        Self::delete_internal(&conn, id)
    }

    /// 获取学习进度总览
    pub fn overview(&self, now: DateTime<Utc>) -> StorageResult<LearningOverview> {
        let conn = self.get_conn()?;
        Self::overview_internal(&conn, now)
    }

    // ============================================================
    // 内部实现方法（静态方法，接受 &Connection，用于事务内操作）
    // ============================================================

    /// 根据 ID 获取单词（内部实现）
    pub fn get_internal(conn: &Connection, id: i64) -> StorageResult<Option<Word>> {
        let word = conn
            .query_row("SELECT * FROM word WHERE id = ?1", params![id], |row| {
                Word::from_row(row)
            })
            .optional()?;
        Ok(word)
    }

    /// 获取到期待复习的单词（内部实现）
    pub fn find_due_internal(conn: &Connection, now: DateTime<Utc>) -> StorageResult<Vec<Word>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM word
            WHERE learning_state = 'learning'
                AND next_review_at IS NOT NULL
                AND next_review_at <= ?1
            ORDER BY priority ASC, next_review_at ASC, id ASC
            "#,
        )?;

        let words = stmt
            .query_map(params![format_datetime(now)], |row| Word::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(words)
    }

    /// 获取尚未开始学习的单词（内部实现）
    pub fn find_new_internal(conn: &Connection, limit: i64) -> StorageResult<Vec<Word>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM word
            WHERE learning_state = 'new'
            ORDER BY id ASC
            LIMIT ?1
            "#,
        )?;

        let words = stmt
            .query_map(params![limit], |row| Word::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(words)
    }

    /// 按条件与游标查询单词（内部实现）
    pub fn find_by_criteria_internal(
        conn: &Connection,
        criteria: &Criteria,
        cursor: &Cursor,
    ) -> StorageResult<Vec<Word>> {
        let parts = criteria::build(criteria, cursor)?;
        let sql = parts.to_sql("SELECT * FROM word");
        let params = parts.param_refs();

        let mut stmt = conn.prepare(&sql)?;
        let words = stmt
            .query_map(params.as_slice(), |row| Word::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(words)
    }

    /// 插入新单词（内部实现）
    pub fn insert_internal(
        conn: &Connection,
        new_word: NewWord,
        now: DateTime<Utc>,
    ) -> StorageResult<Word> {
        let id = new_word.insert(conn, now)?;
        Self::get_internal(conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("刚插入的单词 {} 不存在", id)))
    }

    /// 保存单词（内部实现）
    ///
    /// 先校验学习状态不变量，再整行更新。
    pub fn save_internal(conn: &Connection, word: &Word) -> StorageResult<()> {
        word.validate()?;

        let affected = word.update(conn)?;
        if affected == 0 {
            return Err(StorageError::NotFound(format!("单词 {} 不存在", word.id)));
        }
        Ok(())
    }

    /// 删除单词（内部实现）
    pub fn delete_internal(conn: &Connection, id: i64) -> StorageResult<()> {
        let word = Self::get_internal(conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("单词 {} 不存在", id)))?;

        if word.origin != WordOrigin::UserAdded {
            return Err(StorageError::Constraint(format!(
                "预置单词 {} 不允许删除",
                id
            )));
        }

        conn.execute("DELETE FROM word WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// 获取学习进度总览（内部实现）
    pub fn overview_internal(conn: &Connection, now: DateTime<Utc>) -> StorageResult<LearningOverview> {
        let mut overview = LearningOverview::default();

        overview.total = conn
            .query_row("SELECT COUNT(*) FROM word", [], |row| row.get(0))
            .unwrap_or(0);

        overview.new_words = conn
            .query_row(
                "SELECT COUNT(*) FROM word WHERE learning_state = 'new'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        overview.learning_words = conn
            .query_row(
                "SELECT COUNT(*) FROM word WHERE learning_state = 'learning'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        overview.learned_words = conn
            .query_row(
                "SELECT COUNT(*) FROM word WHERE learning_state = 'learned'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        overview.due_now = conn
            .query_row(
                r#"
                SELECT COUNT(*) FROM word
                WHERE learning_state = 'learning'
                    AND next_review_at IS NOT NULL
                    AND next_review_at <= ?1
                "#,
                params![format_datetime(now)],
                |row| row.get(0),
            )
            .unwrap_or(0);

        Ok(overview)
    }

    /// 把所有非 new 状态的单词重置回 new（内部实现）
    ///
    /// 返回受影响的行数。
    pub fn reset_all_learning_internal(conn: &Connection, now: DateTime<Utc>) -> StorageResult<usize> {
        let affected = conn.execute(
            r#"
            UPDATE word SET
                learning_state = 'new',
                priority = 0,
                next_review_at = NULL,
                learned_at = NULL,
                updated_at = ?1
            WHERE learning_state <> 'new'
            "#,
            params![format_datetime(now)],
        )?;
        Ok(affected)
    }
}
