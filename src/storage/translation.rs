//! 翻译记录数据库操作
//!
//! 翻译查询的结果在这里落盘；学习者可以把某个候选译文
//! "提升"为一个自添加单词，进入学习流程。

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex};

use crate::storage::models::{format_datetime, NewWord, SourceLanguage, Translation, Word, WordOrigin};
use crate::storage::word::WordRepository;
use crate::storage::{StorageError, StorageResult};

/// 翻译记录仓储
pub struct TranslationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TranslationRepository {
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

    /// 保存一次翻译查询结果
    pub fn insert(
        &self,
        source_text: &str,
        source_language: SourceLanguage,
        candidates: &[String],
    ) -> StorageResult<Translation> {
        let conn = self.get_conn()?;

        let candidates_json = serde_json::to_string(candidates)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO translation (source_text, source_language, candidates, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                source_text,
                source_language.as_str(),
                candidates_json,
                format_datetime(Utc::now()),
            ],
        )?;

        let id = conn.last_insert_rowid();
        Self::get_internal(&conn, id)?
            .ok_or_else(|| StorageError::NotFound(format!("刚插入的翻译记录 {} 不存在", id)))
    }

    /// 根据 ID 获取翻译记录
    pub fn get(&self, id: i64) -> StorageResult<Option<Translation>> {
        let conn = self.get_conn()?;
        Self::get_internal(&conn, id)
    }

    /// 获取最近的翻译记录
    pub fn recent(&self, limit: i64) -> StorageResult<Vec<Translation>> {
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM translation ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;

        let translations = stmt
            .query_map(params![limit], |row| Translation::from_row(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(translations)
    }

    /// 删除翻译记录
    pub fn delete(&self, id: i64) -> StorageResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM translation WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(StorageError::NotFound(format!("翻译记录 {} 不存在", id)));
        }
        Ok(())
    }

    /// 把某个候选译文提升为自添加单词
    ///
    /// 根据源语言决定词形方向：源为英文则候选是俄文释义，反之亦然。
    /// 提升后翻译记录保留，二者不再有持久关联。
    pub fn promote(
        &self,
        translation_id: i64,
        candidate_index: usize,
        category_id: Option<i64>,
    ) -> StorageResult<Word> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction().map_err(StorageError::Database)?;

        let translation = Self::get_internal(&tx, translation_id)?
            .ok_or_else(|| StorageError::NotFound(format!("翻译记录 {} 不存在", translation_id)))?;

        let candidate = translation
            .candidates
            .get(candidate_index)
            .ok_or_else(|| {
                StorageError::Constraint(format!(
                    "翻译记录 {} 没有第 {} 个候选",
                    translation_id, candidate_index
                ))
            })?
            .clone();

        let (lemma_en, lemma_ru) = match translation.source_language {
            SourceLanguage::En => (translation.source_text.clone(), candidate),
            SourceLanguage::Ru => (candidate, translation.source_text.clone()),
        };

        let word = WordRepository::insert_internal(
            &tx,
            NewWord {
                lemma_en,
                lemma_ru,
                transcription: None,
                text_example: None,
                category_id,
                origin: WordOrigin::UserAdded,
            },
            Utc::now(),
        )?;

        tx.commit()?;
        Ok(word)
    }

    /// 根据 ID 获取翻译记录（内部实现）
    pub fn get_internal(conn: &Connection, id: i64) -> StorageResult<Option<Translation>> {
        let translation = conn
            .query_row(
                "SELECT * FROM translation WHERE id = ?1",
                params![id],
                |row| Translation::from_row(row),
            )
            .optional()?;
        Ok(translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::migrations;
    use crate::storage::models::LearningState;

    fn setup_test_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().expect("Failed to open in-memory connection");
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .expect("Failed to set pragma");
        migrations::run_migrations(&conn).expect("Failed to run migrations");
        Arc::new(Mutex::new(conn))
    }

    fn candidates(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let conn = setup_test_db();
        let repo = TranslationRepository::new(conn);

        let translation = repo
            .insert("house", SourceLanguage::En, &candidates(&["дом", "здание"]))
            .expect("Failed to insert");

        let fetched = repo
            .get(translation.id)
            .expect("Failed to get")
            .expect("Translation not found");

        assert_eq!(fetched.source_text, "house");
        assert_eq!(fetched.candidates, vec!["дом", "здание"]);
    }

    #[test]
    fn test_recent_returns_newest_first() {
        let conn = setup_test_db();
        let repo = TranslationRepository::new(conn);

        repo.insert("one", SourceLanguage::En, &candidates(&["один"]))
            .unwrap();
        repo.insert("two", SourceLanguage::En, &candidates(&["два"]))
            .unwrap();
        repo.insert("three", SourceLanguage::En, &candidates(&["три"]))
            .unwrap();

        let recent = repo.recent(2).expect("Failed to list");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].source_text, "three");
        assert_eq!(recent[1].source_text, "two");
    }

    #[test]
    fn test_promote_english_source() {
        let conn = setup_test_db();
        let repo = TranslationRepository::new(Arc::clone(&conn));

        let translation = repo
            .insert("bread", SourceLanguage::En, &candidates(&["хлеб"]))
            .unwrap();

        let word = repo
            .promote(translation.id, 0, None)
            .expect("Failed to promote");

        assert_eq!(word.lemma_en, "bread");
        assert_eq!(word.lemma_ru, "хлеб");
        assert_eq!(word.origin, WordOrigin::UserAdded);
        assert_eq!(word.learning_state, LearningState::New);
    }

    #[test]
    fn test_promote_russian_source_swaps_direction() {
        let conn = setup_test_db();
        let repo = TranslationRepository::new(conn);

        let translation = repo
            .insert("молоко", SourceLanguage::Ru, &candidates(&["milk"]))
            .unwrap();

        let word = repo
            .promote(translation.id, 0, None)
            .expect("Failed to promote");

        assert_eq!(word.lemma_en, "milk");
        assert_eq!(word.lemma_ru, "молоко");
    }

    #[test]
    fn test_promote_out_of_range_candidate_fails() {
        let conn = setup_test_db();
        let repo = TranslationRepository::new(conn);

        let translation = repo
            .insert("water", SourceLanguage::En, &candidates(&["вода"]))
            .unwrap();

        let result = repo.promote(translation.id, 5, None);
        assert!(matches!(result, Err(StorageError::Constraint(_))));
    }

    #[test]
    fn test_delete_missing_reports_not_found() {
        let conn = setup_test_db();
        let repo = TranslationRepository::new(conn);
        assert!(matches!(
            repo.delete(42),
            Err(StorageError::NotFound(_))
        ));
    }
}
