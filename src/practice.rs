//! 练习抽样器
//!
//! 从词库按条件抽取一轮测验：一个提示词、它的正确译文和若干干扰项。
//! 每轮都是全新抽取（不使用游标）；候选池先按译文去重，
//! 保证选项之间不会出现相同的译文。

use rand::seq::SliceRandom;
use rand::Rng;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{CoreError, CoreResult};
use crate::storage::criteria::{Criteria, Cursor};
use crate::storage::models::Word;
use crate::storage::word::WordRepository;
use crate::storage::{Storage, StorageError};

// ============================================================
// 结果类型
// ============================================================

/// 一个备选答案
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeChoice {
    /// 该译文所属单词的 id
    pub word_id: i64,
    /// 展示给学习者的译文
    pub lemma_ru: String,
}

/// 一轮练习
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeRound {
    /// 提示词（以英文词形出题）
    pub prompt: Word,
    /// 正确答案对应的单词 id
    pub correct_id: i64,
    /// 乱序后的全部选项，正确答案恰好出现一次
    pub choices: Vec<PracticeChoice>,
}

// ============================================================
// PracticeSampler
// ============================================================

/// 练习抽样器
pub struct PracticeSampler {
    conn: Arc<Mutex<Connection>>,
}

impl PracticeSampler {
    /// 创建抽样器
    pub fn new(storage: &Storage) -> Self {
        Self {
            conn: storage.connection(),
        }
    }

    /// 抽取一轮练习
    pub async fn sample(
        &self,
        criteria: &Criteria,
        pool_size: usize,
        choice_count: usize,
    ) -> CoreResult<PracticeRound> {
        let pool = self.fetch_pool(criteria, pool_size, choice_count)?;
        let mut rng = rand::thread_rng();
        Self::assemble(pool, choice_count, &mut rng)
    }

    /// 抽取一轮练习（显式随机源，测试用）
    pub async fn sample_with_rng<R: Rng>(
        &self,
        criteria: &Criteria,
        pool_size: usize,
        choice_count: usize,
        rng: &mut R,
    ) -> CoreResult<PracticeRound> {
        let pool = self.fetch_pool(criteria, pool_size, choice_count)?;
        Self::assemble(pool, choice_count, rng)
    }

    // ============================================================
    // 内部实现
    // ============================================================

    fn fetch_pool(
        &self,
        criteria: &Criteria,
        pool_size: usize,
        choice_count: usize,
    ) -> CoreResult<Vec<Word>> {
        if choice_count < 2 {
            return Err(CoreError::InvalidCriteria(format!(
                "choice_count 至少为 2: {}",
                choice_count
            )));
        }
        if pool_size == 0 {
            return Err(CoreError::InvalidCriteria(
                "pool_size 必须为正数".to_string(),
            ));
        }

        let conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::from(StorageError::LockError(e.to_string())))?;

        let cursor = Cursor::first_page(pool_size as i64);
        let pool = WordRepository::find_by_criteria_internal(&conn, criteria, &cursor)?;
        Ok(pool)
    }

    /// 从候选池装配一轮练习（纯函数部分）
    ///
    /// 候选池先按译文去重；不足 2 个互不相同的译文时无法出题。
    /// 干扰项不足 `choice_count - 1` 个时容忍缺额，本轮选项变少。
    fn assemble<R: Rng>(
        pool: Vec<Word>,
        choice_count: usize,
        rng: &mut R,
    ) -> CoreResult<PracticeRound> {
        // 按译文去重，保留先出现的词
        let mut seen = HashSet::new();
        let mut unique: Vec<Word> = pool
            .into_iter()
            .filter(|w| seen.insert(w.lemma_ru.clone()))
            .collect();

        if unique.len() < 2 {
            return Err(CoreError::InsufficientPool {
                needed: 2,
                actual: unique.len(),
            });
        }

        // 乱序后取第一个作为提示词，其余作为干扰项来源
        unique.shuffle(rng);
        let prompt = unique.remove(0);

        let distractor_count = (choice_count - 1).min(unique.len());
        let mut choices: Vec<PracticeChoice> = unique
            .into_iter()
            .take(distractor_count)
            .map(|w| PracticeChoice {
                word_id: w.id,
                lemma_ru: w.lemma_ru.clone(),
            })
            .collect();

        choices.push(PracticeChoice {
            word_id: prompt.id,
            lemma_ru: prompt.lemma_ru.clone(),
        });
        choices.shuffle(rng);

        Ok(PracticeRound {
            correct_id: prompt.id,
            prompt,
            choices,
        })
    }
}
