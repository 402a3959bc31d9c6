//! 每日学习调度器
//!
//! 单词学习状态机：`new → learning → learned`，learning 状态上有
//! 复习成功/失败的自环。所有公开操作在一个数据库事务内完成
//! 读-改-写，计数变更与跨日判定也在同一事务中，失败时整体回滚，
//! 不会留下不一致的中间状态。

pub mod session;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

use crate::config::SchedulerConfig;
use crate::error::{CoreError, CoreResult};
use crate::storage::models::{LearningState, Word};
use crate::storage::word::WordRepository;
use crate::storage::{Storage, StorageError};
use crate::tracker::{Activity, ActivityOutcome, GoalTracker};
use session::ReviewSession;

// ============================================================
// 结果类型
// ============================================================

/// 今日学习集
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySet {
    /// 到期待复习的词（按盒号、逾期时长排序）
    pub to_review: Vec<Word>,
    /// 按剩余目标容量引入的新词
    pub to_learn: Vec<Word>,
    /// 存储暂不可用时的错误描述（此时两个列表为空）
    pub store_error: Option<String>,
}

impl DailySet {
    fn empty_with_error(error: String) -> Self {
        Self {
            to_review: Vec::new(),
            to_learn: Vec::new(),
            store_error: Some(error),
        }
    }
}

/// 一次复习操作的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewOutcome {
    /// 更新后的单词快照
    pub word: Word,
    /// 目标跟踪结果（含一次性达标信号）
    pub activity: ActivityOutcome,
}

// ============================================================
// DailyScheduler
// ============================================================

/// 每日学习调度器
pub struct DailyScheduler {
    conn: Arc<Mutex<Connection>>,
    config: SchedulerConfig,
    session: AsyncMutex<ReviewSession>,
}

impl DailyScheduler {
    /// 创建调度器
    ///
    /// 配置不合法时拒绝创建。
    pub fn new(storage: &Storage, config: SchedulerConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self {
            conn: storage.connection(),
            config,
            session: AsyncMutex::new(ReviewSession::new()),
        })
    }

    /// 当前调度配置
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// 开始学习一个新词
    ///
    /// 要求单词处于 `new` 状态；置入第 1 盒并排定首次复习时间。
    pub async fn start_learning(&self, word_id: i64, now: DateTime<Utc>) -> CoreResult<Word> {
        let word = self.in_transaction(|conn| {
            let mut word = Self::require_word(conn, word_id)?;

            if word.learning_state != LearningState::New {
                return Err(CoreError::InvalidTransition(format!(
                    "单词 {} 处于 {} 状态，只有 new 状态可以开始学习",
                    word.id,
                    word.learning_state.as_str()
                )));
            }

            word.learning_state = LearningState::Learning;
            word.priority = 1;
            word.next_review_at = Some(now + self.config.interval(1));
            word.updated_at = now;

            WordRepository::save_internal(conn, &word)?;
            Ok(word)
        })?;

        tracing::debug!(word_id, "开始学习");
        Ok(word)
    }

    /// 复习成功
    ///
    /// 升盒；达到掌握阈值时转入 `learned`，否则按新盒号排定下次复习。
    /// 同一事务内递增今日复习计数。
    pub async fn mark_reviewed(&self, word_id: i64, now: DateTime<Utc>) -> CoreResult<ReviewOutcome> {
        let outcome = self.in_transaction(|conn| {
            let mut word = Self::require_word(conn, word_id)?;
            Self::require_learning(&word)?;

            let promoted = (word.priority + 1).min(self.config.max_box);
            if promoted >= self.config.learned_threshold {
                word.learning_state = LearningState::Learned;
                word.priority = promoted;
                word.learned_at = Some(now);
                word.next_review_at = None;
            } else {
                word.priority = promoted;
                word.next_review_at = Some(now + self.config.interval(promoted));
            }
            word.updated_at = now;

            WordRepository::save_internal(conn, &word)?;
            let activity = GoalTracker::record_internal(conn, Some(Activity::Reviewed), now.date_naive())?;
            Ok(ReviewOutcome { word, activity })
        })?;

        self.session.lock().await.remove(word_id);

        tracing::debug!(
            word_id,
            priority = outcome.word.priority,
            state = outcome.word.learning_state.as_str(),
            "复习成功"
        );
        Ok(outcome)
    }

    /// 复习失败（Leitner 降盒）
    ///
    /// 盒号至少为 1，状态保持 `learning`。该词被插回本次会话队首，
    /// 在会话结束前再次出现；持久化排期只按降盒后的盒号重算一次。
    pub async fn mark_not_reviewed(&self, word_id: i64, now: DateTime<Utc>) -> CoreResult<Word> {
        let word = self.in_transaction(|conn| {
            let mut word = Self::require_word(conn, word_id)?;
            Self::require_learning(&word)?;

            let demoted = (word.priority - 1).max(1);
            word.priority = demoted;
            word.next_review_at = Some(now + self.config.interval(demoted));
            word.updated_at = now;

            WordRepository::save_internal(conn, &word)?;
            Ok(word)
        })?;

        self.session.lock().await.requeue_front(word_id);

        tracing::debug!(word_id, priority = word.priority, "复习失败，降盒并插回会话队首");
        Ok(word)
    }

    /// 直接标记为已掌握
    ///
    /// "我已经会了"的快捷操作：允许从任何非 `learned` 状态直达
    /// `learned`，跳过排期。同一事务内递增今日掌握计数。
    pub async fn mark_completely_learned(
        &self,
        word_id: i64,
        now: DateTime<Utc>,
    ) -> CoreResult<ReviewOutcome> {
        let outcome = self.in_transaction(|conn| {
            let mut word = Self::require_word(conn, word_id)?;

            if word.learning_state == LearningState::Learned {
                return Err(CoreError::InvalidTransition(format!(
                    "单词 {} 已是 learned 状态",
                    word.id
                )));
            }

            word.learning_state = LearningState::Learned;
            // 直接掌握的词也落在掌握阈值盒上，维持"盒号 0 当且仅当 new"
            word.priority = word.priority.max(self.config.learned_threshold);
            word.learned_at = Some(now);
            word.next_review_at = None;
            word.updated_at = now;

            WordRepository::save_internal(conn, &word)?;
            let activity = GoalTracker::record_internal(conn, Some(Activity::Learned), now.date_naive())?;
            Ok(ReviewOutcome { word, activity })
        })?;

        self.session.lock().await.remove(word_id);

        tracing::debug!(word_id, "直接标记为已掌握");
        Ok(outcome)
    }

    /// 重置全部学习进度
    ///
    /// 所有非 `new` 状态的词回到 `new`，清除盒号、排期与掌握时间，
    /// 并清空当前会话。返回受影响的词数。
    pub async fn reset_learning_stats(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        let affected = self.in_transaction(|conn| {
            WordRepository::reset_all_learning_internal(conn, now).map_err(CoreError::from)
        })?;

        self.session.lock().await.clear();

        tracing::info!(affected, "学习进度已全部重置");
        Ok(affected)
    }

    /// 装配今日学习集
    ///
    /// `to_review` 为到期词；`to_learn` 按未完成的目标容量引入新词：
    /// `remaining = max(0, daily_goal - reviewed_today - learned_today)`。
    /// 存储暂不可用时返回空集并附带错误描述，不让整天的会话失败。
    pub async fn load_daily_set(&self, now: DateTime<Utc>) -> DailySet {
        let loaded = self.in_transaction(|conn| {
            // 先应用跨日清零，否则昨天的计数会错误地挤占今天的容量
            let activity = GoalTracker::record_internal(conn, None, now.date_naive())?;
            let stats = activity.stats;

            let to_review = WordRepository::find_due_internal(conn, now)?;
            let remaining =
                (stats.daily_goal - stats.reviewed_today - stats.learned_today).max(0);
            let to_learn = WordRepository::find_new_internal(conn, remaining as i64)?;

            Ok((to_review, to_learn))
        });

        match loaded {
            Ok((to_review, to_learn)) => {
                let mut session = self.session.lock().await;
                session.replace(to_review.iter().map(|w| w.id).collect());

                tracing::debug!(
                    to_review = to_review.len(),
                    to_learn = to_learn.len(),
                    "今日学习集已装配"
                );
                DailySet {
                    to_review,
                    to_learn,
                    store_error: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "装配今日学习集失败，返回空集");
                DailySet::empty_with_error(e.to_string())
            }
        }
    }

    /// 取出会话中的下一个待复习词
    ///
    /// 跳过会话装配后状态已变化（被掌握、被删除）的词。
    pub async fn next_review(&self) -> CoreResult<Option<Word>> {
        let mut session = self.session.lock().await;

        while let Some(id) = session.next() {
            let word = {
                let conn = self
                    .conn
                    .lock()
                    .map_err(|e| CoreError::from(StorageError::LockError(e.to_string())))?;
                WordRepository::get_internal(&conn, id)?
            };

            if let Some(word) = word {
                if word.learning_state == LearningState::Learning {
                    return Ok(Some(word));
                }
            }
        }

        Ok(None)
    }

    /// 会话中剩余的待复习词数
    pub async fn session_remaining(&self) -> usize {
        self.session.lock().await.len()
    }

    // ============================================================
    // 内部实现
    // ============================================================

    fn require_word(conn: &Connection, word_id: i64) -> CoreResult<Word> {
        WordRepository::get_internal(conn, word_id)?.ok_or_else(|| {
            CoreError::InvalidTransition(format!("单词 {} 不存在", word_id))
        })
    }

    fn require_learning(word: &Word) -> CoreResult<()> {
        if word.learning_state != LearningState::Learning {
            return Err(CoreError::InvalidTransition(format!(
                "单词 {} 处于 {} 状态，只有 learning 状态可以复习",
                word.id,
                word.learning_state.as_str()
            )));
        }
        Ok(())
    }

    /// 在单个事务内执行读-改-写
    ///
    /// 闭包返回错误时回滚，转换要么完整生效要么完全不生效。
    fn in_transaction<F, T>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&Connection) -> CoreResult<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| CoreError::from(StorageError::LockError(e.to_string())))?;

        let tx = conn
            .transaction()
            .map_err(|e| CoreError::from(StorageError::Database(e)))?;
        let result = f(&tx)?;
        tx.commit()
            .map_err(|e| CoreError::from(StorageError::Database(e)))?;

        Ok(result)
    }
}
