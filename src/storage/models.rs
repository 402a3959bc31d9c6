//! 数据模型定义
//!
//! 定义 SQLite 存储所需的所有数据结构，以及与数据库交互的方法。

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use serde::{Deserialize, Serialize};

use crate::storage::{StorageError, StorageResult};

// ============================================================
// 枚举类型
// ============================================================

/// 单词学习状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearningState {
    /// 尚未开始学习
    New,
    /// 学习中（参与复习排期）
    Learning,
    /// 已掌握
    Learned,
}

impl LearningState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Learned => "learned",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "new" => Some(Self::New),
            "learning" => Some(Self::Learning),
            "learned" => Some(Self::Learned),
            _ => None,
        }
    }
}

/// 数据来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WordOrigin {
    /// 预置词库
    Preloaded,
    /// 学习者自行添加
    UserAdded,
}

impl WordOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preloaded => "preloaded",
            Self::UserAdded => "user_added",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "preloaded" => Some(Self::Preloaded),
            "user_added" => Some(Self::UserAdded),
            _ => None,
        }
    }
}

/// 翻译请求的源语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    En,
    Ru,
}

impl SourceLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ru => "ru",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "en" => Some(Self::En),
            "ru" => Some(Self::Ru),
            _ => None,
        }
    }
}

// ============================================================
// Word - 单词数据
// ============================================================

/// 单词数据
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    /// 单词唯一标识（单调递增整数，keyset 分页依赖它）
    pub id: i64,
    /// 英文词形
    pub lemma_en: String,
    /// 俄文词形
    pub lemma_ru: String,
    /// 音标
    pub transcription: Option<String>,
    /// 例句
    pub text_example: Option<String>,
    /// 所属分类 ID（弱引用，可为空）
    pub category_id: Option<i64>,
    /// 数据来源
    pub origin: WordOrigin,
    /// 学习状态
    pub learning_state: LearningState,
    /// Leitner 盒号（new 状态恒为 0）
    pub priority: i32,
    /// 下次复习时间（仅 learning 状态有意义）
    pub next_review_at: Option<DateTime<Utc>>,
    /// 掌握时间
    pub learned_at: Option<DateTime<Utc>>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 新单词的插入属性（id 由数据库生成）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWord {
    pub lemma_en: String,
    pub lemma_ru: String,
    pub transcription: Option<String>,
    pub text_example: Option<String>,
    pub category_id: Option<i64>,
    pub origin: WordOrigin,
}

impl Word {
    /// 从数据库行解析
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        let origin_str: String = row.get("origin")?;
        let state_str: String = row.get("learning_state")?;

        Ok(Self {
            id: row.get("id")?,
            lemma_en: row.get("lemma_en")?,
            lemma_ru: row.get("lemma_ru")?,
            transcription: row.get("transcription")?,
            text_example: row.get("text_example")?,
            category_id: row.get("category_id")?,
            origin: WordOrigin::from_str(&origin_str).unwrap_or(WordOrigin::UserAdded),
            learning_state: LearningState::from_str(&state_str).unwrap_or(LearningState::New),
            priority: row.get("priority")?,
            next_review_at: row
                .get::<_, Option<String>>("next_review_at")?
                .map(parse_datetime),
            learned_at: row
                .get::<_, Option<String>>("learned_at")?
                .map(parse_datetime),
            created_at: parse_datetime(row.get::<_, String>("created_at")?),
            updated_at: parse_datetime(row.get::<_, String>("updated_at")?),
        })
    }

    /// 校验学习状态不变量
    ///
    /// - `new` ⇒ `priority = 0` 且无 `next_review_at`
    /// - `learned` ⇒ `learned_at` 已设置
    pub fn validate(&self) -> StorageResult<()> {
        match self.learning_state {
            LearningState::New => {
                if self.priority != 0 || self.next_review_at.is_some() {
                    return Err(StorageError::Constraint(format!(
                        "new 状态的单词 {} 不应有盒号或复习时间",
                        self.id
                    )));
                }
            }
            LearningState::Learning => {
                if self.priority < 1 {
                    return Err(StorageError::Constraint(format!(
                        "learning 状态的单词 {} 盒号必须 >= 1",
                        self.id
                    )));
                }
            }
            LearningState::Learned => {
                if self.learned_at.is_none() {
                    return Err(StorageError::Constraint(format!(
                        "learned 状态的单词 {} 缺少掌握时间",
                        self.id
                    )));
                }
                if self.priority < 1 {
                    return Err(StorageError::Constraint(format!(
                        "learned 状态的单词 {} 盒号必须 >= 1",
                        self.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// 更新数据库记录
    pub fn update(&self, conn: &Connection) -> StorageResult<usize> {
        let affected = conn.execute(
            r#"
            UPDATE word SET
                lemma_en = ?2, lemma_ru = ?3, transcription = ?4,
                text_example = ?5, category_id = ?6, origin = ?7,
                learning_state = ?8, priority = ?9,
                next_review_at = ?10, learned_at = ?11, updated_at = ?12
            WHERE id = ?1
            "#,
            params![
                self.id,
                self.lemma_en,
                self.lemma_ru,
                self.transcription,
                self.text_example,
                self.category_id,
                self.origin.as_str(),
                self.learning_state.as_str(),
                self.priority,
                self.next_review_at.map(format_datetime),
                self.learned_at.map(format_datetime),
                format_datetime(self.updated_at),
            ],
        )?;
        Ok(affected)
    }
}

impl NewWord {
    /// 插入到数据库，返回生成的 rowid
    pub fn insert(&self, conn: &Connection, now: DateTime<Utc>) -> StorageResult<i64> {
        conn.execute(
            r#"
            INSERT INTO word (
                lemma_en, lemma_ru, transcription, text_example,
                category_id, origin, learning_state, priority,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'new', 0, ?7, ?7)
            "#,
            params![
                self.lemma_en,
                self.lemma_ru,
                self.transcription,
                self.text_example,
                self.category_id,
                self.origin.as_str(),
                format_datetime(now),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

// ============================================================
// Category - 单词分类
// ============================================================

/// 单词分类
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    /// 分类名称
    pub name: String,
    /// 图标标识
    pub icon: Option<String>,
    /// 数据来源
    pub origin: WordOrigin,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// 从数据库行解析
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        let origin_str: String = row.get("origin")?;
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            icon: row.get("icon")?,
            origin: WordOrigin::from_str(&origin_str).unwrap_or(WordOrigin::UserAdded),
            created_at: parse_datetime(row.get::<_, String>("created_at")?),
        })
    }
}

// ============================================================
// Translation - 翻译查询记录
// ============================================================

/// 翻译查询记录
///
/// 独立于单词与分类，只有在学习者把某个候选提升为单词时才发生关联。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Translation {
    pub id: i64,
    /// 查询原文
    pub source_text: String,
    /// 原文语言
    pub source_language: SourceLanguage,
    /// 候选译文（有序）
    pub candidates: Vec<String>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl Translation {
    /// 从数据库行解析
    ///
    /// candidates 列存储 JSON 数组，解析失败时按空列表处理。
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        let lang_str: String = row.get("source_language")?;
        let candidates_json: String = row.get("candidates")?;

        Ok(Self {
            id: row.get("id")?,
            source_text: row.get("source_text")?,
            source_language: SourceLanguage::from_str(&lang_str).unwrap_or(SourceLanguage::En),
            candidates: serde_json::from_str(&candidates_json).unwrap_or_default(),
            created_at: parse_datetime(row.get::<_, String>("created_at")?),
        })
    }
}

// ============================================================
// LearnerStats - 学习者全局统计（单行）
// ============================================================

/// 学习者全局统计
///
/// 进程内单例，持久化为 learner_stats 表中 id = 1 的唯一一行。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerStats {
    /// 显示名称
    pub display_name: String,
    /// 连续达标天数
    pub streak_days: i32,
    /// 最后活跃日期（自然日，非时间戳）
    pub last_active_date: NaiveDate,
    /// 今日复习数（跨日清零）
    pub reviewed_today: i32,
    /// 今日掌握数（跨日清零）
    pub learned_today: i32,
    /// 每日目标
    pub daily_goal: i32,
    /// 今日是否已达标（跨日清零）
    pub goal_achieved_today: bool,
}

impl LearnerStats {
    /// 创建初始统计
    pub fn new(today: NaiveDate) -> Self {
        Self {
            display_name: String::new(),
            streak_days: 0,
            last_active_date: today,
            reviewed_today: 0,
            learned_today: 0,
            daily_goal: 10,
            goal_achieved_today: false,
        }
    }

    /// 从数据库行解析
    pub fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            display_name: row.get("display_name")?,
            streak_days: row.get("streak_days")?,
            last_active_date: parse_date(row.get::<_, String>("last_active_date")?),
            reviewed_today: row.get("reviewed_today")?,
            learned_today: row.get("learned_today")?,
            daily_goal: row.get("daily_goal")?,
            goal_achieved_today: row.get::<_, i32>("goal_achieved_today")? != 0,
        })
    }

    /// 插入或更新单例行
    pub fn upsert(&self, conn: &Connection) -> StorageResult<()> {
        conn.execute(
            r#"
            INSERT INTO learner_stats (
                id, display_name, streak_days, last_active_date,
                reviewed_today, learned_today, daily_goal, goal_achieved_today
            ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                streak_days = excluded.streak_days,
                last_active_date = excluded.last_active_date,
                reviewed_today = excluded.reviewed_today,
                learned_today = excluded.learned_today,
                daily_goal = excluded.daily_goal,
                goal_achieved_today = excluded.goal_achieved_today
            "#,
            params![
                self.display_name,
                self.streak_days,
                format_date(self.last_active_date),
                self.reviewed_today,
                self.learned_today,
                self.daily_goal,
                self.goal_achieved_today as i32,
            ],
        )?;
        Ok(())
    }
}

// ============================================================
// 辅助函数
// ============================================================

/// 解析日期时间字符串
pub(crate) fn parse_datetime(s: String) -> DateTime<Utc> {
    // 尝试多种格式
    if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
        return dt.with_timezone(&Utc);
    }

    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S") {
        return DateTime::from_naive_utc_and_offset(dt, Utc);
    }

    // 默认返回当前时间
    Utc::now()
}

/// 格式化日期时间为字符串
pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 解析日期字符串
pub(crate) fn parse_date(s: String) -> NaiveDate {
    NaiveDate::parse_from_str(&s, "%Y-%m-%d").unwrap_or_else(|_| Utc::now().date_naive())
}

/// 格式化日期为字符串
pub(crate) fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}
