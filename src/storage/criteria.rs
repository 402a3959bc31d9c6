//! 查询条件与游标分页引擎
//!
//! 把 [`Criteria`] / [`Cursor`] 组合成参数化的 SQL 片段，供各 Repository
//! 拼装查询。所有过滤值都通过绑定参数传递，绝不拼接字面量；
//! 搜索词在代入 LIKE 之前会转义通配符。
//!
//! 分页采用 keyset 方案：按单调递增的 id 排序，用"上次看到的 id"
//! 排除已读行。与 OFFSET 分页不同，页间有新行插入时既不会重复
//! 也不会漏行。

use rusqlite::types::ToSql;
use serde::{Deserialize, Serialize};

use crate::storage::models::WordOrigin;
use crate::storage::{StorageError, StorageResult};

// ============================================================
// Criteria - 不可变查询条件
// ============================================================

/// 单词查询条件
///
/// 不可变值对象：`with_*` 组合子返回带覆盖字段的新副本，
/// 不做原地修改，可以安全地在并发读取间共享。
/// 缺省字段不产生谓词（开放世界默认）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    /// 按分类过滤
    pub category_id: Option<i64>,
    /// 按来源过滤
    pub origin: Option<WordOrigin>,
    /// 自由文本搜索（对两个词形列做大小写不敏感匹配）
    pub search: Option<String>,
    /// 按是否已掌握过滤
    pub learned: Option<bool>,
}

impl Criteria {
    /// 空条件（匹配所有单词）
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(self, category_id: i64) -> Self {
        Self {
            category_id: Some(category_id),
            ..self
        }
    }

    pub fn with_origin(self, origin: WordOrigin) -> Self {
        Self {
            origin: Some(origin),
            ..self
        }
    }

    pub fn with_search(self, pattern: impl Into<String>) -> Self {
        Self {
            search: Some(pattern.into()),
            ..self
        }
    }

    pub fn with_learned(self, learned: bool) -> Self {
        Self {
            learned: Some(learned),
            ..self
        }
    }
}

// ============================================================
// Cursor - keyset 分页游标
// ============================================================

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// 分页游标
///
/// `last_id` 为 None 表示第一页；`limit` 为 0 表示不限制。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    /// 上一页最后一行的 id
    pub last_id: Option<i64>,
    /// 排序方向
    pub direction: SortDirection,
    /// 每页行数上限
    pub limit: i64,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            last_id: None,
            direction: SortDirection::Asc,
            limit: 0,
        }
    }
}

impl Cursor {
    /// 第一页，不限制行数
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// 第一页，限制行数
    pub fn first_page(limit: i64) -> Self {
        Self {
            last_id: None,
            direction: SortDirection::Asc,
            limit,
        }
    }

    /// 基于上一页最后一行构造下一页游标
    pub fn after(&self, last_id: i64) -> Self {
        Self {
            last_id: Some(last_id),
            direction: self.direction,
            limit: self.limit,
        }
    }
}

// ============================================================
// QueryParts - 参数化查询片段
// ============================================================

/// 参数化查询片段
///
/// `where_sql` / `order_sql` / `limit_sql` 为空字符串时表示省略该子句。
pub struct QueryParts {
    pub where_sql: String,
    pub order_sql: String,
    pub limit_sql: String,
    pub params: Vec<Box<dyn ToSql>>,
}

impl QueryParts {
    /// 拼装完整 SQL
    pub fn to_sql(&self, select_from: &str) -> String {
        let mut sql = String::from(select_from);
        for piece in [&self.where_sql, &self.order_sql, &self.limit_sql] {
            if !piece.is_empty() {
                sql.push(' ');
                sql.push_str(piece);
            }
        }
        sql
    }

    /// 以 `&[&dyn ToSql]` 形式借出绑定参数
    pub fn param_refs(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

/// 组合查询条件与游标为查询片段
///
/// 谓词之间以 AND 连接；缺省字段不参与。`limit` 为负数时
/// 返回 `InvalidCriteria`。
pub fn build(criteria: &Criteria, cursor: &Cursor) -> StorageResult<QueryParts> {
    if cursor.limit < 0 {
        return Err(StorageError::InvalidCriteria(format!(
            "limit 不能为负数: {}",
            cursor.limit
        )));
    }

    let mut conditions: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(category_id) = criteria.category_id {
        params.push(Box::new(category_id));
        conditions.push(format!("category_id = ?{}", params.len()));
    }

    if let Some(origin) = criteria.origin {
        params.push(Box::new(origin.as_str().to_string()));
        conditions.push(format!("origin = ?{}", params.len()));
    }

    if let Some(search) = &criteria.search {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        params.push(Box::new(pattern));
        let idx = params.len();
        conditions.push(format!(
            r"(LOWER(lemma_en) LIKE ?{idx} ESCAPE '\' OR LOWER(lemma_ru) LIKE ?{idx} ESCAPE '\')"
        ));
    }

    if let Some(learned) = criteria.learned {
        params.push(Box::new("learned".to_string()));
        let op = if learned { "=" } else { "<>" };
        conditions.push(format!("learning_state {} ?{}", op, params.len()));
    }

    if let Some(last_id) = cursor.last_id {
        params.push(Box::new(last_id));
        let op = match cursor.direction {
            SortDirection::Asc => ">",
            SortDirection::Desc => "<",
        };
        conditions.push(format!("id {} ?{}", op, params.len()));
    }

    let where_sql = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let order_sql = format!("ORDER BY id {}", cursor.direction.as_sql());

    let limit_sql = if cursor.limit > 0 {
        params.push(Box::new(cursor.limit));
        format!("LIMIT ?{}", params.len())
    } else {
        String::new()
    };

    Ok(QueryParts {
        where_sql,
        order_sql,
        limit_sql,
        params,
    })
}

/// 转义 LIKE 通配符
///
/// 搜索词中的 `%`、`_` 和转义符自身都按字面量处理。
fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
