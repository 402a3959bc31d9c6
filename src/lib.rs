//! # slovo-core - 词汇学习核心
//!
//! 本 crate 提供词汇学习应用的离线核心:
//!
//! - **间隔复习调度** - Leitner 盒式状态机，决定每天看到哪些词
//! - **查询引擎** - 组合式过滤条件 + keyset 分页
//! - **目标与连续天数** - 每日目标达成与 streak 的原子化记账
//! - **练习抽样** - 带干扰项去重的随机测验生成
//!
//! ## 设计理念
//!
//! - **单学习者、单写者** - 所有变更经由一个串行化的调度点，
//!   每个公开操作是一个完整的数据库事务
//! - **显式初始化** - 启动加载是类型化的生命周期阶段，
//!   不存在隐式的全局可变状态
//! - **不可变查询条件** - 条件对象只能克隆覆盖，不能原地修改
//!
//! ## 模块结构
//!
//! - [`storage`] - SQLite 存储 (模型、仓储、查询条件、迁移)
//! - [`scheduler`] - 每日学习调度器与会话队列
//! - [`tracker`] - 目标与连续天数跟踪
//! - [`practice`] - 练习抽样器
//! - [`service`] - 核心装配与初始化生命周期
//! - [`config`] - 调度参数
//! - [`error`] - 错误分类
//!
//! ## 使用示例
//!
//! ```no_run
//! use slovo_core::{CoreCell, SchedulerConfig};
//!
//! # async fn demo() -> Result<(), slovo_core::CoreError> {
//! let cell = CoreCell::new();
//! let core = cell
//!     .initialize("slovo.db", SchedulerConfig::default(), chrono::Utc::now())
//!     .await?;
//!
//! let daily = core.scheduler().load_daily_set(chrono::Utc::now()).await;
//! println!("今日复习 {} 个，新学 {} 个", daily.to_review.len(), daily.to_learn.len());
//! # Ok(())
//! # }
//! ```

// ============================================================
// 模块声明
// ============================================================

pub mod config;
pub mod error;
pub mod logging;
pub mod practice;
pub mod scheduler;
pub mod service;
pub mod storage;
pub mod tracker;

// ============================================================
// 重新导出
// ============================================================

pub use config::{ConfigError, SchedulerConfig};
pub use error::{CoreError, CoreResult};
pub use practice::{PracticeChoice, PracticeRound, PracticeSampler};
pub use scheduler::{DailyScheduler, DailySet, ReviewOutcome};
pub use service::{CoreCell, CorePhase, LearnCore};
pub use storage::{
    Category, Criteria, Cursor, LearnerStats, LearningOverview, LearningState, NewWord,
    SortDirection, SourceLanguage, Storage, StorageError, Translation, Word, WordOrigin,
};
pub use tracker::{Activity, ActivityOutcome, GoalTracker};
