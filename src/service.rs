//! 核心服务装配与初始化生命周期
//!
//! 启动数据加载是一个显式的初始化阶段，而不是散落在各处的
//! "首次访问时加载"。[`CoreCell`] 持有类型化的生命周期状态，
//! 调度器等组件在初始化完成后通过构造参数拿到已就绪的存储，
//! 不依赖任何全局可变状态。

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;

use crate::config::SchedulerConfig;
use crate::error::CoreResult;
use crate::practice::PracticeSampler;
use crate::scheduler::DailyScheduler;
use crate::storage::category::CategoryRepository;
use crate::storage::translation::TranslationRepository;
use crate::storage::word::WordRepository;
use crate::storage::Storage;
use crate::tracker::GoalTracker;

// ============================================================
// LearnCore - 已装配的核心
// ============================================================

/// 已装配的学习核心
///
/// 持有存储与全部子系统。所有字段在构造时就绪，
/// 不存在"半初始化"的可观察状态。
pub struct LearnCore {
    storage: Storage,
    scheduler: DailyScheduler,
    tracker: GoalTracker,
    sampler: PracticeSampler,
}

impl LearnCore {
    /// 打开（或创建）数据库并装配核心
    ///
    /// 依次执行：配置校验 → 打开数据库并迁移 → 学习者统计加载
    /// （含跨日清零）→ 装配调度器 / 跟踪器 / 抽样器。
    pub async fn init<P: AsRef<Path>>(
        db_path: P,
        config: SchedulerConfig,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let storage = Storage::new(db_path)?;
        Self::assemble(storage, config, now).await
    }

    /// 基于内存数据库装配核心（测试用）
    pub async fn init_in_memory(config: SchedulerConfig, now: DateTime<Utc>) -> CoreResult<Self> {
        let storage = Storage::in_memory()?;
        Self::assemble(storage, config, now).await
    }

    async fn assemble(
        storage: Storage,
        config: SchedulerConfig,
        now: DateTime<Utc>,
    ) -> CoreResult<Self> {
        let scheduler = DailyScheduler::new(&storage, config)?;
        let tracker = GoalTracker::new(&storage);
        let sampler = PracticeSampler::new(&storage);

        // 启动即应用跨日清零，保证统计行存在且属于"今天"
        let stats = tracker.refresh(now).await?;
        tracing::info!(
            db = storage.db_path(),
            streak = stats.streak_days,
            "学习核心初始化完成"
        );

        Ok(Self {
            storage,
            scheduler,
            tracker,
            sampler,
        })
    }

    /// 调度器
    pub fn scheduler(&self) -> &DailyScheduler {
        &self.scheduler
    }

    /// 目标跟踪器
    pub fn tracker(&self) -> &GoalTracker {
        &self.tracker
    }

    /// 练习抽样器
    pub fn sampler(&self) -> &PracticeSampler {
        &self.sampler
    }

    /// 单词仓储
    pub fn words(&self) -> WordRepository {
        self.storage.words()
    }

    /// 分类仓储
    pub fn categories(&self) -> CategoryRepository {
        self.storage.categories()
    }

    /// 翻译记录仓储
    pub fn translations(&self) -> TranslationRepository {
        self.storage.translations()
    }

    /// 底层存储
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

// ============================================================
// CoreCell - 初始化生命周期
// ============================================================

/// 初始化阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorePhase {
    Uninitialized,
    Loading,
    Ready,
    Failed,
}

enum CellState {
    Uninitialized,
    Loading,
    Ready(Arc<LearnCore>),
    Failed(String),
}

/// 核心的生命周期容器
///
/// 宿主应用持有一个 `CoreCell`，在启动流程中调用
/// [`CoreCell::initialize`]。重复调用幂等地返回已就绪的核心；
/// 初始化失败后允许重试。
pub struct CoreCell {
    state: AsyncMutex<CellState>,
}

impl Default for CoreCell {
    fn default() -> Self {
        Self::new()
    }
}

impl CoreCell {
    /// 创建未初始化的容器
    pub fn new() -> Self {
        Self {
            state: AsyncMutex::new(CellState::Uninitialized),
        }
    }

    /// 当前初始化阶段
    pub async fn phase(&self) -> CorePhase {
        match &*self.state.lock().await {
            CellState::Uninitialized => CorePhase::Uninitialized,
            CellState::Loading => CorePhase::Loading,
            CellState::Ready(_) => CorePhase::Ready,
            CellState::Failed(_) => CorePhase::Failed,
        }
    }

    /// 上次初始化失败的原因
    pub async fn failure(&self) -> Option<String> {
        match &*self.state.lock().await {
            CellState::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    /// 已就绪的核心
    pub async fn get(&self) -> Option<Arc<LearnCore>> {
        match &*self.state.lock().await {
            CellState::Ready(core) => Some(Arc::clone(core)),
            _ => None,
        }
    }

    /// 执行初始化
    ///
    /// 已就绪时直接返回现有核心；失败后可以再次调用重试。
    pub async fn initialize<P: AsRef<Path>>(
        &self,
        db_path: P,
        config: SchedulerConfig,
        now: DateTime<Utc>,
    ) -> CoreResult<Arc<LearnCore>> {
        let mut state = self.state.lock().await;

        if let CellState::Ready(core) = &*state {
            return Ok(Arc::clone(core));
        }

        *state = CellState::Loading;
        match LearnCore::init(db_path, config, now).await {
            Ok(core) => {
                let core = Arc::new(core);
                *state = CellState::Ready(Arc::clone(&core));
                Ok(core)
            }
            Err(e) => {
                *state = CellState::Failed(e.to_string());
                Err(e)
            }
        }
    }
}
