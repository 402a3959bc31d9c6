//! 核心错误类型定义
//!
//! 调度器、练习抽样器和服务层统一使用 [`CoreError`]。
//! 存储层内部使用 [`crate::storage::StorageError`]，跨层传播时
//! 会被映射到这里的错误分类。

use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// 核心错误类型
#[derive(Error, Debug)]
pub enum CoreError {
    /// 状态机前置条件被违反（例如复习一个尚未开始学习的单词）
    #[error("无效的状态转换: {0}")]
    InvalidTransition(String),

    /// 查询条件或分页参数不合法
    #[error("无效的查询条件: {0}")]
    InvalidCriteria(String),

    /// 后端存储不可达或写入失败
    #[error("存储不可用: {0}")]
    RepositoryUnavailable(StorageError),

    /// 练习抽样的候选池太小
    #[error("候选池不足: 需要至少 {needed} 个互不相同的词，实际 {actual} 个")]
    InsufficientPool { needed: usize, actual: usize },

    /// 调度参数配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<StorageError> for CoreError {
    fn from(e: StorageError) -> Self {
        match e {
            // InvalidCriteria 属于调用方契约错误，保持原有分类
            StorageError::InvalidCriteria(msg) => CoreError::InvalidCriteria(msg),
            other => CoreError::RepositoryUnavailable(other),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_criteria_is_preserved_across_layers() {
        let storage_err = StorageError::InvalidCriteria("limit 为负数".to_string());
        let core_err = CoreError::from(storage_err);
        assert!(matches!(core_err, CoreError::InvalidCriteria(_)));
    }

    #[test]
    fn test_database_error_maps_to_repository_unavailable() {
        let storage_err = StorageError::LockError("poisoned".to_string());
        let core_err = CoreError::from(storage_err);
        assert!(matches!(core_err, CoreError::RepositoryUnavailable(_)));
    }
}
