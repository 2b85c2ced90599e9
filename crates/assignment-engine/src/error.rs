use thiserror::Error;

use codelab_core::domain::DomainError;

use crate::evaluation::EvaluationError;
use crate::recorder::RecordError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("会话未找到: {0}")]
    SessionNotFound(String),

    #[error("会话正忙: {0}")]
    SessionBusy(String),

    #[error("请求已取消")]
    Cancelled,

    #[error("会话未关联作业")]
    NoAssignment,

    #[error("权限不足: {0}")]
    Forbidden(String),

    #[error("领域错误: {0}")]
    Domain(#[from] DomainError),

    #[error("评测错误: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("提交记录错误: {0}")]
    Record(#[from] RecordError),

    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
