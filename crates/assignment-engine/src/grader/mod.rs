//! AI 评测服务抽象层。
//!
//! 评测服务被视为不透明的判定方：引擎只负责构造提示词、
//! 传输调用与回复解析，不对判定结果做任何复核。

use async_trait::async_trait;
use thiserror::Error;

pub mod chat;
pub mod extract;

pub use chat::ChatCompletionGrader;
pub use extract::json_object_candidates;

/// 发送给评测服务的提示词。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingPrompt {
    /// 系统指令。
    pub system: String,
    /// 包含任务描述与代码的用户消息。
    pub user: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraderError {
    #[error("grader request failed: {0}")]
    Transport(String),
    #[error("grader returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("grader response could not be decoded: {0}")]
    Decode(String),
    #[error("grader returned an empty reply")]
    EmptyReply,
}

/// 评测服务接口。
#[async_trait]
pub trait Grader: Send + Sync {
    /// 返回评测服务名称，用于日志。
    fn name(&self) -> &str;

    /// 发送提示词并返回模型的原始文本回复。
    async fn complete(&self, prompt: &GradingPrompt) -> Result<String, GraderError>;
}
