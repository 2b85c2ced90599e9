//! 代码执行沙箱抽象层。
//!
//! 不可信代码的实际执行委托给外部沙箱服务，引擎只依赖这里定义的
//! 请求/响应形状。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod piston;

pub use piston::PistonSandbox;

/// 发往沙箱的执行请求：目标运行时与单个源文件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SandboxRequest {
    pub language: String,
    pub version: String,
    pub files: Vec<SandboxFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SandboxFile {
    pub content: String,
}

impl SandboxRequest {
    pub fn single_file(
        language: impl Into<String>,
        version: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            language: language.into(),
            version: version.into(),
            files: vec![SandboxFile {
                content: content.into(),
            }],
        }
    }
}

/// 沙箱响应。解释型语言没有 `compile` 阶段。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SandboxResponse {
    #[serde(default)]
    pub compile: Option<StageReport>,
    #[serde(default)]
    pub run: Option<StageReport>,
}

/// 单个阶段（编译或运行）的报告。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StageReport {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub signal: Option<String>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub output: String,
}

impl StageReport {
    /// 退出码缺失（例如被信号终止）同样视为失败。
    pub fn failed(&self) -> bool {
        self.code != Some(0)
    }

    /// 失败信息：优先 stderr，其次合并输出。
    pub fn diagnostic(&self) -> &str {
        if self.stderr.trim().is_empty() {
            &self.output
        } else {
            &self.stderr
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SandboxError {
    #[error("sandbox request failed: {0}")]
    Transport(String),
    #[error("sandbox returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("sandbox response could not be decoded: {0}")]
    Decode(String),
}

/// 沙箱执行接口。
#[async_trait]
pub trait Sandbox: Send + Sync {
    /// 返回沙箱名称，用于日志。
    fn name(&self) -> &str;

    /// 执行一次请求。只报告传输层面的失败；编译/运行失败在响应内描述。
    async fn execute(&self, request: &SandboxRequest) -> Result<SandboxResponse, SandboxError>;
}
