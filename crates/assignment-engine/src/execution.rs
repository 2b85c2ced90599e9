//! 运行控制器：把缓冲区送入沙箱并归一化结果。

use std::sync::Arc;
use std::time::Duration;

use codelab_core::domain::{ExecutionResult, ExecutionStatus, Language, LanguageTable};
use tracing::{info, warn};

use crate::sandbox::{Sandbox, SandboxError, SandboxRequest, SandboxResponse};

pub struct ExecutionController {
    sandbox: Arc<dyn Sandbox>,
    languages: Arc<LanguageTable>,
    timeout: Duration,
}

impl ExecutionController {
    pub fn new(sandbox: Arc<dyn Sandbox>, languages: Arc<LanguageTable>, timeout: Duration) -> Self {
        Self {
            sandbox,
            languages,
            timeout,
        }
    }

    /// 执行一次运行。失败不重试，所有失败都编码在返回结果的状态里。
    #[tracing::instrument(skip(self, source_text), fields(sandbox = %self.sandbox.name()))]
    pub async fn execute(&self, language: Language, source_text: &str) -> ExecutionResult {
        let profile = match self.languages.profile(language) {
            Ok(profile) => profile,
            Err(err) => {
                return ExecutionResult::failed(
                    ExecutionStatus::TransportError,
                    source_text,
                    err.to_string(),
                );
            }
        };

        let request = SandboxRequest::single_file(
            profile.runtime_id.clone(),
            profile.runtime_version.clone(),
            source_text,
        );

        let outcome = match tokio::time::timeout(self.timeout, self.sandbox.execute(&request)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "sandbox call timed out");
                Err(SandboxError::Transport(format!(
                    "execution timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        let result = classify(source_text, outcome);
        info!(status = ?result.status, "execution finished");
        result
    }
}

/// 严格优先级：传输错误 > 编译错误 > 运行错误 > 成功。
pub fn classify(
    source_text: &str,
    outcome: Result<SandboxResponse, SandboxError>,
) -> ExecutionResult {
    let response = match outcome {
        Ok(response) => response,
        Err(err) => {
            return ExecutionResult::failed(
                ExecutionStatus::TransportError,
                source_text,
                err.to_string(),
            );
        }
    };

    if let Some(compile) = response.compile.as_ref().filter(|stage| stage.failed()) {
        return ExecutionResult::failed(
            ExecutionStatus::CompileError,
            source_text,
            compile.diagnostic(),
        );
    }

    if let Some(run) = response.run.as_ref().filter(|stage| stage.failed()) {
        return ExecutionResult::failed(ExecutionStatus::RuntimeError, source_text, run.diagnostic());
    }

    let stdout = response
        .run
        .as_ref()
        .map(|run| run.output.trim())
        .unwrap_or_default();
    ExecutionResult::success(source_text, stdout)
}
