//! Piston 兼容沙箱客户端。
//!
//! 通过 HTTP `POST {base_url}/execute` 提交源文件，
//! 响应中包含可选的 `compile` 与 `run` 阶段报告。

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use super::{Sandbox, SandboxError, SandboxRequest, SandboxResponse};

/// 沙箱在 4xx/5xx 响应体中返回的错误结构。
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct PistonSandbox {
    client: Client,
    base_url: String,
}

impl PistonSandbox {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn execute_url(&self) -> String {
        format!("{}/execute", self.base_url)
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<ErrorBody>(body)
            .map(|error| error.message)
            .unwrap_or_else(|_| body.trim().to_string())
    }
}

#[async_trait::async_trait]
impl Sandbox for PistonSandbox {
    fn name(&self) -> &str {
        "piston"
    }

    #[tracing::instrument(skip(self, request), fields(language = %request.language, version = %request.version))]
    async fn execute(&self, request: &SandboxRequest) -> Result<SandboxResponse, SandboxError> {
        let response = self
            .client
            .post(self.execute_url())
            .json(request)
            .send()
            .await
            .map_err(|e| SandboxError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SandboxError::Status {
                status: status.as_u16(),
                message: Self::error_message(&body),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SandboxError::Transport(e.to_string()))?;
        debug!(bytes = body.len(), "sandbox response received");

        serde_json::from_str(&body).map_err(|e| SandboxError::Decode(e.to_string()))
    }
}
