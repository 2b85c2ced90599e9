//! OpenAI 兼容的 chat completion 评测客户端。

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Grader, GraderError, GradingPrompt};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatCompletionGrader {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl ChatCompletionGrader {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.0,
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn request_body<'a>(&'a self, prompt: &'a GradingPrompt) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
        }
    }

    fn reply_text(body: &str) -> Result<String, GraderError> {
        let response: ChatResponse =
            serde_json::from_str(body).map_err(|e| GraderError::Decode(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GraderError::EmptyReply)
    }
}

#[async_trait::async_trait]
impl Grader for ChatCompletionGrader {
    fn name(&self) -> &str {
        &self.model
    }

    #[tracing::instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &GradingPrompt) -> Result<String, GraderError> {
        let mut request = self
            .client
            .post(self.completions_url())
            .json(&self.request_body(prompt));
        if let Some(api_key) = self.api_key.as_deref() {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GraderError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GraderError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(GraderError::Status {
                status: status.as_u16(),
                message: body.trim().to_string(),
            });
        }

        debug!(bytes = body.len(), "grader response received");
        Self::reply_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> GradingPrompt {
        GradingPrompt {
            system: "grade strictly".to_string(),
            user: "task + code".to_string(),
        }
    }

    #[test]
    fn request_body_has_system_and_user_messages() {
        let grader = ChatCompletionGrader::new("http://localhost:8080/v1/", "grader-small")
            .with_temperature(0.2);
        let prompt = prompt();

        let value = serde_json::to_value(grader.request_body(&prompt)).expect("serialize");

        assert_eq!(grader.completions_url(), "http://localhost:8080/v1/chat/completions");
        assert_eq!(value["model"], "grader-small");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][0]["content"], "grade strictly");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["messages"][1]["content"], "task + code");
    }

    #[test]
    fn reply_text_reads_first_choice() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"passed\":true}"}}]}"#;
        assert_eq!(
            ChatCompletionGrader::reply_text(body),
            Ok(r#"{"passed":true}"#.to_string())
        );
    }

    #[test]
    fn empty_choices_is_an_empty_reply() {
        assert_eq!(
            ChatCompletionGrader::reply_text(r#"{"choices":[]}"#),
            Err(GraderError::EmptyReply)
        );
        assert_eq!(
            ChatCompletionGrader::reply_text(r#"{"choices":[{"message":{"content":null}}]}"#),
            Err(GraderError::EmptyReply)
        );
    }

    #[test]
    fn non_json_body_is_a_decode_error() {
        assert!(matches!(
            ChatCompletionGrader::reply_text("<html>"),
            Err(GraderError::Decode(_))
        ));
    }
}
