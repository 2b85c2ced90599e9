use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Success,
    CompileError,
    RuntimeError,
    TransportError,
}

/// Normalized outcome of one sandbox run. Output and error message are
/// mutually exclusive: a failed run carries no stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub source_text: String,
    pub stdout: String,
    pub message: Option<String>,
    pub status: ExecutionStatus,
}

impl ExecutionResult {
    pub fn success(source_text: impl Into<String>, stdout: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            stdout: stdout.into(),
            message: None,
            status: ExecutionStatus::Success,
        }
    }

    pub fn failed(
        status: ExecutionStatus,
        source_text: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source_text: source_text.into(),
            stdout: String::new(),
            message: Some(message.into()),
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_result_has_no_message() {
        let result = ExecutionResult::success("print(1)", "1");

        assert_eq!(result.status, ExecutionStatus::Success);
        assert_eq!(result.stdout, "1");
        assert!(result.message.is_none());
    }

    #[test]
    fn failed_result_has_no_stdout() {
        let result = ExecutionResult::failed(
            ExecutionStatus::CompileError,
            "int main(",
            "expected ')'",
        );

        assert_eq!(result.status, ExecutionStatus::CompileError);
        assert!(result.stdout.is_empty());
        assert_eq!(result.message.as_deref(), Some("expected ')'"));
    }
}
