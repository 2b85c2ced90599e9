use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid score: {0}. score must be in [0, 100]")]
    InvalidScore(u16),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("field {field} exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },
    #[error("unknown language: {0}")]
    UnknownLanguage(String),
}
