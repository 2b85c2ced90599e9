use serde::{Deserialize, Serialize};

use super::Score;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriterionFeedback {
    pub criterion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
    #[serde(default)]
    pub comment: String,
}

/// Structured grading outcome. `passed` is the grader's own judgment and is
/// never recomputed from `score`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationVerdict {
    pub passed: bool,
    pub score: Score,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_criterion_feedback: Option<Vec<CriterionFeedback>>,
}

impl EvaluationVerdict {
    pub fn new(passed: bool, score: Score, explanation: impl Into<String>) -> Self {
        Self {
            passed,
            score,
            explanation: explanation.into(),
            per_criterion_feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: Vec<CriterionFeedback>) -> Self {
        self.per_criterion_feedback = Some(feedback);
        self
    }
}
