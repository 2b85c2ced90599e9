//! 评测控制器：把缓冲区与作业描述送入 AI 评测服务并解析结构化判定。

use std::sync::Arc;
use std::time::Duration;

use codelab_core::domain::{CriterionFeedback, EvaluationVerdict, Language, LanguageTable, Score};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::grader::{Grader, GradingPrompt, json_object_candidates};

const SYSTEM_PROMPT: &str = "You are a strict programming instructor grading a learner's \
assignment submission. Judge only whether the code solves the task as described. \
Respond with a single JSON object and nothing else.";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("grading service unavailable: {0}")]
    GradingService(String),
    #[error("malformed verdict: {0}")]
    MalformedVerdict(String),
}

/// 评测服务返回的原始判定，字段存在性与类型在此严格校验。
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerdict {
    passed: bool,
    score: f64,
    explanation: String,
    #[serde(default, alias = "per_criterion_feedback")]
    per_criterion_feedback: Option<Vec<CriterionFeedback>>,
}

impl From<RawVerdict> for EvaluationVerdict {
    fn from(raw: RawVerdict) -> Self {
        EvaluationVerdict {
            passed: raw.passed,
            score: Score::clamped(raw.score),
            explanation: raw.explanation,
            per_criterion_feedback: raw.per_criterion_feedback,
        }
    }
}

pub struct EvaluationController {
    grader: Arc<dyn Grader>,
    languages: Arc<LanguageTable>,
    timeout: Duration,
}

impl EvaluationController {
    pub fn new(grader: Arc<dyn Grader>, languages: Arc<LanguageTable>, timeout: Duration) -> Self {
        Self {
            grader,
            languages,
            timeout,
        }
    }

    /// 评测一次提交。每次调用相互独立，同一份代码可能得到不同判定。
    #[tracing::instrument(skip(self, source_text, task_description), fields(grader = %self.grader.name()))]
    pub async fn evaluate(
        &self,
        language: Language,
        source_text: &str,
        task_description: &str,
    ) -> Result<EvaluationVerdict, EvaluationError> {
        let prompt = self.build_prompt(language, source_text, task_description);

        let reply = match tokio::time::timeout(self.timeout, self.grader.complete(&prompt)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                warn!(error = %err, "grading service call failed");
                return Err(EvaluationError::GradingService(err.to_string()));
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "grading service call timed out");
                return Err(EvaluationError::GradingService(format!(
                    "evaluation timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let verdict = parse_verdict(&reply)?;
        info!(
            passed = verdict.passed,
            score = verdict.score.value(),
            "evaluation finished"
        );
        Ok(verdict)
    }

    pub fn build_prompt(
        &self,
        language: Language,
        source_text: &str,
        task_description: &str,
    ) -> GradingPrompt {
        let display_name = self
            .languages
            .get(language)
            .map(|profile| profile.display_name.as_str())
            .unwrap_or(language.as_str());

        let user = format!(
            "Task description:\n{task}\n\n\
             Submitted {display_name} code:\n```{fence}\n{code}\n```\n\n\
             Evaluate whether the code correctly and completely solves the task.\n\
             Respond with JSON of exactly this shape:\n\
             {{\"passed\": boolean, \"score\": integer from 0 to 100, \"explanation\": string, \
             \"perCriterionFeedback\": [{{\"criterion\": string, \"passed\": boolean, \"comment\": string}}]}}",
            task = task_description.trim(),
            fence = language.as_str(),
            code = source_text.trim_end(),
        );

        GradingPrompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

/// 从回复中定位并解析判定。无法解析时整个评测视为失败。
pub fn parse_verdict(reply: &str) -> Result<EvaluationVerdict, EvaluationError> {
    let candidates = json_object_candidates(reply);
    if candidates.is_empty() {
        return Err(EvaluationError::MalformedVerdict(
            "no JSON object found in grader reply".to_string(),
        ));
    }

    let mut last_error = None;
    for candidate in candidates {
        match serde_json::from_str::<RawVerdict>(candidate) {
            Ok(raw) => return Ok(raw.into()),
            Err(err) => last_error = Some(err.to_string()),
        }
    }

    Err(EvaluationError::MalformedVerdict(
        last_error.unwrap_or_else(|| "unparsable verdict".to_string()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_wrapped_verdict_is_extracted_and_clamped() {
        let verdict = parse_verdict(
            r#"Sure! {"passed":true,"score":120,"explanation":"excellent work"}"#,
        )
        .expect("verdict should parse");

        assert!(verdict.passed);
        assert_eq!(verdict.score.value(), 100);
        assert_eq!(verdict.explanation, "excellent work");
        assert!(verdict.per_criterion_feedback.is_none());
    }

    #[test]
    fn passed_is_not_recomputed_from_score() {
        let verdict =
            parse_verdict(r#"{"passed":false,"score":95,"explanation":"ignores edge case"}"#)
                .expect("verdict should parse");

        assert!(!verdict.passed);
        assert_eq!(verdict.score.value(), 95);
    }

    #[test]
    fn negative_and_fractional_scores_are_normalized() {
        let low = parse_verdict(r#"{"passed":false,"score":-3,"explanation":"x"}"#).expect("low");
        let frac = parse_verdict(r#"{"passed":true,"score":72.5,"explanation":"x"}"#).expect("frac");

        assert_eq!(low.score.value(), 0);
        assert_eq!(frac.score.value(), 73);
    }

    #[test]
    fn criterion_feedback_is_kept() {
        let verdict = parse_verdict(
            r#"```json
{"passed":true,"score":80,"explanation":"ok","perCriterionFeedback":[{"criterion":"style","passed":false,"comment":"long lines"}]}
```"#,
        )
        .expect("verdict should parse");

        let feedback = verdict.per_criterion_feedback.expect("feedback");
        assert_eq!(feedback.len(), 1);
        assert_eq!(feedback[0].criterion, "style");
        assert_eq!(feedback[0].passed, Some(false));
    }

    #[test]
    fn missing_field_is_malformed() {
        let err = parse_verdict(r#"{"passed":true,"explanation":"no score"}"#)
            .expect_err("missing score should fail");

        assert!(matches!(err, EvaluationError::MalformedVerdict(_)));
    }

    #[test]
    fn wrong_type_is_malformed() {
        let err = parse_verdict(r#"{"passed":"yes","score":50,"explanation":"x"}"#)
            .expect_err("string passed should fail");

        assert!(matches!(err, EvaluationError::MalformedVerdict(_)));
    }

    #[test]
    fn reply_without_json_is_malformed() {
        let err = parse_verdict("I cannot grade this.").expect_err("no json");
        assert_eq!(
            err,
            EvaluationError::MalformedVerdict("no JSON object found in grader reply".to_string())
        );
    }

    #[test]
    fn later_valid_candidate_is_used() {
        let verdict = parse_verdict(
            r#"Example shape: {"note":"ignore"} Actual: {"passed":true,"score":60,"explanation":"fine"}"#,
        )
        .expect("second candidate should parse");

        assert_eq!(verdict.score.value(), 60);
    }

    struct SilentGrader;

    #[async_trait::async_trait]
    impl Grader for SilentGrader {
        fn name(&self) -> &str {
            "silent"
        }

        async fn complete(&self, _prompt: &GradingPrompt) -> Result<String, crate::grader::GraderError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn grader_timeout_is_a_grading_service_error() {
        let controller = EvaluationController::new(
            Arc::new(SilentGrader),
            Arc::new(LanguageTable::builtin()),
            Duration::from_secs(60),
        );

        let err = controller
            .evaluate(Language::Rust, "fn main() {}", "Do nothing.")
            .await
            .expect_err("grader never answers");

        assert_eq!(
            err,
            EvaluationError::GradingService("evaluation timed out after 60s".to_string())
        );
    }

    #[test]
    fn prompt_fences_code_by_language() {
        struct Unused;

        #[async_trait::async_trait]
        impl Grader for Unused {
            fn name(&self) -> &str {
                "unused"
            }

            async fn complete(&self, _prompt: &GradingPrompt) -> Result<String, crate::grader::GraderError> {
                unreachable!("prompt building does not call the grader")
            }
        }

        let controller = EvaluationController::new(
            Arc::new(Unused),
            Arc::new(LanguageTable::builtin()),
            Duration::from_secs(1),
        );

        let prompt = controller.build_prompt(
            Language::Cpp,
            "int main() { return 0; }\n",
            "  Return zero.  ",
        );

        assert!(prompt.system.contains("single JSON object"));
        assert!(prompt.user.starts_with("Task description:\nReturn zero.\n"));
        assert!(prompt.user.contains("Submitted C++ code:\n```cpp\nint main() { return 0; }\n```"));
        assert!(prompt.user.contains("\"perCriterionFeedback\""));
    }
}
