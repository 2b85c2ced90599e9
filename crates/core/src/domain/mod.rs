mod course;
mod error;
mod evaluation;
mod execution;
mod identity;
mod ids;
mod language;
mod progress;
mod score;
mod submission;

pub use course::{ChapterOutline, CourseOutline, SectionOutline};
pub use error::DomainError;
pub use evaluation::{CriterionFeedback, EvaluationVerdict};
pub use execution::{ExecutionResult, ExecutionStatus};
pub use identity::{Identity, Role};
pub use ids::{AssignmentId, ChapterId, CourseId, MAX_KEY_LEN, SectionId, SubmissionId, UserId};
pub use language::{Language, LanguageProfile, LanguageTable};
pub use progress::{
    ChapterProgress, ChapterRecord, ChapterState, ChapterUpdate, CourseProgress, LearnerActivity,
    SectionProgress, overall_progress,
};
pub use score::Score;
pub use submission::Submission;
