use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    AssignmentId, ChapterId, CourseId, DomainError, EvaluationVerdict, Language, SectionId,
    SubmissionId, UserId,
};

/// Immutable pairing of a learner's code with its verdict for one assignment.
/// A re-submission is a new record with a new id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub submission_id: SubmissionId,
    pub user_id: UserId,
    pub course_id: CourseId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_id: Option<SectionId>,
    pub chapter_id: ChapterId,
    pub assignment_id: AssignmentId,
    pub language: Language,
    pub source_text: String,
    pub evaluation: EvaluationVerdict,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    /// Checks that every key the record is queried by is present and fits
    /// the stored column width.
    pub fn validate(&self) -> Result<(), DomainError> {
        self.user_id.check("userId")?;
        self.course_id.check("courseId")?;
        if let Some(section_id) = &self.section_id {
            section_id.check("sectionId")?;
        }
        self.chapter_id.check("chapterId")?;
        self.assignment_id.check("assignmentId")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MAX_KEY_LEN, Score};

    fn submission() -> Submission {
        Submission {
            submission_id: SubmissionId::new(),
            user_id: UserId::new("learner-1"),
            course_id: CourseId::new("rust-101"),
            section_id: Some(SectionId::new("basics")),
            chapter_id: ChapterId::new("ownership"),
            assignment_id: AssignmentId::new("borrow-checker"),
            language: Language::Rust,
            source_text: "fn main() {}".to_string(),
            evaluation: EvaluationVerdict::new(true, Score::new(80).expect("score"), "ok"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn complete_submission_is_valid() {
        assert_eq!(submission().validate(), Ok(()));
    }

    #[test]
    fn missing_section_is_allowed() {
        let mut submission = submission();
        submission.section_id = None;
        assert_eq!(submission.validate(), Ok(()));
    }

    #[test]
    fn blank_assignment_is_rejected() {
        let mut submission = submission();
        submission.assignment_id = AssignmentId::new("");

        assert_eq!(
            submission.validate(),
            Err(DomainError::MissingField("assignmentId"))
        );
    }

    #[test]
    fn blank_user_is_reported_first() {
        let mut submission = submission();
        submission.user_id = UserId::new(" ");
        submission.course_id = CourseId::new("");

        assert_eq!(submission.validate(), Err(DomainError::MissingField("userId")));
    }

    #[test]
    fn overlong_assignment_is_rejected() {
        let mut submission = submission();
        submission.assignment_id = AssignmentId::new("x".repeat(MAX_KEY_LEN + 1));

        assert_eq!(
            submission.validate(),
            Err(DomainError::FieldTooLong {
                field: "assignmentId",
                max: MAX_KEY_LEN
            })
        );
    }
}
