//! 提交记录器：持久化 (代码, 判定) 对，只追加不修改。

use std::sync::Arc;
use std::time::Duration;

use codelab_core::domain::{
    AssignmentId, ChapterId, CourseId, DomainError, Submission, SubmissionId, UserId,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::store::{InsertOutcome, StoreError, SubmissionStore, retry_once};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("validation failed: {0}")]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 写入确认。重复的 `submission_id` 视为成功但不覆盖原记录。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Recorded,
    Duplicate,
}

pub struct SubmissionRecorder {
    store: Arc<dyn SubmissionStore>,
    retry_backoff: Duration,
}

impl SubmissionRecorder {
    pub fn new(store: Arc<dyn SubmissionStore>, retry_backoff: Duration) -> Self {
        Self {
            store,
            retry_backoff,
        }
    }

    /// 校验并写入一条提交。整条记录一次写入，不存在部分提交。
    #[tracing::instrument(skip(self, submission), fields(submission_id = %submission.submission_id))]
    pub async fn record(&self, submission: &Submission) -> Result<Ack, RecordError> {
        submission.validate()?;

        let outcome = retry_once(self.retry_backoff, "insert_submission", || {
            self.store.insert_if_absent(submission)
        })
        .await?;

        match outcome {
            InsertOutcome::Inserted => {
                info!(
                    user_id = %submission.user_id,
                    assignment_id = %submission.assignment_id,
                    passed = submission.evaluation.passed,
                    score = submission.evaluation.score.value(),
                    "submission recorded"
                );
                Ok(Ack::Recorded)
            }
            InsertOutcome::AlreadyExists => {
                warn!("duplicate submission id, keeping existing record");
                Ok(Ack::Duplicate)
            }
        }
    }

    pub async fn get(&self, submission_id: SubmissionId) -> Result<Option<Submission>, StoreError> {
        retry_once(self.retry_backoff, "get_submission", || {
            self.store.get(submission_id)
        })
        .await
    }

    pub async fn by_assignment(
        &self,
        course_id: &CourseId,
        chapter_id: &ChapterId,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<Submission>, StoreError> {
        retry_once(self.retry_backoff, "query_by_assignment", || {
            self.store
                .query_by_assignment(course_id, chapter_id, assignment_id)
        })
        .await
    }

    pub async fn by_user(
        &self,
        user_id: &UserId,
        course_id: Option<&CourseId>,
    ) -> Result<Vec<Submission>, StoreError> {
        retry_once(self.retry_backoff, "query_by_user", || {
            self.store.query_by_user(user_id, course_id)
        })
        .await
    }

    /// 学习者对某作业的最近一次提交。
    pub async fn latest_for(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        assignment_id: &AssignmentId,
    ) -> Result<Option<Submission>, StoreError> {
        let submissions = self.by_user(user_id, Some(course_id)).await?;
        Ok(submissions
            .into_iter()
            .filter(|submission| &submission.assignment_id == assignment_id)
            .max_by_key(|submission| submission.created_at))
    }
}
