use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codelab_core::domain::{
    AssignmentId, ChapterId, ChapterRecord, ChapterUpdate, CourseId, Submission, SubmissionId,
    UserId,
};
use tokio::sync::RwLock;

use super::{InsertOutcome, ProgressStore, StoreError, SubmissionStore};

type ProgressKey = (UserId, CourseId, ChapterId);

/// 进程内存储实现，用于测试与单机部署。
#[derive(Debug, Default)]
pub struct MemoryStore {
    submissions: RwLock<HashMap<SubmissionId, Submission>>,
    progress: RwLock<HashMap<ProgressKey, ChapterRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submission_count(&self) -> usize {
        self.submissions.read().await.len()
    }
}

fn sorted(mut submissions: Vec<Submission>) -> Vec<Submission> {
    submissions.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.submission_id.cmp(&b.submission_id))
    });
    submissions
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert_if_absent(&self, submission: &Submission) -> Result<InsertOutcome, StoreError> {
        let mut submissions = self.submissions.write().await;
        if submissions.contains_key(&submission.submission_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        submissions.insert(submission.submission_id, submission.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn get(&self, submission_id: SubmissionId) -> Result<Option<Submission>, StoreError> {
        Ok(self.submissions.read().await.get(&submission_id).cloned())
    }

    async fn query_by_assignment(
        &self,
        course_id: &CourseId,
        chapter_id: &ChapterId,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<Submission>, StoreError> {
        let submissions = self.submissions.read().await;
        Ok(sorted(
            submissions
                .values()
                .filter(|s| {
                    &s.course_id == course_id
                        && &s.chapter_id == chapter_id
                        && &s.assignment_id == assignment_id
                })
                .cloned()
                .collect(),
        ))
    }

    async fn query_by_user(
        &self,
        user_id: &UserId,
        course_id: Option<&CourseId>,
    ) -> Result<Vec<Submission>, StoreError> {
        let submissions = self.submissions.read().await;
        Ok(sorted(
            submissions
                .values()
                .filter(|s| &s.user_id == user_id)
                .filter(|s| course_id.is_none_or(|course_id| &s.course_id == course_id))
                .cloned()
                .collect(),
        ))
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get_chapter(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        chapter_id: &ChapterId,
    ) -> Result<Option<ChapterRecord>, StoreError> {
        let key = (user_id.clone(), course_id.clone(), chapter_id.clone());
        Ok(self.progress.read().await.get(&key).cloned())
    }

    async fn update_chapter(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        chapter_id: &ChapterId,
        update: ChapterUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<ChapterRecord, StoreError> {
        let key = (user_id.clone(), course_id.clone(), chapter_id.clone());
        let mut progress = self.progress.write().await;
        let record = progress
            .entry(key)
            .or_insert_with(|| ChapterRecord::new(chapter_id.clone()));
        update.apply(record);
        record.updated_at = updated_at;
        Ok(record.clone())
    }

    async fn query_course(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Vec<ChapterRecord>, StoreError> {
        let progress = self.progress.read().await;
        let mut records: Vec<ChapterRecord> = progress
            .iter()
            .filter(|((user, course, _), _)| user == user_id && course == course_id)
            .map(|(_, record)| record.clone())
            .collect();
        records.sort_by(|a, b| a.chapter_id.cmp(&b.chapter_id));
        Ok(records)
    }
}
