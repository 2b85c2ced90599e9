//! 学习进度聚合器。
//!
//! 章节状态：`NotStarted → InProgress → Completed`，显式"标记完成/未完成"
//! 在 `InProgress` 与 `Completed` 之间切换。显式完成标记是权威状态；
//! 作业提交检查作为独立信号随进度一起返回，不阻止完成。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use codelab_core::domain::{
    ChapterId, ChapterProgress, ChapterRecord, ChapterUpdate, CourseId, CourseOutline,
    CourseProgress, LearnerActivity, UserId,
};
use tracing::info;

use crate::store::{ProgressStore, StoreError, SubmissionStore, retry_once};

pub struct ProgressAggregator {
    progress: Arc<dyn ProgressStore>,
    submissions: Arc<dyn SubmissionStore>,
    retry_backoff: Duration,
}

impl ProgressAggregator {
    pub fn new(
        progress: Arc<dyn ProgressStore>,
        submissions: Arc<dyn SubmissionStore>,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            progress,
            submissions,
            retry_backoff,
        }
    }

    pub async fn mark_chapter_complete(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        chapter_id: &ChapterId,
    ) -> Result<ChapterRecord, StoreError> {
        self.update_chapter(user_id, course_id, chapter_id, ChapterUpdate::Completed(true))
            .await
    }

    pub async fn mark_chapter_incomplete(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        chapter_id: &ChapterId,
    ) -> Result<ChapterRecord, StoreError> {
        self.update_chapter(user_id, course_id, chapter_id, ChapterUpdate::Completed(false))
            .await
    }

    pub async fn mark_quiz_complete(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        chapter_id: &ChapterId,
    ) -> Result<ChapterRecord, StoreError> {
        self.update_chapter(user_id, course_id, chapter_id, ChapterUpdate::QuizCompleted)
            .await
    }

    /// 单列更新，由存储原子地应用。没有记录时创建，写入本身即构成章节活动。
    #[tracing::instrument(skip(self))]
    async fn update_chapter(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        chapter_id: &ChapterId,
        update: ChapterUpdate,
    ) -> Result<ChapterRecord, StoreError> {
        let updated_at = Utc::now();
        let record = retry_once(self.retry_backoff, "update_chapter", || {
            self.progress
                .update_chapter(user_id, course_id, chapter_id, update, updated_at)
        })
        .await?;

        info!(
            completed = record.completed,
            quiz_completed = record.quiz_completed,
            "chapter progress updated"
        );
        Ok(record)
    }

    /// 每次调用都重新读取存储并计算，不做缓存。
    pub async fn course_progress(
        &self,
        user_id: &UserId,
        outline: &CourseOutline,
    ) -> Result<CourseProgress, StoreError> {
        let course_id = &outline.course_id;

        let records = retry_once(self.retry_backoff, "query_course", || {
            self.progress.query_course(user_id, course_id)
        })
        .await?;
        let submissions = retry_once(self.retry_backoff, "query_by_user", || {
            self.submissions.query_by_user(user_id, Some(course_id))
        })
        .await?;

        let activity = LearnerActivity::from_submissions(&submissions);
        Ok(CourseProgress::project(
            user_id.clone(),
            outline,
            &records,
            &activity,
        ))
    }

    /// 单个章节的进度；章节不在大纲中时返回 `None`。
    pub async fn chapter_progress(
        &self,
        user_id: &UserId,
        outline: &CourseOutline,
        chapter_id: &ChapterId,
    ) -> Result<Option<ChapterProgress>, StoreError> {
        let Some((_, chapter)) = outline.find_chapter(chapter_id) else {
            return Ok(None);
        };

        let course_id = &outline.course_id;
        let record = retry_once(self.retry_backoff, "get_chapter", || {
            self.progress.get_chapter(user_id, course_id, chapter_id)
        })
        .await?;
        let submissions = retry_once(self.retry_backoff, "query_by_user", || {
            self.submissions.query_by_user(user_id, Some(course_id))
        })
        .await?;

        let activity = LearnerActivity::from_submissions(&submissions);
        Ok(Some(ChapterProgress::derive(
            chapter,
            record.as_ref(),
            &activity,
        )))
    }
}
