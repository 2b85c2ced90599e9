//! 持久化抽象层。
//!
//! 引擎只依赖键/范围键语义的 get/put/query 操作，
//! 提交记录与学习进度之间不假设任何事务。

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use codelab_core::domain::{
    AssignmentId, ChapterId, ChapterRecord, ChapterUpdate, CourseId, Submission, SubmissionId,
    UserId,
};
use thiserror::Error;
use tracing::warn;

pub mod client;
pub mod memory;

pub use client::{ClientStore, JsonFileClientStore, MemoryClientStore};
pub use memory::MemoryStore;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("transient storage failure: {0}")]
    Transient(String),
    #[error("storage failure: {0}")]
    Permanent(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// 只追加的提交记录存储，不提供更新与删除。
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// 按 `submission_id` 写入；已存在时不覆盖。
    async fn insert_if_absent(&self, submission: &Submission) -> Result<InsertOutcome, StoreError>;

    async fn get(&self, submission_id: SubmissionId) -> Result<Option<Submission>, StoreError>;

    /// 按作业查询，结果按创建时间升序。
    async fn query_by_assignment(
        &self,
        course_id: &CourseId,
        chapter_id: &ChapterId,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<Submission>, StoreError>;

    /// 按学习者查询；`course_id` 为 `Some` 时限定在该课程内。
    async fn query_by_user(
        &self,
        user_id: &UserId,
        course_id: Option<&CourseId>,
    ) -> Result<Vec<Submission>, StoreError>;
}

/// 章节进度存储，以 (学习者, 课程) 为范围键。
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get_chapter(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        chapter_id: &ChapterId,
    ) -> Result<Option<ChapterRecord>, StoreError>;

    /// 只写入 `update` 涉及的列与 `updated_at`；记录不存在时先创建。返回写入后的记录。
    async fn update_chapter(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        chapter_id: &ChapterId,
        update: ChapterUpdate,
        updated_at: DateTime<Utc>,
    ) -> Result<ChapterRecord, StoreError>;

    async fn query_course(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Vec<ChapterRecord>, StoreError>;
}

/// 执行一次存储操作；遇到瞬时错误时等待 `backoff` 后重试一次。
pub async fn retry_once<T, F, Fut>(
    backoff: Duration,
    operation: &'static str,
    mut op: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    match op().await {
        Err(err) if err.is_transient() => {
            warn!(
                operation,
                error = %err,
                backoff_ms = backoff.as_millis() as u64,
                "transient storage error, retrying once"
            );
            tokio::time::sleep(backoff).await;
            op().await
        }
        other => other,
    }
}
