//! 学习者会话模型与会话管理模块。

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use codelab_core::domain::{
    AssignmentId, ChapterId, CourseId, Identity, Language, SectionId, UserId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 编辑器状态。
pub mod editor;
/// 会话管理器实现。
pub mod manager;

pub use editor::{EditorSession, SessionOutcome};
pub use manager::SessionManager;

/// 会话唯一标识。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// 生成新的随机会话 ID。
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for SessionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 会话运行状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// 没有进行中的运行或提交。
    Idle,
    /// 正在运行或提交。
    Busy,
}

/// 会话关联的作业。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentContext {
    pub course_id: CourseId,
    #[serde(default)]
    pub section_id: Option<SectionId>,
    pub chapter_id: ChapterId,
    pub assignment_id: AssignmentId,
    pub task_description: String,
    #[serde(default)]
    pub starter_code: HashMap<Language, String>,
}

/// 会话元数据。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SessionInfo {
    pub id: SessionId,
    pub user_id: UserId,
    pub assignment_id: Option<AssignmentId>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
}

/// 单个学习者会话。编辑器状态由互斥锁保护，运行/提交由忙标志串行化。
pub struct LearnerSession {
    id: SessionId,
    identity: Identity,
    assignment: Option<AssignmentContext>,
    created_at: DateTime<Utc>,
    editor: Mutex<EditorSession>,
    busy: AtomicBool,
    cancel: Mutex<CancellationToken>,
}

impl LearnerSession {
    pub fn new(
        identity: Identity,
        assignment: Option<AssignmentContext>,
        editor: EditorSession,
    ) -> Self {
        Self {
            id: SessionId::new(),
            identity,
            assignment,
            created_at: Utc::now(),
            editor: Mutex::new(editor),
            busy: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn assignment(&self) -> Option<&AssignmentContext> {
        self.assignment.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        if self.busy.load(Ordering::Acquire) {
            SessionStatus::Busy
        } else {
            SessionStatus::Idle
        }
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id.clone(),
            user_id: self.identity.user_id.clone(),
            assignment_id: self
                .assignment
                .as_ref()
                .map(|assignment| assignment.assignment_id.clone()),
            status: self.status(),
            created_at: self.created_at,
        }
    }

    pub async fn editor(&self) -> MutexGuard<'_, EditorSession> {
        self.editor.lock().await
    }

    /// 占用会话；已有运行或提交在进行时返回 `None`。
    pub fn try_begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { flag: &self.busy })
    }

    /// 当前调用使用的取消令牌。
    pub async fn cancellation_token(&self) -> CancellationToken {
        self.cancel.lock().await.clone()
    }

    /// 取消进行中的调用并使其结果失效。之后的调用使用新的令牌。
    pub async fn cancel(&self) {
        {
            let mut token = self.cancel.lock().await;
            token.cancel();
            *token = CancellationToken::new();
        }
        self.editor.lock().await.invalidate();
    }
}

/// 释放时清除忙标志。
pub struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use codelab_core::domain::LanguageTable;

    use super::*;
    use crate::store::MemoryClientStore;

    fn session() -> LearnerSession {
        let identity = Identity::learner(UserId::new("u1"));
        let editor = EditorSession::restore(
            identity.user_id.clone(),
            Arc::new(LanguageTable::builtin()),
            Arc::new(MemoryClientStore::new()),
            HashMap::new(),
        );
        LearnerSession::new(identity, None, editor)
    }

    #[test]
    fn session_id_round_trips_through_string() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().expect("should parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn only_one_call_may_hold_the_session() {
        let session = session();

        let guard = session.try_begin().expect("first call acquires");
        assert_eq!(session.status(), SessionStatus::Busy);
        assert!(session.try_begin().is_none());

        drop(guard);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(session.try_begin().is_some());
    }

    #[tokio::test]
    async fn cancel_fires_old_token_and_installs_fresh_one() {
        let session = session();
        let token = session.cancellation_token().await;
        let generation = session.editor().await.generation();

        session.cancel().await;

        assert!(token.is_cancelled());
        assert!(!session.cancellation_token().await.is_cancelled());
        assert_eq!(session.editor().await.generation(), generation + 1);
    }

    #[test]
    fn assignment_context_accepts_starter_code_by_language_id() {
        let context: AssignmentContext = serde_json::from_str(
            r#"{
                "courseId": "c",
                "chapterId": "ch",
                "assignmentId": "a",
                "taskDescription": "sum two numbers",
                "starterCode": {"python": "def add(a, b):\n    pass\n"}
            }"#,
        )
        .expect("context should deserialize");

        assert!(context.section_id.is_none());
        assert!(context.starter_code.contains_key(&Language::Python));
    }
}
