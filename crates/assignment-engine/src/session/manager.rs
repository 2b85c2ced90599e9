use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::{EngineError, EngineEvent, EventBroadcaster, LearnerSession, Result, SessionId, SessionInfo};

/// 会话生命周期管理器。
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<LearnerSession>>>>,
    event_broadcaster: Arc<EventBroadcaster>,
}

impl SessionManager {
    /// 创建会话管理器。
    pub fn new(event_broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            event_broadcaster,
        }
    }

    /// 登记一个新会话。
    #[tracing::instrument(skip(self, session), fields(session_id = %session.id()))]
    pub async fn insert(&self, session: LearnerSession) -> SessionInfo {
        let session = Arc::new(session);
        let info = session.info();

        info!(
            user_id = %info.user_id,
            assignment_id = ?info.assignment_id,
            "opening session"
        );

        let mut sessions = self.sessions.write().await;
        sessions.insert(info.id.clone(), session);
        drop(sessions);

        self.event_broadcaster.emit(EngineEvent::SessionOpened {
            session_id: info.id.clone(),
            user_id: info.user_id.clone(),
        });

        info
    }

    /// 查询指定会话，找不到时返回错误。
    pub async fn require(&self, session_id: &SessionId) -> Result<Arc<LearnerSession>> {
        self.get(session_id)
            .await
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))
    }

    /// 查询指定会话。
    pub async fn get(&self, session_id: &SessionId) -> Option<Arc<LearnerSession>> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    /// 关闭并移除指定会话，进行中的调用被取消。
    #[tracing::instrument(skip(self))]
    pub async fn close(&self, session_id: &SessionId) -> Result<()> {
        info!(session_id = %session_id, "closing session");

        let session = {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(session_id)
                .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?
        };

        session.cancel().await;
        self.event_broadcaster.emit(EngineEvent::SessionClosed {
            session_id: session_id.clone(),
        });

        Ok(())
    }

    /// 列出当前所有会话。
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.read().await;
        sessions.values().map(|session| session.info()).collect()
    }
}
