use codelab_core::domain::{AssignmentId, ExecutionStatus, Language, SubmissionId, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::session::SessionId;

/// 引擎对外广播的事件类型。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    /// 学习者会话已打开。
    SessionOpened {
        session_id: SessionId,
        user_id: UserId,
    },
    /// 一次运行已完成（包括失败的运行）。
    RunFinished {
        session_id: SessionId,
        language: Language,
        status: ExecutionStatus,
    },
    /// 运行在结果返回前被取消。
    RunCancelled { session_id: SessionId },
    /// 提交在评测返回前被取消，未写入记录。
    SubmissionCancelled { session_id: SessionId },
    /// 提交已评测并持久化。
    SubmissionRecorded {
        session_id: SessionId,
        submission_id: SubmissionId,
        assignment_id: AssignmentId,
        passed: bool,
        score: u16,
    },
    /// 评测服务调用失败，提交未被记录。
    EvaluationFailed {
        session_id: SessionId,
        /// 错误描述。
        error: String,
    },
    /// 会话已关闭。
    SessionClosed { session_id: SessionId },
}

/// 基于 `tokio::broadcast` 的事件广播器。
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBroadcaster {
    /// 创建事件广播器。
    ///
    /// `capacity` 表示内部广播队列容量。
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 广播一个事件。没有订阅者时事件被丢弃。
    pub fn emit(&self, event: EngineEvent) {
        let _ = self.sender.send(event);
    }

    /// 订阅事件流。
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }
}

/// 事件接收流包装器。
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<EngineEvent>,
}

impl EventStream {
    /// 异步接收下一条事件。
    ///
    /// 接收方落后时返回 `RecvError::Lagged`，之后仍可继续接收较新的事件。
    pub async fn recv(&mut self) -> Result<EngineEvent, RecvError> {
        self.receiver.recv().await
    }

    /// 非阻塞尝试接收一条事件。
    pub fn try_recv(&mut self) -> Result<EngineEvent, TryRecvError> {
        self.receiver.try_recv()
    }
}
