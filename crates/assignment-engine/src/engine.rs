use std::sync::Arc;

use chrono::Utc;
use codelab_core::domain::{
    AssignmentId, ChapterId, ChapterProgress, ChapterRecord, CourseId, CourseOutline,
    CourseProgress, ExecutionResult, Identity, Language, LanguageProfile, LanguageTable,
    Submission, SubmissionId,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::evaluation::EvaluationController;
use crate::execution::ExecutionController;
use crate::grader::{ChatCompletionGrader, Grader};
use crate::progress::ProgressAggregator;
use crate::recorder::SubmissionRecorder;
use crate::sandbox::{PistonSandbox, Sandbox};
use crate::session::{AssignmentContext, SessionStatus};
use crate::store::{
    ClientStore, JsonFileClientStore, MemoryClientStore, ProgressStore, SubmissionStore,
};
use crate::{
    EditorSession, EngineConfig, EngineError, EngineEvent, EventBroadcaster, EventStream,
    LearnerSession, Result, SessionId, SessionInfo, SessionManager, SessionOutcome,
};

/// 引擎依赖的外部协作方。
pub struct Backends {
    pub sandbox: Arc<dyn Sandbox>,
    pub grader: Arc<dyn Grader>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub progress: Arc<dyn ProgressStore>,
    pub client_store: Arc<dyn ClientStore>,
}

impl Backends {
    /// 按配置创建 HTTP 沙箱与评测服务客户端，存储由调用方提供。
    pub fn from_config(
        config: &EngineConfig,
        submissions: Arc<dyn SubmissionStore>,
        progress: Arc<dyn ProgressStore>,
    ) -> Self {
        let sandbox = PistonSandbox::new(config.sandbox.base_url.clone());
        let grader = ChatCompletionGrader::new(
            config.grader.base_url.clone(),
            config.grader.model.clone(),
        )
        .with_api_key(config.grader.api_key())
        .with_temperature(config.grader.temperature);

        Self {
            sandbox: Arc::new(sandbox),
            grader: Arc::new(grader),
            submissions,
            progress,
            client_store: client_store_for(config),
        }
    }
}

fn client_store_for(config: &EngineConfig) -> Arc<dyn ClientStore> {
    let store = match &config.client_store_dir {
        Some(dir) => Some(JsonFileClientStore::in_dir(dir)),
        None => JsonFileClientStore::default_location(),
    };

    match store {
        Some(store) => {
            info!(path = %store.path().display(), "using file-backed editor state");
            Arc::new(store)
        }
        None => {
            warn!("no data directory available, editor state will not survive restarts");
            Arc::new(MemoryClientStore::new())
        }
    }
}

/// 编辑器对外可见的状态。
#[derive(Debug, Clone, Serialize)]
pub struct EditorView {
    pub session_id: SessionId,
    pub language: Language,
    pub source_text: String,
    pub theme: String,
    pub font_size: u16,
    pub status: SessionStatus,
    pub outcome: Option<SessionOutcome>,
}

pub struct Engine {
    languages: Arc<LanguageTable>,
    client_store: Arc<dyn ClientStore>,
    execution: ExecutionController,
    evaluation: EvaluationController,
    recorder: SubmissionRecorder,
    progress: ProgressAggregator,
    session_manager: Arc<SessionManager>,
    event_broadcaster: Arc<EventBroadcaster>,
}

impl Engine {
    pub fn new(config: EngineConfig, backends: Backends) -> Self {
        let languages = Arc::new(config.language_table());

        info!(
            event_buffer_size = config.event_buffer_size,
            sandbox = %backends.sandbox.name(),
            grader = %backends.grader.name(),
            language_count = languages.languages().len(),
            "initializing assignment engine"
        );

        let event_broadcaster = Arc::new(EventBroadcaster::new(config.event_buffer_size));
        let session_manager = Arc::new(SessionManager::new(event_broadcaster.clone()));
        let retry_backoff = config.persistence.retry_backoff();

        Self {
            execution: ExecutionController::new(
                backends.sandbox,
                languages.clone(),
                config.sandbox.timeout(),
            ),
            evaluation: EvaluationController::new(
                backends.grader,
                languages.clone(),
                config.grader.timeout(),
            ),
            recorder: SubmissionRecorder::new(backends.submissions.clone(), retry_backoff),
            progress: ProgressAggregator::new(
                backends.progress,
                backends.submissions,
                retry_backoff,
            ),
            client_store: backends.client_store,
            languages,
            session_manager,
            event_broadcaster,
        }
    }

    pub fn languages(&self) -> Vec<&LanguageProfile> {
        self.languages
            .languages()
            .into_iter()
            .filter_map(|language| self.languages.get(language))
            .collect()
    }

    pub fn subscribe_events(&self) -> EventStream {
        self.event_broadcaster.subscribe()
    }

    /// 打开会话并从客户端存储恢复编辑器状态。
    pub async fn open_session(
        &self,
        identity: Identity,
        assignment: Option<AssignmentContext>,
    ) -> Result<SessionInfo> {
        if identity.user_id.is_blank() {
            return Err(EngineError::Forbidden("missing user identity".to_string()));
        }

        let starter_code = assignment
            .as_ref()
            .map(|assignment| assignment.starter_code.clone())
            .unwrap_or_default();
        let editor = EditorSession::restore(
            identity.user_id.clone(),
            self.languages.clone(),
            self.client_store.clone(),
            starter_code,
        );

        Ok(self
            .session_manager
            .insert(LearnerSession::new(identity, assignment, editor))
            .await)
    }

    pub async fn close_session(&self, session_id: &SessionId) -> Result<()> {
        self.session_manager.close(session_id).await
    }

    pub async fn active_sessions(&self) -> Vec<SessionInfo> {
        self.session_manager.list().await
    }

    pub async fn editor_view(&self, session_id: &SessionId) -> Result<EditorView> {
        let session = self.session_manager.require(session_id).await?;
        let editor = session.editor().await;
        Ok(EditorView {
            session_id: session_id.clone(),
            language: editor.active_language(),
            source_text: editor.buffer().to_string(),
            theme: editor.theme().to_string(),
            font_size: editor.font_size(),
            status: session.status(),
            outcome: editor.outcome().cloned(),
        })
    }

    pub async fn select_language(&self, session_id: &SessionId, language: Language) -> Result<()> {
        self.languages.profile(language)?;
        let session = self.session_manager.require(session_id).await?;
        session.editor().await.select_language(language);
        Ok(())
    }

    pub async fn update_buffer(&self, session_id: &SessionId, text: impl Into<String>) -> Result<()> {
        let session = self.session_manager.require(session_id).await?;
        session.editor().await.update_buffer(text);
        Ok(())
    }

    pub async fn reset_buffer(&self, session_id: &SessionId) -> Result<()> {
        let session = self.session_manager.require(session_id).await?;
        session.editor().await.reset_buffer();
        Ok(())
    }

    pub async fn set_font_size(&self, session_id: &SessionId, font_size: u16) -> Result<()> {
        let session = self.session_manager.require(session_id).await?;
        session.editor().await.set_font_size(font_size);
        Ok(())
    }

    pub async fn set_theme(&self, session_id: &SessionId, theme: impl Into<String>) -> Result<()> {
        let session = self.session_manager.require(session_id).await?;
        session.editor().await.set_theme(theme);
        Ok(())
    }

    /// 在沙箱中运行当前缓冲区。源代码在调用开始时快照，之后的编辑不影响本次运行。
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, session_id: &SessionId) -> Result<ExecutionResult> {
        let session = self.session_manager.require(session_id).await?;
        let _busy = session
            .try_begin()
            .ok_or_else(|| EngineError::SessionBusy(session_id.to_string()))?;
        let token = session.cancellation_token().await;
        let (language, source_text, generation) = session.editor().await.snapshot();

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!("run cancelled");
                self.event_broadcaster.emit(EngineEvent::RunCancelled {
                    session_id: session_id.clone(),
                });
                return Err(EngineError::Cancelled);
            }
            result = self.execution.execute(language, &source_text) => result,
        };

        let applied = session
            .editor()
            .await
            .apply_outcome(generation, SessionOutcome::Executed(result.clone()));
        if !applied {
            debug!("editor state changed during run, result not shown");
        }

        self.event_broadcaster.emit(EngineEvent::RunFinished {
            session_id: session_id.clone(),
            language,
            status: result.status,
        });
        Ok(result)
    }

    /// 评测并记录当前缓冲区。评测失败时不写入任何记录。
    #[tracing::instrument(skip(self))]
    pub async fn submit(&self, session_id: &SessionId) -> Result<Submission> {
        let session = self.session_manager.require(session_id).await?;
        let assignment = session
            .assignment()
            .cloned()
            .ok_or(EngineError::NoAssignment)?;
        let _busy = session
            .try_begin()
            .ok_or_else(|| EngineError::SessionBusy(session_id.to_string()))?;
        let token = session.cancellation_token().await;
        let (language, source_text, generation) = session.editor().await.snapshot();

        let evaluation = tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!("submission cancelled");
                self.event_broadcaster.emit(EngineEvent::SubmissionCancelled {
                    session_id: session_id.clone(),
                });
                return Err(EngineError::Cancelled);
            }
            verdict = self.evaluation.evaluate(language, &source_text, &assignment.task_description) => verdict,
        };

        let verdict = match evaluation {
            Ok(verdict) => verdict,
            Err(err) => {
                session.editor().await.apply_outcome(
                    generation,
                    SessionOutcome::EvaluationFailed {
                        message: err.to_string(),
                    },
                );
                self.event_broadcaster.emit(EngineEvent::EvaluationFailed {
                    session_id: session_id.clone(),
                    error: err.to_string(),
                });
                return Err(err.into());
            }
        };

        let submission = Submission {
            submission_id: SubmissionId::new(),
            user_id: session.identity().user_id.clone(),
            course_id: assignment.course_id,
            section_id: assignment.section_id,
            chapter_id: assignment.chapter_id,
            assignment_id: assignment.assignment_id,
            language,
            source_text,
            evaluation: verdict,
            created_at: Utc::now(),
        };
        let ack = self.recorder.record(&submission).await?;
        debug!(?ack, "submission stored");

        session.editor().await.apply_outcome(
            generation,
            SessionOutcome::Submitted {
                submission_id: submission.submission_id,
                verdict: submission.evaluation.clone(),
            },
        );
        self.event_broadcaster.emit(EngineEvent::SubmissionRecorded {
            session_id: session_id.clone(),
            submission_id: submission.submission_id,
            assignment_id: submission.assignment_id.clone(),
            passed: submission.evaluation.passed,
            score: submission.evaluation.score.value(),
        });

        Ok(submission)
    }

    /// 取消进行中的运行或提交；没有进行中的调用时无副作用。
    pub async fn cancel(&self, session_id: &SessionId) -> Result<()> {
        let session = self.session_manager.require(session_id).await?;
        session.cancel().await;
        Ok(())
    }

    pub async fn mark_chapter_complete(
        &self,
        identity: &Identity,
        course_id: &CourseId,
        chapter_id: &ChapterId,
    ) -> Result<ChapterRecord> {
        check_progress_keys(identity, course_id, chapter_id)?;
        Ok(self
            .progress
            .mark_chapter_complete(&identity.user_id, course_id, chapter_id)
            .await?)
    }

    pub async fn mark_chapter_incomplete(
        &self,
        identity: &Identity,
        course_id: &CourseId,
        chapter_id: &ChapterId,
    ) -> Result<ChapterRecord> {
        check_progress_keys(identity, course_id, chapter_id)?;
        Ok(self
            .progress
            .mark_chapter_incomplete(&identity.user_id, course_id, chapter_id)
            .await?)
    }

    pub async fn mark_quiz_complete(
        &self,
        identity: &Identity,
        course_id: &CourseId,
        chapter_id: &ChapterId,
    ) -> Result<ChapterRecord> {
        check_progress_keys(identity, course_id, chapter_id)?;
        Ok(self
            .progress
            .mark_quiz_complete(&identity.user_id, course_id, chapter_id)
            .await?)
    }

    pub async fn course_progress(
        &self,
        identity: &Identity,
        outline: &CourseOutline,
    ) -> Result<CourseProgress> {
        Ok(self
            .progress
            .course_progress(&identity.user_id, outline)
            .await?)
    }

    pub async fn chapter_progress(
        &self,
        identity: &Identity,
        outline: &CourseOutline,
        chapter_id: &ChapterId,
    ) -> Result<Option<ChapterProgress>> {
        Ok(self
            .progress
            .chapter_progress(&identity.user_id, outline, chapter_id)
            .await?)
    }

    /// 调用者自己的提交历史。
    pub async fn my_submissions(
        &self,
        identity: &Identity,
        course_id: Option<&CourseId>,
    ) -> Result<Vec<Submission>> {
        Ok(self.recorder.by_user(&identity.user_id, course_id).await?)
    }

    pub async fn latest_submission(
        &self,
        identity: &Identity,
        course_id: &CourseId,
        assignment_id: &AssignmentId,
    ) -> Result<Option<Submission>> {
        Ok(self
            .recorder
            .latest_for(&identity.user_id, course_id, assignment_id)
            .await?)
    }

    /// 学习者只能读取自己的提交，讲师与管理员可读取任意提交。
    pub async fn submission(
        &self,
        identity: &Identity,
        submission_id: SubmissionId,
    ) -> Result<Option<Submission>> {
        let submission = self.recorder.get(submission_id).await?;
        match submission {
            Some(submission)
                if submission.user_id != identity.user_id
                    && !identity.can_review_submissions() =>
            {
                Err(EngineError::Forbidden(format!(
                    "submission {submission_id} belongs to another learner"
                )))
            }
            other => Ok(other),
        }
    }

    /// 某作业的全部提交，仅讲师与管理员可用。
    pub async fn submissions_for_assignment(
        &self,
        identity: &Identity,
        course_id: &CourseId,
        chapter_id: &ChapterId,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<Submission>> {
        if !identity.can_review_submissions() {
            return Err(EngineError::Forbidden(format!(
                "{} cannot review submissions",
                identity.user_id
            )));
        }

        Ok(self
            .recorder
            .by_assignment(course_id, chapter_id, assignment_id)
            .await?)
    }
}

/// 进度记录的键与提交记录一样受列宽约束。
fn check_progress_keys(
    identity: &Identity,
    course_id: &CourseId,
    chapter_id: &ChapterId,
) -> Result<()> {
    identity.user_id.check("userId")?;
    course_id.check("courseId")?;
    chapter_id.check("chapterId")?;
    Ok(())
}
