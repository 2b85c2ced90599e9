pub mod config;
pub mod engine;
pub mod error;
pub mod evaluation;
pub mod events;
pub mod execution;
pub mod grader;
pub mod progress;
pub mod recorder;
pub mod sandbox;
pub mod session;
pub mod store;

pub use config::{EngineConfig, GraderConfig, LanguageOverride, PersistenceConfig, SandboxConfig};
pub use engine::{Backends, EditorView, Engine};
pub use error::{EngineError, Result};
pub use evaluation::{EvaluationController, EvaluationError};
pub use events::{EngineEvent, EventBroadcaster, EventStream};
pub use execution::ExecutionController;
pub use progress::ProgressAggregator;
pub use recorder::{Ack, RecordError, SubmissionRecorder};
pub use session::{
    AssignmentContext, EditorSession, LearnerSession, SessionId, SessionInfo, SessionManager,
    SessionOutcome, SessionStatus,
};
