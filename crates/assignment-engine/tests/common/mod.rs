#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use assignment_engine::grader::{Grader, GraderError, GradingPrompt};
use assignment_engine::sandbox::{
    Sandbox, SandboxError, SandboxRequest, SandboxResponse, StageReport,
};
use assignment_engine::store::{MemoryClientStore, MemoryStore};
use assignment_engine::{Backends, Engine, EngineConfig};
use async_trait::async_trait;
use tokio::sync::Notify;

/// 让测试在调用进行中介入：`entered` 在调用开始时触发，调用等待 `release`。
#[derive(Clone, Default)]
pub struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Clone)]
pub struct MockSandbox {
    response: Arc<Mutex<Result<SandboxResponse, SandboxError>>>,
    requests: Arc<Mutex<Vec<SandboxRequest>>>,
    gate: Option<Gate>,
}

impl MockSandbox {
    pub fn printing(stdout: &str) -> Self {
        Self::with_response(Ok(SandboxResponse {
            compile: None,
            run: Some(StageReport {
                code: Some(0),
                stdout: stdout.to_string(),
                output: stdout.to_string(),
                ..StageReport::default()
            }),
        }))
    }

    pub fn with_response(response: Result<SandboxResponse, SandboxError>) -> Self {
        Self {
            response: Arc::new(Mutex::new(response)),
            requests: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn requests(&self) -> Vec<SandboxRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl Sandbox for MockSandbox {
    fn name(&self) -> &str {
        "mock-sandbox"
    }

    async fn execute(&self, request: &SandboxRequest) -> Result<SandboxResponse, SandboxError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        self.response.lock().expect("response lock").clone()
    }
}

#[derive(Clone)]
pub struct MockGrader {
    reply: Arc<Mutex<Result<String, GraderError>>>,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<GradingPrompt>>>,
    gate: Option<Gate>,
}

impl MockGrader {
    pub fn replying(reply: &str) -> Self {
        Self::with_reply(Ok(reply.to_string()))
    }

    pub fn failing(error: GraderError) -> Self {
        Self::with_reply(Err(error))
    }

    pub fn with_reply(reply: Result<String, GraderError>) -> Self {
        Self {
            reply: Arc::new(Mutex::new(reply)),
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            gate: None,
        }
    }

    pub fn gated(mut self, gate: Gate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<GradingPrompt> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl Grader for MockGrader {
    fn name(&self) -> &str {
        "mock-grader"
    }

    async fn complete(&self, prompt: &GradingPrompt) -> Result<String, GraderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.clone());
        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        self.reply.lock().expect("reply lock").clone()
    }
}

pub struct Harness {
    pub engine: Arc<Engine>,
    pub store: Arc<MemoryStore>,
    pub client_store: Arc<MemoryClientStore>,
}

pub fn harness(sandbox: MockSandbox, grader: MockGrader) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let client_store = Arc::new(MemoryClientStore::new());
    let mut config = EngineConfig::default();
    config.persistence.retry_backoff_ms = 1;

    let engine = Engine::new(
        config,
        Backends {
            sandbox: Arc::new(sandbox),
            grader: Arc::new(grader),
            submissions: store.clone(),
            progress: store.clone(),
            client_store: client_store.clone(),
        },
    );

    Harness {
        engine: Arc::new(engine),
        store,
        client_store,
    }
}

pub const PASSING_VERDICT: &str =
    r#"Here is my assessment: {"passed":true,"score":88,"explanation":"handles all cases"}"#;
