#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use codeforge_backend::config::AgentConfig;
use codeforge_backend::domain::{NewQuestion, Question, SubmissionRecord};
use codeforge_backend::error::{CoreError, StoreError};
use codeforge_backend::executor::{ExecutionOutput, ExecutionRequest, Executor};
use codeforge_backend::oracle::{CompletionRequest, Oracle};
use codeforge_backend::routes::build_router;
use codeforge_backend::state::AppState;
use codeforge_backend::store::{MemoryStore, Store};

type Program = dyn Fn(&str, &str) -> Result<ExecutionOutput, CoreError> + Send + Sync;

/// Executor that "runs" code with a Rust closure of (source_code, stdin) and
/// remembers every stdin it was given, in order.
pub struct ScriptedExecutor {
    program: Box<Program>,
    pub stdins: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(program: impl Fn(&str, &str) -> Result<ExecutionOutput, CoreError> + Send + Sync + 'static) -> Self {
        Self { program: Box::new(program), stdins: Mutex::new(vec![]) }
    }

    /// Prints `stdout` for every input.
    pub fn constant(stdout: &'static str) -> Self {
        Self::new(move |_, _| Ok(ok(stdout)))
    }
}

pub fn ok(stdout: &str) -> ExecutionOutput {
    ExecutionOutput { stdout: stdout.to_string(), stderr: String::new(), exit_code: Some(0) }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&self, req: ExecutionRequest<'_>) -> Result<ExecutionOutput, CoreError> {
        self.stdins.lock().unwrap().push(req.stdin.to_string());
        (self.program)(req.source_code, req.stdin)
    }
}

/// Oracle that replays queued replies and records each user prompt.
#[derive(Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, CoreError>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn reply(&self, text: impl Into<String>) -> &Self {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(&self, err: CoreError) -> &Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, req: CompletionRequest<'_>) -> Result<String, CoreError> {
        self.prompts.lock().unwrap().push(req.user.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CoreError::OracleUnavailable("no scripted reply left".into())))
    }
}

/// Memory store whose weakness writes always fail.
#[derive(Clone, Default)]
pub struct ReadOnlyLedgerStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl Store for ReadOnlyLedgerStore {
    async fn insert_question(&self, q: NewQuestion) -> Result<Question, StoreError> {
        self.inner.insert_question(q).await
    }
    async fn get_question(&self, id: &str) -> Result<Option<Question>, StoreError> {
        self.inner.get_question(id).await
    }
    async fn latest_question(&self, user_id: &str, topic: &str) -> Result<Option<Question>, StoreError> {
        self.inner.latest_question(user_id, topic).await
    }
    async fn questions_for_user(&self, user_id: &str) -> Result<Vec<Question>, StoreError> {
        self.inner.questions_for_user(user_id).await
    }
    async fn update_scratch(&self, id: &str, code: &str, language: &str) -> Result<bool, StoreError> {
        self.inner.update_scratch(id, code, language).await
    }
    async fn get_weaknesses(&self, user_id: &str) -> Result<Option<Vec<String>>, StoreError> {
        self.inner.get_weaknesses(user_id).await
    }
    async fn replace_weaknesses(&self, _user_id: &str, _weaknesses: &[String]) -> Result<(), StoreError> {
        Err(StoreError::Rejected { status: 503, message: "read-only".into() })
    }
    async fn insert_submission(&self, rec: &SubmissionRecord) -> Result<(), StoreError> {
        self.inner.insert_submission(rec).await
    }
    async fn submissions_for_user(&self, user_id: &str) -> Result<Vec<SubmissionRecord>, StoreError> {
        self.inner.submissions_for_user(user_id).await
    }
}

pub struct TestApp {
    pub router: Router,
    pub executor: Arc<ScriptedExecutor>,
    pub oracle: Arc<ScriptedOracle>,
    pub store: Arc<dyn Store>,
}

pub fn create_test_app(executor: ScriptedExecutor) -> TestApp {
    create_test_app_with_store(executor, Arc::new(MemoryStore::new()))
}

pub fn create_test_app_with_store(executor: ScriptedExecutor, store: Arc<dyn Store>) -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let executor = Arc::new(executor);
    let oracle = Arc::new(ScriptedOracle::default());
    let state = AppState::new(executor.clone(), Some(oracle.clone() as Arc<dyn Oracle>), store.clone(), AgentConfig::default());
    TestApp { router: build_router(Arc::new(state)), executor, oracle, store }
}

impl TestApp {
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                builder = builder.header("content-type", "application/json");
                Body::from(serde_json::to_string(&v).unwrap())
            }
            None => Body::empty(),
        };
        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(body)).await
    }
}

/// A well-formed oracle question payload with `cases` test cases.
pub fn question_reply(title: &str, difficulty: &str, cases: usize) -> String {
    let testcases: Vec<Value> = (0..cases)
        .map(|i| serde_json::json!({ "input": format!("{}\n", i), "output": "ok" }))
        .collect();
    serde_json::json!({
        "title": title,
        "description": "Print ok for any input.",
        "constraints": ["1 <= n <= 10"],
        "testcases": testcases,
        "difficulty": difficulty,
        "xp": 999,
        "hint": "Just print it."
    })
    .to_string()
}
