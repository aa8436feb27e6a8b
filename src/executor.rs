//! Execution adapter: forwards (language, version, source, stdin) to the remote
//! code-execution service and unwraps its response envelope.
//!
//! The adapter never interprets program semantics. Sandboxing, compilation and
//! resource limits are the execution service's business.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::CoreError;

/// Any-version marker understood by Piston.
pub const ANY_VERSION: &str = "*";

#[derive(Clone, Debug)]
pub struct ExecutionRequest<'a> {
  pub language: &'a str,
  pub version: &'a str,
  pub source_code: &'a str,
  pub stdin: &'a str,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
  pub stdout: String,
  pub stderr: String,
  /// None when the process was killed by a signal.
  pub exit_code: Option<i32>,
}

#[async_trait]
pub trait Executor: Send + Sync {
  async fn execute(&self, req: ExecutionRequest<'_>) -> Result<ExecutionOutput, CoreError>;
}

/// Client for a Piston-compatible `/execute` endpoint.
#[derive(Clone)]
pub struct Piston {
  client: reqwest::Client,
  pub url: String,
}

impl Piston {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CoreError> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| CoreError::ExecutionUnavailable(e.to_string()))?;
    Ok(Self { client, url: url.into() })
  }
}

#[async_trait]
impl Executor for Piston {
  #[instrument(level = "debug", skip(self, req), fields(language = %req.language, version = %req.version, src_len = req.source_code.len()))]
  async fn execute(&self, req: ExecutionRequest<'_>) -> Result<ExecutionOutput, CoreError> {
    let body = PistonRequest {
      language: req.language,
      version: req.version,
      files: vec![PistonFile { content: req.source_code }],
      stdin: req.stdin,
    };

    let res = self.client.post(&self.url)
      .header(USER_AGENT, "codeforge-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&body).send().await
      .map_err(|e| CoreError::ExecutionUnavailable(e.to_string()))?;

    let status = res.status();
    let text = res.text().await.map_err(|e| CoreError::ExecutionUnavailable(e.to_string()))?;
    if !status.is_success() {
      let msg = extract_piston_message(&text).unwrap_or(text);
      warn!(target: "grading", %status, message = %msg, "Execution service rejected request");
      return Err(CoreError::ExecutionUnavailable(format!("HTTP {}: {}", status, msg)));
    }

    let out = parse_envelope(&text)?;
    debug!(target: "grading", exit_code = ?out.exit_code, stdout_len = out.stdout.len(), stderr_len = out.stderr.len(), "Execution finished");
    Ok(out)
  }
}

/// Unwrap a Piston response body into stdout/stderr/exit code.
/// A failed compile stage replaces the run stage's diagnostics.
pub fn parse_envelope(body: &str) -> Result<ExecutionOutput, CoreError> {
  let env: PistonResponse = serde_json::from_str(body)
    .map_err(|e| CoreError::ExecutionUnavailable(format!("malformed envelope: {}", e)))?;

  // Piston omits `run` entirely when compilation fails.
  if let Some(compile) = env.compile {
    if compile.code.unwrap_or(0) != 0 {
      return Ok(ExecutionOutput {
        stdout: String::new(),
        stderr: compile.stderr.unwrap_or_else(|| compile.output.unwrap_or_default()),
        exit_code: compile.code,
      });
    }
  }

  let run = env.run
    .ok_or_else(|| CoreError::ExecutionUnavailable("malformed envelope: missing `run`".into()))?;
  Ok(ExecutionOutput {
    stdout: run.stdout.unwrap_or_default(),
    stderr: run.stderr.unwrap_or_default(),
    exit_code: run.code,
  })
}

fn extract_piston_message(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct Msg { message: String }
  serde_json::from_str::<Msg>(body).ok().map(|m| m.message)
}

// --- Piston DTOs ---

#[derive(Serialize)]
struct PistonRequest<'a> {
  language: &'a str,
  version: &'a str,
  files: Vec<PistonFile<'a>>,
  stdin: &'a str,
}
#[derive(Serialize)]
struct PistonFile<'a> { content: &'a str }

#[derive(Deserialize)]
struct PistonResponse {
  #[serde(default)] run: Option<PistonStage>,
  #[serde(default)] compile: Option<PistonStage>,
}
#[derive(Deserialize)]
struct PistonStage {
  #[serde(default)] stdout: Option<String>,
  #[serde(default)] stderr: Option<String>,
  #[serde(default)] output: Option<String>,
  #[serde(default)] code: Option<i32>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unwraps_run_stage() {
    let out = parse_envelope(
      r#"{"language":"python","version":"3.10.0","run":{"stdout":"2\n","stderr":"","output":"2\n","code":0,"signal":null}}"#,
    ).unwrap();
    assert_eq!(out, ExecutionOutput { stdout: "2\n".into(), stderr: String::new(), exit_code: Some(0) });
  }

  #[test]
  fn compile_failure_surfaces_as_stderr() {
    let out = parse_envelope(
      r#"{"compile":{"stdout":"","stderr":"main.cpp:1: error","code":1},"run":{"stdout":"","stderr":"","code":null}}"#,
    ).unwrap();
    assert_eq!(out.stdout, "");
    assert_eq!(out.stderr, "main.cpp:1: error");
    assert_eq!(out.exit_code, Some(1));
  }

  #[test]
  fn compile_failure_without_run_stage_is_a_result() {
    let out = parse_envelope(
      r#"{"language":"c++","version":"10.2.0","compile":{"stdout":"","stderr":"main.cpp:1:1: error: expected","output":"main.cpp:1:1: error: expected","code":1,"signal":null}}"#,
    ).unwrap();
    assert_eq!(out.stdout, "");
    assert_eq!(out.stderr, "main.cpp:1:1: error: expected");
    assert_eq!(out.exit_code, Some(1));
  }

  #[test]
  fn successful_compile_without_run_is_unavailable() {
    let err = parse_envelope(r#"{"compile":{"stdout":"","stderr":"","code":0}}"#).unwrap_err();
    assert_eq!(err.code(), "execution_unavailable");
  }

  #[test]
  fn signal_kill_has_no_exit_code() {
    let out = parse_envelope(r#"{"run":{"stdout":"","stderr":"","code":null,"signal":"SIGKILL"}}"#).unwrap();
    assert_eq!(out.exit_code, None);
  }

  #[test]
  fn missing_run_is_unavailable() {
    let err = parse_envelope(r#"{"message":"runtime is unknown"}"#).unwrap_err();
    assert!(matches!(err, CoreError::ExecutionUnavailable(_)));
  }

  #[test]
  fn non_json_is_unavailable() {
    let err = parse_envelope("<html>502</html>").unwrap_err();
    assert_eq!(err.code(), "execution_unavailable");
  }
}
