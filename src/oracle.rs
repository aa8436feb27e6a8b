//! Completion oracle: an opaque prompt -> text service.
//!
//! `ChatOracle` talks to any OpenAI-compatible `/chat/completions` endpoint
//! (Together, OpenAI, a local gateway). Calls log model, latency, token usage and
//! response size, never contents or the API key.
//!
//! `parse_reply` is the single place where oracle text becomes typed data: strip
//! a code fence, then strict JSON.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::config::OracleSettings;
use crate::error::CoreError;
use crate::util::{strip_code_fence, trunc_for_log};

#[derive(Clone, Debug)]
pub struct CompletionRequest<'a> {
  pub system: &'a str,
  pub user: &'a str,
  pub temperature: f32,
  pub max_tokens: u32,
}

#[async_trait]
pub trait Oracle: Send + Sync {
  async fn complete(&self, req: CompletionRequest<'_>) -> Result<String, CoreError>;
}

#[derive(Clone)]
pub struct ChatOracle {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl ChatOracle {
  pub fn new(settings: &OracleSettings) -> Result<Self, CoreError> {
    let client = reqwest::Client::builder()
      .timeout(settings.timeout)
      .build()
      .map_err(|e| CoreError::OracleUnavailable(e.to_string()))?;
    Ok(Self {
      client,
      api_key: settings.api_key.clone(),
      base_url: settings.base_url.trim_end_matches('/').to_string(),
      model: settings.model.clone(),
    })
  }
}

#[async_trait]
impl Oracle for ChatOracle {
  #[instrument(level = "info", skip(self, req), fields(model = %self.model, temperature = req.temperature, max_tokens = req.max_tokens, prompt_len = req.user.len()))]
  async fn complete(&self, req: CompletionRequest<'_>) -> Result<String, CoreError> {
    let url = format!("{}/chat/completions", self.base_url);
    let body = ChatCompletionRequest {
      model: &self.model,
      messages: vec![
        ChatMessageReq { role: "system", content: req.system },
        ChatMessageReq { role: "user", content: req.user },
      ],
      temperature: req.temperature,
      max_tokens: req.max_tokens,
    };

    let start = Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "codeforge-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&body).send().await
      .map_err(|e| {
        error!(target: "oracle", elapsed = ?start.elapsed(), error = %e, "Oracle transport failure");
        CoreError::OracleUnavailable(e.to_string())
      })?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or(body);
      error!(target: "oracle", %status, message = %trunc_for_log(&msg, 200), "Oracle HTTP error");
      return Err(CoreError::OracleUnavailable(format!("HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res.json().await
      .map_err(|e| CoreError::OracleUnavailable(format!("unreadable completion envelope: {}", e)))?;
    if let Some(usage) = &body.usage {
      info!(target: "oracle", prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Oracle usage");
    }
    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .unwrap_or_default()
      .trim()
      .to_string();

    info!(target: "oracle", elapsed = ?start.elapsed(), reply_len = text.len(), "Oracle reply received");
    Ok(text)
  }
}

/// Strip a code fence and parse the remainder as one strict JSON value.
/// On failure the raw text travels with the error for diagnosis.
pub fn parse_reply<T: DeserializeOwned>(raw: &str) -> Result<T, CoreError> {
  let cleaned = strip_code_fence(raw);
  serde_json::from_str::<T>(cleaned).map_err(|e| {
    warn!(target: "oracle", error = %e, raw = %trunc_for_log(raw, 300), "Oracle reply failed to parse");
    CoreError::malformed(e, raw)
  })
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: Vec<ChatMessageReq<'a>>,
  temperature: f32,
  max_tokens: u32,
}
#[derive(Serialize)]
struct ChatMessageReq<'a> { role: &'a str, content: &'a str }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
