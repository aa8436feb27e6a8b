//! Configuration: service endpoints from the environment, prompts and tuning from TOML.
//!
//! See `AgentConfig`, `Prompts` and `Tuning` for the TOML schema. Every key is optional;
//! missing keys keep their defaults.

use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub tuning: Tuning,
}

/// Prompt templates sent to the completion oracle.
/// Placeholders are written as `{name}` and filled by `util::fill_template`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub analysis_system: String,
  /// {title} {description} {constraints} {language} {code} {results} {attempts} {time_spent} {previous_weaknesses}
  pub analysis_user_template: String,
  pub generation_system: String,
  /// {topic} {question_spec}
  pub first_question_template: String,
  /// {topic} {weaknesses} {solved_questions} {question_spec}
  pub next_question_template: String,
  /// Shared format block appended to both generation prompts. {topic}
  pub question_spec: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      analysis_system: "You are an expert coding mentor. Respond ONLY with one strict JSON object.".into(),
      analysis_user_template: r#"You are analyzing a student's submission to a programming problem.

Problem:
- Title: {title}
- Description: {description}
- Constraints: {constraints}

Student's code in {language}:
```{language}
{code}
```

Test case results:
{results}

Metadata:
- Number of attempts: {attempts}
- Time spent: {time_spent} seconds

Evaluation instructions:
1. Check whether the code is complete and correct. An empty or partially implemented solution is incomplete.
2. Use the test case results to validate correctness. If any test fails, analyze the likely reason.
3. Give a concise explanation of what the student did wrong (if anything) and how to improve.
4. The student's previously known weaknesses are:
{previous_weaknesses}
   - Remove weaknesses that are clearly resolved in the current solution.
   - Keep weaknesses that are still present.
   - Add any new weaknesses found in this submission.

Weaknesses are recurring coding issues or misconceptions, for example: edge case handling,
time/space inefficiency, incorrect looping logic, incomplete implementation, indexing mistakes,
overflow/underflow, unchecked negative or large inputs, misunderstanding the problem,
poor use of language features.

Respond ONLY with valid JSON (no markdown) in exactly this structure:
{"analysis": "short summary of what was right or wrong", "weaknesses": ["updated", "list"]}"#.into(),
      generation_system: "You are a coding tutor who writes practice problems. Respond ONLY with one strict JSON object.".into(),
      first_question_template: r#"The student is new to the topic {topic}. Generate one fresh coding question.

{question_spec}

Ensure the question is fresh, clear, and solvable for a beginner in the topic."#.into(),
      next_question_template: r#"The student is practicing the topic {topic}.
- Known weaknesses: {weaknesses}.
- Questions already solved, in order from earliest to most recent: {solved_questions}.

Analyze the student's progress from the sequence of solved questions and generate a new,
non-repeating coding question that:
  - challenges one or more of the student's unresolved weaknesses,
  - keeps continuity with what the student has recently worked on,
  - does not repeat any solved title,
  - fits the current topic and supports steady skill growth.

{question_spec}

Ensure the question is clear, well-structured and advances the student's understanding."#.into(),
      question_spec: r#"The question must have:
1. Topic: {topic}
2. Difficulty: Easy, Medium or Hard (a first question is always Easy)
3. XP by difficulty: Easy = 30, Medium = 60, Hard = 100
4. Description: a concise statement of the task
5. Constraints: relevant limits, e.g. "Array size up to 10^6"
6. Test cases: 5 to 10 cases covering edge cases (empty input, one element, large input).
   - input: values separated by single spaces, separate lines with "\n", e.g. "1 2 3 4 5\n3".
     No extra whitespace anywhere.
   - output: the exact expected stdout, values separated by single spaces, no text or brackets, e.g. "2".
7. Hint: one useful hint for a struggling student

Reply with exactly this JSON object:
{"title": string, "description": string, "constraints": string, "testcases": [{"input": string, "output": string}], "difficulty": "Easy" | "Medium" | "Hard", "xp": number, "hint": string}"#.into(),
    }
  }
}

/// Oracle sampling and pipeline thresholds.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Tuning {
  pub analysis_temperature: f32,
  pub generation_temperature: f32,
  pub max_tokens: u32,
  pub hint_unlock_attempts: u32,
  pub min_test_cases: usize,
}

impl Default for Tuning {
  fn default() -> Self {
    Self {
      analysis_temperature: 0.2,
      generation_temperature: 0.7,
      max_tokens: 1024,
      hint_unlock_attempts: 3,
      min_test_cases: 5,
    }
  }
}

/// Endpoints and credentials for the external collaborators.
#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub piston_url: String,
  pub execution_timeout: Duration,
  pub oracle: Option<OracleSettings>,
  pub supabase: Option<SupabaseSettings>,
}

#[derive(Clone, Debug)]
pub struct OracleSettings {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct SupabaseSettings {
  pub url: String,
  pub key: String,
  pub timeout: Duration,
}

impl Settings {
  pub fn from_env() -> Self {
    let port = env_parse("PORT").unwrap_or(5000);
    let piston_url = std::env::var("PISTON_URL")
      .unwrap_or_else(|_| "https://emkc.org/api/v2/piston/execute".into());
    let execution_timeout = Duration::from_secs(env_parse("EXECUTION_TIMEOUT_SECS").unwrap_or(30));

    let oracle = std::env::var("ORACLE_API_KEY").ok().map(|api_key| OracleSettings {
      api_key,
      base_url: std::env::var("ORACLE_BASE_URL").unwrap_or_else(|_| "https://api.together.xyz/v1".into()),
      model: std::env::var("ORACLE_MODEL").unwrap_or_else(|_| "deepseek-ai/DeepSeek-V3".into()),
      timeout: Duration::from_secs(env_parse("ORACLE_TIMEOUT_SECS").unwrap_or(60)),
    });

    let supabase = match (std::env::var("SUPABASE_URL"), std::env::var("SUPABASE_KEY")) {
      (Ok(url), Ok(key)) => Some(SupabaseSettings {
        url,
        key,
        timeout: Duration::from_secs(env_parse("SUPABASE_TIMEOUT_SECS").unwrap_or(15)),
      }),
      _ => None,
    };

    Self { port, piston_url, execution_timeout, oracle, supabase }
  }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
  std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse an agent config from TOML text.
pub fn parse_agent_config(text: &str) -> Result<AgentConfig, toml::de::Error> {
  toml::from_str::<AgentConfig>(text)
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "codeforge", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "codeforge", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "codeforge", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}
