//! Analysis orchestrator: prompt the oracle with the problem, the code and the
//! per-test results, and parse its `{analysis, weaknesses}` verdict.

use serde::Deserialize;
use tracing::{info, instrument};

use crate::config::{Prompts, Tuning};
use crate::domain::{lines_or_list, Analysis, TestResult};
use crate::error::CoreError;
use crate::oracle::{parse_reply, CompletionRequest, Oracle};
use crate::util::fill_template;

/// Problem metadata the oracle needs. Deserializes from a full question object.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProblemBrief {
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub description: String,
  #[serde(default, deserialize_with = "lines_or_list")]
  pub constraints: Vec<String>,
}

pub struct AnalysisInput<'a> {
  pub problem: &'a ProblemBrief,
  pub code: &'a str,
  pub language: &'a str,
  pub results: &'a [TestResult],
  pub attempts: u32,
  pub time_spent_secs: u64,
  pub previous_weaknesses: &'a [String],
}

/// One line per test, in grading order.
pub fn summarize_results(results: &[TestResult]) -> String {
  results
    .iter()
    .enumerate()
    .map(|(i, r)| {
      format!(
        "Test {}: input = {}, expected = {}, actual = {}, passed = {}",
        i + 1,
        r.input,
        r.expected_output,
        r.actual_output.trim_end(),
        r.passed
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn build_prompt(prompts: &Prompts, input: &AnalysisInput<'_>) -> String {
  let previous = if input.previous_weaknesses.is_empty() {
    "None (first attempt)".to_string()
  } else {
    input.previous_weaknesses.iter().map(|w| format!("- {}", w)).collect::<Vec<_>>().join("\n")
  };
  let constraints = if input.problem.constraints.is_empty() {
    "none".to_string()
  } else {
    input.problem.constraints.join("; ")
  };
  let attempts = input.attempts.to_string();
  let time_spent = input.time_spent_secs.to_string();
  let results = summarize_results(input.results);

  fill_template(
    &prompts.analysis_user_template,
    &[
      ("title", input.problem.title.as_str()),
      ("description", input.problem.description.as_str()),
      ("constraints", constraints.as_str()),
      ("attempts", attempts.as_str()),
      ("time_spent", time_spent.as_str()),
      ("previous_weaknesses", previous.as_str()),
      ("language", input.language),
      ("results", results.as_str()),
      ("code", input.code),
    ],
  )
}

/// Ask the oracle for a verdict. Blank weakness entries are dropped; nothing else
/// about the list is touched.
#[instrument(level = "info", skip(oracle, prompts, tuning, input), fields(language = %input.language, tests = input.results.len(), attempts = input.attempts, previous = input.previous_weaknesses.len()))]
pub async fn analyze(
  oracle: &dyn Oracle,
  prompts: &Prompts,
  tuning: &Tuning,
  input: &AnalysisInput<'_>,
) -> Result<Analysis, CoreError> {
  let user = build_prompt(prompts, input);
  let raw = oracle
    .complete(CompletionRequest {
      system: &prompts.analysis_system,
      user: &user,
      temperature: tuning.analysis_temperature,
      max_tokens: tuning.max_tokens,
    })
    .await?;

  let mut verdict: Analysis = parse_reply(&raw)?;
  verdict.weaknesses = verdict
    .weaknesses
    .into_iter()
    .map(|w| w.trim().to_string())
    .filter(|w| !w.is_empty())
    .collect();

  info!(target: "oracle", weaknesses = verdict.weaknesses.len(), "Submission analyzed");
  Ok(verdict)
}
