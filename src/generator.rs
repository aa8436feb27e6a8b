//! Question generator: prompt the oracle for a new practice problem, validate it,
//! persist it for the learner and return the stored question with its id.
//!
//! Two modes share one pipeline. `First` opens a topic at Easy difficulty; `Next`
//! additionally steers toward the learner's open weaknesses and away from titles
//! already solved.

use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::{Prompts, Tuning};
use crate::domain::{lines_or_list, Difficulty, NewQuestion, Question, TestCase};
use crate::error::CoreError;
use crate::oracle::{parse_reply, CompletionRequest, Oracle};
use crate::store::Store;
use crate::util::{fill_template, list_or_none};

#[derive(Clone, Copy, Debug)]
pub enum GenerationMode<'a> {
  First,
  Next {
    weaknesses: &'a [String],
    /// Earliest first.
    solved_titles: &'a [String],
  },
}

impl GenerationMode<'_> {
  fn label(&self) -> &'static str {
    match self {
      GenerationMode::First => "first",
      GenerationMode::Next { .. } => "next",
    }
  }
}

/// The question object the oracle is asked to emit.
#[derive(Clone, Debug, Deserialize)]
pub struct GeneratedQuestion {
  pub title: String,
  pub description: String,
  #[serde(default, deserialize_with = "lines_or_list")]
  pub constraints: Vec<String>,
  pub testcases: Vec<TestCase>,
  pub difficulty: Difficulty,
  #[serde(default)]
  pub xp: Option<u32>,
  #[serde(default)]
  pub hint: String,
}

pub fn build_prompt(prompts: &Prompts, topic: &str, mode: GenerationMode<'_>) -> String {
  let spec = fill_template(&prompts.question_spec, &[("topic", topic)]);
  match mode {
    GenerationMode::First => fill_template(
      &prompts.first_question_template,
      &[("question_spec", spec.as_str()), ("topic", topic)],
    ),
    GenerationMode::Next { weaknesses, solved_titles } => {
      let weaknesses = list_or_none(weaknesses, ", ");
      let solved = list_or_none(solved_titles, ", ");
      fill_template(
        &prompts.next_question_template,
        &[
          ("question_spec", spec.as_str()),
          ("topic", topic),
          ("weaknesses", weaknesses.as_str()),
          ("solved_questions", solved.as_str()),
        ],
      )
    }
  }
}

/// Check a parsed question and turn it into an insert payload.
/// XP always follows the difficulty table; a first question is always Easy.
pub fn validate(
  generated: GeneratedQuestion,
  learner_id: &str,
  topic: &str,
  mode: GenerationMode<'_>,
  min_test_cases: usize,
  raw: &str,
) -> Result<NewQuestion, CoreError> {
  let title = generated.title.trim().to_string();
  if title.is_empty() {
    return Err(CoreError::malformed("question has an empty title", raw));
  }
  if generated.testcases.len() < min_test_cases {
    return Err(CoreError::malformed(
      format!("question has {} test cases, at least {} required", generated.testcases.len(), min_test_cases),
      raw,
    ));
  }

  let difficulty = match mode {
    GenerationMode::First => Difficulty::Easy,
    GenerationMode::Next { .. } => generated.difficulty,
  };
  let xp = difficulty.xp();
  if generated.xp.is_some_and(|x| x != xp) {
    warn!(target: "oracle", claimed = ?generated.xp, %xp, difficulty = difficulty.as_str(), "Oracle XP disagrees with difficulty table; using table");
  }

  Ok(NewQuestion {
    user_id: learner_id.to_string(),
    topic: topic.to_string(),
    title,
    description: generated.description,
    constraints: generated.constraints,
    testcases: generated.testcases,
    difficulty,
    xp,
    hint: generated.hint,
  })
}

/// Generate, validate and persist one question. The returned question carries the
/// id assigned by the store's insert.
#[instrument(level = "info", skip(oracle, store, prompts, tuning, mode), fields(%topic, %learner_id, mode = mode.label()))]
pub async fn generate(
  oracle: &dyn Oracle,
  store: &dyn Store,
  prompts: &Prompts,
  tuning: &Tuning,
  topic: &str,
  learner_id: &str,
  mode: GenerationMode<'_>,
) -> Result<Question, CoreError> {
  let user = build_prompt(prompts, topic, mode);
  let raw = oracle
    .complete(CompletionRequest {
      system: &prompts.generation_system,
      user: &user,
      temperature: tuning.generation_temperature,
      max_tokens: tuning.max_tokens,
    })
    .await?;

  let generated: GeneratedQuestion = parse_reply(&raw)?;
  if let GenerationMode::Next { solved_titles, .. } = mode {
    if solved_titles.iter().any(|t| t.trim().eq_ignore_ascii_case(generated.title.trim())) {
      warn!(target: "oracle", title = %generated.title, "Oracle repeated a solved title");
    }
  }

  let new_question = validate(generated, learner_id, topic, mode, tuning.min_test_cases, &raw)?;
  let question = store.insert_question(new_question).await.map_err(|e| {
    tracing::error!(target: "store", error = %e, "Failed to insert generated question");
    CoreError::from(e)
  })?;

  info!(
    target: "oracle",
    id = %question.id,
    title = %question.title,
    difficulty = question.difficulty.as_str(),
    testcases = question.testcases.len(),
    "Question generated"
  );
  Ok(question)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::MemoryStore;
  use async_trait::async_trait;

  struct Canned(String);

  #[async_trait]
  impl Oracle for Canned {
    async fn complete(&self, _req: CompletionRequest<'_>) -> Result<String, CoreError> {
      Ok(self.0.clone())
    }
  }

  fn question_json(difficulty: &str, xp: u32, cases: usize) -> String {
    let testcases: Vec<_> = (0..cases)
      .map(|i| serde_json::json!({ "input": format!("{} 1 2\n1", i), "output": "1" }))
      .collect();
    serde_json::json!({
      "title": "Find Target Index",
      "description": "Print the index of the target in the array, or -1.",
      "constraints": "1 <= n <= 10^5",
      "testcases": testcases,
      "difficulty": difficulty,
      "xp": xp,
      "hint": "Scan left to right."
    })
    .to_string()
  }

  #[test]
  fn next_prompt_uses_none_markers() {
    let p = build_prompt(
      &Prompts::default(),
      "Arrays",
      GenerationMode::Next { weaknesses: &[], solved_titles: &[] },
    );
    assert!(p.contains("Known weaknesses: none."));
    assert!(p.contains("earliest to most recent: none."));
    assert!(p.contains("1. Topic: Arrays"));
  }

  #[test]
  fn next_prompt_keeps_solved_order() {
    let solved = vec!["Two Sum".to_string(), "Reverse Array".to_string()];
    let weak = vec!["off-by-one".to_string()];
    let p = build_prompt(
      &Prompts::default(),
      "Arrays",
      GenerationMode::Next { weaknesses: &weak, solved_titles: &solved },
    );
    assert!(p.contains("Two Sum, Reverse Array"));
    assert!(p.contains("Known weaknesses: off-by-one."));
  }

  #[test]
  fn first_prompt_names_topic() {
    let p = build_prompt(&Prompts::default(), "Graphs", GenerationMode::First);
    assert!(p.contains("new to the topic Graphs"));
    assert!(p.contains("1. Topic: Graphs"));
  }

  #[tokio::test]
  async fn first_question_is_persisted_with_table_xp() {
    let oracle = Canned(format!("```json\n{}\n```", question_json("Medium", 45, 6)));
    let store = MemoryStore::new();
    let q = generate(&oracle, &store, &Prompts::default(), &Tuning::default(), "Arrays", "u1", GenerationMode::First)
      .await
      .unwrap();

    assert_eq!(q.difficulty, Difficulty::Easy);
    assert_eq!(q.xp, 30);
    assert!(q.testcases.len() >= 5);
    assert_eq!(q.topic, "Arrays");
    assert_eq!(q.user_id, "u1");
    let stored = store.get_question(&q.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Find Target Index");
  }

  #[tokio::test]
  async fn next_question_keeps_oracle_difficulty() {
    let oracle = Canned(question_json("hard", 100, 7));
    let store = MemoryStore::new();
    let weak = vec!["off-by-one".to_string()];
    let q = generate(
      &oracle,
      &store,
      &Prompts::default(),
      &Tuning::default(),
      "Arrays",
      "u1",
      GenerationMode::Next { weaknesses: &weak, solved_titles: &[] },
    )
    .await
    .unwrap();
    assert_eq!(q.difficulty, Difficulty::Hard);
    assert_eq!(q.xp, 100);
  }

  #[tokio::test]
  async fn duplicate_titles_get_distinct_ids() {
    let oracle = Canned(question_json("Easy", 30, 5));
    let store = MemoryStore::new();
    let a = generate(&oracle, &store, &Prompts::default(), &Tuning::default(), "Arrays", "u1", GenerationMode::First)
      .await
      .unwrap();
    let b = generate(&oracle, &store, &Prompts::default(), &Tuning::default(), "Arrays", "u1", GenerationMode::First)
      .await
      .unwrap();
    assert_ne!(a.id, b.id);
  }

  #[tokio::test]
  async fn too_few_test_cases_is_malformed_and_not_stored() {
    let oracle = Canned(question_json("Easy", 30, 3));
    let store = MemoryStore::new();
    let err = generate(&oracle, &store, &Prompts::default(), &Tuning::default(), "Arrays", "u1", GenerationMode::First)
      .await
      .unwrap_err();
    assert_eq!(err.code(), "malformed_oracle_response");
    assert!(store.questions_for_user("u1").await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn trailing_comma_is_malformed() {
    let oracle = Canned(r#"{"title": "x", "testcases": [],}"#.into());
    let store = MemoryStore::new();
    let err = generate(&oracle, &store, &Prompts::default(), &Tuning::default(), "Arrays", "u1", GenerationMode::First)
      .await
      .unwrap_err();
    assert!(matches!(err, CoreError::MalformedOracleResponse { .. }));
  }
}
