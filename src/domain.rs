//! Domain models: questions, test cases and results, submissions, analysis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Question difficulty. The XP table is fixed per level.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Difficulty {
  #[serde(alias = "easy", alias = "EASY")]
  Easy,
  #[serde(alias = "medium", alias = "MEDIUM")]
  Medium,
  #[serde(alias = "hard", alias = "HARD")]
  Hard,
}

impl Difficulty {
  pub fn xp(self) -> u32 {
    match self {
      Difficulty::Easy => 30,
      Difficulty::Medium => 60,
      Difficulty::Hard => 100,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Difficulty::Easy => "Easy",
      Difficulty::Medium => "Medium",
      Difficulty::Hard => "Hard",
    }
  }
}

/// One stdin/expected-stdout pair. Both are whitespace-delimited token streams.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestCase {
  #[serde(default)]
  pub input: String,
  pub output: String,
}

/// Outcome of running one test case.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestResult {
  pub input: String,
  pub expected_output: String,
  pub actual_output: String,
  pub stderr: String,
  pub status_code: Option<i32>,
  pub passed: bool,
}

/// A persisted practice question.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Question {
  #[serde(deserialize_with = "string_or_number")]
  pub id: String,
  pub user_id: String,
  pub topic: String,
  pub title: String,
  pub description: String,
  #[serde(default, deserialize_with = "lines_or_list")]
  pub constraints: Vec<String>,
  pub testcases: Vec<TestCase>,
  pub difficulty: Difficulty,
  pub xp: u32,
  #[serde(default)]
  pub hint: String,
  pub created_at: DateTime<Utc>,
  // Scratch fields; the only part of a question that changes after creation.
  #[serde(default)]
  pub code: Option<String>,
  #[serde(default)]
  pub language: Option<String>,
}

/// Insert payload for a question; the store assigns `id` and `created_at`.
#[derive(Clone, Debug, Serialize)]
pub struct NewQuestion {
  pub user_id: String,
  pub topic: String,
  pub title: String,
  pub description: String,
  pub constraints: Vec<String>,
  pub testcases: Vec<TestCase>,
  pub difficulty: Difficulty,
  pub xp: u32,
  pub hint: String,
}

/// Append-only record of one full-suite submission attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmissionRecord {
  #[serde(deserialize_with = "string_or_number")]
  pub question_id: String,
  pub user_id: String,
  pub code: String,
  pub language: String,
  pub test_results: Vec<TestResult>,
  pub time_spent: u64,
  pub attempts: u32,
  pub xp: u32,
}

/// Structured oracle verdict on a submission.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Analysis {
  pub analysis: String,
  pub weaknesses: Vec<String>,
}

/// Accept constraints either as a list or as one newline-separated string.
pub fn lines_or_list<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    List(Vec<String>),
    Text(String),
    Null(()),
  }

  Ok(match Raw::deserialize(de)? {
    Raw::List(items) => items,
    Raw::Text(text) => text
      .lines()
      .map(|l| l.trim())
      .filter(|l| !l.is_empty())
      .map(str::to_string)
      .collect(),
    Raw::Null(()) => Vec::new(),
  })
}

/// Row ids arrive as text (uuid) or integers depending on the backing table.
pub fn string_or_number<'de, D>(de: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  #[derive(Deserialize)]
  #[serde(untagged)]
  enum Raw {
    Text(String),
    Int(i64),
  }

  Ok(match Raw::deserialize(de)? {
    Raw::Text(s) => s,
    Raw::Int(n) => n.to_string(),
  })
}
