//! Public protocol structs for the HTTP endpoints (serde ready).
//!
//! Request bodies deserialize with every field optional so that a missing field is
//! reported as one `validation_error` listing all of them, before any external
//! call is made.

use serde::{Deserialize, Serialize};

use crate::analysis::ProblemBrief;
use crate::domain::{TestCase, TestResult};
use crate::error::CoreError;
use crate::executor::ANY_VERSION;

// Absent, null and blank strings all count as missing.
fn required_str(v: Option<String>, name: &'static str, missing: &mut Vec<&'static str>) -> String {
    match v {
        Some(s) if !s.trim().is_empty() => s,
        _ => {
            missing.push(name);
            String::new()
        }
    }
}

fn required<T: Default>(v: Option<T>, name: &'static str, missing: &mut Vec<&'static str>) -> T {
    match v {
        Some(v) => v,
        None => {
            missing.push(name);
            T::default()
        }
    }
}

fn check_missing(missing: Vec<&'static str>) -> Result<(), CoreError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CoreError::validation(format!("Missing required fields: {}", missing.join(", "))))
    }
}

//
// submit
//

#[derive(Debug, Deserialize)]
pub struct SubmitIn {
    pub language: Option<String>,
    pub version: Option<String>,
    pub source_code: Option<String>,
    #[serde(rename = "testCases")]
    pub test_cases: Option<Vec<TestCase>>,
}

pub struct SubmitCmd {
    pub language: String,
    pub version: String,
    pub source_code: String,
    pub test_cases: Vec<TestCase>,
}

impl SubmitIn {
    pub fn validate(self) -> Result<SubmitCmd, CoreError> {
        let mut missing = vec![];
        let language = required_str(self.language, "language", &mut missing);
        let source_code = required_str(self.source_code, "source_code", &mut missing);
        let test_cases = required(self.test_cases, "testCases", &mut missing);
        check_missing(missing)?;
        Ok(SubmitCmd {
            language,
            version: self
                .version
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| ANY_VERSION.into()),
            source_code,
            test_cases,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct SubmitOut {
    pub results: Vec<TestResult>,
}

//
// analyze
//

#[derive(Debug, Deserialize)]
pub struct AnalyzeIn {
    pub code: Option<String>,
    pub language: Option<String>,
    pub question: Option<ProblemBrief>,
    #[serde(rename = "testResults")]
    pub test_results: Option<Vec<TestResult>>,
    pub attempts: Option<u32>,
    #[serde(rename = "timeSpentInSeconds")]
    pub time_spent: Option<u64>,
    /// Absent means "use the stored snapshot"; an empty list means "none".
    #[serde(rename = "previousWeaknesses")]
    pub previous_weaknesses: Option<Vec<String>>,
    pub user_id: Option<String>,
}

pub struct AnalyzeCmd {
    pub code: String,
    pub language: String,
    pub question: ProblemBrief,
    pub test_results: Vec<TestResult>,
    pub attempts: u32,
    pub time_spent: u64,
    pub previous_weaknesses: Option<Vec<String>>,
    pub user_id: String,
}

impl AnalyzeIn {
    pub fn validate(self) -> Result<AnalyzeCmd, CoreError> {
        let mut missing = vec![];
        let code = required_str(self.code, "code", &mut missing);
        let language = required_str(self.language, "language", &mut missing);
        let question = required(self.question, "question", &mut missing);
        let test_results = required(self.test_results, "testResults", &mut missing);
        let user_id = required_str(self.user_id, "user_id", &mut missing);
        check_missing(missing)?;
        Ok(AnalyzeCmd {
            code,
            language,
            question,
            test_results,
            attempts: self.attempts.unwrap_or(1),
            time_spent: self.time_spent.unwrap_or(0),
            previous_weaknesses: self.previous_weaknesses,
            user_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyzeOut {
    pub analysis: String,
    pub weaknesses: Vec<String>,
    /// False when the weakness ledger write failed; the analysis is still valid.
    pub persisted: bool,
}

//
// generate
//

#[derive(Debug, Deserialize)]
pub struct GenerateFirstIn {
    pub topic: Option<String>,
    pub user_id: Option<String>,
}

impl GenerateFirstIn {
    pub fn validate(self) -> Result<(String, String), CoreError> {
        let mut missing = vec![];
        let topic = required_str(self.topic, "topic", &mut missing);
        let user_id = required_str(self.user_id, "user_id", &mut missing);
        check_missing(missing)?;
        Ok((topic, user_id))
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateNextIn {
    pub topic: Option<String>,
    /// Absent: read from the ledger.
    pub weaknesses: Option<Vec<String>>,
    /// Absent: derived from the learner's passing submissions. Earliest first.
    pub solved_questions: Option<Vec<String>>,
    pub user_id: Option<String>,
}

pub struct GenerateNextCmd {
    pub topic: String,
    pub weaknesses: Option<Vec<String>>,
    pub solved_questions: Option<Vec<String>>,
    pub user_id: String,
}

impl GenerateNextIn {
    pub fn validate(self) -> Result<GenerateNextCmd, CoreError> {
        let mut missing = vec![];
        let topic = required_str(self.topic, "topic", &mut missing);
        let user_id = required_str(self.user_id, "user_id", &mut missing);
        check_missing(missing)?;
        Ok(GenerateNextCmd {
            topic,
            weaknesses: self.weaknesses,
            solved_questions: self.solved_questions,
            user_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct IdOut {
    pub id: String,
}

//
// weakness / progress (learner-keyed lookups)
//

#[derive(Debug, Deserialize)]
pub struct LearnerIn {
    pub user_id: Option<String>,
}

impl LearnerIn {
    pub fn validate(self) -> Result<String, CoreError> {
        let mut missing = vec![];
        let user_id = required_str(self.user_id, "user_id", &mut missing);
        check_missing(missing)?;
        Ok(user_id)
    }
}

#[derive(Debug, Serialize)]
pub struct WeaknessOut {
    pub weaknesses: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct TopicXp {
    pub name: String,
    pub xp: u64,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub topic: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ProgressOut {
    pub topics: Vec<TopicXp>,
    pub history: Vec<HistoryEntry>,
}

//
// evaluate (full pipeline)
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateIn {
    pub question_id: Option<String>,
    #[serde(alias = "user_id")]
    pub user_id: Option<String>,
    pub language: Option<String>,
    pub version: Option<String>,
    #[serde(alias = "source_code")]
    pub source_code: Option<String>,
    pub attempts: Option<u32>,
    pub time_spent_in_seconds: Option<u64>,
}

pub struct EvaluateCmd {
    pub question_id: String,
    pub user_id: String,
    pub language: String,
    pub version: String,
    pub source_code: String,
    pub attempts: u32,
    pub time_spent: u64,
}

impl EvaluateIn {
    pub fn validate(self) -> Result<EvaluateCmd, CoreError> {
        let mut missing = vec![];
        let question_id = required_str(self.question_id, "questionId", &mut missing);
        let user_id = required_str(self.user_id, "userId", &mut missing);
        let language = required_str(self.language, "language", &mut missing);
        let source_code = required_str(self.source_code, "sourceCode", &mut missing);
        let attempts = required(self.attempts, "attempts", &mut missing);
        check_missing(missing)?;
        if attempts == 0 {
            return Err(CoreError::validation("attempts must be at least 1"));
        }
        Ok(EvaluateCmd {
            question_id,
            user_id,
            language,
            version: self
                .version
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| ANY_VERSION.into()),
            source_code,
            attempts,
            time_spent: self.time_spent_in_seconds.unwrap_or(0),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateOut {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub total: usize,
    pub all_passed: bool,
    pub xp: u32,
    pub hint_unlocked: bool,
    pub recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weaknesses: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_error: Option<String>,
}

//
// hint / scratch / practice
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintIn {
    pub question_id: Option<String>,
    pub attempts: Option<u32>,
}

impl HintIn {
    pub fn validate(self) -> Result<(String, u32), CoreError> {
        let mut missing = vec![];
        let question_id = required_str(self.question_id, "questionId", &mut missing);
        let attempts = required(self.attempts, "attempts", &mut missing);
        check_missing(missing)?;
        Ok((question_id, attempts))
    }
}

#[derive(Debug, Serialize)]
pub struct HintOut {
    pub hint: String,
}

#[derive(Debug, Deserialize)]
pub struct ScratchIn {
    pub code: Option<String>,
    pub language: Option<String>,
}

impl ScratchIn {
    pub fn validate(self) -> Result<(String, String), CoreError> {
        let mut missing = vec![];
        // Clearing the editor is a legitimate save.
        let code = required(self.code, "code", &mut missing);
        let language = required_str(self.language, "language", &mut missing);
        check_missing(missing)?;
        Ok((code, language))
    }
}

#[derive(Debug, Serialize)]
pub struct PracticeOut {
    pub id: String,
    pub generated: bool,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_lists_every_missing_field() {
        let input: SubmitIn = serde_json::from_str(r#"{"language": "python"}"#).unwrap();
        let err = input.validate().err().unwrap();
        assert_eq!(err.code(), "validation_error");
        assert_eq!(err.to_string(), "Missing required fields: source_code, testCases");
    }

    #[test]
    fn submit_defaults_version_to_any() {
        let input: SubmitIn = serde_json::from_str(
            r#"{"language": "python", "source_code": "print(2)", "testCases": [{"input": "1 2 3\n5", "output": "2"}]}"#,
        )
        .unwrap();
        let cmd = input.validate().unwrap();
        assert_eq!(cmd.version, "*");
        assert_eq!(cmd.test_cases[0].input, "1 2 3\n5");
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let input: GenerateFirstIn = serde_json::from_str(r#"{"topic": "  ", "user_id": "u1"}"#).unwrap();
        assert_eq!(input.validate().unwrap_err().to_string(), "Missing required fields: topic");
    }

    #[test]
    fn analyze_distinguishes_absent_and_empty_weaknesses() {
        let base = r#""code": "x", "language": "python", "question": {"title": "t"}, "testResults": [], "user_id": "u1""#;
        let absent: AnalyzeIn = serde_json::from_str(&format!("{{{}}}", base)).unwrap();
        assert!(absent.validate().unwrap().previous_weaknesses.is_none());
        let empty: AnalyzeIn = serde_json::from_str(&format!("{{{}, \"previousWeaknesses\": []}}", base)).unwrap();
        assert_eq!(empty.validate().unwrap().previous_weaknesses, Some(vec![]));
    }

    #[test]
    fn evaluate_accepts_snake_case_aliases() {
        let input: EvaluateIn = serde_json::from_str(
            r#"{"questionId": "q1", "user_id": "u1", "language": "python", "source_code": "x", "attempts": 2}"#,
        )
        .unwrap();
        let cmd = input.validate().unwrap();
        assert_eq!(cmd.user_id, "u1");
        assert_eq!(cmd.source_code, "x");
        assert_eq!(cmd.time_spent, 0);
    }

    #[test]
    fn evaluate_rejects_zero_attempts() {
        let input: EvaluateIn = serde_json::from_str(
            r#"{"questionId": "q1", "userId": "u1", "language": "python", "sourceCode": "x", "attempts": 0}"#,
        )
        .unwrap();
        assert_eq!(input.validate().err().unwrap().code(), "validation_error");
    }
}
