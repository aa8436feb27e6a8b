//! Grader: runs every test case through the executor, one at a time, and compares
//! stdout to the expected output.
//!
//! Equality trims leading/trailing whitespace only. Internal spacing and newlines
//! must match exactly.

use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::{TestCase, TestResult};
use crate::error::CoreError;
use crate::executor::{ExecutionRequest, Executor};

/// Whitespace rule used for every comparison.
pub fn outputs_match(actual: &str, expected: &str) -> bool {
  actual.trim() == expected.trim()
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GradeSummary {
  pub passed: usize,
  pub total: usize,
  pub all_passed: bool,
}

impl GradeSummary {
  pub fn of(results: &[TestResult]) -> Self {
    let passed = results.iter().filter(|r| r.passed).count();
    let total = results.len();
    // An empty suite proves nothing.
    Self { passed, total, all_passed: total > 0 && passed == total }
  }
}

/// Grade `source_code` against `cases`, preserving input order.
///
/// Execution is sequential; the first execution failure aborts the whole batch
/// and no partial results are returned.
#[instrument(level = "info", skip(executor, source_code, cases), fields(%language, cases = cases.len(), src_len = source_code.len()))]
pub async fn grade(
  executor: &dyn Executor,
  language: &str,
  version: &str,
  source_code: &str,
  cases: &[TestCase],
) -> Result<Vec<TestResult>, CoreError> {
  let mut results = Vec::with_capacity(cases.len());
  for case in cases {
    let out = executor
      .execute(ExecutionRequest { language, version, source_code, stdin: &case.input })
      .await?;
    let passed = outputs_match(&out.stdout, &case.output);
    results.push(TestResult {
      input: case.input.clone(),
      expected_output: case.output.clone(),
      actual_output: out.stdout,
      stderr: out.stderr,
      status_code: out.exit_code,
      passed,
    });
  }

  let summary = GradeSummary::of(&results);
  info!(target: "grading", passed = summary.passed, total = summary.total, "Graded submission");
  Ok(results)
}
