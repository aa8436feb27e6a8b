//! Submission recorder: best-effort append of graded attempts to the audit log.

use tracing::{error, info, instrument};

use crate::domain::SubmissionRecord;
use crate::store::Store;

/// Persist one submission. Failures are logged and reported as `false`; they never
/// reach the learner-facing response.
#[instrument(level = "info", skip(store, rec), fields(question_id = %rec.question_id, user_id = %rec.user_id, attempts = rec.attempts, xp = rec.xp))]
pub async fn record(store: &dyn Store, rec: &SubmissionRecord) -> bool {
  match store.insert_submission(rec).await {
    Ok(()) => {
      info!(target: "submissions", tests = rec.test_results.len(), time_spent = rec.time_spent, "Submission recorded");
      true
    }
    Err(e) => {
      error!(target: "submissions", error = %e, "Failed to record submission; continuing");
      false
    }
  }
}
