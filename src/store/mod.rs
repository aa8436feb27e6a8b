//! Persistence seam. The pipeline only ever talks to `dyn Store`.
//!
//! Logical layout:
//!   questions(id, user_id, title, description, constraints, testcases, difficulty, xp, hint, topic, created_at, code?, language?)
//!   user_weaknesses(user_id, weaknesses)
//!   submissions(question_id, user_id, code, language, test_results, time_spent, attempts, xp)

use async_trait::async_trait;

use crate::domain::{NewQuestion, Question, SubmissionRecord};
use crate::error::StoreError;

pub mod memory;
pub mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert and return the stored row, including its generated id.
    async fn insert_question(&self, q: NewQuestion) -> Result<Question, StoreError>;
    async fn get_question(&self, id: &str) -> Result<Option<Question>, StoreError>;
    /// Most recently created question owned by `user_id` for `topic`.
    async fn latest_question(&self, user_id: &str, topic: &str) -> Result<Option<Question>, StoreError>;
    /// All questions owned by `user_id`, oldest first.
    async fn questions_for_user(&self, user_id: &str) -> Result<Vec<Question>, StoreError>;
    /// Returns false when no such question exists.
    async fn update_scratch(&self, id: &str, code: &str, language: &str) -> Result<bool, StoreError>;

    async fn get_weaknesses(&self, user_id: &str) -> Result<Option<Vec<String>>, StoreError>;
    /// Replace the learner's whole weakness sequence (creating the row if needed).
    async fn replace_weaknesses(&self, user_id: &str, weaknesses: &[String]) -> Result<(), StoreError>;

    async fn insert_submission(&self, rec: &SubmissionRecord) -> Result<(), StoreError>;
    async fn submissions_for_user(&self, user_id: &str) -> Result<Vec<SubmissionRecord>, StoreError>;
}
