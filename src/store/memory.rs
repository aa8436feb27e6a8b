//! In-process store used when no database is configured, and by the tests.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::Store;
use crate::domain::{NewQuestion, Question, SubmissionRecord};
use crate::error::StoreError;

#[derive(Clone, Default)]
pub struct MemoryStore {
    by_id: Arc<RwLock<HashMap<String, Question>>>,
    // Question ids per owner, in creation order.
    by_user: Arc<RwLock<HashMap<String, Vec<String>>>>,
    weaknesses: Arc<RwLock<HashMap<String, Vec<String>>>>,
    submissions: Arc<RwLock<Vec<SubmissionRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    #[instrument(level = "debug", skip(self, q), fields(user_id = %q.user_id, topic = %q.topic))]
    async fn insert_question(&self, q: NewQuestion) -> Result<Question, StoreError> {
        let question = Question {
            id: Uuid::new_v4().to_string(),
            user_id: q.user_id,
            topic: q.topic,
            title: q.title,
            description: q.description,
            constraints: q.constraints,
            testcases: q.testcases,
            difficulty: q.difficulty,
            xp: q.xp,
            hint: q.hint,
            created_at: Utc::now(),
            code: None,
            language: None,
        };
        let mut by_id = self.by_id.write().await;
        let mut by_user = self.by_user.write().await;
        by_user
            .entry(question.user_id.clone())
            .or_default()
            .push(question.id.clone());
        by_id.insert(question.id.clone(), question.clone());
        debug!(target: "store", id = %question.id, "Question inserted");
        Ok(question)
    }

    async fn get_question(&self, id: &str) -> Result<Option<Question>, StoreError> {
        Ok(self.by_id.read().await.get(id).cloned())
    }

    async fn latest_question(&self, user_id: &str, topic: &str) -> Result<Option<Question>, StoreError> {
        let ids = { self.by_user.read().await.get(user_id).cloned() }.unwrap_or_default();
        let by_id = self.by_id.read().await;
        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| by_id.get(id))
            .find(|q| q.topic == topic)
            .cloned())
    }

    async fn questions_for_user(&self, user_id: &str) -> Result<Vec<Question>, StoreError> {
        let ids = { self.by_user.read().await.get(user_id).cloned() }.unwrap_or_default();
        let by_id = self.by_id.read().await;
        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    async fn update_scratch(&self, id: &str, code: &str, language: &str) -> Result<bool, StoreError> {
        let mut by_id = self.by_id.write().await;
        match by_id.get_mut(id) {
            Some(q) => {
                q.code = Some(code.to_string());
                q.language = Some(language.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_weaknesses(&self, user_id: &str) -> Result<Option<Vec<String>>, StoreError> {
        Ok(self.weaknesses.read().await.get(user_id).cloned())
    }

    async fn replace_weaknesses(&self, user_id: &str, weaknesses: &[String]) -> Result<(), StoreError> {
        self.weaknesses
            .write()
            .await
            .insert(user_id.to_string(), weaknesses.to_vec());
        Ok(())
    }

    async fn insert_submission(&self, rec: &SubmissionRecord) -> Result<(), StoreError> {
        self.submissions.write().await.push(rec.clone());
        Ok(())
    }

    async fn submissions_for_user(&self, user_id: &str) -> Result<Vec<SubmissionRecord>, StoreError> {
        Ok(self
            .submissions
            .read()
            .await
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }
}
