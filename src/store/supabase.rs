//! Store backed by a Supabase project through its PostgREST interface.
//!
//! Inserts ask for `return=representation` so the generated question id comes
//! back from the insert itself. Weakness writes are upserts keyed by `user_id`.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::Store;
use crate::config::SupabaseSettings;
use crate::domain::{NewQuestion, Question, SubmissionRecord};
use crate::error::StoreError;

const QUESTIONS: &str = "questions";
const WEAKNESSES: &str = "user_weaknesses";
const SUBMISSIONS: &str = "submissions";

#[derive(Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    rest_url: String,
    key: String,
}

impl SupabaseStore {
    pub fn new(settings: &SupabaseSettings) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            rest_url: format!("{}/rest/v1", settings.url.trim_end_matches('/')),
            key: settings.key.clone(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/{}", self.rest_url, table))
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
            .header(CONTENT_TYPE, "application/json")
    }

    async fn send_rows<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Vec<T>, StoreError> {
        let res = req.send().await.map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = res.status();
        let body = res.text().await.map_err(|e| StoreError::Transport(e.to_string()))?;
        if !status.is_success() {
            let message = extract_postgrest_message(&body).unwrap_or(body);
            warn!(target: "store", %status, %message, "Store rejected request");
            return Err(StoreError::Rejected { status: status.as_u16(), message });
        }
        serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn send_no_content(&self, req: RequestBuilder) -> Result<(), StoreError> {
        let res = req.send().await.map_err(|e| StoreError::Transport(e.to_string()))?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let message = extract_postgrest_message(&body).unwrap_or(body);
            warn!(target: "store", %status, %message, "Store rejected request");
            return Err(StoreError::Rejected { status: status.as_u16(), message });
        }
        Ok(())
    }
}

fn eq(v: &str) -> String {
    format!("eq.{}", v)
}

#[async_trait]
impl Store for SupabaseStore {
    #[instrument(level = "debug", skip(self, q), fields(user_id = %q.user_id, topic = %q.topic))]
    async fn insert_question(&self, q: NewQuestion) -> Result<Question, StoreError> {
        let req = self
            .request(Method::POST, QUESTIONS)
            .header("Prefer", "return=representation")
            .json(&[q]);
        let mut rows: Vec<Question> = self.send_rows(req).await?;
        let row = rows
            .pop()
            .ok_or_else(|| StoreError::Decode("insert returned no row".into()))?;
        debug!(target: "store", id = %row.id, "Question inserted");
        Ok(row)
    }

    async fn get_question(&self, id: &str) -> Result<Option<Question>, StoreError> {
        let req = self
            .request(Method::GET, QUESTIONS)
            .query(&[("select", "*".to_string()), ("id", eq(id))]);
        let rows: Vec<Question> = self.send_rows(req).await?;
        Ok(rows.into_iter().next())
    }

    async fn latest_question(&self, user_id: &str, topic: &str) -> Result<Option<Question>, StoreError> {
        let req = self.request(Method::GET, QUESTIONS).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(user_id)),
            ("topic", eq(topic)),
            ("order", "created_at.desc".to_string()),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<Question> = self.send_rows(req).await?;
        Ok(rows.into_iter().next())
    }

    async fn questions_for_user(&self, user_id: &str) -> Result<Vec<Question>, StoreError> {
        let req = self.request(Method::GET, QUESTIONS).query(&[
            ("select", "*".to_string()),
            ("user_id", eq(user_id)),
            ("order", "created_at.asc".to_string()),
        ]);
        self.send_rows(req).await
    }

    async fn update_scratch(&self, id: &str, code: &str, language: &str) -> Result<bool, StoreError> {
        let req = self
            .request(Method::PATCH, QUESTIONS)
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation")
            .json(&json!({ "code": code, "language": language }));
        let rows: Vec<serde_json::Value> = self.send_rows(req).await?;
        Ok(!rows.is_empty())
    }

    async fn get_weaknesses(&self, user_id: &str) -> Result<Option<Vec<String>>, StoreError> {
        #[derive(Deserialize)]
        struct Row {
            #[serde(default)]
            weaknesses: Option<Vec<String>>,
        }
        let req = self
            .request(Method::GET, WEAKNESSES)
            .query(&[("select", "weaknesses".to_string()), ("user_id", eq(user_id))]);
        let rows: Vec<Row> = self.send_rows(req).await?;
        Ok(rows.into_iter().next().map(|r| r.weaknesses.unwrap_or_default()))
    }

    #[instrument(level = "debug", skip(self, weaknesses), fields(count = weaknesses.len()))]
    async fn replace_weaknesses(&self, user_id: &str, weaknesses: &[String]) -> Result<(), StoreError> {
        #[derive(Serialize)]
        struct Row<'a> {
            user_id: &'a str,
            weaknesses: &'a [String],
        }
        let req = self
            .request(Method::POST, WEAKNESSES)
            .query(&[("on_conflict", "user_id")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[Row { user_id, weaknesses }]);
        self.send_no_content(req).await
    }

    async fn insert_submission(&self, rec: &SubmissionRecord) -> Result<(), StoreError> {
        let req = self
            .request(Method::POST, SUBMISSIONS)
            .header("Prefer", "return=minimal")
            .json(&[rec]);
        self.send_no_content(req).await
    }

    async fn submissions_for_user(&self, user_id: &str) -> Result<Vec<SubmissionRecord>, StoreError> {
        let req = self
            .request(Method::GET, SUBMISSIONS)
            .query(&[("select", "*".to_string()), ("user_id", eq(user_id))]);
        self.send_rows(req).await
    }
}

fn extract_postgrest_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Msg {
        message: String,
    }
    serde_json::from_str::<Msg>(body).ok().map(|m| m.message)
}
