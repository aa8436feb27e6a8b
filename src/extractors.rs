use axum::{
    extract::{FromRequest, Request},
    Json,
};

use crate::error::CoreError;

/// JSON body extractor whose rejections use the service's error envelope
/// (`validation_error`, 400) instead of axum's plain-text responses.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: serde::de::DeserializeOwned + 'static,
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                let message = format!("Failed to parse JSON request body: {}", rejection.body_text());
                tracing::warn!(target: "codeforge", "{}", message);
                Err(CoreError::validation(message))
            }
        }
    }
}
