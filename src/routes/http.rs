//! HTTP endpoint handlers. These are thin wrappers that validate the body and
//! forward to the pipelines in `logic`. Errors render through `CoreError`.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, instrument};

use crate::domain::Question;
use crate::error::CoreError;
use crate::extractors::ApiJson;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, CoreError>;

#[instrument(level = "info")]
pub async fn http_health() -> Json<HealthOut> {
    Json(HealthOut { ok: true })
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_submit(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<SubmitIn>,
) -> ApiResult<SubmitOut> {
    let cmd = body.validate()?;
    let results = run_tests(&state, &cmd).await?;
    info!(
        target: "grading",
        passed = results.iter().filter(|r| r.passed).count(),
        total = results.len(),
        "HTTP submit graded"
    );
    Ok(Json(SubmitOut { results }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_analyze(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<AnalyzeIn>,
) -> ApiResult<AnalyzeOut> {
    let cmd = body.validate()?;
    let out = analyze_submission(&state, cmd).await?;
    info!(target: "oracle", weaknesses = out.weaknesses.len(), persisted = out.persisted, "HTTP analyze served");
    Ok(Json(out))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_generate_first(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<GenerateFirstIn>,
) -> ApiResult<Question> {
    let (topic, user_id) = body.validate()?;
    Ok(Json(generate_first(&state, &topic, &user_id).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_generate_next(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<GenerateNextIn>,
) -> ApiResult<IdOut> {
    let cmd = body.validate()?;
    let q = generate_next(&state, cmd).await?;
    Ok(Json(IdOut { id: q.id }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_weakness(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LearnerIn>,
) -> ApiResult<WeaknessOut> {
    let user_id = body.validate()?;
    let weaknesses = learner_weaknesses(&state, &user_id).await?;
    Ok(Json(WeaknessOut { weaknesses }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_evaluate(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<EvaluateIn>,
) -> ApiResult<EvaluateOut> {
    let cmd = body.validate()?;
    Ok(Json(evaluate_submission(&state, cmd).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_hint(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<HintIn>,
) -> ApiResult<HintOut> {
    let (question_id, attempts) = body.validate()?;
    let hint = unlock_hint(&state, &question_id, attempts).await?;
    info!(target: "codeforge", %question_id, "HTTP hint served");
    Ok(Json(HintOut { hint }))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Question> {
    Ok(Json(get_question(&state, &id).await?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_put_scratch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ScratchIn>,
) -> ApiResult<HealthOut> {
    let (code, language) = body.validate()?;
    save_scratch(&state, &id, &code, &language).await?;
    Ok(Json(HealthOut { ok: true }))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_practice_open(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<GenerateFirstIn>,
) -> ApiResult<PracticeOut> {
    let (topic, user_id) = body.validate()?;
    let out = open_practice(&state, &topic, &user_id).await?;
    info!(target: "codeforge", id = %out.id, generated = out.generated, "HTTP practice opened");
    Ok(Json(out))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_progress(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LearnerIn>,
) -> ApiResult<ProgressOut> {
    let user_id = body.validate()?;
    Ok(Json(learner_progress(&state, &user_id).await?))
}
