//! Question submission and task polling.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::Task;

#[derive(Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

#[derive(Serialize)]
pub struct QuestionAccepted {
    pub task_id: Uuid,
}

/// `POST /api/questions` — enqueue a question, returns `202 Accepted`
/// with the task id to poll.
pub async fn submit(
    State(ctx): State<ApiContext>,
    Json(request): Json<QuestionRequest>,
) -> Result<(StatusCode, Json<QuestionAccepted>), ApiError> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question must not be blank".into()));
    }
    let task_id = ctx.orchestrator.submit(question.to_string());
    tracing::info!(%task_id, "question accepted");
    Ok((StatusCode::ACCEPTED, Json(QuestionAccepted { task_id })))
}

/// `GET /api/tasks/:id` — current state of a submitted question.
pub async fn status(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id: Uuid = id
        .parse()
        .map_err(|_| ApiError::BadRequest("task id must be a UUID".into()))?;
    let task = ctx
        .orchestrator
        .status(id)
        .ok_or_else(|| ApiError::NotFound(format!("no task with id {id}")))?;
    Ok(Json(task))
}
