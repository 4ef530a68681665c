//! `POST /v1/feed/feedback` — the Feedback Handler's HTTP entry point.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::feedback::{apply_feedback, FeedbackRequest};
use crate::http::{AppState, UserId};
use crate::models::{FeedbackKind, FeedbackResult};

#[derive(Debug, Deserialize)]
pub struct FeedbackBody {
    pub paper_id: Uuid,
    pub action: FeedbackKind,
    pub value: bool,
    #[serde(default)]
    pub confirmed: bool,
}

pub async fn post_feedback(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(body): Json<FeedbackBody>,
) -> Result<Json<FeedbackResult>> {
    let req = FeedbackRequest {
        user_id,
        paper_id: body.paper_id,
        kind: body.action,
        value: body.value,
        confirmed: body.confirmed,
    };
    let result = apply_feedback(&state.pool, &state.cache, req).await?;
    Ok(Json(result))
}
