//! `GET /v1/feed` — the Feed Assembler's HTTP entry point.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::Result;
use crate::feed::{self as feed_core, FeedPage};
use crate::http::{AppState, UserId};

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub cursor: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub source: Option<String>,
    pub sub: Option<String>,
}

fn default_limit() -> usize {
    20
}

pub async fn get_feed(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedPage>> {
    let source = feed_core::resolve_source(query.source.as_deref(), query.sub.as_deref())?;
    let page = feed_core::get_feed(
        &state.pool,
        &state.cache,
        &state.settings,
        &user_id,
        source,
        query.cursor,
        query.limit.clamp(1, state.settings.batch_max_size as usize),
    )
    .await?;
    Ok(Json(page))
}
