//! HTTP surface: one handler module per resource, assembled into a single
//! `axum::Router`, with CORS and request tracing layered on top.
//!
//! Authentication is out of scope: every handler trusts an `x-user-id`
//! header to already carry an authenticated user id, the way a reverse
//! proxy or auth middleware would inject it upstream.

pub mod data_sources;
pub mod factory;
pub mod feed;
pub mod feedback;
pub mod paper;
pub mod pool_settings;
pub mod tts;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::cache::Cache;
use crate::config::Settings;
use crate::ingestion::ArxivClient;
use crate::orchestrator::Orchestrator;
use crate::provider_pool::ProviderPool;

/// Shared application state, constructed once in `main` and cloned (cheaply,
/// via `Arc`) into every handler rather than reached for as a module-level
/// singleton.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub cache: Arc<Cache>,
    pub settings: Arc<Settings>,
    pub providers: Arc<ProviderPool>,
    pub orchestrator: Arc<Orchestrator>,
    pub arxiv_client: Arc<ArxivClient>,
}

/// Extracts the caller's user id from the `x-user-id` header. A production
/// deployment would instead decode this from a validated JWT/session;
/// this extractor is the seam where that would plug in.
pub struct UserId(pub String);

impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| UserId(s.to_string()))
            .ok_or((StatusCode::UNAUTHORIZED, "missing x-user-id header"))
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/feed", get(feed::get_feed))
        .route("/v1/feed/feedback", post(feedback::post_feedback))
        .route("/v1/paper/{id}/{artifact}", get(paper::get_artifact))
        .route("/v1/paper/{id}/infographic", post(paper::post_infographic))
        .route("/v1/paper/{id}/visual", post(paper::post_visual))
        .route(
            "/v1/pool-settings",
            get(pool_settings::list_pool_settings),
        )
        .route(
            "/v1/pool-settings/{source_key}",
            get(pool_settings::get_pool_settings).put(pool_settings::put_pool_settings),
        )
        .route("/v1/data-sources", get(data_sources::list_data_sources))
        .route("/v1/available-conferences", get(data_sources::list_conferences))
        .route("/v1/factory/status", get(factory::status))
        .route("/v1/factory/{job}", post(factory::trigger))
        .route("/v1/factory/conference/{conf_id}/{job}", post(factory::trigger_conference))
        .route("/v1/tts/audio/{paper_id}", get(tts::audio_metadata))
        .route("/v1/tts/file/{filename}", get(tts::stream_file))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
