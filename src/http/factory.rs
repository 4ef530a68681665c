//! `GET /v1/factory/status`, `POST /v1/factory/{job}`, and
//! `POST /v1/factory/conference/{conf_id}/{job}` — the Job Orchestrator's
//! HTTP surface. Each trigger claims its `JobKind` synchronously (so a
//! second call while one is running gets a 409 immediately) then runs the
//! job body on a detached task, recording the outcome back on the
//! orchestrator when it finishes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::http::AppState;
use crate::jobs;
use crate::orchestrator::{JobKind, JobStatus};

#[derive(Debug, Deserialize)]
pub struct TriggerQuery {
    /// Target ingestion/ranking date; defaults to today (UTC) when absent.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub job: String,
    pub status: &'static str,
}

pub async fn status(State(state): State<AppState>) -> Json<HashMap<JobKind, JobStatus>> {
    Json(state.orchestrator.snapshot())
}

fn parse_job_kind(job: &str) -> Result<JobKind> {
    match job {
        "fetch-arxiv" => Ok(JobKind::FetchArxiv),
        "candidate-pool" => Ok(JobKind::GenCandidatePool),
        "recommendation" => Ok(JobKind::GenRecommendation),
        "content-gen" => Ok(JobKind::GenContent),
        other => Err(AppError::Validation(format!("unknown job '{other}'"))),
    }
}

pub async fn trigger(
    State(state): State<AppState>,
    Path(job): Path<String>,
    Query(query): Query<TriggerQuery>,
) -> Result<Json<TriggerResponse>> {
    let kind = parse_job_kind(&job)?;
    state.orchestrator.start(kind, None)?;

    let target_date = query.date.unwrap_or_else(|| chrono::Utc::now().date_naive());
    let pool = state.pool.clone();
    let settings = Arc::clone(&state.settings);
    let providers = Arc::clone(&state.providers);
    let arxiv_client = Arc::clone(&state.arxiv_client);
    let orchestrator = Arc::clone(&state.orchestrator);

    tokio::spawn(async move {
        let outcome = match kind {
            JobKind::FetchArxiv => {
                jobs::fetch_arxiv(&pool, &arxiv_client, &providers, &settings, target_date).await
            }
            JobKind::GenCandidatePool => jobs::gen_candidate_pool(&pool, target_date).await,
            JobKind::GenRecommendation => jobs::gen_recommendation(&pool, &settings, target_date).await,
            JobKind::GenContent => jobs::gen_content(&pool, &providers, &settings, target_date).await,
            _ => unreachable!("conference job kinds never reach the arxiv dispatcher"),
        };
        record_outcome(&orchestrator, kind, outcome);
    });

    Ok(Json(TriggerResponse { job, status: "started" }))
}

pub async fn trigger_conference(
    State(state): State<AppState>,
    Path((conf_id, job)): Path<(String, String)>,
) -> Result<Json<TriggerResponse>> {
    let kind = match job.as_str() {
        "import" => JobKind::ConferenceImport,
        "pool" => JobKind::ConferencePool,
        "content" => JobKind::ConferenceContent,
        other => return Err(AppError::Validation(format!("unknown conference job '{other}'"))),
    };
    state.orchestrator.start(kind, Some(conf_id.clone()))?;

    let pool = state.pool.clone();
    let settings = Arc::clone(&state.settings);
    let providers = Arc::clone(&state.providers);
    let orchestrator = Arc::clone(&state.orchestrator);
    let conf_id_task = conf_id.clone();

    tokio::spawn(async move {
        let outcome = match kind {
            JobKind::ConferenceImport => jobs::conference_import(&pool, &settings, &conf_id_task).await,
            JobKind::ConferencePool => {
                // A fresh pool also drives a fresh per-user ranking, mirroring
                // how the daily `candidate-pool` job feeds `recommendation`.
                let pool_outcome = jobs::conference_pool(&pool, &conf_id_task).await;
                match pool_outcome {
                    Ok(count) => {
                        if let Err(e) = jobs::conference_recommendation(&pool, &settings, &conf_id_task).await {
                            tracing::warn!(conf_id = %conf_id_task, error = %e, "conference ranking failed");
                        }
                        Ok(count)
                    }
                    Err(e) => Err(e),
                }
            }
            JobKind::ConferenceContent => jobs::conference_content(&pool, &providers, &settings, &conf_id_task).await,
            _ => unreachable!("arxiv job kinds never reach the conference dispatcher"),
        };
        record_outcome(&orchestrator, kind, outcome);
    });

    Ok(Json(TriggerResponse { job, status: "started" }))
}

fn record_outcome(orchestrator: &crate::orchestrator::Orchestrator, kind: JobKind, outcome: Result<u64>) {
    match outcome {
        Ok(count) => orchestrator.finish_success(kind, count),
        Err(e) => {
            tracing::error!(?kind, error = %e, "factory job failed");
            orchestrator.finish_error(kind, e.to_string());
        }
    }
}
