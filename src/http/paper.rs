//! `GET /v1/paper/{id}/{artifact}` and the infographic/visual upload
//! endpoints — per-paper enrichment artifact access.

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::http::AppState;
use crate::models::{PaperInfographic, PaperInterpretation, PaperTranslation, PaperTts, PaperVisual};

/// `GET /v1/paper/{id}/content-status` response: which artifacts exist.
#[derive(Debug, Serialize)]
pub struct ContentStatus {
    pub has_translation: bool,
    pub has_interpretation: bool,
    pub has_infographic: bool,
    pub has_visual: bool,
    pub has_tts: bool,
}

pub async fn get_artifact(
    State(state): State<AppState>,
    Path((id, artifact)): Path<(Uuid, String)>,
) -> Result<axum::response::Response> {
    use axum::response::IntoResponse;

    match artifact.as_str() {
        "translation" => {
            let row: Option<PaperTranslation> =
                sqlx::query_as("SELECT * FROM paper_translation WHERE paper_id = $1")
                    .bind(id)
                    .fetch_optional(&state.pool)
                    .await?;
            Ok(found(row).into_response())
        }
        "interpretation" => {
            let row: Option<PaperInterpretation> =
                sqlx::query_as("SELECT * FROM paper_interpretation WHERE paper_id = $1")
                    .bind(id)
                    .fetch_optional(&state.pool)
                    .await?;
            Ok(found(row).into_response())
        }
        "infographic" => {
            let row: Option<PaperInfographic> =
                sqlx::query_as("SELECT * FROM paper_infographic WHERE paper_id = $1")
                    .bind(id)
                    .fetch_optional(&state.pool)
                    .await?;
            Ok(found(row).into_response())
        }
        "visual" => {
            let row: Option<PaperVisual> = sqlx::query_as("SELECT * FROM paper_visual WHERE paper_id = $1")
                .bind(id)
                .fetch_optional(&state.pool)
                .await?;
            Ok(found(row).into_response())
        }
        "tts" => {
            let rows: Vec<PaperTts> = sqlx::query_as("SELECT * FROM paper_tts WHERE paper_id = $1")
                .bind(id)
                .fetch_all(&state.pool)
                .await?;
            Ok(Json(rows).into_response())
        }
        "content-status" => {
            let status = content_status(&state, id).await?;
            Ok(Json(status).into_response())
        }
        other => Err(AppError::Validation(format!("unknown artifact type '{other}'"))),
    }
}

fn found<T: Serialize>(row: Option<T>) -> axum::response::Response {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    match row {
        Some(value) => Json(value).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn content_status(state: &AppState, paper_id: Uuid) -> Result<ContentStatus> {
    let row: (bool, bool, bool, bool, bool) = sqlx::query_as(
        r#"SELECT
             EXISTS(SELECT 1 FROM paper_translation WHERE paper_id = $1),
             EXISTS(SELECT 1 FROM paper_interpretation WHERE paper_id = $1),
             EXISTS(SELECT 1 FROM paper_infographic WHERE paper_id = $1),
             EXISTS(SELECT 1 FROM paper_visual WHERE paper_id = $1),
             EXISTS(SELECT 1 FROM paper_tts WHERE paper_id = $1)"#,
    )
    .bind(paper_id)
    .fetch_one(&state.pool)
    .await?;
    Ok(ContentStatus {
        has_translation: row.0,
        has_interpretation: row.1,
        has_infographic: row.2,
        has_visual: row.3,
        has_tts: row.4,
    })
}

#[derive(Debug, Deserialize)]
pub struct InfographicBody {
    pub html_content: String,
    pub checksum: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: Uuid,
    pub message: String,
}

pub async fn post_infographic(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<InfographicBody>,
) -> Result<Json<UploadResponse>> {
    sqlx::query(
        r#"INSERT INTO paper_infographic (paper_id, html_content, checksum, updated_at)
           VALUES ($1, $2, $3, now())
           ON CONFLICT (paper_id) DO UPDATE SET
             html_content = EXCLUDED.html_content, checksum = EXCLUDED.checksum, updated_at = now()"#,
    )
    .bind(id)
    .bind(&body.html_content)
    .bind(&body.checksum)
    .execute(&state.pool)
    .await?;
    Ok(Json(UploadResponse { id, message: "infographic saved".into() }))
}

#[derive(Debug, Deserialize)]
pub struct VisualBody {
    pub image_data: String,
    pub checksum: Option<String>,
}

pub async fn post_visual(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<VisualBody>,
) -> Result<Json<UploadResponse>> {
    sqlx::query(
        r#"INSERT INTO paper_visual (paper_id, image_data, checksum, updated_at)
           VALUES ($1, $2, $3, now())
           ON CONFLICT (paper_id) DO UPDATE SET
             image_data = EXCLUDED.image_data, checksum = EXCLUDED.checksum, updated_at = now()"#,
    )
    .bind(id)
    .bind(&body.image_data)
    .bind(&body.checksum)
    .execute(&state.pool)
    .await?;
    Ok(Json(UploadResponse { id, message: "visual saved".into() }))
}
