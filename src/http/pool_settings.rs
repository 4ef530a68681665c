//! `GET/PUT /v1/pool-settings[/{source_key}]` — per-source user pool
//! shaping knobs (`DataSourcePoolSettings`).

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::Row;

use crate::error::{AppError, Result};
use crate::http::{AppState, UserId};
use crate::models::{DataSourcePoolSettings, ShowMode};

fn row_to_settings(user_id: String, source_key: String, row: &sqlx::postgres::PgRow) -> Result<DataSourcePoolSettings> {
    let show_mode_raw: String = row.try_get("show_mode")?;
    let show_mode = match show_mode_raw.as_str() {
        "all" => ShowMode::All,
        _ => ShowMode::Pool,
    };
    Ok(DataSourcePoolSettings {
        user_id,
        source_key,
        pool_ratio: row.try_get("pool_ratio")?,
        max_pool_size: row.try_get("max_pool_size")?,
        show_mode,
        filter_no_content: row.try_get("filter_no_content")?,
    })
}

pub async fn get_pool_settings(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(source_key): Path<String>,
) -> Result<Json<DataSourcePoolSettings>> {
    let row = sqlx::query(
        "SELECT pool_ratio, max_pool_size, show_mode, filter_no_content \
         FROM data_source_pool_settings WHERE user_id = $1 AND source_key = $2",
    )
    .bind(&user_id)
    .bind(&source_key)
    .fetch_optional(&state.pool)
    .await?;

    match row {
        Some(row) => Ok(Json(row_to_settings(user_id, source_key, &row)?)),
        None => Ok(Json(DataSourcePoolSettings {
            user_id,
            source_key,
            pool_ratio: 0.7,
            max_pool_size: 200,
            show_mode: ShowMode::Pool,
            filter_no_content: false,
        })),
    }
}

pub async fn list_pool_settings(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> Result<Json<Vec<DataSourcePoolSettings>>> {
    let rows = sqlx::query(
        "SELECT source_key, pool_ratio, max_pool_size, show_mode, filter_no_content \
         FROM data_source_pool_settings WHERE user_id = $1",
    )
    .bind(&user_id)
    .fetch_all(&state.pool)
    .await?;

    let mut settings = Vec::with_capacity(rows.len());
    for row in &rows {
        let source_key: String = row.try_get("source_key")?;
        settings.push(row_to_settings(user_id.clone(), source_key, row)?);
    }
    Ok(Json(settings))
}

#[derive(Debug, Deserialize)]
pub struct PoolSettingsBody {
    pub pool_ratio: f64,
    pub max_pool_size: i32,
    pub show_mode: ShowMode,
    pub filter_no_content: bool,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub message: String,
}

pub async fn put_pool_settings(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(source_key): Path<String>,
    Json(body): Json<PoolSettingsBody>,
) -> Result<Json<SavedResponse>> {
    let settings = DataSourcePoolSettings {
        user_id: user_id.clone(),
        source_key: source_key.clone(),
        pool_ratio: body.pool_ratio,
        max_pool_size: body.max_pool_size,
        show_mode: body.show_mode,
        filter_no_content: body.filter_no_content,
    };
    settings.validate().map_err(AppError::Validation)?;

    let show_mode_str = match settings.show_mode {
        ShowMode::Pool => "pool",
        ShowMode::All => "all",
    };

    sqlx::query(
        r#"INSERT INTO data_source_pool_settings
             (user_id, source_key, pool_ratio, max_pool_size, show_mode, filter_no_content)
           VALUES ($1, $2, $3, $4, $5, $6)
           ON CONFLICT (user_id, source_key) DO UPDATE SET
             pool_ratio = EXCLUDED.pool_ratio, max_pool_size = EXCLUDED.max_pool_size,
             show_mode = EXCLUDED.show_mode, filter_no_content = EXCLUDED.filter_no_content"#,
    )
    .bind(&user_id)
    .bind(&source_key)
    .bind(settings.pool_ratio)
    .bind(settings.max_pool_size)
    .bind(show_mode_str)
    .bind(settings.filter_no_content)
    .execute(&state.pool)
    .await?;

    Ok(Json(SavedResponse { message: "pool settings saved".into() }))
}
