//! `GET /v1/data-sources` and `GET /v1/available-conferences` — source
//! enumeration. Conferences are whatever static source keys already have a
//! ranking or candidate pool on file; there is no separate conference
//! registry table (out of scope: conference metadata administration).

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::error::Result;
use crate::http::AppState;

#[derive(Debug, Serialize)]
pub struct DataSource {
    pub key: String,
    pub label: String,
}

pub async fn list_data_sources(State(state): State<AppState>) -> Result<Json<Vec<DataSource>>> {
    let mut sources = vec![DataSource { key: "arxiv".into(), label: "arXiv (daily)".into() }];
    for category in &state.settings.arxiv_categories {
        sources.push(DataSource { key: category.clone(), label: format!("arXiv {category}") });
    }
    Ok(Json(sources))
}

pub async fn list_conferences(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        r#"SELECT DISTINCT source_key FROM user_paper_ranking
           WHERE source_key NOT LIKE 'arxiv\_day\_%' ESCAPE '\'
           ORDER BY source_key"#,
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows.into_iter().map(|(k,)| k).collect()))
}
