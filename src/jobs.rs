//! Batch job bodies triggered by the Job Orchestrator and run on
//! `tokio::task::JoinSet`s bounded by `config.max_workers`, matching
//! concurrency model. Each function here is the payload behind one
//! `POST /v1/factory/...` trigger; `http::factory` spawns them and records
//! the outcome on the `Orchestrator`.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::candidate_pool;
use crate::config::Settings;
use crate::enrichment;
use crate::error::Result;
use crate::ingestion::{self, ArxivClient};
use crate::models::FilterType;
use crate::provider_pool::ProviderPool;
use crate::ranking_store;

/// `fetch-arxiv`: ingest one day's submissions.
pub async fn fetch_arxiv(
    pool: &PgPool,
    client: &ArxivClient,
    providers: &ProviderPool,
    settings: &Settings,
    target_date: NaiveDate,
) -> Result<u64> {
    let outcome = ingestion::ingest_for_date(pool, client, providers, settings, target_date, None).await?;
    Ok(outcome.batch.item_count as u64)
}

/// `candidate-pool`: rebuild every filter-type bucket for one day.
pub async fn gen_candidate_pool(pool: &PgPool, target_date: NaiveDate) -> Result<u64> {
    const ALL_FILTERS: [FilterType; 5] =
        [FilterType::Cs, FilterType::AiMlCvRo, FilterType::Math, FilterType::Physics, FilterType::All];

    let mut total = 0u64;
    for filter_type in ALL_FILTERS {
        total += candidate_pool::build_pool(pool, target_date, filter_type).await? as u64;
    }
    Ok(total)
}

/// `recommendation`: rank every onboarded user against the day's CS
/// candidate pool, the same source the on-demand ranking path draws from.
pub async fn gen_recommendation(pool: &PgPool, settings: &Settings, target_date: NaiveDate) -> Result<u64> {
    let candidate_ids = candidate_pool::read_pool(pool, target_date, FilterType::Cs).await?;
    if candidate_ids.is_empty() {
        return Ok(0);
    }

    let users = active_user_ids(pool).await?;
    let source_key = crate::models::arxiv_day_key(target_date);

    let semaphore = Arc::new(Semaphore::new(settings.max_workers.max(1)));
    let mut join_set = tokio::task::JoinSet::new();
    for user_id in users {
        let pool = pool.clone();
        let source_key = source_key.clone();
        let candidate_ids = candidate_ids.clone();
        let embedding_model = settings.embedding_model.clone();
        let semaphore = Arc::clone(&semaphore);
        join_set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            ranking_store::upsert_ranking(
                &pool,
                &user_id,
                &source_key,
                candidate_ids,
                target_date,
                &embedding_model,
                Some(200),
            )
            .await
        });
    }

    let mut ranked = 0u64;
    while let Some(outcome) = join_set.join_next().await {
        match outcome {
            Ok(Ok(_)) => ranked += 1,
            Ok(Err(e)) => tracing::warn!(error = %e, "ranking a user failed, continuing"),
            Err(e) => tracing::warn!(error = %e, "ranking task panicked, continuing"),
        }
    }
    Ok(ranked)
}

/// `content-gen`: run translation, interpretation, and TTS over every paper
/// from the day's "all" pool that is missing at least one artifact.
pub async fn gen_content(
    pool: &PgPool,
    providers: &ProviderPool,
    settings: &Settings,
    target_date: NaiveDate,
) -> Result<u64> {
    let paper_ids = candidate_pool::read_pool(pool, target_date, FilterType::All).await?;
    run_enrichment_for_papers(pool, providers, settings, &paper_ids).await
}

/// Shared enrichment runner used by both the arXiv and conference content
/// jobs: translation then interpretation then TTS, each batch-committed
/// independently so partial progress survives a crash.
pub async fn run_enrichment_for_papers(
    pool: &PgPool,
    providers: &ProviderPool,
    settings: &Settings,
    paper_ids: &[Uuid],
) -> Result<u64> {
    if paper_ids.is_empty() {
        return Ok(0);
    }

    let translated = enrichment::run_translation_batch(pool, providers, &settings.embedding_model, paper_ids).await?;
    let interpreted =
        enrichment::run_interpretation_batch(pool, providers, &settings.embedding_model, paper_ids).await?;
    let narrated = enrichment::run_tts_batch(pool, providers, settings, "zh-CN-XiaoxiaoNeural", paper_ids).await?;

    Ok((translated + interpreted + narrated) as u64)
}

async fn active_user_ids(pool: &PgPool) -> Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT user_id FROM user_profile WHERE onboarding_completed = true")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// `conference/{conf_id}/import`: upsert a static source's papers. The
/// original system's conference import reads from an operator-curated
/// static file rather than a live API; this crate reads the same shape
/// from `{settings.static_directory}/conferences/{conf_id}.json`, an array
/// of the same fields arXiv ingestion validates.
pub async fn conference_import(pool: &PgPool, settings: &Settings, conf_id: &str) -> Result<u64> {
    let path = std::path::Path::new(&settings.static_directory)
        .join("conferences")
        .join(format!("{conf_id}.json"));
    let body = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| crate::error::AppError::Validation(format!("no manifest at {}: {e}", path.display())))?;
    let raw: Vec<crate::ingestion::validate::NewPaperManifestEntry> = serde_json::from_str(&body)?;

    let papers: Vec<crate::models::NewPaper> = raw
        .into_iter()
        .map(|entry| entry.into_new_paper(format!("conf/{conf_id}")))
        .collect();

    let report = crate::ingestion::validate::validate_and_filter_static_papers(papers);

    let mut count = 0u64;
    for paper in &report.valid {
        crate::ingestion::upsert_static_paper(pool, paper).await?;
        count += 1;
    }
    Ok(count)
}

/// `conference/{conf_id}/pool`: materialize the conference's candidate pool
/// from whatever has been imported under `source = conf/<id>` (the
/// static counterpart).
pub async fn conference_pool(pool: &PgPool, conf_id: &str) -> Result<u64> {
    let source = format!("conf/{conf_id}");
    let paper_ids: Vec<(Uuid,)> =
        sqlx::query_as("SELECT id FROM paper WHERE source = $1 ORDER BY submitted_at, id")
            .bind(&source)
            .fetch_all(pool)
            .await?;
    let paper_ids: Vec<Uuid> = paper_ids.into_iter().map(|(id,)| id).collect();
    candidate_pool::build_conference_pool(pool, conf_id, &paper_ids).await.map(|n| n as u64)
}

/// `conference/{conf_id}/content`: run the enrichment pipeline over the
/// conference's papers.
pub async fn conference_content(
    pool: &PgPool,
    providers: &ProviderPool,
    settings: &Settings,
    conf_id: &str,
) -> Result<u64> {
    let source = format!("conf/{conf_id}");
    let paper_ids: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM paper WHERE source = $1")
        .bind(&source)
        .fetch_all(pool)
        .await?;
    let paper_ids: Vec<Uuid> = paper_ids.into_iter().map(|(id,)| id).collect();
    run_enrichment_for_papers(pool, providers, settings, &paper_ids).await
}

/// `UpsertRanking` for every onboarded user against a single conference's
/// candidate pool — the static counterpart to `gen_recommendation`,
/// triggered as part of the conference `pool` job finishing.
pub async fn conference_recommendation(pool: &PgPool, settings: &Settings, conf_id: &str) -> Result<u64> {
    let source_key = crate::models::conference_source_key(conf_id);
    let batch_id = crate::models::conference_to_batch_id(conf_id);
    let candidate_ids: Vec<(Uuid,)> =
        sqlx::query_as("SELECT paper_id FROM candidate_pool WHERE batch_id = $1 AND filter_type = 'all' ORDER BY position")
            .bind(batch_id)
            .fetch_all(pool)
            .await?;
    let candidate_ids: Vec<Uuid> = candidate_ids.into_iter().map(|(id,)| id).collect();
    if candidate_ids.is_empty() {
        return Ok(0);
    }

    let users = active_user_ids(pool).await?;
    let pool_date = Utc::now().date_naive();
    let mut ranked = 0u64;
    for user_id in users {
        ranking_store::upsert_ranking(
            pool,
            &user_id,
            &source_key,
            candidate_ids.clone(),
            pool_date,
            &settings.embedding_model,
            Some(200),
        )
        .await?;
        ranked += 1;
    }
    Ok(ranked)
}

/// `CleanupDynamic()` — purge dynamic rankings older than 7 days.
/// Not wired to a dedicated HTTP trigger; currently invoked only via the
/// `CleanupRankings` CLI subcommand, run on an operator-managed schedule
/// (e.g. cron) outside this process.
pub async fn cleanup_dynamic_rankings(pool: &PgPool) -> Result<u64> {
    ranking_store::cleanup_dynamic(pool).await
}
