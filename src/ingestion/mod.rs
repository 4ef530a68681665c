//! Ingestion Engine: builds the query for a date, searches (with an
//! America/New_York-timezone fallback scan), validates, persists papers
//! before embeddings, and tolerates embedding failures without voiding the
//! upsert.

pub mod arxiv_client;
pub mod validate;

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::Result;
use crate::models::{IngestionBatch, NewPaper};
use crate::provider_pool::ProviderPool;

pub use arxiv_client::ArxivClient;

const EMBEDDING_MAX_BATCH_SIZE: usize = 50;

/// Result of one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestionOutcome {
    pub batch: IngestionBatch,
    pub rejected_count: usize,
    pub embedded_count: usize,
}

/// `IngestForDate(target_date)`.
pub async fn ingest_for_date(
    pool: &PgPool,
    client: &ArxivClient,
    providers: &ProviderPool,
    settings: &Settings,
    target_date: NaiveDate,
    extra_query: Option<&str>,
) -> Result<IngestionOutcome> {
    let query = ArxivClient::build_query_for_date(target_date, extra_query);

    let mut fetched = client.search(&query, settings.arxiv_page_size).await?;
    if fetched.is_empty() {
        fetched = client
            .search_fallback(
                extra_query.unwrap_or("all"),
                target_date,
                settings.arxiv_page_size,
                settings.arxiv_max_empty_batches,
            )
            .await?;
    }

    let report = validate::validate_and_filter_papers(fetched);
    let rejected_count = report.rejected.len();
    tracing::info!(
        target_date = %target_date,
        fetched = report.valid.len() + rejected_count,
        valid = report.valid.len(),
        rejected = rejected_count,
        "ingestion batch validated"
    );

    let batch_id = Uuid::new_v4();
    let batch: IngestionBatch = sqlx::query_as(
        r#"INSERT INTO ingestion_batch (id, source_date, fetched_at, effective_query, item_count)
           VALUES ($1, $2, $3, $4, $5)
           RETURNING id, source_date, fetched_at, effective_query, item_count"#,
    )
    .bind(batch_id)
    .bind(target_date)
    .bind(Utc::now())
    .bind(&query)
    .bind(report.valid.len() as i32)
    .fetch_one(pool)
    .await?;

    let mut paper_ids = Vec::with_capacity(report.valid.len());
    for paper in &report.valid {
        let id = upsert_paper(pool, paper, batch_id).await?;
        paper_ids.push(id);
    }

    let embedded_count = compute_embeddings(pool, providers, settings, &paper_ids).await;

    Ok(IngestionOutcome { batch, rejected_count, embedded_count })
}

async fn upsert_paper(pool: &PgPool, paper: &NewPaper, batch_id: Uuid) -> Result<Uuid> {
    let authors = sqlx::types::Json(&paper.authors);
    let row: (Uuid,) = sqlx::query_as(
        r#"INSERT INTO paper
             (id, arxiv_id, title, summary, authors, categories, primary_category,
              submitted_at, updated_at, pdf_url, html_url, doi, comment, source, ingestion_batch_id)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
           ON CONFLICT (arxiv_id) DO UPDATE SET
             title = EXCLUDED.title,
             summary = EXCLUDED.summary,
             authors = EXCLUDED.authors,
             categories = EXCLUDED.categories,
             primary_category = EXCLUDED.primary_category,
             updated_at = EXCLUDED.updated_at,
             pdf_url = EXCLUDED.pdf_url,
             html_url = EXCLUDED.html_url,
             doi = EXCLUDED.doi,
             comment = EXCLUDED.comment
           RETURNING id"#,
    )
    .bind(Uuid::new_v4())
    .bind(&paper.arxiv_id)
    .bind(&paper.title)
    .bind(&paper.summary)
    .bind(authors)
    .bind(&paper.categories)
    .bind(&paper.primary_category)
    .bind(paper.submitted_at)
    .bind(paper.updated_at)
    .bind(&paper.pdf_url)
    .bind(&paper.html_url)
    .bind(&paper.doi)
    .bind(&paper.comment)
    .bind(&paper.source)
    .bind(batch_id)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Upsert one static-source (conference) paper. The counterpart to
/// `upsert_paper` for records with no `arxiv_id`: conflicts are detected on
/// `(source, title)` via `idx_paper_static_source_title` rather than on
/// `arxiv_id`, and there is no `ingestion_batch_id` to attach since static
/// imports aren't tied to a daily ingestion run.
pub async fn upsert_static_paper(pool: &PgPool, paper: &NewPaper) -> Result<Uuid> {
    let authors = sqlx::types::Json(&paper.authors);
    let row: (Uuid,) = sqlx::query_as(
        r#"INSERT INTO paper
             (id, arxiv_id, title, summary, authors, categories, primary_category,
              submitted_at, updated_at, pdf_url, html_url, doi, comment, source)
           VALUES ($1, NULL, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
           ON CONFLICT (source, title) WHERE arxiv_id IS NULL DO UPDATE SET
             summary = EXCLUDED.summary,
             authors = EXCLUDED.authors,
             categories = EXCLUDED.categories,
             primary_category = EXCLUDED.primary_category,
             updated_at = EXCLUDED.updated_at,
             pdf_url = EXCLUDED.pdf_url,
             html_url = EXCLUDED.html_url,
             doi = EXCLUDED.doi,
             comment = EXCLUDED.comment
           RETURNING id"#,
    )
    .bind(Uuid::new_v4())
    .bind(&paper.title)
    .bind(&paper.summary)
    .bind(authors)
    .bind(&paper.categories)
    .bind(&paper.primary_category)
    .bind(paper.submitted_at)
    .bind(paper.updated_at)
    .bind(&paper.pdf_url)
    .bind(&paper.html_url)
    .bind(&paper.doi)
    .bind(&paper.comment)
    .bind(&paper.source)
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

/// Embed every newly upserted paper that doesn't already have an embedding
/// for the configured model, in batches. Embedding failures are logged and
/// skipped; they never roll back the paper upsert.
async fn compute_embeddings(
    pool: &PgPool,
    providers: &ProviderPool,
    settings: &Settings,
    paper_ids: &[Uuid],
) -> usize {
    let mut embedded = 0;
    for chunk in paper_ids.chunks(EMBEDDING_MAX_BATCH_SIZE) {
        for &paper_id in chunk {
            match embed_one(pool, providers, settings, paper_id).await {
                Ok(true) => embedded += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(paper_id = %paper_id, error = %e, "embedding failed, continuing");
                }
            }
        }
    }
    embedded
}

async fn embed_one(
    pool: &PgPool,
    providers: &ProviderPool,
    settings: &Settings,
    paper_id: Uuid,
) -> Result<bool> {
    let row: Option<(String, String)> =
        sqlx::query_as("SELECT title, summary FROM paper WHERE id = $1")
            .bind(paper_id)
            .fetch_optional(pool)
            .await?;
    let Some((title, summary)) = row else {
        return Ok(false);
    };

    let client = providers.embedding_client();

    let text = format!("{title}\n\n{summary}");
    let vector = client.embed(&text, settings.embedding_dimension).await?;
    let vector = pgvector::Vector::from(vector);

    sqlx::query(
        r#"INSERT INTO paper_embedding (paper_id, model_name, embedding)
           VALUES ($1, $2, $3)
           ON CONFLICT (paper_id, model_name) DO UPDATE SET embedding = EXCLUDED.embedding"#,
    )
    .bind(paper_id)
    .bind(&settings.embedding_model)
    .bind(vector)
    .execute(pool)
    .await?;

    Ok(true)
}
