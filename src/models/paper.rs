//! Paper and its enrichment artifacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

/// A single author name record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
}

/// A paper ingested from arXiv or a static conference source.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Paper {
    pub id: Uuid,
    pub arxiv_id: Option<String>,
    pub title: String,
    pub summary: String,
    /// Stored as JSONB.
    pub authors: Json<Vec<Author>>,
    pub categories: Vec<String>,
    pub primary_category: String,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pdf_url: Option<String>,
    pub html_url: Option<String>,
    pub doi: Option<String>,
    pub comment: Option<String>,
    pub source: String,
    pub ingestion_batch_id: Option<Uuid>,
}

/// A new paper to be upserted by `arxiv_id`.
#[derive(Debug, Clone)]
pub struct NewPaper {
    pub arxiv_id: Option<String>,
    pub title: String,
    pub summary: String,
    pub authors: Vec<Author>,
    pub categories: Vec<String>,
    pub primary_category: String,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pdf_url: Option<String>,
    pub html_url: Option<String>,
    pub doi: Option<String>,
    pub comment: Option<String>,
    pub source: String,
}

/// One ingestion run.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IngestionBatch {
    pub id: Uuid,
    pub source_date: chrono::NaiveDate,
    pub fetched_at: DateTime<Utc>,
    pub effective_query: String,
    pub item_count: i32,
}

/// Dense embedding vector for a paper under a specific model.
#[derive(Debug, Clone)]
pub struct PaperEmbedding {
    pub paper_id: Uuid,
    pub model_name: String,
    pub vector: Vec<f32>,
}

/// Chinese translation of title and summary.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaperTranslation {
    pub paper_id: Uuid,
    pub title_zh: String,
    pub summary_zh: String,
    pub model_name: String,
}

/// Structured Chinese interpretation (background / method / contribution).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaperInterpretation {
    pub paper_id: Uuid,
    pub interpretation: String,
    pub language: String,
    pub model_name: String,
}

/// A generated narration audio file.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaperTts {
    pub id: Uuid,
    pub paper_id: Uuid,
    pub voice_model: String,
    pub content_hash: String,
    pub file_path: String,
    pub file_size: i64,
    pub generated_at: DateTime<Utc>,
}

/// A user-submitted HTML infographic for a paper.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaperInfographic {
    pub paper_id: Uuid,
    pub html_content: String,
    pub checksum: Option<String>,
}

/// A user-submitted image for a paper.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PaperVisual {
    pub paper_id: Uuid,
    pub image_data: String,
    pub checksum: Option<String>,
}
