//! Enrichment Pipeline: translation, interpretation, and TTS fan-out
//! over the Provider Pool, each structured as select-missing / fan-out /
//! idempotent persist.

pub mod interpretation;
pub mod prompts;
pub mod translation;
pub mod tts;

use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::Result;
use crate::provider_pool::ProviderPool;

/// Run the translation sub-pipeline for a page of papers.
pub async fn run_translation_batch(
    pool: &PgPool,
    providers: &ProviderPool,
    model_name: &str,
    paper_ids: &[Uuid],
) -> Result<usize> {
    let missing = translation::papers_missing_translation(pool, paper_ids).await?;
    if missing.is_empty() {
        return Ok(0);
    }

    let rows: Vec<(Uuid, String, String)> =
        sqlx::query_as("SELECT id, title, summary FROM paper WHERE id = ANY($1)")
            .bind(&missing)
            .fetch_all(pool)
            .await?;

    let inputs = rows
        .into_iter()
        .map(|(paper_id, title, summary)| translation::TranslationInput { paper_id, title, summary })
        .collect();

    let results = translation::generate_translations_for_papers(providers, model_name, inputs).await;
    translation::save_translations(pool, &results, model_name).await
}

/// Run the interpretation sub-pipeline for a page of papers.
pub async fn run_interpretation_batch(
    pool: &PgPool,
    providers: &ProviderPool,
    model_name: &str,
    paper_ids: &[Uuid],
) -> Result<usize> {
    let rows: Vec<(Uuid, String, String)> = sqlx::query_as(
        r#"SELECT p.id, p.title, p.summary FROM paper p
           LEFT JOIN paper_interpretation i ON i.paper_id = p.id
           WHERE p.id = ANY($1) AND i.paper_id IS NULL"#,
    )
    .bind(paper_ids)
    .fetch_all(pool)
    .await?;

    let inputs = rows
        .into_iter()
        .map(|(paper_id, title, summary)| interpretation::InterpretationInput { paper_id, title, summary })
        .collect();

    let results = interpretation::generate_interpretations_for_papers(providers, inputs).await;

    let mut saved = 0;
    for (paper_id, text) in &results {
        interpretation::save_interpretation(pool, *paper_id, text, model_name).await?;
        saved += 1;
    }
    Ok(saved)
}

/// Run the TTS sub-pipeline: for each paper with both a translated title
/// and an interpretation, narrate and persist one artifact per configured
/// voice model.
pub async fn run_tts_batch(
    pool: &PgPool,
    providers: &ProviderPool,
    settings: &Settings,
    voice_model: &str,
    paper_ids: &[Uuid],
) -> Result<usize> {
    let rows: Vec<(Uuid, String, String, String)> = sqlx::query_as(
        r#"SELECT p.id, p.title, t.title_zh, i.interpretation
           FROM paper p
           JOIN paper_translation t ON t.paper_id = p.id
           JOIN paper_interpretation i ON i.paper_id = p.id
           WHERE p.id = ANY($1)"#,
    )
    .bind(paper_ids)
    .fetch_all(pool)
    .await?;

    let mut generated = 0;
    for (paper_id, title_en, title_zh, interpretation_text) in rows {
        let narration = tts::build_narration(&title_en, &title_zh, &interpretation_text);
        tts::generate_or_reuse(pool, providers, settings, paper_id, voice_model, &narration).await?;
        generated += 1;
    }
    Ok(generated)
}
