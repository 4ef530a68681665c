//! Translation sub-pipeline: a pure generate step that takes paper objects
//! and returns results with no DB dependency, composed with a separate
//! persist step.

use sqlx::PgPool;
use uuid::Uuid;

use crate::enrichment::prompts::{build_translation_prompt, TRANSLATION_SYSTEM_PROMPT};
use crate::error::Result;
use crate::provider_pool::ProviderPool;

/// A paper with just the fields the translator needs.
pub struct TranslationInput {
    pub paper_id: Uuid,
    pub title: String,
    pub summary: String,
}

/// Translate a single paper's title/summary into Chinese, strictly parsing
/// the two labeled lines. Either field empty counts as a failure.
pub async fn translate_one(
    providers: &ProviderPool,
    model_name: &str,
    input: &TranslationInput,
) -> Option<(String, String)> {
    let client = providers.next_chat_client()?;
    let user_prompt = build_translation_prompt(&input.title, &input.summary);

    let response = providers
        .chat_with_retry(&client, TRANSLATION_SYSTEM_PROMPT, &user_prompt, 0.3)
        .await
        .map_err(|e| tracing::warn!(paper_id = %input.paper_id, error = %e, "translation call failed"))
        .ok()?;

    let _ = model_name;
    parse_translation_response(&response)
}

fn parse_translation_response(response: &str) -> Option<(String, String)> {
    let mut title_zh = String::new();
    let mut summary_zh = String::new();

    for line in response.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("标题：").or_else(|| line.strip_prefix("标题:")) {
            title_zh = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("摘要：").or_else(|| line.strip_prefix("摘要:")) {
            summary_zh = rest.trim().to_string();
        }
    }

    if title_zh.is_empty() || summary_zh.is_empty() {
        return None;
    }
    Some((title_zh, summary_zh))
}

/// Pure, DB-free batch translation: split the inputs into one group per
/// configured chat client via `ProviderPool::distribute` and run the groups
/// concurrently, one worker per provider client as recommended by the
/// enrichment pipeline's concurrency note. Collects
/// `{paper_id: (title_zh, summary_zh)}` for the papers that translated
/// successfully.
pub async fn generate_translations_for_papers(
    providers: &ProviderPool,
    model_name: &str,
    papers: Vec<TranslationInput>,
) -> std::collections::HashMap<Uuid, (String, String)> {
    use futures::future::join_all;

    let workers = providers.chat_clients().len().max(1);
    let groups = ProviderPool::distribute(papers, workers);

    let group_results = join_all(groups.into_iter().map(|group| async move {
        let mut results = Vec::with_capacity(group.len());
        for input in group {
            let paper_id = input.paper_id;
            let result = translate_one(providers, model_name, &input).await;
            results.push((paper_id, result));
        }
        results
    }))
    .await;

    group_results.into_iter().flatten().filter_map(|(id, result)| result.map(|r| (id, r))).collect()
}

/// Persist translation results, upserting one row per paper.
pub async fn save_translations(
    pool: &PgPool,
    results: &std::collections::HashMap<Uuid, (String, String)>,
    model_name: &str,
) -> Result<usize> {
    let mut saved = 0;
    for (paper_id, (title_zh, summary_zh)) in results {
        sqlx::query(
            r#"INSERT INTO paper_translation (paper_id, title_zh, summary_zh, model_name, updated_at)
               VALUES ($1, $2, $3, $4, now())
               ON CONFLICT (paper_id) DO UPDATE SET
                 title_zh = EXCLUDED.title_zh, summary_zh = EXCLUDED.summary_zh,
                 model_name = EXCLUDED.model_name, updated_at = now()"#,
        )
        .bind(paper_id)
        .bind(title_zh)
        .bind(summary_zh)
        .bind(model_name)
        .execute(pool)
        .await?;
        saved += 1;
    }
    Ok(saved)
}

/// Papers that are missing a translation, or have an incomplete one.
pub async fn papers_missing_translation(pool: &PgPool, paper_ids: &[Uuid]) -> Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"SELECT p.id FROM paper p
           LEFT JOIN paper_translation t ON t.paper_id = p.id
           WHERE p.id = ANY($1) AND (t.paper_id IS NULL OR t.title_zh = '' OR t.summary_zh = '')"#,
    )
    .bind(paper_ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_response() {
        let response = "标题：测试标题\n摘要：测试摘要内容";
        let parsed = parse_translation_response(response);
        assert_eq!(parsed, Some(("测试标题".to_string(), "测试摘要内容".to_string())));
    }

    #[test]
    fn rejects_response_missing_a_label() {
        let response = "标题：测试标题\n没有摘要标签";
        assert_eq!(parse_translation_response(response), None);
    }
}
