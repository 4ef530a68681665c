//! Interpretation sub-pipeline: a structured prompt generates a plain-language
//! explanation of a paper, accepted only once it clears keyword coverage,
//! minimum length, and truncation checks.

use std::time::Duration;

use sqlx::PgPool;
use uuid::Uuid;

use crate::enrichment::prompts::{build_interpretation_prompt, INTERPRETATION_SYSTEM_PROMPT};
use crate::error::Result;
use crate::provider_pool::ProviderPool;
use crate::retry::with_retry;

const MIN_LENGTH: usize = 200;
const MIN_KEYWORD_HITS: usize = 2;
const SECTION_KEYWORDS: [&str; 6] = ["背景", "方法", "贡献", "background", "method", "result"];

pub struct InterpretationInput {
    pub paper_id: Uuid,
    pub title: String,
    pub summary: String,
}

/// Accept a response only if it has enough section-keyword coverage, is
/// long enough, and doesn't look truncated mid-structure.
fn is_acceptable(text: &str) -> bool {
    if text.chars().count() < MIN_LENGTH {
        return false;
    }
    let hits = SECTION_KEYWORDS.iter().filter(|kw| text.contains(*kw)).count();
    if hits < MIN_KEYWORD_HITS {
        return false;
    }
    if text.trim_end().ends_with("...") || text.trim_end().ends_with('\u{2026}') {
        return false;
    }
    if text.matches('`').count() % 2 != 0 {
        return false;
    }
    if text.matches('{').count() != text.matches('}').count() {
        return false;
    }
    true
}

/// Generate an interpretation for one paper, retrying (up to 3 attempts)
/// when the response fails the acceptance check.
pub async fn interpret_one(providers: &ProviderPool, input: &InterpretationInput) -> Option<String> {
    let client = providers.next_chat_client()?;
    let user_prompt = build_interpretation_prompt(&input.title, &input.summary);

    let result = with_retry(
        "interpretation",
        3,
        Duration::from_secs(1),
        Duration::from_secs(10),
        |_attempt| {
            let client = client.clone();
            let user_prompt = user_prompt.clone();
            async move {
                let text = client.chat(INTERPRETATION_SYSTEM_PROMPT, &user_prompt, 0.7).await?;
                if is_acceptable(&text) {
                    Ok(text)
                } else {
                    Err(crate::error::AppError::Transient(
                        "interpretation response failed acceptance check".into(),
                    ))
                }
            }
        },
    )
    .await;

    result.ok()
}

/// Batch interpretation: split `papers` into one group per configured chat
/// client via `ProviderPool::distribute` and run the groups concurrently,
/// one worker per provider client. Collects `{paper_id: interpretation}`
/// for the papers that produced an acceptable response.
pub async fn generate_interpretations_for_papers(
    providers: &ProviderPool,
    papers: Vec<InterpretationInput>,
) -> std::collections::HashMap<Uuid, String> {
    use futures::future::join_all;

    let workers = providers.chat_clients().len().max(1);
    let groups = ProviderPool::distribute(papers, workers);

    let group_results = join_all(groups.into_iter().map(|group| async move {
        let mut results = Vec::with_capacity(group.len());
        for input in group {
            let paper_id = input.paper_id;
            let result = interpret_one(providers, &input).await;
            results.push((paper_id, result));
        }
        results
    }))
    .await;

    group_results.into_iter().flatten().filter_map(|(id, result)| result.map(|r| (id, r))).collect()
}

pub async fn save_interpretation(
    pool: &PgPool,
    paper_id: Uuid,
    interpretation: &str,
    model_name: &str,
) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO paper_interpretation (paper_id, interpretation, language, model_name, updated_at)
           VALUES ($1, $2, 'zh', $3, now())
           ON CONFLICT (paper_id) DO UPDATE SET
             interpretation = EXCLUDED.interpretation, model_name = EXCLUDED.model_name, updated_at = now()"#,
    )
    .bind(paper_id)
    .bind(interpretation)
    .bind(model_name)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(body: &str) -> String {
        let padding = "的".repeat(MIN_LENGTH);
        format!("{padding}{body}")
    }

    #[test]
    fn accepts_well_formed_interpretation() {
        let text = padded("## 背景\n内容\n## 方法\n内容\n## 贡献\n结论");
        assert!(is_acceptable(&text));
    }

    #[test]
    fn rejects_short_text() {
        assert!(!is_acceptable("## 背景\n太短"));
    }

    #[test]
    fn rejects_truncated_text() {
        let text = padded("## 背景 方法 贡献 结尾...");
        assert!(!is_acceptable(&text));
    }

    #[test]
    fn rejects_insufficient_keyword_coverage() {
        let text = "x".repeat(MIN_LENGTH + 10);
        assert!(!is_acceptable(&text));
    }
}
