//! Feed Assembler: cache-then-ranking-then-cold-start read path, T-3 day
//! windowing in `America/New_York`, and first-occurrence dedup for the
//! week pool.

use chrono::{NaiveDate, Utc};
use chrono_tz::America::New_York;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::cache::Cache;
use crate::config::Settings;
use crate::error::Result;
use crate::models::{
    arxiv_day_key, classify_source_key, conference_source_key, FeedbackKind, Paper,
    PaperInterpretation, PaperTranslation, SourceClass,
};
use crate::ranking_store;

/// One hydrated feed row.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub position: usize,
    pub score: f64,
    pub paper: Paper,
    pub translation: Option<PaperTranslation>,
    pub interpretation: Option<PaperInterpretation>,
    pub liked: bool,
    pub bookmarked: bool,
    pub disliked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub items: Vec<FeedItem>,
    pub next_cursor: usize,
    pub total: usize,
}

/// Which arXiv window is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArxivSub {
    Today,
    Week,
}

/// The resolved data source for a feed request.
pub enum FeedSource {
    Arxiv(ArxivSub),
    Conference(String),
}

/// Resolve the `(source, sub)` query parameters of `GET /v1/feed` into a
/// `FeedSource`.
pub fn resolve_source(source: Option<&str>, sub: Option<&str>) -> Result<FeedSource> {
    match source {
        None | Some("arxiv") | Some("") => {
            let sub = match sub {
                None | Some("today") => ArxivSub::Today,
                Some("week") => ArxivSub::Week,
                Some(other) => {
                    return Err(crate::error::AppError::Validation(format!(
                        "unknown arxiv sub '{other}', expected 'today' or 'week'"
                    )))
                }
            };
            Ok(FeedSource::Arxiv(sub))
        }
        Some(conf) => Ok(FeedSource::Conference(conference_source_key(conf))),
    }
}

/// `today_in("America/New_York") − 3 days`, the T-3 rule from the glossary.
pub fn t3_target_date(now: chrono::DateTime<Utc>) -> NaiveDate {
    let ny_today = now.with_timezone(&New_York).date_naive();
    ny_today - chrono::Duration::days(3)
}

/// `GetFeed(user_id, source?, sub?, cursor, limit) → FeedPage`.
pub async fn get_feed(
    pool: &PgPool,
    cache: &Cache,
    settings: &Settings,
    user_id: &str,
    source: FeedSource,
    cursor: usize,
    limit: usize,
) -> Result<FeedPage> {
    let source_keys = source_keys_for(&source);
    let ordered_ids = match &source {
        FeedSource::Arxiv(sub) => load_arxiv_ranking(pool, cache, settings, user_id, *sub).await?,
        FeedSource::Conference(conf_id) => {
            let source_key = conference_source_key(conf_id);
            ranking_store::read_ranking(pool, user_id, &source_key)
                .await?
                .map(|r| r.paper_ids)
                .unwrap_or_default()
        }
    };

    let is_static = matches!(&source, FeedSource::Conference(_));
    let filter_no_content = is_static && pool_filter_no_content(pool, user_id, &source).await?;

    let filtered = apply_realtime_filters(pool, user_id, ordered_ids, is_static, filter_no_content).await?;

    let total = filtered.len();
    let page_ids: Vec<Uuid> = filtered.iter().skip(cursor).take(limit).copied().collect();
    let returned = page_ids.len();
    let next_cursor = if cursor + returned < total { cursor + returned } else { 0 };

    let scores = load_scores(pool, user_id, &source_keys).await?;
    let items = hydrate(pool, user_id, &page_ids, cursor, &scores).await?;

    touch_user_activity(pool, user_id).await?;

    Ok(FeedPage { items, next_cursor, total })
}

/// Every `source_key` contributing to this request's ranking rows, used to
/// recover per-paper scores at hydration time.
fn source_keys_for(source: &FeedSource) -> Vec<String> {
    let target = t3_target_date(Utc::now());
    match source {
        FeedSource::Arxiv(ArxivSub::Today) => vec![arxiv_day_key(target)],
        FeedSource::Arxiv(ArxivSub::Week) => (1..=6)
            .map(|days_back| arxiv_day_key(target - chrono::Duration::days(days_back)))
            .collect(),
        FeedSource::Conference(conf_id) => vec![conference_source_key(conf_id)],
    }
}

/// Look up each paper's stored score across the given source keys,
/// preferring the first ranking a paper appears in (matching the week
/// pool's first-occurrence dedup). Papers with no stored score (e.g. a
/// Cold-Start fallback's synthetic entries) default to 0.0.
async fn load_scores(
    pool: &PgPool,
    user_id: &str,
    source_keys: &[String],
) -> Result<std::collections::HashMap<Uuid, f64>> {
    let mut scores = std::collections::HashMap::new();
    for source_key in source_keys {
        if let Some(ranking) = ranking_store::read_ranking(pool, user_id, source_key).await? {
            for (id, score) in ranking.scored_pairs() {
                scores.entry(id).or_insert(score);
            }
        }
    }
    Ok(scores)
}

async fn load_arxiv_ranking(
    pool: &PgPool,
    cache: &Cache,
    settings: &Settings,
    user_id: &str,
    sub: ArxivSub,
) -> Result<Vec<Uuid>> {
    let target = t3_target_date(Utc::now());

    match sub {
        ArxivSub::Today => {
            let cache_key = format!("today_pool:{user_id}");
            if let Some(cached) = cache.get(&cache_key).await {
                return Ok(cached);
            }

            let source_key = arxiv_day_key(target);
            let ranking = ranking_store::read_ranking(pool, user_id, &source_key).await?;
            let ids = match ranking {
                Some(r) => r.paper_ids,
                None => {
                    let generated =
                        ranking_store::generate_ranking_on_demand(pool, user_id, target, &settings.embedding_model)
                            .await?;
                    if generated.paper_ids.is_empty() && settings.cloud_mode {
                        cold_start_feed(pool, settings.batch_max_size as i64).await?
                    } else {
                        generated.paper_ids
                    }
                }
            };

            cache.set(&cache_key, ids.clone(), settings.cache_ttl()).await;
            Ok(ids)
        }
        ArxivSub::Week => {
            let cache_key = format!("week_pool:{user_id}");
            if let Some(cached) = cache.get(&cache_key).await {
                return Ok(cached);
            }

            let mut seen = std::collections::HashSet::new();
            let mut combined = Vec::new();
            for days_back in 1..=6 {
                let day = target - chrono::Duration::days(days_back);
                let source_key = arxiv_day_key(day);
                if let Some(ranking) = ranking_store::read_ranking(pool, user_id, &source_key).await? {
                    for id in ranking.paper_ids {
                        if seen.insert(id) {
                            combined.push(id);
                        }
                    }
                }
            }

            cache.set(&cache_key, combined.clone(), settings.cache_ttl()).await;
            Ok(combined)
        }
    }
}

/// Last-resort feed when no ranking exists: top papers in the last 7 days
/// weighted by `like × 1 + bookmark × 2`, filled with most-recent
/// submissions excluding overlaps, to `limit`.
async fn cold_start_feed(pool: &PgPool, limit: i64) -> Result<Vec<Uuid>> {
    let weighted: Vec<(Uuid,)> = sqlx::query_as(
        r#"SELECT p.id
           FROM paper p
           LEFT JOIN user_feedback f ON f.paper_id = p.id AND f.kind IN ('like', 'bookmark')
           WHERE p.submitted_at > now() - interval '7 days'
           GROUP BY p.id
           ORDER BY COALESCE(SUM(CASE f.kind WHEN 'like' THEN 1 WHEN 'bookmark' THEN 2 ELSE 0 END), 0) DESC,
                    p.submitted_at DESC
           LIMIT $1"#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut ids: Vec<Uuid> = weighted.into_iter().map(|(id,)| id).collect();

    if (ids.len() as i64) < limit {
        let remaining = limit - ids.len() as i64;
        let seen = ids.clone();
        let fill: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM paper WHERE NOT (id = ANY($1)) ORDER BY submitted_at DESC LIMIT $2",
        )
        .bind(&seen)
        .bind(remaining)
        .fetch_all(pool)
        .await?;
        ids.extend(fill.into_iter().map(|(id,)| id));
    }

    Ok(ids)
}

/// Ambient bookkeeping: record that this user opened a feed today. No
/// endpoint exposes this directly; the
/// admin analytics surface that reads it is an external collaborator.
async fn touch_user_activity(pool: &PgPool, user_id: &str) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO user_activity (user_id, last_open_time, last_feed_date)
           VALUES ($1, now(), now()::date)
           ON CONFLICT (user_id) DO UPDATE SET
             last_open_time = now(), last_feed_date = now()::date"#,
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

async fn pool_filter_no_content(pool: &PgPool, user_id: &str, source: &FeedSource) -> Result<bool> {
    let FeedSource::Conference(conf_id) = source else { return Ok(false) };
    let source_key = conference_source_key(conf_id);
    let row: Option<(bool,)> = sqlx::query_as(
        "SELECT filter_no_content FROM data_source_pool_settings WHERE user_id = $1 AND source_key = $2",
    )
    .bind(user_id)
    .bind(&source_key)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(v,)| v).unwrap_or(false))
}

/// Drop disliked papers (current-day only for dynamic sources, all-time for
/// static — though static-source rankings already exclude any-feedback
/// papers at construction time) and, optionally, papers lacking both
/// translation and interpretation.
async fn apply_realtime_filters(
    pool: &PgPool,
    user_id: &str,
    ordered_ids: Vec<Uuid>,
    is_static: bool,
    filter_no_content: bool,
) -> Result<Vec<Uuid>> {
    if ordered_ids.is_empty() {
        return Ok(ordered_ids);
    }

    let disliked: Vec<(Uuid,)> = if is_static {
        sqlx::query_as(
            "SELECT paper_id FROM user_feedback WHERE user_id = $1 AND paper_id = ANY($2) AND kind = 'dislike'",
        )
        .bind(user_id)
        .bind(&ordered_ids)
        .fetch_all(pool)
        .await?
    } else {
        sqlx::query_as(
            r#"SELECT paper_id FROM user_feedback
               WHERE user_id = $1 AND paper_id = ANY($2) AND kind = 'dislike'
               AND created_at::date = now()::date"#,
        )
        .bind(user_id)
        .bind(&ordered_ids)
        .fetch_all(pool)
        .await?
    };
    let disliked: std::collections::HashSet<Uuid> = disliked.into_iter().map(|(id,)| id).collect();

    let mut filtered: Vec<Uuid> = ordered_ids.into_iter().filter(|id| !disliked.contains(id)).collect();

    if filter_no_content && !filtered.is_empty() {
        let with_content: Vec<(Uuid,)> = sqlx::query_as(
            r#"SELECT p.id FROM paper p
               WHERE p.id = ANY($1)
               AND (EXISTS (SELECT 1 FROM paper_translation t WHERE t.paper_id = p.id)
                    OR EXISTS (SELECT 1 FROM paper_interpretation i WHERE i.paper_id = p.id))"#,
        )
        .bind(&filtered)
        .fetch_all(pool)
        .await?;
        let with_content: std::collections::HashSet<Uuid> = with_content.into_iter().map(|(id,)| id).collect();
        filtered.retain(|id| with_content.contains(id));
    }

    Ok(filtered)
}

async fn hydrate(
    pool: &PgPool,
    user_id: &str,
    page_ids: &[Uuid],
    cursor: usize,
    scores: &std::collections::HashMap<Uuid, f64>,
) -> Result<Vec<FeedItem>> {
    if page_ids.is_empty() {
        return Ok(Vec::new());
    }

    let papers: Vec<Paper> = sqlx::query_as("SELECT * FROM paper WHERE id = ANY($1)")
        .bind(page_ids)
        .fetch_all(pool)
        .await?;
    let mut by_id: std::collections::HashMap<Uuid, Paper> = papers.into_iter().map(|p| (p.id, p)).collect();

    let translations: Vec<PaperTranslation> =
        sqlx::query_as("SELECT * FROM paper_translation WHERE paper_id = ANY($1)")
            .bind(page_ids)
            .fetch_all(pool)
            .await?;
    let mut translations_by_id: std::collections::HashMap<Uuid, PaperTranslation> =
        translations.into_iter().map(|t| (t.paper_id, t)).collect();

    let interpretations: Vec<PaperInterpretation> =
        sqlx::query_as("SELECT * FROM paper_interpretation WHERE paper_id = ANY($1)")
            .bind(page_ids)
            .fetch_all(pool)
            .await?;
    let mut interpretations_by_id: std::collections::HashMap<Uuid, PaperInterpretation> =
        interpretations.into_iter().map(|i| (i.paper_id, i)).collect();

    let feedback: Vec<(Uuid, FeedbackKind)> =
        sqlx::query_as("SELECT paper_id, kind FROM user_feedback WHERE user_id = $1 AND paper_id = ANY($2)")
            .bind(user_id)
            .bind(page_ids)
            .fetch_all(pool)
            .await?;
    let mut feedback_by_id: std::collections::HashMap<Uuid, Vec<FeedbackKind>> = std::collections::HashMap::new();
    for (id, kind) in feedback {
        feedback_by_id.entry(id).or_default().push(kind);
    }

    let mut items = Vec::with_capacity(page_ids.len());
    for (i, id) in page_ids.iter().enumerate() {
        let Some(paper) = by_id.remove(id) else { continue };
        let kinds = feedback_by_id.get(id).cloned().unwrap_or_default();
        items.push(FeedItem {
            position: cursor + i,
            score: scores.get(id).copied().unwrap_or(0.0),
            paper,
            translation: translations_by_id.remove(id),
            interpretation: interpretations_by_id.remove(id),
            liked: kinds.contains(&FeedbackKind::Like),
            bookmarked: kinds.contains(&FeedbackKind::Bookmark),
            disliked: kinds.contains(&FeedbackKind::Dislike),
        });
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn t3_rule_subtracts_three_ny_days() {
        let now = Utc.with_ymd_and_hms(2025, 12, 13, 2, 0, 0).single().expect("valid datetime");
        let target = t3_target_date(now);
        assert_eq!(target, NaiveDate::from_ymd_opt(2025, 12, 9).expect("valid date"));
    }
}
