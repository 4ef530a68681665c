//! User Scorer: a three-strategy affinity scorer, written as pure functions
//! with the strategy choice made by a single dispatcher rather than a
//! registry of interchangeable algorithm objects.

use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::UserProfile;

/// Inputs needed to score one paper for one user.
pub struct ScoringContext<'a> {
    pub user_id: &'a str,
    pub user_profile_vector: Option<&'a [f32]>,
    pub user_profile: Option<&'a UserProfile>,
    pub paper_embedding: Option<&'a [f32]>,
    pub paper_categories: &'a [String],
    pub paper_text_lower: &'a str,
    pub submitted_at: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

/// `recency_bonus = max(0, 1 − min(days_since_submission / 30, 1))`.
pub fn recency_bonus(submitted_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days_since = (now - submitted_at).num_seconds() as f64 / 86_400.0;
    let days_since = days_since.max(0.0);
    (1.0 - (days_since / 30.0).min(1.0)).max(0.0)
}

fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (*x as f64) * (*y as f64)).sum()
}

/// `category_match = |user ∩ paper| / |paper|`, capped at 1.
fn category_match_score(interested: &[String], paper_categories: &[String]) -> f64 {
    if paper_categories.is_empty() {
        return 0.0;
    }
    let matched = paper_categories
        .iter()
        .filter(|c| interested.iter().any(|i| i == *c))
        .count();
    (matched as f64 / paper_categories.len() as f64).min(1.0)
}

/// Fraction of `keywords` found (case-insensitively) in `text_lower`, capped at 1.
fn keyword_match_score(keywords: &[String], text_lower: &str) -> f64 {
    if keywords.is_empty() {
        return 0.0;
    }
    let matched = keywords
        .iter()
        .filter(|kw| text_lower.contains(&kw.to_lowercase()))
        .count();
    (matched as f64 / keywords.len() as f64).min(1.0)
}

/// `ScorePaper(user, paper, embedding?, profile?) → float`.
///
/// Strategy precedence: embedding path, then profile path, then cold-start,
/// chosen by which signals are actually available.
pub fn score_paper(ctx: &ScoringContext) -> f64 {
    let bonus = recency_bonus(ctx.submitted_at, ctx.now);

    if let (Some(user_vec), Some(paper_vec)) = (ctx.user_profile_vector, ctx.paper_embedding) {
        return 0.5 + dot(user_vec, paper_vec) + bonus;
    }

    if let Some(profile) = ctx.user_profile {
        if !profile.interested_categories.is_empty() || !profile.research_keywords.is_empty() {
            let category_match = category_match_score(&profile.interested_categories, ctx.paper_categories);
            let keyword_match = keyword_match_score(&profile.research_keywords, ctx.paper_text_lower);
            return 0.3 + category_match * 0.5 + keyword_match * 0.3 + 0.5 * bonus;
        }
    }

    let uniform: f64 = rand::thread_rng().gen_range(0.0..1.0);
    uniform + 0.3 * bonus
}

/// L2-normalized mean of the embedding vectors of papers a user has liked
/// or bookmarked. Returns `None` if the user has no such papers with an
/// embedding on file.
pub async fn user_profile_vector(pool: &PgPool, user_id: &str, model_name: &str) -> Result<Option<Vec<f32>>> {
    let rows: Vec<(pgvector::Vector,)> = sqlx::query_as(
        r#"SELECT pe.embedding
           FROM user_feedback uf
           JOIN paper_embedding pe ON pe.paper_id = uf.paper_id AND pe.model_name = $2
           WHERE uf.user_id = $1 AND uf.kind IN ('like', 'bookmark')"#,
    )
    .bind(user_id)
    .bind(model_name)
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(None);
    }

    let dim = rows[0].0.as_slice().len();
    let mut sum = vec![0.0f64; dim];
    for (v,) in &rows {
        for (i, x) in v.as_slice().iter().enumerate() {
            sum[i] += *x as f64;
        }
    }
    let n = rows.len() as f64;
    let mean: Vec<f64> = sum.iter().map(|s| s / n).collect();
    let norm = mean.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm == 0.0 {
        return Ok(Some(mean.iter().map(|x| *x as f32).collect()));
    }
    Ok(Some(mean.iter().map(|x| (x / norm) as f32).collect()))
}

/// `RankForUser(user_id, candidate_ids) → [(paper_id, score)]`.
///
/// Batch-loads candidate papers and embeddings in one query each, scores
/// once per paper, and returns sorted descending by score.
pub async fn rank_for_user(
    pool: &PgPool,
    user_id: &str,
    candidate_ids: &[Uuid],
    embedding_model: &str,
) -> Result<Vec<(Uuid, f64)>> {
    if candidate_ids.is_empty() {
        return Ok(Vec::new());
    }

    let profile: Option<UserProfile> =
        sqlx::query_as("SELECT * FROM user_profile WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    let user_vec = user_profile_vector(pool, user_id, embedding_model).await?;

    #[derive(sqlx::FromRow)]
    struct CandidateRow {
        id: Uuid,
        title: String,
        summary: String,
        categories: Vec<String>,
        submitted_at: DateTime<Utc>,
    }

    let papers: Vec<CandidateRow> = sqlx::query_as(
        "SELECT id, title, summary, categories, submitted_at FROM paper WHERE id = ANY($1)",
    )
    .bind(candidate_ids)
    .fetch_all(pool)
    .await?;

    let embeddings: Vec<(Uuid, pgvector::Vector)> = sqlx::query_as(
        "SELECT paper_id, embedding FROM paper_embedding WHERE paper_id = ANY($1) AND model_name = $2",
    )
    .bind(candidate_ids)
    .bind(embedding_model)
    .fetch_all(pool)
    .await?;
    let embeddings: std::collections::HashMap<Uuid, Vec<f32>> = embeddings
        .into_iter()
        .map(|(id, v)| (id, v.as_slice().to_vec()))
        .collect();

    let now = Utc::now();
    let mut scored: Vec<(Uuid, f64)> = papers
        .iter()
        .map(|p| {
            let text_lower = format!("{} {}", p.title, p.summary).to_lowercase();
            let ctx = ScoringContext {
                user_id,
                user_profile_vector: user_vec.as_deref(),
                user_profile: profile.as_ref(),
                paper_embedding: embeddings.get(&p.id).map(|v| v.as_slice()),
                paper_categories: &p.categories,
                paper_text_lower: &text_lower,
                submitted_at: p.submitted_at,
                now,
            };
            (p.id, score_paper(&ctx))
        })
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    Ok(scored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn cold_start_score_is_bounded() {
        let now = Utc::now();
        let ctx = ScoringContext {
            user_id: "u1",
            user_profile_vector: None,
            user_profile: None,
            paper_embedding: None,
            paper_categories: &[],
            paper_text_lower: "",
            submitted_at: now,
            now,
        };
        let score = score_paper(&ctx);
        assert!((0.0..=1.3).contains(&score), "score {score} out of bounds");
    }

    #[test]
    fn profile_path_matches_worked_example() {
        let now = Utc::now();
        let profile = UserProfile {
            user_id: "u1".into(),
            interested_categories: vec!["cs.AI".into(), "cs.CV".into()],
            research_keywords: vec![],
            preference_description: None,
            onboarding_completed: true,
        };
        let categories = vec!["cs.AI".to_string(), "cs.CL".to_string()];
        let ctx = ScoringContext {
            user_id: "u1",
            user_profile_vector: None,
            user_profile: Some(&profile),
            paper_embedding: None,
            paper_categories: &categories,
            paper_text_lower: "",
            submitted_at: now,
            now,
        };
        let score = score_paper(&ctx);
        assert!((score - 1.05).abs() < 1e-9, "expected 1.05, got {score}");
    }

    #[test]
    fn recency_bonus_decays_to_zero_after_30_days() {
        let now = Utc::now();
        let old = now - Duration::days(45);
        assert_eq!(recency_bonus(old, now), 0.0);
        assert_eq!(recency_bonus(now, now), 1.0);
    }
}
