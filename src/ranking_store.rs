//! Ranking Store: static sources pre-filter by historical feedback, the
//! row is delete-then-insert inside one transaction so readers never see a
//! torn state, and dynamic rows older than 7 days are purgeable.

use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::candidate_pool;
use crate::error::Result;
use crate::models::{
    arxiv_day_key, classify_source_key, FilterType, SourceClass, UserPaperRanking,
};
use crate::scoring::rank_for_user;

/// `UpsertRanking(user_id, source_key, candidate_ids, force, limit?)`.
pub async fn upsert_ranking(
    pool: &PgPool,
    user_id: &str,
    source_key: &str,
    candidate_ids: Vec<Uuid>,
    pool_date: NaiveDate,
    embedding_model: &str,
    limit: Option<usize>,
) -> Result<UserPaperRanking> {
    let candidate_ids = match classify_source_key(source_key) {
        SourceClass::Static => exclude_papers_with_any_feedback(pool, user_id, candidate_ids).await?,
        SourceClass::Dynamic => candidate_ids,
    };

    let mut scored = rank_for_user(pool, user_id, &candidate_ids, embedding_model).await?;
    if let Some(limit) = limit {
        scored.truncate(limit);
    }

    let paper_ids: Vec<Uuid> = scored.iter().map(|(id, _)| *id).collect();
    let scores: Vec<f64> = scored.iter().map(|(_, s)| *s).collect();

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM user_paper_ranking WHERE user_id = $1 AND source_key = $2")
        .bind(user_id)
        .bind(source_key)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"INSERT INTO user_paper_ranking (user_id, source_key, pool_date, paper_ids, scores, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6)"#,
    )
    .bind(user_id)
    .bind(source_key)
    .bind(pool_date)
    .bind(&paper_ids)
    .bind(&scores)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(UserPaperRanking { user_id: user_id.to_string(), source_key: source_key.to_string(), pool_date, paper_ids, scores })
}

async fn exclude_papers_with_any_feedback(
    pool: &PgPool,
    user_id: &str,
    candidate_ids: Vec<Uuid>,
) -> Result<Vec<Uuid>> {
    if candidate_ids.is_empty() {
        return Ok(candidate_ids);
    }
    let excluded: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT paper_id FROM user_feedback WHERE user_id = $1 AND paper_id = ANY($2)",
    )
    .bind(user_id)
    .bind(&candidate_ids)
    .fetch_all(pool)
    .await?;
    let excluded: std::collections::HashSet<Uuid> = excluded.into_iter().map(|(id,)| id).collect();
    Ok(candidate_ids.into_iter().filter(|id| !excluded.contains(id)).collect())
}

/// `Read(user_id, source_key) → Ranking?`
pub async fn read_ranking(pool: &PgPool, user_id: &str, source_key: &str) -> Result<Option<UserPaperRanking>> {
    let row: Option<UserPaperRanking> = sqlx::query_as(
        "SELECT user_id, source_key, pool_date, paper_ids, scores FROM user_paper_ranking WHERE user_id = $1 AND source_key = $2",
    )
    .bind(user_id)
    .bind(source_key)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// `CleanupDynamic()`: deletes dynamic rows whose `pool_date` is older than 7 days.
pub async fn cleanup_dynamic(pool: &PgPool) -> Result<u64> {
    let cutoff = Utc::now().date_naive() - chrono::Duration::days(7);
    let result = sqlx::query(
        "DELETE FROM user_paper_ranking WHERE source_key LIKE 'arxiv\\_day\\_%' ESCAPE '\\' AND pool_date < $1",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// On-demand generation for a missing `arxiv_day_YYYYMMDD` ranking: use the
/// CS candidate pool for that date as `candidate_ids` (cold path for cloud
/// deployment).
pub async fn generate_ranking_on_demand(
    pool: &PgPool,
    user_id: &str,
    target_date: NaiveDate,
    embedding_model: &str,
) -> Result<UserPaperRanking> {
    let source_key = arxiv_day_key(target_date);
    let candidate_ids = candidate_pool::read_pool(pool, target_date, FilterType::Cs).await?;
    upsert_ranking(pool, user_id, &source_key, candidate_ids, target_date, embedding_model, None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_scores_are_non_increasing_when_sorted() {
        let ranking = UserPaperRanking {
            user_id: "u1".into(),
            source_key: "arxiv_day_20251210".into(),
            pool_date: NaiveDate::from_ymd_opt(2025, 12, 10).expect("valid date"),
            paper_ids: vec![Uuid::new_v4(), Uuid::new_v4()],
            scores: vec![0.9, 0.4],
        };
        let scores: Vec<f64> = ranking.scored_pairs().map(|(_, s)| s).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }
}
