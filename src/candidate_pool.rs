//! Candidate Pool: deterministic per-date, per-category buckets. Pool ids
//! are derived with a stable UUIDv5 so rebuilding a pool for the same date
//! and filter always lands on the same row, and category membership is
//! decided by a small registry of filter predicates (`cs`, `ai-ml-cv`,
//! `math`, `physics`, `all`).

use chrono::NaiveDate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{conference_to_batch_id, date_to_batch_id, FilterType};

/// Build one candidate pool for `target_date` and `filter_type`.
///
/// Idempotent: deletes any existing rows for `(batch_id, filter_type)`
/// before inserting the current day's matches, so re-running converges to
/// the same final state.
pub async fn build_pool(pool: &PgPool, target_date: NaiveDate, filter_type: FilterType) -> Result<usize> {
    let batch_id = date_to_batch_id(target_date);

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM candidate_pool WHERE batch_id = $1 AND filter_type = $2")
        .bind(batch_id)
        .bind(filter_type.as_str())
        .execute(&mut *tx)
        .await?;

    let day_papers: Vec<(Uuid, Vec<String>)> = sqlx::query_as(
        "SELECT id, categories FROM paper WHERE submitted_at::date = $1 ORDER BY submitted_at, id",
    )
    .bind(target_date)
    .fetch_all(&mut *tx)
    .await?;

    let mut position = 0i32;
    for (paper_id, categories) in &day_papers {
        if filter_type.matches(categories) {
            sqlx::query(
                "INSERT INTO candidate_pool (batch_id, filter_type, paper_id, position)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(batch_id)
            .bind(filter_type.as_str())
            .bind(paper_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
            position += 1;
        }
    }

    tx.commit().await?;
    Ok(position as usize)
}

/// Rebuild a conference's `all`-filter candidate pool from its static
/// source papers. The static counterpart to `build_pool`: idempotent
/// delete-then-insert keyed by a conference-derived batch id rather than a
/// date, since static sources have no `submitted_at` bucket to select by.
pub async fn build_conference_pool(pool: &PgPool, conf_id: &str, paper_ids: &[Uuid]) -> Result<usize> {
    let batch_id = conference_to_batch_id(conf_id);

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM candidate_pool WHERE batch_id = $1 AND filter_type = 'all'")
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;

    for (position, paper_id) in paper_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO candidate_pool (batch_id, filter_type, paper_id, position) VALUES ($1, 'all', $2, $3)",
        )
        .bind(batch_id)
        .bind(paper_id)
        .bind(position as i32)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(paper_ids.len())
}

/// `Read(target_date, filter_type) → [paper_id]`, insertion order.
pub async fn read_pool(pool: &PgPool, target_date: NaiveDate, filter_type: FilterType) -> Result<Vec<Uuid>> {
    let batch_id = date_to_batch_id(target_date);
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        "SELECT paper_id FROM candidate_pool WHERE batch_id = $1 AND filter_type = $2 ORDER BY position",
    )
    .bind(batch_id)
    .bind(filter_type.as_str())
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_id_matches_filter_read_key() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 10).expect("valid date");
        assert_eq!(date_to_batch_id(date), date_to_batch_id(date));
    }
}
