//! Feedback Handler: the dislike confirmation dance, mutual exclusion
//! between `dislike` and `like`/`bookmark`, and cache invalidation on
//! every mutation.

use sqlx::PgPool;
use uuid::Uuid;

use crate::cache::Cache;
use crate::error::Result;
use crate::models::{FeedbackKind, FeedbackResult};

/// The requested mutation, as decoded at the HTTP boundary. `kind`/`value`
/// mirror the `{action, value}` request body; `confirmed` gates the
/// dislike-on-top-of-like-or-bookmark confirmation dance.
pub struct FeedbackRequest {
    pub user_id: String,
    pub paper_id: Uuid,
    pub kind: FeedbackKind,
    pub value: bool,
    pub confirmed: bool,
}

/// `Feedback(user_id, paper_id, action, value, confirmed) → FeedbackResult`.
pub async fn apply_feedback(pool: &PgPool, cache: &Cache, req: FeedbackRequest) -> Result<FeedbackResult> {
    match (req.kind, req.value) {
        (FeedbackKind::Dislike, true) => {
            if !req.confirmed {
                return Ok(FeedbackResult {
                    paper_id: req.paper_id,
                    liked: false,
                    bookmarked: false,
                    disliked: false,
                    requires_confirmation: true,
                    message: Some("disliking this paper will remove any existing like or bookmark; confirm to proceed".into()),
                });
            }

            let mut tx = pool.begin().await?;
            sqlx::query(
                "DELETE FROM user_feedback WHERE user_id = $1 AND paper_id = $2 AND kind IN ('like', 'bookmark')",
            )
            .bind(&req.user_id)
            .bind(req.paper_id)
            .execute(&mut *tx)
            .await?;
            upsert_kind(&mut tx, &req.user_id, req.paper_id, FeedbackKind::Dislike).await?;
            tx.commit().await?;

            cache.invalidate_user_feed(&req.user_id).await;

            Ok(current_state(pool, &req.user_id, req.paper_id, false, None).await?)
        }

        (FeedbackKind::Dislike, false) => Err(crate::error::AppError::Conflict(
            "dislike cannot be undone".into(),
        )),

        (kind @ (FeedbackKind::Like | FeedbackKind::Bookmark), true) => {
            if has_dislike(pool, &req.user_id, req.paper_id).await? {
                return Err(crate::error::AppError::Conflict(format!(
                    "cannot {} a paper that has been disliked",
                    kind_verb(kind)
                )));
            }

            let mut tx = pool.begin().await?;
            upsert_kind(&mut tx, &req.user_id, req.paper_id, kind).await?;
            tx.commit().await?;

            cache.invalidate_user_feed(&req.user_id).await;
            current_state(pool, &req.user_id, req.paper_id, false, None).await
        }

        (kind @ (FeedbackKind::Like | FeedbackKind::Bookmark), false) => {
            sqlx::query("DELETE FROM user_feedback WHERE user_id = $1 AND paper_id = $2 AND kind = $3")
                .bind(&req.user_id)
                .bind(req.paper_id)
                .bind(kind)
                .execute(pool)
                .await?;

            cache.invalidate_user_feed(&req.user_id).await;
            current_state(pool, &req.user_id, req.paper_id, false, None).await
        }
    }
}

fn kind_verb(kind: FeedbackKind) -> &'static str {
    match kind {
        FeedbackKind::Like => "like",
        FeedbackKind::Bookmark => "bookmark",
        FeedbackKind::Dislike => "dislike",
    }
}

async fn has_dislike(pool: &PgPool, user_id: &str, paper_id: Uuid) -> Result<bool> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        "SELECT paper_id FROM user_feedback WHERE user_id = $1 AND paper_id = $2 AND kind = 'dislike'",
    )
    .bind(user_id)
    .bind(paper_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

async fn upsert_kind(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: &str,
    paper_id: Uuid,
    kind: FeedbackKind,
) -> Result<()> {
    sqlx::query(
        r#"INSERT INTO user_feedback (id, user_id, paper_id, kind, created_at)
           VALUES ($1, $2, $3, $4, now())
           ON CONFLICT (user_id, paper_id, kind) DO UPDATE SET created_at = now()"#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(paper_id)
    .bind(kind)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn current_state(
    pool: &PgPool,
    user_id: &str,
    paper_id: Uuid,
    requires_confirmation: bool,
    message: Option<String>,
) -> Result<FeedbackResult> {
    let kinds: Vec<(FeedbackKind,)> =
        sqlx::query_as("SELECT kind FROM user_feedback WHERE user_id = $1 AND paper_id = $2")
            .bind(user_id)
            .bind(paper_id)
            .fetch_all(pool)
            .await?;
    let kinds: Vec<FeedbackKind> = kinds.into_iter().map(|(k,)| k).collect();

    Ok(FeedbackResult {
        paper_id,
        liked: kinds.contains(&FeedbackKind::Like),
        bookmarked: kinds.contains(&FeedbackKind::Bookmark),
        disliked: kinds.contains(&FeedbackKind::Dislike),
        requires_confirmation,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dislike_verb_is_never_the_rejection_message() {
        // kind_verb is only invoked for like/bookmark rejections; dislike
        // goes through its own branch with a fixed message.
        assert_eq!(kind_verb(FeedbackKind::Like), "like");
        assert_eq!(kind_verb(FeedbackKind::Bookmark), "bookmark");
    }
}
