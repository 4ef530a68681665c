//! User feedback on papers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three feedback kinds. Exhaustively matched everywhere; unknown
/// values are rejected at the HTTP boundary by serde's derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "feedback_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Like,
    Bookmark,
    Dislike,
}

/// One feedback row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserFeedback {
    pub id: Uuid,
    pub user_id: String,
    pub paper_id: Uuid,
    pub kind: FeedbackKind,
    pub created_at: DateTime<Utc>,
}

/// The result of processing a feedback request.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackResult {
    pub paper_id: Uuid,
    pub liked: bool,
    pub bookmarked: bool,
    pub disliked: bool,
    pub requires_confirmation: bool,
    pub message: Option<String>,
}
