//! Per-user, per-source ranking rows.

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

/// A stored, ordered ranking for one user and one source key.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserPaperRanking {
    pub user_id: String,
    pub source_key: String,
    pub pool_date: NaiveDate,
    pub paper_ids: Vec<Uuid>,
    pub scores: Vec<f64>,
}

impl UserPaperRanking {
    /// Paired `(paper_id, score)` view, preserving rank order.
    pub fn scored_pairs(&self) -> impl Iterator<Item = (Uuid, f64)> + '_ {
        self.paper_ids.iter().copied().zip(self.scores.iter().copied())
    }
}

/// Source key classification. Static keys are conference (or other
/// non-streaming) sources whose ranking is built once and excludes all
/// papers the user has any feedback on; dynamic keys are daily arXiv
/// buckets, purgeable after 7 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceClass {
    Static,
    Dynamic,
}

/// Classify a source key. Dynamic sources are exactly the
/// `arxiv_day_YYYYMMDD` buckets produced by ingestion; everything else
/// (conference keys, `conf/<id>`) is static.
pub fn classify_source_key(source_key: &str) -> SourceClass {
    if is_arxiv_day_key(source_key) {
        SourceClass::Dynamic
    } else {
        SourceClass::Static
    }
}

/// Format a dynamic arXiv daily source key. Unified on the dashless
/// `YYYYMMDD` form everywhere; the dashed variant seen in the original
/// implementation is not produced or accepted.
pub fn arxiv_day_key(date: NaiveDate) -> String {
    format!("arxiv_day_{}", date.format("%Y%m%d"))
}

fn is_arxiv_day_key(source_key: &str) -> bool {
    let Some(rest) = source_key.strip_prefix("arxiv_day_") else {
        return false;
    };
    rest.len() == 8 && rest.chars().all(|c| c.is_ascii_digit())
}

/// Normalize a conference identifier to the `conf/<id>` source-key form.
pub fn conference_source_key(conf_id: &str) -> String {
    if conf_id.starts_with("conf/") {
        conf_id.to_string()
    } else {
        format!("conf/{conf_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_arxiv_day_keys_as_dynamic() {
        assert_eq!(classify_source_key("arxiv_day_20251210"), SourceClass::Dynamic);
    }

    #[test]
    fn classifies_dashed_or_conference_keys_as_static() {
        assert_eq!(classify_source_key("arxiv_day_2025-12-10"), SourceClass::Static);
        assert_eq!(classify_source_key("conf/neurips2025"), SourceClass::Static);
        assert_eq!(classify_source_key("neurips2025"), SourceClass::Static);
    }

    #[test]
    fn conference_source_key_adds_prefix_once() {
        assert_eq!(conference_source_key("neurips2025"), "conf/neurips2025");
        assert_eq!(conference_source_key("conf/neurips2025"), "conf/neurips2025");
    }
}
