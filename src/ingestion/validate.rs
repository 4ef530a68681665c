//! Data quality validation for ingested records.
//!
//! The original implementation's `DataQualityValidator` treats short
//! titles/summaries as warnings and keeps the record; this service's
//! requirements are stricter and treat them as hard validation failures
//! that drop the record, so the arXiv id / length / author / category
//! checks below are all gating.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;

use crate::models::{Author, NewPaper};

const MIN_TITLE_LEN: usize = 10;
const MIN_SUMMARY_LEN: usize = 50;

/// Why a record was rejected, for the validation report.
#[derive(Debug, Clone)]
pub struct RejectionReason {
    pub arxiv_id: Option<String>,
    pub reason: String,
}

/// Outcome of validating a batch: the records kept, plus the reasons for
/// every record dropped.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub valid: Vec<NewPaper>,
    pub rejected: Vec<RejectionReason>,
}

/// `^\d{4}\.\d{4,5}(v\d+)?$`
fn arxiv_id_is_valid(id: &str) -> bool {
    let re = match Regex::new(r"^\d{4}\.\d{4,5}(v\d+)?$") {
        Ok(re) => re,
        Err(_) => return false,
    };
    re.is_match(id)
}

/// Validate one record. Returns the reason for rejection, or `None` if the
/// record passes all checks.
pub fn validate_paper(paper: &NewPaper) -> Option<String> {
    if let Some(id) = &paper.arxiv_id {
        if !arxiv_id_is_valid(id) {
            return Some(format!("arxiv_id '{id}' does not match the expected format"));
        }
    } else {
        return Some("missing arxiv_id".to_string());
    }

    if paper.title.trim().chars().count() < MIN_TITLE_LEN {
        return Some(format!("title shorter than {MIN_TITLE_LEN} characters"));
    }
    if paper.summary.trim().chars().count() < MIN_SUMMARY_LEN {
        return Some(format!("summary shorter than {MIN_SUMMARY_LEN} characters"));
    }
    if paper.authors.is_empty() {
        return Some("no authors".to_string());
    }
    if paper.categories.is_empty() {
        return Some("no categories".to_string());
    }

    None
}

/// Validate one static-source record. Static sources (conference imports)
/// have no arXiv id to check the format of; everything else the same
/// still applies.
pub fn validate_static_paper(paper: &NewPaper) -> Option<String> {
    if paper.title.trim().chars().count() < MIN_TITLE_LEN {
        return Some(format!("title shorter than {MIN_TITLE_LEN} characters"));
    }
    if paper.summary.trim().chars().count() < MIN_SUMMARY_LEN {
        return Some(format!("summary shorter than {MIN_SUMMARY_LEN} characters"));
    }
    if paper.authors.is_empty() {
        return Some("no authors".to_string());
    }
    if paper.categories.is_empty() {
        return Some("no categories".to_string());
    }
    None
}

/// A conference manifest's one paper entry, as read from
/// `{static_directory}/conferences/{conf_id}.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPaperManifestEntry {
    pub external_id: Option<String>,
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    pub submitted_at: DateTime<Utc>,
    pub pdf_url: Option<String>,
    pub html_url: Option<String>,
    pub doi: Option<String>,
}

impl NewPaperManifestEntry {
    pub fn into_new_paper(self, source: String) -> NewPaper {
        let primary_category = self.categories.first().cloned().unwrap_or_default();
        NewPaper {
            arxiv_id: None,
            title: self.title,
            summary: self.summary,
            authors: self.authors.into_iter().map(|name| Author { name }).collect(),
            categories: self.categories,
            primary_category,
            submitted_at: self.submitted_at,
            updated_at: self.submitted_at,
            pdf_url: self.pdf_url,
            html_url: self.html_url,
            doi: self.doi,
            comment: self.external_id,
            source,
        }
    }
}

/// Validate a batch, partitioning into valid records and rejection reasons.
pub fn validate_and_filter_papers(papers: Vec<NewPaper>) -> ValidationReport {
    validate_with(papers, validate_paper)
}

/// The static-source counterpart of [`validate_and_filter_papers`], used by
/// conference import.
pub fn validate_and_filter_static_papers(papers: Vec<NewPaper>) -> ValidationReport {
    validate_with(papers, validate_static_paper)
}

fn validate_with(papers: Vec<NewPaper>, check: impl Fn(&NewPaper) -> Option<String>) -> ValidationReport {
    let mut report = ValidationReport::default();
    for paper in papers {
        match check(&paper) {
            None => report.valid.push(paper),
            Some(reason) => {
                tracing::debug!(arxiv_id = ?paper.arxiv_id, reason, "dropping invalid record");
                report.rejected.push(RejectionReason { arxiv_id: paper.arxiv_id, reason });
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::models::Author;

    fn paper(arxiv_id: &str, title: &str, summary: &str) -> NewPaper {
        NewPaper {
            arxiv_id: Some(arxiv_id.to_string()),
            title: title.to_string(),
            summary: summary.to_string(),
            authors: vec![Author { name: "A. Author".into() }],
            categories: vec!["cs.AI".into()],
            primary_category: "cs.AI".into(),
            submitted_at: Utc::now(),
            updated_at: Utc::now(),
            pdf_url: None,
            html_url: None,
            doi: None,
            comment: None,
            source: "arxiv".into(),
        }
    }

    #[test]
    fn accepts_well_formed_record() {
        let p = paper(
            "2512.00001",
            "A Title Long Enough",
            "A summary that is definitely over fifty characters in length, easily.",
        );
        assert!(validate_paper(&p).is_none());
    }

    #[test]
    fn rejects_malformed_arxiv_id() {
        let p = paper(
            "not-an-id",
            "A Title Long Enough",
            "A summary that is definitely over fifty characters in length, easily.",
        );
        assert!(validate_paper(&p).is_some());
    }

    #[test]
    fn rejects_short_title_and_summary() {
        let mut p = paper("2512.00002", "short", "too short");
        assert!(validate_paper(&p).is_some());
        p.title = "A Title Long Enough".into();
        assert!(validate_paper(&p).is_some());
    }

    #[test]
    fn accepts_versioned_arxiv_id() {
        let p = paper(
            "2512.00001v2",
            "A Title Long Enough",
            "A summary that is definitely over fifty characters in length, easily.",
        );
        assert!(validate_paper(&p).is_none());
    }
}
