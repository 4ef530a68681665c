//! arXiv Atom API client.
//!
//! arXiv publishes a typed Atom XML export API, so this client parses that
//! feed directly with `quick-xml` rather than scraping HTML.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::America::New_York;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Author, NewPaper};

const MAX_RESULTS_CAP: u32 = 30_000;

/// Thin wrapper around the arXiv Atom export API.
pub struct ArxivClient {
    http: reqwest::Client,
    api_base: String,
}

impl ArxivClient {
    pub fn new(api_base: String) -> Self {
        Self { http: reqwest::Client::new(), api_base }
    }

    /// Build the `submittedDate` range query for one day, optionally ANDed
    /// with a user-configured term.
    pub fn build_query_for_date(target_date: NaiveDate, extra_query: Option<&str>) -> String {
        let date_str = target_date.format("%Y%m%d");
        let range = format!("submittedDate:[{date_str}000000 TO {date_str}235959]");
        match extra_query {
            Some(q) if !q.is_empty() && !q.eq_ignore_ascii_case("all") => {
                format!("({q}) AND {range}")
            }
            _ => range,
        }
    }

    /// Page through the arXiv API for `query`, sorted by submission date
    /// descending, up to `page_size` per request and `MAX_RESULTS_CAP` total.
    pub async fn search(&self, query: &str, page_size: u32) -> Result<Vec<NewPaper>> {
        let page_size = page_size.min(2000).max(1);
        let mut start = 0u32;
        let mut papers = Vec::new();

        loop {
            let batch = self.fetch_page(query, start, page_size, true).await?;
            if batch.is_empty() {
                break;
            }
            let got = batch.len() as u32;
            papers.extend(batch);
            start += got;
            if start >= MAX_RESULTS_CAP || got < page_size {
                break;
            }
        }

        Ok(papers)
    }

    /// Fallback strategy when a `submittedDate` query returns nothing:
    /// scan the most recent submissions, convert each to `America/New_York`,
    /// and collect those whose NY-local date equals `target_date`. Stops
    /// after `max_empty_batches` consecutive pages with no matches.
    pub async fn search_fallback(
        &self,
        base_query: &str,
        target_date: NaiveDate,
        page_size: u32,
        max_empty_batches: u32,
    ) -> Result<Vec<NewPaper>> {
        let page_size = page_size.min(100).max(1);
        let mut start = 0u32;
        let mut consecutive_empty = 0u32;
        let mut matched = Vec::new();

        loop {
            let batch = self.fetch_page(base_query, start, page_size, false).await?;
            if batch.is_empty() {
                break;
            }

            let mut found_in_batch = false;
            for paper in batch {
                let ny_date = paper.submitted_at.with_timezone(&New_York).date_naive();
                if ny_date == target_date {
                    matched.push(paper);
                    found_in_batch = true;
                } else if ny_date < target_date {
                    // Results are sorted descending by submission date; once
                    // we've passed the target date there is nothing left to find.
                    return Ok(matched);
                }
            }

            consecutive_empty = if found_in_batch { 0 } else { consecutive_empty + 1 };
            if consecutive_empty >= max_empty_batches {
                break;
            }

            start += page_size;
            if start >= MAX_RESULTS_CAP {
                break;
            }
        }

        Ok(matched)
    }

    async fn fetch_page(
        &self,
        query: &str,
        start: u32,
        max_results: u32,
        sort_by_submitted: bool,
    ) -> Result<Vec<NewPaper>> {
        let sort_by = if sort_by_submitted { "submittedDate" } else { "submittedDate" };
        let resp = self
            .http
            .get(&self.api_base)
            .query(&[
                ("search_query", query),
                ("start", &start.to_string()),
                ("max_results", &max_results.to_string()),
                ("sortBy", sort_by),
                ("sortOrder", "descending"),
            ])
            .timeout(std::time::Duration::from_secs(15))
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AppError::Transient("arXiv API rate limited".into()));
        }
        if resp.status().is_server_error() {
            return Err(AppError::Transient(format!("arXiv API returned {}", resp.status())));
        }
        if !resp.status().is_success() {
            return Err(AppError::ProviderRejection(format!(
                "arXiv API returned {}",
                resp.status()
            )));
        }

        let body = resp.text().await?;
        parse_atom_feed(&body)
    }
}

/// Parse an arXiv Atom feed body into `NewPaper` records.
fn parse_atom_feed(xml: &str) -> Result<Vec<NewPaper>> {
    let feed: AtomFeed = quick_xml::de::from_str(xml)
        .map_err(|e| AppError::Parse(format!("malformed arXiv Atom feed: {e}")))?;

    Ok(feed.entry.into_iter().filter_map(entry_to_paper).collect())
}

fn entry_to_paper(entry: AtomEntry) -> Option<NewPaper> {
    let submitted_at = DateTime::parse_from_rfc3339(&entry.published)
        .ok()?
        .with_timezone(&Utc);
    let updated_at = DateTime::parse_from_rfc3339(&entry.updated)
        .ok()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(submitted_at);

    let arxiv_id = entry.id.rsplit('/').next().map(|s| s.to_string());

    let authors = entry
        .author
        .into_iter()
        .map(|a| Author { name: a.name })
        .collect::<Vec<_>>();

    let categories = entry
        .category
        .into_iter()
        .map(|c| c.term)
        .collect::<Vec<_>>();

    let primary_category = entry
        .primary_category
        .map(|c| c.term)
        .or_else(|| categories.first().cloned())
        .unwrap_or_default();

    let pdf_url = entry
        .link
        .iter()
        .find(|l| l.title.as_deref() == Some("pdf"))
        .map(|l| l.href.clone());

    Some(NewPaper {
        arxiv_id,
        title: entry.title.trim().replace('\n', " ").replace("  ", " "),
        summary: entry.summary.trim().to_string(),
        authors,
        categories,
        primary_category,
        submitted_at,
        updated_at,
        pdf_url,
        html_url: Some(entry.id),
        doi: entry.doi,
        comment: entry.comment,
        source: "arxiv".to_string(),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename = "feed")]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: String,
    title: String,
    summary: String,
    published: String,
    updated: String,
    #[serde(rename = "author", default)]
    author: Vec<AtomAuthor>,
    #[serde(rename = "category", default)]
    category: Vec<AtomCategory>,
    #[serde(rename = "primary_category", default)]
    primary_category: Option<AtomCategory>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
    #[serde(rename = "doi", default)]
    doi: Option<String>,
    #[serde(rename = "comment", default)]
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: String,
    #[serde(rename = "@title", default)]
    title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_query_combines_term_and_date_range() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 10).expect("valid date");
        let q = ArxivClient::build_query_for_date(date, Some("cat:cs.AI"));
        assert_eq!(
            q,
            "(cat:cs.AI) AND submittedDate:[20251210000000 TO 20251210235959]"
        );
    }

    #[test]
    fn build_query_skips_term_when_all() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 10).expect("valid date");
        let q = ArxivClient::build_query_for_date(date, Some("all"));
        assert_eq!(q, "submittedDate:[20251210000000 TO 20251210235959]");
    }

    #[test]
    fn parses_minimal_atom_entry() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/2512.00001v1</id>
    <title>A Great Paper</title>
    <summary>An abstract long enough to pass validation checks easily.</summary>
    <published>2025-12-10T12:00:00Z</published>
    <updated>2025-12-10T12:00:00Z</updated>
    <author><name>Jane Doe</name></author>
    <category term="cs.AI"/>
  </entry>
</feed>"#;
        let papers = parse_atom_feed(xml).expect("valid feed");
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].arxiv_id.as_deref(), Some("2512.00001v1"));
        assert_eq!(papers[0].categories, vec!["cs.AI".to_string()]);
    }
}
