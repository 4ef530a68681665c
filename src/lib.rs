//! # arxiv-curator
//!
//! Personalized arXiv/conference recommendation and content-enrichment
//! service.
//!
//! ## Modules
//!
//! - [`config`] - environment-driven runtime settings
//! - [`db`] - Postgres pool construction and migrations
//! - [`telemetry`] - tracing subscriber setup
//! - [`error`] - application error taxonomy
//! - [`retry`] - exponential-backoff retry wrapper for upstream calls
//! - [`provider_pool`] - embedding/LLM/TTS client pool with bounded concurrency
//! - [`models`] - row structs and domain enums
//! - [`ingestion`] - arXiv ingestion engine (C2)
//! - [`candidate_pool`] - per-date, per-category candidate pools (C3)
//! - [`scoring`] - user affinity scoring strategies (C4)
//! - [`ranking_store`] - per-user ranking persistence (C5)
//! - [`enrichment`] - translation, interpretation, and TTS pipelines (C6)
//! - [`feed`] - feed assembly read path (C7)
//! - [`feedback`] - like/bookmark/dislike handling (C8)
//! - [`orchestrator`] - job orchestrator / single-flight register (C9)
//! - [`cache`] - TTL cache layer in front of the feed read path (C10)
//! - [`jobs`] - batch job bodies triggered by the orchestrator
//! - [`http`] - the axum HTTP surface

pub mod cache;
pub mod candidate_pool;
pub mod config;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod feed;
pub mod feedback;
pub mod http;
pub mod ingestion;
pub mod jobs;
pub mod models;
pub mod orchestrator;
pub mod provider_pool;
pub mod ranking_store;
pub mod retry;
pub mod scoring;
pub mod telemetry;

pub use error::{AppError, Result};
