//! Runtime configuration, loaded from the environment with an optional
//! `.env` file via `dotenvy`.

use std::time::Duration;

use crate::error::{AppError, Result};

/// All tunables for the service. Loaded field-by-field from the environment
/// rather than through a derive macro, since several fields need
/// non-string conversions (durations, ratios) that don't map cleanly onto
/// `serde`'s env deserializer.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Postgres connection string.
    pub database_url: String,

    /// arXiv Atom API base URL.
    pub arxiv_api_base: String,
    /// Categories to ingest by default (e.g. `cs.CV`, `cs.AI`).
    pub arxiv_categories: Vec<String>,
    /// Max results per ingestion request page.
    pub arxiv_page_size: u32,
    /// Max consecutive empty pages before the fallback scan gives up.
    pub arxiv_max_empty_batches: u32,

    /// Embedding provider base URL (DashScope-compatible).
    pub embedding_api_base: String,
    /// Embedding provider API key.
    pub embedding_api_key: String,
    /// Embedding model name.
    pub embedding_model: String,
    /// Dimensionality of stored embedding vectors.
    pub embedding_dimension: u32,

    /// Chat-completion provider base URL (OpenAI-compatible), used for
    /// translation and interpretation. Distinct from the embedding
    /// endpoint: the two contracts are versioned and rate-limited
    /// separately upstream.
    pub llm_api_base: String,
    /// One credential per pool entry. The Provider Pool constructs one
    /// `LlmClient` per key and rotates outbound calls across them
    /// round-robin so a single exhausted quota doesn't stall the batch.
    pub llm_api_keys: Vec<String>,
    /// Chat-completion model name.
    pub llm_model: String,

    /// Ratio of today-pool entries drawn from the embedding-ranked pool
    /// versus the cold-start pool, in `[0.0, 1.0]`.
    pub batch_ratio: f64,
    /// Minimum feed size returned to a caller.
    pub batch_min_size: u32,
    /// Maximum feed size returned to a caller.
    pub batch_max_size: u32,

    /// Directory TTS `.opus` artifacts are written to.
    pub tts_directory: String,
    /// Directory static enrichment artifacts (visuals, infographics) are served from.
    pub static_directory: String,

    /// Max concurrent outbound provider requests (LLM, TTS, embeddings).
    pub max_workers: usize,

    /// Cache entry time-to-live, in seconds.
    pub cache_ttl_secs: u64,

    /// HTTP bind host.
    pub host: String,
    /// HTTP bind port.
    pub port: u16,

    /// Whether the Cold-Start fallback runs when on-demand ranking
    /// generation yields no candidates for a missing arXiv ranking, as
    /// opposed to a deployment that only serves orchestrator-precomputed
    /// rankings. On-demand generation itself always runs regardless of
    /// this flag.
    pub cloud_mode: bool,
}

impl Settings {
    /// Load configuration from the environment, loading `.env` first if
    /// present. Missing required variables produce a `Config` error rather
    /// than panicking.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env_required("DATABASE_URL")?;
        let arxiv_api_base =
            env_or("ARXIV_API_BASE", "http://export.arxiv.org/api/query");
        let arxiv_categories = env_or("ARXIV_CATEGORIES", "cs.AI,cs.CV,cs.LG")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let arxiv_page_size = env_parse_or("ARXIV_PAGE_SIZE", 100)?;
        let arxiv_max_empty_batches = env_parse_or("ARXIV_MAX_EMPTY_BATCHES", 3)?;

        let embedding_api_base = env_or(
            "EMBEDDING_API_BASE",
            "https://dashscope.aliyuncs.com/compatible-mode/v1",
        );
        let embedding_api_key = env_or("EMBEDDING_API_KEY", "");
        let embedding_model = env_or("EMBEDDING_MODEL", "text-embedding-v3");
        let embedding_dimension = env_parse_or("EMBEDDING_DIMENSION", 1024)?;

        let llm_api_base = env_or("LLM_API_BASE", "https://dashscope.aliyuncs.com/compatible-mode/v1");
        let llm_api_keys: Vec<String> = env_or("LLM_API_KEYS", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let llm_model = env_or("LLM_MODEL", "qwen-plus");

        let batch_ratio = env_parse_or("BATCH_RATIO", 0.7)?;
        let batch_min_size = env_parse_or("BATCH_MIN_SIZE", 10)?;
        let batch_max_size = env_parse_or("BATCH_MAX_SIZE", 50)?;

        let tts_directory = env_or("TTS_DIRECTORY", "./data/tts");
        let static_directory = env_or("STATIC_DIRECTORY", "./data/static");

        let max_workers = env_parse_or("MAX_WORKERS", 10usize)?;
        let cache_ttl_secs = env_parse_or("CACHE_TTL_SECS", 3600u64)?;

        let host = env_or("HOST", "0.0.0.0");
        let port = env_parse_or("PORT", 8080u16)?;
        let cloud_mode = env_parse_or("CLOUD_MODE", true)?;

        Ok(Self {
            database_url,
            arxiv_api_base,
            arxiv_categories,
            arxiv_page_size,
            arxiv_max_empty_batches,
            embedding_api_base,
            embedding_api_key,
            embedding_model,
            embedding_dimension,
            llm_api_base,
            llm_api_keys,
            llm_model,
            batch_ratio,
            batch_min_size,
            batch_max_size,
            tts_directory,
            static_directory,
            max_workers,
            cache_ttl_secs,
            host,
            port,
            cloud_mode,
        })
    }

    /// Cache TTL as a `Duration`, for use with `retainer`.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_required(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| AppError::Config(format!("missing required env var {key}")))
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::Config(format!("invalid value for {key}: {raw}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_or_falls_back_to_default() {
        std::env::remove_var("ARXIV_CURATOR_TEST_MISSING");
        let v: u32 = env_parse_or("ARXIV_CURATOR_TEST_MISSING", 42).expect("default");
        assert_eq!(v, 42);
    }

    #[test]
    fn env_parse_or_rejects_unparseable_value() {
        std::env::set_var("ARXIV_CURATOR_TEST_BAD", "not-a-number");
        let err = env_parse_or::<u32>("ARXIV_CURATOR_TEST_BAD", 1).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        std::env::remove_var("ARXIV_CURATOR_TEST_BAD");
    }
}
