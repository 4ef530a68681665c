//! Logging setup.

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Honors `RUST_LOG` if set; otherwise falls back to `debug`/`info`
/// depending on `verbose`. JSON output is used when `ARXIV_CURATOR_LOG_JSON`
/// is set, so the service can run structured in containers and
/// human-readable locally.
pub fn init(verbose: bool) {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string()));

    let json = std::env::var("ARXIV_CURATOR_LOG_JSON").is_ok();

    let subscriber = fmt().with_env_filter(filter).with_target(true);

    if json {
        subscriber.json().init();
    } else {
        subscriber.with_thread_ids(false).init();
    }
}
