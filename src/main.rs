//! arxiv-curator — personalized arXiv/conference recommendation and
//! content-enrichment service.
//!
//! ## CLI mode
//! ```bash
//! arxiv-curator ingest --date 2026-07-25
//! arxiv-curator candidate-pool --date 2026-07-25
//! arxiv-curator rank --date 2026-07-25
//! arxiv-curator enrich --date 2026-07-25
//! ```
//!
//! ## Server mode
//! ```bash
//! arxiv-curator serve
//! ```

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use arxiv_curator::config::Settings;
use arxiv_curator::ingestion::ArxivClient;
use arxiv_curator::provider_pool::{LlmClient, ProviderPool, TtsClient};
use arxiv_curator::{cache, db, http, jobs, orchestrator, telemetry};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "arxiv-curator")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one day's arXiv submissions (C2)
    Ingest {
        /// Target date, `YYYY-MM-DD`; defaults to today (UTC)
        #[arg(long)]
        date: Option<String>,
    },
    /// Rebuild every filter-type candidate pool for one day (C3)
    CandidatePool {
        #[arg(long)]
        date: Option<String>,
    },
    /// Rank every onboarded user against one day's CS pool (C4/C5)
    Rank {
        #[arg(long)]
        date: Option<String>,
    },
    /// Run translation, interpretation, and TTS over one day's pool (C6)
    Enrich {
        #[arg(long)]
        date: Option<String>,
    },
    /// Import a conference's static paper manifest (C2 static counterpart)
    ConferenceImport {
        conf_id: String,
    },
    /// Rebuild a conference's candidate pool and user rankings
    ConferencePool {
        conf_id: String,
    },
    /// Run enrichment over a conference's papers
    ConferenceContent {
        conf_id: String,
    },
    /// Purge dynamic (arXiv-day) rankings older than 7 days
    CleanupRankings,
    /// Run the HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.debug);

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return ExitCode::from(1);
        }
    };

    rt.block_on(run(cli.command))
}

async fn run(command: Commands) -> ExitCode {
    let settings = match Settings::load() {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!("configuration error: {e}");
            return ExitCode::from(1);
        }
    };

    let pool = match db::connect(&settings).await {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, "failed to connect to the database");
            return ExitCode::from(1);
        }
    };
    if let Err(e) = db::migrate(&pool).await {
        error!(error = %e, "failed to run migrations");
        return ExitCode::from(1);
    }

    let providers = build_provider_pool(&settings);
    let arxiv_client = ArxivClient::new(settings.arxiv_api_base.clone());

    match command {
        Commands::Ingest { date } => {
            let target_date = match parse_date_or_today(date) {
                Ok(d) => d,
                Err(e) => return bad_args(&e),
            };
            run_job("ingest", jobs::fetch_arxiv(&pool, &arxiv_client, &providers, &settings, target_date).await)
        }
        Commands::CandidatePool { date } => {
            let target_date = match parse_date_or_today(date) {
                Ok(d) => d,
                Err(e) => return bad_args(&e),
            };
            run_job("candidate-pool", jobs::gen_candidate_pool(&pool, target_date).await)
        }
        Commands::Rank { date } => {
            let target_date = match parse_date_or_today(date) {
                Ok(d) => d,
                Err(e) => return bad_args(&e),
            };
            run_job("rank", jobs::gen_recommendation(&pool, &settings, target_date).await)
        }
        Commands::Enrich { date } => {
            let target_date = match parse_date_or_today(date) {
                Ok(d) => d,
                Err(e) => return bad_args(&e),
            };
            run_job("enrich", jobs::gen_content(&pool, &providers, &settings, target_date).await)
        }
        Commands::ConferenceImport { conf_id } => {
            run_job("conference-import", jobs::conference_import(&pool, &settings, &conf_id).await)
        }
        Commands::ConferencePool { conf_id } => {
            run_job("conference-pool", jobs::conference_pool(&pool, &conf_id).await)
        }
        Commands::ConferenceContent { conf_id } => {
            run_job("conference-content", jobs::conference_content(&pool, &providers, &settings, &conf_id).await)
        }
        Commands::CleanupRankings => {
            run_job("cleanup-rankings", jobs::cleanup_dynamic_rankings(&pool).await)
        }
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| settings.host.clone());
            let port = port.unwrap_or(settings.port);
            match run_server(pool, providers, arxiv_client, settings, host, port).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    error!(error = %e, "server exited with an error");
                    ExitCode::from(1)
                }
            }
        }
    }
}

fn build_provider_pool(settings: &Settings) -> ProviderPool {
    let chat_clients: Vec<LlmClient> = settings
        .llm_api_keys
        .iter()
        .map(|key| LlmClient::new(settings.llm_api_base.clone(), key.clone(), settings.llm_model.clone()))
        .collect();
    let embedding_client = LlmClient::new(
        settings.embedding_api_base.clone(),
        settings.embedding_api_key.clone(),
        settings.embedding_model.clone(),
    );
    let tts = TtsClient::new(format!("{}/tts", settings.llm_api_base.trim_end_matches('/')));
    ProviderPool::new(chat_clients, embedding_client, tts, settings.max_workers)
}

fn parse_date_or_today(date: Option<String>) -> Result<NaiveDate, String> {
    match date {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map_err(|_| format!("invalid --date '{raw}', expected YYYY-MM-DD")),
        None => Ok(chrono::Utc::now().date_naive()),
    }
}

fn bad_args(message: &str) -> ExitCode {
    eprintln!("{message}");
    ExitCode::from(2)
}

fn run_job(name: &str, outcome: arxiv_curator::Result<u64>) -> ExitCode {
    match outcome {
        Ok(count) => {
            info!(job = name, count, "job finished");
            println!("{name}: processed {count} item(s)");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(job = name, error = %e, "job failed");
            eprintln!("{name} failed: {e}");
            ExitCode::from(1)
        }
    }
}

async fn run_server(
    pool: sqlx::PgPool,
    providers: ProviderPool,
    arxiv_client: ArxivClient,
    settings: Arc<Settings>,
    host: String,
    port: u16,
) -> arxiv_curator::Result<()> {
    let cache = Arc::new(cache::Cache::new());
    cache.spawn_monitor();

    let state = http::AppState {
        pool,
        cache,
        settings,
        providers: Arc::new(providers),
        orchestrator: Arc::new(orchestrator::Orchestrator::new()),
        arxiv_client: Arc::new(arxiv_client),
    };

    let app = http::build_router(state);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| arxiv_curator::AppError::Config(format!("invalid host:port: {e}")))?;

    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
