//! CLI command definitions, routing, and tracing setup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use tramitero_answer::AnswerService;
use tramitero_core::pipeline::{IngestConfig, IngestProgress, IngestResult};
use tramitero_index::{ChromaIndex, EmbeddingClient};
use tramitero_llm::CompletionClient;
use tramitero_shared::{AppConfig, init_config, load_config, validate_groq_key};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Tramitero — trámite ingestion and grounded answering.
#[derive(Parser)]
#[command(
    name = "tramitero",
    version,
    about = "Merge scraped trámite batches, publish them to a vector index, and answer questions.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Merge batch files and rebuild the index from them.
    Ingest {
        /// One or more scraper JSON exports, in priority order
        /// (earlier files win duplicate trámites).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Collection to publish into (defaults to the configured one).
        #[arg(short, long)]
        collection: Option<String>,
    },

    /// Ask a single question against the published index.
    Ask {
        /// The question, in natural language.
        question: String,

        /// Number of documents to retrieve.
        #[arg(short, long)]
        k: Option<usize>,
    },

    /// Serve the chat endpoint over HTTP.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on.
        #[arg(long, default_value = "8000")]
        port: u16,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "tramitero=info",
        1 => "tramitero=debug",
        _ => "tramitero=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ingest { files, collection } => cmd_ingest(files, collection.as_deref()).await,
        Command::Ask { question, k } => cmd_ask(&question, k).await,
        Command::Serve { host, port } => cmd_serve(&host, port).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Client construction
// ---------------------------------------------------------------------------

/// Build the Chroma index client from config (+ optional collection override).
fn build_index(config: &AppConfig, collection: Option<&str>) -> Result<ChromaIndex> {
    let api_key = std::env::var(&config.embeddings.api_key_env)
        .ok()
        .filter(|v| !v.is_empty());

    let embedder = EmbeddingClient::new(
        &config.embeddings.base_url,
        &config.embeddings.model,
        api_key,
    )?;

    let collection = collection.unwrap_or(&config.index.collection);
    Ok(ChromaIndex::new(&config.index.base_url, collection, embedder)?)
}

/// Build the completion client; fails early when the API key is missing.
fn build_llm(config: &AppConfig) -> Result<CompletionClient> {
    validate_groq_key(config)?;
    let api_key = std::env::var(&config.groq.api_key_env).unwrap_or_default();
    Ok(CompletionClient::new(
        &config.groq.base_url,
        &api_key,
        &config.groq.model,
    )?)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_ingest(files: Vec<PathBuf>, collection: Option<&str>) -> Result<()> {
    let config = load_config()?;
    let index = build_index(&config, collection)?;

    info!(batches = files.len(), collection = index.collection(), "starting ingest");

    let ingest_config = IngestConfig { batch_files: files };
    let reporter = CliProgress::new();

    let result = tramitero_core::pipeline::ingest(&ingest_config, &index, &reporter).await?;
    reporter.finish();

    println!();
    println!("  Index rebuilt successfully!");
    println!("  Documents:        {}", result.documents_published);
    println!("  Duplicates:       {}", result.stats.duplicates);
    println!("  Invalid records:  {}", result.stats.invalid_records);
    println!("  Batches skipped:  {}", result.stats.batches_skipped);
    println!("  Time:             {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_ask(question: &str, k: Option<usize>) -> Result<()> {
    let config = load_config()?;
    let index = build_index(&config, None)?;
    let llm = build_llm(&config)?;

    let top_k = k.unwrap_or(config.defaults.top_k);
    let service = AnswerService::new(Arc::new(index), llm, top_k);

    let answer = service.answer(question).await?;

    println!("{}", answer.response);
    if !answer.sources.is_empty() {
        println!();
        println!("Fuentes:");
        for source in &answer.sources {
            println!("  - {source}");
        }
    }

    Ok(())
}

async fn cmd_serve(host: &str, port: u16) -> Result<()> {
    let config = load_config()?;
    let index = build_index(&config, None)?;
    let llm = build_llm(&config)?;

    let service = AnswerService::new(Arc::new(index), llm, config.defaults.top_k);

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| eyre!("invalid listen address '{host}:{port}': {e}"))?;

    info!(%addr, model = %config.groq.model, "starting answer service");

    tramitero_answer::serve(addr, Arc::new(service)).await?;
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config file created at {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let rendered = toml::to_string_pretty(&config)?;
    println!("{rendered}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid progress template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl IngestProgress for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn batch_read(&self, source: &str, records: usize, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {source} ({records} records)"));
    }

    fn done(&self, result: &IngestResult) {
        self.spinner
            .set_message(format!("{} documents published", result.documents_published));
    }
}
