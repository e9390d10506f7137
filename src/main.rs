//! H.E.A.R.T.H server binary.
//!
//! Run without arguments to start the HTTP server, or use `query` to run a
//! single query from the terminal.

use anyhow::Context;
use clap::{Parser, Subcommand};
use hearth::agents::InMemoryGateway;
use hearth::llm::InferenceClient as _;
use hearth::trace::TracingObserver;
use hearth::{
    build_orchestrator, AppState, HearthConfig, HttpInferenceClient, ListingStore, Orchestrator,
};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// H.E.A.R.T.H - Housing Agent Routing & Tool Hub
#[derive(Parser, Debug)]
#[command(
    name = "hearth-server",
    version,
    about = "H.E.A.R.T.H - Housing Agent Routing & Tool Hub",
    long_about = "A multi-agent housing assistant: listing search, commute-aware \n\
                  ranking, market summaries, and landlord messaging behind one \n\
                  free-text query endpoint.",
    after_help = "EXAMPLES:\n    \
                  hearth-server                                  # Start the server (hearth.toml)\n    \
                  hearth-server --config my.toml                 # Use a custom config file\n    \
                  hearth-server query \"2br under $2000 downtown\"  # One query, no server"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "hearth.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server (the default when no subcommand is given)
    Serve {
        /// Override the configured bind host
        #[arg(long)]
        host: Option<String>,

        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Run a single query and print the result
    Query {
        /// The free-text query
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = HearthConfig::load(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    match cli.command {
        Some(Commands::Query { text }) => {
            let orchestrator = build(&config)?;
            let result = orchestrator.process_query(&text).await;

            let status = if result.success {
                "ok".green().bold().to_string()
            } else {
                "failed".red().bold().to_string()
            };
            println!(
                "{status} {} ({})",
                result.intent.as_str().bright_white().bold(),
                result.reasoning.dimmed()
            );
            if let Some(results) = &result.results {
                println!("{}", serde_json::to_string_pretty(results)?);
            }
            Ok(())
        }
        command => {
            if let Some(Commands::Serve { host, port }) = command {
                if let Some(host) = host {
                    config.server.host = host;
                }
                if let Some(port) = port {
                    config.server.port = port;
                }
            }
            serve(config).await
        }
    }
}

fn build(config: &HearthConfig) -> anyhow::Result<Orchestrator> {
    let api_key = config
        .inference
        .api_key_env
        .as_deref()
        .and_then(|var| std::env::var(var).ok());

    let llm = Arc::new(HttpInferenceClient::new(
        &config.inference.base_url,
        &config.inference.model,
        api_key,
        Duration::from_secs(config.inference.timeout_secs),
    )?);

    let store = Arc::new(
        ListingStore::load(&config.data.listings_path)
            .with_context(|| format!("loading listings from {}", config.data.listings_path))?,
    );
    tracing::info!(
        listings = store.len(),
        model = llm.model_name(),
        "agent stack ready"
    );

    Ok(build_orchestrator(
        config,
        llm,
        store,
        Arc::new(InMemoryGateway::new()),
        Arc::new(TracingObserver),
    ))
}

async fn serve(config: HearthConfig) -> anyhow::Result<()> {
    let orchestrator = build(&config)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState {
        config: Arc::new(config),
        orchestrator: Arc::new(orchestrator),
    };

    let app = hearth::api::create_router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "hearth-server listening");
    println!(
        "{} listening on {}",
        "hearth-server".bright_cyan().bold(),
        addr.bright_white()
    );

    axum::serve(listener, app).await?;
    Ok(())
}
