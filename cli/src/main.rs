//! CLI entrypoint for parley
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use parley_application::{
    NoTranscriptStore, SessionRegistry, StreamOrchestrator, TranscriptStore, TurnAnalyzer,
};
use parley_infrastructure::{ConfigLoader, FileConfig, JsonlTranscriptStore, OpenAiGateway};
use parley_presentation::{AppState, ChatRepl, Cli, Command, ConsoleFormatter, build_router};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow::anyhow!("{}", e))
            .context("Failed to load configuration")?
    };

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_tracing(cli.verbose, config.logging.dir.as_deref());

    check_config(&config)?;

    let command = cli.command.clone().unwrap_or(Command::Chat {
        persona: "partner".to_string(),
        system: "You are a friendly conversation partner. Keep replies short and natural."
            .to_string(),
        quiet: false,
    });

    let transcript = open_transcript(&config);
    let registry = Arc::new(
        SessionRegistry::new(std::time::Duration::from_secs(config.engine.session_ttl_secs))
            .with_transcript_store(transcript.clone()),
    );

    // === Dependency Injection ===
    let gateway = Arc::new(
        OpenAiGateway::new(
            config
                .provider
                .to_gateway_config(config.engine.chunk_timeout_secs),
        )
        .context("Failed to build provider client")?,
    );
    let engine = config
        .engine
        .to_engine_config(config.provider.request_timeout_secs);

    let orchestrator = StreamOrchestrator::new(registry.clone(), gateway.clone())
        .with_config(engine.clone())
        .with_transcript_store(transcript);
    let analyzer =
        TurnAnalyzer::new(registry.clone(), gateway).with_timeout(engine.analysis_timeout);

    match command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("Invalid bind address: {}", bind))?;
            serve(addr, &config, registry, orchestrator, analyzer).await
        }
        Command::Chat {
            persona,
            system,
            quiet,
        } => {
            let repl = ChatRepl::start(orchestrator, analyzer, &persona, &system)
                .await?
                .with_progress(!quiet);
            repl.run().await?;
            Ok(())
        }
    }
}

/// Initialize logging based on verbosity level; `RUST_LOG` wins when set.
fn init_tracing(verbose: u8, log_dir: Option<&str>) -> Option<WorkerGuard> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "parley.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    guard
}

/// Print every config issue; refuse to start on errors.
fn check_config(config: &FileConfig) -> Result<()> {
    let mut issues = config.validate();
    issues.extend(config.provider.check_api_key());

    for issue in &issues {
        eprintln!("{}", ConsoleFormatter::format_issue(issue));
    }

    let errors = issues.iter().filter(|i| i.is_error()).count();
    if errors > 0 {
        bail!("Configuration has {} error(s)", errors);
    }
    Ok(())
}

fn open_transcript(config: &FileConfig) -> Arc<dyn TranscriptStore> {
    let Some(path) = config.transcript.active_path() else {
        return Arc::new(NoTranscriptStore);
    };
    match JsonlTranscriptStore::open(&path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(path = %path.display(), "Transcripts disabled, cannot open file: {}", e);
            Arc::new(NoTranscriptStore)
        }
    }
}

async fn serve(
    addr: SocketAddr,
    config: &FileConfig,
    registry: Arc<SessionRegistry>,
    orchestrator: StreamOrchestrator,
    analyzer: TurnAnalyzer,
) -> Result<()> {
    let sweep_interval = config.engine.sweep_interval();
    let sweeper = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = registry.evict_idle().await;
            if evicted > 0 {
                info!(evicted, "Swept idle sessions");
            }
        }
    });

    let router = build_router(AppState::new(orchestrator, analyzer));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!(%addr, model = %config.provider.model, "parley listening");
    println!("parley listening on http://{}", addr);

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();
    served.context("HTTP server failed")?;
    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
