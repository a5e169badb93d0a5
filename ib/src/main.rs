//! IdeaBot - chat assistant for ideas, roadmaps and task tracking
//!
//! CLI entry point: run the Telegram bot, chat in the terminal, or generate
//! a single roadmap.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use colored::Colorize;
use eyre::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use ideabot::bot;
use ideabot::cli::{Cli, Command, OutputFormat};
use ideabot::config::Config;
use ideabot::roadmap::{PipelineSettings, RoadmapOrigin, RoadmapPipeline, RoadmapResult};
use ideabot::session::{SessionDeps, SessionRegistry};
use ideabot::transport::{ConsoleTransport, TelegramTransport, Transport, UpdateSource};
use ideabot::{ProgressAnimator, create_backend, create_client, create_store};

fn setup_logging(level: Option<&str>) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ideabot")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to the log file only; stdout belongs to the console chat
    let level = level
        .and_then(|l| l.parse::<tracing::Level>().ok())
        .unwrap_or(tracing::Level::INFO);
    let log_file = fs::File::create(log_dir.join("ideabot.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Log level priority: CLI > config file > INFO
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| Config::load_log_level(cli.config.as_ref()));
    setup_logging(log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!(
        "IdeaBot loaded config: backend={:?}, provider={}, model={}",
        config.backend.mode, config.llm.provider, config.llm.model
    );

    match cli.command {
        Some(Command::Run) => cmd_run(&config).await,
        Some(Command::Chat) => cmd_chat(&config).await,
        Some(Command::Generate { idea, format }) => cmd_generate(&config, &idea, format).await,
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Roadmap pipeline from the cache and provider sections
fn build_pipeline(config: &Config) -> Result<RoadmapPipeline> {
    let cache = create_store(&config.cache);
    let provider = create_client(&config.llm).context("Failed to create text-generation client")?;
    if provider.is_none() {
        info!("No text-generation provider configured, every roadmap uses the fallback plan");
    }
    Ok(RoadmapPipeline::new(
        cache,
        provider,
        PipelineSettings::from_config(&config.llm, &config.cache),
    ))
}

fn build_registry(config: &Config, transport: Arc<dyn Transport>) -> Result<Arc<SessionRegistry>> {
    let pipeline = build_pipeline(config)?;
    let backend = create_backend(&config.backend, pipeline).context("Failed to create backend")?;
    let deps = SessionDeps {
        backend,
        transport,
        animator: ProgressAnimator::from_config(&config.progress),
    };
    Ok(Arc::new(SessionRegistry::new(deps, &config.session)))
}

/// Cancel `token` on Ctrl+C or SIGTERM
fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut term) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = term.recv() => {}
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to install SIGTERM handler");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        info!("Shutdown signal received");
        token.cancel();
    });
}

async fn cmd_run(config: &Config) -> Result<()> {
    let token = config.telegram.token()?;
    let telegram = Arc::new(TelegramTransport::new(&config.telegram, &token).context("Failed to create Telegram client")?);

    let registry = build_registry(config, telegram.clone())?;
    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    println!("{} polling Telegram (Ctrl+C to stop)", "IdeaBot".bright_cyan().bold());
    let source: Arc<dyn UpdateSource> = telegram;
    let reason = bot::run(source, registry, shutdown).await;
    info!(?reason, "Bot stopped");
    Ok(())
}

async fn cmd_chat(config: &Config) -> Result<()> {
    let console = Arc::new(ConsoleTransport::new().context("Failed to initialize readline")?);
    console.print_welcome();

    let registry = build_registry(config, console.clone())?;
    let shutdown = CancellationToken::new();
    cancel_on_signal(shutdown.clone());

    let source: Arc<dyn UpdateSource> = console;
    bot::run(source, registry, shutdown).await;
    println!("Goodbye!");
    Ok(())
}

async fn cmd_generate(config: &Config, idea: &str, format: OutputFormat) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let (roadmap, origin) = pipeline.generate_traced(idea.trim()).await;

    match format {
        OutputFormat::Text => print_roadmap(&roadmap, origin),
        OutputFormat::Json => {
            let out = serde_json::json!({
                "description": roadmap.description,
                "tasks": roadmap.tasks,
                "origin": origin.as_str(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn print_roadmap(roadmap: &RoadmapResult, origin: RoadmapOrigin) {
    println!("{}", roadmap.description.bold());
    println!();
    for (i, task) in roadmap.tasks.iter().enumerate() {
        println!("{}. {}", i + 1, task);
    }
    println!();
    println!("{}", format!("(source: {})", origin).dimmed());
}
