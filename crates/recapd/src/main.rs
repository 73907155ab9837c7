//! Recap daemon entry point.

mod error;

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use collector::{CollectorConfig, MessageCollector, StoringDmHandler};
use database::{schedule, Database};
use error::AppError;
use retention::{RetentionConfig, RetentionEngine};
use scheduler::{Scheduler, SchedulerConfig};
use signal_daemon::{DaemonConfig, SignalClient};
use summarizer::{OllamaConfig, OllamaSummarizer};
use summary_poster::SummaryPoster;

#[derive(Parser)]
#[command(name = "recapd", version, about = "Privacy-preserving group chat summarizer")]
struct Cli {
    /// SQLite database location.
    #[arg(long, env = "RECAP_DATABASE_URL", default_value = "sqlite://recap.db")]
    database_url: String,

    /// signal-cli daemon base URL.
    #[arg(long, env = "SIGNAL_DAEMON_URL", default_value = "http://localhost:8080")]
    signal_url: String,

    /// Account to act as, for multi-account daemons.
    #[arg(long, env = "SIGNAL_ACCOUNT")]
    account: Option<String>,

    /// Ollama server base URL.
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Ollama model used for summaries.
    #[arg(long, env = "OLLAMA_MODEL", default_value = "llama3.2")]
    ollama_model: String,

    /// Fallback retention for group messages, in hours.
    #[arg(long, env = "RECAP_DEFAULT_RETENTION_HOURS", default_value_t = 48)]
    default_retention_hours: i64,

    /// Fallback retention for DM history, in hours.
    #[arg(long, env = "RECAP_DEFAULT_DM_RETENTION_HOURS", default_value_t = 48)]
    default_dm_retention_hours: i64,

    /// How long finished summary runs are kept, in hours.
    #[arg(long, env = "RECAP_RUN_RETENTION_HOURS", default_value_t = 168)]
    run_retention_hours: i64,

    /// Seconds between retention purge passes.
    #[arg(long, env = "RECAP_PURGE_INTERVAL_SECS", default_value_t = 3600)]
    purge_interval_secs: u64,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daemon: collect, schedule, summarize (the default).
    Serve,

    /// Execute one summary run for a schedule immediately.
    RunNow {
        /// Schedule name.
        schedule: String,

        /// Generate and log the summary without posting or purging.
        #[arg(long)]
        dry_run: bool,
    },

    /// Repost the most recent completed summary for a schedule.
    Resend {
        /// Schedule name.
        schedule: String,
    },

    /// Run one retention purge pass and exit.
    Purge,
}

impl Cli {
    fn retention_config(&self) -> RetentionConfig {
        RetentionConfig {
            default_message_hours: self.default_retention_hours,
            default_dm_hours: self.default_dm_retention_hours,
            run_retention_hours: self.run_retention_hours,
        }
    }

    fn daemon_config(&self) -> DaemonConfig {
        DaemonConfig {
            base_url: self.signal_url.clone(),
            account: self.account.clone(),
        }
    }

    fn ollama_config(&self) -> OllamaConfig {
        OllamaConfig {
            base_url: self.ollama_url.clone(),
            model: self.ollama_model.clone(),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Fatal: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let db = Database::connect(&cli.database_url).await?;

    let result = match cli.command.as_ref().unwrap_or(&Command::Serve) {
        Command::Serve => serve(&cli, db.clone()).await,
        Command::RunNow { schedule, dry_run } => {
            let poster = build_poster(&cli, db.clone()).await?;
            let id = resolve_schedule(&db, schedule).await?;
            let run_id = poster.execute(id, *dry_run).await?;
            info!(run_id, "Run finished");
            Ok(())
        }
        Command::Resend { schedule } => {
            let poster = build_poster(&cli, db.clone()).await?;
            let id = resolve_schedule(&db, schedule).await?;
            let run_id = poster.resend(id, false).await?;
            info!(run_id, "Summary resent");
            Ok(())
        }
        Command::Purge => {
            let engine = RetentionEngine::new(db.clone(), cli.retention_config());
            let report = engine.purge_all().await?;
            info!(
                messages = report.messages_deleted,
                dm_turns = report.dm_turns_deleted,
                runs = report.runs_deleted,
                "Purge finished"
            );
            Ok(())
        }
    };

    db.close().await;
    result
}

async fn build_poster(
    cli: &Cli,
    db: Database,
) -> Result<SummaryPoster<SignalClient, OllamaSummarizer>, AppError> {
    let client = Arc::new(SignalClient::connect(cli.daemon_config()).await?);
    let ollama = Arc::new(OllamaSummarizer::new(cli.ollama_config())?);
    Ok(SummaryPoster::new(client, ollama, db))
}

async fn resolve_schedule(db: &Database, name: &str) -> Result<i64, AppError> {
    schedule::get_by_name(db.pool(), name)
        .await?
        .map(|s| s.id)
        .ok_or_else(|| AppError::UnknownSchedule(name.to_string()))
}

async fn serve(cli: &Cli, db: Database) -> Result<(), AppError> {
    let client = Arc::new(SignalClient::connect(cli.daemon_config()).await?);
    let ollama = Arc::new(OllamaSummarizer::new(cli.ollama_config())?);

    let message_collector = Arc::new(MessageCollector::new(
        Arc::clone(&client),
        db.clone(),
        Arc::new(StoringDmHandler::new(db.clone())),
        CollectorConfig::default(),
    ));
    message_collector.sync_groups().await?;

    let poster = Arc::new(SummaryPoster::new(
        Arc::clone(&client),
        ollama,
        db.clone(),
    ));
    let engine = Arc::new(RetentionEngine::new(db.clone(), cli.retention_config()));
    let summary_scheduler = Scheduler::new(
        db.clone(),
        poster,
        engine,
        SchedulerConfig {
            purge_interval: Duration::from_secs(cli.purge_interval_secs),
        },
    );

    let triggers = summary_scheduler.start().await?;
    info!(triggers, "recapd serving");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let collect_task = {
        let message_collector = Arc::clone(&message_collector);
        tokio::spawn(async move { message_collector.run(shutdown_rx).await })
    };

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| signal_daemon::DaemonError::Connection(e.to_string()))?;
    info!("Shutdown requested");

    let _ = shutdown_tx.send(true);
    summary_scheduler.stop().await;
    if let Ok(Err(e)) = collect_task.await {
        error!("Collector exited with error: {e}");
    }
    Ok(())
}
