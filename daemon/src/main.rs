//! Vigil daemon: runs one proctored exam session for a host page.

mod bridge;
mod protocol;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::BufReader;

use vigil_client::{ExamBackend, HttpExamBackend};
use vigil_session::{init_logging, LogFormat, ProctorSession, SessionConfig, ShutdownController};
use vigil_types::SessionId;

use crate::bridge::{forward_events, pump_input, Output};

const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "vigil", about = "Proctoring session daemon")]
struct Cli {
    /// Base URL of the exam backend.
    #[arg(long, env = "VIGIL_BACKEND_URL")]
    backend_url: Option<String>,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "VIGIL_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: Option<u64>,

    /// Exam duration in seconds.
    #[arg(long, env = "VIGIL_EXAM_DURATION_SECS")]
    exam_duration_secs: Option<u64>,

    /// Delay between entering fullscreen and arming violation monitoring.
    #[arg(long, env = "VIGIL_GRACE_PERIOD_MS")]
    grace_period_ms: Option<u64>,

    /// Status poll cadence in seconds.
    #[arg(long, env = "VIGIL_POLL_INTERVAL_SECS")]
    poll_interval_secs: Option<u64>,

    /// Log format: "human" or "json".
    #[arg(long, env = "VIGIL_LOG_FORMAT")]
    log_format: Option<String>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "VIGIL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "VIGIL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run a session, reading host messages from stdin and writing events
    /// to stdout as NDJSON.
    Run {
        #[arg(long, env = "VIGIL_SESSION_ID")]
        session_id: String,
    },
    /// Print the effective configuration as TOML and exit.
    Config,
}

impl Cli {
    /// File (or defaults) first, then flags and env vars on top.
    fn resolve_config(&self) -> anyhow::Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::from_toml_file(&path.to_string_lossy())?,
            None => SessionConfig::default(),
        };

        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout_secs = secs;
        }
        if let Some(secs) = self.exam_duration_secs {
            config.exam_duration_secs = secs;
        }
        if let Some(ms) = self.grace_period_ms {
            config.grace_period_ms = ms;
        }
        if let Some(secs) = self.poll_interval_secs {
            config.poll_interval_secs = secs;
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string());
            Ok(())
        }
        Command::Run { session_id } => {
            init_logging(config.log_format.parse::<LogFormat>()?, &config.log_level)?;
            if let Some(path) = &cli.config {
                tracing::info!(path = %path.display(), "loaded config file");
            }
            run(SessionId::new(session_id), config).await
        }
    }
}

async fn run(session_id: SessionId, config: SessionConfig) -> anyhow::Result<()> {
    tracing::info!(
        session = %session_id,
        backend = %config.backend_url,
        duration_secs = config.exam_duration_secs,
        "starting vigil"
    );

    let backend: Arc<dyn ExamBackend> = Arc::new(HttpExamBackend::with_timeout(
        &config.backend_url,
        config.request_timeout(),
    ));
    let session = ProctorSession::launch(session_id, config, backend, None).await?;

    let (output, writer) = Output::start(tokio::io::stdout());
    let events = forward_events(session.subscribe(), output.clone());
    for event in session.snapshot() {
        output.send(&event);
    }

    let shutdown = Arc::new(ShutdownController::new());
    let signals = {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { shutdown.wait_for_signal().await })
    };

    pump_input(
        &session,
        BufReader::new(tokio::io::stdin()),
        &output,
        Arc::clone(&shutdown),
    )
    .await;

    if let Some(cause) = shutdown.cause() {
        tracing::info!(cause = cause.as_str(), "leaving session early");
    }
    let outcome = session.outcome();
    session.shutdown().await;
    signals.abort();
    // Dropping the session closed the event stream; let the tail drain.
    let _ = tokio::time::timeout(DRAIN_TIMEOUT, events).await;
    drop(output);
    let _ = writer.await;

    match outcome {
        Some(outcome) => tracing::info!(
            state = outcome.state.as_str(),
            reason = outcome.reason.as_deref().unwrap_or("-"),
            "vigil exited"
        ),
        None => tracing::info!("vigil exited before the session finished"),
    }
    Ok(())
}
