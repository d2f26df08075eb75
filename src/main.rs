use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use futures::future::join_all;
use serde::Serialize;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crpt_client::config::{ClientConfig, LogFormat, LoggingConfig};
use crpt_client::ratelimit::{RateGate, TimeWindow};
use crpt_client::submission::{
    CrptDocument, HttpTransport, Outcome, SubmissionClient, SubmissionRequest,
};

/// Submit signed documents to an HTTP endpoint under a fixed-window rate limit.
#[derive(Parser, Debug)]
#[command(name = "crpt-client", version, about)]
#[command(group(ArgGroup::new("sig").required(true).args(["signature", "signature_file"])))]
struct Cli {
    /// YAML configuration file (CRPT__* environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Target URL; overrides the configured endpoint
    #[arg(short, long)]
    endpoint: Option<String>,

    /// JSON document to submit
    #[arg(short, long)]
    document: PathBuf,

    /// Detached signature, inline
    #[arg(long)]
    signature: Option<String>,

    /// Detached signature, read from a file
    #[arg(long)]
    signature_file: Option<PathBuf>,

    /// Maximum submissions per window; overrides the configuration
    #[arg(long)]
    limit: Option<u32>,

    /// Window length (second, minute, hour, day); overrides the configuration
    #[arg(long)]
    per: Option<TimeWindow>,

    /// Number of concurrent submissions of the document
    #[arg(long, default_value_t = 1)]
    repeat: usize,

    /// Reject documents with fields outside the typed schema; missing fields default to empty
    #[arg(long)]
    strict: bool,

    /// Log output format; overrides the configuration
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    init_tracing(&config.logging);

    info!("Starting crpt-client");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    match &cli.config {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Configuration loaded from defaults and environment"),
    }

    let endpoint = cli
        .endpoint
        .clone()
        .or_else(|| config.endpoint.clone())
        .context("no endpoint given on the command line or in the configuration")?;

    let mut limits = config.rate_limit;
    if let Some(limit) = cli.limit {
        limits.max_requests = limit;
    }
    if let Some(window) = cli.per {
        limits.window_duration_ms = window.duration().as_millis() as u64;
    }
    let gate = RateGate::with_config(limits)?;
    info!(
        max_requests = limits.max_requests,
        window_ms = limits.window_duration_ms,
        "Rate gate initialized"
    );

    let transport = HttpTransport::new(&config.http)?;
    let client = SubmissionClient::new(gate, transport);

    let signature = match (&cli.signature, &cli.signature_file) {
        (Some(signature), _) => signature.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading signature from {}", path.display()))?
            .trim_end()
            .to_string(),
        (None, None) => anyhow::bail!("one of --signature or --signature-file is required"),
    };

    let raw = std::fs::read_to_string(&cli.document)
        .with_context(|| format!("reading document from {}", cli.document.display()))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let outcomes = if cli.strict {
        let document: CrptDocument =
            serde_json::from_str(&raw).context("document does not match the schema")?;
        submit_all(&client, &endpoint, &document, &signature, cli.repeat, &shutdown_rx).await
    } else {
        let document: serde_json::Value =
            serde_json::from_str(&raw).context("document is not valid JSON")?;
        submit_all(&client, &endpoint, &document, &signature, cli.repeat, &shutdown_rx).await
    };

    let sent = outcomes.iter().filter(|o| o.is_sent()).count();
    let limited = outcomes
        .iter()
        .filter(|o| matches!(o, Outcome::RateLimited))
        .count();
    let failed = outcomes.len() - sent - limited;

    info!(sent, limited, failed, "Submissions finished");

    if failed > 0 {
        anyhow::bail!("{} of {} submissions failed", failed, outcomes.len());
    }
    Ok(())
}

/// Run `repeat` submissions of the same document concurrently.
async fn submit_all<D>(
    client: &SubmissionClient<HttpTransport>,
    endpoint: &str,
    document: &D,
    signature: &str,
    repeat: usize,
    shutdown: &watch::Receiver<bool>,
) -> Vec<Outcome>
where
    D: Serialize,
{
    let submissions = (0..repeat).map(|_| {
        let mut shutdown = shutdown.clone();
        let request = SubmissionRequest {
            endpoint,
            document,
            signature,
        };
        async move {
            let interrupted = async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
            };
            let outcome = client.submit_with_shutdown(request, interrupted).await;
            match &outcome {
                Outcome::Sent(status) => info!(status, "Submission sent"),
                Outcome::RateLimited => warn!("Submission rate limited"),
                Outcome::TransportFailure(cause) => error!(cause = %cause, "Submission failed"),
            }
            outcome
        }
    });

    join_all(submissions).await
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true);

    match logging.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, interrupting in-flight submissions");
        }
        _ = terminate => {
            info!("Received SIGTERM, interrupting in-flight submissions");
        }
    }
}
