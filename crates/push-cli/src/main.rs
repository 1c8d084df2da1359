//! VoIP push harness
//!
//! Runs push payloads through the same pipeline the app uses:
//! 1. `classify` prints the normalized event for a payload file
//! 2. `dispatch` replays payload files through the push handler
//!    against a presenter that logs what the call UI would do
//! 3. `token` forwards a credential (or an invalidation) to the token store

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn, Level};

use rvoip_push_core::logging::{log_welcome, setup_logging, LoggingConfig};
use rvoip_push_core::{
    classify_report, CallEvent, CallPresenter, Completion, PushConfig, PushRuntime,
    RawPushPayload, TransportEvent,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Classify and replay VoIP push payloads", long_about = None)]
struct Args {
    /// TOML configuration file (VOIP_PUSH_* environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the normalized event for a payload file
    Classify {
        /// JSON payload file
        file: PathBuf,
    },
    /// Replay payload files through the dispatch pipeline
    Dispatch {
        /// JSON payload files, handled in order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Forward a VoIP credential to the presenter and token store
    Token {
        /// Credential bytes as hex
        #[arg(required_unless_present = "invalidate")]
        credentials: Option<String>,

        /// Invalidate the current token instead
        #[arg(long, conflicts_with = "credentials")]
        invalidate: bool,
    },
}

/// Presenter standing in for the native call UI
struct LoggingPresenter;

#[async_trait]
impl CallPresenter for LoggingPresenter {
    async fn show_incoming_call(&self, call: CallEvent, triggered_by_push: bool) -> rvoip_push_core::Result<()> {
        info!(
            call_id = %call.id(),
            caller = %call.name_caller(),
            handle = %call.handle(),
            video = call.is_video(),
            triggered_by_push,
            "📞 Showing incoming call"
        );
        Ok(())
    }

    async fn end_all_calls(&self) -> rvoip_push_core::Result<()> {
        info!("📴 Ending all calls");
        Ok(())
    }

    async fn set_voip_token(&self, token: &str) -> rvoip_push_core::Result<()> {
        info!(len = token.len(), "🔑 Registered VoIP token");
        Ok(())
    }
}

#[derive(Serialize)]
struct ClassifyOutput<'a> {
    event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    call: Option<&'a CallEvent>,
    defaulted: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = PushConfig::load(args.config.as_deref()).context("loading configuration")?;

    let mut logging = LoggingConfig::from_settings(&config.logging, "voip-push")?;
    if args.verbose {
        logging.level = Level::DEBUG;
    }
    if args.json_logs {
        logging = logging.with_json();
    }
    setup_logging(&logging)?;
    log_welcome(&logging, rvoip_push_core::VERSION);

    match args.command {
        Command::Classify { file } => classify_file(&file),
        Command::Dispatch { files } => dispatch_files(&config, &files).await,
        Command::Token { credentials, invalidate } => forward_token(&config, credentials, invalidate).await,
    }
}

fn read_payload(path: &Path) -> anyhow::Result<RawPushPayload> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    RawPushPayload::from_json_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn classify_file(path: &Path) -> anyhow::Result<()> {
    let payload = read_payload(path)?;
    let report = classify_report(&payload);

    let output = ClassifyOutput {
        event: report.event.label(),
        call: report.event.as_call(),
        defaulted: report.notes.iter().map(ToString::to_string).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn dispatch_files(config: &PushConfig, files: &[PathBuf]) -> anyhow::Result<()> {
    let runtime = PushRuntime::from_config(config)?;
    runtime.presenter().install(Arc::new(LoggingPresenter)).await;

    for path in files {
        // An unreadable file is still a delivery the transport expects an answer for
        let payload = match read_payload(path) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("{:#}, treating as empty payload", e);
                RawPushPayload::new()
            }
        };

        let (completion, acked) = Completion::channel();
        let outcome = runtime.handle_push(payload, completion).await;

        let acknowledged = acked.await.is_ok();
        println!("{}: {:?} (acknowledged: {})", path.display(), outcome, acknowledged);
    }
    Ok(())
}

async fn forward_token(config: &PushConfig, credentials: Option<String>, invalidate: bool) -> anyhow::Result<()> {
    let runtime = PushRuntime::from_config(config)?;
    runtime.presenter().install(Arc::new(LoggingPresenter)).await;

    let event = if invalidate {
        TransportEvent::TokenInvalidated
    } else {
        let Some(hex_text) = credentials else {
            bail!("credentials are required unless --invalidate is given");
        };
        let bytes = hex::decode(hex_text.trim()).context("credentials must be hex")?;
        TransportEvent::CredentialsUpdated { credentials: bytes }
    };
    runtime.bus().dispatch(event).await;

    let token = runtime.tokens().current_token().await;
    match &config.token_store_path {
        Some(path) => println!("token {:?} stored under {} in {}", token.as_str(), runtime.tokens().key(), path.display()),
        None => println!("token {:?} stored under {} (in memory)", token.as_str(), runtime.tokens().key()),
    }
    Ok(())
}
