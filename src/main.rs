//! mail-autoreply-rs: inbox triage with automated acknowledgments
//!
//! Lists a bounded batch of inbox messages, replies once to each message
//! that is not yet part of a conversation, and tags replied messages with a
//! handled label so later passes leave them alone.
//!
//! # Architecture
//!
//! - [`main`]: Process entry point with env loading, CLI overrides, and output
//! - [`config`]: Environment-driven configuration
//! - [`errors`]: Application error model
//! - [`auth`]: Credential acquisition for the mail service
//! - [`mailbox`]: Mailbox client trait consumed by the pipeline
//! - [`gmail`]: Gmail REST implementation of the mailbox client
//! - [`mime`]: RFC 822 parsing of fetched messages
//! - [`models`]: Domain types and the JSON run summary
//! - [`classifier`]: Reply-candidate decision
//! - [`composer`]: Reply envelope composition and encoding
//! - [`coordinator`]: Send-then-tag dispatch per message
//! - [`pipeline`]: Batch listing, windowing, and sequential processing

mod auth;
mod classifier;
mod composer;
mod config;
mod coordinator;
mod errors;
mod gmail;
mod mailbox;
mod mime;
mod models;
mod pipeline;

use std::time::Instant;

use auth::{Authenticator, StaticTokenAuthenticator};
use clap::Parser;
use config::TriageConfig;
use gmail::GmailClient;
use models::{Meta, RunEnvelope, RunReport};
use pipeline::TriagePipeline;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command line overrides for environment configuration
#[derive(Debug, Parser)]
#[command(name = "mail-autoreply", version, about)]
struct Cli {
    /// Maximum number of message ids listed (MAIL_TRIAGE_BATCH_LIMIT)
    #[arg(long)]
    batch_limit: Option<usize>,
    /// Trailing listed ids left unprocessed (MAIL_TRIAGE_HOLD_BACK)
    #[arg(long)]
    hold_back: Option<usize>,
    /// Display name of the handled label (MAIL_TRIAGE_HANDLED_LABEL)
    #[arg(long)]
    label: Option<String>,
    /// Skip messages already carrying the handled label
    #[arg(long)]
    skip_handled: bool,
}

impl Cli {
    fn apply(self, config: &mut TriageConfig) {
        if let Some(v) = self.batch_limit {
            config.batch_limit = v;
        }
        if let Some(v) = self.hold_back {
            config.hold_back = v;
        }
        if let Some(v) = self.label {
            config.handled_label = v;
        }
        if self.skip_handled {
            config.skip_handled = true;
        }
    }
}

/// Application entry point
///
/// Initializes tracing (stderr, `RUST_LOG`), loads config, authenticates,
/// runs one triage pass, and prints the run envelope as JSON on stdout.
/// Ctrl-C stops the pass between messages.
///
/// # Example
///
/// ```no_run
/// MAIL_TRIAGE_ACCESS_TOKEN=ya29.a0Af... \
/// RUST_LOG=info \
/// cargo run -- --batch-limit 20 --hold-back 0
/// ```
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let started = Instant::now();
    let run_id = uuid::Uuid::new_v4().to_string();

    let mut config = TriageConfig::load_from_env()?;
    Cli::parse().apply(&mut config);
    config.validate()?;

    let credential = StaticTokenAuthenticator::new(config.access_token.clone())
        .authenticate()
        .await?;
    let client = GmailClient::new(&config, credential)?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; finishing current message");
            signal_token.cancel();
        }
    });

    info!(run_id = %run_id, "triage run starting");
    let summary = TriagePipeline::new(&client, &config)
        .run(config.batch_limit, &cancel)
        .await?;

    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let envelope = RunEnvelope {
        summary: summary.headline(),
        data: RunReport::new(&config.handled_label, &summary),
        meta: Meta::now(&run_id, duration_ms),
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}
