// src/lib.rs

pub mod balrog;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod engine;
pub mod errors;
pub mod event;
pub mod graph;
pub mod logging;
pub mod scheduler;
pub mod transport;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{info, warn};

use crate::balrog::BalrogClient;
use crate::cli::CliArgs;
use crate::config::{ConfigFile, load_and_validate};
use crate::crypto::SealedBoxEncryptor;
use crate::engine::{Listener, Pipeline, ReleasePolicy};
use crate::event::BuildClassifier;
use crate::graph::{GraphBuilder, GraphSettings, SlugIdGenerator, SystemClock};
use crate::scheduler::{DryRunSubmitter, GraphSubmitter, SchedulerClient};
use crate::transport::JsonLinesSource;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - release resolver, encryptor, graph builder and submitter
/// - the JSON-lines event source (file or STDIN)
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading config {}", args.config))?;

    let pipeline = Arc::new(build_pipeline(&cfg, args.dry_run)?);

    let bindings = pipeline.classifier().routing_key_bindings();
    info!(
        branches = ?cfg.listener.branches,
        bindings = bindings.len(),
        dry_run = args.dry_run,
        "funsize starting"
    );
    for key in bindings.iter() {
        tracing::debug!(binding = %key, "routing key binding");
    }

    match args.events {
        Some(ref path) => {
            let file = File::open(path)
                .await
                .with_context(|| format!("opening events file {path}"))?;
            listen(BufReader::new(file), pipeline).await
        }
        None => listen(BufReader::new(tokio::io::stdin()), pipeline).await,
    }
}

/// Construct the production pipeline from validated configuration.
///
/// The public key is loaded once here; with `dry_run` the scheduler is
/// never contacted.
pub fn build_pipeline(cfg: &ConfigFile, dry_run: bool) -> Result<Pipeline> {
    let classifier = BuildClassifier::new(&cfg.listener.branches)?;
    let resolver = Arc::new(BalrogClient::from_config(cfg)?);

    let key_path = cfg.resolve_path(&cfg.encryption.public_key);
    let encryptor = SealedBoxEncryptor::from_key_file(&key_path)
        .with_context(|| format!("loading public key {}", key_path.display()))?;

    let builder = GraphBuilder::new(
        GraphSettings::from_config(cfg),
        Arc::new(encryptor),
        Arc::new(SystemClock),
        Arc::new(SlugIdGenerator),
    );

    let submitter: Arc<dyn GraphSubmitter> = if dry_run {
        Arc::new(DryRunSubmitter)
    } else {
        Arc::new(SchedulerClient::from_config(cfg)?)
    };

    Ok(Pipeline::new(
        classifier,
        resolver,
        builder,
        submitter,
        ReleasePolicy::from_config(cfg),
    ))
}

async fn listen<R>(reader: R, pipeline: Arc<Pipeline>) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send,
{
    let listener = Listener::new(JsonLinesSource::new(reader), pipeline);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    let stats = listener.run_until(shutdown).await?;
    info!(
        received = stats.received,
        ignored = stats.ignored,
        failed = stats.failed,
        graphs_submitted = stats.graphs_submitted,
        "funsize stopped"
    );
    Ok(())
}
