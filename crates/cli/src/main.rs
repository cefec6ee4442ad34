mod config;
mod people;

use std::{io, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    config::{default_config_path, load_config_from_path},
    people::{DEFAULT_FIELDS, IndexSummary, PeopleRequest, build_planner},
};

/// Enrich people records by planning and running field providers.
#[derive(Parser, Debug)]
#[command(name = "fieldplan", version, about)]
struct Args {
    /// Fields to return, comma separated; `_CPF` asks for the raw index value
    #[arg(long, value_delimiter = ',')]
    fields: Vec<String>,

    /// Maximum number of people to return
    #[arg(long)]
    limit: Option<usize>,

    /// Config file (JSON, or YAML with a .yaml/.yml extension)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print single-line JSON
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config = load_config_from_path(&config_path)?;
    let planner = Arc::new(build_planner(config.dataset(), config.planner.clone())?);

    let fields = if args.fields.is_empty() {
        DEFAULT_FIELDS.iter().map(|field| field.to_string()).collect()
    } else {
        args.fields
    };
    let request = PeopleRequest::new(fields, args.limit);

    let cancellation = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_ctrl_c(cancellation.clone()));

    let plan_cancellation = cancellation.clone();
    let payload = tokio::task::spawn_blocking(move || planner.new_plan(request).execute(&plan_cancellation))
        .await
        .context("plan execution task failed")??;
    watcher.abort();

    if let Some(summary) = payload.custom_data_ref::<IndexSummary>() {
        info!(indexed = summary.indexed, returned = summary.returned, "people enriched");
    }

    let people = payload.into_documents();
    let output = if args.compact {
        serde_json::to_string(&people)?
    } else {
        serde_json::to_string_pretty(&people)?
    };
    println!("{output}");
    Ok(())
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

async fn cancel_on_ctrl_c(cancellation: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        warn!("interrupt received; cancelling plan");
        cancellation.cancel();
    }
}
