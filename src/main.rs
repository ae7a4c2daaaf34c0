use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sluice_config::RuntimeConfig;
use sluice_host::HttpSink;
use sluice_runtime::{Event, InvocationOutcome, InvocationRecord, Runtime, StartupReport};
use sluice_world::SourceId;

/// Sluice - run sandboxed WebAssembly handlers on event sources
#[derive(Parser)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Load every component and binding in a config and report the result
  Check {
    /// Path to the runtime config (JSON)
    config_file: PathBuf,
  },

  /// Dispatch one event read from stdin and print the invocation record
  Dispatch {
    /// Path to the runtime config (JSON)
    config_file: PathBuf,

    /// Source identity of the event, e.g. queue:inbox
    #[arg(long)]
    source: String,

    /// Use this as the invocation id instead of a generated one
    #[arg(long)]
    correlation_id: Option<String>,
  },

  /// Run the configured timer triggers until interrupted
  Serve {
    /// Path to the runtime config (JSON)
    config_file: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Check { config_file }) => check(&config_file)?,
    Some(Commands::Dispatch {
      config_file,
      source,
      correlation_id,
    }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { dispatch(&config_file, &source, correlation_id).await })?;
    }
    Some(Commands::Serve { config_file }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { serve(&config_file).await })?;
    }
    None => {
      println!("sluice - use --help to see available commands");
    }
  }

  Ok(())
}

fn start(config_file: &Path) -> Result<Runtime> {
  let config = RuntimeConfig::from_file(config_file)
    .with_context(|| format!("failed to load config file: {}", config_file.display()))?;
  Runtime::start(&config, Arc::new(HttpSink::new())).context("failed to start runtime")
}

fn check(config_file: &Path) -> Result<()> {
  let runtime = start(config_file)?;
  let report = runtime.report();
  println!("{}", serde_json::to_string_pretty(&report_json(report))?);

  if !report.is_clean() {
    anyhow::bail!(
      "{} component(s) and {} binding(s) rejected",
      report.rejected_components.len(),
      report.rejected_bindings.len()
    );
  }
  Ok(())
}

async fn dispatch(config_file: &Path, source: &str, correlation_id: Option<String>) -> Result<()> {
  let source: SourceId = source
    .parse()
    .with_context(|| format!("invalid source identity: {}", source))?;
  let runtime = start(config_file)?;

  let payload = read_payload_from_stdin()?;
  let mut event = Event::new(source, payload);
  if let Some(id) = correlation_id {
    event = event.with_correlation_id(id);
  }

  let record = runtime.dispatcher().dispatch(event).await.context("dispatch failed")?;
  println!("{}", serde_json::to_string_pretty(&record_json(&record))?);
  Ok(())
}

async fn serve(config_file: &Path) -> Result<()> {
  let runtime = start(config_file)?;
  let cancel = CancellationToken::new();
  let handles = runtime.spawn_timers(cancel.clone());
  eprintln!("Serving {} timer trigger(s), press Ctrl-C to stop", handles.len());

  tokio::signal::ctrl_c().await.context("failed to listen for Ctrl-C")?;
  cancel.cancel();

  for handle in handles {
    let ticks = handle.await.context("timer task failed")?;
    eprintln!("Timer stopped after {} tick(s)", ticks);
  }
  Ok(())
}

fn report_json(report: &StartupReport) -> serde_json::Value {
  serde_json::json!({
    "loaded": report.loaded.iter().map(|c| serde_json::json!({
      "id": c.id,
      "digest": c.digest,
      "world": c.world,
    })).collect::<Vec<_>>(),
    "rejected_components": report.rejected_components.iter().map(|c| serde_json::json!({
      "id": c.id,
      "error": c.error.to_string(),
    })).collect::<Vec<_>>(),
    "bound": report.bound,
    "rejected_bindings": report.rejected_bindings.iter().map(|b| serde_json::json!({
      "source": b.source,
      "reason": b.reason,
    })).collect::<Vec<_>>(),
  })
}

fn record_json(record: &InvocationRecord) -> serde_json::Value {
  let detail = match &record.outcome {
    InvocationOutcome::Succeeded(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    other => other.to_string(),
  };
  serde_json::json!({
    "invocation_id": record.invocation_id,
    "source": record.source,
    "component": record.component,
    "phase": record.phase,
    "elapsed_ms": record.elapsed.as_millis() as u64,
    "detail": detail,
  })
}

fn read_payload_from_stdin() -> Result<Vec<u8>> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(Vec::new());
  }

  let mut input = Vec::new();
  io::stdin()
    .read_to_end(&mut input)
    .context("failed to read payload from stdin")?;
  Ok(input)
}
