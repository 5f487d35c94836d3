#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

//! CLI for process memory-trend monitoring
//!
//! Resolves the target, samples it until the duration elapses, the process
//! exits or Ctrl-C is pressed, then prints and persists the report.

mod cli;
mod settings;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use memtrend::{ArtifactKind, EXIT_FAILURE, Session, SessionOutcome, SysinfoProcessTable};

use crate::cli::Cli;
use crate::settings::{FileSettings, RunSettings};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            e.downcast_ref::<memtrend::Error>()
                .map_or(EXIT_FAILURE, memtrend::Error::exit_code)
        }
    };

    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let file = cli
        .config
        .as_deref()
        .map(FileSettings::load)
        .transpose()?
        .unwrap_or_default();
    let RunSettings { target, config } = settings::resolve(&cli, file)?;

    println!("=== Memory Check ===");
    println!("Target:    {target}");
    println!(
        "Duration:  {}s, interval {}s ({} samples planned)",
        config.duration().as_secs(),
        config.interval().as_secs(),
        config.planned_ticks()
    );
    println!(
        "Threshold: {:.0} MB{}",
        memtrend::sample::bytes_to_mb(config.threshold_bytes()),
        if config.alerts_enabled() { "" } else { " (alerts off)" }
    );
    println!("Output:    {}", config.output_dir().display());
    println!();

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current tick");
            let _ = cancel_tx.send(true);
        }
    });

    let outcome = Session::new(target, config, SysinfoProcessTable::new())
        .run(cancel_rx, |alert| println!("ALERT: {alert}"))
        .await
        .context("memory check failed")?;

    print_outcome(&outcome);
    if cli.json {
        print_json(&outcome).context("failed to render JSON summary")?;
    }

    Ok(outcome.exit_code)
}

fn print_outcome(outcome: &SessionOutcome) {
    println!();
    print!("{}", outcome.report.chart_text);
    println!();
    print!("{}", outcome.report.summary_text);
    println!();

    for kind in [ArtifactKind::Csv, ArtifactKind::Chart, ArtifactKind::Summary] {
        if let Some(path) = outcome.artifacts.path_of(kind) {
            println!("{kind:<8} {}", path.display());
        }
    }
    for failure in &outcome.artifacts.failures {
        error!(error = %failure, "artifact not written");
        eprintln!("Error: {failure}");
    }
}

fn print_json(outcome: &SessionOutcome) -> Result<()> {
    let doc = json!({
        "target": outcome.record.target,
        "termination": outcome.record.termination,
        "missed_ticks": outcome.record.missed_ticks,
        "statistics": outcome.statistics,
        "verdict": outcome.verdict,
        "alerts": outcome.record.alerts.len(),
        "exit_code": outcome.exit_code,
        "artifacts": outcome
            .artifacts
            .written
            .iter()
            .map(|(kind, path)| (kind.to_string(), path.display().to_string()))
            .collect::<std::collections::BTreeMap<_, _>>(),
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}
