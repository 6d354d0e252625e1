use anyhow::{Context, Result};
use clap::Parser;
use pressbox_common::observability::{LogConfig, init_logging};
use pressbox_config::{PressboxConfig, PressboxConfigLoader};
use std::process::ExitCode;

mod cli;
mod wiring;

use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    // Credentials may live in a local .env next to the config.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let cfg: PressboxConfig = PressboxConfigLoader::new()
        .with_file(&cli.config)
        .load()
        .with_context(|| format!("load {}", cli.config.display()))?;

    let log_path = init_logging(LogConfig {
        app_name: "pressbox",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    })?;
    tracing::info!(
        log = %log_path.display(),
        accounts = cfg.accounts.len(),
        keywords = cfg.topic.keywords.len(),
        dry_run = cli.dry_run,
        "pressbox.start"
    );

    let relay = wiring::build_relay(&cfg, cli.dry_run)?;

    let checkpoint_path = cli
        .checkpoint
        .clone()
        .unwrap_or_else(|| cfg.run.checkpoint_path());
    let mut store = wiring::open_checkpoint(&checkpoint_path);
    let report = relay.run_once(&mut store).await;

    let exit = match wiring::persist_checkpoint(&mut store, cli.dry_run) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "checkpoint.save_failed");
            ExitCode::FAILURE
        }
    };

    tracing::info!(
        published = report.published,
        skipped = report.skipped,
        failed_accounts = ?report.failed_accounts,
        dry_run = cli.dry_run,
        "pressbox.done"
    );
    Ok(exit)
}
