use clap::Parser;
use std::path::PathBuf;

/// Relay club news from journalists' timelines, once per invocation.
#[derive(Debug, Parser)]
#[command(name = "pressbox", version, about)]
pub struct Cli {
    /// Configuration file (YAML, TOML or JSON)
    #[arg(short, long, env = "PRESSBOX_CONFIG", default_value = "pressbox.yaml")]
    pub config: PathBuf,

    /// Checkpoint file, overriding `run.checkpoint_path`
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Filter and format but do not publish or write the checkpoint
    #[arg(long)]
    pub dry_run: bool,
}
