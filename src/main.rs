mod commands;
mod config;
mod logging;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "atcache")]
#[command(about = "Cache Airtable tables locally and query the snapshots offline")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./atcache.yaml or $XDG_CONFIG_HOME/atcache/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Airtable base id to use
  #[arg(short, long, global = true)]
  base: Option<String>,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override base if specified on command line
  if let Some(base_id) = args.base {
    config.airtable.base_id = base_id;
  }

  let _log_guard = logging::init(config.log_dir.as_deref())?;

  commands::run(args.command, &config).await
}
