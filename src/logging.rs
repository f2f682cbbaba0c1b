//! Tracing subscriber setup for the CLI.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber, filtered by `RUST_LOG` (default `warn`).
///
/// Logs go to stderr, or to `<log_dir>/atcache.<date>.log` when a directory is
/// given. Hold the returned guard until exit so buffered lines are flushed.
pub fn init(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

  let Some(dir) = log_dir else {
    tracing_subscriber::registry()
      .with(filter)
      .with(
        fmt::layer()
          .with_writer(std::io::stderr)
          .with_target(false),
      )
      .init();
    return Ok(None);
  };

  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
  let appender = RollingFileAppender::builder()
    .rotation(Rotation::DAILY)
    .filename_prefix("atcache")
    .filename_suffix("log")
    .build(dir)
    .map_err(|e| eyre!("Failed to open log file in {}: {}", dir.display(), e))?;
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::registry()
    .with(filter)
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .init();

  Ok(Some(guard))
}
