//! Error types for snapshot caching and querying.

use std::path::PathBuf;

/// Result type used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the cache store and the query engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The remote provider failed to fetch a table. Not retried.
  #[error("failed to fetch table '{table}' from provider")]
  Provider {
    table: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// A file system operation on the snapshot directory failed.
  #[error("storage error: {message}")]
  Storage {
    message: String,
    #[source]
    source: std::io::Error,
  },

  /// No snapshot exists for the table (never cached, or a different snapshot root).
  #[error("no snapshot for table '{table}' at {}", path.display())]
  NotFound { table: String, path: PathBuf },

  /// A field cannot be used for the requested operation.
  #[error("invalid field '{field}' in table '{table}': {reason}")]
  Field {
    table: String,
    field: String,
    reason: String,
  },

  /// The snapshot never parsed within the retry budget.
  #[error("snapshot {} unreadable after {attempts} attempts", path.display())]
  CorruptSnapshot {
    path: PathBuf,
    attempts: u32,
    #[source]
    source: serde_json::Error,
  },

  /// The table name cannot be mapped to a snapshot file.
  #[error("invalid table name '{0}'")]
  InvalidTableName(String),

  /// The base id cannot be mapped to a snapshot directory.
  #[error("invalid base id '{0}'")]
  InvalidBaseId(String),
}

impl Error {
  pub(crate) fn storage(message: impl Into<String>, source: std::io::Error) -> Self {
    Self::Storage {
      message: message.into(),
      source,
    }
  }

  pub(crate) fn field(
    table: impl Into<String>,
    field: impl Into<String>,
    reason: impl Into<String>,
  ) -> Self {
    Self::Field {
      table: table.into(),
      field: field.into(),
      reason: reason.into(),
    }
  }
}
