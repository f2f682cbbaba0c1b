//! Fixtures shared by unit tests.

use serde_json::{json, Value};
use tempfile::TempDir;

use crate::airtable::Record;
use crate::cache::SnapshotConfig;

/// Build a record the way the API would return it.
pub(crate) fn record(id: &str, fields: Value) -> Record {
  serde_json::from_value(json!({"id": id, "fields": fields})).unwrap()
}

/// Snapshot configuration rooted in a temporary directory.
pub(crate) fn snapshot_config(dir: &TempDir) -> SnapshotConfig {
  SnapshotConfig::default().with_root(dir.path())
}
