//! Snapshot file storage: one JSON file per table under a per-base directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::airtable::Record;
use crate::error::{Error, Result};

/// On-disk layout of a table snapshot.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
  list: Vec<Record>,
}

/// Borrowing counterpart of [`Snapshot`] used when writing.
#[derive(Serialize)]
struct SnapshotRef<'a> {
  list: &'a [Record],
}

/// How hard a reader tries before giving up on a snapshot that does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  /// Total parse attempts, including the first
  pub max_attempts: u32,
  pub initial_backoff_ms: u64,
  pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 20,
      initial_backoff_ms: 1,
      max_backoff_ms: 100,
    }
  }
}

impl RetryPolicy {
  /// Backoff before the attempt following `attempt` (1-based), doubling each time.
  fn backoff(&self, attempt: u32) -> Duration {
    let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    let millis = self
      .initial_backoff_ms
      .saturating_mul(factor)
      .min(self.max_backoff_ms);
    Duration::from_millis(millis)
  }
}

/// Where snapshots live and how they are read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
  /// Root directory; each base gets a subdirectory named after its id
  pub root: PathBuf,
  pub retry: RetryPolicy,
}

impl Default for SnapshotConfig {
  fn default() -> Self {
    Self {
      root: Self::default_root(),
      retry: RetryPolicy::default(),
    }
  }
}

impl SnapshotConfig {
  pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
    self.root = root.into();
    self
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  /// Platform data directory, or `./.airtable-cache` when none is known.
  pub fn default_root() -> PathBuf {
    dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .map(|dir| dir.join("airtable-cache"))
      .unwrap_or_else(|| PathBuf::from(".airtable-cache"))
      .join("snapshots")
  }
}

/// Metadata about one cached table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotInfo {
  pub table: String,
  pub size_bytes: u64,
  pub cached_at: DateTime<Utc>,
}

/// File access for the snapshots of a single base.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
  dir: PathBuf,
  retry: RetryPolicy,
}

impl SnapshotStore {
  /// Point at the base directory without touching the file system.
  ///
  /// The base id must name a single directory below the snapshot root.
  pub fn new(config: &SnapshotConfig, base_id: &str) -> Result<Self> {
    if !is_valid_name(base_id) {
      return Err(Error::InvalidBaseId(base_id.to_string()));
    }
    Ok(Self {
      dir: config.root.join(base_id),
      retry: config.retry,
    })
  }

  /// Like [`SnapshotStore::new`], creating the root and base directories if absent.
  pub fn open(config: &SnapshotConfig, base_id: &str) -> Result<Self> {
    let store = Self::new(config, base_id)?;
    store.ensure_dir()?;
    Ok(store)
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Path of a table's snapshot file.
  pub fn table_path(&self, table_name: &str) -> Result<PathBuf> {
    validate_table_name(table_name)?;
    Ok(self.dir.join(format!("{}.json", table_name)))
  }

  fn ensure_dir(&self) -> Result<()> {
    fs::create_dir_all(&self.dir).map_err(|e| {
      Error::storage(
        format!("failed to create snapshot directory {}", self.dir.display()),
        e,
      )
    })
  }

  /// Replace a table's snapshot.
  ///
  /// The new content is written to a temporary file in the same directory and
  /// renamed over the old snapshot, so readers never see a partial file.
  pub fn write(&self, table_name: &str, records: &[Record]) -> Result<()> {
    let path = self.table_path(table_name)?;
    self.ensure_dir()?;

    let data = serde_json::to_vec(&SnapshotRef { list: records })
      .map_err(|e| Error::storage("failed to serialize snapshot", e.into()))?;

    let mut tmp = tempfile::Builder::new()
      .prefix(".snapshot-")
      .suffix(".tmp")
      .tempfile_in(&self.dir)
      .map_err(|e| Error::storage("failed to create temporary snapshot", e))?;
    tmp
      .write_all(&data)
      .and_then(|_| tmp.as_file().sync_all())
      .map_err(|e| Error::storage("failed to write temporary snapshot", e))?;
    tmp.persist(&path).map_err(|e| {
      Error::storage(
        format!("failed to install snapshot {}", path.display()),
        e.error,
      )
    })?;

    info!(
      table = table_name,
      records = records.len(),
      path = %path.display(),
      "snapshot installed"
    );
    Ok(())
  }

  /// Load a table's records.
  ///
  /// A snapshot that is not valid JSON (or not UTF-8) is assumed to be caught
  /// mid-write and is re-read with backoff until it parses or the retry policy
  /// runs out.
  pub fn read(&self, table_name: &str) -> Result<Vec<Record>> {
    let path = self.table_path(table_name)?;
    let mut attempt = 1;

    loop {
      let parsed = match fs::read(&path) {
        Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes),
        Err(e) if e.kind() == ErrorKind::NotFound => {
          return Err(Error::NotFound {
            table: table_name.to_string(),
            path,
          });
        }
        Err(e) => {
          return Err(Error::storage(
            format!("failed to read snapshot {}", path.display()),
            e,
          ));
        }
      };

      match parsed {
        Ok(snapshot) => {
          debug!(
            table = table_name,
            records = snapshot.list.len(),
            attempt,
            "snapshot loaded"
          );
          return Ok(snapshot.list);
        }
        Err(source) if attempt >= self.retry.max_attempts => {
          return Err(Error::CorruptSnapshot {
            path,
            attempts: attempt,
            source,
          });
        }
        Err(e) => {
          warn!(
            table = table_name,
            attempt,
            error = %e,
            "snapshot did not parse, retrying"
          );
          std::thread::sleep(self.retry.backoff(attempt));
          attempt += 1;
        }
      }
    }
  }

  /// Delete every snapshot of the base and recreate the empty directory.
  pub fn clear(&self) -> Result<()> {
    match fs::remove_dir_all(&self.dir) {
      Ok(()) => {}
      Err(e) if e.kind() == ErrorKind::NotFound => {}
      Err(e) => {
        return Err(Error::storage(
          format!("failed to remove {}", self.dir.display()),
          e,
        ));
      }
    }
    self.ensure_dir()?;
    info!(dir = %self.dir.display(), "snapshots cleared");
    Ok(())
  }

  /// List the cached tables, sorted by name.
  pub fn list(&self) -> Result<Vec<SnapshotInfo>> {
    let entries = match fs::read_dir(&self.dir) {
      Ok(entries) => entries,
      Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
      Err(e) => {
        return Err(Error::storage(
          format!("failed to list {}", self.dir.display()),
          e,
        ));
      }
    };

    let mut snapshots = Vec::new();
    for entry in entries {
      let entry = entry.map_err(|e| Error::storage("failed to read directory entry", e))?;
      let path = entry.path();
      if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
        continue;
      }
      let Some(table) = path.file_stem().and_then(|stem| stem.to_str()) else {
        continue;
      };

      let metadata = entry
        .metadata()
        .map_err(|e| Error::storage(format!("failed to stat {}", path.display()), e))?;
      let modified = metadata
        .modified()
        .map_err(|e| Error::storage(format!("failed to stat {}", path.display()), e))?;

      snapshots.push(SnapshotInfo {
        table: table.to_string(),
        size_bytes: metadata.len(),
        cached_at: DateTime::<Utc>::from(modified),
      });
    }

    snapshots.sort_by(|a, b| a.table.cmp(&b.table));
    Ok(snapshots)
  }
}

/// Base ids and table names become path components, so each must name
/// exactly one entry of its parent directory.
fn is_valid_name(name: &str) -> bool {
  !(name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']))
}

fn validate_table_name(table_name: &str) -> Result<()> {
  if !is_valid_name(table_name) {
    return Err(Error::InvalidTableName(table_name.to_string()));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::record;
  use serde_json::json;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::Arc;
  use tempfile::TempDir;

  fn store(dir: &TempDir) -> SnapshotStore {
    let config = SnapshotConfig::default().with_root(dir.path());
    SnapshotStore::open(&config, "appBase").unwrap()
  }

  #[test]
  fn test_open_creates_base_directory() {
    let dir = TempDir::new().unwrap();
    let config = SnapshotConfig::default().with_root(dir.path().join("nested").join("root"));

    let store = SnapshotStore::open(&config, "appBase").unwrap();
    assert!(store.dir().is_dir());

    // Opening again is not an error
    SnapshotStore::open(&config, "appBase").unwrap();
  }

  #[test]
  fn test_write_produces_list_document() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store
      .write("Table 1", &[record("rec1", json!({"Name": "One"}))])
      .unwrap();

    let raw: serde_json::Value =
      serde_json::from_slice(&fs::read(dir.path().join("appBase").join("Table 1.json")).unwrap())
        .unwrap();
    assert_eq!(
      raw,
      json!({"list": [{"id": "rec1", "fields": {"Name": "One"}}]})
    );
  }

  #[test]
  fn test_write_replaces_previous_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store
      .write("T", &[record("rec1", json!({})), record("rec2", json!({}))])
      .unwrap();
    store.write("T", &[record("rec3", json!({}))]).unwrap();

    let records = store.read("T").unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "rec3");
  }

  #[test]
  fn test_read_missing_snapshot_is_not_found() {
    let dir = TempDir::new().unwrap();
    let err = store(&dir).read("Nope").unwrap_err();
    assert!(matches!(err, Error::NotFound { ref table, .. } if table == "Nope"));
  }

  #[test]
  fn test_read_gives_up_after_max_attempts() {
    let dir = TempDir::new().unwrap();
    let config = SnapshotConfig::default()
      .with_root(dir.path())
      .with_retry(RetryPolicy {
        max_attempts: 3,
        initial_backoff_ms: 0,
        max_backoff_ms: 0,
      });
    let store = SnapshotStore::open(&config, "appBase").unwrap();
    fs::write(store.table_path("T").unwrap(), b"{\"list\": [{\"id\"").unwrap();

    let err = store.read("T").unwrap_err();
    assert!(matches!(err, Error::CorruptSnapshot { attempts: 3, .. }));
  }

  #[test]
  fn test_read_waits_out_torn_write() {
    let dir = TempDir::new().unwrap();
    let config = SnapshotConfig::default()
      .with_root(dir.path())
      .with_retry(RetryPolicy {
        max_attempts: 1000,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
      });
    let store = SnapshotStore::open(&config, "appBase").unwrap();
    let path = store.table_path("T").unwrap();

    // A non-atomic writer left half a document behind
    fs::write(&path, b"{\"list\": [").unwrap();

    let writer = {
      let path = path.clone();
      std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        fs::write(&path, br#"{"list": [{"id": "rec1", "fields": {}}]}"#).unwrap();
      })
    };

    let records = store.read("T").unwrap();
    writer.join().unwrap();
    assert_eq!(records.len(), 1);
  }

  #[test]
  fn test_concurrent_refresh_and_read() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    let small = vec![record("rec1", json!({"n": 1}))];
    let large: Vec<Record> = (0..500)
      .map(|i| record(&format!("rec{}", i), json!({"n": i, "text": "x".repeat(64)})))
      .collect();
    store.write("T", &small).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let writer = {
      let store = store.clone();
      let done = Arc::clone(&done);
      let (small, large) = (small.clone(), large.clone());
      std::thread::spawn(move || {
        for i in 0..100 {
          let records = if i % 2 == 0 { &large } else { &small };
          store.write("T", records).unwrap();
        }
        done.store(true, Ordering::SeqCst);
      })
    };

    let mut reads = 0;
    while !done.load(Ordering::SeqCst) || reads == 0 {
      let records = store.read("T").unwrap();
      assert!(records.len() == 1 || records.len() == 500);
      reads += 1;
    }
    writer.join().unwrap();
  }

  #[test]
  fn test_clear_removes_all_snapshots() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.write("A", &[]).unwrap();
    store.write("B", &[]).unwrap();

    store.clear().unwrap();

    assert!(store.dir().is_dir());
    assert!(store.list().unwrap().is_empty());
    assert!(matches!(store.read("A"), Err(Error::NotFound { .. })));
  }

  #[test]
  fn test_list_sorted_and_skips_temporary_files() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    store.write("Zeta", &[record("rec1", json!({}))]).unwrap();
    store.write("Alpha", &[]).unwrap();
    fs::write(store.dir().join(".snapshot-abc.tmp"), b"{").unwrap();

    let tables: Vec<String> = store.list().unwrap().into_iter().map(|s| s.table).collect();
    assert_eq!(tables, vec!["Alpha", "Zeta"]);
  }

  #[test]
  fn test_rejects_path_like_table_names() {
    let dir = TempDir::new().unwrap();
    let store = store(&dir);
    for name in ["", ".", "..", "a/b", "..\\x"] {
      assert!(matches!(
        store.write(name, &[]),
        Err(Error::InvalidTableName(_))
      ));
    }
  }

  #[test]
  fn test_rejects_path_like_base_ids() {
    let dir = TempDir::new().unwrap();
    let config = SnapshotConfig::default().with_root(dir.path().join("root"));
    let other = SnapshotStore::open(&config, "appOther").unwrap();
    other.write("T", &[]).unwrap();

    for base_id in ["", ".", "..", "../appOther", "app/Base"] {
      assert!(matches!(
        SnapshotStore::new(&config, base_id),
        Err(Error::InvalidBaseId(ref id)) if id == base_id
      ));
      assert!(matches!(
        SnapshotStore::open(&config, base_id),
        Err(Error::InvalidBaseId(_))
      ));
    }

    // Nothing outside a valid base directory was touched
    assert!(other.table_path("T").unwrap().is_file());
    assert!(!dir.path().join("app").exists());
  }

  #[test]
  fn test_backoff_doubles_up_to_cap() {
    let policy = RetryPolicy {
      max_attempts: 10,
      initial_backoff_ms: 2,
      max_backoff_ms: 10,
    };
    assert_eq!(policy.backoff(1), Duration::from_millis(2));
    assert_eq!(policy.backoff(2), Duration::from_millis(4));
    assert_eq!(policy.backoff(3), Duration::from_millis(8));
    assert_eq!(policy.backoff(4), Duration::from_millis(10));
    assert_eq!(policy.backoff(200), Duration::from_millis(10));
  }
}
