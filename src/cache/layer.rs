//! Cache store for one base: fetch tables from the provider and persist them.

use tracing::{info, info_span, Instrument};

use super::storage::{SnapshotConfig, SnapshotInfo, SnapshotStore};
use super::traits::RecordProvider;
use crate::airtable::{ApiKey, FetchOptions};
use crate::error::{Error, Result};
use crate::table::Table;

/// A base and its local snapshots.
///
/// Sits between the remote provider and the snapshot files: every refresh
/// fetches the whole table and replaces its snapshot.
pub struct Base<P: RecordProvider> {
  base_id: String,
  api_key: ApiKey,
  provider: P,
  store: SnapshotStore,
}

impl<P: RecordProvider> Base<P> {
  /// Create the cache store, making sure `<root>/<base_id>/` exists.
  ///
  /// A base id that is not a single directory name fails with
  /// [`Error::InvalidBaseId`] before anything is created.
  pub fn open(
    base_id: impl Into<String>,
    api_key: ApiKey,
    provider: P,
    config: &SnapshotConfig,
  ) -> Result<Self> {
    let base_id = base_id.into();
    let store = SnapshotStore::open(config, &base_id)?;

    Ok(Self {
      base_id,
      api_key,
      provider,
      store,
    })
  }

  pub fn base_id(&self) -> &str {
    &self.base_id
  }

  pub fn store(&self) -> &SnapshotStore {
    &self.store
  }

  /// Fetch every record of `table_name` and install it as the table's snapshot.
  ///
  /// `options` go to the provider untouched. Provider failures are returned as
  /// [`Error::Provider`] and leave the previous snapshot in place.
  pub async fn cache_table(&self, table_name: &str, options: &FetchOptions) -> Result<()> {
    // Reject unusable names before spending a network round trip
    self.store.table_path(table_name)?;

    let span = info_span!("cache_table", base = %self.base_id, table = table_name);
    let records = self
      .provider
      .fetch_all(&self.base_id, table_name, &self.api_key, options)
      .instrument(span.clone())
      .await
      .map_err(|e| Error::Provider {
        table: table_name.to_string(),
        source: Box::new(e),
      })?;

    span.in_scope(|| {
      info!(records = records.len(), "fetched table");
      self.store.write(table_name, &records)
    })
  }

  /// Delete every snapshot of this base. Irreversible.
  pub fn clear_cache(&self) -> Result<()> {
    self.store.clear()
  }

  /// Tables currently cached for this base.
  pub fn snapshots(&self) -> Result<Vec<SnapshotInfo>> {
    self.store.list()
  }

  /// Query engine over one of this base's snapshots.
  pub fn table(&self, table_name: impl Into<String>) -> Table {
    Table::with_store(self.base_id.clone(), table_name, self.store.clone())
  }
}
