//! Query engine over one table snapshot.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::airtable::{FieldValue, Record};
use crate::cache::{SnapshotConfig, SnapshotStore};
use crate::error::{Error, Result};
use crate::query::Query;

/// Read access to one cached table.
///
/// Construction is lazy; the snapshot is read on every `get`/`query`, so a
/// refresh by another process is picked up by the next call.
#[derive(Debug, Clone)]
pub struct Table {
  base_id: String,
  name: String,
  store: SnapshotStore,
}

impl Table {
  /// `config` must point at the same root the snapshots were cached under.
  ///
  /// Fails only for a base id that cannot be a directory name.
  pub fn new(
    base_id: impl Into<String>,
    table_name: impl Into<String>,
    config: &SnapshotConfig,
  ) -> Result<Self> {
    let base_id = base_id.into();
    let store = SnapshotStore::new(config, &base_id)?;
    Ok(Self::with_store(base_id, table_name, store))
  }

  pub(crate) fn with_store(
    base_id: impl Into<String>,
    table_name: impl Into<String>,
    store: SnapshotStore,
  ) -> Self {
    Self {
      base_id: base_id.into(),
      name: table_name.into(),
      store,
    }
  }

  pub fn base_id(&self) -> &str {
    &self.base_id
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Find a record by id, resolving its links per `resolve_fields`.
  ///
  /// `resolve_fields` pairs a related table with the link field pointing at it.
  pub fn get(&self, record_id: &str, resolve_fields: &[(&str, &str)]) -> Result<Option<Record>> {
    let records = self.store.read(&self.name)?;
    let Some(mut record) = records.into_iter().find(|r| r.id == record_id) else {
      return Ok(None);
    };

    self.resolve_links(std::slice::from_mut(&mut record), resolve_fields)?;
    Ok(Some(record))
  }

  /// Start a query over every record of the table.
  pub fn query(&self, resolve_fields: &[(&str, &str)]) -> Result<Query> {
    let mut records = self.store.read(&self.name)?;
    self.resolve_links(&mut records, resolve_fields)?;
    Ok(Query::new(self.name.clone(), records))
  }

  /// Replace link ids with the records they point at, one level deep.
  ///
  /// Absent or blank link fields are left as they are. An id missing from the
  /// related table keeps its position as an empty slot.
  fn resolve_links(&self, records: &mut [Record], resolve_fields: &[(&str, &str)]) -> Result<()> {
    for &(related_table, field) in resolve_fields {
      let has_links = records
        .iter()
        .any(|r| r.field(field).is_some_and(|v| !v.is_blank()));
      if !has_links {
        continue;
      }

      let related = self.store.read(related_table)?;
      let mut by_id: HashMap<&str, &Record> = HashMap::with_capacity(related.len());
      for record in &related {
        by_id.entry(record.id.as_str()).or_insert(record);
      }

      for record in records.iter_mut() {
        let Some(value) = record.fields.get(field) else {
          continue;
        };
        if value.is_blank() {
          continue;
        }

        let ids = value.as_ids().ok_or_else(|| {
          Error::field(
            &self.name,
            field,
            format!("expected a list of record ids, found {}", value.kind()),
          )
        })?;

        let linked: Vec<Option<Record>> = ids
          .into_iter()
          .map(|id| {
            let target = by_id.get(id).map(|target| (*target).clone());
            if target.is_none() {
              warn!(
                table = %self.name,
                field,
                related_table,
                id,
                "linked record not found"
              );
            }
            target
          })
          .collect();

        record
          .fields
          .insert(field.to_string(), FieldValue::Records(linked));
      }

      debug!(table = %self.name, field, related_table, "links resolved");
    }

    Ok(())
  }
}
