//! Core traits for the caching system.

use std::future::Future;

use crate::airtable::{ApiKey, FetchOptions, Record};

/// Source of table contents for the cache store.
///
/// Implementors fetch *every* record of a table in one call; the cache store
/// never asks for partial or incremental data.
pub trait RecordProvider: Send + Sync {
  /// Provider failure, surfaced to callers as the source of `Error::Provider`.
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch all records of `table_name` in `base_id`.
  ///
  /// `options` are provider-specific (field selection, view, formula) and are
  /// passed through untouched.
  fn fetch_all(
    &self,
    base_id: &str,
    table_name: &str,
    api_key: &ApiKey,
    options: &FetchOptions,
  ) -> impl Future<Output = Result<Vec<Record>, Self::Error>> + Send;
}
