//! Local snapshots of Airtable tables and an offline query engine over them.
//!
//! [`Base`] fetches whole tables through a [`RecordProvider`] and stores each
//! one as `<root>/<base_id>/<table>.json`. [`Table`] reads a snapshot back and
//! answers lookups by id and chained [`Query`] operations (filter, order, link
//! resolution) without touching the network.
//!
//! ```ignore
//! let config = SnapshotConfig::default().with_root("/var/cache/atcache");
//! let base = Base::open("appXXXX", ApiKey::new(key), AirtableClient::new()?, &config)?;
//! base.cache_table("Tasks", &FetchOptions::default()).await?;
//!
//! let open = base
//!   .table("Tasks")
//!   .query(&[("People", "Owner")])?
//!   .filter_by([("Status", "Open")])
//!   .order_by("Due", false)?;
//! ```

pub mod airtable;
pub mod cache;
pub mod error;
pub mod query;
pub mod table;

#[cfg(test)]
mod test_support;

pub use airtable::{
  AirtableClient, AirtableError, ApiKey, FetchOptions, FieldValue, Record, DEFAULT_ENDPOINT,
};
pub use cache::{Base, RecordProvider, RetryPolicy, SnapshotConfig, SnapshotInfo, SnapshotStore};
pub use error::{Error, Result};
pub use query::Query;
pub use table::Table;
