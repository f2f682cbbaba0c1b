//! Snapshot cache for Airtable bases.
//!
//! This module provides the write side of the system:
//! - Fetches whole tables through a [`RecordProvider`]
//! - Persists each table as `<root>/<base_id>/<table>.json`
//! - Publishes snapshots atomically (temp file + rename)
//! - Clears every snapshot of a base at once

mod layer;
mod storage;
mod traits;

pub use layer::Base;
pub use storage::{RetryPolicy, SnapshotConfig, SnapshotInfo, SnapshotStore};
pub use traits::RecordProvider;
