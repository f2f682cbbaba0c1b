//! Airtable record model and the HTTP provider that fetches whole tables.

pub mod api_types;
pub mod client;
pub mod types;
pub mod value;

pub use client::{AirtableClient, AirtableError, DEFAULT_ENDPOINT};
pub use types::{ApiKey, FetchOptions, Record, SortDirection, SortSpec};
pub use value::FieldValue;
