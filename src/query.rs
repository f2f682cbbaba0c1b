//! Query results over a table snapshot.
//!
//! A [`Query`] owns the records it was built from. Every operation consumes
//! the query and hands back the narrowed or reordered result, so one result
//! can never be changed behind the back of another call site.
//!
//! # Example
//!
//! ```ignore
//! let latest_open = table
//!     .query(&[("People", "Owner")])?
//!     .filter_by([("Status", "Open")])
//!     .order_by("Created", true)?
//!     .first()
//!     .cloned();
//! ```

use crate::airtable::{FieldValue, Record};
use crate::error::{Error, Result};

/// Sort key for records that lack the field.
static NULL: FieldValue = FieldValue::Null;

/// The current result of a chained query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
  table: String,
  records: Vec<Record>,
}

impl Query {
  pub(crate) fn new(table: impl Into<String>, records: Vec<Record>) -> Self {
    Self {
      table: table.into(),
      records,
    }
  }

  /// Table the records came from.
  pub fn table(&self) -> &str {
    &self.table
  }

  /// Keep records whose fields equal every given value.
  ///
  /// Pairs are applied in iteration order, each narrowing the previous
  /// result. A record without the field never matches.
  pub fn filter_by<I, K, V>(mut self, pairs: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<FieldValue>,
  {
    for (field, value) in pairs {
      let field = field.as_ref();
      let value = value.into();
      self.records.retain(|record| record.field(field) == Some(&value));
    }
    self
  }

  /// Stable sort on `field`, ascending. Missing fields sort as null.
  ///
  /// With `descending` the ascending order is reversed afterwards, so equal
  /// keys end up in reverse of their original order. Fails without reordering
  /// anything if two present values cannot be compared.
  pub fn order_by(mut self, field: &str, descending: bool) -> Result<Self> {
    // Sorted neighbours cover every kind boundary, so one incomparable pair
    // anywhere shows up between two adjacent keys.
    let incomparable = {
      let mut sorted: Vec<&Record> = self.records.iter().collect();
      sorted.sort_by(|a, b| sort_key(a, field).total_cmp(sort_key(b, field)));
      sorted
        .windows(2)
        .map(|pair| (sort_key(pair[0], field), sort_key(pair[1], field)))
        .find(|(x, y)| x.try_cmp(y).is_none())
        .map(|(x, y)| (x.kind(), y.kind()))
    };
    if let Some((x, y)) = incomparable {
      return Err(Error::field(
        &self.table,
        field,
        format!("cannot order {} values against {} values", x, y),
      ));
    }

    self.records.sort_by(|a, b| sort_key(a, field).total_cmp(sort_key(b, field)));
    if descending {
      self.records.reverse();
    }
    Ok(self)
  }

  /// All records, or `None` when the result is empty.
  pub fn all(&self) -> Option<&[Record]> {
    if self.records.is_empty() {
      None
    } else {
      Some(&self.records)
    }
  }

  pub fn first(&self) -> Option<&Record> {
    self.records.first()
  }

  pub fn last(&self) -> Option<&Record> {
    self.records.last()
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn into_records(self) -> Vec<Record> {
    self.records
  }
}

fn sort_key<'a>(record: &'a Record, field: &str) -> &'a FieldValue {
  record.field(field).unwrap_or(&NULL)
}
