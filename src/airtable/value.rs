//! Field values and the rules for comparing them.
//!
//! Snapshot JSON is converted into [`FieldValue`] on load so that filtering
//! and ordering work on an explicit variant type instead of raw JSON.
//!
//! Equality:
//! - numbers compare numerically and exactly (`1 == 1.0`, but
//!   `9007199254740993 != 9007199254740992.0`)
//! - text, booleans and null compare by value
//! - lists, objects and resolved records compare structurally
//! - values of different kinds are never equal
//!
//! Ordering (used by `order_by`):
//! - `Null` sorts before everything else and ties with `Null`
//! - numbers numerically, text lexicographically, `false < true`
//! - lists element by element, then by length
//! - every other pairing is incomparable

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use super::types::Record;

/// The value of a single record field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldValue {
  #[default]
  Null,
  Bool(bool),
  Number(Number),
  Text(String),
  /// Multiple selects, link ids, lookups
  List(Vec<FieldValue>),
  /// Attachments, collaborators and other structured values
  Object(BTreeMap<String, FieldValue>),
  /// Linked records after resolution, one slot per link id. A slot is `None`
  /// when the id is missing from the related table. Never read from a snapshot.
  Records(Vec<Option<Record>>),
}

impl FieldValue {
  /// Short name of the variant, for error messages.
  pub fn kind(&self) -> &'static str {
    match self {
      FieldValue::Null => "null",
      FieldValue::Bool(_) => "bool",
      FieldValue::Number(_) => "number",
      FieldValue::Text(_) => "text",
      FieldValue::List(_) => "list",
      FieldValue::Object(_) => "object",
      FieldValue::Records(_) => "records",
    }
  }

  /// True for values that carry nothing: null, `false`, zero, and empty
  /// text, lists, objects and record lists.
  pub fn is_blank(&self) -> bool {
    match self {
      FieldValue::Null => true,
      FieldValue::Bool(b) => !b,
      FieldValue::Number(n) => n.as_f64() == Some(0.0),
      FieldValue::Text(s) => s.is_empty(),
      FieldValue::List(items) => items.is_empty(),
      FieldValue::Object(map) => map.is_empty(),
      FieldValue::Records(records) => records.is_empty(),
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      FieldValue::Text(s) => Some(s),
      _ => None,
    }
  }

  /// Record ids held by a link field, if this is a list of text values.
  pub fn as_ids(&self) -> Option<Vec<&str>> {
    match self {
      FieldValue::List(items) => items.iter().map(FieldValue::as_str).collect(),
      _ => None,
    }
  }

  pub fn as_records(&self) -> Option<&[Option<Record>]> {
    match self {
      FieldValue::Records(records) => Some(records),
      _ => None,
    }
  }

  /// Order two values, or `None` if they are not comparable.
  pub fn try_cmp(&self, other: &FieldValue) -> Option<Ordering> {
    match (self, other) {
      (FieldValue::Null, FieldValue::Null) => Some(Ordering::Equal),
      (FieldValue::Null, _) => Some(Ordering::Less),
      (_, FieldValue::Null) => Some(Ordering::Greater),
      (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
      (FieldValue::Number(a), FieldValue::Number(b)) => Some(compare_numbers(a, b)),
      (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
      (FieldValue::List(a), FieldValue::List(b)) => {
        for (x, y) in a.iter().zip(b) {
          match x.try_cmp(y)? {
            Ordering::Equal => continue,
            unequal => return Some(unequal),
          }
        }
        Some(a.len().cmp(&b.len()))
      }
      _ => None,
    }
  }

  /// Total order over every value: by kind first (null, bool, number, text,
  /// list, object, records), then as [`FieldValue::try_cmp`] within a kind.
  /// Objects and record lists tie with their own kind.
  ///
  /// Agrees with `try_cmp` wherever that is defined, so sorting by it and then
  /// checking neighbours with `try_cmp` finds any incomparable pair.
  pub fn total_cmp(&self, other: &FieldValue) -> Ordering {
    match (self, other) {
      (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
      (FieldValue::Number(a), FieldValue::Number(b)) => compare_numbers(a, b),
      (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
      (FieldValue::List(a), FieldValue::List(b)) => a
        .iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len())),
      _ => self.rank().cmp(&other.rank()),
    }
  }

  fn rank(&self) -> u8 {
    match self {
      FieldValue::Null => 0,
      FieldValue::Bool(_) => 1,
      FieldValue::Number(_) => 2,
      FieldValue::Text(_) => 3,
      FieldValue::List(_) => 4,
      FieldValue::Object(_) => 5,
      FieldValue::Records(_) => 6,
    }
  }
}

/// Integer view of a number, if it was written without a fraction or exponent.
fn as_integer(n: &Number) -> Option<i128> {
  n.as_i64()
    .map(i128::from)
    .or_else(|| n.as_u64().map(i128::from))
}

fn compare_numbers(a: &Number, b: &Number) -> Ordering {
  match (as_integer(a), as_integer(b)) {
    (Some(x), Some(y)) => x.cmp(&y),
    (Some(x), None) => compare_integer_float(x, b.as_f64().unwrap_or(0.0)),
    (None, Some(y)) => compare_integer_float(y, a.as_f64().unwrap_or(0.0)).reverse(),
    (None, None) => {
      let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
      x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
  }
}

/// Exact comparison of an integer against a finite float.
fn compare_integer_float(int: i128, float: f64) -> Ordering {
  // Integers here fit in [-2^63, 2^64)
  if float >= 18_446_744_073_709_551_616.0 {
    return Ordering::Less;
  }
  if float < -9_223_372_036_854_775_808.0 {
    return Ordering::Greater;
  }

  let floor = float.floor();
  match int.cmp(&(floor as i128)) {
    Ordering::Equal if float > floor => Ordering::Less,
    ordering => ordering,
  }
}

impl PartialEq for FieldValue {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (FieldValue::Null, FieldValue::Null) => true,
      (FieldValue::Bool(a), FieldValue::Bool(b)) => a == b,
      (FieldValue::Number(a), FieldValue::Number(b)) => compare_numbers(a, b).is_eq(),
      (FieldValue::Text(a), FieldValue::Text(b)) => a == b,
      (FieldValue::List(a), FieldValue::List(b)) => a == b,
      (FieldValue::Object(a), FieldValue::Object(b)) => a == b,
      (FieldValue::Records(a), FieldValue::Records(b)) => a == b,
      _ => false,
    }
  }
}

impl From<Value> for FieldValue {
  fn from(value: Value) -> Self {
    match value {
      Value::Null => FieldValue::Null,
      Value::Bool(b) => FieldValue::Bool(b),
      Value::Number(n) => FieldValue::Number(n),
      Value::String(s) => FieldValue::Text(s),
      Value::Array(items) => FieldValue::List(items.into_iter().map(FieldValue::from).collect()),
      Value::Object(map) => FieldValue::Object(
        map
          .into_iter()
          .map(|(k, v)| (k, FieldValue::from(v)))
          .collect(),
      ),
    }
  }
}

impl From<FieldValue> for Value {
  fn from(value: FieldValue) -> Self {
    match value {
      FieldValue::Null => Value::Null,
      FieldValue::Bool(b) => Value::Bool(b),
      FieldValue::Number(n) => Value::Number(n),
      FieldValue::Text(s) => Value::String(s),
      FieldValue::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
      FieldValue::Object(map) => {
        Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
      }
      FieldValue::Records(records) => Value::Array(
        records
          .into_iter()
          .map(|record| record.map_or(Value::Null, Value::from))
          .collect(),
      ),
    }
  }
}

impl From<Record> for Value {
  fn from(record: Record) -> Self {
    let fields: Map<String, Value> = record
      .fields
      .into_iter()
      .map(|(k, v)| (k, Value::from(v)))
      .collect();

    let mut object = Map::new();
    object.insert("id".to_string(), Value::String(record.id));
    object.insert("fields".to_string(), Value::Object(fields));
    if let Some(created_time) = record.created_time {
      object.insert("createdTime".to_string(), Value::String(created_time));
    }
    Value::Object(object)
  }
}

impl From<&str> for FieldValue {
  fn from(s: &str) -> Self {
    FieldValue::Text(s.to_string())
  }
}

impl From<String> for FieldValue {
  fn from(s: String) -> Self {
    FieldValue::Text(s)
  }
}

impl From<bool> for FieldValue {
  fn from(b: bool) -> Self {
    FieldValue::Bool(b)
  }
}

impl From<i64> for FieldValue {
  fn from(n: i64) -> Self {
    FieldValue::Number(n.into())
  }
}

impl From<i32> for FieldValue {
  fn from(n: i32) -> Self {
    FieldValue::Number(n.into())
  }
}

impl From<u64> for FieldValue {
  fn from(n: u64) -> Self {
    FieldValue::Number(n.into())
  }
}

impl From<f64> for FieldValue {
  /// Non-finite floats have no JSON form and become `Null`.
  fn from(n: f64) -> Self {
    Number::from_f64(n)
      .map(FieldValue::Number)
      .unwrap_or(FieldValue::Null)
  }
}

impl From<Vec<FieldValue>> for FieldValue {
  fn from(items: Vec<FieldValue>) -> Self {
    FieldValue::List(items)
  }
}

impl From<Vec<&str>> for FieldValue {
  fn from(items: Vec<&str>) -> Self {
    FieldValue::List(items.into_iter().map(FieldValue::from).collect())
  }
}

impl From<Vec<Record>> for FieldValue {
  fn from(records: Vec<Record>) -> Self {
    FieldValue::Records(records.into_iter().map(Some).collect())
  }
}

impl From<Vec<Option<Record>>> for FieldValue {
  fn from(records: Vec<Option<Record>>) -> Self {
    FieldValue::Records(records)
  }
}
