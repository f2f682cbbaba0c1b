use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::value::FieldValue;

/// One row of a table, as returned by the API and stored in snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub id: String,
  #[serde(default)]
  pub fields: BTreeMap<String, FieldValue>,
  #[serde(
    rename = "createdTime",
    default,
    skip_serializing_if = "Option::is_none"
  )]
  pub created_time: Option<String>,
}

impl Record {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      fields: BTreeMap::new(),
      created_time: None,
    }
  }

  pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
    self.fields.insert(name.into(), value.into());
    self
  }

  pub fn field(&self, name: &str) -> Option<&FieldValue> {
    self.fields.get(name)
  }
}

/// API credential. Never printed.
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
  pub fn new(key: impl Into<String>) -> Self {
    Self(key.into())
  }

  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for ApiKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("ApiKey(***)")
  }
}

/// Provider-specific options for fetching a table.
///
/// The cache store forwards these untouched; only the provider interprets them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FetchOptions {
  /// Only return these fields (all fields when empty)
  #[serde(default)]
  pub fields: Vec<String>,
  /// Name or id of a view to read records from
  pub view: Option<String>,
  /// Formula records must satisfy (`filterByFormula`)
  pub formula: Option<String>,
  pub max_records: Option<u64>,
  pub page_size: Option<u64>,
  #[serde(default)]
  pub sort: Vec<SortSpec>,
}

/// Server-side sort applied while fetching.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SortSpec {
  pub field: String,
  #[serde(default)]
  pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  #[default]
  Asc,
  Desc,
}

impl SortDirection {
  pub fn as_str(&self) -> &'static str {
    match self {
      SortDirection::Asc => "asc",
      SortDirection::Desc => "desc",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_record_keeps_created_time() {
    let raw = json!({
      "id": "rec1",
      "createdTime": "2024-01-01T00:00:00.000Z",
      "fields": {"Name": "One"}
    });

    let record: Record = serde_json::from_value(raw.clone()).unwrap();
    assert_eq!(record.created_time.as_deref(), Some("2024-01-01T00:00:00.000Z"));
    assert_eq!(serde_json::to_value(&record).unwrap(), raw);
  }

  #[test]
  fn test_record_without_fields() {
    let record: Record = serde_json::from_value(json!({"id": "rec1"})).unwrap();
    assert!(record.fields.is_empty());
    assert_eq!(
      serde_json::to_value(&record).unwrap(),
      json!({"id": "rec1", "fields": {}})
    );
  }

  #[test]
  fn test_api_key_is_redacted() {
    let key = ApiKey::new("keySECRET");
    assert_eq!(format!("{:?}", key), "ApiKey(***)");
    assert_eq!(key.expose(), "keySECRET");
  }

  #[test]
  fn test_fetch_options_from_yaml() {
    let options: FetchOptions = serde_yaml::from_str(
      "view: Grid view\nfields: [Name, Link]\nsort:\n  - field: Name\n    direction: desc\n",
    )
    .unwrap();

    assert_eq!(options.view.as_deref(), Some("Grid view"));
    assert_eq!(options.fields, vec!["Name", "Link"]);
    assert_eq!(options.sort[0].direction, SortDirection::Desc);
    assert_eq!(options.formula, None);
  }
}
