//! Serde-deserializable types matching Airtable API responses.

use serde::Deserialize;

use super::types::Record;

/// One page of `GET /v0/{base}/{table}`.
#[derive(Debug, Deserialize)]
pub struct ApiListResponse {
  #[serde(default)]
  pub records: Vec<Record>,
  /// Cursor for the next page; absent on the last page
  pub offset: Option<String>,
}

/// Error body. Airtable sends either `{"error": "NOT_FOUND"}` or
/// `{"error": {"type": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
  pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiErrorBody {
  Code(String),
  Detailed {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<String>,
  },
}

impl ApiErrorBody {
  pub fn into_message(self) -> String {
    match self {
      ApiErrorBody::Code(code) => code,
      ApiErrorBody::Detailed {
        kind,
        message: Some(message),
      } => format!("{}: {}", kind, message),
      ApiErrorBody::Detailed {
        kind,
        message: None,
      } => kind,
    }
  }
}
