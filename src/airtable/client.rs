use tracing::debug;
use url::Url;

use crate::airtable::api_types::{ApiErrorResponse, ApiListResponse};
use crate::airtable::types::{ApiKey, FetchOptions, Record};
use crate::cache::RecordProvider;

/// Public Airtable REST endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.airtable.com/v0/";

/// Errors from the Airtable HTTP client.
#[derive(Debug, thiserror::Error)]
pub enum AirtableError {
  #[error("invalid API endpoint '{0}'")]
  InvalidEndpoint(String),

  #[error("request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("Airtable API returned {status}: {message}")]
  Api { status: u16, message: String },

  #[error("failed to decode response: {0}")]
  Decode(#[from] serde_json::Error),
}

/// Airtable API client wrapper
#[derive(Clone)]
pub struct AirtableClient {
  http: reqwest::Client,
  endpoint: Url,
}

impl AirtableClient {
  pub fn new() -> Result<Self, AirtableError> {
    Self::with_endpoint(DEFAULT_ENDPOINT)
  }

  /// Create a client against a custom endpoint (proxies, test servers).
  pub fn with_endpoint(endpoint: &str) -> Result<Self, AirtableError> {
    let parsed =
      Url::parse(endpoint).map_err(|_| AirtableError::InvalidEndpoint(endpoint.to_string()))?;
    if parsed.cannot_be_a_base() {
      return Err(AirtableError::InvalidEndpoint(endpoint.to_string()));
    }

    let http = reqwest::Client::builder()
      .user_agent(concat!("airtable-cache/", env!("CARGO_PKG_VERSION")))
      .build()?;

    Ok(Self {
      http,
      endpoint: parsed,
    })
  }

  /// Build the URL for one page of a table listing.
  fn page_url(
    &self,
    base_id: &str,
    table_name: &str,
    options: &FetchOptions,
    offset: Option<&str>,
  ) -> Result<Url, AirtableError> {
    let mut url = self.endpoint.clone();
    url
      .path_segments_mut()
      .map_err(|_| AirtableError::InvalidEndpoint(self.endpoint.to_string()))?
      .pop_if_empty()
      .push(base_id)
      .push(table_name);

    let mut pairs: Vec<(String, String)> = Vec::new();
    for field in &options.fields {
      pairs.push(("fields[]".to_string(), field.clone()));
    }
    if let Some(view) = &options.view {
      pairs.push(("view".to_string(), view.clone()));
    }
    if let Some(formula) = &options.formula {
      pairs.push(("filterByFormula".to_string(), formula.clone()));
    }
    if let Some(max_records) = options.max_records {
      pairs.push(("maxRecords".to_string(), max_records.to_string()));
    }
    if let Some(page_size) = options.page_size {
      pairs.push(("pageSize".to_string(), page_size.to_string()));
    }
    for (i, sort) in options.sort.iter().enumerate() {
      pairs.push((format!("sort[{}][field]", i), sort.field.clone()));
      pairs.push((
        format!("sort[{}][direction]", i),
        sort.direction.as_str().to_string(),
      ));
    }
    if let Some(offset) = offset {
      pairs.push(("offset".to_string(), offset.to_string()));
    }

    if !pairs.is_empty() {
      url.query_pairs_mut().extend_pairs(pairs);
    }

    Ok(url)
  }
}

impl RecordProvider for AirtableClient {
  type Error = AirtableError;

  /// Fetch every record of a table, following the `offset` cursor across pages.
  async fn fetch_all(
    &self,
    base_id: &str,
    table_name: &str,
    api_key: &ApiKey,
    options: &FetchOptions,
  ) -> Result<Vec<Record>, AirtableError> {
    let mut records = Vec::new();
    let mut offset: Option<String> = None;

    loop {
      let url = self.page_url(base_id, table_name, options, offset.as_deref())?;

      let response = self
        .http
        .get(url)
        .bearer_auth(api_key.expose())
        .send()
        .await?;

      let status = response.status();
      let body = response.text().await?;

      if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
          .map(|e| e.error.into_message())
          .unwrap_or(body);
        return Err(AirtableError::Api {
          status: status.as_u16(),
          message,
        });
      }

      let page: ApiListResponse = serde_json::from_str(&body)?;
      debug!(
        table = table_name,
        page_records = page.records.len(),
        "fetched page"
      );
      records.extend(page.records);

      // Check if we've fetched all pages
      match page.offset {
        Some(next) => offset = Some(next),
        None => break,
      }
    }

    Ok(records)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::airtable::types::{SortDirection, SortSpec};

  fn pairs(url: &Url) -> Vec<(String, String)> {
    url
      .query_pairs()
      .map(|(k, v)| (k.into_owned(), v.into_owned()))
      .collect()
  }

  #[test]
  fn test_page_url_encodes_table_name() {
    let client = AirtableClient::new().unwrap();
    let url = client
      .page_url("appBase", "Table 1", &FetchOptions::default(), None)
      .unwrap();

    assert_eq!(url.as_str(), "https://api.airtable.com/v0/appBase/Table%201");
  }

  #[test]
  fn test_page_url_forwards_options() {
    let client = AirtableClient::new().unwrap();
    let options = FetchOptions {
      fields: vec!["Name".to_string(), "Link".to_string()],
      view: Some("Grid view".to_string()),
      formula: Some("{Done} = 0".to_string()),
      max_records: Some(10),
      page_size: None,
      sort: vec![SortSpec {
        field: "Name".to_string(),
        direction: SortDirection::Desc,
      }],
    };

    let url = client
      .page_url("appBase", "Tasks", &options, Some("itr123"))
      .unwrap();

    assert_eq!(
      pairs(&url),
      vec![
        ("fields[]".to_string(), "Name".to_string()),
        ("fields[]".to_string(), "Link".to_string()),
        ("view".to_string(), "Grid view".to_string()),
        ("filterByFormula".to_string(), "{Done} = 0".to_string()),
        ("maxRecords".to_string(), "10".to_string()),
        ("sort[0][field]".to_string(), "Name".to_string()),
        ("sort[0][direction]".to_string(), "desc".to_string()),
        ("offset".to_string(), "itr123".to_string()),
      ]
    );
  }

  #[test]
  fn test_custom_endpoint_without_trailing_slash() {
    let client = AirtableClient::with_endpoint("http://localhost:8080/v0").unwrap();
    let url = client
      .page_url("appBase", "Tasks", &FetchOptions::default(), None)
      .unwrap();

    assert_eq!(url.as_str(), "http://localhost:8080/v0/appBase/Tasks");
  }

  #[test]
  fn test_rejects_invalid_endpoint() {
    assert!(matches!(
      AirtableClient::with_endpoint("not a url"),
      Err(AirtableError::InvalidEndpoint(_))
    ));
    assert!(matches!(
      AirtableClient::with_endpoint("mailto:someone@example.com"),
      Err(AirtableError::InvalidEndpoint(_))
    ));
  }
}
