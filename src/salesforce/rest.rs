//! Salesforce REST API client for SOQL query execution with pagination.
//!
//! Provides a high-level client for executing SOQL queries against the
//! Salesforce REST API:
//!
//! - **Automatic pagination** - Fetches all records across multiple pages
//! - **Safe literals** - Dynamic values are embedded as escaped SOQL string
//!   literals, never raw interpolation
//! - **Salesforce error mapping** - Parses Salesforce API errors into `AppError`

use serde::Deserialize;
use tracing::info;
use url::Url;

use crate::error::AppError;
use crate::salesforce::client::SalesforceClient;
use crate::salesforce::API_VERSION;

// ─────────────────────────────────────────────────────────────────────────────
// Internal Wire Types (match Salesforce JSON exactly)
// ─────────────────────────────────────────────────────────────────────────────

/// Internal struct that mirrors the Salesforce query response JSON exactly.
/// Uses camelCase field names to match the API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireQueryResponse {
    /// Total number of records that match the query (not just this page).
    total_size: u64,
    /// Whether this is the last page of results.
    done: bool,
    /// URL to fetch the next page of results (relative to instance URL).
    /// Only present if `done` is false.
    next_records_url: Option<String>,
    /// The actual records returned in this page.
    records: Vec<serde_json::Value>,
}

/// Salesforce API error response format.
/// Salesforce returns errors as an array of error objects.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSalesforceError {
    message: String,
    error_code: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Public Types
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a SOQL query execution.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// The records returned by the query.
    pub records: Vec<serde_json::Value>,
    /// Total number of records that match the query in Salesforce.
    pub total_size: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// SOQL Literals
// ─────────────────────────────────────────────────────────────────────────────

/// Renders a value as a quoted SOQL string literal.
///
/// Backslashes and single quotes are escaped so a dynamic identifier can be
/// embedded in a query without altering its structure.
pub fn soql_string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('\'');
    for c in value.chars() {
        match c {
            '\\' => literal.push_str("\\\\"),
            '\'' => literal.push_str("\\'"),
            _ => literal.push(c),
        }
    }
    literal.push('\'');
    literal
}

// ─────────────────────────────────────────────────────────────────────────────
// RestQueryClient
// ─────────────────────────────────────────────────────────────────────────────

/// Client for executing SOQL queries against the Salesforce REST API.
///
/// Wraps a [`SalesforceClient`] to provide query execution with automatic
/// pagination and error handling.
pub struct RestQueryClient<'a> {
    /// The underlying Salesforce HTTP client.
    client: &'a SalesforceClient,
}

impl<'a> RestQueryClient<'a> {
    /// Creates a new REST query client wrapping the given Salesforce client.
    pub fn new(client: &'a SalesforceClient) -> Self {
        Self { client }
    }

    /// Executes a SOQL query and returns all matching records.
    ///
    /// Automatically handles pagination to fetch all records across multiple
    /// API calls if the result set is large.
    ///
    /// # Errors
    ///
    /// - `AppError::Salesforce` - Query syntax error or API error
    /// - `AppError::ConnectionFailed` - Network error
    pub async fn query(&self, soql: &str) -> Result<QueryResult, AppError> {
        // Build initial query URL with properly encoded SOQL
        let base_path = format!("/services/data/{}/query", API_VERSION);
        let mut initial_url = self.client.build_url(&base_path)?;
        initial_url.query_pairs_mut().append_pair("q", soql);

        // Accumulate records across pages
        let mut all_records: Vec<serde_json::Value> = Vec::new();
        let mut total_size: u64 = 0;
        let mut next_url: Option<Url> = Some(initial_url);
        let mut page_count: u32 = 0;

        // Iterative pagination loop
        while let Some(url) = next_url.take() {
            page_count += 1;

            let response = self.execute_query_request(&url).await?;

            let wire_response: WireQueryResponse = response.json().await.map_err(|e| {
                AppError::Internal(format!("Failed to parse query response: {}", e))
            })?;

            if page_count == 1 {
                total_size = wire_response.total_size;
            }

            all_records.extend(wire_response.records);

            if wire_response.done {
                break;
            }

            // The nextRecordsUrl is relative to the instance URL
            if let Some(next_records_url) = wire_response.next_records_url {
                next_url = Some(self.client.build_url(&next_records_url)?);
            }
        }

        info!(
            "[REST] Query complete: {} records fetched, {} pages",
            all_records.len(),
            page_count
        );

        Ok(QueryResult {
            records: all_records,
            total_size,
        })
    }

    /// Executes a query request and handles error responses.
    async fn execute_query_request(&self, url: &Url) -> Result<reqwest::Response, AppError> {
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        let response = self.client.get_authed(&path).await?;

        let status = response.status();
        if !status.is_success() {
            return handle_error_response(response, status).await;
        }

        Ok(response)
    }
}

/// Parses error response body and maps to appropriate AppError.
async fn handle_error_response(
    response: reqwest::Response,
    status: reqwest::StatusCode,
) -> Result<reqwest::Response, AppError> {
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("Unable to read error body"));

    // Attempt to parse as Salesforce error array
    if let Ok(errors) = serde_json::from_str::<Vec<WireSalesforceError>>(&body) {
        if let Some(first_error) = errors.first() {
            return Err(AppError::Salesforce(format!(
                "[{}] {}",
                first_error.error_code, first_error.message
            )));
        }
    }

    // Fallback to generic error with status code
    Err(AppError::Salesforce(format!(
        "HTTP {} - {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown error")
    )))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
