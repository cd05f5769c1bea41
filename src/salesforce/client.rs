//! Salesforce HTTP client with secure credential handling and safe logging.

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use tracing::info;
use url::Url;

use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// User agent string for all Salesforce API requests.
const CLIENT_USER_AGENT: &str = "sfexport/0.1.0";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// An authenticated Salesforce session.
///
/// Created once by [`crate::salesforce::auth::login`] and read-only for the
/// rest of the run. The session id is wrapped in `SecretString` to prevent
/// accidental exposure through `Debug` or logging.
#[derive(Clone)]
pub struct Session {
    /// Instance base URL (e.g., "https://na139.salesforce.com").
    pub instance_url: String,
    /// Session id used as the bearer token (wrapped for security).
    pub session_id: SecretString,
}

impl Session {
    /// Creates a session from an instance URL and session id.
    pub fn new(instance_url: String, session_id: SecretString) -> Self {
        Self {
            instance_url,
            session_id,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("instance_url", &self.instance_url)
            .field("session_id", &"[REDACTED]")
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// URL Sanitization
// ─────────────────────────────────────────────────────────────────────────────

/// Sanitizes a URL for safe logging.
///
/// Keeps only the path component; scheme, host, query, and fragment are
/// stripped so log lines never carry tokens or filter criteria.
pub fn sanitize_url_for_logs(url: &Url) -> String {
    url.path().to_string()
}

// ─────────────────────────────────────────────────────────────────────────────
// SalesforceClient
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP client for authenticated Salesforce API interactions.
///
/// Wraps a `reqwest::Client` together with the run's [`Session`]. The session
/// is immutable after construction; every request reads it to build the
/// instance URL and the bearer token.
pub struct SalesforceClient {
    /// The underlying HTTP client.
    http: reqwest::Client,
    /// The authenticated session.
    session: Session,
}

impl SalesforceClient {
    /// Creates a new Salesforce client for the given session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client fails to initialize.
    pub fn new(session: Session) -> Result<Self, AppError> {
        let http = build_http_client()?;
        Ok(Self::with_http(http, session))
    }

    /// Creates a client reusing an already-built HTTP client.
    ///
    /// Used by the pipeline so the connection pool from the login request is
    /// carried into the data requests.
    pub fn with_http(http: reqwest::Client, session: Session) -> Self {
        Self { http, session }
    }

    /// Returns the session this client authenticates with.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Builds a full URL by joining the path with the instance URL.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the instance URL or the joined path
    /// cannot be parsed.
    pub fn build_url(&self, path: &str) -> Result<Url, AppError> {
        let base = Url::parse(&self.session.instance_url)
            .map_err(|_| AppError::Internal("Invalid instance URL".to_string()))?;

        base.join(path)
            .map_err(|_| AppError::Internal(format!("Invalid path: {}", path)))
    }

    /// Executes an authenticated GET against an instance-relative path.
    ///
    /// Returns the raw response; callers decide how to treat non-2xx
    /// statuses.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConnectionFailed` for request-level failures.
    ///
    /// # Security
    ///
    /// - Never logs the Authorization header
    /// - Sanitizes URLs before logging
    /// - Error messages never contain raw URLs or tokens
    pub async fn get_authed(&self, path: &str) -> Result<reqwest::Response, AppError> {
        let url = self.build_url(path)?;
        let start = Instant::now();
        let sanitized_url = sanitize_url_for_logs(&url);

        let request = self
            .http
            .get(url.as_str())
            .bearer_auth(self.session.session_id.expose_secret());

        let result = request.send().await;
        let duration_ms = start.elapsed().as_millis();

        match result {
            Ok(response) => {
                info!(
                    "[SFDC] GET {} {} {}ms",
                    sanitized_url,
                    response.status().as_u16(),
                    duration_ms
                );
                Ok(response)
            }
            Err(_) => {
                // The raw reqwest error may contain the full URL; log and
                // report a sanitized message instead.
                info!("[SFDC] GET {} FAILED {}ms", sanitized_url, duration_ms);
                Err(AppError::ConnectionFailed(
                    "Connection to Salesforce failed".to_string(),
                ))
            }
        }
    }
}

/// Builds the configured HTTP client.
pub fn build_http_client() -> Result<reqwest::Client, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session(instance_url: &str) -> Session {
        Session::new(
            instance_url.to_string(),
            SecretString::from("super_secret_session_12345".to_string()),
        )
    }

    #[test]
    fn sanitize_strips_scheme_host_and_query() {
        let url = Url::parse(
            "https://na139.salesforce.com/services/data/v56.0/query?q=SELECT+Id+FROM+DatasetExport",
        )
        .unwrap();

        let result = sanitize_url_for_logs(&url);

        assert_eq!(result, "/services/data/v56.0/query");
        assert!(!result.contains("https"));
        assert!(!result.contains("na139.salesforce.com"));
        assert!(!result.contains("DatasetExport"));
    }

    #[test]
    fn sanitize_handles_deep_paths() {
        let url = Url::parse(
            "https://na139.salesforce.com/services/data/v56.0/sobjects/DatasetExportPart/0Pcxx/DataFile",
        )
        .unwrap();

        assert_eq!(
            sanitize_url_for_logs(&url),
            "/services/data/v56.0/sobjects/DatasetExportPart/0Pcxx/DataFile"
        );
    }

    #[test]
    fn session_debug_redacts_session_id() {
        let session = test_session("https://na139.salesforce.com");

        let debug_output = format!("{:?}", session);

        assert!(debug_output.contains("na139.salesforce.com"));
        assert!(!debug_output.contains("super_secret_session_12345"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[test]
    fn client_new_succeeds_with_valid_session() {
        let result = SalesforceClient::new(test_session("https://na139.salesforce.com"));

        assert!(result.is_ok());
    }

    #[test]
    fn build_url_constructs_correct_url() {
        let client = SalesforceClient::new(test_session("https://na139.salesforce.com")).unwrap();

        let url = client.build_url("/services/data/v56.0/query").unwrap();

        assert_eq!(
            url.as_str(),
            "https://na139.salesforce.com/services/data/v56.0/query"
        );
    }

    #[test]
    fn build_url_rejects_invalid_instance_url() {
        let client = SalesforceClient::new(test_session("not a url")).unwrap();

        let result = client.build_url("/services/data/v56.0/query");

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn build_http_client_succeeds() {
        assert!(build_http_client().is_ok());
    }
}
