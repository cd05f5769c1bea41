//! Username/password login against the Salesforce SOAP endpoint.
//!
//! Exchanges username, password, and security token for a [`Session`]
//! without requiring a connected app or user interaction. The security token
//! is appended to the password, as the SOAP login contract requires.

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use secrecy::{ExposeSecret, SecretString};
use tracing::{error, info};
use url::{Position, Url};

use crate::error::AppError;
use crate::salesforce::client::Session;
use crate::salesforce::API_VERSION;

// ─────────────────────────────────────────────────────────────────────────────
// Credentials
// ─────────────────────────────────────────────────────────────────────────────

/// Login credentials for the SOAP username/password flow.
///
/// Sensitive fields are wrapped in `SecretString` to prevent accidental
/// exposure through `Debug` traits or logging.
#[derive(Clone)]
pub struct Credentials {
    /// Salesforce username (e.g., "user@example.com").
    pub username: String,
    /// Account password (wrapped for security).
    pub password: SecretString,
    /// API security token issued by Salesforce (wrapped for security).
    pub security_token: SecretString,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("security_token", &"[REDACTED]")
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Login
// ─────────────────────────────────────────────────────────────────────────────

/// Authenticates against the Salesforce SOAP login endpoint.
///
/// # Arguments
///
/// * `http` - The HTTP client to use
/// * `login_url` - The Salesforce login URL (e.g., "https://login.salesforce.com")
/// * `credentials` - Username, password, and security token
///
/// # Returns
///
/// A read-only [`Session`] carrying the instance URL and session id.
///
/// # Errors
///
/// - `AppError::ConnectionFailed` - Network error during login
/// - `AppError::AuthFailed` - The platform rejected the credentials
///
/// # Security
///
/// This function never logs the password, the security token, or the
/// returned session id.
pub async fn login(
    http: &reqwest::Client,
    login_url: &str,
    credentials: &Credentials,
) -> Result<Session, AppError> {
    let endpoint = format!(
        "{}/services/Soap/u/{}/",
        login_url.trim_end_matches('/'),
        API_VERSION.trim_start_matches('v')
    );

    info!("[AUTH] Logging in to Salesforce as {}...", credentials.username);

    // SOAP login expects the security token appended to the password.
    let password = format!(
        "{}{}",
        credentials.password.expose_secret(),
        credentials.security_token.expose_secret()
    );
    let envelope = login_envelope(&credentials.username, &password);

    let response = http
        .post(&endpoint)
        .header("Content-Type", "text/xml; charset=UTF-8")
        .header("SOAPAction", "\"login\"")
        .body(envelope)
        .send()
        .await
        .map_err(|_| {
            error!("[AUTH] Login request failed");
            AppError::ConnectionFailed("Failed to connect to the Salesforce login endpoint".to_string())
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|_| AppError::AuthFailed("Unable to read login response".to_string()))?;

    let fields = parse_login_response(&body)?;

    if let Some(fault) = fields.fault {
        error!("[AUTH] Login failed: {}", fault);
        return Err(AppError::AuthFailed(fault));
    }

    match (fields.server_url, fields.session_id) {
        (Some(server_url), Some(session_id)) => {
            let instance_url = instance_from_server_url(&server_url)?;
            info!("[AUTH] Authentication successful (instance: {})", instance_url);
            Ok(Session::new(instance_url, SecretString::from(session_id)))
        }
        _ => {
            error!("[AUTH] Login failed: HTTP {}", status);
            Err(AppError::AuthFailed(format!(
                "HTTP {} - unrecognized login response",
                status.as_u16()
            )))
        }
    }
}

/// Builds the SOAP login envelope with XML-escaped credential values.
fn login_envelope(username: &str, password: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" "#,
            r#"xmlns:urn="urn:partner.soap.sforce.com">"#,
            "<soapenv:Body><urn:login>",
            "<urn:username>{}</urn:username>",
            "<urn:password>{}</urn:password>",
            "</urn:login></soapenv:Body></soapenv:Envelope>"
        ),
        escape(username),
        escape(password)
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Fields extracted from the SOAP login response.
#[derive(Debug, Default)]
struct LoginResponseFields {
    server_url: Option<String>,
    session_id: Option<String>,
    fault: Option<String>,
}

/// Extracts `serverUrl`, `sessionId`, and `faultstring` from a SOAP login
/// response body. Missing elements stay `None`; the caller triages.
fn parse_login_response(body: &str) -> Result<LoginResponseFields, AppError> {
    let mut reader = Reader::from_str(body);
    let mut fields = LoginResponseFields::default();
    let mut current: Option<Vec<u8>> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => current = Some(e.local_name().as_ref().to_vec()),
            Ok(Event::End(_)) => current = None,
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|_| AppError::AuthFailed("Unable to parse login response".to_string()))?
                    .into_owned();
                match current.as_deref() {
                    Some(b"serverUrl") => fields.server_url = Some(text),
                    Some(b"sessionId") => fields.session_id = Some(text),
                    Some(b"faultstring") => fields.fault = Some(text),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(_) => {
                return Err(AppError::AuthFailed(
                    "Unable to parse login response".to_string(),
                ))
            }
        }
    }

    Ok(fields)
}

/// Derives the instance base URL (scheme + host) from the SOAP `serverUrl`.
fn instance_from_server_url(server_url: &str) -> Result<String, AppError> {
    let url = Url::parse(server_url).map_err(|_| {
        AppError::AuthFailed("Login response contained an invalid server URL".to_string())
    })?;
    Ok(url[..Position::BeforePath].to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_credentials() -> Credentials {
        Credentials {
            username: "user@example.com".to_string(),
            password: SecretString::from("hunter2".to_string()),
            security_token: SecretString::from("TOKEN123".to_string()),
        }
    }

    fn success_body(server_url: &str) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">"#,
                "<soapenv:Body><loginResponse><result>",
                "<metadataServerUrl>{0}/services/Soap/m/56.0/00Dxx</metadataServerUrl>",
                "<serverUrl>{0}/services/Soap/u/56.0/00Dxx</serverUrl>",
                "<sessionId>00Dxx!ARsAQNc.fake.session</sessionId>",
                "<userId>005xx0000001234</userId>",
                "</result></loginResponse></soapenv:Body></soapenv:Envelope>"
            ),
            server_url
        )
    }

    const FAULT_BODY: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/">"#,
        "<soapenv:Body><soapenv:Fault>",
        "<faultcode>INVALID_LOGIN</faultcode>",
        "<faultstring>INVALID_LOGIN: Invalid username, password, security token; ",
        "or user locked out.</faultstring>",
        "</soapenv:Fault></soapenv:Body></soapenv:Envelope>"
    );

    // ─────────────────────────────────────────────────────────────────────────
    // Response Parsing Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn parse_extracts_server_url_and_session_id() {
        let body = success_body("https://na139.salesforce.com");

        let fields = parse_login_response(&body).unwrap();

        assert_eq!(
            fields.server_url.as_deref(),
            Some("https://na139.salesforce.com/services/Soap/u/56.0/00Dxx")
        );
        assert_eq!(
            fields.session_id.as_deref(),
            Some("00Dxx!ARsAQNc.fake.session")
        );
        assert!(fields.fault.is_none());
    }

    #[test]
    fn parse_extracts_faultstring() {
        let fields = parse_login_response(FAULT_BODY).unwrap();

        assert!(fields.server_url.is_none());
        assert!(fields.session_id.is_none());
        let fault = fields.fault.unwrap();
        assert!(fault.contains("INVALID_LOGIN"));
    }

    #[test]
    fn parse_tolerates_unrelated_xml() {
        let fields = parse_login_response("<root><other>value</other></root>").unwrap();

        assert!(fields.server_url.is_none());
        assert!(fields.session_id.is_none());
        assert!(fields.fault.is_none());
    }

    #[test]
    fn instance_url_drops_path_and_keeps_host() {
        let instance =
            instance_from_server_url("https://na139.salesforce.com/services/Soap/u/56.0/00Dxx")
                .unwrap();

        assert_eq!(instance, "https://na139.salesforce.com");
    }

    #[test]
    fn instance_url_rejects_garbage() {
        let result = instance_from_server_url("not a url");

        assert!(matches!(result, Err(AppError::AuthFailed(_))));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Envelope Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn envelope_contains_credentials() {
        let envelope = login_envelope("user@example.com", "hunter2TOKEN123");

        assert!(envelope.contains("<urn:username>user@example.com</urn:username>"));
        assert!(envelope.contains("<urn:password>hunter2TOKEN123</urn:password>"));
    }

    #[test]
    fn envelope_escapes_xml_special_characters() {
        let envelope = login_envelope("a&b@example.com", "p<w>d\"quote");

        assert!(envelope.contains("a&amp;b@example.com"));
        assert!(envelope.contains("p&lt;w&gt;d"));
        assert!(!envelope.contains("p<w>d"));
    }

    #[test]
    fn credentials_debug_redacts_secrets() {
        let creds = test_credentials();

        let debug_output = format!("{:?}", creds);

        assert!(debug_output.contains("user@example.com"));
        assert!(!debug_output.contains("hunter2"));
        assert!(!debug_output.contains("TOKEN123"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Login Flow Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn login_success_builds_session() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/Soap/u/56.0/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(success_body(&mock_server.uri())),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let http = reqwest::Client::new();
        let session = login(&http, &mock_server.uri(), &test_credentials())
            .await
            .expect("login should succeed");

        assert_eq!(session.instance_url, mock_server.uri());
        assert_eq!(
            session.session_id.expose_secret(),
            "00Dxx!ARsAQNc.fake.session"
        );
    }

    #[tokio::test]
    async fn login_fault_is_auth_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/Soap/u/56.0/"))
            .respond_with(ResponseTemplate::new(500).set_body_string(FAULT_BODY))
            .expect(1)
            .mount(&mock_server)
            .await;

        let http = reqwest::Client::new();
        let result = login(&http, &mock_server.uri(), &test_credentials()).await;

        match result {
            Err(AppError::AuthFailed(msg)) => assert!(msg.contains("INVALID_LOGIN")),
            other => panic!("Expected AuthFailed, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn login_unrecognized_body_is_auth_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/services/Soap/u/56.0/"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let http = reqwest::Client::new();
        let result = login(&http, &mock_server.uri(), &test_credentials()).await;

        match result {
            Err(AppError::AuthFailed(msg)) => assert!(msg.contains("503")),
            other => panic!("Expected AuthFailed, got: {:?}", other),
        }
    }
}
