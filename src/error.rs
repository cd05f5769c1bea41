use thiserror::Error;

/// Application-wide error type.
///
/// Only `AuthFailed` is fatal to a run; every other failure is caught at the
/// stage that observes it and converted into an empty result or a reported
/// partial outcome.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Auth ──────────────────────────────────────────────────────────────────
    #[error("Salesforce login failed: {0}")]
    AuthFailed(String),

    // ── API ───────────────────────────────────────────────────────────────────
    #[error("Salesforce error: {0}")]
    Salesforce(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // ── CSV ───────────────────────────────────────────────────────────────────
    #[error("Invalid CSV: {0}")]
    CsvInvalid(String),

    #[error("CSV chunk error: {0}")]
    ChunkError(String),

    // ── Workspace ─────────────────────────────────────────────────────────────
    #[error("Workspace error: {0}")]
    Workspace(String),

    // ── Generic fallback ──────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}
