//! Salesforce HTTP client and API interaction layer.
//!
//! This module provides everything the pipeline needs to talk to Salesforce:
//!
//! - **SOAP username/password login** returning a read-only [`Session`]
//! - **Safe logging** that never leaks tokens or sensitive URL parameters
//! - **SOQL query execution** with automatic pagination
//! - **DatasetExport discovery and part download**

pub mod auth;
pub mod client;
pub mod exports;
pub mod rest;

/// Salesforce API version used for all data requests.
pub const API_VERSION: &str = "v56.0";

pub use auth::{login, Credentials};
pub use client::{SalesforceClient, Session};
pub use exports::{download_parts, list_exports, ExportRecord, PartsDownload, SkippedPart};
pub use rest::{QueryResult, RestQueryClient};
