//! DatasetExport discovery and part download.
//!
//! A `DatasetExport` is one completed bulk-data export job; its payload is
//! transferred as ordered `DatasetExportPart` segments. This module locates
//! the export records and reassembles each export's parts into a single CSV
//! text.
//!
//! Failure policy (deliberately asymmetric):
//! - a failed export or part-list query collapses to "nothing found" and the
//!   run continues;
//! - a failed individual part download is skipped, recorded in the returned
//!   [`PartsDownload`], and the remaining parts still download.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, warn};

use crate::salesforce::client::SalesforceClient;
use crate::salesforce::rest::{soql_string_literal, RestQueryClient};
use crate::salesforce::API_VERSION;

/// Fixed query enumerating every dataset export record.
const EXPORT_QUERY: &str = "SELECT Id, PublisherInfo FROM DatasetExport";

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// One `DatasetExport` record.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRecord {
    /// Record id (e.g., "0Fbxx0000004CyzCAE").
    #[serde(rename = "Id")]
    pub id: String,
    /// Colon-delimited publisher metadata (e.g., "Type:MyReport").
    #[serde(rename = "PublisherInfo")]
    pub publisher_info: String,
}

/// One `DatasetExportPart` record.
#[derive(Debug, Clone, Deserialize)]
struct ExportPartRecord {
    /// Record id of the part.
    #[serde(rename = "Id")]
    id: String,
    /// Sequence position within the export; defines reassembly order.
    #[serde(rename = "PartNumber")]
    part_number: u64,
}

/// A part that could not be downloaded and was omitted from the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedPart {
    /// Ordinal of the missing part.
    pub part_number: u64,
    /// Short description of what went wrong.
    pub reason: String,
}

/// Outcome of downloading one export's parts.
#[derive(Debug)]
pub enum PartsDownload {
    /// The part query found nothing (or itself failed).
    NoParts,
    /// Concatenated text of the successfully fetched parts, in ordinal order.
    ///
    /// `skipped` lists the parts whose content is missing from `combined`;
    /// a non-empty list means the payload is incomplete.
    Payload {
        combined: String,
        parts_total: usize,
        skipped: Vec<SkippedPart>,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Export Locator
// ─────────────────────────────────────────────────────────────────────────────

/// Fetches all `DatasetExport` records.
///
/// Query failures are logged and yield an empty list; the run continues.
pub async fn list_exports(rest: &RestQueryClient<'_>) -> Vec<ExportRecord> {
    info!("[EXPORT] Fetching DatasetExport records...");

    let result = match rest.query(EXPORT_QUERY).await {
        Ok(result) => result,
        Err(e) => {
            warn!("[EXPORT] Error fetching DatasetExport records: {}", e);
            return Vec::new();
        }
    };

    let records: Vec<ExportRecord> = result
        .records
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ExportRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("[EXPORT] Skipping malformed DatasetExport record: {}", e);
                None
            }
        })
        .collect();

    if records.is_empty() {
        info!("[EXPORT] No DatasetExport records found");
    } else {
        info!("[EXPORT] Found {} DatasetExport record(s)", records.len());
    }

    records
}

// ─────────────────────────────────────────────────────────────────────────────
// Part Fetcher
// ─────────────────────────────────────────────────────────────────────────────

/// Downloads all parts of one export and concatenates them in ordinal order.
///
/// Each part body must arrive with HTTP 200 and decode as UTF-8; anything
/// else skips that part and records it. This function never propagates an
/// error: part-list query failures collapse to [`PartsDownload::NoParts`].
pub async fn download_parts(
    client: &SalesforceClient,
    rest: &RestQueryClient<'_>,
    export_id: &str,
) -> PartsDownload {
    info!("[EXPORT] Fetching parts for DatasetExport {}", export_id);

    let soql = format!(
        "SELECT Id, PartNumber FROM DatasetExportPart WHERE DatasetExportId = {} ORDER BY PartNumber",
        soql_string_literal(export_id)
    );

    let result = match rest.query(&soql).await {
        Ok(result) => result,
        Err(e) => {
            warn!("[EXPORT] Error fetching DatasetExportPart records: {}", e);
            return PartsDownload::NoParts;
        }
    };

    let parts: Vec<ExportPartRecord> = result
        .records
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ExportPartRecord>(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("[EXPORT] Skipping malformed DatasetExportPart record: {}", e);
                None
            }
        })
        .collect();

    if parts.is_empty() {
        info!(
            "[EXPORT] No DatasetExportPart records found for DatasetExport {}",
            export_id
        );
        return PartsDownload::NoParts;
    }

    let parts_total = parts.len();
    let mut combined = String::new();
    let mut skipped: Vec<SkippedPart> = Vec::new();

    for part in &parts {
        info!(
            "[EXPORT] Downloading part {} with id {}",
            part.part_number, part.id
        );

        match fetch_part_body(client, &part.id).await {
            Ok(text) => combined.push_str(&text),
            Err(reason) => {
                warn!(
                    "[EXPORT] Failed to download part {}: {}",
                    part.part_number, reason
                );
                skipped.push(SkippedPart {
                    part_number: part.part_number,
                    reason,
                });
            }
        }
    }

    PartsDownload::Payload {
        combined,
        parts_total,
        skipped,
    }
}

/// Fetches one part's data file and decodes it as UTF-8.
///
/// The error value is a skip reason, not an `AppError`: part failures never
/// escalate past the fetcher.
async fn fetch_part_body(client: &SalesforceClient, part_id: &str) -> Result<String, String> {
    let path = format!(
        "/services/data/{}/sobjects/DatasetExportPart/{}/DataFile",
        API_VERSION, part_id
    );

    let response = client
        .get_authed(&path)
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(format!("HTTP {}", status.as_u16()));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|_| "failed to read response body".to_string())?;

    String::from_utf8(bytes.to_vec()).map_err(|_| "response body was not valid UTF-8".to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
