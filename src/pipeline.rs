//! Run orchestration.
//!
//! One pass, no resumption: clear outputs → authenticate → locate exports →
//! for each export {fetch parts → chunk} → open the output folder. Only an
//! authentication failure aborts the run; every other failure is confined to
//! the export (or part) that caused it and surfaces in the [`RunReport`].

use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::AppError;
use crate::output::{chunker, workspace};
use crate::salesforce::{
    auth, client, exports, Credentials, ExportRecord, PartsDownload, RestQueryClient,
    SalesforceClient, SkippedPart,
};

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a run needs, resolved from the CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Salesforce login URL (e.g., "https://login.salesforce.com").
    pub login_url: String,
    /// Login credentials.
    pub credentials: Credentials,
    /// Directory chunk files are written to.
    pub output_dir: PathBuf,
    /// Maximum data rows per output file.
    pub chunk_size: u64,
    /// Whether to reveal the output folder when the run completes.
    pub open_folder: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Report
// ─────────────────────────────────────────────────────────────────────────────

/// How one export fared.
#[derive(Debug)]
pub enum ExportStatus {
    /// Every part downloaded; all rows written.
    Completed { files: usize, rows: u64 },
    /// Some parts were skipped; the written rows are incomplete.
    Partial {
        files: usize,
        rows: u64,
        skipped: Vec<SkippedPart>,
    },
    /// The part query found nothing (or itself failed).
    NoParts,
    /// The combined payload could not be parsed or written.
    ChunkFailed { reason: String },
}

/// Per-export outcome, aggregated into the run report.
#[derive(Debug)]
pub struct ExportOutcome {
    /// DatasetExport record id.
    pub export_id: String,
    /// Human label derived from the publisher info.
    pub label: String,
    /// What happened.
    pub status: ExportStatus,
}

/// Aggregated result of one run.
///
/// Exists so callers and tests can assert on outcomes instead of parsing
/// log text; partial downloads are visible here, not just in the log.
#[derive(Debug, Default)]
pub struct RunReport {
    /// One outcome per located export, in processing order.
    pub exports: Vec<ExportOutcome>,
}

impl RunReport {
    /// True when every export completed with nothing skipped.
    pub fn is_clean(&self) -> bool {
        self.exports
            .iter()
            .all(|outcome| matches!(outcome.status, ExportStatus::Completed { .. }))
    }

    /// Logs a one-line summary per export.
    pub fn log_summary(&self) {
        info!("[RUN] Processed {} export(s)", self.exports.len());
        for outcome in &self.exports {
            match &outcome.status {
                ExportStatus::Completed { files, rows } => info!(
                    "[RUN]   {} ({}): {} rows in {} file(s)",
                    outcome.label, outcome.export_id, rows, files
                ),
                ExportStatus::Partial {
                    files,
                    rows,
                    skipped,
                } => warn!(
                    "[RUN]   {} ({}): INCOMPLETE - {} rows in {} file(s), {} part(s) missing",
                    outcome.label,
                    outcome.export_id,
                    rows,
                    files,
                    skipped.len()
                ),
                ExportStatus::NoParts => {
                    info!("[RUN]   {} ({}): no parts", outcome.label, outcome.export_id)
                }
                ExportStatus::ChunkFailed { reason } => warn!(
                    "[RUN]   {} ({}): failed - {}",
                    outcome.label, outcome.export_id, reason
                ),
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run
// ─────────────────────────────────────────────────────────────────────────────

/// Executes one full run.
///
/// # Errors
///
/// Propagates `AppError::AuthFailed`/`AppError::ConnectionFailed` from login
/// (fatal per the run contract) and `AppError::Workspace` if the output
/// directory cannot be prepared. Export-level failures never surface here;
/// they are reported in the returned [`RunReport`].
pub async fn run(opts: &RunOptions) -> Result<RunReport, AppError> {
    workspace::clear_old_files(&opts.output_dir)?;

    let http = client::build_http_client()?;
    let session = auth::login(&http, &opts.login_url, &opts.credentials).await?;
    let sf_client = SalesforceClient::with_http(http, session);
    let rest = RestQueryClient::new(&sf_client);

    let export_records = exports::list_exports(&rest).await;

    let mut report = RunReport::default();
    for export in &export_records {
        let status = process_export(&sf_client, &rest, export, opts).await;
        report.exports.push(ExportOutcome {
            export_id: export.id.clone(),
            label: chunker::publisher_label(&export.publisher_info).to_string(),
            status,
        });
    }

    report.log_summary();

    if opts.open_folder {
        workspace::open_output_folder(&opts.output_dir);
    }

    Ok(report)
}

/// Downloads and chunks one export; failures stay inside this export.
async fn process_export(
    sf_client: &SalesforceClient,
    rest: &RestQueryClient<'_>,
    export: &ExportRecord,
    opts: &RunOptions,
) -> ExportStatus {
    let (combined, skipped) = match exports::download_parts(sf_client, rest, &export.id).await {
        PartsDownload::NoParts => return ExportStatus::NoParts,
        PartsDownload::Payload {
            combined, skipped, ..
        } => (combined, skipped),
    };

    if combined.is_empty() {
        // Nothing usable arrived; there is no payload to parse.
        if skipped.is_empty() {
            return ExportStatus::Completed { files: 0, rows: 0 };
        }
        return ExportStatus::Partial {
            files: 0,
            rows: 0,
            skipped,
        };
    }

    let result = chunker::chunk_combined_csv(
        combined,
        export.id.clone(),
        export.publisher_info.clone(),
        opts.output_dir.clone(),
        opts.chunk_size,
    )
    .await;

    match result {
        Ok(chunks) if skipped.is_empty() => ExportStatus::Completed {
            files: chunks.chunk_paths.len(),
            rows: chunks.total_rows,
        },
        Ok(chunks) => ExportStatus::Partial {
            files: chunks.chunk_paths.len(),
            rows: chunks.total_rows,
            skipped,
        },
        Err(e) => {
            warn!("[RUN] Failed to process export {}: {}", export.id, e);
            ExportStatus::ChunkFailed {
                reason: e.to_string(),
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
