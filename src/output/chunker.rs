//! Record-aware CSV chunking that never corrupts records.
//!
//! Parses a reassembled export payload with the `csv` crate so embedded
//! commas and newlines inside quoted fields survive, then re-splits the rows
//! into bounded-size output files, each carrying the header row.

use std::path::{Path, PathBuf};

use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use tracing::info;

use crate::error::AppError;

/// Default maximum number of data rows per output file.
pub const DEFAULT_CHUNK_SIZE: u64 = 100_000;

/// Number of data rows included in the logged preview.
const PREVIEW_ROWS: usize = 5;

/// Result of splitting a combined payload into chunk files.
#[derive(Debug, Clone)]
pub struct ChunkResult {
    /// Paths to the generated chunk files, in part order.
    pub chunk_paths: Vec<PathBuf>,
    /// Total data rows processed (excluding headers).
    pub total_rows: u64,
    /// Number of data rows in each chunk (parallel to chunk_paths).
    pub rows_per_chunk: Vec<u64>,
}

/// Returns the human label segment of a publisher info string.
///
/// Publisher info is colon-delimited; the second segment is the label. A
/// string with no colon is used verbatim.
pub fn publisher_label(publisher_info: &str) -> &str {
    publisher_info.split(':').nth(1).unwrap_or(publisher_info)
}

/// Derives the output base filename: `{publisherLabel}_{first 8 of id}`.
pub fn base_filename(export_id: &str, publisher_info: &str) -> String {
    let id8 = export_id.get(..8).unwrap_or(export_id);
    format!("{}_{}", publisher_label(publisher_info), id8)
}

/// Splits a combined CSV payload into chunk files under `output_dir`.
///
/// Files are named `{base}_part_{n}.csv` with `n` starting at 1; each file
/// repeats the header and holds at most `chunk_size` data rows. Zero data
/// rows produce zero files.
///
/// # Errors
///
/// Returns `AppError::CsvInvalid` if the payload cannot be parsed and
/// `AppError::ChunkError` if a chunk file cannot be written.
pub async fn chunk_combined_csv(
    combined: String,
    export_id: String,
    publisher_info: String,
    output_dir: PathBuf,
    chunk_size: u64,
) -> Result<ChunkResult, AppError> {
    // Run the blocking CSV processing in a separate thread
    tokio::task::spawn_blocking(move || {
        chunk_blocking(&combined, &export_id, &publisher_info, &output_dir, chunk_size)
    })
    .await
    .map_err(|e| AppError::ChunkError(format!("Task join error: {}", e)))?
}

/// Blocking implementation of payload chunking.
fn chunk_blocking(
    combined: &str,
    export_id: &str,
    publisher_info: &str,
    output_dir: &Path,
    chunk_size: u64,
) -> Result<ChunkResult, AppError> {
    if chunk_size == 0 {
        return Err(AppError::ChunkError(
            "chunk size must be at least 1".to_string(),
        ));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(combined.as_bytes());

    // The first header row is canonical for the whole payload.
    let headers = reader
        .byte_headers()
        .map_err(|e| AppError::CsvInvalid(format!("Failed to read CSV headers: {}", e)))?
        .clone();

    if headers.is_empty() {
        return Err(AppError::CsvInvalid(
            "combined payload has no header row".to_string(),
        ));
    }

    let rows: Vec<ByteRecord> = reader
        .byte_records()
        .collect::<Result<_, _>>()
        .map_err(|e| AppError::CsvInvalid(format!("Failed to parse CSV record: {}", e)))?;

    log_preview(&headers, &rows);

    let base = base_filename(export_id, publisher_info);
    let mut chunk_paths: Vec<PathBuf> = Vec::new();
    let mut rows_per_chunk: Vec<u64> = Vec::new();

    for (index, batch) in rows.chunks(chunk_size as usize).enumerate() {
        let path = output_dir.join(format!("{}_part_{}.csv", base, index + 1));
        write_chunk(&path, &headers, batch)?;

        info!("[CHUNK] Saved {} rows to {}", batch.len(), path.display());
        rows_per_chunk.push(batch.len() as u64);
        chunk_paths.push(path);
    }

    Ok(ChunkResult {
        chunk_paths,
        total_rows: rows.len() as u64,
        rows_per_chunk,
    })
}

/// Writes one chunk file: header first, then the batch rows.
fn write_chunk(path: &Path, headers: &ByteRecord, batch: &[ByteRecord]) -> Result<(), AppError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| AppError::ChunkError(format!("Failed to create chunk file: {}", e)))?;

    writer
        .write_byte_record(headers)
        .map_err(|e| AppError::ChunkError(format!("Failed to write header: {}", e)))?;

    for record in batch {
        writer
            .write_byte_record(record)
            .map_err(|e| AppError::ChunkError(format!("Failed to write record: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::ChunkError(format!("Failed to flush chunk: {}", e)))
}

/// Logs the column list and the first few data rows.
fn log_preview(headers: &ByteRecord, rows: &[ByteRecord]) {
    let columns: Vec<String> = headers
        .iter()
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect();
    info!(
        "[CHUNK] Data preview: {} rows, columns {:?}",
        rows.len(),
        columns
    );

    for record in rows.iter().take(PREVIEW_ROWS) {
        let fields: Vec<String> = record
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        info!("[CHUNK]   {:?}", fields);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
