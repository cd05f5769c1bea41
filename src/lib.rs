//! Downloads Salesforce `DatasetExport` payloads and re-chunks them into
//! bounded-size CSV files.
//!
//! The pipeline is a single sequential pass: clear the output workspace,
//! authenticate, locate export records, download and reassemble each
//! export's parts, split the rows into bounded CSV files, then reveal the
//! output folder. See [`pipeline::run`].

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod salesforce;

pub use error::AppError;
pub use pipeline::{run, ExportOutcome, ExportStatus, RunOptions, RunReport};
