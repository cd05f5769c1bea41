//! Output-side utilities: workspace lifecycle and CSV chunking.
//!
//! Chunking is record-aware so data integrity survives embedded commas and
//! newlines inside quoted fields; the workspace manager clears stale
//! artifacts before a run and reveals the result folder afterward.

pub mod chunker;
pub mod workspace;

pub use chunker::{
    base_filename, chunk_combined_csv, publisher_label, ChunkResult, DEFAULT_CHUNK_SIZE,
};
pub use workspace::{clear_old_files, open_output_folder};
