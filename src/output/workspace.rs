//! Output workspace management.
//!
//! Brackets a run: clears previous CSV artifacts before downloading and
//! reveals the output folder in the OS file manager afterward.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::AppError;

/// Prepares the output directory for a fresh run.
///
/// Creates the directory when absent. When it already exists, deletes every
/// `*.csv` file directly inside it (non-recursive); other files and
/// subdirectories are left alone.
///
/// # Errors
///
/// Returns `AppError::Workspace` if the directory cannot be created, read,
/// or a stale file cannot be removed.
pub fn clear_old_files(output_dir: &Path) -> Result<(), AppError> {
    if !output_dir.exists() {
        fs::create_dir_all(output_dir).map_err(|e| {
            AppError::Workspace(format!(
                "Failed to create directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;
        info!("[WORKSPACE] Created directory: {}", output_dir.display());
        return Ok(());
    }

    let entries = fs::read_dir(output_dir).map_err(|e| {
        AppError::Workspace(format!(
            "Failed to read directory {}: {}",
            output_dir.display(),
            e
        ))
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| {
            AppError::Workspace(format!("Failed to read directory entry: {}", e))
        })?;
        let path = entry.path();

        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            fs::remove_file(&path).map_err(|e| {
                AppError::Workspace(format!("Failed to delete {}: {}", path.display(), e))
            })?;
            info!("[WORKSPACE] Deleted old file: {}", path.display());
        }
    }

    Ok(())
}

/// Reveals the output directory in the system file manager.
///
/// Best-effort: failures are logged and never fatal.
pub fn open_output_folder(output_dir: &Path) {
    match open::that(output_dir) {
        Ok(()) => info!(
            "[WORKSPACE] Output folder '{}' opened",
            output_dir.display()
        ),
        Err(e) => warn!(
            "[WORKSPACE] Failed to open output folder '{}': {}",
            output_dir.display(),
            e
        ),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn creates_missing_directory() {
        let base = TempDir::new().unwrap();
        let output_dir = base.path().join("output");
        assert!(!output_dir.exists());

        clear_old_files(&output_dir).unwrap();

        assert!(output_dir.is_dir());
    }

    #[test]
    fn removes_only_csv_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("old_part_1.csv"), "Id\n1\n").unwrap();
        fs::write(dir.path().join("old_part_2.csv"), "Id\n2\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("deep.csv"), "Id\n3\n").unwrap();

        clear_old_files(dir.path()).unwrap();

        assert!(!dir.path().join("old_part_1.csv").exists());
        assert!(!dir.path().join("old_part_2.csv").exists());
        assert!(dir.path().join("notes.txt").exists());
        // Non-recursive: nested CSVs are untouched.
        assert!(dir.path().join("nested").join("deep.csv").exists());
    }

    #[test]
    fn empty_existing_directory_is_fine() {
        let dir = TempDir::new().unwrap();

        clear_old_files(dir.path()).unwrap();

        assert!(dir.path().is_dir());
    }

    #[test]
    fn second_run_clears_first_runs_output() {
        let dir = TempDir::new().unwrap();

        clear_old_files(dir.path()).unwrap();
        fs::write(dir.path().join("MyReport_0Fbxx000_part_1.csv"), "Id\n1\n").unwrap();

        clear_old_files(dir.path()).unwrap();

        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
