//! Report Bundle Writer
//! One directory per entity holding `summary.json` and the chart images.
//!
//! A bundle is written into a hidden staging directory next to its final
//! location and moved into place only once every file is complete. A build
//! that fails part way leaves the previous bundle, if any, untouched.

use crate::error::ReportError;
use crate::report::ReportData;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

pub const SUMMARY_FILE: &str = "summary.json";

pub struct ReportWriter;

impl ReportWriter {
    /// File-system safe form of an entity name: whitespace becomes `_`,
    /// anything other than letters, digits, `-` and `_` is replaced.
    pub fn safe_name(entity_name: &str) -> String {
        let safe: String = entity_name
            .trim()
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if safe.is_empty() {
            "Unnamed".to_string()
        } else {
            safe
        }
    }

    /// `<reports_dir>/<Entity_Name>_Report`
    pub fn bundle_dir(reports_dir: &Path, entity_name: &str) -> PathBuf {
        reports_dir.join(format!("{}_Report", Self::safe_name(entity_name)))
    }

    /// Empty staging directory inside `reports_dir`, removed on drop.
    pub fn stage(reports_dir: &Path, entity_name: &str) -> Result<TempDir, ReportError> {
        let io_error = |source| ReportError::Write {
            path: reports_dir.to_path_buf(),
            source,
        };
        fs::create_dir_all(reports_dir).map_err(io_error)?;
        tempfile::Builder::new()
            .prefix(&format!(".{}_", Self::safe_name(entity_name)))
            .tempdir_in(reports_dir)
            .map_err(io_error)
    }

    /// Replace `dir` with the staged contents.
    pub fn publish(staged: TempDir, dir: &Path) -> Result<(), ReportError> {
        let io_error = |source| ReportError::Write {
            path: dir.to_path_buf(),
            source,
        };
        if dir.exists() {
            fs::remove_dir_all(dir).map_err(io_error)?;
        }
        fs::rename(staged.path(), dir).map_err(io_error)?;
        // The staging path is gone now, so the drop cleanup is a no-op.
        drop(staged);
        debug!(dir = %dir.display(), "Published report bundle");
        Ok(())
    }

    /// Write the report data as pretty-printed JSON.
    pub fn write_summary(dir: &Path, data: &ReportData) -> Result<PathBuf, ReportError> {
        let path = dir.join(SUMMARY_FILE);
        let io_error = |source| ReportError::Write {
            path: path.clone(),
            source,
        };

        let file = File::create(&path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, data)?;
        writer.write_all(b"\n").map_err(io_error)?;
        writer.flush().map_err(io_error)?;

        info!(path = %path.display(), "Wrote report summary");
        Ok(path)
    }
}
