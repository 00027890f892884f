//! Writing reports to disk.
//!
//! Files are written under a temporary `<name>.incomplete` path and renamed
//! once everything has been flushed. A run that fails halfway leaves the
//! `.incomplete` file behind, never a truncated file under the final name.

use crate::utils::filename::sanitize_filename;
use crate::utils::time::filename_stamp;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Suffix of files still being written.
pub const INCOMPLETE_SUFFIX: &str = ".incomplete";

/// Writes the files of one report run, all stamped with the same time.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    stamp: String,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>, generated_at: DateTime<Local>) -> Self {
        Self {
            output_dir: output_dir.into(),
            stamp: filename_stamp(&generated_at),
        }
    }

    /// `<output_dir>/sso_report_<label>_<stamp>.<extension>`, sanitized.
    pub fn path_for(&self, label: &str, extension: &str) -> PathBuf {
        let filename = format!("sso_report_{}_{}.{}", label, self.stamp, extension);
        self.output_dir.join(sanitize_filename(&filename))
    }

    /// Write `rows` as CSV under `columns`. The header is written even when
    /// there are no rows.
    pub fn write_csv<T: Serialize>(
        &self,
        label: &str,
        columns: &[&str],
        rows: &[T],
    ) -> Result<PathBuf> {
        let path = self.path_for(label, "csv");

        write_then_rename(&path, |out| {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(out);
            writer.write_record(columns)?;
            for row in rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
            Ok(())
        })?;

        Ok(path)
    }

    /// Write `value` as JSON, pretty-printed with two-space indentation.
    pub fn write_json<T: Serialize>(&self, label: &str, value: &T) -> Result<PathBuf> {
        let path = self.path_for(label, "json");

        write_then_rename(&path, |out| {
            serde_json::to_writer_pretty(&mut *out, value)?;
            Ok(())
        })?;

        Ok(path)
    }
}

fn incomplete_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(INCOMPLETE_SUFFIX);
    PathBuf::from(name)
}

fn write_then_rename<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let partial = incomplete_path(path);
    let file = File::create(&partial)
        .with_context(|| format!("Failed to create output file: {}", partial.display()))?;
    let mut out = BufWriter::new(file);

    write(&mut out)
        .and_then(|()| out.flush().map_err(Into::into))
        .with_context(|| format!("Failed to write {}, left incomplete", partial.display()))?;
    drop(out);

    fs::rename(&partial, path).with_context(|| {
        format!(
            "Failed to move {} into place as {}",
            partial.display(),
            path.display()
        )
    })
}
