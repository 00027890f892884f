//! File reader with transparent decompression.
//!
//! CloudTrail delivers its log files to S3 gzip compressed, and archived
//! copies are often recompressed with zstd. Both can be passed to
//! `credential-report --cloudtrail-logs` without unpacking them first.
//!
//! ```no_run
//! use sso_audit_tools::utils::reader::open_file;
//! use std::io::Read;
//!
//! let mut reader = open_file("123456789012_CloudTrail_us-east-1_20240101T0000Z_abc.json.gz").unwrap();
//! let mut contents = String::new();
//! reader.read_to_string(&mut contents).unwrap();
//! ```

use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Opens a file, decompressing by extension: `.gz` (gzip), `.zst` (zstd),
/// anything else is read as-is.
pub fn open_file(path: impl AsRef<Path>) -> Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()).unwrap_or("") {
        "gz" => Ok(Box::new(MultiGzDecoder::new(file))),
        "zst" => {
            let decoder = zstd::Decoder::new(file).with_context(|| {
                format!("Failed to create zstd decoder for: {}", path.display())
            })?;
            Ok(Box::new(decoder))
        }
        _ => Ok(Box::new(file)),
    }
}
