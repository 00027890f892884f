//! Utility functions and helpers.
//!
//! This module provides common functionality used across multiple reports:
//!
//! - [`paginate`] - Draining paginated listings with retry and deadlines
//! - [`progress`] - Progress tracking and display utilities
//! - [`time`] - Timestamp parsing and formatting helpers
//! - [`reader`] - Smart file reader with automatic decompression
//! - [`filename`] - Portable report filenames
//! - [`format`] - Number formatting for summaries
//!
//! # Examples
//!
//! ## Parsing timestamps
//!
//! ```no_run
//! use sso_audit_tools::utils::time::parse_timestamp;
//!
//! let timestamp = parse_timestamp("2024-01-03T10:30:00Z").unwrap();
//! println!("Parsed: {}", timestamp);
//! ```
//!
//! ## Reading exported CloudTrail logs
//!
//! ```no_run
//! use sso_audit_tools::utils::reader::open_file;
//! use std::io::Read;
//!
//! // Automatically decompresses .gz and .zst files
//! let mut contents = String::new();
//! open_file("CloudTrail.json.gz").unwrap().read_to_string(&mut contents).unwrap();
//! ```

pub mod filename;
pub mod format;
pub mod paginate;
pub mod progress;
pub mod reader;
pub mod time;
