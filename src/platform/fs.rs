// LogRelay - platform/fs.rs
//
// Filesystem helpers shared by the query and tail paths: file-name safety,
// extension allow-list, full-file reads, and metadata conversion.

use crate::util::constants;
use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;

/// True when `file_name` contains none of the path traversal components
/// (`..`, `/`, `\`). Pure string check, performed before any filesystem
/// access.
pub fn is_safe_file_name(file_name: &str) -> bool {
    !constants::ILLEGAL_FILE_NAME_PARTS
        .iter()
        .any(|part| file_name.contains(part))
}

/// True when the lowercased `file_name` ends with one of `extensions`.
pub fn has_allowed_extension(file_name: &str, extensions: &[String]) -> bool {
    let lower = file_name.to_lowercase();
    extensions
        .iter()
        .any(|ext| lower.ends_with(&ext.to_lowercase()))
}

/// Whole megabytes in `len` bytes (integer division).
pub fn size_in_mb(len: u64) -> u64 {
    len / constants::BYTES_PER_MB
}

/// Last-modified time of `metadata` in UTC, if the platform provides it.
pub fn modified_utc(metadata: &std::fs::Metadata) -> Option<DateTime<Utc>> {
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

/// Read the full content of a file as lines.
///
/// For files with invalid UTF-8, uses lossy conversion. Line endings (`\n`
/// and `\r\n`) are stripped; blank lines are kept so line order is exact.
pub fn read_lines_lossy(path: &Path) -> io::Result<Vec<String>> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.lines().map(str::to_string).collect())
}
