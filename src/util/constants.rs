// LogRelay - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every configurable value has a default plus explicit bounds here.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogRelay";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogRelay";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Log root and file access
// =============================================================================

/// Default log root directory, relative to the working directory.
pub const DEFAULT_LOG_PATH: &str = "./logs";

/// Default extensions a file must end with to be served.
/// Matching is case-insensitive against the lowercased file name.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[".log", ".txt"];

/// Default size cap for queried files, in whole megabytes.
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 100;

/// Hard upper bound on the configurable size cap (prevents configuration
/// mistakes from allowing multi-gigabyte full reads).
pub const ABSOLUTE_MAX_FILE_SIZE_MB: u64 = 4_096;

/// Bytes per megabyte for the size cap check.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Substrings that make a file name illegal when security checks are on.
pub const ILLEGAL_FILE_NAME_PARTS: &[&str] = &["..", "/", "\\"];

// =============================================================================
// Query pagination
// =============================================================================

/// Page number used when a query omits it.
pub const DEFAULT_PAGE: usize = 1;

/// Page size used when a query omits it.
pub const DEFAULT_PAGE_SIZE: usize = 1_000;

/// Largest page size a query may request.
pub const MAX_PAGE_SIZE: usize = 1_000;

/// Smallest page size a query may request.
pub const MIN_PAGE_SIZE: usize = 1;

// =============================================================================
// Live tail limits
// =============================================================================

/// Maximum bytes read from the tailed file per change event.
/// A capped read resumes on the next change event because the offset only
/// advances by what was actually consumed.
pub const MAX_TAIL_READ_BYTES: u64 = 1024 * 1024; // 1 MiB

// =============================================================================
// Log line grammar
// =============================================================================

/// Recognised log-line grammar: timestamp, level, message.
pub const LOG_LINE_PATTERN: &str =
    r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3})\s+(\S+)\s+(.*)$";

/// chrono format for the timestamp capture group.
pub const LOG_LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// ISO-8601 rendering used on the wire. `%.f` omits a zero fraction.
pub const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Accepted input formats for query `startTime` / `endTime`.
pub const QUERY_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
/// Prevents accidental exposure of sensitive data in long lines.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";
