// LogRelay - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation; every error keeps its causal chain for
// diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LogRelay operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogRelayError {
    /// A point-in-time query was rejected or failed.
    Query(QueryError),

    /// A live-tail read failed.
    Tail(TailError),

    /// The filesystem watch subscription could not be established.
    Watch(WatchError),

    /// An inbound control message could not be decoded.
    Control(ControlError),

    /// Configuration loading or validation failed.
    Config(ConfigError),
}

impl fmt::Display for LogRelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query(e) => write!(f, "Query error: {e}"),
            Self::Tail(e) => write!(f, "Tail error: {e}"),
            Self::Watch(e) => write!(f, "Watch error: {e}"),
            Self::Control(e) => write!(f, "Control error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for LogRelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Query(e) => Some(e),
            Self::Tail(e) => Some(e),
            Self::Watch(e) => Some(e),
            Self::Control(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

/// Broad classification of a query failure, used by callers to pick a
/// response (rejected request vs. generic failure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Malformed request; no file access was attempted.
    Validation,
    /// File absent or not servable.
    NotFound,
    /// File exceeds the configured size cap.
    SizeLimit,
    /// Reading the file failed.
    Io,
}

/// Errors related to point-in-time queries.
#[derive(Debug)]
pub enum QueryError {
    /// `fileName` was missing or blank.
    BlankFileName,

    /// Page numbers start at 1.
    InvalidPage { page: usize },

    /// Page size outside the allowed range.
    InvalidPageSize { page_size: usize, max: usize },

    /// File name contains a path traversal component.
    IllegalFileName { file_name: String },

    /// File does not exist under the log root.
    FileNotFound { path: PathBuf },

    /// Path exists but is not a regular file.
    NotAFile { path: PathBuf },

    /// File extension is not in the allow-list.
    UnsupportedExtension { path: PathBuf },

    /// File exceeds the configured size cap.
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// I/O error while reading the file.
    Io { path: PathBuf, source: io::Error },

    /// Writing download output failed.
    Write { file_name: String, source: io::Error },
}

impl QueryError {
    /// Classify this error for the caller.
    pub fn kind(&self) -> QueryErrorKind {
        match self {
            Self::BlankFileName
            | Self::InvalidPage { .. }
            | Self::InvalidPageSize { .. }
            | Self::IllegalFileName { .. } => QueryErrorKind::Validation,
            Self::FileNotFound { .. } | Self::NotAFile { .. } | Self::UnsupportedExtension { .. } => {
                QueryErrorKind::NotFound
            }
            Self::FileTooLarge { .. } => QueryErrorKind::SizeLimit,
            Self::Io { .. } | Self::Write { .. } => QueryErrorKind::Io,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlankFileName => write!(f, "File name must not be blank"),
            Self::InvalidPage { page } => write!(f, "Page {page} is invalid; pages start at 1"),
            Self::InvalidPageSize { page_size, max } => {
                write!(f, "Page size {page_size} is out of range (1-{max})")
            }
            Self::IllegalFileName { file_name } => {
                write!(f, "Illegal file name '{file_name}'")
            }
            Self::FileNotFound { path } => {
                write!(f, "File '{}' does not exist", path.display())
            }
            Self::NotAFile { path } => write!(f, "'{}' is not a regular file", path.display()),
            Self::UnsupportedExtension { path } => {
                write!(f, "File type of '{}' is not supported", path.display())
            }
            Self::FileTooLarge {
                path,
                size_mb,
                max_mb,
            } => write!(
                f,
                "File '{}' is {size_mb} MB, exceeds limit of {max_mb} MB",
                path.display()
            ),
            Self::Io { path, source } => {
                write!(f, "Failed to read '{}': {source}", path.display())
            }
            Self::Write { file_name, source } => {
                write!(f, "Failed to write download of '{file_name}': {source}")
            }
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } | Self::Write { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<QueryError> for LogRelayError {
    fn from(e: QueryError) -> Self {
        Self::Query(e)
    }
}

// ---------------------------------------------------------------------------
// Tail errors
// ---------------------------------------------------------------------------

/// Per-event failures on the live-tail path. These are logged and swallowed;
/// they never stop monitoring.
#[derive(Debug)]
pub enum TailError {
    /// The tailed file's metadata could not be read.
    Stat { path: PathBuf, source: io::Error },

    /// Reading the new bytes failed.
    Read { path: PathBuf, source: io::Error },
}

impl fmt::Display for TailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stat { path, source } => {
                write!(f, "Cannot stat '{}': {source}", path.display())
            }
            Self::Read { path, source } => {
                write!(f, "Cannot read new content of '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for TailError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Stat { source, .. } | Self::Read { source, .. } => Some(source),
        }
    }
}

impl From<TailError> for LogRelayError {
    fn from(e: TailError) -> Self {
        Self::Tail(e)
    }
}

// ---------------------------------------------------------------------------
// Watch errors
// ---------------------------------------------------------------------------

/// Errors establishing the filesystem watch subscription.
#[derive(Debug)]
pub enum WatchError {
    /// The log root does not exist or is not a directory.
    RootNotFound { path: PathBuf },

    /// The notification backend refused the subscription.
    Subscribe {
        path: PathBuf,
        source: notify::Error,
    },

    /// The dispatch thread could not be spawned.
    Spawn { source: io::Error },
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotFound { path } => {
                write!(f, "Log root '{}' does not exist", path.display())
            }
            Self::Subscribe { path, source } => {
                write!(f, "Cannot watch '{}': {source}", path.display())
            }
            Self::Spawn { source } => write!(f, "Cannot spawn watch thread: {source}"),
        }
    }
}

impl std::error::Error for WatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Subscribe { source, .. } => Some(source),
            Self::Spawn { source } => Some(source),
            Self::RootNotFound { .. } => None,
        }
    }
}

impl From<WatchError> for LogRelayError {
    fn from(e: WatchError) -> Self {
        Self::Watch(e)
    }
}

// ---------------------------------------------------------------------------
// Control errors
// ---------------------------------------------------------------------------

/// Errors decoding inbound control messages.
#[derive(Debug)]
pub enum ControlError {
    /// The message is not valid JSON or has an unknown shape.
    Decode { source: serde_json::Error },
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode { source } => write!(f, "Malformed control message: {source}"),
        }
    }
}

impl std::error::Error for ControlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode { source } => Some(source),
        }
    }
}

impl From<ControlError> for LogRelayError {
    fn from(e: ControlError) -> Self {
        Self::Control(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LogRelayError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for LogRelay results.
pub type Result<T> = std::result::Result<T, LogRelayError>;
