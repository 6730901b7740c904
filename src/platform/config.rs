// LogRelay - platform/config.rs
//
// Platform-specific configuration directory resolution and config.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance. Every value is validated against the named
// constants in `util::constants`; an invalid value produces a warning and
// falls back to its default, it never aborts startup.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LogRelay configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logrelay/ or %APPDATA%\LogRelay\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to current directory if platform dirs cannot be determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[logs]` section.
    pub logs: LogsSection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[logs]` config section: what is served and how.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LogsSection {
    /// Log root directory.
    pub path: Option<String>,
    /// Extensions a served file must end with (e.g. ".log").
    pub allowed_extensions: Option<Vec<String>>,
    /// Size cap for queried files, in megabytes.
    pub max_file_size_mb: Option<u64>,
    /// Largest page size a query may request.
    pub max_page_size: Option<usize>,
    /// Reject file names containing path traversal components.
    pub enable_security: Option<bool>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
    /// Log file path (empty = stderr only).
    pub file: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // -- Logs --
    /// Directory holding the served log files.
    pub log_path: PathBuf,
    /// Lowercase-compared extension allow-list.
    pub allowed_extensions: Vec<String>,
    /// Size cap in megabytes.
    pub max_file_size_mb: u64,
    /// Largest accepted query page size.
    pub max_page_size: usize,
    /// Path traversal checks on file names.
    pub enable_security: bool,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
    /// Log file path.
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(constants::DEFAULT_LOG_PATH),
            allowed_extensions: constants::DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            max_file_size_mb: constants::DEFAULT_MAX_FILE_SIZE_MB,
            max_page_size: constants::MAX_PAGE_SIZE,
            enable_security: true,
            log_level: None,
            log_file: None,
        }
    }
}

/// Load and validate the config file at `config_path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first run).
/// If the file is unreadable or unparseable, returns defaults with a warning:
/// the service still starts but the operator is informed.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), Vec::new());
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            let err = ConfigError::Io {
                path: config_path.to_path_buf(),
                source: e,
            };
            let msg = format!("{err}. Using defaults.");
            tracing::warn!("{}", msg);
            return (AppConfig::default(), vec![msg]);
        }
    };

    let (config, warnings) = match parse_config(&content, config_path) {
        Ok(parsed) => parsed,
        Err(err) => {
            let msg = format!("{err}. Using defaults.");
            tracing::warn!("{}", msg);
            return (AppConfig::default(), vec![msg]);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded config.toml");
    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }
    (config, warnings)
}

/// Parse and validate config.toml content. `path` is only used in errors.
///
/// Out-of-range values do not fail the parse; each one becomes a warning and
/// the default is kept.
pub fn parse_config(content: &str, path: &Path) -> Result<(AppConfig, Vec<String>), ConfigError> {
    let raw: RawConfig = toml::from_str(content).map_err(|e| ConfigError::TomlParse {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut warnings: Vec<String> = Vec::new();
    let mut config = AppConfig::default();

    // -- Logs: path --
    if let Some(ref dir) = raw.logs.path {
        if dir.trim().is_empty() {
            warnings.push(out_of_range(
                "[logs] path",
                dir,
                format!("a non-empty path. Using default ({})", constants::DEFAULT_LOG_PATH),
            ));
        } else {
            config.log_path = PathBuf::from(dir);
        }
    }

    // -- Logs: allowed_extensions --
    if let Some(ref exts) = raw.logs.allowed_extensions {
        let cleaned: Vec<String> = exts
            .iter()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if cleaned.is_empty() {
            warnings.push(out_of_range(
                "[logs] allowed_extensions",
                &format!("{exts:?}"),
                format!(
                    "at least one extension. Using default ({:?})",
                    constants::DEFAULT_ALLOWED_EXTENSIONS
                ),
            ));
        } else {
            config.allowed_extensions = cleaned;
        }
    }

    // -- Logs: max_file_size_mb --
    if let Some(mb) = raw.logs.max_file_size_mb {
        if (1..=constants::ABSOLUTE_MAX_FILE_SIZE_MB).contains(&mb) {
            config.max_file_size_mb = mb;
        } else {
            warnings.push(out_of_range(
                "[logs] max_file_size_mb",
                &mb.to_string(),
                format!(
                    "1-{}. Using default ({})",
                    constants::ABSOLUTE_MAX_FILE_SIZE_MB,
                    constants::DEFAULT_MAX_FILE_SIZE_MB
                ),
            ));
        }
    }

    // -- Logs: max_page_size --
    if let Some(size) = raw.logs.max_page_size {
        if (constants::MIN_PAGE_SIZE..=constants::MAX_PAGE_SIZE).contains(&size) {
            config.max_page_size = size;
        } else {
            warnings.push(out_of_range(
                "[logs] max_page_size",
                &size.to_string(),
                format!(
                    "{}-{}. Using default ({})",
                    constants::MIN_PAGE_SIZE,
                    constants::MAX_PAGE_SIZE,
                    constants::MAX_PAGE_SIZE
                ),
            ));
        }
    }

    // -- Logs: enable_security --
    if let Some(enabled) = raw.logs.enable_security {
        if !enabled {
            tracing::warn!("[logs] enable_security = false: file names are not checked for traversal");
        }
        config.enable_security = enabled;
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.clone());
        } else {
            warnings.push(out_of_range(
                "[logging] level",
                level,
                "error, warn, info, debug, trace. Using default (info)".to_string(),
            ));
        }
    }

    // -- Logging: file --
    if let Some(ref file) = raw.logging.file {
        if !file.is_empty() {
            config.log_file = Some(file.clone());
        }
    }

    Ok((config, warnings))
}

fn out_of_range(field: &str, value: &str, expected: String) -> String {
    ConfigError::ValueOutOfRange {
        field: field.to_string(),
        value: value.to_string(),
        expected,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> (AppConfig, Vec<String>) {
        parse_config(content, Path::new("config.toml")).unwrap()
    }

    #[test]
    fn test_empty_config_gives_defaults() {
        let (config, warnings) = parse("");
        assert!(warnings.is_empty());
        assert_eq!(config.log_path, PathBuf::from("./logs"));
        assert_eq!(config.allowed_extensions, vec![".log", ".txt"]);
        assert_eq!(config.max_file_size_mb, 100);
        assert_eq!(config.max_page_size, 1000);
        assert!(config.enable_security);
    }

    #[test]
    fn test_valid_values_applied() {
        let (config, warnings) = parse(
            r#"
[logs]
path = "/var/log/app"
allowed_extensions = [".LOG", " .out "]
max_file_size_mb = 250
max_page_size = 200
enable_security = false

[logging]
level = "debug"
file = "/tmp/logrelay.log"
"#,
        );
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(config.log_path, PathBuf::from("/var/log/app"));
        assert_eq!(config.allowed_extensions, vec![".log", ".out"]);
        assert_eq!(config.max_file_size_mb, 250);
        assert_eq!(config.max_page_size, 200);
        assert!(!config.enable_security);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.log_file.as_deref(), Some("/tmp/logrelay.log"));
    }

    #[test]
    fn test_out_of_range_values_warn_and_keep_defaults() {
        let (config, warnings) = parse(
            r#"
[logs]
max_file_size_mb = 0
max_page_size = 5000
allowed_extensions = []

[logging]
level = "loud"
"#,
        );
        assert_eq!(warnings.len(), 4, "{warnings:?}");
        assert_eq!(config.max_file_size_mb, 100);
        assert_eq!(config.max_page_size, 1000);
        assert_eq!(config.allowed_extensions, vec![".log", ".txt"]);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let result = parse_config("[logs\npath = ", Path::new("config.toml"));
        assert!(matches!(result, Err(ConfigError::TomlParse { .. })));
    }

    #[test]
    fn test_load_missing_file_is_silent_default() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = load_config(&dir.path().join("config.toml"));
        assert!(warnings.is_empty());
        assert!(config.enable_security);
    }

    #[test]
    fn test_load_unparseable_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        let (_, warnings) = load_config(&path);
        assert_eq!(warnings.len(), 1);
    }
}
