// LogRelay - app/query.rs
//
// Point-in-time query path: validate, read the whole file, filter, reverse,
// paginate.
//
// Ordering of checks matters: every request-level check (blank name, page
// bounds, traversal) runs before the filesystem is touched, then file-level
// checks (existence, type, extension, size cap) run before the content is
// read. Downloads share the file checks and the filter engine. Neither
// touches the tail path's offsets or state, so both run concurrently with
// live tailing without coordination.

use crate::core::filter;
use crate::core::model::{QueryRequest, QueryResponse};
use crate::core::paging;
use crate::platform::config::AppConfig;
use crate::platform::fs as pfs;
use crate::util::error::QueryError;
use std::io::{self, Write};
use std::path::PathBuf;

/// Settings the query path needs, taken from `AppConfig`.
#[derive(Debug, Clone)]
pub struct QuerySettings {
    pub log_root: PathBuf,
    pub allowed_extensions: Vec<String>,
    pub max_file_size_mb: u64,
    pub max_page_size: usize,
    pub enable_security: bool,
}

impl From<&AppConfig> for QuerySettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            log_root: config.log_path.clone(),
            allowed_extensions: config.allowed_extensions.clone(),
            max_file_size_mb: config.max_file_size_mb,
            max_page_size: config.max_page_size,
            enable_security: config.enable_security,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryService {
    settings: QuerySettings,
}

impl QueryService {
    pub fn new(settings: QuerySettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// Check a requested file name. No filesystem access.
    pub fn validate_file_name(&self, file_name: &str) -> Result<(), QueryError> {
        if file_name.trim().is_empty() {
            return Err(QueryError::BlankFileName);
        }
        if self.settings.enable_security && !pfs::is_safe_file_name(file_name) {
            return Err(QueryError::IllegalFileName {
                file_name: file_name.to_string(),
            });
        }
        Ok(())
    }

    /// Check the request itself. No filesystem access.
    pub fn validate_request(&self, req: &QueryRequest) -> Result<(), QueryError> {
        if req.file_name.trim().is_empty() {
            return Err(QueryError::BlankFileName);
        }
        if req.page < 1 {
            return Err(QueryError::InvalidPage { page: req.page });
        }
        if req.page_size < 1 || req.page_size > self.settings.max_page_size {
            return Err(QueryError::InvalidPageSize {
                page_size: req.page_size,
                max: self.settings.max_page_size,
            });
        }
        self.validate_file_name(&req.file_name)
    }

    /// Resolve `file_name` under the log root and check it may be served.
    /// Returns the path and its metadata.
    pub fn resolve_file(&self, file_name: &str) -> Result<(PathBuf, std::fs::Metadata), QueryError> {
        let path = self.settings.log_root.join(file_name);

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(QueryError::FileNotFound { path });
            }
            Err(e) => return Err(QueryError::Io { path, source: e }),
        };
        if !metadata.is_file() {
            return Err(QueryError::NotAFile { path });
        }
        if !pfs::has_allowed_extension(file_name, &self.settings.allowed_extensions) {
            return Err(QueryError::UnsupportedExtension { path });
        }

        let size_mb = pfs::size_in_mb(metadata.len());
        if size_mb > self.settings.max_file_size_mb {
            return Err(QueryError::FileTooLarge {
                path,
                size_mb,
                max_mb: self.settings.max_file_size_mb,
            });
        }

        Ok((path, metadata))
    }

    /// Run a filtered, paginated query.
    pub fn query(&self, req: &QueryRequest) -> Result<QueryResponse, QueryError> {
        self.validate_request(req)?;
        let (path, metadata) = self.resolve_file(&req.file_name)?;

        let lines = pfs::read_lines_lossy(&path).map_err(|e| {
            tracing::error!(file = %path.display(), error = %e, "Query: failed to read log file");
            QueryError::Io {
                path: path.clone(),
                source: e,
            }
        })?;
        let total_in_file = lines.len();

        let spec = req.filter_spec();
        let filtered = filter::filter_lines(lines, &spec);
        let page = paging::paginate(filtered, req.page, req.page_size, req.reverse);

        tracing::debug!(
            file = %path.display(),
            total_in_file,
            matched = page.total_lines,
            page = page.current_page,
            total_pages = page.total_pages,
            "Query served"
        );

        Ok(QueryResponse {
            lines: page.lines,
            total_lines: page.total_lines,
            current_page: page.current_page,
            total_pages: page.total_pages,
            file_size: metadata.len(),
            last_modified: pfs::modified_utc(&metadata),
        })
    }

    /// Write the file to `out` for download.
    ///
    /// With any filter field set, only the matching lines are written, one per
    /// line, in file order. Without a filter the file's bytes are copied
    /// unchanged. Paging fields are ignored.
    pub fn download<W: Write>(&self, req: &QueryRequest, mut out: W) -> Result<DownloadSummary, QueryError> {
        self.validate_file_name(&req.file_name)?;
        let (path, _) = self.resolve_file(&req.file_name)?;
        let write_err = |e: io::Error| QueryError::Write {
            file_name: req.file_name.clone(),
            source: e,
        };

        let spec = req.filter_spec();
        let summary = if spec.is_empty() {
            let mut file = std::fs::File::open(&path).map_err(|e| QueryError::Io {
                path: path.clone(),
                source: e,
            })?;
            let bytes = io::copy(&mut file, &mut out).map_err(write_err)?;
            DownloadSummary {
                filtered: false,
                lines: None,
                bytes,
            }
        } else {
            let lines = pfs::read_lines_lossy(&path).map_err(|e| QueryError::Io {
                path: path.clone(),
                source: e,
            })?;
            let kept = filter::filter_lines(lines, &spec);
            let mut bytes = 0u64;
            for line in &kept {
                writeln!(out, "{line}").map_err(write_err)?;
                bytes += line.len() as u64 + 1;
            }
            DownloadSummary {
                filtered: true,
                lines: Some(kept.len()),
                bytes,
            }
        };
        out.flush().map_err(write_err)?;

        tracing::info!(
            file = %path.display(),
            filtered = summary.filtered,
            bytes = summary.bytes,
            "Download served"
        );
        Ok(summary)
    }
}

/// What a download wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    /// True when a filter was applied.
    pub filtered: bool,
    /// Lines written; only counted for filtered downloads.
    pub lines: Option<usize>,
    pub bytes: u64,
}
