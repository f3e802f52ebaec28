use std::io;

use crate::share::IssueError;

/// Everything that can abort an export.
///
/// Access denial is deliberately absent: a denied path is skipped
/// and never surfaces to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("malformed encoding in requested path {token:?}")]
    MalformedEncoding { token: String },
    #[error("unsupported export format: {0:?}")]
    UnsupportedFormat(String),
    #[error("not found: {path}")]
    NotFound {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("secure random source unavailable: {0}")]
    RandomSource(String),
    #[error("failed to persist share link: {0}")]
    Persistence(String),
}

impl ExportError {
    /// Classify an I/O failure encountered while visiting `path`.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            ExportError::NotFound { path, source }
        } else {
            ExportError::Io { path, source }
        }
    }

    /// True for errors detectable before any output is produced.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExportError::MalformedEncoding { .. } | ExportError::UnsupportedFormat(_)
        )
    }
}

impl From<IssueError> for ExportError {
    fn from(err: IssueError) -> Self {
        match err {
            IssueError::RandomSource(msg) => ExportError::RandomSource(msg),
            IssueError::Persistence(e) => ExportError::Persistence(e.to_string()),
        }
    }
}
