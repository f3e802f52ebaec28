//! Recursive exporters
//!
//! Both exporters share one traversal contract:
//!
//! - paths are visited depth-first, in target order, children in the order
//!   the filesystem lists them;
//! - the access filter is consulted for every node, and a denied node is
//!   skipped together with its whole subtree without raising an error;
//! - any stat, open, list, sink or link issuance failure aborts the export
//!   at once. Output already flushed to the sink stays there; there is no
//!   rollback.

mod archive;
mod playlist;

pub use archive::export_archive;
pub use playlist::{export_playlist, PlaylistExport, DOWNLOAD_ROUTE, PLAYLIST_HEADER};

/// What one export visited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// File entries written (archive) or playlist lines emitted
    pub files: usize,
    /// Directory entries written
    pub dirs: usize,
    /// Nodes skipped by the access filter (subtrees count once)
    pub denied: usize,
    /// Files left out of a playlist because they are not audio or video
    pub ignored: usize,
}
