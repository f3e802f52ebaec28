/**
 * Per-path authorization predicate consulted
 *  at every node of an export walk.
 */
pub mod access;
/**
 * Streaming archive writers over the supported
 *  zip and tar codecs.
 */
pub mod archive;
pub mod error;
/**
 * The recursive exporters: archive and playlist.
 *  Both walk depth-first, skip denied subtrees
 *  silently and abort on the first I/O failure.
 */
pub mod export;
/**
 * Format selection from the `algo` query token.
 */
pub mod format;
/**
 * Narrow filesystem capability and an on-disk
 *  implementation confined to a base directory.
 */
pub mod fs;
/**
 * Coarse media kind inference for playlist entries.
 */
pub mod media;
/**
 * Request path resolution and common-base computation.
 */
pub mod path;
/**
 * Ephemeral share links: token minting, expiry,
 *  and the persistence seam.
 */
pub mod share;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

pub mod prelude {
    pub use crate::access::{AccessCheck, AllowAll};
    pub use crate::archive::ArchiveWriter;
    pub use crate::error::ExportError;
    pub use crate::export::{export_archive, export_playlist, ExportSummary, PlaylistExport};
    pub use crate::format::{ArchiveFormat, ExportFormat};
    pub use crate::fs::{BasePathFs, FileNode, FileSystem};
    pub use crate::media::{MediaClassifier, MediaKind, MimeClassifier};
    pub use crate::path::{naming_base, ExportTarget};
    pub use crate::share::{
        IssueError, LinkIssuer, LinkStore, OsTokenSource, ShareLink, StoreError, TokenSource,
    };
}
