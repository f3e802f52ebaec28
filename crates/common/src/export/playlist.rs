use std::io::Write;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::access::AccessCheck;
use crate::error::ExportError;
use crate::fs::FileSystem;
use crate::media::MediaClassifier;
use crate::path::{base_name, join, ExportTarget};
use crate::share::LinkIssuer;

use super::ExportSummary;

/// First line of every playlist.
pub const PLAYLIST_HEADER: &str = "#EXTM3U";

/// Route prefix under which share links are served.
pub const DOWNLOAD_ROUTE: &str = "/api/public/dl";

// Characters that cannot appear raw inside one URL path segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Everything a playlist export borrows from its caller.
pub struct PlaylistExport<'a> {
    pub fs: &'a dyn FileSystem,
    pub access: &'a dyn AccessCheck,
    pub classifier: &'a dyn MediaClassifier,
    pub issuer: &'a LinkIssuer<'a>,
    /// Principal that will own every minted link
    pub owner: u64,
    /// Externally reachable origin, e.g. `https://files.example.com`
    pub base_url: &'a str,
}

/// Write an m3u playlist of every permitted audio or video file reachable
/// from `target`, minting one share link per entry.
///
/// Links are persisted as they are minted. If the export aborts halfway the
/// links already issued stay valid until they expire.
pub fn export_playlist<W: Write>(
    job: &PlaylistExport<'_>,
    target: &ExportTarget,
    mut sink: W,
) -> Result<ExportSummary, ExportError> {
    writeln!(sink, "{PLAYLIST_HEADER}").map_err(|e| ExportError::io("/", e))?;

    let mut walk = PlaylistWalk {
        job,
        origin: job.base_url.trim_end_matches('/'),
        sink: &mut sink,
        summary: ExportSummary::default(),
    };
    for path in target.iter() {
        walk.visit(path)?;
    }
    let summary = walk.summary;

    sink.flush().map_err(|e| ExportError::io("/", e))?;
    tracing::info!(
        owner = job.owner,
        links = summary.files,
        ignored = summary.ignored,
        denied = summary.denied,
        "playlist export complete"
    );
    Ok(summary)
}

struct PlaylistWalk<'a, 'j, W: Write> {
    job: &'a PlaylistExport<'j>,
    origin: &'a str,
    sink: &'a mut W,
    summary: ExportSummary,
}

impl<W: Write> PlaylistWalk<'_, '_, W> {
    fn visit(&mut self, path: &str) -> Result<(), ExportError> {
        let path = path.replace('\\', "/");
        if !self.job.access.check(&path) {
            tracing::debug!(path = %path, "access denied, skipping subtree");
            self.summary.denied += 1;
            return Ok(());
        }

        let node = self
            .job
            .fs
            .stat(&path)
            .map_err(|e| ExportError::io(&path, e))?;

        if node.is_dir {
            let children = self
                .job
                .fs
                .read_dir_names(&path)
                .map_err(|e| ExportError::io(&path, e))?;
            self.summary.dirs += 1;
            for child in children {
                self.visit(&join(&path, &child))?;
            }
            return Ok(());
        }

        let kind = self.job.classifier.classify(&node);
        if !kind.is_playable() {
            tracing::debug!(path = %path, %kind, "not playable, leaving out");
            self.summary.ignored += 1;
            return Ok(());
        }

        let link = self.job.issuer.issue(&path, self.job.owner)?;
        let name = utf8_percent_encode(base_name(&path), SEGMENT);
        writeln!(
            self.sink,
            "{}{DOWNLOAD_ROUTE}/{}/{name}",
            self.origin, link.hash
        )
        .map_err(|e| ExportError::io(&path, e))?;
        self.summary.files += 1;
        Ok(())
    }
}
