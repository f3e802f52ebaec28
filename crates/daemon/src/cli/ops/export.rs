use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::Args;

use common::prelude::*;

/// Export part of a local directory into an archive file.
#[derive(Args, Debug, Clone)]
pub struct Export {
    /// Directory the export is rooted at
    #[arg(long)]
    pub root: PathBuf,

    /// Comma separated, percent-encoded names relative to the root
    #[arg(long)]
    pub files: Option<String>,

    /// Archive format token (zip, tar, targz, tarbz2, tarxz, tarlz4, tarsz)
    #[arg(long, default_value = "zip")]
    pub algo: String,

    /// Output archive
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportOpError {
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("playlists need the daemon's link store, use `algo` with an archive format")]
    PlaylistUnsupported,
    #[error("failed to create {0}: {1}")]
    Output(PathBuf, std::io::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Export {
    type Error = ExportOpError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let archive = match self.algo.parse::<ExportFormat>()? {
            ExportFormat::Archive(archive) => archive,
            ExportFormat::Playlist => return Err(ExportOpError::PlaylistUnsupported),
        };
        let target = ExportTarget::resolve(self.files.as_deref(), "/")?;
        let base = naming_base(&target);

        let out = File::create(&self.out).map_err(|e| ExportOpError::Output(self.out.clone(), e))?;
        let fs = BasePathFs::new(&self.root);
        let summary = export_archive(
            &fs,
            &AllowAll,
            &target,
            archive,
            &base,
            BufWriter::new(out),
        )?;

        Ok(format!(
            "Wrote {} ({} files, {} directories)",
            self.out.display(),
            summary.files,
            summary.dirs
        ))
    }
}
