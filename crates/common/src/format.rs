use std::str::FromStr;

use crate::error::ExportError;

/// The closed set of streaming archive codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    TarXz,
    TarLz4,
    TarSz,
}

impl ArchiveFormat {
    pub const ALL: [ArchiveFormat; 7] = [
        ArchiveFormat::Zip,
        ArchiveFormat::Tar,
        ArchiveFormat::TarGz,
        ArchiveFormat::TarBz2,
        ArchiveFormat::TarXz,
        ArchiveFormat::TarLz4,
        ArchiveFormat::TarSz,
    ];

    /// File name suffix, including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => ".zip",
            ArchiveFormat::Tar => ".tar",
            ArchiveFormat::TarGz => ".tar.gz",
            ArchiveFormat::TarBz2 => ".tar.bz2",
            ArchiveFormat::TarXz => ".tar.xz",
            ArchiveFormat::TarLz4 => ".tar.lz4",
            ArchiveFormat::TarSz => ".tar.sz",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "application/zip",
            ArchiveFormat::Tar => "application/x-tar",
            ArchiveFormat::TarGz => "application/gzip",
            ArchiveFormat::TarBz2 => "application/x-bzip2",
            ArchiveFormat::TarXz => "application/x-xz",
            ArchiveFormat::TarLz4 => "application/x-lz4",
            ArchiveFormat::TarSz => "application/x-snappy-framed",
        }
    }

    /// The `algo` token that selects this format.
    pub fn token(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "targz",
            ArchiveFormat::TarBz2 => "tarbz2",
            ArchiveFormat::TarXz => "tarxz",
            ArchiveFormat::TarLz4 => "tarlz4",
            ArchiveFormat::TarSz => "tarsz",
        }
    }
}

/// What an export produces: an archive or an m3u playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Archive(ArchiveFormat),
    Playlist,
}

impl ExportFormat {
    pub const PLAYLIST_TOKEN: &'static str = "m3u";

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Archive(format) => format.extension(),
            ExportFormat::Playlist => ".m3u",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Archive(format) => format.content_type(),
            ExportFormat::Playlist => "audio/x-mpegurl",
        }
    }

    /// Download name used when the export root has no name of its own.
    pub fn fallback_name(self) -> &'static str {
        match self {
            ExportFormat::Archive(_) => "archive",
            ExportFormat::Playlist => "playlist",
        }
    }

    /// Download file name for an export rooted at a directory called `root_name`.
    pub fn file_name(self, root_name: &str) -> String {
        let stem = match root_name {
            "" | "." | "/" => self.fallback_name(),
            name => name,
        };
        format!("{stem}{}", self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let format = match token {
            "zip" | "true" | "" => ArchiveFormat::Zip,
            "tar" => ArchiveFormat::Tar,
            "targz" => ArchiveFormat::TarGz,
            "tarbz2" => ArchiveFormat::TarBz2,
            "tarxz" => ArchiveFormat::TarXz,
            "tarlz4" => ArchiveFormat::TarLz4,
            "tarsz" => ArchiveFormat::TarSz,
            Self::PLAYLIST_TOKEN => return Ok(ExportFormat::Playlist),
            other => return Err(ExportError::UnsupportedFormat(other.to_string())),
        };
        Ok(ExportFormat::Archive(format))
    }
}
