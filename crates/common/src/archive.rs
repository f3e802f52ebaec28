//! Streaming archive writers.
//!
//! Every codec writes forward-only into the sink, so bytes can leave for the
//! client while later entries are still being read. Zip entries carry data
//! descriptors instead of back-patched headers for the same reason.

use std::io::{self, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use flate2::write::GzEncoder;
use tar::{EntryType, Header};
use time::OffsetDateTime;
use zip::write::{SimpleFileOptions, StreamWriter};
use zip::{CompressionMethod, ZipWriter};

use crate::format::ArchiveFormat;
use crate::fs::FileNode;

/// One open archive over a sink. Exclusively owned by a single export.
pub struct ArchiveWriter<W: Write> {
    inner: Inner<W>,
}

enum Inner<W: Write> {
    Zip(Box<ZipWriter<StreamWriter<W>>>),
    Tar(tar::Builder<Compressor<W>>),
}

impl<W: Write> ArchiveWriter<W> {
    /// Open a writer of `format` over `sink`.
    pub fn create(format: ArchiveFormat, sink: W) -> io::Result<Self> {
        let inner = match format {
            ArchiveFormat::Zip => Inner::Zip(Box::new(ZipWriter::new_stream(sink))),
            tarball => {
                let mut builder = tar::Builder::new(Compressor::new(tarball, sink)?);
                builder.follow_symlinks(false);
                Inner::Tar(builder)
            }
        };
        Ok(Self { inner })
    }

    /// Append one entry named `name`. Directories take no content and are
    /// written with a trailing separator.
    pub fn append(
        &mut self,
        name: &str,
        node: &FileNode,
        content: Option<&mut dyn Read>,
    ) -> io::Result<()> {
        match &mut self.inner {
            Inner::Zip(zip) => append_zip(zip, name, node, content),
            Inner::Tar(builder) => append_tar(builder, name, node, content),
        }
    }

    /// Write trailing codec framing and flush the sink.
    pub fn finish(self) -> io::Result<()> {
        match self.inner {
            Inner::Zip(zip) => {
                let mut stream = zip.finish().map_err(zip_error)?;
                stream.flush()
            }
            Inner::Tar(builder) => {
                let compressor = builder.into_inner()?;
                let mut sink = compressor.finish()?;
                sink.flush()
            }
        }
    }
}

fn append_zip<W: Write>(
    zip: &mut ZipWriter<StreamWriter<W>>,
    name: &str,
    node: &FileNode,
    content: Option<&mut dyn Read>,
) -> io::Result<()> {
    let options = SimpleFileOptions::default()
        .compression_method(if node.is_dir {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        })
        .last_modified_time(zip_time(node.modified))
        .unix_permissions(node.mode)
        .large_file(node.size >= u64::from(u32::MAX));

    if node.is_dir {
        return zip.add_directory(name, options).map_err(zip_error);
    }

    zip.start_file(name, options).map_err(zip_error)?;
    if let Some(reader) = content {
        io::copy(reader, zip)?;
    }
    Ok(())
}

fn append_tar<W: Write>(
    builder: &mut tar::Builder<W>,
    name: &str,
    node: &FileNode,
    content: Option<&mut dyn Read>,
) -> io::Result<()> {
    let mut header = Header::new_gnu();
    header.set_mode(node.mode);
    header.set_mtime(unix_seconds(node.modified));

    if node.is_dir {
        header.set_entry_type(EntryType::Directory);
        header.set_size(0);
        let name = format!("{}/", name.trim_end_matches('/'));
        return builder.append_data(&mut header, name, io::empty());
    }

    header.set_entry_type(EntryType::Regular);
    header.set_size(node.size);
    match content {
        // Entry size is fixed by the header; hold the reader to it.
        Some(reader) => {
            let mut body = Counted {
                inner: reader.take(node.size),
                read: 0,
            };
            builder.append_data(&mut header, name, &mut body)?;
            if body.read < node.size {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "{name}: read {} of {} bytes, file shrank while archiving",
                        body.read, node.size
                    ),
                ));
            }
            Ok(())
        }
        None => {
            header.set_size(0);
            builder.append_data(&mut header, name, io::empty())
        }
    }
}

/// Reader that tallies the bytes it hands out.
struct Counted<R> {
    inner: R,
    read: u64,
}

impl<R: Read> Read for Counted<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.read += n as u64;
        Ok(n)
    }
}

/// Compression stage underneath the tar stream.
enum Compressor<W: Write> {
    Plain(W),
    Gz(GzEncoder<W>),
    Bz2(bzip2::write::BzEncoder<W>),
    Xz(xz2::write::XzEncoder<W>),
    Lz4(lz4_flex::frame::FrameEncoder<W>),
    Snappy(snap::write::FrameEncoder<W>),
}

impl<W: Write> Compressor<W> {
    fn new(format: ArchiveFormat, sink: W) -> io::Result<Self> {
        Ok(match format {
            ArchiveFormat::Tar => Compressor::Plain(sink),
            ArchiveFormat::TarGz => {
                Compressor::Gz(GzEncoder::new(sink, flate2::Compression::default()))
            }
            ArchiveFormat::TarBz2 => Compressor::Bz2(bzip2::write::BzEncoder::new(
                sink,
                bzip2::Compression::default(),
            )),
            ArchiveFormat::TarXz => Compressor::Xz(xz2::write::XzEncoder::new(sink, 6)),
            ArchiveFormat::TarLz4 => Compressor::Lz4(lz4_flex::frame::FrameEncoder::new(sink)),
            ArchiveFormat::TarSz => Compressor::Snappy(snap::write::FrameEncoder::new(sink)),
            ArchiveFormat::Zip => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "zip is not a tar compressor",
                ))
            }
        })
    }

    fn finish(self) -> io::Result<W> {
        match self {
            Compressor::Plain(w) => Ok(w),
            Compressor::Gz(enc) => enc.finish(),
            Compressor::Bz2(enc) => enc.finish(),
            Compressor::Xz(enc) => enc.finish(),
            Compressor::Lz4(enc) => enc.finish().map_err(io::Error::other),
            Compressor::Snappy(enc) => enc
                .into_inner()
                .map_err(|e| io::Error::other(e.to_string())),
        }
    }
}

impl<W: Write> Write for Compressor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Compressor::Plain(w) => w.write(buf),
            Compressor::Gz(w) => w.write(buf),
            Compressor::Bz2(w) => w.write(buf),
            Compressor::Xz(w) => w.write(buf),
            Compressor::Lz4(w) => w.write(buf),
            Compressor::Snappy(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Compressor::Plain(w) => w.flush(),
            Compressor::Gz(w) => w.flush(),
            Compressor::Bz2(w) => w.flush(),
            Compressor::Xz(w) => w.flush(),
            Compressor::Lz4(w) => w.flush(),
            Compressor::Snappy(w) => w.flush(),
        }
    }
}

fn zip_error(err: zip::result::ZipError) -> io::Error {
    match err {
        zip::result::ZipError::Io(e) => e,
        other => io::Error::other(other),
    }
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn zip_time(time: SystemTime) -> zip::DateTime {
    let Ok(secs) = i64::try_from(unix_seconds(time)) else {
        return zip::DateTime::default();
    };
    let Ok(dt) = OffsetDateTime::from_unix_timestamp(secs) else {
        return zip::DateTime::default();
    };
    zip::DateTime::from_date_and_time(
        dt.year().clamp(1980, 2107) as u16,
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
    )
    .unwrap_or_default()
}
