//! Bridge from the synchronous exporters onto a streamed response body.
//!
//! The export runs on a blocking thread and writes into a [`ChannelWriter`]
//! behind a [`BufWriter`]. Chunks cross a bounded channel, so a slow client
//! slows the walk down instead of buffering the archive in memory.

use std::io::{self, BufWriter, Read, Write};

use axum::body::Body;
use bytes::Bytes;
use futures::StreamExt;

use common::prelude::{ExportError, FileNode, FileSystem};

/// Bytes buffered before a chunk is handed to the response.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks in flight between the export thread and the response.
const CHANNEL_DEPTH: usize = 8;

type Chunk = Result<Bytes, ExportError>;

/// Sink that forwards every write as one body chunk.
pub struct ChannelWriter {
    tx: flume::Sender<Chunk>,
}

impl Write for ChannelWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .send(Ok(Bytes::copy_from_slice(buf)))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub type ExportSink = BufWriter<ChannelWriter>;

/// Run `export` on a blocking thread and wait until it produces its first
/// chunk.
///
/// Failures before that point come back as `Err`, so the caller can still
/// answer with a proper status. Later failures end the body with an error
/// and the client sees a truncated download.
pub async fn spawn_export<F>(export: F) -> Result<Body, ExportError>
where
    F: FnOnce(&mut ExportSink) -> Result<(), ExportError> + Send + 'static,
{
    let (tx, rx) = flume::bounded::<Chunk>(CHANNEL_DEPTH);

    tokio::task::spawn_blocking(move || {
        let mut sink = BufWriter::with_capacity(CHUNK_SIZE, ChannelWriter { tx: tx.clone() });
        let result = export(&mut sink).and_then(|()| {
            sink.flush()
                .map_err(|e| ExportError::io("/", e))
        });
        // Whatever is still buffered after a failure belongs to a broken
        // entry and never reaches the client.
        let (_writer, _unsent) = sink.into_parts();
        if let Err(err) = result {
            tracing::error!(error = %err, "export aborted");
            let _ = tx.send(Err(err));
        }
    });

    let first = match rx.recv_async().await {
        Ok(Ok(chunk)) => chunk,
        Ok(Err(err)) => return Err(err),
        // Finished without writing anything
        Err(flume::RecvError::Disconnected) => return Ok(Body::empty()),
    };

    let rest = rx.into_stream();
    let stream = futures::stream::once(async move { Ok::<_, ExportError>(first) }).chain(rest);
    Ok(Body::from_stream(stream))
}

/// Stream one file's content.
pub async fn spawn_file<S>(fs: S, node: FileNode) -> Result<Body, ExportError>
where
    S: FileSystem + Send + 'static,
{
    spawn_export(move |sink| {
        let mut reader = fs
            .open(&node.path)
            .map_err(|e| ExportError::io(&node.path, e))?;
        io::copy(&mut (&mut reader).take(node.size), sink)
            .map_err(|e| ExportError::io(&node.path, e))?;
        Ok(())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(body: Body) -> Result<Vec<u8>, axum::Error> {
        axum::body::to_bytes(body, usize::MAX)
            .await
            .map(|b| b.to_vec())
    }

    #[tokio::test]
    async fn test_small_output_arrives_in_one_piece() {
        let body = spawn_export(|sink| {
            sink.write_all(b"hello").map_err(|e| ExportError::io("/", e))
        })
        .await
        .unwrap();
        assert_eq!(collect(body).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_early_failure_is_reported_before_the_body() {
        let result = spawn_export(|sink| {
            sink.write_all(b"partial entry")
                .map_err(|e| ExportError::io("/", e))?;
            Err(ExportError::io(
                "/a",
                io::Error::from(io::ErrorKind::NotFound),
            ))
        })
        .await;
        assert!(matches!(result, Err(ExportError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_late_failure_truncates_the_body() {
        let body = spawn_export(|sink| {
            sink.write_all(&vec![7u8; CHUNK_SIZE * 2])
                .map_err(|e| ExportError::io("/", e))?;
            Err(ExportError::io("/b", io::Error::other("disk gone")))
        })
        .await
        .unwrap();
        assert!(collect(body).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_export() {
        let body = spawn_export(|_| Ok(())).await.unwrap();
        assert!(collect(body).await.unwrap().is_empty());
    }
}
