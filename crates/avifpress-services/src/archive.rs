//! Streaming ZIP assembly
//!
//! Builds the archive on a blocking thread and hands finished byte ranges to
//! the HTTP response through a bounded channel, so the full archive is never
//! buffered in memory. The ZIP writer needs `Write + Seek`; the sink below
//! keeps only the not-yet-final tail of the stream in memory and flushes
//! everything before a backward seek target, since the writer only seeks
//! back to patch an entry's local header once all earlier bytes are final.

use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use avifpress_core::SessionArtifact;
use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

const COMPRESSION_LEVEL: i32 = 9;
const CHUNK_SIZE: usize = 64 * 1024;

/// Timestamped download name for a session archive.
pub fn archive_filename(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("converted-images-{}.zip", now.format("%Y%m%d-%H%M%S"))
}

/// Assemble a ZIP of the given artifacts as a byte stream. Assembly starts
/// immediately on a blocking thread; dropping the stream aborts it.
pub fn stream_zip(
    artifacts: Vec<SessionArtifact>,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
    let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(8);

    tokio::task::spawn_blocking(move || {
        if let Err(e) = write_archive(artifacts, &tx) {
            if e.kind() == io::ErrorKind::BrokenPipe {
                tracing::debug!("Archive consumer disconnected, aborting assembly");
            } else {
                tracing::error!(error = %e, "Archive assembly failed");
                let _ = tx.blocking_send(Err(e));
            }
        }
    });

    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    })
}

fn write_archive(
    artifacts: Vec<SessionArtifact>,
    tx: &mpsc::Sender<io::Result<Bytes>>,
) -> io::Result<()> {
    let sink = ChannelSink::new(tx.clone());
    let mut zip = ZipWriter::new(sink);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL))
        .unix_permissions(0o644);

    for (index, artifact) in artifacts.iter().enumerate() {
        let entry_name =
            sanitize_entry_name(&artifact.filename, &format!("image-{}.avif", index + 1));
        zip.start_file(entry_name, options).map_err(into_io)?;
        zip.write_all(&artifact.bytes)?;
    }

    let sink = zip.finish().map_err(into_io)?;
    sink.finalize()
}

fn into_io(e: zip::result::ZipError) -> io::Error {
    match e {
        zip::result::ZipError::Io(io_err) => io_err,
        other => io::Error::new(io::ErrorKind::Other, other.to_string()),
    }
}

/// Archive entries use the base name only; path components would let one
/// artifact escape the extraction directory.
fn sanitize_entry_name(filename: &str, fallback: &str) -> String {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .unwrap_or(fallback)
        .to_string()
}

/// `Write + Seek` over a byte channel.
///
/// Invariant: `base <= pos <= base + buf.len()`, where `base` is the stream
/// offset of `buf[0]` and everything before `base` has been sent. A seek
/// before `base` is an error; the ZIP writer never does that.
struct ChannelSink {
    tx: mpsc::Sender<io::Result<Bytes>>,
    buf: Vec<u8>,
    base: u64,
    pos: u64,
}

impl ChannelSink {
    fn new(tx: mpsc::Sender<io::Result<Bytes>>) -> Self {
        Self {
            tx,
            buf: Vec::new(),
            base: 0,
            pos: 0,
        }
    }

    /// Send `buf[..upto]` down the channel and advance `base` accordingly.
    fn flush_prefix(&mut self, upto: usize) -> io::Result<()> {
        let finalized: Vec<u8> = self.buf.drain(..upto).collect();
        self.base += finalized.len() as u64;
        self.send(finalized)
    }

    fn send(&self, data: Vec<u8>) -> io::Result<()> {
        let bytes = Bytes::from(data);
        for chunk in (0..bytes.len()).step_by(CHUNK_SIZE) {
            let end = (chunk + CHUNK_SIZE).min(bytes.len());
            self.tx
                .blocking_send(Ok(bytes.slice(chunk..end)))
                .map_err(|_| {
                    io::Error::new(io::ErrorKind::BrokenPipe, "archive consumer disconnected")
                })?;
        }
        Ok(())
    }

    /// Flush whatever remains after the writer is done.
    fn finalize(mut self) -> io::Result<()> {
        let rest = std::mem::take(&mut self.buf);
        self.send(rest)
    }
}

impl Write for ChannelSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let idx = (self.pos - self.base) as usize;
        let end = idx + data.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[idx..end].copy_from_slice(data);
        self.pos += data.len() as u64;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Bytes in the tail may still be patched; only seeks finalize them.
        Ok(())
    }
}

impl Seek for ChannelSink {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        let len = self.buf.len() as u64;
        let target = match from {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(offset) => (self.base + len) as i64 + offset,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
        };
        if target < 0 || (target as u64) < self.base {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before the flushed region",
            ));
        }
        let target = target as u64;

        if target < self.pos {
            // Backward seek: everything before the target is final.
            self.flush_prefix((target - self.base) as usize)?;
        } else if target > self.base + len {
            let grow = (target - self.base) as usize;
            self.buf.resize(grow, 0);
        }
        self.pos = target;
        Ok(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::StreamExt;
    use std::io::Read;

    fn artifact(filename: &str, data: Vec<u8>) -> SessionArtifact {
        SessionArtifact {
            filename: filename.to_string(),
            original_name: filename.to_string(),
            bytes: Bytes::from(data),
        }
    }

    async fn collect(artifacts: Vec<SessionArtifact>) -> Vec<u8> {
        let mut stream = Box::pin(stream_zip(artifacts));
        let mut out = Vec::new();
        while let Some(chunk) = stream.next().await {
            out.extend_from_slice(&chunk.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_zip_roundtrip() {
        // Large enough to span several chunks and trigger header patching
        let first: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let second = vec![42u8; 1000];

        let data = collect(vec![
            artifact("a.avif", first.clone()),
            artifact("b.avif", second.clone()),
        ])
        .await;

        let mut archive = zip::ZipArchive::new(io::Cursor::new(data)).unwrap();
        assert_eq!(archive.len(), 2);

        let mut extracted = Vec::new();
        archive
            .by_name("a.avif")
            .unwrap()
            .read_to_end(&mut extracted)
            .unwrap();
        assert_eq!(extracted, first);

        extracted.clear();
        archive
            .by_name("b.avif")
            .unwrap()
            .read_to_end(&mut extracted)
            .unwrap();
        assert_eq!(extracted, second);
    }

    #[tokio::test]
    async fn test_entry_names_are_sanitized() {
        let data = collect(vec![artifact("../../escape.avif", vec![1, 2, 3])]).await;

        let archive = zip::ZipArchive::new(io::Cursor::new(data)).unwrap();
        let names: Vec<_> = archive.file_names().collect();
        assert_eq!(names, vec!["escape.avif"]);
    }

    #[tokio::test]
    async fn test_empty_session_yields_empty_archive() {
        let data = collect(Vec::new()).await;
        let archive = zip::ZipArchive::new(io::Cursor::new(data)).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[tokio::test]
    async fn test_dropping_stream_does_not_panic() {
        let big: Vec<u8> = (0..2_000_000u32).map(|i| (i % 255) as u8).collect();
        let mut stream = Box::pin(stream_zip(vec![artifact("big.avif", big)]));
        let _ = stream.next().await;
        drop(stream);
    }

    #[test]
    fn test_sanitize_entry_name() {
        assert_eq!(sanitize_entry_name("photo.avif", "x"), "photo.avif");
        assert_eq!(sanitize_entry_name("../../etc/passwd", "x"), "passwd");
        assert_eq!(sanitize_entry_name("..", "image-1.avif"), "image-1.avif");
        assert_eq!(sanitize_entry_name("", "image-1.avif"), "image-1.avif");
    }

    #[test]
    fn test_archive_filename_format() {
        let now = chrono::Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(archive_filename(now), "converted-images-20260314-092653.zip");
    }
}
