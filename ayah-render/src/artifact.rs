//! Temporary render artifacts
//!
//! A `RenderArtifact` owns the temporary output path of one render. The file
//! is removed exactly once: when the artifact is dropped on an error path, or
//! when the `ArtifactStream` built from it finishes or is dropped (including
//! a caller disconnecting mid-download).

use axum::body::Bytes;
use futures::Stream;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempPath;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::debug;

/// Temporary MP4 output owned by a single request
#[derive(Debug)]
pub struct RenderArtifact {
    path: TempPath,
}

impl RenderArtifact {
    /// Reserve `video-<unix-millis>-<random>.mp4` inside `dir`
    pub fn allocate(dir: &Path) -> io::Result<Self> {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let file = tempfile::Builder::new()
            .prefix(&format!("video-{}-", millis))
            .suffix(".mp4")
            .tempfile_in(dir)?;

        let path = file.into_temp_path();
        debug!(path = %path.display(), "Allocated render artifact");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the rendered file for streaming
    ///
    /// Fails for an empty file, so a response is only committed to
    /// `video/mp4` once there is something playable to send.
    pub async fn open(self) -> io::Result<ArtifactStream> {
        let file = File::open(&self.path).await?;
        let len = file.metadata().await?.len();
        if len == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "render produced an empty file",
            ));
        }

        Ok(ArtifactStream {
            inner: ReaderStream::new(file),
            len,
            artifact: Some(self),
        })
    }
}

/// Byte stream over a rendered artifact; deletes the file when done
pub struct ArtifactStream {
    inner: ReaderStream<File>,
    len: u64,
    artifact: Option<RenderArtifact>,
}

impl ArtifactStream {
    /// Size of the artifact in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Stream for ArtifactStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let item = ready!(Pin::new(&mut this.inner).poll_next(cx));
        if !matches!(item, Some(Ok(_))) {
            if let Some(artifact) = this.artifact.take() {
                debug!(path = %artifact.path().display(), "Stream finished, removing artifact");
            }
        }
        Poll::Ready(item)
    }
}
