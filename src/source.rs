//! Producer-side frame sources.
//!
//! A [`FrameSource`] stands in for the capture device that feeds a
//! [`FrameClient`](crate::client::FrameClient). The client pulls one encoded
//! frame per tick and calls [`FrameSource::release`] whenever its
//! connection cycle fails, so the device can be reopened cleanly on the next
//! attempt.

use std::{
    io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::frame::Frame;

/// Errors reported by a [`FrameSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source cannot be opened or has nothing to read.
    #[error("frame source unavailable: {reason}")]
    Unavailable {
        reason: String,
        #[source]
        source: Option<io::Error>,
    },
    /// One frame could not be produced; later frames may succeed.
    #[error("failed to encode frame: {0}")]
    Encode(String),
}

impl SourceError {
    /// Whether the failure only affects the current frame.
    #[must_use]
    pub const fn is_transient(&self) -> bool { matches!(self, Self::Encode(_)) }
}

/// Produces encoded frames for the client to transmit.
#[async_trait]
pub trait FrameSource: Send {
    /// Produce the next encoded frame.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Encode`] when this frame should be skipped and
    /// [`SourceError::Unavailable`] when the source must be released and
    /// reopened.
    async fn next_frame(&mut self) -> Result<Frame, SourceError>;

    /// Release any underlying device or handle. The next call to
    /// [`next_frame`](Self::next_frame) reopens it.
    fn release(&mut self) {}
}

/// Cycles through the JPEG files of a directory in file-name order.
///
/// The listing is read lazily on first use and kept until
/// [`release`](FrameSource::release) is called.
///
/// # Examples
///
/// ```no_run
/// use framerelay::source::{DirectorySource, FrameSource};
///
/// # async fn demo() -> Result<(), framerelay::source::SourceError> {
/// let mut source = DirectorySource::new("./frames");
/// let frame = source.next_frame().await?;
/// println!("{} bytes", frame.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DirectorySource {
    dir: PathBuf,
    files: Option<Vec<PathBuf>>,
    cursor: usize,
}

impl DirectorySource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: None,
            cursor: 0,
        }
    }

    /// Directory frames are read from.
    #[must_use]
    pub fn dir(&self) -> &Path { &self.dir }

    async fn scan(&self) -> Result<Vec<PathBuf>, SourceError> {
        let unavailable = |reason: &str, err: Option<io::Error>| SourceError::Unavailable {
            reason: format!("{}: {reason}", self.dir.display()),
            source: err,
        };

        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| unavailable("cannot read directory", Some(e)))?;
        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| unavailable("cannot list directory", Some(e)))?
        {
            let path = entry.path();
            if is_jpeg(&path) {
                files.push(path);
            }
        }
        if files.is_empty() {
            return Err(unavailable("no .jpg or .jpeg files", None));
        }
        files.sort();
        debug!(dir = %self.dir.display(), count = files.len(), "scanned frame directory");
        Ok(files)
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
}

#[async_trait]
impl FrameSource for DirectorySource {
    async fn next_frame(&mut self) -> Result<Frame, SourceError> {
        let files = match self.files.take() {
            Some(files) => files,
            None => {
                self.cursor = 0;
                self.scan().await?
            }
        };
        let index = self.cursor % files.len();
        let path = files.get(index).cloned();
        self.cursor = index + 1;
        self.files = Some(files);

        let Some(path) = path else {
            return Err(SourceError::Encode("frame index out of range".to_owned()));
        };
        fs::read(&path)
            .await
            .map(Frame::new)
            .map_err(|e| SourceError::Encode(format!("{}: {e}", path.display())))
    }

    fn release(&mut self) {
        self.files = None;
        self.cursor = 0;
    }
}
