//! Upstream video sources.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use super::StreamError;

/// Schemes a camera address may use. Anything else (`file:`, `concat:`,
/// bare device paths) would let an owner point the capture at local files.
pub const STREAM_URL_SCHEMES: &[&str] = &["http", "https", "rtsp", "rtsps"];

/// Whether `address` is a network camera address the capture may open.
pub fn is_allowed_stream_url(address: &str) -> bool {
    match url::Url::parse(address) {
        Ok(url) => {
            STREAM_URL_SCHEMES.contains(&url.scheme())
                && url.host_str().is_some_and(|h| !h.is_empty())
        }
        Err(_) => false,
    }
}

/// Where a session reads video from.
#[derive(Clone, PartialEq, Eq)]
pub enum Upstream {
    /// Decrypted camera address. Never logged.
    Url(String),
    /// Local capture device path.
    Device(String),
}

impl fmt::Debug for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Upstream::Url(_) => f.write_str("Url(<redacted>)"),
            Upstream::Device(path) => f.debug_tuple("Device").field(path).finish(),
        }
    }
}

/// An open upstream handle producing encoded frames.
#[async_trait]
pub trait FrameSource: Send {
    /// Next encoded frame, or `None` once the upstream has ended.
    async fn next_frame(&mut self) -> Result<Option<Bytes>, StreamError>;

    /// Release the underlying handle. Called exactly once, through
    /// [`SourceGuard`].
    fn release(&mut self);
}

/// Opens upstream sources.
#[async_trait]
pub trait SourceOpener: Send + Sync {
    async fn open(&self, upstream: &Upstream) -> Result<Box<dyn FrameSource>, StreamError>;
}

/// Owns an open source and releases it exactly once, on drop at the latest.
pub struct SourceGuard {
    source: Box<dyn FrameSource>,
    released: bool,
}

impl SourceGuard {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        Self {
            source,
            released: false,
        }
    }

    pub async fn next_frame(&mut self) -> Result<Option<Bytes>, StreamError> {
        if self.released {
            return Ok(None);
        }
        self.source.next_frame().await
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.source.release();
        }
    }
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        self.release();
    }
}
