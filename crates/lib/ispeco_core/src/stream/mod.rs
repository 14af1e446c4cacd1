//! Live relay sessions.
//!
//! A session is gated by [`gate::StreamGate`]: the principal must be allowed
//! to stream the camera, the camera's address is decrypted only after that
//! check, and frames are then relayed from an upstream [`source::FrameSource`]
//! to a downstream [`FrameSink`] until either side stops.

pub mod ffmpeg;
pub mod gate;
pub mod mjpeg;
pub mod source;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

pub use gate::StreamGate;

/// Default pause between captured frames.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(100);
/// Default number of frames buffered between capture and transport.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 8;
/// Local capture device used when a camera has no configured address.
pub const DEFAULT_DEVICE: &str = "/dev/video0";

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("failed to open upstream: {0}")]
    Open(String),

    #[error("upstream read failed: {0}")]
    Upstream(#[from] std::io::Error),

    #[error("upstream exited with {0}")]
    Exited(std::process::ExitStatus),

    #[error("frame exceeds {0} bytes without an end marker")]
    FrameTooLarge(usize),

    #[error("client disconnected")]
    ClientGone,
}

/// WebSocket close code and reason sent when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseReason {
    pub code: u16,
    pub reason: &'static str,
}

impl CloseReason {
    pub const NORMAL: CloseReason = CloseReason {
        code: 1000,
        reason: "End of stream",
    };
    pub const INTERNAL: CloseReason = CloseReason {
        code: 1011,
        reason: "Internal error",
    };
    pub const UNAUTHORIZED: CloseReason = CloseReason {
        code: 4001,
        reason: "Unauthorized",
    };
    pub const NOT_FOUND: CloseReason = CloseReason {
        code: 4004,
        reason: "Camera not found",
    };
}

/// Lifecycle of a relay session. `Closing` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Authorizing,
    Decrypting,
    Streaming,
    Closing,
    Rejected,
}

/// What the transport learned before the session started.
#[derive(Debug, Clone)]
pub struct Handshake {
    /// Authenticated principal, `None` for an anonymous client.
    pub principal: Option<Uuid>,
    /// Camera id exactly as the client supplied it.
    pub camera_id: String,
}

/// Why a streaming session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    EndOfStream,
    UpstreamFailed,
    ClientDisconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Closed before any frame was sent.
    Rejected(CloseReason),
    Finished { frames_sent: u64, end: StreamEnd },
}

/// Relay tuning.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub frame_interval: Duration,
    pub channel_capacity: usize,
    pub default_device: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            default_device: DEFAULT_DEVICE.to_string(),
        }
    }
}

/// Downstream side of a session, usually a WebSocket.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one encoded frame as a single binary message.
    async fn send_frame(&mut self, frame: Bytes) -> Result<(), StreamError>;

    /// Close the connection. Errors are ignored; the peer may already be gone.
    async fn close(&mut self, reason: CloseReason);
}
