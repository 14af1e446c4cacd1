//! `ffmpeg`-backed upstream.
//!
//! Each session spawns one `ffmpeg` child that reads the camera (an RTSP or
//! HTTP address, or a local v4l2 device) and writes MJPEG to stdout.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

use super::StreamError;
use super::mjpeg::MjpegSplitter;
use super::source::{FrameSource, SourceOpener, Upstream};

const READ_CHUNK: usize = 64 * 1024;

/// Default `ffmpeg` executable, resolved through `PATH`.
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Opens upstreams by spawning `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegOpener {
    program: PathBuf,
}

impl Default for FfmpegOpener {
    fn default() -> Self {
        Self::new(DEFAULT_FFMPEG)
    }
}

impl FfmpegOpener {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Build the command for `upstream`.
    pub fn command(&self, upstream: &Upstream) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-hide_banner", "-loglevel", "error", "-nostdin"]);
        match upstream {
            Upstream::Url(address) => {
                if is_rtsp(address) {
                    cmd.args(["-rtsp_transport", "tcp"]);
                }
                cmd.arg("-i").arg(address);
            }
            Upstream::Device(path) => {
                cmd.args(["-f", "v4l2", "-i"]).arg(path);
            }
        }
        cmd.args(["-an", "-f", "mjpeg", "-q:v", "5", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

fn is_rtsp(address: &str) -> bool {
    url::Url::parse(address)
        .map(|u| matches!(u.scheme(), "rtsp" | "rtsps"))
        .unwrap_or(false)
}

#[async_trait]
impl SourceOpener for FfmpegOpener {
    async fn open(&self, upstream: &Upstream) -> Result<Box<dyn FrameSource>, StreamError> {
        let mut child = self.command(upstream).spawn().map_err(|e| {
            StreamError::Open(format!("cannot spawn {}: {e}", self.program.display()))
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| StreamError::Open("ffmpeg stdout was not captured".into()))?;
        debug!(pid = ?child.id(), ?upstream, "ffmpeg upstream spawned");
        Ok(Box::new(FfmpegSource {
            child,
            stdout,
            splitter: MjpegSplitter::default(),
            chunk: vec![0u8; READ_CHUNK],
        }))
    }
}

/// Frames read from a running `ffmpeg` child.
pub struct FfmpegSource {
    child: Child,
    stdout: ChildStdout,
    splitter: MjpegSplitter,
    chunk: Vec<u8>,
}

#[async_trait]
impl FrameSource for FfmpegSource {
    async fn next_frame(&mut self) -> Result<Option<Bytes>, StreamError> {
        loop {
            if let Some(frame) = self.splitter.next_frame()? {
                return Ok(Some(frame));
            }
            let n = self.stdout.read(&mut self.chunk).await?;
            if n == 0 {
                // stdout closes when ffmpeg exits; only a clean exit ends the stream.
                let status = self.child.wait().await?;
                return if status.success() {
                    Ok(None)
                } else {
                    Err(StreamError::Exited(status))
                };
            }
            self.splitter.push(&self.chunk[..n]);
        }
    }

    fn release(&mut self) {
        debug!(pid = ?self.child.id(), "stopping ffmpeg upstream");
        let _ = self.child.start_kill();
    }
}
