//! API server configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ispeco_core::auth::jwt::resolve_jwt_secret;
use ispeco_core::secrets::ENCRYPTION_KEY_ENV;
use ispeco_core::stream::ffmpeg::DEFAULT_FFMPEG;
use ispeco_core::stream::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_DEVICE, DEFAULT_FRAME_INTERVAL, StreamConfig,
};
use tracing::warn;

/// Configuration for the API server.
#[derive(Clone)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8000").
    pub bind_addr: String,
    /// PostgreSQL connection URL.
    pub pg_connection_url: String,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// Passphrase for camera credential encryption. `None` leaves the codec
    /// unconfigured and every encrypt/decrypt path fails.
    pub encryption_key: Option<String>,
    /// Live relay tuning.
    pub stream: StreamConfig,
    /// `ffmpeg` executable used to read camera streams.
    pub ffmpeg_path: PathBuf,
}

// Secrets stay out of logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("encryption_key_set", &self.encryption_key.is_some())
            .field("stream", &self.stream)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .finish_non_exhaustive()
    }
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable                   | Default                                 |
    /// |----------------------------|-----------------------------------------|
    /// | `BIND_ADDR`                | `127.0.0.1:8000`                        |
    /// | `DATABASE_URL`             | `postgres://localhost:5432/ispeco`      |
    /// | `JWT_SECRET` / `AUTH_SECRET` | generated & persisted to file         |
    /// | `CAMERA_ENCRYPTION_KEY`    | unset                                   |
    /// | `STREAM_FRAME_INTERVAL_MS` | `100`                                   |
    /// | `STREAM_CHANNEL_CAPACITY`  | `8`                                     |
    /// | `STREAM_DEFAULT_DEVICE`    | `/dev/video0`                           |
    /// | `FFMPEG_PATH`              | `ffmpeg`                                |
    pub fn from_env() -> Self {
        let frame_interval_ms = env_parse(
            "STREAM_FRAME_INTERVAL_MS",
            DEFAULT_FRAME_INTERVAL.as_millis() as u64,
        );
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8000".into()),
            pg_connection_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost:5432/ispeco".into()),
            jwt_secret: resolve_jwt_secret(),
            encryption_key: std::env::var(ENCRYPTION_KEY_ENV)
                .ok()
                .filter(|k| !k.trim().is_empty()),
            stream: StreamConfig {
                frame_interval: Duration::from_millis(frame_interval_ms),
                channel_capacity: env_parse("STREAM_CHANNEL_CAPACITY", DEFAULT_CHANNEL_CAPACITY),
                default_device: std::env::var("STREAM_DEFAULT_DEVICE")
                    .unwrap_or_else(|_| DEFAULT_DEVICE.into()),
            },
            ffmpeg_path: std::env::var("FFMPEG_PATH")
                .unwrap_or_else(|_| DEFAULT_FFMPEG.into())
                .into(),
        }
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(var = name, value = %raw, "ignoring unparsable value");
            default
        }),
        Err(_) => default,
    }
}
