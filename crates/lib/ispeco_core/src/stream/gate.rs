//! Stream session gate.
//!
//! Runs one relay session through
//! `Connecting -> Authorizing -> Decrypting -> Streaming -> Closing`,
//! or into `Rejected` when the session may not start. Authorization always
//! happens before decryption, and the upstream is only opened once both
//! have succeeded.
//!
//! While streaming, a capture task reads the upstream and pushes frames
//! through a bounded channel; the calling task forwards them to the sink.
//! The capture task owns the [`SourceGuard`], so the upstream is released
//! exactly once however the session ends.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::source::{SourceGuard, SourceOpener, Upstream, is_allowed_stream_url};
use super::{CloseReason, FrameSink, Handshake, SessionOutcome, SessionState, StreamConfig, StreamEnd, StreamError};
use crate::access::policy::Operation;
use crate::access::store::AccessStore;
use crate::access::{AccessError, check_camera};
use crate::models::camera::Camera;
use crate::secrets::{CodecError, SecretCodec};
use crate::uuid::parse_id;

type CaptureItem = Result<Bytes, StreamError>;

/// Authorizes and runs relay sessions.
#[derive(Clone)]
pub struct StreamGate {
    store: Arc<dyn AccessStore>,
    codec: Option<Arc<SecretCodec>>,
    opener: Arc<dyn SourceOpener>,
    config: StreamConfig,
}

/// Per-session bookkeeping for state transitions.
struct Session<'a> {
    camera_id: &'a str,
    state: SessionState,
}

impl Session<'_> {
    fn enter(&mut self, next: SessionState) {
        debug!(camera_id = %self.camera_id, from = ?self.state, to = ?next, "stream session transition");
        self.state = next;
    }
}

impl StreamGate {
    pub fn new(
        store: Arc<dyn AccessStore>,
        codec: Option<Arc<SecretCodec>>,
        opener: Arc<dyn SourceOpener>,
        config: StreamConfig,
    ) -> Self {
        Self {
            store,
            codec,
            opener,
            config,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Run one session to completion.
    ///
    /// `cancel` is cancelled by the transport when the client goes away.
    pub async fn run(
        &self,
        handshake: Handshake,
        sink: &mut dyn FrameSink,
        cancel: CancellationToken,
    ) -> SessionOutcome {
        let mut session = Session {
            camera_id: &handshake.camera_id,
            state: SessionState::Connecting,
        };

        session.enter(SessionState::Authorizing);
        let camera = match self.authorize(&handshake).await {
            Ok(camera) => camera,
            Err(reason) => return reject(&mut session, sink, reason).await,
        };

        session.enter(SessionState::Decrypting);
        let upstream = match self.resolve_upstream(&camera) {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!(camera_id = %camera.id, error = %e, "cannot decrypt camera address");
                return reject(&mut session, sink, CloseReason::INTERNAL).await;
            }
        };

        // Rows written before address validation may still hold local paths.
        if let Upstream::Url(address) = &upstream
            && !is_allowed_stream_url(address)
        {
            warn!(camera_id = %camera.id, "stored camera address is not a network URL");
            return reject(&mut session, sink, CloseReason::INTERNAL).await;
        }

        session.enter(SessionState::Streaming);
        let source = match self.opener.open(&upstream).await {
            Ok(source) => source,
            Err(e) => {
                warn!(camera_id = %camera.id, error = %e, "cannot open upstream");
                return reject(&mut session, sink, CloseReason::INTERNAL).await;
            }
        };
        info!(camera_id = %camera.id, "stream started");

        let (frames_sent, end) = self.relay(SourceGuard::new(source), sink, cancel).await;

        session.enter(SessionState::Closing);
        match end {
            StreamEnd::EndOfStream => sink.close(CloseReason::NORMAL).await,
            StreamEnd::UpstreamFailed => sink.close(CloseReason::INTERNAL).await,
            StreamEnd::ClientDisconnected => {}
        }
        info!(camera_id = %camera.id, frames_sent, ?end, "stream ended");

        SessionOutcome::Finished { frames_sent, end }
    }

    async fn authorize(&self, handshake: &Handshake) -> Result<Camera, CloseReason> {
        let Some(principal) = handshake.principal else {
            return Err(CloseReason::UNAUTHORIZED);
        };
        let Some(camera_id) = parse_id(&handshake.camera_id) else {
            return Err(CloseReason::NOT_FOUND);
        };
        match check_camera(self.store.as_ref(), principal, camera_id, Operation::Stream).await {
            Ok(camera) => Ok(camera),
            Err(AccessError::NotFound(_)) => Err(CloseReason::NOT_FOUND),
            Err(AccessError::Forbidden(_)) => Err(CloseReason::UNAUTHORIZED),
            Err(e) => {
                warn!(camera_id = %camera_id, error = %e, "stream authorization failed");
                Err(CloseReason::INTERNAL)
            }
        }
    }

    fn resolve_upstream(&self, camera: &Camera) -> Result<Upstream, CodecError> {
        let Some(ciphertext) = camera.encrypted_url.as_deref() else {
            debug!(camera_id = %camera.id, "no camera address, using default device");
            return Ok(Upstream::Device(self.config.default_device.clone()));
        };
        let codec = self.codec.as_deref().ok_or(CodecError::KeyMissing)?;
        Ok(Upstream::Url(codec.decrypt(ciphertext)?))
    }

    /// Forward frames until the upstream ends or fails, or the client leaves.
    async fn relay(
        &self,
        guard: SourceGuard,
        sink: &mut dyn FrameSink,
        cancel: CancellationToken,
    ) -> (u64, StreamEnd) {
        let (tx, mut rx) = mpsc::channel::<CaptureItem>(self.config.channel_capacity.max(1));
        let capture_cancel = cancel.child_token();
        let capture = tokio::spawn(capture_loop(
            guard,
            tx,
            capture_cancel.clone(),
            self.config.frame_interval,
        ));

        let mut frames_sent = 0u64;
        let end = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break StreamEnd::ClientDisconnected,
                item = rx.recv() => match item {
                    Some(Ok(frame)) => {
                        if sink.send_frame(frame).await.is_err() {
                            break StreamEnd::ClientDisconnected;
                        }
                        frames_sent += 1;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "upstream failed");
                        break StreamEnd::UpstreamFailed;
                    }
                    None => break StreamEnd::EndOfStream,
                },
            }
        };

        capture_cancel.cancel();
        drop(rx);
        if let Err(e) = capture.await {
            warn!(error = %e, "capture task did not finish cleanly");
        }

        (frames_sent, end)
    }
}

async fn reject(
    session: &mut Session<'_>,
    sink: &mut dyn FrameSink,
    reason: CloseReason,
) -> SessionOutcome {
    session.enter(SessionState::Rejected);
    debug!(camera_id = %session.camera_id, code = reason.code, "stream session rejected");
    sink.close(reason).await;
    SessionOutcome::Rejected(reason)
}

/// Read the upstream into `tx`, pausing `interval` between frames.
async fn capture_loop(
    mut guard: SourceGuard,
    tx: mpsc::Sender<CaptureItem>,
    cancel: CancellationToken,
    interval: Duration,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = guard.next_frame() => next,
        };
        match next {
            Ok(Some(frame)) => {
                if tx.send(Ok(frame)).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("upstream reached end of stream");
                break;
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                break;
            }
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    guard.release();
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::models::access::AccessRole;
    use crate::models::camera::Environment;
    use crate::test_support::{
        MemoryStore, RecordingSink, ScriptedOpener, Step, camera_fixture,
    };

    const KEY: &str = "unit-test-key";

    struct Fixture {
        store: Arc<MemoryStore>,
        opener: Arc<ScriptedOpener>,
        gate: StreamGate,
        owner: Uuid,
    }

    fn fixture(script: Vec<Step>) -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let opener = Arc::new(ScriptedOpener::new(script));
        let owner = store.add_user("owner@example.com");
        let codec = Arc::new(SecretCodec::new(KEY).unwrap());
        let gate = StreamGate::new(
            store.clone(),
            Some(codec),
            opener.clone(),
            StreamConfig {
                frame_interval: Duration::from_millis(1),
                channel_capacity: 2,
                default_device: "/dev/video9".into(),
            },
        );
        Fixture {
            store,
            opener,
            gate,
            owner,
        }
    }

    fn with_url(mut camera: Camera, url: &str) -> Camera {
        let codec = SecretCodec::new(KEY).unwrap();
        camera.encrypted_url = Some(codec.encrypt(url).unwrap());
        camera
    }

    fn handshake(principal: Option<Uuid>, camera: &Camera) -> Handshake {
        Handshake {
            principal,
            camera_id: camera.id.to_string(),
        }
    }

    #[tokio::test]
    async fn three_frames_then_end_closes_normally() {
        let f = fixture(vec![Step::frame(b"1"), Step::frame(b"2"), Step::frame(b"3")]);
        let camera = f
            .store
            .add_camera(with_url(camera_fixture(f.owner, Environment::Indoor), "rtsp://x/y"));
        let mut sink = RecordingSink::default();

        let outcome = f
            .gate
            .run(handshake(Some(f.owner), &camera), &mut sink, CancellationToken::new())
            .await;

        assert_eq!(
            outcome,
            SessionOutcome::Finished {
                frames_sent: 3,
                end: StreamEnd::EndOfStream
            }
        );
        assert_eq!(sink.frames, vec![Bytes::from_static(b"1"), Bytes::from_static(b"2"), Bytes::from_static(b"3")]);
        assert_eq!(sink.closed, Some(CloseReason::NORMAL));
        assert_eq!(f.opener.releases.load(Ordering::SeqCst), 1);
        assert_eq!(f.opener.opened(), vec![Upstream::Url("rtsp://x/y".into())]);
    }

    #[tokio::test]
    async fn upstream_failure_ends_session_and_releases_once() {
        let f = fixture(vec![Step::frame(b"1"), Step::frame(b"2"), Step::Fail]);
        let camera = f
            .store
            .add_camera(with_url(camera_fixture(f.owner, Environment::Indoor), "rtsp://x/y"));
        let mut sink = RecordingSink::default();

        let outcome = f
            .gate
            .run(handshake(Some(f.owner), &camera), &mut sink, CancellationToken::new())
            .await;

        assert_eq!(
            outcome,
            SessionOutcome::Finished {
                frames_sent: 2,
                end: StreamEnd::UpstreamFailed
            }
        );
        assert_eq!(sink.closed, Some(CloseReason::INTERNAL));
        assert_eq!(f.opener.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn principal_without_grant_is_rejected_before_opening() {
        let f = fixture(vec![Step::frame(b"1")]);
        let camera = f
            .store
            .add_camera(with_url(camera_fixture(f.owner, Environment::Indoor), "rtsp://x/y"));
        let stranger = f.store.add_user("stranger@example.com");
        let mut sink = RecordingSink::default();

        let outcome = f
            .gate
            .run(handshake(Some(stranger), &camera), &mut sink, CancellationToken::new())
            .await;

        assert_eq!(outcome, SessionOutcome::Rejected(CloseReason::UNAUTHORIZED));
        assert!(sink.frames.is_empty());
        assert_eq!(sink.closed, Some(CloseReason::UNAUTHORIZED));
        assert_eq!(f.opener.open_count(), 0);
    }

    #[tokio::test]
    async fn anonymous_client_is_rejected() {
        let f = fixture(vec![Step::frame(b"1")]);
        let camera = f.store.add_camera(camera_fixture(f.owner, Environment::Indoor));
        let mut sink = RecordingSink::default();

        let outcome = f
            .gate
            .run(handshake(None, &camera), &mut sink, CancellationToken::new())
            .await;

        assert_eq!(outcome, SessionOutcome::Rejected(CloseReason::UNAUTHORIZED));
        assert_eq!(f.opener.open_count(), 0);
    }

    #[tokio::test]
    async fn unknown_or_malformed_camera_is_not_found() {
        let f = fixture(vec![]);
        for camera_id in [Uuid::now_v7().to_string(), "not-a-uuid".to_string()] {
            let mut sink = RecordingSink::default();
            let outcome = f
                .gate
                .run(
                    Handshake {
                        principal: Some(f.owner),
                        camera_id,
                    },
                    &mut sink,
                    CancellationToken::new(),
                )
                .await;
            assert_eq!(outcome, SessionOutcome::Rejected(CloseReason::NOT_FOUND));
        }
    }

    #[tokio::test]
    async fn local_file_address_is_never_opened() {
        let f = fixture(vec![Step::frame(b"1")]);
        let camera = f.store.add_camera(with_url(
            camera_fixture(f.owner, Environment::Indoor),
            "file:///etc/passwd",
        ));
        let mut sink = RecordingSink::default();

        let outcome = f
            .gate
            .run(handshake(Some(f.owner), &camera), &mut sink, CancellationToken::new())
            .await;

        assert_eq!(outcome, SessionOutcome::Rejected(CloseReason::INTERNAL));
        assert_eq!(f.opener.open_count(), 0);
    }

    #[tokio::test]
    async fn undecryptable_address_is_internal_error() {
        let f = fixture(vec![Step::frame(b"1")]);
        let mut camera = camera_fixture(f.owner, Environment::Indoor);
        camera.encrypted_url = Some(
            SecretCodec::new("some-other-key")
                .unwrap()
                .encrypt("rtsp://x/y")
                .unwrap(),
        );
        let camera = f.store.add_camera(camera);
        let mut sink = RecordingSink::default();

        let outcome = f
            .gate
            .run(handshake(Some(f.owner), &camera), &mut sink, CancellationToken::new())
            .await;

        assert_eq!(outcome, SessionOutcome::Rejected(CloseReason::INTERNAL));
        assert_eq!(f.opener.open_count(), 0);
    }

    #[tokio::test]
    async fn missing_key_is_internal_error() {
        let f = fixture(vec![]);
        let camera = f
            .store
            .add_camera(with_url(camera_fixture(f.owner, Environment::Indoor), "rtsp://x/y"));
        let gate = StreamGate::new(f.store.clone(), None, f.opener.clone(), StreamConfig::default());
        let mut sink = RecordingSink::default();

        let outcome = gate
            .run(handshake(Some(f.owner), &camera), &mut sink, CancellationToken::new())
            .await;

        assert_eq!(outcome, SessionOutcome::Rejected(CloseReason::INTERNAL));
    }

    #[tokio::test]
    async fn camera_without_address_uses_default_device() {
        let f = fixture(vec![Step::frame(b"1")]);
        let camera = f.store.add_camera(camera_fixture(f.owner, Environment::Indoor));
        let mut sink = RecordingSink::default();

        f.gate
            .run(handshake(Some(f.owner), &camera), &mut sink, CancellationToken::new())
            .await;

        assert_eq!(f.opener.opened(), vec![Upstream::Device("/dev/video9".into())]);
        assert_eq!(sink.frames.len(), 1);
    }

    #[tokio::test]
    async fn open_failure_is_internal_error() {
        let f = fixture(vec![]);
        f.opener.fail_next_open();
        let camera = f.store.add_camera(camera_fixture(f.owner, Environment::Indoor));
        let mut sink = RecordingSink::default();

        let outcome = f
            .gate
            .run(handshake(Some(f.owner), &camera), &mut sink, CancellationToken::new())
            .await;

        assert_eq!(outcome, SessionOutcome::Rejected(CloseReason::INTERNAL));
        assert_eq!(f.opener.releases.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn client_disconnect_stops_capture_and_releases_once() {
        let f = fixture(vec![Step::frame(b"1"), Step::Hang]);
        let camera = f.store.add_camera(camera_fixture(f.owner, Environment::Indoor));
        let mut sink = RecordingSink::default();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcome = f
            .gate
            .run(handshake(Some(f.owner), &camera), &mut sink, cancel)
            .await;

        assert_eq!(
            outcome,
            SessionOutcome::Finished {
                frames_sent: 1,
                end: StreamEnd::ClientDisconnected
            }
        );
        assert_eq!(sink.closed, None);
        assert_eq!(f.opener.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn grantee_streams_within_scope_only() {
        let f = fixture(vec![Step::frame(b"1")]);
        let grantee = f.store.add_user("viewer@example.com");
        f.store
            .add_grant(f.owner, grantee, AccessRole::Viewer, Environment::Outdoor);
        let outdoor = f.store.add_camera(camera_fixture(f.owner, Environment::Outdoor));
        let indoor = f.store.add_camera(camera_fixture(f.owner, Environment::Indoor));

        let mut sink = RecordingSink::default();
        let outcome = f
            .gate
            .run(handshake(Some(grantee), &indoor), &mut sink, CancellationToken::new())
            .await;
        assert_eq!(outcome, SessionOutcome::Rejected(CloseReason::UNAUTHORIZED));

        let mut sink = RecordingSink::default();
        let outcome = f
            .gate
            .run(handshake(Some(grantee), &outdoor), &mut sink, CancellationToken::new())
            .await;
        assert_eq!(
            outcome,
            SessionOutcome::Finished {
                frames_sent: 1,
                end: StreamEnd::EndOfStream
            }
        );
    }

    #[tokio::test]
    async fn failed_sink_counts_as_disconnect() {
        let f = fixture(vec![Step::frame(b"1"), Step::frame(b"2")]);
        let camera = f.store.add_camera(camera_fixture(f.owner, Environment::Indoor));
        let mut sink = RecordingSink::failing_after(1);

        let outcome = f
            .gate
            .run(handshake(Some(f.owner), &camera), &mut sink, CancellationToken::new())
            .await;

        assert_eq!(
            outcome,
            SessionOutcome::Finished {
                frames_sent: 1,
                end: StreamEnd::ClientDisconnected
            }
        );
        assert_eq!(f.opener.releases.load(Ordering::SeqCst), 1);
    }
}
