//! In-memory fakes shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::access::AccessError;
use crate::access::store::AccessStore;
use crate::auth::queries::normalize_email;
use crate::models::access::{AccessRole, DelegatedAccess, GrantChanges, NewGrant};
use crate::models::camera::{Brand, Camera, CameraType, Environment, IndustryType, Resolution};
use crate::stream::source::{FrameSource, SourceOpener, Upstream};
use crate::stream::{CloseReason, FrameSink, StreamError};

pub fn camera_fixture(owner_id: Uuid, environment: Environment) -> Camera {
    Camera {
        id: Uuid::now_v7(),
        owner_id,
        name: "lobby".into(),
        camera_type: CameraType::Dome,
        industry_type: IndustryType::Retail,
        environment,
        resolution: Resolution::Mp4,
        brand: Brand::HikVision,
        encrypted_url: None,
        encrypted_password: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn grant_fixture(
    owner_id: Uuid,
    grantee_id: Uuid,
    user_role: AccessRole,
    camera_access: Environment,
) -> DelegatedAccess {
    DelegatedAccess {
        id: Uuid::now_v7(),
        owner_id,
        grantee_id,
        user_role,
        camera_access,
        notification_access: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<String, Uuid>,
    cameras: HashMap<Uuid, Camera>,
    grants: HashMap<Uuid, DelegatedAccess>,
}

/// [`AccessStore`] over hash maps, enforcing the same pair uniqueness as
/// the database.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn add_user(&self, email: &str) -> Uuid {
        let id = Uuid::now_v7();
        self.tables
            .lock()
            .unwrap()
            .users
            .insert(normalize_email(email), id);
        id
    }

    pub fn add_camera(&self, camera: Camera) -> Camera {
        self.tables
            .lock()
            .unwrap()
            .cameras
            .insert(camera.id, camera.clone());
        camera
    }

    pub fn add_grant(
        &self,
        owner_id: Uuid,
        grantee_id: Uuid,
        role: AccessRole,
        scope: Environment,
    ) -> DelegatedAccess {
        let grant = grant_fixture(owner_id, grantee_id, role, scope);
        self.tables
            .lock()
            .unwrap()
            .grants
            .insert(grant.id, grant.clone());
        grant
    }

    pub fn grant_count(&self) -> usize {
        self.tables.lock().unwrap().grants.len()
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn find_camera(&self, camera_id: Uuid) -> Result<Option<Camera>, AccessError> {
        Ok(self.tables.lock().unwrap().cameras.get(&camera_id).cloned())
    }

    async fn find_grant_between(
        &self,
        owner_id: Uuid,
        grantee_id: Uuid,
    ) -> Result<Option<DelegatedAccess>, AccessError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .grants
            .values()
            .find(|g| g.owner_id == owner_id && g.grantee_id == grantee_id)
            .cloned())
    }

    async fn find_grant(&self, grant_id: Uuid) -> Result<Option<DelegatedAccess>, AccessError> {
        Ok(self.tables.lock().unwrap().grants.get(&grant_id).cloned())
    }

    async fn find_user_id_by_email(&self, email: &str) -> Result<Option<Uuid>, AccessError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .users
            .get(&normalize_email(email))
            .copied())
    }

    async fn insert_grant(&self, grant: &NewGrant) -> Result<DelegatedAccess, AccessError> {
        let mut tables = self.tables.lock().unwrap();
        if tables
            .grants
            .values()
            .any(|g| g.owner_id == grant.owner_id && g.grantee_id == grant.grantee_id)
        {
            return Err(AccessError::DuplicateGrant);
        }
        let mut row = grant_fixture(
            grant.owner_id,
            grant.grantee_id,
            grant.user_role,
            grant.camera_access,
        );
        row.notification_access = grant.notification_access;
        tables.grants.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_grant(
        &self,
        grant_id: Uuid,
        changes: &GrantChanges,
    ) -> Result<Option<DelegatedAccess>, AccessError> {
        let mut tables = self.tables.lock().unwrap();
        let Some(row) = tables.grants.get_mut(&grant_id) else {
            return Ok(None);
        };
        if let Some(role) = changes.user_role {
            row.user_role = role;
        }
        if let Some(scope) = changes.camera_access {
            row.camera_access = scope;
        }
        if let Some(flag) = changes.notification_access {
            row.notification_access = flag;
        }
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn delete_grant(&self, grant_id: Uuid) -> Result<bool, AccessError> {
        Ok(self.tables.lock().unwrap().grants.remove(&grant_id).is_some())
    }
}

/// One scripted upstream read.
pub enum Step {
    Frame(Bytes),
    Fail,
    /// Never yields; only cancellation ends the read.
    Hang,
}

impl Step {
    pub fn frame(data: &'static [u8]) -> Self {
        Step::Frame(Bytes::from_static(data))
    }
}

/// Source that replays a script, then reports end of stream.
pub struct ScriptedSource {
    steps: VecDeque<Step>,
    releases: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> (Self, Arc<AtomicUsize>) {
        let releases = Arc::new(AtomicUsize::new(0));
        (Self::with_counter(steps, releases.clone()), releases)
    }

    fn with_counter(steps: Vec<Step>, releases: Arc<AtomicUsize>) -> Self {
        Self {
            steps: steps.into(),
            releases,
        }
    }
}

#[async_trait]
impl FrameSource for ScriptedSource {
    async fn next_frame(&mut self) -> Result<Option<Bytes>, StreamError> {
        match self.steps.pop_front() {
            Some(Step::Frame(frame)) => Ok(Some(frame)),
            Some(Step::Fail) => Err(StreamError::Upstream(std::io::Error::other(
                "upstream went away",
            ))),
            Some(Step::Hang) => std::future::pending().await,
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Opener handing out one [`ScriptedSource`] and recording what was opened.
pub struct ScriptedOpener {
    script: Mutex<Option<Vec<Step>>>,
    opened: Mutex<Vec<Upstream>>,
    fail_next: AtomicBool,
    pub releases: Arc<AtomicUsize>,
}

impl ScriptedOpener {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(Some(script)),
            opened: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
            releases: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fail_next_open(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn opened(&self) -> Vec<Upstream> {
        self.opened.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }
}

#[async_trait]
impl SourceOpener for ScriptedOpener {
    async fn open(&self, upstream: &Upstream) -> Result<Box<dyn FrameSource>, StreamError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StreamError::Open("device busy".into()));
        }
        self.opened.lock().unwrap().push(upstream.clone());
        let steps = self.script.lock().unwrap().take().unwrap_or_default();
        Ok(Box::new(ScriptedSource::with_counter(
            steps,
            self.releases.clone(),
        )))
    }
}

/// Sink that records frames and the close reason.
#[derive(Default)]
pub struct RecordingSink {
    pub frames: Vec<Bytes>,
    pub closed: Option<CloseReason>,
    fail_after: Option<usize>,
}

impl RecordingSink {
    /// Accept `n` frames, then fail as if the client had gone.
    pub fn failing_after(n: usize) -> Self {
        Self {
            fail_after: Some(n),
            ..Default::default()
        }
    }
}

#[async_trait]
impl FrameSink for RecordingSink {
    async fn send_frame(&mut self, frame: Bytes) -> Result<(), StreamError> {
        if self.fail_after.is_some_and(|n| self.frames.len() >= n) {
            return Err(StreamError::ClientGone);
        }
        self.frames.push(frame);
        Ok(())
    }

    async fn close(&mut self, reason: CloseReason) {
        self.closed = Some(reason);
    }
}
