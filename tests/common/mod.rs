//! Scripted platform fakes shared by the integration suites

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use recitation_recorder_lib::capture::{AudioDevice, AudioInput, DeviceError, FragmentSink};
use recitation_recorder_lib::keepalive::{
    KeepAliveError, SilentOutput, WakeLock, WakeLockProvider,
};
use recitation_recorder_lib::persistence::{
    MemoryRecordingStore, PersistenceError, RecordingStore,
};
use recitation_recorder_lib::upload::{MemoryStore, StorageBackend, StorageError};
use recitation_recorder_lib::{
    Collaborators, OwnerId, RecorderConfig, RecordingCoordinator, RecordingEvent,
    RecordingNotice, Subscription,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

pub const BASE_URL: &str = "https://cdn.test/recitations";

/// How the fake platform answers a microphone request
#[derive(Debug, Clone)]
pub enum Grant {
    Allow,
    Deny(String),
    /// Wait for [`FakeInput::release`] before allowing
    Gated,
}

/// Observable side of one opened device
#[derive(Default)]
pub struct DeviceProbe {
    sink: Mutex<Option<FragmentSink>>,
    tail: Mutex<Option<Vec<u8>>>,
    pub started_mime: Mutex<Option<String>>,
    pub closed: AtomicBool,
    pub pauses: AtomicUsize,
    pub resumes: AtomicUsize,
}

impl DeviceProbe {
    /// Emit one data fragment as the encoder would
    pub fn emit(&self, bytes: &[u8]) -> bool {
        match self.sink.lock().as_ref() {
            Some(sink) => sink.push(bytes.to_vec()),
            None => false,
        }
    }

    /// Data the encoder still holds and flushes on stop
    pub fn buffer_tail(&self, bytes: &[u8]) {
        *self.tail.lock() = Some(bytes.to_vec());
    }

    /// Simulate the track being ended by the platform
    pub fn end_track(&self) {
        if let Some(sink) = self.sink.lock().as_ref() {
            sink.end_of_track();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn was_started(&self) -> bool {
        self.started_mime.lock().is_some()
    }
}

struct FakeDevice {
    probe: Arc<DeviceProbe>,
    supported: Vec<&'static str>,
}

#[async_trait]
impl AudioDevice for FakeDevice {
    fn supports_mime(&self, mime: &str) -> bool {
        self.supported.is_empty() || self.supported.contains(&mime)
    }

    fn start(
        &mut self,
        mime: &str,
        _timeslice: Duration,
        sink: FragmentSink,
    ) -> Result<(), DeviceError> {
        *self.probe.started_mime.lock() = Some(mime.to_string());
        *self.probe.sink.lock() = Some(sink);
        Ok(())
    }

    fn pause(&mut self) {
        self.probe.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn resume(&mut self) {
        self.probe.resumes.fetch_add(1, Ordering::SeqCst);
    }

    async fn stop(&mut self) {
        let tail = self.probe.tail.lock().take();
        if let Some(tail) = tail {
            self.probe.emit(&tail);
        }
    }

    fn close(&mut self) {
        self.probe.closed.store(true, Ordering::SeqCst);
        self.probe.sink.lock().take();
    }
}

/// Fake microphone entry point
pub struct FakeInput {
    grant: Mutex<Grant>,
    gate: Notify,
    /// Empty means every MIME type is supported
    supported: Mutex<Vec<&'static str>>,
    devices: Mutex<Vec<Arc<DeviceProbe>>>,
    pub requests: AtomicUsize,
}

impl FakeInput {
    pub fn new(grant: Grant) -> Self {
        Self {
            grant: Mutex::new(grant),
            gate: Notify::new(),
            supported: Mutex::new(Vec::new()),
            devices: Mutex::new(Vec::new()),
            requests: AtomicUsize::new(0),
        }
    }

    pub fn set_grant(&self, grant: Grant) {
        *self.grant.lock() = grant;
    }

    pub fn set_supported(&self, mimes: &[&'static str]) {
        *self.supported.lock() = mimes.to_vec();
    }

    /// Let a gated request through
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn device(&self, index: usize) -> Arc<DeviceProbe> {
        self.devices.lock()[index].clone()
    }

    pub fn last_device(&self) -> Arc<DeviceProbe> {
        let devices = self.devices.lock();
        devices[devices.len() - 1].clone()
    }

    pub fn device_count(&self) -> usize {
        self.devices.lock().len()
    }
}

#[async_trait]
impl AudioInput for FakeInput {
    async fn request_audio_input(&self) -> Result<Box<dyn AudioDevice>, DeviceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let grant = self.grant.lock().clone();
        match grant {
            Grant::Allow => {}
            Grant::Deny(message) => return Err(DeviceError::PermissionDenied(message)),
            Grant::Gated => self.gate.notified().await,
        }

        let probe = Arc::new(DeviceProbe::default());
        self.devices.lock().push(probe.clone());
        Ok(Box::new(FakeDevice {
            probe,
            supported: self.supported.lock().clone(),
        }))
    }
}

/// Storage that refuses every upload
pub struct RejectingStore;

#[async_trait]
impl StorageBackend for RejectingStore {
    async fn put(
        &self,
        _path: &str,
        _bytes: &[u8],
        _content_type: &str,
    ) -> Result<(), StorageError> {
        Err(StorageError::Rejected {
            status: 503,
            body: "bucket offline".to_string(),
        })
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", BASE_URL, path)
    }
}

/// Recording list that cannot be written
#[derive(Default)]
pub struct UnavailableRecordings {
    pub appends: AtomicUsize,
}

#[async_trait]
impl RecordingStore for UnavailableRecordings {
    async fn append_recording(
        &self,
        _owner_id: &OwnerId,
        _url: &str,
    ) -> Result<(), PersistenceError> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        Err(PersistenceError::Unavailable("list service down".to_string()))
    }

    async fn remove_recording(
        &self,
        _owner_id: &OwnerId,
        _url: &str,
    ) -> Result<(), PersistenceError> {
        Err(PersistenceError::Unavailable("list service down".to_string()))
    }

    async fn recordings(&self, _owner_id: &OwnerId) -> Result<Vec<String>, PersistenceError> {
        Err(PersistenceError::Unavailable("list service down".to_string()))
    }
}

#[derive(Default)]
pub struct FakeLoop {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl SilentOutput for FakeLoop {
    fn start_loop(&self) -> Result<(), KeepAliveError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop_loop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeLock(Arc<AtomicBool>);

impl WakeLock for FakeLock {
    fn release(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }

    fn is_released(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeLocks {
    issued: Mutex<Vec<Arc<AtomicBool>>>,
}

impl FakeLocks {
    pub fn issued(&self) -> usize {
        self.issued.lock().len()
    }

    /// Drop the most recent lock the way a platform does on hide
    pub fn revoke_latest(&self) {
        if let Some(lock) = self.issued.lock().last() {
            lock.store(true, Ordering::SeqCst);
        }
    }

    pub fn all_released(&self) -> bool {
        self.issued.lock().iter().all(|lock| lock.load(Ordering::SeqCst))
    }
}

impl WakeLockProvider for FakeLocks {
    fn request(&self) -> Result<Box<dyn WakeLock>, KeepAliveError> {
        let released = Arc::new(AtomicBool::new(false));
        self.issued.lock().push(released.clone());
        Ok(Box::new(FakeLock(released)))
    }
}

/// A coordinator wired to fakes
pub struct Harness {
    pub coordinator: RecordingCoordinator,
    pub input: Arc<FakeInput>,
    pub storage: Arc<MemoryStore>,
    pub recordings: Arc<MemoryRecordingStore>,
    pub output: Arc<FakeLoop>,
    pub locks: Arc<FakeLocks>,
}

/// Collaborators a test swaps out; `None` keeps the in-memory default
#[derive(Default)]
struct Overrides {
    storage: Option<Arc<dyn StorageBackend>>,
    recordings: Option<Arc<dyn RecordingStore>>,
}

impl Harness {
    pub fn new(grant: Grant) -> Self {
        Self::build(grant, RecorderConfig::default(), Overrides::default())
    }

    pub fn with_config(grant: Grant, config: RecorderConfig) -> Self {
        Self::build(grant, config, Overrides::default())
    }

    pub fn with_storage(grant: Grant, storage: Arc<dyn StorageBackend>) -> Self {
        let overrides = Overrides {
            storage: Some(storage),
            ..Overrides::default()
        };
        Self::build(grant, RecorderConfig::default(), overrides)
    }

    pub fn with_recordings(grant: Grant, recordings: Arc<dyn RecordingStore>) -> Self {
        let overrides = Overrides {
            recordings: Some(recordings),
            ..Overrides::default()
        };
        Self::build(grant, RecorderConfig::default(), overrides)
    }

    fn build(grant: Grant, config: RecorderConfig, overrides: Overrides) -> Self {
        let input = Arc::new(FakeInput::new(grant));
        let memory = Arc::new(MemoryStore::new(BASE_URL));
        let recordings = Arc::new(MemoryRecordingStore::new());
        let output = Arc::new(FakeLoop::default());
        let locks = Arc::new(FakeLocks::default());

        let storage = overrides
            .storage
            .unwrap_or_else(|| memory.clone() as Arc<dyn StorageBackend>);
        let list_store = overrides
            .recordings
            .unwrap_or_else(|| recordings.clone() as Arc<dyn RecordingStore>);

        let coordinator = RecordingCoordinator::new(
            config,
            Collaborators {
                input: input.clone(),
                silent_output: Some(output.clone()),
                wake_locks: Some(locks.clone()),
                storage,
                recordings: list_store,
            },
        );

        Self {
            coordinator,
            input,
            storage: memory,
            recordings,
            output,
            locks,
        }
    }
}

/// Collect every notice the coordinator publishes
pub fn record(
    coordinator: &RecordingCoordinator,
) -> (Subscription, Arc<Mutex<Vec<RecordingNotice>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = coordinator.subscribe(move |notice| sink.lock().push(notice.clone()));
    (subscription, seen)
}

pub fn events(seen: &Mutex<Vec<RecordingNotice>>) -> Vec<RecordingEvent> {
    seen.lock().iter().map(|notice| notice.event.clone()).collect()
}

/// Poll `done` until it holds, yielding to spawned tasks in between
pub async fn eventually<F>(mut done: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
