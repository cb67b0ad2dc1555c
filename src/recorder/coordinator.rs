//! Recording coordinator
//!
//! Owns the one microphone session of the process and serializes every
//! command against it.
//!
//! The session lives behind a mutex that is never held across an `.await`.
//! `request_start` reserves the session before asking the platform for the
//! device, so two owners racing to start can never both see `Idle`.
//! Transitions are queued on the event bus while the lock is held and
//! delivered after it is released, which keeps delivery in transition order.

use super::error::{RecordingError, RecordingResult};
use super::events::{EventBus, RecordingEvent, RecordingNotice, Subscription};
use super::state::{OwnerId, RecorderSnapshot, RecordingSession, RecordingState, StopOutcome};
use crate::capture::{AudioInput, CaptureSession, DeviceError, PendingCapture, TrackEnded};
use crate::config::RecorderConfig;
use crate::keepalive::{KeepAliveResource, SilentOutput, Visibility, WakeLockProvider};
use crate::persistence::RecordingStore;
use crate::upload::{StorageBackend, UploadSink};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Platform and backend services the coordinator drives
pub struct Collaborators {
    pub input: Arc<dyn AudioInput>,
    pub silent_output: Option<Arc<dyn SilentOutput>>,
    pub wake_locks: Option<Arc<dyn WakeLockProvider>>,
    pub storage: Arc<dyn StorageBackend>,
    pub recordings: Arc<dyn RecordingStore>,
}

#[derive(Default)]
struct Inner {
    session: RecordingSession,
    /// Reservation still waiting for the device
    pending: Option<Uuid>,
    capture: Option<CaptureSession>,
    watcher: Option<JoinHandle<()>>,
    sequence: u64,
}

impl Inner {
    fn snapshot(&self) -> RecorderSnapshot {
        RecorderSnapshot {
            owner_id: self.session.owner_id.clone(),
            state: self.session.state,
            sequence: self.sequence,
        }
    }

    fn publish(&mut self, bus: &EventBus, subject: Option<OwnerId>, event: RecordingEvent) {
        self.sequence += 1;
        bus.enqueue(RecordingNotice {
            snapshot: self.snapshot(),
            subject,
            event,
        });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
    }
}

struct Shared {
    inner: Mutex<Inner>,
    bus: Arc<EventBus>,
    input: Arc<dyn AudioInput>,
    keep_alive: KeepAliveResource,
    uploader: UploadSink,
    recordings: Arc<dyn RecordingStore>,
    config: RecorderConfig,
}

enum StopRequest<'a> {
    Owner(&'a OwnerId),
    /// The device ended the track of this session
    Interrupted(Uuid),
}

/// Single-flight owner of the microphone
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct RecordingCoordinator {
    shared: Arc<Shared>,
}

impl RecordingCoordinator {
    /// Create a new recording coordinator
    pub fn new(config: RecorderConfig, collaborators: Collaborators) -> Self {
        let silent_output = collaborators
            .silent_output
            .filter(|_| config.keep_alive.silent_audio);
        let wake_locks = collaborators
            .wake_locks
            .filter(|_| config.keep_alive.wake_lock);

        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                bus: EventBus::new(),
                input: collaborators.input,
                keep_alive: KeepAliveResource::new(silent_output, wake_locks),
                uploader: UploadSink::new(collaborators.storage, config.upload.clone()),
                recordings: collaborators.recordings,
                config,
            }),
        }
    }

    /// Current `(owner, state)` of the session
    pub fn get_snapshot(&self) -> RecorderSnapshot {
        self.shared.inner.lock().snapshot()
    }

    /// Whether a start is waiting on the device
    ///
    /// Controls use this to show a permission prompt is open; the
    /// reservation itself is not published as a notice.
    pub fn is_start_pending(&self) -> bool {
        self.shared.inner.lock().pending.is_some()
    }

    /// Number of captured fragments in the active session, for progress
    /// indicators. Zero when idle.
    pub fn chunk_count(&self) -> usize {
        self.shared
            .inner
            .lock()
            .capture
            .as_ref()
            .map(|capture| capture.chunk_count())
            .unwrap_or(0)
    }

    /// Subscribe to every subsequent transition
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&RecordingNotice) + Send + Sync + 'static,
    {
        self.shared.bus.subscribe(listener)
    }

    /// Start recording for `owner_id`
    ///
    /// Returns `Busy` while another owner is active and succeeds without
    /// effect if `owner_id` is already the active owner.
    ///
    /// Must be polled inside a tokio runtime: a successful start spawns the
    /// task that watches for the device ending the track.
    pub async fn request_start(&self, owner_id: &OwnerId) -> RecordingResult<()> {
        let session_id = {
            let mut inner = self.shared.inner.lock();
            if let Some(active) = inner
                .session
                .owner_id
                .as_ref()
                .filter(|_| inner.session.state.is_active())
            {
                if active == owner_id {
                    return Ok(());
                }
                tracing::info!("Start for {} refused: {} is recording", owner_id, active);
                return Err(RecordingError::Busy {
                    active: active.clone(),
                });
            }

            let id = inner.session.reserve(owner_id.clone());
            inner.pending = Some(id);
            id
        };
        tracing::info!("Reserved microphone for {} (session {})", owner_id, session_id);

        let acquired = CaptureSession::open(self.shared.input.as_ref()).await;

        let result = {
            let mut inner = self.shared.inner.lock();
            self.resolve_start(&mut inner, owner_id, session_id, acquired)
        };
        self.shared.bus.drain();
        result
    }

    fn resolve_start(
        &self,
        inner: &mut Inner,
        owner_id: &OwnerId,
        session_id: Uuid,
        acquired: Result<PendingCapture, DeviceError>,
    ) -> RecordingResult<()> {
        let shared = &self.shared;
        if inner.pending != Some(session_id) {
            // Cancelled while the device was being acquired
            if let Ok(pending) = acquired {
                pending.discard();
            }
            return Err(RecordingError::StartCancelled);
        }
        inner.pending = None;

        let started = acquired.and_then(|pending| {
            pending.begin(&shared.config.preferred_formats, shared.config.fragment_interval())
        });
        match started {
            Ok((capture, track_ended)) => {
                inner.session.started_at = Some(capture.started_at());
                inner.capture = Some(capture);
                inner.watcher = Some(self.watch_track(session_id, track_ended));
                shared.keep_alive.acquire();
                inner.publish(&shared.bus, Some(owner_id.clone()), RecordingEvent::Started);
                tracing::info!("Recording started for {}", owner_id);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Microphone unavailable for {}: {}", owner_id, e);
                inner.session.reset();
                inner.publish(
                    &shared.bus,
                    Some(owner_id.clone()),
                    RecordingEvent::StartFailed {
                        message: e.to_string(),
                    },
                );
                Err(RecordingError::PermissionDenied(e.to_string()))
            }
        }
    }

    /// Watch for the device ending the track on its own
    fn watch_track(&self, session_id: Uuid, mut track_ended: TrackEnded) -> JoinHandle<()> {
        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        tokio::spawn(async move {
            if !track_ended.wait().await {
                return;
            }
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let coordinator = RecordingCoordinator { shared };
            match coordinator
                .finish(StopRequest::Interrupted(session_id))
                .await
            {
                Ok(outcome) => tracing::info!("Interrupted session finished: {:?}", outcome),
                Err(RecordingError::NotRecording) => {
                    tracing::debug!("Track ended after session {} was stopped", session_id)
                }
                Err(e) => tracing::error!("Interrupted session failed: {}", e),
            }
        })
    }

    /// Abandon a start still waiting for the device
    ///
    /// The device is closed as soon as it resolves; capture never begins.
    pub fn request_cancel_pending_start(&self, owner_id: &OwnerId) -> bool {
        let cancelled = {
            let mut inner = self.shared.inner.lock();
            if inner.pending.is_none() || !inner.session.is_owned_by(owner_id) {
                return false;
            }
            self.cancel_pending(&mut inner, owner_id);
            true
        };
        self.shared.bus.drain();
        cancelled
    }

    fn cancel_pending(&self, inner: &mut Inner, owner_id: &OwnerId) {
        inner.pending = None;
        inner.session.reset();
        inner.publish(
            &self.shared.bus,
            Some(owner_id.clone()),
            RecordingEvent::StartCancelled,
        );
        tracing::info!("Pending start for {} cancelled", owner_id);
    }

    /// Pause the active session
    pub fn request_pause(&self) -> bool {
        self.set_paused(None, true)
    }

    /// Resume the active session
    pub fn request_resume(&self) -> bool {
        self.set_paused(None, false)
    }

    /// Pause only if `owner_id` owns the active session
    pub fn request_pause_for(&self, owner_id: &OwnerId) -> bool {
        self.set_paused(Some(owner_id), true)
    }

    /// Resume only if `owner_id` owns the active session
    pub fn request_resume_for(&self, owner_id: &OwnerId) -> bool {
        self.set_paused(Some(owner_id), false)
    }

    fn set_paused(&self, owner_id: Option<&OwnerId>, pause: bool) -> bool {
        let (from, to, event) = if pause {
            (RecordingState::Recording, RecordingState::Paused, RecordingEvent::Paused)
        } else {
            (RecordingState::Paused, RecordingState::Recording, RecordingEvent::Resumed)
        };

        {
            let mut inner = self.shared.inner.lock();
            if inner.session.state != from {
                return false;
            }
            if let Some(owner_id) = owner_id {
                if !inner.session.is_owned_by(owner_id) {
                    return false;
                }
            }
            let Some(capture) = inner.capture.as_mut() else {
                return false;
            };
            let changed = if pause { capture.pause() } else { capture.resume() };
            if !changed {
                return false;
            }

            inner.session.state = to;
            let subject = inner.session.owner_id.clone();
            inner.publish(&self.shared.bus, subject, event);
            tracing::info!("Recording {:?}", to);
        }
        self.shared.bus.drain();
        true
    }

    /// Stop the active session of `owner_id` and upload what was captured
    pub async fn request_stop(&self, owner_id: &OwnerId) -> RecordingResult<StopOutcome> {
        self.finish(StopRequest::Owner(owner_id)).await
    }

    async fn finish(&self, request: StopRequest<'_>) -> RecordingResult<StopOutcome> {
        let interrupted = matches!(request, StopRequest::Interrupted(_));

        let (session_id, owner_id, capture) = {
            let mut inner = self.shared.inner.lock();
            let Some(owner_id) = inner
                .session
                .owner_id
                .clone()
                .filter(|_| inner.session.state.is_active())
            else {
                return Err(RecordingError::NotRecording);
            };

            match request {
                StopRequest::Owner(requested) if *requested != owner_id => {
                    return Err(RecordingError::Busy { active: owner_id });
                }
                StopRequest::Interrupted(id) if inner.session.id != Some(id) => {
                    return Err(RecordingError::NotRecording);
                }
                _ => {}
            }

            if inner.session.state == RecordingState::Uploading {
                return Err(RecordingError::NotRecording);
            }

            let Some(capture) = inner.capture.take() else {
                // Stop arrived before the device did
                if inner.pending.is_some() {
                    self.cancel_pending(&mut inner, &owner_id);
                    drop(inner);
                    self.shared.bus.drain();
                    return Ok(StopOutcome::Cancelled);
                }
                return Err(RecordingError::NotRecording);
            };

            if let Some(watcher) = inner.watcher.take() {
                if !interrupted {
                    watcher.abort();
                }
            }

            inner.session.state = RecordingState::Uploading;
            self.shared.keep_alive.release();
            if interrupted {
                inner.publish(
                    &self.shared.bus,
                    Some(owner_id.clone()),
                    RecordingEvent::Interrupted,
                );
            }
            inner.publish(
                &self.shared.bus,
                Some(owner_id.clone()),
                RecordingEvent::Uploading,
            );
            (inner.session.id, owner_id, capture)
        };
        self.shared.bus.drain();
        tracing::info!("Stopping recording for {}", owner_id);

        let audio = capture.stop(interrupted).await;
        if audio.is_empty() {
            tracing::info!("Nothing captured for {}, skipping upload", owner_id);
            self.settle(session_id, &owner_id, RecordingEvent::Discarded);
            return Ok(StopOutcome::Discarded);
        }

        let url = match self.shared.uploader.put(&owner_id, &audio).await {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(
                    "Upload failed for {}, dropping {} captured bytes: {}",
                    owner_id,
                    audio.len(),
                    e
                );
                self.settle(
                    session_id,
                    &owner_id,
                    RecordingEvent::UploadFailed {
                        message: e.to_string(),
                    },
                );
                return Err(RecordingError::Upload(e));
            }
        };

        let listed = self
            .shared
            .recordings
            .append_recording(&owner_id, &url)
            .await;
        self.settle(
            session_id,
            &owner_id,
            RecordingEvent::Saved { url: url.clone() },
        );

        match listed {
            Ok(()) => Ok(StopOutcome::Saved { url }),
            Err(e) => {
                tracing::error!("Stored {} but could not list it for {}: {}", url, owner_id, e);
                Err(RecordingError::Persistence(e))
            }
        }
    }

    /// Return an uploading session to idle
    fn settle(&self, session_id: Option<Uuid>, owner_id: &OwnerId, event: RecordingEvent) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.session.id != session_id {
                tracing::warn!("Session changed while {} was uploading", owner_id);
                return;
            }
            inner.session.reset();
            inner.publish(&self.shared.bus, Some(owner_id.clone()), event);
        }
        self.shared.bus.drain();
    }

    /// React to the hosting view becoming visible or hidden
    pub fn handle_visibility_change(&self, visibility: Visibility) {
        if visibility != Visibility::Visible {
            return;
        }
        let inner = self.shared.inner.lock();
        if inner.session.state == RecordingState::Recording && inner.capture.is_some() {
            tracing::debug!("View visible again, refreshing wake lock");
            self.shared.keep_alive.reacquire_wake_lock();
        }
    }

    /// Whether the keep-alive is currently held
    ///
    /// Lets a control warn that capture may be throttled in the background
    /// when the platform offered neither a silent loop nor a wake lock.
    pub fn keep_alive_active(&self) -> bool {
        self.shared.keep_alive.is_acquired()
    }

    /// Recordings previously saved for `owner_id`
    pub async fn recordings(&self, owner_id: &OwnerId) -> RecordingResult<Vec<String>> {
        Ok(self.shared.recordings.recordings(owner_id).await?)
    }

    /// Remove a saved recording from the owner's list
    pub async fn remove_recording(&self, owner_id: &OwnerId, url: &str) -> RecordingResult<()> {
        self.shared.recordings.remove_recording(owner_id, url).await?;
        tracing::info!("Removed {} from {}", url, owner_id);
        Ok(())
    }
}
