//! Recording commands for one mounted control

use crate::recorder::{
    OwnerId, RecorderSnapshot, RecordingCoordinator, RecordingState, StopOutcome, Subscription,
};
use crate::utils::AppResult;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

/// What a control renders
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingView {
    /// This control owns the session and it is capturing
    pub is_recording: bool,
    /// This control owns the session and it is paused
    pub is_paused: bool,
    /// This control's capture is being uploaded
    pub is_uploading: bool,
    /// Another control holds the microphone
    pub busy_elsewhere: bool,
}

impl BindingView {
    pub fn derive(owner_id: &OwnerId, snapshot: &RecorderSnapshot) -> Self {
        let mine = snapshot.is_mine(owner_id);
        Self {
            is_recording: mine && snapshot.state == RecordingState::Recording,
            is_paused: mine && snapshot.state == RecordingState::Paused,
            is_uploading: mine && snapshot.state == RecordingState::Uploading,
            busy_elsewhere: !mine && snapshot.state.is_active(),
        }
    }
}

struct ViewState {
    owner_id: OwnerId,
    /// Sequence of the snapshot the current view was derived from
    applied: Mutex<Option<u64>>,
    tx: watch::Sender<BindingView>,
}

impl ViewState {
    fn apply(&self, snapshot: &RecorderSnapshot) {
        let mut applied = self.applied.lock();
        if applied.is_some_and(|seq| snapshot.sequence <= seq) {
            return;
        }
        *applied = Some(snapshot.sequence);
        let view = BindingView::derive(&self.owner_id, snapshot);
        self.tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }
}

/// Binding between one recording control and the coordinator
///
/// Dropping the binding unsubscribes it.
pub struct ObserverBinding {
    coordinator: RecordingCoordinator,
    state: Arc<ViewState>,
    subscription: Subscription,
}

impl ObserverBinding {
    /// Mount a control for `owner_id`
    pub fn mount(coordinator: &RecordingCoordinator, owner_id: impl Into<OwnerId>) -> Self {
        let owner_id = owner_id.into();
        let (tx, _) = watch::channel(BindingView::default());
        let state = Arc::new(ViewState {
            owner_id,
            applied: Mutex::new(None),
            tx,
        });

        // Subscribe before reading the snapshot so no transition falls in between
        let listener = state.clone();
        let subscription = coordinator.subscribe(move |notice| listener.apply(&notice.snapshot));
        state.apply(&coordinator.get_snapshot());
        tracing::debug!("Mounted recording control {}", state.owner_id);

        Self {
            coordinator: coordinator.clone(),
            state,
            subscription,
        }
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.state.owner_id
    }

    /// Current view
    pub fn view(&self) -> BindingView {
        *self.state.tx.borrow()
    }

    /// Receiver notified on every view change
    pub fn watch(&self) -> watch::Receiver<BindingView> {
        self.state.tx.subscribe()
    }

    /// Start recording for this control
    pub async fn start(&self) -> AppResult<()> {
        self.coordinator.request_start(self.owner_id()).await?;
        Ok(())
    }

    pub fn pause(&self) -> bool {
        self.coordinator.request_pause_for(self.owner_id())
    }

    pub fn resume(&self) -> bool {
        self.coordinator.request_resume_for(self.owner_id())
    }

    /// Stop recording and upload the capture
    pub async fn stop(&self) -> AppResult<StopOutcome> {
        Ok(self.coordinator.request_stop(self.owner_id()).await?)
    }

    /// Abandon a start that is still waiting for the microphone
    pub fn cancel_start(&self) -> bool {
        self.coordinator.request_cancel_pending_start(self.owner_id())
    }

    /// Recordings saved by this control
    pub async fn recordings(&self) -> AppResult<Vec<String>> {
        Ok(self.coordinator.recordings(self.owner_id()).await?)
    }

    pub async fn delete_recording(&self, url: &str) -> AppResult<()> {
        self.coordinator
            .remove_recording(self.owner_id(), url)
            .await?;
        Ok(())
    }

    /// Detach the control; no view updates happen after this returns
    pub fn unmount(self) {
        tracing::debug!("Unmounted recording control {}", self.state.owner_id);
        self.subscription.unsubscribe();
    }
}
