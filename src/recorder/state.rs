//! Recording state management
//!
//! Defines the recording state machine and the single session it drives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identity of the task or record a recording is attached to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for OwnerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Current state of the recording system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    #[default]
    Idle,
    /// Currently recording
    Recording,
    /// Recording is paused
    Paused,
    /// Capture finalized, upload in flight
    Uploading,
}

impl RecordingState {
    /// Whether a session holds the microphone in this state
    pub fn is_active(self) -> bool {
        self != RecordingState::Idle
    }
}

/// The one mutable session owned by the coordinator
///
/// Captured fragments live in the attached capture session; this struct
/// only tracks ownership and lifecycle.
#[derive(Debug, Clone, Default)]
pub struct RecordingSession {
    /// Reservation id, fresh for every start
    pub id: Option<Uuid>,

    /// Owner of the active session (`None` while idle)
    pub owner_id: Option<OwnerId>,

    /// Lifecycle state
    pub state: RecordingState,

    /// When capture actually began
    pub started_at: Option<DateTime<Utc>>,
}

impl RecordingSession {
    /// Reserve the session for an owner ahead of device acquisition
    pub fn reserve(&mut self, owner_id: OwnerId) -> Uuid {
        let id = Uuid::new_v4();
        self.id = Some(id);
        self.owner_id = Some(owner_id);
        self.state = RecordingState::Recording;
        self.started_at = None;
        id
    }

    /// Return to idle, dropping ownership
    pub fn reset(&mut self) {
        *self = RecordingSession::default();
    }

    /// Whether the session is active and belongs to `owner_id`
    pub fn is_owned_by(&self, owner_id: &OwnerId) -> bool {
        self.state.is_active() && self.owner_id.as_ref() == Some(owner_id)
    }
}

/// Point-in-time view of the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderSnapshot {
    pub owner_id: Option<OwnerId>,
    pub state: RecordingState,
    /// Number of transitions published so far
    pub sequence: u64,
}

impl RecorderSnapshot {
    /// Whether the snapshot describes an active session for `owner_id`
    pub fn is_mine(&self, owner_id: &OwnerId) -> bool {
        self.state.is_active() && self.owner_id.as_ref() == Some(owner_id)
    }
}

/// Result of a completed stop request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum StopOutcome {
    /// Upload succeeded and the URL was recorded for the owner
    Saved { url: String },
    /// Nothing was captured, nothing was uploaded
    Discarded,
    /// The start never completed; the device was released
    Cancelled,
}
