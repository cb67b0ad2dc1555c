//! Recording coordination
//!
//! This module implements the single-flight recording service:
//! - RecordingCoordinator owning the one microphone session
//! - The recording state machine and snapshots
//! - An ordered event bus fanning transitions out to controls

pub mod coordinator;
pub mod error;
pub mod events;
pub mod state;

pub use coordinator::{Collaborators, RecordingCoordinator};
pub use error::{RecordingError, RecordingResult};
pub use events::{RecordingEvent, RecordingNotice, Subscription};
pub use state::{OwnerId, RecorderSnapshot, RecordingSession, RecordingState, StopOutcome};
