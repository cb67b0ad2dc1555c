use super::state::OwnerId;
use crate::persistence::PersistenceError;
use crate::upload::UploadFailure;
use thiserror::Error;

/// Errors returned by coordinator commands
#[derive(Error, Debug)]
pub enum RecordingError {
    /// Another owner holds the microphone
    #[error("microphone is in use by '{active}'")]
    Busy { active: OwnerId },

    /// The microphone could not be acquired (refused or broken)
    #[error("microphone unavailable: {0}")]
    PermissionDenied(String),

    #[error("start was cancelled before the microphone was ready")]
    StartCancelled,

    #[error("no recording in progress")]
    NotRecording,

    /// Captured audio was dropped because it could not be stored
    #[error(transparent)]
    Upload(#[from] UploadFailure),

    /// Audio was stored but the owner's list was not updated
    #[error("recording stored but not listed: {0}")]
    Persistence(#[from] PersistenceError),
}

pub type RecordingResult<T> = Result<T, RecordingError>;
