//! Recitation Recorder - one microphone, many recording controls.
//!
//! This is the library crate behind the recitation practice screens.
//! It serializes access to the microphone across every mounted recording
//! control, keeps the device awake while capturing, and uploads finished
//! recordings to storage.

pub mod capture;
pub mod commands;
pub mod config;
pub mod keepalive;
pub mod persistence;
pub mod recorder;
pub mod upload;
pub mod utils;

pub use commands::{BindingView, ObserverBinding};
pub use config::RecorderConfig;
pub use recorder::{
    Collaborators, OwnerId, RecorderSnapshot, RecordingCoordinator, RecordingError,
    RecordingEvent, RecordingNotice, RecordingState, StopOutcome, Subscription,
};
pub use utils::{AppError, AppResult, ErrorResponse};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging
///
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recitation_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("Starting Recitation Recorder v{}", env!("CARGO_PKG_VERSION"));
    }
}
