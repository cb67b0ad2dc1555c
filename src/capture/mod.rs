//! Microphone capture
//!
//! Platform traits for the audio input, format negotiation and the capture
//! session that turns emitted fragments into one finalized recording.

pub mod format;
pub mod session;
pub mod traits;

pub use format::AudioFormat;
pub use session::{CaptureSession, CapturedAudio, FragmentSink, PendingCapture, TrackEnded};
pub use traits::{AudioDevice, AudioInput, DeviceError};
