//! Capture trait definitions
//!
//! Platform-agnostic traits for the microphone. The host app implements
//! these on top of whatever audio API it runs on.

use super::session::FragmentSink;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Device acquisition and control errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    #[error("no audio input device available")]
    NoDevice,

    #[error("device error: {0}")]
    Hardware(String),
}

/// Permission/device entry point of the platform
#[async_trait]
pub trait AudioInput: Send + Sync {
    /// Ask for the microphone
    ///
    /// May block on a user permission prompt for an unbounded time.
    async fn request_audio_input(&self) -> Result<Box<dyn AudioDevice>, DeviceError>;
}

/// An opened microphone with an encoder attached
#[async_trait]
pub trait AudioDevice: Send {
    /// Whether the encoder can produce the given MIME type
    fn supports_mime(&self, mime: &str) -> bool;

    /// Start encoding, emitting a fragment roughly every `timeslice`
    fn start(&mut self, mime: &str, timeslice: Duration, sink: FragmentSink)
        -> Result<(), DeviceError>;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Stop encoding
    ///
    /// Buffered data must be pushed to the sink before this returns.
    async fn stop(&mut self);

    /// Release the device. Safe to call more than once.
    fn close(&mut self);
}
