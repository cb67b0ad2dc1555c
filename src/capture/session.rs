//! Capture session
//!
//! Owns an opened microphone for the length of one recording, collects the
//! fragments it emits and finalizes them into [`CapturedAudio`].

use super::format::AudioFormat;
use super::traits::{AudioDevice, AudioInput, DeviceError};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
    sealed: bool,
}

/// Write end handed to the device
///
/// Fragments are appended in call order. Once the session is finalized the
/// buffer is sealed and late fragments are dropped.
#[derive(Clone)]
pub struct FragmentSink {
    buffer: Arc<Mutex<ChunkBuffer>>,
    track_ended: mpsc::UnboundedSender<()>,
}

impl FragmentSink {
    /// Append a fragment. Returns `false` if it was not kept.
    pub fn push(&self, fragment: Vec<u8>) -> bool {
        if fragment.is_empty() {
            return false;
        }
        let mut buffer = self.buffer.lock();
        if buffer.sealed {
            tracing::debug!("Dropping {} byte fragment after finalize", fragment.len());
            return false;
        }
        tracing::trace!("Fragment {} ({} bytes)", buffer.chunks.len(), fragment.len());
        buffer.chunks.push(fragment);
        true
    }

    /// Report that the underlying track ended without being asked to
    pub fn end_of_track(&self) {
        if self.buffer.lock().sealed {
            return;
        }
        tracing::warn!("Audio track ended unexpectedly");
        let _ = self.track_ended.send(());
    }
}

/// Receives the device's unexpected end-of-track signal
pub struct TrackEnded {
    rx: mpsc::UnboundedReceiver<()>,
}

impl TrackEnded {
    /// Resolves `true` when the track ended, `false` once the device let go
    /// of every sink without reporting an end.
    pub async fn wait(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

/// The finalized capture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
    pub chunk_count: usize,
    pub started_at: DateTime<Utc>,
    /// The device ended the track before stop was requested
    pub interrupted: bool,
}

impl CapturedAudio {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// A device that was granted but has not started capturing
pub struct PendingCapture {
    device: Option<Box<dyn AudioDevice>>,
}

impl PendingCapture {
    /// Negotiate the encoding and start collecting fragments
    pub fn begin(
        mut self,
        preferences: &[AudioFormat],
        timeslice: Duration,
    ) -> Result<(CaptureSession, TrackEnded), DeviceError> {
        let Some(mut device) = self.device.take() else {
            return Err(DeviceError::NoDevice);
        };

        let format = AudioFormat::negotiate(preferences, |mime| device.supports_mime(mime));
        let buffer = Arc::new(Mutex::new(ChunkBuffer::default()));
        let (track_ended, rx) = mpsc::unbounded_channel();
        let sink = FragmentSink {
            buffer: buffer.clone(),
            track_ended,
        };

        if let Err(e) = device.start(format.mime_type(), timeslice, sink) {
            device.close();
            return Err(e);
        }
        tracing::info!("Capture started as {}", format.mime_type());

        let session = CaptureSession {
            device: Some(device),
            format,
            buffer,
            paused: false,
            started_at: Utc::now(),
        };
        Ok((session, TrackEnded { rx }))
    }

    /// Close the device without ever starting capture
    pub fn discard(mut self) {
        if let Some(mut device) = self.device.take() {
            device.close();
            tracing::info!("Released microphone from cancelled start");
        }
    }
}

impl Drop for PendingCapture {
    fn drop(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.close();
        }
    }
}

/// An active capture
pub struct CaptureSession {
    device: Option<Box<dyn AudioDevice>>,
    format: AudioFormat,
    buffer: Arc<Mutex<ChunkBuffer>>,
    paused: bool,
    started_at: DateTime<Utc>,
}

impl CaptureSession {
    /// Acquire the microphone
    pub async fn open(input: &dyn AudioInput) -> Result<PendingCapture, DeviceError> {
        let device = input.request_audio_input().await?;
        Ok(PendingCapture {
            device: Some(device),
        })
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn chunk_count(&self) -> usize {
        self.buffer.lock().chunks.len()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn pause(&mut self) -> bool {
        if self.paused {
            return false;
        }
        if let Some(device) = self.device.as_mut() {
            device.pause();
        }
        self.paused = true;
        true
    }

    pub fn resume(&mut self) -> bool {
        if !self.paused {
            return false;
        }
        if let Some(device) = self.device.as_mut() {
            device.resume();
        }
        self.paused = false;
        true
    }

    /// Flush, seal and release the device
    pub async fn stop(mut self, interrupted: bool) -> CapturedAudio {
        if let Some(mut device) = self.device.take() {
            device.stop().await;
            device.close();
        }

        let chunks = {
            let mut buffer = self.buffer.lock();
            buffer.sealed = true;
            std::mem::take(&mut buffer.chunks)
        };
        let chunk_count = chunks.len();
        let bytes = chunks.concat();

        tracing::info!(
            "Capture finalized: {} chunk(s), {} bytes{}",
            chunk_count,
            bytes.len(),
            if interrupted { " (interrupted)" } else { "" }
        );

        CapturedAudio {
            bytes,
            format: self.format,
            chunk_count,
            started_at: self.started_at,
            interrupted,
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(mut device) = self.device.take() {
            self.buffer.lock().sealed = true;
            device.close();
        }
    }
}
