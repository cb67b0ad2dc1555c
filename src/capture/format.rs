//! Audio container negotiation

use serde::{Deserialize, Serialize};

/// Encodings the recorder knows how to ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioFormat {
    WebmOpus,
    OggOpus,
    Mp4Aac,
    Wav,
}

impl AudioFormat {
    /// Used when nothing in the preference list is supported
    pub const FALLBACK: AudioFormat = AudioFormat::Wav;

    /// Compressed containers, most preferred first
    pub const DEFAULT_PREFERENCES: [AudioFormat; 3] =
        [AudioFormat::WebmOpus, AudioFormat::OggOpus, AudioFormat::Mp4Aac];

    /// Full MIME type including codec parameters
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::WebmOpus => "audio/webm;codecs=opus",
            AudioFormat::OggOpus => "audio/ogg;codecs=opus",
            AudioFormat::Mp4Aac => "audio/mp4",
            AudioFormat::Wav => "audio/wav",
        }
    }

    /// Container MIME type, used as the upload content type
    pub fn content_type(&self) -> &'static str {
        let mime = self.mime_type();
        mime.split(';').next().unwrap_or(mime)
    }

    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::WebmOpus => "webm",
            AudioFormat::OggOpus => "ogg",
            AudioFormat::Mp4Aac => "m4a",
            AudioFormat::Wav => "wav",
        }
    }

    /// Pick the first preferred format the platform supports
    ///
    /// Deterministic for a given capability set.
    pub fn negotiate<F>(preferences: &[AudioFormat], supports: F) -> AudioFormat
    where
        F: Fn(&str) -> bool,
    {
        preferences
            .iter()
            .copied()
            .find(|format| supports(format.mime_type()))
            .unwrap_or(Self::FALLBACK)
    }
}
