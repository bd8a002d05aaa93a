//! User-supplied alarm audio
//!
//! Custom sounds travel as base64 data URLs (`data:audio/wav;base64,...`).
//! The payload stays opaque until playback, when it is turned back into the
//! encoded bytes the backend decodes.

use std::fmt;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::debug;

use crate::error::{AlarmError, AlarmResult};

/// Encoded audio clip supplied by the user
#[derive(Clone, PartialEq, Eq)]
pub struct CustomAudioPayload {
    data_url: String,
}

impl CustomAudioPayload {
    /// Wrap a data URL without validating it
    pub fn from_data_url(data_url: impl Into<String>) -> Self {
        Self {
            data_url: data_url.into(),
        }
    }

    /// Build a payload from raw encoded audio bytes
    pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
        Self::from_data_url(format!("data:{};base64,{}", mime, BASE64.encode(bytes)))
    }

    /// Read an audio file and encode it as a data URL
    pub fn from_file(path: &Path) -> AlarmResult<Self> {
        if !path.exists() {
            return Err(AlarmError::FileNotFound(path.to_path_buf()));
        }

        let bytes = std::fs::read(path).map_err(|e| AlarmError::DecodeError(e.to_string()))?;
        let mime = mime_for_path(path);

        debug!(
            path = %path.display(),
            mime = %mime,
            bytes = bytes.len(),
            "Loaded custom sound file"
        );

        Ok(Self::from_bytes(mime, &bytes))
    }

    /// The full data URL
    pub fn as_data_url(&self) -> &str {
        &self.data_url
    }

    /// MIME type declared in the data URL header, if any
    pub fn mime_type(&self) -> Option<&str> {
        let (header, _) = self.data_url.split_once(',')?;
        let header = header.strip_prefix("data:")?;
        let mime = header.split(';').next()?;
        (!mime.is_empty()).then_some(mime)
    }

    /// Strip the data URL header and base64-decode the body
    pub fn decode_bytes(&self) -> AlarmResult<Vec<u8>> {
        let (_, body) = self
            .data_url
            .split_once(',')
            .ok_or_else(|| AlarmError::InvalidPayload("missing data URL separator".into()))?;

        let bytes = BASE64
            .decode(body.trim())
            .map_err(|e| AlarmError::InvalidPayload(e.to_string()))?;

        if bytes.is_empty() {
            return Err(AlarmError::InvalidPayload("empty audio data".into()));
        }

        Ok(bytes)
    }
}

impl fmt::Debug for CustomAudioPayload {
    // Payloads can be megabytes of base64
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAudioPayload")
            .field("mime", &self.mime_type())
            .field("len", &self.data_url.len())
            .finish()
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}
