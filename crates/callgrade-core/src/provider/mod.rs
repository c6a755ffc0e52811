//! Backends for the external generative-AI service.
//!
//! A backend performs exactly one call with one credential and one model and
//! classifies the result. Retrying, rotation, and credential health are the
//! resilient client's job, never the backend's.

mod classify;
mod gemini;
#[cfg(test)]
pub(crate) mod scripted;

use async_trait::async_trait;

use crate::error::CallError;

pub use classify::{classify_failure, parse_retry_delay};
pub use gemini::GeminiBackend;

/// What the call is about: a transcript or the call recording itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Audio { data: Vec<u8>, mime_type: String },
}

impl Payload {
    /// Guess the audio MIME type from a file extension.
    pub fn audio_mime_for_extension(extension: &str) -> Option<&'static str> {
        match extension.to_lowercase().as_str() {
            "wav" => Some("audio/wav"),
            "mp3" => Some("audio/mp3"),
            "m4a" | "aac" => Some("audio/aac"),
            "ogg" | "oga" | "opus" => Some("audio/ogg"),
            "flac" => Some("audio/flac"),
            "aiff" | "aif" => Some("audio/aiff"),
            _ => None,
        }
    }
}

/// A single prompt plus the call payload it refers to.
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub prompt: String,
    pub payload: Option<&'a Payload>,
    /// Ask the service for a JSON document instead of free text
    pub json_response: bool,
}

impl<'a> GenerationRequest<'a> {
    pub fn json(prompt: impl Into<String>, payload: &'a Payload) -> Self {
        Self {
            prompt: prompt.into(),
            payload: Some(payload),
            json_response: true,
        }
    }

    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            payload: None,
            json_response: false,
        }
    }
}

/// One call against the external service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Machine-readable backend name
    fn name(&self) -> &'static str;

    /// Generate a response with the given credential and model.
    ///
    /// Returns the raw text of the response, or a classified failure.
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerationRequest<'_>,
    ) -> Result<String, CallError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_mime_for_extension() {
        assert_eq!(Payload::audio_mime_for_extension("WAV"), Some("audio/wav"));
        assert_eq!(Payload::audio_mime_for_extension("mp3"), Some("audio/mp3"));
        assert_eq!(Payload::audio_mime_for_extension("txt"), None);
    }

    #[test]
    fn test_request_constructors() {
        let payload = Payload::Text("hello".to_string());
        let request = GenerationRequest::json("rate this", &payload);
        assert!(request.json_response);
        assert_eq!(request.payload, Some(&payload));

        let probe = GenerationRequest::text("ping");
        assert!(!probe.json_response);
        assert!(probe.payload.is_none());
    }
}
