//! Gemini `generateContent` backend.
//!
//! Audio is sent inline (base64) next to the prompt; transcripts are sent as
//! a second text part. JSON responses are requested through
//! `responseMimeType` so the judgment parser sees a bare object.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use super::{GenerationBackend, GenerationRequest, Payload, classify_failure};
use crate::error::CallError;
use crate::http::get_http_client;

/// Low temperature keeps repeated judgments of the same call stable.
const TEMPERATURE: f32 = 0.2;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Gemini backend over the shared HTTP client.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl GeminiBackend {
    pub fn new(endpoint: &str) -> anyhow::Result<Self> {
        Ok(Self::with_client(get_http_client()?.clone(), endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.trim().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, model)
    }
}

fn build_body<'a>(request: &'a GenerationRequest<'_>) -> GenerateRequest<'a> {
    let mut parts = vec![Part::Text {
        text: &request.prompt,
    }];

    match request.payload {
        Some(Payload::Text(transcript)) => parts.push(Part::Text {
            text: transcript.as_str(),
        }),
        Some(Payload::Audio { data, mime_type }) => parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: mime_type.as_str(),
                data: BASE64.encode(data),
            },
        }),
        None => {}
    }

    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts,
        }],
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            response_mime_type: request.json_response.then_some("application/json"),
        },
    }
}

fn extract_text(response: GenerateResponse) -> Result<String, CallError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    let reason = response
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .map(|r| format!("response blocked ({r})"))
        .unwrap_or_else(|| "response contained no text".to_string());
    Err(CallError::ModelUnavailable(reason))
}

fn classify_send_error(err: &reqwest::Error) -> CallError {
    let kind = if err.is_timeout() {
        "request timed out"
    } else if err.is_connect() {
        "connection failed"
    } else {
        "request failed"
    };
    CallError::TransientNetwork(format!("{kind}: {err}"))
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        request: &GenerationRequest<'_>,
    ) -> Result<String, CallError> {
        let response = self
            .client
            .post(self.url(model))
            .header("x-goog-api-key", api_key)
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| classify_send_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(
                status.as_u16(),
                retry_after.as_deref(),
                &body,
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CallError::TransientNetwork(format!("failed to read response: {e}")))?;
        let parsed: GenerateResponse = serde_json::from_str(&body)
            .map_err(|e| CallError::ModelUnavailable(format!("unexpected response shape: {e}")))?;
        extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_trims_trailing_slash() {
        let backend = GeminiBackend::with_client(reqwest::Client::new(), "https://example.test/ ");
        assert_eq!(
            backend.url("gemini-2.0-flash"),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_body_with_audio_payload() {
        let payload = Payload::Audio {
            data: vec![1, 2, 3],
            mime_type: "audio/wav".to_string(),
        };
        let request = GenerationRequest::json("Rate the call", &payload);
        let body = serde_json::to_value(build_body(&request)).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Rate the call");
        assert_eq!(
            body["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "audio/wav"
        );
        assert_eq!(body["contents"][0]["parts"][1]["inline_data"]["data"], "AQID");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_body_with_text_payload() {
        let payload = Payload::Text("Agent: Hello!".to_string());
        let request = GenerationRequest::json("Rate the call", &payload);
        let body = serde_json::to_value(build_body(&request)).unwrap();
        assert_eq!(body["contents"][0]["parts"][1]["text"], "Agent: Hello!");
    }

    #[test]
    fn test_plain_request_omits_mime_type() {
        let request = GenerationRequest::text("ping");
        let body = serde_json::to_value(build_body(&request)).unwrap();
        assert!(body["generationConfig"].get("responseMimeType").is_none());
        assert_eq!(body["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_extract_text_reports_block_reason() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        let err = extract_text(response).unwrap_err();
        assert_eq!(
            err,
            CallError::ModelUnavailable("response blocked (SAFETY)".to_string())
        );
    }
}
