use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::llm::media::{encode_image, InlineImage};
use crate::llm::{GenerationRequest, GenerativeModel};
use crate::utils::format::truncate_for_log;
use crate::utils::timing::log_llm_timing;

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_base: String,
    timeout: Duration,
    temperature: Option<f32>,
    max_output_tokens: Option<i32>,
}

fn redact_api_key(text: &str, api_key: &str) -> String {
    let key = api_key.trim();
    if key.is_empty() {
        return text.to_string();
    }
    text.replace(key, "[redacted]")
}

fn summarize_gemini_parts(parts: &[Value]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| {
            if let Some(text) = part.get("text").and_then(|value| value.as_str()) {
                json!({ "text": truncate_for_log(text, 200) })
            } else if let Some(inline_data) = part.get("inlineData") {
                let mime_type = inline_data
                    .get("mimeType")
                    .and_then(|value| value.as_str())
                    .unwrap_or("unknown");
                let data_len = inline_data
                    .get("data")
                    .and_then(|value| value.as_str())
                    .map(|value| value.len())
                    .unwrap_or(0);
                json!({ "inlineData": { "mimeType": mime_type, "dataLen": data_len } })
            } else {
                json!({ "unknownPart": true })
            }
        })
        .collect()
}

fn summarize_gemini_payload(payload: &Value) -> Value {
    let mut summary = Map::new();

    if let Some(parts) = payload
        .pointer("/contents/0/parts")
        .and_then(|value| value.as_array())
    {
        summary.insert(
            "parts".to_string(),
            Value::Array(summarize_gemini_parts(parts)),
        );
    }

    if let Some(config) = payload.get("generationConfig") {
        summary.insert("generationConfig".to_string(), config.clone());
    }

    Value::Object(summary)
}

/// Pulls the human-readable message plus any machine-readable reason codes
/// (`API_KEY_INVALID`, `RESOURCE_EXHAUSTED`, ...) out of an error body.
fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return truncate_for_log(trimmed, 2000);
    };

    let message = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("message").and_then(|v| v.as_str()));

    let mut codes: Vec<String> = Vec::new();
    if let Some(status) = value.pointer("/error/status").and_then(|v| v.as_str()) {
        codes.push(status.to_string());
    }
    if let Some(details) = value.pointer("/error/details").and_then(|v| v.as_array()) {
        for detail in details {
            if let Some(reason) = detail.get("reason").and_then(|v| v.as_str()) {
                if !codes.iter().any(|code| code == reason) {
                    codes.push(reason.to_string());
                }
            }
        }
    }

    match (message, codes.is_empty()) {
        (Some(message), true) => message.to_string(),
        (Some(message), false) => format!("{} [{}]", message, codes.join(", ")),
        (None, _) => truncate_for_log(&value.to_string(), 2000),
    }
}

fn build_gemini_parts(prompt: &str, images: &[InlineImage]) -> Vec<Value> {
    let mut parts = Vec::with_capacity(images.len() + 1);
    parts.push(json!({ "text": prompt }));
    for image in images {
        parts.push(json!({
            "inlineData": {
                "mimeType": image.mime_type,
                "data": encode_image(image)
            }
        }));
    }
    parts
}

fn extract_text_from_response(response: GeminiResponse) -> Result<String> {
    let mut text_parts = Vec::new();
    let mut finish_reason = None;
    for candidate in response.candidates.unwrap_or_default() {
        if finish_reason.is_none() {
            finish_reason = candidate.finish_reason;
        }
        let Some(parts) = candidate.content.and_then(|content| content.parts) else {
            continue;
        };
        for part in parts {
            if let Some(text) = part.text {
                if !text.trim().is_empty() {
                    text_parts.push(text);
                }
            }
        }
    }

    if text_parts.is_empty() {
        return Err(anyhow!(
            "Gemini returned an empty response (finishReason={})",
            finish_reason.as_deref().unwrap_or("unknown")
        ));
    }
    Ok(text_parts.join("\n"))
}

impl GeminiClient {
    pub fn new(client: Client, api_base: &str, timeout: Duration) -> Self {
        GeminiClient {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            timeout,
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_generation_config(
        mut self,
        temperature: Option<f32>,
        max_output_tokens: Option<i32>,
    ) -> Self {
        self.temperature = temperature;
        self.max_output_tokens = max_output_tokens;
        self
    }

    fn build_payload(&self, prompt: &str, images: &[InlineImage]) -> Value {
        let mut payload = json!({
            "contents": [{ "role": "user", "parts": build_gemini_parts(prompt, images) }],
        });

        let mut generation_config = Map::new();
        if let Some(temperature) = self.temperature {
            generation_config.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_output_tokens) = self.max_output_tokens {
            generation_config.insert("maxOutputTokens".to_string(), json!(max_output_tokens));
        }
        if !generation_config.is_empty() {
            if let Some(object) = payload.as_object_mut() {
                object.insert(
                    "generationConfig".to_string(),
                    Value::Object(generation_config),
                );
            }
        }

        payload
    }

    async fn call_gemini_api(&self, api_key: &str, model: &str, payload: Value) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, model);

        if tracing::enabled!(tracing::Level::DEBUG) {
            let payload_summary = summarize_gemini_payload(&payload);
            debug!(target: "llm.gemini", model = model, payload = %payload_summary);
        }

        let response = match self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let err_text = redact_api_key(&err.to_string(), api_key);
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={})",
                    err_text,
                    err.is_timeout(),
                    err.is_connect()
                );
                return Err(anyhow!("Gemini request failed: {}", err_text));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = redact_api_key(&summarize_error_body(&body), api_key);
            warn!("Gemini API error: status={}, detail={}", status, detail);
            return Err(anyhow!(
                "Gemini request failed with status {}: {}",
                status,
                detail
            ));
        }

        let value = response.json::<GeminiResponse>().await?;
        extract_text_from_response(value)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String> {
        let payload = self.build_payload(request.prompt, request.images);
        let metadata = json!({ "images": request.images.len() });

        log_llm_timing(
            "gemini",
            request.model,
            request.operation,
            Some(metadata),
            || self.call_gemini_api(request.api_key, request.model, payload),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::media::{MIME_JPEG, MIME_PNG};
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured {
        calls: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
    }

    async fn fake_generate(
        State(captured): State<Captured>,
        Path(model_call): Path<String>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let key = headers
            .get("x-goog-api-key")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        captured
            .calls
            .lock()
            .unwrap()
            .push((model_call, key.clone(), body));

        if key.as_deref() == Some("bad-key") {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": {
                        "code": 400,
                        "message": "API key not valid. Please pass a valid API key.",
                        "status": "INVALID_ARGUMENT",
                        "details": [{ "reason": "API_KEY_INVALID" }]
                    }
                })),
            );
        }

        (
            StatusCode::OK,
            Json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "OK" }, { "text": "です" }] },
                    "finishReason": "STOP"
                }]
            })),
        )
    }

    async fn spawn_fake_gemini() -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route("/v1beta/models/:model_call", post(fake_generate))
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/v1beta"), captured)
    }

    fn local_client() -> Client {
        Client::builder().no_proxy().build().unwrap()
    }

    fn request<'a>(api_key: &'a str, images: &'a [InlineImage]) -> GenerationRequest<'a> {
        GenerationRequest {
            api_key,
            model: "gemini-2.0-flash",
            prompt: "Say 'OK' in one word.",
            images,
            operation: "test",
        }
    }

    #[tokio::test]
    async fn sends_prompt_then_images_with_header_key() {
        let (base, captured) = spawn_fake_gemini().await;
        let client = GeminiClient::new(local_client(), &base, Duration::from_secs(5));
        let images = vec![
            InlineImage { mime_type: MIME_PNG, bytes: vec![1, 2, 3] },
            InlineImage { mime_type: MIME_JPEG, bytes: vec![4, 5] },
        ];

        let text = client.generate(request("good-key", &images)).await.unwrap();
        assert_eq!(text, "OK\nです");

        let calls = captured.calls.lock().unwrap();
        let (model_call, key, body) = &calls[0];
        assert_eq!(model_call, "gemini-2.0-flash:generateContent");
        assert_eq!(key.as_deref(), Some("good-key"));
        let parts = body.pointer("/contents/0/parts").unwrap().as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], "Say 'OK' in one word.");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
        assert_eq!(parts[2]["inlineData"]["mimeType"], "image/jpeg");
        assert!(body.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn surfaces_upstream_message_and_reason() {
        let (base, _captured) = spawn_fake_gemini().await;
        let client = GeminiClient::new(local_client(), &base, Duration::from_secs(5));

        let err = client.generate(request("bad-key", &[])).await.unwrap_err();
        let text = err.to_string();
        assert!(text.contains("400"));
        assert!(text.contains("API key not valid"));
        assert!(text.contains("API_KEY_INVALID"));
        assert!(!text.contains("bad-key"));
    }

    #[test]
    fn generation_config_is_only_sent_when_configured() {
        let client = GeminiClient::new(Client::new(), "http://unused/", Duration::from_secs(1))
            .with_generation_config(Some(0.4), Some(1024));
        let payload = client.build_payload("hi", &[]);
        assert_eq!(payload["generationConfig"]["maxOutputTokens"], 1024);
        assert!(payload["generationConfig"]["temperature"].is_number());
        assert_eq!(client.api_base, "http://unused");
    }

    #[test]
    fn blank_candidates_are_an_error() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "  " }] }, "finishReason": "SAFETY" }]
        }))
        .unwrap();
        let err = extract_text_from_response(response).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn error_body_falls_back_to_raw_text() {
        assert_eq!(summarize_error_body(""), "empty response body");
        assert_eq!(summarize_error_body("upstream exploded"), "upstream exploded");
        assert_eq!(
            summarize_error_body(r#"{"error":{"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#),
            "Quota exceeded [RESOURCE_EXHAUSTED]"
        );
    }
}
