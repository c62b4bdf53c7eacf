use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::handlers::extract::ApiJson;
use crate::handlers::{finish_timer, generate_text};
use crate::llm::media::decode_image_payloads;
use crate::prompts::OCR_PROMPT;
use crate::state::AppState;
use crate::utils::format::truncate_for_log;
use crate::utils::json_block::extract_json;
use crate::utils::timing::start_request_timer;

const OCR_ERROR_CONTEXT: &str = "OCR処理中にエラーが発生しました";

#[derive(Debug, Default, Deserialize)]
pub struct OcrRequest {
    #[serde(default)]
    pub images: Vec<String>,
    pub api_key: Option<String>,
}

/// The six values read from a data-counter screenshot; `None` when unreadable.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct OcrData {
    pub game_count: Option<i64>,
    pub bb_probability: Option<String>,
    pub rb_probability: Option<String>,
    pub skill_true_rate: Option<String>,
    pub skill_extreme_rate: Option<String>,
    pub dance_time_count: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OcrResponse {
    pub data: OcrData,
    pub raw_text: String,
}

fn read_count(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.round() as i64)),
        Value::String(text) => {
            let digits: String = text
                .chars()
                .filter(|ch| !ch.is_whitespace() && *ch != ',')
                .collect();
            digits.parse::<i64>().ok()
        }
        _ => None,
    }
}

fn read_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

impl OcrData {
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(OcrData {
            game_count: read_count(object.get("game_count")),
            bb_probability: read_text(object.get("bb_probability")),
            rb_probability: read_text(object.get("rb_probability")),
            skill_true_rate: read_text(object.get("skill_true_rate")),
            skill_extreme_rate: read_text(object.get("skill_extreme_rate")),
            dance_time_count: read_count(object.get("dance_time_count")),
        })
    }
}

pub async fn extract_ocr_data(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<OcrRequest>,
) -> ApiResult<Json<OcrResponse>> {
    let mut timer = start_request_timer("ocr", request.images.len());
    let result = read_screenshots(&state, request).await;
    finish_timer(&mut timer, &result);
    result.map(Json)
}

async fn read_screenshots(state: &AppState, request: OcrRequest) -> ApiResult<OcrResponse> {
    let api_key = state.resolve_api_key(request.api_key.as_deref())?;
    let images = decode_image_payloads(&request.images)?;
    info!("Reading data counter screenshots: images={}", images.len());

    let raw_text = generate_text(state, &api_key, OCR_PROMPT, &images, "ocr", OCR_ERROR_CONTEXT)
        .await?;

    let value = extract_json(&raw_text).map_err(|err| {
        warn!(
            "OCR reply was not JSON: {} (reply={})",
            err,
            truncate_for_log(&raw_text, 300)
        );
        ApiError::response_shape(OCR_ERROR_CONTEXT, err)
    })?;
    let data = OcrData::from_value(&value).ok_or_else(|| {
        ApiError::response_shape(OCR_ERROR_CONTEXT, "JSON object was expected")
    })?;

    Ok(OcrResponse { data, raw_text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support::*;
    use axum::http::StatusCode;
    use serde_json::json;

    fn request() -> OcrRequest {
        OcrRequest {
            images: vec![JPEG_BASE64.to_string(), JPEG_BASE64.to_string()],
            api_key: Some("user-key".to_string()),
        }
    }

    #[tokio::test]
    async fn parses_fenced_block_and_keeps_raw_text() {
        let reply = "```json\n{\"game_count\": 100}\n``` extra text";
        let model = ScriptedModel::replying(reply);
        let state = state_with(model.clone(), None);

        let Json(body) = extract_ocr_data(State(state), ApiJson(request())).await.unwrap();
        assert_eq!(body.data.game_count, Some(100));
        assert_eq!(body.data.bb_probability, None);
        assert_eq!(body.raw_text, reply);

        let calls = model.calls();
        assert_eq!(calls[0].prompt, OCR_PROMPT);
        assert_eq!(calls[0].image_mime_types.len(), 2);
    }

    #[tokio::test]
    async fn parses_bare_json_reply() {
        let reply = r#"{"game_count": 2542, "bb_probability": "1/181.58", "rb_probability": "1/317.75", "skill_true_rate": "100.0%", "skill_extreme_rate": "33.4%", "dance_time_count": 3}"#;
        let state = state_with(ScriptedModel::replying(reply), None);

        let Json(body) = extract_ocr_data(State(state), ApiJson(request())).await.unwrap();
        assert_eq!(
            body.data,
            OcrData {
                game_count: Some(2542),
                bb_probability: Some("1/181.58".to_string()),
                rb_probability: Some("1/317.75".to_string()),
                skill_true_rate: Some("100.0%".to_string()),
                skill_extreme_rate: Some("33.4%".to_string()),
                dance_time_count: Some(3),
            }
        );
    }

    #[tokio::test]
    async fn prose_reply_is_a_response_shape_error() {
        let state = state_with(ScriptedModel::replying("画像が読み取れませんでした"), None);
        let err = extract_ocr_data(State(state), ApiJson(request())).await.unwrap_err();
        assert!(matches!(err, ApiError::ResponseShape { .. }));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn non_object_json_is_rejected() {
        let state = state_with(ScriptedModel::replying("[1, 2, 3]"), None);
        let err = extract_ocr_data(State(state), ApiJson(request())).await.unwrap_err();
        assert!(matches!(err, ApiError::ResponseShape { .. }));
    }

    #[tokio::test]
    async fn missing_credential_short_circuits() {
        let model = ScriptedModel::replying("{}");
        let state = state_with(model.clone(), None);
        let err = extract_ocr_data(State(state), ApiJson(OcrRequest::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::MissingCredential));
        assert!(model.calls().is_empty());
    }

    #[test]
    fn fields_are_read_leniently() {
        let data = OcrData::from_value(&json!({
            "game_count": "2,542",
            "bb_probability": 181.58,
            "rb_probability": "",
            "skill_true_rate": null,
            "dance_time_count": 2.0,
            "unexpected": "ignored"
        }))
        .unwrap();
        assert_eq!(data.game_count, Some(2542));
        assert_eq!(data.bb_probability.as_deref(), Some("181.58"));
        assert_eq!(data.rb_probability, None);
        assert_eq!(data.skill_true_rate, None);
        assert_eq!(data.skill_extreme_rate, None);
        assert_eq!(data.dance_time_count, Some(2));
    }

    #[test]
    fn serializes_all_six_keys() {
        let value = serde_json::to_value(OcrData::default()).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 6);
        for field in crate::prompts::OCR_FIELDS {
            assert_eq!(object.get(field), Some(&Value::Null), "{field}");
        }
    }
}
