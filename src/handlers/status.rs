use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::handlers::extract::ApiJson;
use crate::handlers::{finish_timer, generate_text};
use crate::prompts::KEY_CHECK_PROMPT;
use crate::state::AppState;
use crate::utils::timing::start_request_timer;

/// Substrings Gemini has used for rejected keys. Upstream wording can change
/// without notice, in which case a bad key is reported as a generic failure.
const INVALID_KEY_MARKERS: [&str; 2] = ["API_KEY_INVALID", "API key not valid"];

#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub gemini_configured: bool,
}

#[derive(Debug, Deserialize)]
pub struct TestKeyRequest {
    #[serde(default)]
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct TestKeyResponse {
    pub status: &'static str,
    pub message: &'static str,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "パチスロ収支ノート API",
        status: "running",
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        gemini_configured: state.has_default_key(),
    })
}

pub fn is_invalid_key_error(message: &str) -> bool {
    INVALID_KEY_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

pub async fn test_api_key(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<TestKeyRequest>,
) -> ApiResult<Json<TestKeyResponse>> {
    let mut timer = start_request_timer("test_api_key", 0);
    let result = check_api_key(&state, &request.api_key).await;
    finish_timer(&mut timer, &result);
    result.map(Json)
}

async fn check_api_key(state: &AppState, api_key: &str) -> ApiResult<TestKeyResponse> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(ApiError::InvalidArgument(
            "APIキーが指定されていません".to_string(),
        ));
    }

    let context = "テスト中にエラーが発生しました";
    match generate_text(state, api_key, KEY_CHECK_PROMPT, &[], "test_api_key", context).await {
        Ok(_) => {
            info!("API key check succeeded");
            Ok(TestKeyResponse {
                status: "ok",
                message: "APIキーは有効です",
            })
        }
        Err(err) => {
            let text = err.to_string();
            if is_invalid_key_error(&text) {
                warn!("API key check rejected by upstream");
                Err(ApiError::InvalidCredential)
            } else {
                Err(err)
            }
        }
    }
}
