use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::handlers::extract::ApiJson;
use crate::handlers::{finish_timer, generate_text};
use crate::llm::media::decode_image_payloads;
use crate::prompts::build_analysis_prompt;
use crate::session::{MachineStats, SessionRecord};
use crate::state::AppState;
use crate::utils::format::truncate_for_log;
use crate::utils::json_block::extract_json;
use crate::utils::timing::start_request_timer;

const ANALYSIS_ERROR_CONTEXT: &str = "彦一分析中にエラーが発生しました";
pub const DEFAULT_SCORE: i64 = 50;
pub const DEFAULT_COMMENT: &str = "分析できませんでした";

#[derive(Debug, Default, Deserialize)]
pub struct HikoichiRequest {
    #[serde(default)]
    pub images: Vec<String>,
    pub machine: Option<String>,
    pub in_amount: Option<i64>,
    pub out_amount: Option<i64>,
    pub memo: Option<String>,
    pub machine_stats: Option<MachineStats>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HikoichiResponse {
    pub score: i64,
    pub comment: String,
}

fn read_score(value: Option<&Value>) -> Option<i64> {
    let score = match value? {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.round() as i64))?,
        Value::String(text) => {
            let text = text.trim().trim_end_matches('点').trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(|float| float.round() as i64))?
        }
        _ => return None,
    };
    Some(score.clamp(0, 100))
}

fn read_comment(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        _ => None,
    }
}

impl HikoichiResponse {
    /// Missing or mistyped fields fall back to the neutral score and the
    /// "could not analyse" comment instead of failing the request.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(HikoichiResponse {
            score: read_score(object.get("score")).unwrap_or(DEFAULT_SCORE),
            comment: read_comment(object.get("comment"))
                .unwrap_or_else(|| DEFAULT_COMMENT.to_string()),
        })
    }
}

pub async fn hikoichi_analysis(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<HikoichiRequest>,
) -> ApiResult<Json<HikoichiResponse>> {
    let mut timer = start_request_timer("hikoichi_analysis", request.images.len());
    let result = analyse_session(&state, request).await;
    finish_timer(&mut timer, &result);
    result.map(Json)
}

async fn analyse_session(state: &AppState, request: HikoichiRequest) -> ApiResult<HikoichiResponse> {
    let api_key = state.resolve_api_key(request.api_key.as_deref())?;
    let images = decode_image_payloads(&request.images)?;

    let session = SessionRecord::new(
        request.machine,
        request.in_amount,
        request.out_amount,
        request.memo,
    );
    info!(
        "Running persona analysis: images={} has_stats={} balance={}",
        images.len(),
        request.machine_stats.is_some(),
        session.balance()
    );

    let prompt = build_analysis_prompt(&session, request.machine_stats.as_ref());
    let raw_text = generate_text(
        state,
        &api_key,
        &prompt,
        &images,
        "hikoichi_analysis",
        ANALYSIS_ERROR_CONTEXT,
    )
    .await?;

    let value = extract_json(&raw_text).map_err(|err| {
        warn!(
            "Analysis reply was not JSON: {} (reply={})",
            err,
            truncate_for_log(&raw_text, 300)
        );
        ApiError::response_shape(ANALYSIS_ERROR_CONTEXT, err)
    })?;

    HikoichiResponse::from_value(&value).ok_or_else(|| {
        ApiError::response_shape(ANALYSIS_ERROR_CONTEXT, "JSON object was expected")
    })
}
