use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiResult;
use crate::handlers::extract::ApiJson;
use crate::handlers::{finish_timer, generate_text};
use crate::llm::media::decode_image_payloads;
use crate::prompts::build_blog_prompt;
use crate::session::{BlogStyle, SessionRecord};
use crate::state::AppState;
use crate::utils::timing::start_request_timer;

#[derive(Debug, Default, Deserialize)]
pub struct BlogRequest {
    #[serde(default)]
    pub images: Vec<String>,
    pub machine: Option<String>,
    pub in_amount: Option<i64>,
    pub out_amount: Option<i64>,
    pub memo: Option<String>,
    pub api_key: Option<String>,
    pub style: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlogResponse {
    pub blog: String,
}

pub async fn generate_blog(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BlogRequest>,
) -> ApiResult<Json<BlogResponse>> {
    let mut timer = start_request_timer("generate_blog", request.images.len());
    let result = write_blog(&state, request).await;
    finish_timer(&mut timer, &result);
    result.map(Json)
}

async fn write_blog(state: &AppState, request: BlogRequest) -> ApiResult<BlogResponse> {
    let api_key = state.resolve_api_key(request.api_key.as_deref())?;
    let images = decode_image_payloads(&request.images)?;

    let style = BlogStyle::from_selector(request.style.as_deref());
    let session = SessionRecord::new(
        request.machine,
        request.in_amount,
        request.out_amount,
        request.memo,
    );
    info!(
        "Generating blog: style={} images={} balance={}",
        style.as_str(),
        images.len(),
        session.balance()
    );

    let prompt = build_blog_prompt(&session, style);
    let blog = generate_text(
        state,
        &api_key,
        &prompt,
        &images,
        "generate_blog",
        "ブログ生成中にエラーが発生しました",
    )
    .await?;

    Ok(BlogResponse { blog })
}
