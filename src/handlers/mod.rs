pub mod analysis;
pub mod blog;
pub mod extract;
pub mod ocr;
pub mod status;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::error::{ApiError, ApiResult};
use crate::llm::{GenerationRequest, InlineImage};
use crate::state::AppState;
use crate::utils::timing::{complete_request_timer, RequestTimer};

pub fn router(state: AppState, max_request_bytes: usize) -> Router {
    Router::new()
        .route("/", get(status::root))
        .route("/health", get(status::health))
        .route("/test-api-key", post(status::test_api_key))
        .route("/generate-blog", post(blog::generate_blog))
        .route("/ocr", post(ocr::extract_ocr_data))
        .route("/hikoichi-analysis", post(analysis::hikoichi_analysis))
        .layer(DefaultBodyLimit::max(max_request_bytes))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Single model call for a content endpoint; upstream failures carry `context`.
async fn generate_text(
    state: &AppState,
    api_key: &str,
    prompt: &str,
    images: &[InlineImage],
    operation: &str,
    context: &str,
) -> ApiResult<String> {
    state
        .model
        .generate(GenerationRequest {
            api_key,
            model: &state.model_name,
            prompt,
            images,
            operation,
        })
        .await
        .map_err(|err| ApiError::upstream(context, err))
}

fn finish_timer<T>(timer: &mut RequestTimer, result: &ApiResult<T>) {
    match result {
        Ok(_) => complete_request_timer(timer, "success", None),
        Err(err) => complete_request_timer(timer, "error", Some(err.kind().to_string())),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::{Arc, Mutex};

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use crate::llm::{GenerationRequest, GenerativeModel};
    use crate::state::AppState;

    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub api_key: String,
        pub model: String,
        pub prompt: String,
        pub image_mime_types: Vec<&'static str>,
        pub operation: String,
    }

    /// Replies with a canned completion (or error) and records every call.
    pub struct ScriptedModel {
        reply: Result<String, String>,
        pub calls: Mutex<Vec<RecordedCall>>,
    }

    impl ScriptedModel {
        pub fn replying(text: &str) -> Arc<Self> {
            Arc::new(ScriptedModel {
                reply: Ok(text.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(message: &str) -> Arc<Self> {
            Arc::new(ScriptedModel {
                reply: Err(message.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, request: GenerationRequest<'_>) -> Result<String> {
            self.calls.lock().unwrap().push(RecordedCall {
                api_key: request.api_key.to_string(),
                model: request.model.to_string(),
                prompt: request.prompt.to_string(),
                image_mime_types: request.images.iter().map(|image| image.mime_type).collect(),
                operation: request.operation.to_string(),
            });
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(message) => Err(anyhow!("{}", message)),
            }
        }
    }

    pub fn state_with(model: Arc<ScriptedModel>, default_key: Option<&str>) -> AppState {
        AppState::new(model, "gemini-test", default_key.map(str::to_string))
    }

    pub const PNG_DATA_URL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUg==";
    pub const JPEG_BASE64: &str = "/9j/4AAQSkZJRgABAQ==";
}
