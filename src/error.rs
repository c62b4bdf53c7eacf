use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failure kinds surfaced to HTTP callers as `{"detail": "..."}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("APIキーが設定されていません。設定画面から入力してください。")]
    MissingCredential,

    #[error("APIキーが無効です。正しいキーを入力してください。")]
    InvalidCredential,

    #[error("{context}: {message}")]
    Upstream { context: String, message: String },

    #[error("{context}: {message}")]
    ResponseShape { context: String, message: String },

    /// Body that could not be read as the endpoint's JSON payload. Keeps the
    /// status axum assigned (400, 413, 415 or 422).
    #[error("リクエストの形式が正しくありません: {message}")]
    MalformedBody { status: StatusCode, message: String },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn upstream(context: &str, err: impl std::fmt::Display) -> Self {
        ApiError::Upstream {
            context: context.to_string(),
            message: err.to_string(),
        }
    }

    pub fn response_shape(context: &str, err: impl std::fmt::Display) -> Self {
        ApiError::ResponseShape {
            context: context.to_string(),
            message: err.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidArgument(_)
            | ApiError::MissingCredential
            | ApiError::InvalidCredential => StatusCode::BAD_REQUEST,
            ApiError::Upstream { .. } | ApiError::ResponseShape { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::MalformedBody { status, .. } => *status,
        }
    }

    /// Short label used in timing logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidArgument(_) => "invalid_argument",
            ApiError::MissingCredential => "missing_credential",
            ApiError::InvalidCredential => "invalid_credential",
            ApiError::Upstream { .. } => "upstream",
            ApiError::ResponseShape { .. } => "response_shape",
            ApiError::MalformedBody { .. } => "malformed_body",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{} error: {}", self.kind(), self);
        } else {
            tracing::warn!("{} error: {}", self.kind(), self);
        }

        let body = Json(json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}
