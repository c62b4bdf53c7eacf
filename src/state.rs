use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::llm::GenerativeModel;

/// Shared, read-only request context. The default credential is fixed at
/// startup; each request picks its own key without touching this state.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn GenerativeModel>,
    pub model_name: Arc<str>,
    pub default_api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        model_name: &str,
        default_api_key: Option<String>,
    ) -> Self {
        AppState {
            model,
            model_name: Arc::from(model_name),
            default_api_key: default_api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty())
                .map(Arc::from),
        }
    }

    pub fn has_default_key(&self) -> bool {
        self.default_api_key.is_some()
    }

    /// A non-blank request key wins over the configured default.
    pub fn resolve_api_key(&self, requested: Option<&str>) -> ApiResult<Arc<str>> {
        if let Some(key) = requested.map(str::trim).filter(|key| !key.is_empty()) {
            return Ok(Arc::from(key));
        }
        self.default_api_key
            .clone()
            .ok_or(ApiError::MissingCredential)
    }
}
