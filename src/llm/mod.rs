pub mod gemini;
pub mod media;

use anyhow::Result;
use async_trait::async_trait;

pub use gemini::GeminiClient;
pub use media::InlineImage;

/// One completion call: a prompt plus zero or more images, authorized by the
/// credential chosen for this request.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub api_key: &'a str,
    pub model: &'a str,
    pub prompt: &'a str,
    pub images: &'a [InlineImage],
    pub operation: &'a str,
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    async fn generate(&self, request: GenerationRequest<'_>) -> Result<String>;
}
