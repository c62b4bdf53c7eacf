use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("fenced json pattern"));

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("JSON block could not be parsed: {0}")]
    FencedBlock(#[source] serde_json::Error),
    #[error("response is not valid JSON: {0}")]
    RawText(#[source] serde_json::Error),
}

/// Returns the contents of the first ```` ```json ```` block in `text`, if any.
pub fn find_fenced_json(text: &str) -> Option<&str> {
    FENCED_JSON
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Parses the fenced JSON block of a model reply, or the whole reply when no
/// block is present. A block that exists but does not parse is an error.
pub fn extract_json(text: &str) -> Result<Value, ExtractError> {
    match find_fenced_json(text) {
        Some(block) => serde_json::from_str(block).map_err(ExtractError::FencedBlock),
        None => serde_json::from_str(text.trim()).map_err(ExtractError::RawText),
    }
}
