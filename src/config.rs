use std::env;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_dir: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub gemini_timeout_seconds: u64,
    pub gemini_temperature: Option<f32>,
    pub gemini_max_output_tokens: Option<i32>,
    pub max_request_bytes: usize,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_optional_f32(name: &str) -> Option<f32> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f32>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring non-numeric {} value '{}'", name, trimmed);
            None
        }
    }
}

fn env_optional_i32(name: &str) -> Option<i32> {
    let value = env::var(name).ok()?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<i32>() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!("Ignoring non-numeric {} value '{}'", name, trimmed);
            None
        }
    }
}

fn normalize_api_base(value: String) -> String {
    value.trim().trim_end_matches('/').to_string()
}

impl Config {
    pub fn load() -> Result<Self> {
        let port_raw = env_string("PORT", "8000");
        let port = port_raw
            .trim()
            .parse::<u16>()
            .map_err(|_| anyhow!("Invalid PORT value: {port_raw}"))?;

        Ok(Config {
            host: env_string("HOST", "0.0.0.0"),
            port,
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: env_string("LOG_DIR", "logs"),
            gemini_api_key: env_string("GEMINI_API_KEY", "").trim().to_string(),
            gemini_model: env_string("GEMINI_MODEL", "gemini-2.0-flash"),
            gemini_api_base: normalize_api_base(env_string(
                "GEMINI_API_BASE",
                "https://generativelanguage.googleapis.com/v1beta",
            )),
            gemini_timeout_seconds: env_u64("GEMINI_TIMEOUT_SECONDS", 90).max(1),
            gemini_temperature: env_optional_f32("GEMINI_TEMPERATURE"),
            gemini_max_output_tokens: env_optional_i32("GEMINI_MAX_OUTPUT_TOKENS"),
            max_request_bytes: env_usize("MAX_REQUEST_BYTES", 25 * 1024 * 1024),
        })
    }

    /// Default credential, `None` when `GEMINI_API_KEY` is unset or blank.
    pub fn default_api_key(&self) -> Option<String> {
        if self.gemini_api_key.is_empty() {
            None
        } else {
            Some(self.gemini_api_key.clone())
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slashes_from_api_base() {
        assert_eq!(
            normalize_api_base(" https://example.test/v1beta/ ".to_string()),
            "https://example.test/v1beta"
        );
    }

    #[test]
    fn blank_key_is_not_a_default_credential() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            log_dir: "logs".to_string(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-2.0-flash".to_string(),
            gemini_api_base: "https://example.test".to_string(),
            gemini_timeout_seconds: 90,
            gemini_temperature: None,
            gemini_max_output_tokens: None,
            max_request_bytes: 1024,
        };
        assert_eq!(config.default_api_key(), None);
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
    }
}
