use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

pub const DEFAULT_GENERATION_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-09-2025:generateContent";

/// Which `GenerationClient` implementation serves requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GenerationBackend {
    #[default]
    Live,
    Stub,
}

impl FromStr for GenerationBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(GenerationBackend::Live),
            "stub" => Ok(GenerationBackend::Stub),
            other => bail!("Unknown generation backend '{other}' (expected 'live' or 'stub')"),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// The API key is optional at startup: a missing key is reported per request
/// as a `MissingCredential` failure rather than refusing to boot.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub generation_endpoint: String,
    pub backend: GenerationBackend,
    /// Replaces the stub's canned payload (stub backend only).
    pub stub_payload_path: Option<PathBuf>,
    pub max_attempts: u32,
    pub request_timeout_secs: u64,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: optional_env("GEMINI_API_KEY")
                .or_else(|| optional_env("VITE_GEMINI_API_KEY")),
            generation_endpoint: optional_env("GENERATION_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_GENERATION_ENDPOINT.to_string()),
            backend: optional_env("GENERATION_BACKEND")
                .map(|v| v.parse::<GenerationBackend>())
                .transpose()?
                .unwrap_or_default(),
            stub_payload_path: optional_env("GENERATION_STUB_PAYLOAD").map(PathBuf::from),
            max_attempts: parse_env("GENERATION_MAX_ATTEMPTS", 3)?,
            request_timeout_secs: parse_env("GENERATION_TIMEOUT_SECS", 60)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

/// Reads an environment variable, treating unset and blank values alike.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parses_case_insensitively() {
        assert_eq!("live".parse::<GenerationBackend>().unwrap(), GenerationBackend::Live);
        assert_eq!(" STUB ".parse::<GenerationBackend>().unwrap(), GenerationBackend::Stub);
    }

    #[test]
    fn test_backend_rejects_unknown_value() {
        let err = "mock".parse::<GenerationBackend>().unwrap_err();
        assert!(err.to_string().contains("mock"));
    }

    #[test]
    fn test_backend_defaults_to_live() {
        assert_eq!(GenerationBackend::default(), GenerationBackend::Live);
    }

    // Each test owns its variable name so parallel tests don't collide.
    #[test]
    fn test_malformed_attempt_cap_fails_with_context() {
        std::env::set_var("TEST_CFG_MAX_ATTEMPTS_BAD", "three");
        let err = parse_env::<u32>("TEST_CFG_MAX_ATTEMPTS_BAD", 3).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Environment variable 'TEST_CFG_MAX_ATTEMPTS_BAD' has an invalid value 'three'"
        );
    }

    #[test]
    fn test_blank_or_unset_value_uses_default() {
        std::env::set_var("TEST_CFG_MAX_ATTEMPTS_BLANK", "  ");
        assert_eq!(parse_env::<u32>("TEST_CFG_MAX_ATTEMPTS_BLANK", 3).unwrap(), 3);
        assert_eq!(parse_env::<u32>("TEST_CFG_MAX_ATTEMPTS_UNSET", 7).unwrap(), 7);
    }

    #[test]
    fn test_attempt_cap_is_trimmed_and_parsed() {
        std::env::set_var("TEST_CFG_MAX_ATTEMPTS_OK", " 5 ");
        assert_eq!(parse_env::<u32>("TEST_CFG_MAX_ATTEMPTS_OK", 3).unwrap(), 5);
    }
}
