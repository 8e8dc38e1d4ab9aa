#![forbid(unsafe_code)]

//! Shared credential helpers. Secrets only ever live in memory and never show
//! up in logs or debug output.

use std::fmt;

use crate::error::{Error, Result};

const VISIBLE_PREFIX: usize = 4;

/// Masks everything past the first few characters of a secret.
pub fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(VISIBLE_PREFIX).collect();
    if secret.chars().count() <= VISIBLE_PREFIX {
        return "****".to_string();
    }
    format!("{visible}****")
}

/// Opaque API key for the video-search service.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Rejects blank keys so the fetcher can fail before touching the network.
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_input("an API key is required"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&redact(&self.0)).finish()
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_short_prefix() {
        assert_eq!(redact("AIzaSyExample"), "AIza****");
        assert_eq!(redact("abc"), "****");
    }

    #[test]
    fn api_key_debug_never_leaks() {
        let key = ApiKey::new("  AIzaSySecretValue ").unwrap();
        assert_eq!(key.expose(), "AIzaSySecretValue");
        let debug = format!("{key:?}");
        assert!(!debug.contains("SecretValue"));
        assert_eq!(key.to_string(), "AIza****");
    }

    #[test]
    fn blank_api_key_is_invalid_input() {
        let err = ApiKey::new("   ").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
