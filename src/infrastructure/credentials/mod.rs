//! Credentials infrastructure
//!
//! The remote API key is looked up from the environment only; storing
//! credentials is left to the surrounding deployment.

use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Errors resolving the remote API key
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CredentialError {
    #[error("API key not found: environment variable {0} is not set")]
    Missing(String),

    #[error("API key in environment variable {0} is empty")]
    Empty(String),
}

/// An API key that never appears in logs or debug output
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building the Authorization header only
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Short form safe to log: the first four characters followed by `***`
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        if self.0.chars().count() <= 8 {
            "***".to_string()
        } else {
            format!("{prefix}***")
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.redacted()).finish()
    }
}

/// Resolves the API key from a named environment variable
#[derive(Debug, Clone)]
pub struct ApiKeyResolver {
    env_var: String,
}

impl ApiKeyResolver {
    pub fn new(env_var: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
        }
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    pub fn resolve(&self) -> Result<ApiKey, CredentialError> {
        let value = std::env::var(&self.env_var)
            .map_err(|_| CredentialError::Missing(self.env_var.clone()))?;
        let value = value.trim();
        if value.is_empty() {
            return Err(CredentialError::Empty(self.env_var.clone()));
        }
        let key = ApiKey::new(value);
        debug!(env_var = %self.env_var, api_key = %key.redacted(), "Resolved API key");
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction() {
        let key = ApiKey::new("sk-abcdef123456");
        assert_eq!(key.redacted(), "sk-a***");
        assert_eq!(format!("{key:?}"), "ApiKey(\"sk-a***\")");
        assert_eq!(ApiKey::new("short").redacted(), "***");
    }

    #[test]
    fn test_resolve_from_env() {
        temp_env::with_var("DOCSIGNALS_TEST_KEY_SET", Some("  sk-live-key  "), || {
            let key = ApiKeyResolver::new("DOCSIGNALS_TEST_KEY_SET").resolve().unwrap();
            assert_eq!(key.expose(), "sk-live-key");
        });
    }

    #[test]
    fn test_resolve_missing_and_empty() {
        temp_env::with_var_unset("DOCSIGNALS_TEST_KEY_MISSING", || {
            assert_eq!(
                ApiKeyResolver::new("DOCSIGNALS_TEST_KEY_MISSING").resolve(),
                Err(CredentialError::Missing("DOCSIGNALS_TEST_KEY_MISSING".to_string()))
            );
        });
        temp_env::with_var("DOCSIGNALS_TEST_KEY_EMPTY", Some(" "), || {
            assert_eq!(
                ApiKeyResolver::new("DOCSIGNALS_TEST_KEY_EMPTY").resolve(),
                Err(CredentialError::Empty("DOCSIGNALS_TEST_KEY_EMPTY".to_string()))
            );
        });
    }
}
