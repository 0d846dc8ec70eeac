//! Provider builder — turns configuration into a ready-to-use backend.

use std::sync::Arc;
use std::time::Duration;

use campusdesk_config::AppConfig;
use campusdesk_core::error::ProviderError;
use campusdesk_core::provider::Provider;

use crate::gemini::GeminiProvider;
use crate::retry::{RetryPolicy, RetryProvider};

/// Build the configured backend wrapped in the retry policy.
///
/// Fails with [`ProviderError::NotConfigured`] when the credential is
/// missing or the backend kind is unknown.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config
        .require_api_key()
        .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;

    let backend: Arc<dyn Provider> = match config.backend.provider.as_str() {
        "gemini" => {
            let mut p = GeminiProvider::new(api_key);
            if let Some(ref url) = config.backend.base_url {
                p = p.with_base_url(url);
            }
            Arc::new(p)
        }
        other => {
            return Err(ProviderError::NotConfigured(format!(
                "Unknown backend provider '{other}'"
            )));
        }
    };

    Ok(Arc::new(RetryProvider::new(backend, retry_policy(config))))
}

/// The retry policy described by the `[backend]` section.
pub fn retry_policy(config: &AppConfig) -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_secs(config.backend.timeout_secs),
        max_retries: config.backend.max_retries,
        initial_backoff: Duration::from_millis(config.backend.retry_backoff_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key() -> AppConfig {
        AppConfig {
            api_key: Some("AIza-test".into()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn build_from_config_with_key() {
        let provider = build_from_config(&config_with_key()).unwrap();
        assert_eq!(provider.name(), "gemini");
    }

    #[test]
    fn missing_key_is_not_configured() {
        let result = build_from_config(&AppConfig::default());
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = config_with_key();
        config.backend.provider = "carrier-pigeon".into();
        let err = build_from_config(&config).err().unwrap();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn policy_follows_config() {
        let mut config = config_with_key();
        config.backend.timeout_secs = 7;
        config.backend.max_retries = 4;
        config.backend.retry_backoff_ms = 250;

        let policy = retry_policy(&config);
        assert_eq!(policy.timeout, Duration::from_secs(7));
        assert_eq!(policy.max_retries, 4);
        assert_eq!(policy.initial_backoff, Duration::from_millis(250));
    }
}
