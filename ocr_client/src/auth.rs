use std::fmt::Debug;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("no token available and no refresher configured")]
    NoTokenAvailable,
}

/// Helper to provide bearer tokens for the extraction service.
pub trait TokenRefresher: Debug + Send + Sync {
    /// Get a new auth token and the unixtime (in seconds) for expiration.
    fn refresh(&self) -> Result<(String, u64), AuthError>;
}

#[derive(Debug)]
pub struct NoOpTokenRefresher;

impl TokenRefresher for NoOpTokenRefresher {
    fn refresh(&self) -> Result<(String, u64), AuthError> {
        Ok(("token".to_string(), 0))
    }
}

/// Shared configuration for token-based auth.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// Initial token to use.
    pub token: Option<String>,
    /// Initial token expiration time epoch in seconds.
    pub token_expiration: Option<u64>,
    /// A function to refresh tokens.
    pub token_refresher: Option<Arc<dyn TokenRefresher>>,
}

/// Holds the current bearer token and refreshes it through the configured
/// refresher once its expiration has passed.
#[derive(Debug)]
pub struct TokenProvider {
    token: Option<String>,
    expiration: Option<u64>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl TokenProvider {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self {
            token: cfg.token.clone(),
            expiration: cfg.token_expiration,
            refresher: cfg.token_refresher.clone(),
        }
    }

    /// Returns a token valid at the time of the call, refreshing first if the
    /// stored one has expired.
    pub fn get_valid_token(&mut self) -> Result<String, AuthError> {
        if self.is_expired() {
            self.refresh()?;
        }
        self.token.clone().ok_or(AuthError::NoTokenAvailable)
    }

    fn is_expired(&self) -> bool {
        match (self.token.as_ref(), self.expiration) {
            (None, _) => true,
            (Some(_), Some(expiration)) => unix_timestamp_secs() >= expiration,
            // A token with no expiration is taken at face value.
            (Some(_), None) => false,
        }
    }

    fn refresh(&mut self) -> Result<(), AuthError> {
        let Some(refresher) = self.refresher.as_ref() else {
            // Nothing to refresh with; the server gets to judge the stored token.
            return Ok(());
        };

        let (token, expiration) = refresher.refresh()?;
        self.token = Some(token);
        self.expiration = Some(expiration);
        Ok(())
    }
}

fn unix_timestamp_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[derive(Debug, Default)]
    struct CountingRefresher {
        calls: AtomicU64,
    }

    impl TokenRefresher for CountingRefresher {
        fn refresh(&self) -> Result<(String, u64), AuthError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            // Far-future expiration so one refresh is enough.
            Ok((format!("refreshed-{n}"), u64::MAX))
        }
    }

    #[test]
    fn test_fixed_token_is_returned_as_is() {
        let cfg = AuthConfig {
            token: Some("fixed".into()),
            ..Default::default()
        };
        let mut provider = TokenProvider::new(&cfg);

        assert_eq!(provider.get_valid_token().unwrap(), "fixed");
        assert_eq!(provider.get_valid_token().unwrap(), "fixed");
    }

    #[test]
    fn test_expired_token_triggers_refresh_once() {
        let refresher = Arc::new(CountingRefresher::default());
        let cfg = AuthConfig {
            token: Some("stale".into()),
            token_expiration: Some(0),
            token_refresher: Some(refresher.clone()),
        };
        let mut provider = TokenProvider::new(&cfg);

        assert_eq!(provider.get_valid_token().unwrap(), "refreshed-1");
        assert_eq!(provider.get_valid_token().unwrap(), "refreshed-1");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_token_without_refresher_errors() {
        let mut provider = TokenProvider::new(&AuthConfig::default());
        assert!(matches!(provider.get_valid_token(), Err(AuthError::NoTokenAvailable)));
    }
}
