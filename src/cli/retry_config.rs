//! Retry configuration for uploads.
//!
//! The upload is attempted once unless retries are requested, either with
//! `--retries` or through `PACKAGER_PUBLISH_RETRIES`.

use crate::publish::RetryPolicy;

/// Environment variable holding the default retry count
pub const PUBLISH_RETRIES_ENV: &str = "PACKAGER_PUBLISH_RETRIES";

/// Highest accepted retry count
pub const MAX_PUBLISH_RETRIES: u32 = 10;

/// Retry limits resolved from flags and environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryConfig {
    /// Max retries for the upload
    pub publish: u32,
}

impl RetryConfig {
    /// Parse retry count through `get`, clamping to [`MAX_PUBLISH_RETRIES`]
    ///
    /// Unset or unparsable values fall back to zero retries.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let publish = get(PUBLISH_RETRIES_ENV)
            .and_then(|s| s.trim().parse::<u32>().ok())
            .map(|v| v.min(MAX_PUBLISH_RETRIES))
            .unwrap_or(0);
        Self { publish }
    }

    /// Create config from environment variables with fallback to defaults
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Resolve the flag value, falling back to the environment
    pub fn resolve(flag: Option<u32>) -> Result<Self, String> {
        match flag {
            Some(publish) => {
                let config = Self { publish };
                config.validate()?;
                Ok(config)
            }
            None => Ok(Self::from_env()),
        }
    }

    /// Validate retry counts are reasonable
    pub fn validate(&self) -> Result<(), String> {
        if self.publish > MAX_PUBLISH_RETRIES {
            return Err(format!(
                "publish retry count too high: {} (max: {MAX_PUBLISH_RETRIES})",
                self.publish
            ));
        }
        Ok(())
    }

    /// Retry policy for the upload
    pub fn publish_policy(&self) -> RetryPolicy {
        RetryPolicy::with_retries(self.publish)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_single_attempt() {
        let config = RetryConfig::from_vars(|_| None);
        assert_eq!(config.publish, 0);
        assert_eq!(config.publish_policy(), RetryPolicy::single_attempt());
    }

    #[test]
    fn test_env_value_clamped() {
        let config = RetryConfig::from_vars(|_| Some("99".to_string()));
        assert_eq!(config.publish, MAX_PUBLISH_RETRIES);
    }

    #[test]
    fn test_garbage_ignored() {
        let config = RetryConfig::from_vars(|_| Some("lots".to_string()));
        assert_eq!(config.publish, 0);
    }

    #[test]
    fn test_flag_validated() {
        assert!(RetryConfig::resolve(Some(3)).is_ok());
        assert!(RetryConfig::resolve(Some(11)).is_err());
    }
}
