//! Time limits for external tool invocations.
//!
//! Each collaborator call is bounded so a hung daemon or registry cannot block
//! a release forever. Limits can be tuned through environment variables.

use std::time::Duration;

/// Limits for the three external calls a release makes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// `cargo metadata`
    pub metadata: Duration,

    /// `docker build`
    pub build: Duration,

    /// `docker push`
    pub push: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            metadata: Duration::from_secs(60),
            build: Duration::from_secs(1800),
            push: Duration::from_secs(1800),
        }
    }
}

/// Upper bound for metadata queries (10 minutes)
const MAX_METADATA_SECS: u64 = 600;

/// Upper bound for build and push (4 hours)
const MAX_TRANSFER_SECS: u64 = 14_400;

impl TimeoutConfig {
    /// Parse a timeout in seconds from `var_name`, clamped to `max`.
    ///
    /// Unset or unparsable values fall back to `default`.
    fn parse_secs_env(var_name: &str, default: Duration, max: u64) -> Duration {
        std::env::var(var_name)
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|v| Duration::from_secs(v.min(max)))
            .unwrap_or(default)
    }

    /// Create config from environment variables with fallback to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            metadata: Self::parse_secs_env(
                "IMAGE_RELEASE_METADATA_TIMEOUT_SECS",
                defaults.metadata,
                MAX_METADATA_SECS,
            ),
            build: Self::parse_secs_env(
                "IMAGE_RELEASE_BUILD_TIMEOUT_SECS",
                defaults.build,
                MAX_TRANSFER_SECS,
            ),
            push: Self::parse_secs_env(
                "IMAGE_RELEASE_PUSH_TIMEOUT_SECS",
                defaults.push,
                MAX_TRANSFER_SECS,
            ),
        }
    }

    /// Zero means every call times out immediately, which is never intended
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("metadata", self.metadata),
            ("build", self.build),
            ("push", self.push),
        ] {
            if value.is_zero() {
                return Err(format!("{} timeout must be greater than zero", name));
            }
        }
        Ok(())
    }
}
