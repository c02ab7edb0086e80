//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-client-IP limits via tower_governor. The Generic Cell Rate Algorithm
//! needs no background task.

use governor::middleware::StateInformationMiddleware;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;

/// Governor config keyed by peer IP, emitting X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Seconds to replenish one request
    pub per_second: u64,
    /// Requests that can be made immediately
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // The dashboard polls every 60s, well under this quota
        Self {
            enabled: true,
            per_second: 1,
            burst_size: 30,
        }
    }
}

impl RateLimitConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.per_second == 0 || self.burst_size == 0 {
            return Err("rate limit per_second and burst_size must be positive".into());
        }
        Ok(())
    }
}

/// Build a governor config for `GovernorLayer`
///
/// Keys on the peer IP, so the service must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`. Returns `None`
/// for a zero quota.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<DefaultGovernorConfig>> {
    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .finish()
        .map(Arc::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.per_second, 1);
        assert_eq!(config.burst_size, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_quota_rejected() {
        let config = RateLimitConfig {
            burst_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(create_governor_config(&config).is_none());
    }

    #[test]
    fn test_create_governor_config() {
        let governor = create_governor_config(&RateLimitConfig::default());
        assert!(governor.is_some());
    }
}
