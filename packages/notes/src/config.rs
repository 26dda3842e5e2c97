use anyhow::{Context, Result};
use dotenvy::dotenv;
use relay::ChannelConfig;
use std::env;
use std::time::Duration;

/// Timeouts applied to collaborator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeouts {
    pub cache: Duration,
    pub network: Duration,
}

impl Default for CallTimeouts {
    fn default() -> Self {
        Self {
            cache: Duration::from_millis(2_000),
            network: Duration::from_millis(6_000),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub cache_timeout: Duration,
    pub network_timeout: Duration,
    /// Notes per search page.
    pub page_size: usize,
    pub channel_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            cache_timeout: Duration::from_millis(
                env::var("NOTES_CACHE_TIMEOUT_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse()
                    .context("NOTES_CACHE_TIMEOUT_MS must be a number of milliseconds")?,
            ),
            network_timeout: Duration::from_millis(
                env::var("NOTES_NETWORK_TIMEOUT_MS")
                    .unwrap_or_else(|_| "6000".to_string())
                    .parse()
                    .context("NOTES_NETWORK_TIMEOUT_MS must be a number of milliseconds")?,
            ),
            page_size: env::var("NOTES_PAGE_SIZE")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("NOTES_PAGE_SIZE must be a valid number")?,
            channel_capacity: env::var("RELAY_CHANNEL_CAPACITY")
                .unwrap_or_else(|_| relay::DEFAULT_CHANNEL_CAPACITY.to_string())
                .parse()
                .context("RELAY_CHANNEL_CAPACITY must be a valid number")?,
        })
    }

    pub fn timeouts(&self) -> CallTimeouts {
        CallTimeouts {
            cache: self.cache_timeout,
            network: self.network_timeout,
        }
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig::default().with_capacity(self.channel_capacity)
    }
}

impl Default for Config {
    fn default() -> Self {
        let timeouts = CallTimeouts::default();
        Self {
            cache_timeout: timeouts.cache,
            network_timeout: timeouts.network,
            page_size: 30,
            channel_capacity: relay::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.page_size, 30);
        assert_eq!(config.timeouts(), CallTimeouts::default());
        assert_eq!(config.channel_config().channel_capacity, 64);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let config = Config {
            channel_capacity: 0,
            ..Config::default()
        };
        assert_eq!(config.channel_config().channel_capacity, 1);
    }
}
