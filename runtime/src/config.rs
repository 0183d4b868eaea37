//! Run configuration: defaults, environment overrides, and validation.

use anyhow::{bail, Result};
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;

/// Default login page.
pub const DEFAULT_LOGIN_URL: &str = "https://twitter.com/login";

/// Default search term when the prompt is left blank.
pub const DEFAULT_SEARCH_TERM: &str = "bitcoin";

/// Fixed desktop user agent presented to the site.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/127.0.0.0 Safari/537.36";

/// Environment variable naming the Chromium binary.
pub const ENV_CHROMIUM_PATH: &str = "FEEDHARVEST_CHROMIUM_PATH";
/// Environment variable naming the output directory.
pub const ENV_OUTPUT_DIR: &str = "FEEDHARVEST_OUTPUT_DIR";
/// Environment variable carrying the account password (skips the prompt).
pub const ENV_PASSWORD: &str = "FEEDHARVEST_PASSWORD";

/// A closed range of pause durations, sampled uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl PauseRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// A range that never sleeps.
    pub const fn none() -> Self {
        Self::new(0, 0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_ms > self.max_ms {
            bail!(
                "pause range minimum ({}ms) exceeds maximum ({}ms)",
                self.min_ms,
                self.max_ms
            );
        }
        Ok(())
    }

    /// Pick a random duration within the range.
    pub fn sample(&self) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }

    /// Sleep for a sampled duration.
    pub async fn pause(&self) {
        let d = self.sample();
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
    }
}

/// Browser launch settings.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub chromium_path: Option<PathBuf>,
    pub headless: bool,
    pub user_agent: String,
    /// Hosts that bypass any configured proxy.
    pub no_proxy_hosts: Vec<String>,
    pub request_timeout_ms: u64,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            chromium_path: None,
            headless: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            no_proxy_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            request_timeout_ms: 30_000,
        }
    }
}

/// Login and search flow settings.
#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub login_url: String,
    /// Bound for every setup wait (fields, redirects).
    pub wait_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Switch the results to the "Latest" tab.
    pub latest_tab: bool,
    /// Restrict results to the last N days.
    pub since_days: Option<u32>,
    pub after_username: PauseRange,
    pub after_login: PauseRange,
    pub after_search: PauseRange,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            wait_timeout_ms: 20_000,
            poll_interval_ms: 250,
            latest_tab: true,
            since_days: None,
            after_username: PauseRange::new(2_000, 4_000),
            after_login: PauseRange::new(4_000, 7_000),
            after_search: PauseRange::new(3_000, 5_000),
        }
    }
}

impl FlowOptions {
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Bounds for the scroll-and-extract loop.
#[derive(Debug, Clone, Copy)]
pub struct HarvestLimits {
    pub max_scrolls: u32,
    pub max_records: usize,
    pub scroll_pause: PauseRange,
}

impl Default for HarvestLimits {
    fn default() -> Self {
        Self {
            max_scrolls: 1000,
            max_records: 10_000,
            scroll_pause: PauseRange::new(2_000, 4_000),
        }
    }
}

/// Full configuration for one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub browser: BrowserOptions,
    pub flow: FlowOptions,
    pub limits: HarvestLimits,
    pub output_dir: PathBuf,
    pub include_view_source: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            browser: BrowserOptions::default(),
            flow: FlowOptions::default(),
            limits: HarvestLimits::default(),
            output_dir: PathBuf::from("."),
            include_view_source: false,
        }
    }
}

impl HarvestConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(p) = std::env::var(ENV_CHROMIUM_PATH) {
            if !p.trim().is_empty() {
                config.browser.chromium_path = Some(PathBuf::from(p));
            }
        }
        if let Ok(dir) = std::env::var(ENV_OUTPUT_DIR) {
            if !dir.trim().is_empty() {
                config.output_dir = PathBuf::from(dir);
            }
        }
        config
    }

    pub fn validate(&self) -> Result<()> {
        self.limits.scroll_pause.validate()?;
        if self.flow.wait_timeout_ms == 0 {
            bail!("wait timeout must be greater than zero");
        }
        if self.browser.user_agent.trim().is_empty() {
            bail!("user agent must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_run_profile() {
        let config = HarvestConfig::default();
        assert_eq!(config.limits.max_scrolls, 1000);
        assert_eq!(config.limits.max_records, 10_000);
        assert_eq!(config.limits.scroll_pause, PauseRange::new(2_000, 4_000));
        assert_eq!(config.flow.wait_timeout_ms, 20_000);
        assert!(config.flow.latest_tab);
        assert!(!config.browser.headless);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pause_range_validation() {
        assert!(PauseRange::new(5, 1).validate().is_err());
        assert!(PauseRange::new(1, 5).validate().is_ok());
        assert!(PauseRange::none().validate().is_ok());
    }

    #[test]
    fn test_pause_range_sample_within_bounds() {
        let range = PauseRange::new(10, 20);
        for _ in 0..100 {
            let d = range.sample();
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));
        }
        assert_eq!(PauseRange::none().sample(), Duration::ZERO);
    }

    #[test]
    fn test_zero_wait_timeout_rejected() {
        let mut config = HarvestConfig::default();
        config.flow.wait_timeout_ms = 0;
        assert!(config.validate().is_err());
    }
}
