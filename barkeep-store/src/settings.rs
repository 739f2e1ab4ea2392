//! Environment-driven configuration.
//!
//! Every setting has a default. A malformed value logs a warning and falls
//! back to the default instead of failing startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use barkeep_costing::CostSettings;
use barkeep_fetch::discovery::DEFAULT_TARGET_URL;
use barkeep_fetch::{
    ApiSignature, BlackoutWindow, CircuitBreakerConfig, CrawlConfig, DiscoveryConfig,
    FetcherConfig, PacerConfig, RetryPolicy,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::persistence::{default_database_path, default_descriptor_path};

// ============================================================================
// Environment Keys
// ============================================================================

const MIN_REQUEST_DELAY: &str = "MIN_REQUEST_DELAY";
const MAX_REQUEST_DELAY: &str = "MAX_REQUEST_DELAY";
const MAX_RETRIES: &str = "MAX_RETRIES";
const CONCURRENT_REQUESTS: &str = "CONCURRENT_REQUESTS";
const AVOID_HOURS_START: &str = "AVOID_HOURS_START";
const AVOID_HOURS_END: &str = "AVOID_HOURS_END";
const ROTATE_USER_AGENTS: &str = "ROTATE_USER_AGENTS";
const DATABASE: &str = "BARKEEP_DATABASE";
const TARGET_URL: &str = "BARKEEP_TARGET_URL";
const API_SIGNATURE: &str = "BARKEEP_API_SIGNATURE";
const CIRCUIT_THRESHOLD: &str = "BARKEEP_CIRCUIT_THRESHOLD";
const CIRCUIT_WINDOW: &str = "BARKEEP_CIRCUIT_WINDOW";
const CIRCUIT_COOLDOWN_SECS: &str = "BARKEEP_CIRCUIT_COOLDOWN_SECS";
const STALE_THRESHOLD: &str = "BARKEEP_STALE_THRESHOLD";
const MARKUP: &str = "BARKEEP_MARKUP";
const CURRENCY_DECIMALS: &str = "BARKEEP_CURRENCY_DECIMALS";
const MAX_OFFSET: &str = "BARKEEP_MAX_OFFSET";
const PAGE_SIZE: &str = "BARKEEP_PAGE_SIZE";

// ============================================================================
// Crawl Settings
// ============================================================================

/// Process-wide settings read from the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlSettings {
    /// Lower bound of the delay between requests, in seconds.
    #[serde(default = "default_min_delay")]
    pub min_request_delay: f64,

    /// Upper bound of the delay between requests, in seconds.
    #[serde(default = "default_max_delay")]
    pub max_request_delay: f64,

    /// Retries after the first attempt for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Always 1; the remote tolerates a single outstanding request.
    #[serde(default = "default_concurrency")]
    pub concurrent_requests: usize,

    /// First hour of the quiet window (local time).
    #[serde(default = "default_avoid_start")]
    pub avoid_hours_start: u32,

    /// End hour of the quiet window, exclusive.
    #[serde(default = "default_avoid_end")]
    pub avoid_hours_end: u32,

    /// Whether to rotate user agents between requests.
    #[serde(default = "default_true")]
    pub rotate_user_agents: bool,

    /// SQLite database path.
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Descriptor cache path.
    #[serde(default = "default_descriptor_path")]
    pub descriptor_cache_path: PathBuf,

    /// Listing page discovery renders.
    #[serde(default = "default_target_url")]
    pub target_url: String,

    /// Host fragment identifying the search API.
    #[serde(default = "default_api_signature")]
    pub api_signature: String,

    /// Failures in the window that open the circuit.
    #[serde(default = "default_circuit_threshold")]
    pub circuit_threshold: usize,

    /// Rolling window size.
    #[serde(default = "default_circuit_window")]
    pub circuit_window: usize,

    /// Seconds the circuit stays open.
    #[serde(default = "default_circuit_cooldown")]
    pub circuit_cooldown_secs: u64,

    /// Consecutive shape mismatches before the endpoint is stale.
    #[serde(default = "default_stale_threshold")]
    pub stale_threshold: u32,

    /// Cost-to-menu-price multiplier.
    #[serde(default = "default_markup")]
    pub markup_multiplier: f64,

    /// Decimals kept for currency values.
    #[serde(default = "default_currency_decimals")]
    pub currency_decimals: u32,

    /// Offset at which a category crawl stops.
    #[serde(default = "default_max_offset")]
    pub max_offset: usize,

    /// Records per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_min_delay() -> f64 {
    2.0
}

fn default_max_delay() -> f64 {
    5.0
}

fn default_max_retries() -> u32 {
    3
}

fn default_concurrency() -> usize {
    1
}

fn default_avoid_start() -> u32 {
    17
}

fn default_avoid_end() -> u32 {
    20
}

fn default_true() -> bool {
    true
}

fn default_target_url() -> String {
    DEFAULT_TARGET_URL.to_string()
}

fn default_api_signature() -> String {
    ApiSignature::default().host_contains
}

fn default_circuit_threshold() -> usize {
    barkeep_fetch::breaker::DEFAULT_FAILURE_THRESHOLD
}

fn default_circuit_window() -> usize {
    barkeep_fetch::breaker::DEFAULT_WINDOW_SIZE
}

fn default_circuit_cooldown() -> u64 {
    barkeep_fetch::breaker::DEFAULT_COOL_DOWN.as_secs()
}

fn default_stale_threshold() -> u32 {
    barkeep_fetch::catalog::DEFAULT_STALE_THRESHOLD
}

fn default_markup() -> f64 {
    barkeep_costing::DEFAULT_MARKUP_MULTIPLIER
}

fn default_currency_decimals() -> u32 {
    barkeep_costing::DEFAULT_CURRENCY_DECIMALS
}

fn default_max_offset() -> usize {
    barkeep_fetch::catalog::DEFAULT_MAX_OFFSET
}

fn default_page_size() -> usize {
    barkeep_fetch::catalog::DEFAULT_PAGE_SIZE
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            min_request_delay: default_min_delay(),
            max_request_delay: default_max_delay(),
            max_retries: default_max_retries(),
            concurrent_requests: default_concurrency(),
            avoid_hours_start: default_avoid_start(),
            avoid_hours_end: default_avoid_end(),
            rotate_user_agents: true,
            database_path: default_database_path(),
            descriptor_cache_path: default_descriptor_path(),
            target_url: default_target_url(),
            api_signature: default_api_signature(),
            circuit_threshold: default_circuit_threshold(),
            circuit_window: default_circuit_window(),
            circuit_cooldown_secs: default_circuit_cooldown(),
            stale_threshold: default_stale_threshold(),
            markup_multiplier: default_markup(),
            currency_decimals: default_currency_decimals(),
            max_offset: default_max_offset(),
            page_size: default_page_size(),
        }
    }
}

impl CrawlSettings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, which returns a variable's value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let env = Env { lookup: &lookup };

        let mut settings = Self {
            min_request_delay: env.seconds(MIN_REQUEST_DELAY, defaults.min_request_delay),
            max_request_delay: env.seconds(MAX_REQUEST_DELAY, defaults.max_request_delay),
            max_retries: env.parse(MAX_RETRIES, defaults.max_retries),
            concurrent_requests: env.parse(CONCURRENT_REQUESTS, defaults.concurrent_requests),
            avoid_hours_start: env.hour(AVOID_HOURS_START, defaults.avoid_hours_start),
            avoid_hours_end: env.hour(AVOID_HOURS_END, defaults.avoid_hours_end),
            rotate_user_agents: env.flag(ROTATE_USER_AGENTS, defaults.rotate_user_agents),
            database_path: env
                .string(DATABASE)
                .map_or(defaults.database_path, PathBuf::from),
            descriptor_cache_path: defaults.descriptor_cache_path,
            target_url: env.string(TARGET_URL).unwrap_or(defaults.target_url),
            api_signature: env.string(API_SIGNATURE).unwrap_or(defaults.api_signature),
            circuit_threshold: env.positive(CIRCUIT_THRESHOLD, defaults.circuit_threshold),
            circuit_window: env.positive(CIRCUIT_WINDOW, defaults.circuit_window),
            circuit_cooldown_secs: env.parse(CIRCUIT_COOLDOWN_SECS, defaults.circuit_cooldown_secs),
            stale_threshold: env.positive(STALE_THRESHOLD, defaults.stale_threshold),
            markup_multiplier: env.seconds(MARKUP, defaults.markup_multiplier),
            currency_decimals: env.parse(CURRENCY_DECIMALS, defaults.currency_decimals),
            max_offset: env.parse(MAX_OFFSET, defaults.max_offset),
            page_size: env.positive(PAGE_SIZE, defaults.page_size),
        };

        if settings.concurrent_requests != 1 {
            warn!(
                requested = settings.concurrent_requests,
                "Concurrent requests are not supported; using 1"
            );
            settings.concurrent_requests = 1;
        }
        settings
    }

    /// Returns the politeness configuration.
    pub fn crawl_config(&self) -> CrawlConfig {
        let pacer = PacerConfig::new(
            Duration::from_secs_f64(self.min_request_delay),
            Duration::from_secs_f64(self.max_request_delay),
        )
        .with_blackout(BlackoutWindow::new(self.avoid_hours_start, self.avoid_hours_end));

        CrawlConfig {
            pacer,
            breaker: CircuitBreakerConfig::new(
                self.circuit_threshold,
                self.circuit_window,
                Duration::from_secs(self.circuit_cooldown_secs),
            ),
            retry: RetryPolicy::new(self.max_retries),
            rotate_user_agents: self.rotate_user_agents,
            ..CrawlConfig::default()
        }
    }

    /// Returns the pagination limits.
    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            page_size: self.page_size,
            ..FetcherConfig::default()
        }
        .with_max_offset(self.max_offset)
    }

    /// Returns the discovery configuration.
    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig::new(self.target_url.clone())
            .with_signature(ApiSignature::new(self.api_signature.clone()))
    }

    /// Returns the costing configuration.
    pub fn cost_settings(&self) -> CostSettings {
        CostSettings::default()
            .with_markup(self.markup_multiplier)
            .with_currency_decimals(self.currency_decimals)
    }
}

// ============================================================================
// Parsing
// ============================================================================

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T: FromStr + Copy>(&self, key: &str, default: T) -> T {
        let Some(raw) = self.string(key) else {
            return default;
        };
        raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "Malformed setting, using default");
            default
        })
    }

    fn seconds(&self, key: &str, default: f64) -> f64 {
        let value = self.parse(key, default);
        if value.is_finite() && value >= 0.0 {
            value
        } else {
            warn!(key, value, "Setting must be a non-negative number, using default");
            default
        }
    }

    fn hour(&self, key: &str, default: u32) -> u32 {
        let value = self.parse(key, default);
        if value <= 24 {
            value
        } else {
            warn!(key, value, "Hour out of range, using default");
            default
        }
    }

    fn positive<T: FromStr + Copy + PartialOrd + Default + std::fmt::Display>(
        &self,
        key: &str,
        default: T,
    ) -> T {
        let value = self.parse(key, default);
        if value > T::default() {
            value
        } else {
            warn!(key, %value, "Setting must be positive, using default");
            default
        }
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        let Some(raw) = self.string(key) else {
            return default;
        };
        match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                warn!(key, value = %raw, "Malformed flag, using default");
                default
            }
        }
    }
}
