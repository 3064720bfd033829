//! # Connection and cadence configuration.
//!
//! Provides [`CoordinatorConfig`], the settings one coordinator is built from.
//! Bootstrap code owns where the values come from; [`CoordinatorConfig::from_env`]
//! covers the environment a balena container is started with.
//!
//! ## Sentinel values
//! - `request_timeout = 0s` → no per-request timeout
//! - `default_interval` / `burst_interval` of `0s` are clamped to 1ms by the accessors

use std::time::Duration;

/// Environment variable holding the supervisor host or URL.
pub const ENV_SUPERVISOR_ADDRESS: &str = "BALENA_SUPERVISOR_ADDRESS";
/// Environment variable holding the supervisor port (used with a bare host).
pub const ENV_SUPERVISOR_PORT: &str = "BALENA_SUPERVISOR_PORT";
/// Environment variable holding the supervisor API key.
pub const ENV_SUPERVISOR_API_KEY: &str = "BALENA_SUPERVISOR_API_KEY";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: &str = "8080";
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration for one coordinator (one supervisor connection).
///
/// ## Field semantics
/// - `base_url`: supervisor root URL, e.g. `http://127.0.0.1:48484`
/// - `api_key`: sent as the `apikey` query parameter
/// - `default_interval`: polling period in normal mode
/// - `burst_interval`: polling period while a burst is active
/// - `burst_duration`: how long a burst lasts after the most recent arm
/// - `request_timeout`: per-request HTTP timeout (`0s` = none)
/// - `burst_on_start`: enter burst mode right after the first refresh
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Supervisor root URL.
    pub base_url: String,

    /// Supervisor API key.
    pub api_key: String,

    /// Polling period in normal mode.
    pub default_interval: Duration,

    /// Polling period in burst mode.
    ///
    /// Expected to be shorter than `default_interval`; not enforced.
    pub burst_interval: Duration,

    /// Burst length, counted from the latest `start_burst_refresh()`.
    pub burst_duration: Duration,

    /// Per-request timeout.
    ///
    /// - `Duration::ZERO` = requests are not bounded by the client
    /// - `> 0` = applied to every request
    pub request_timeout: Duration,

    /// Start in burst mode once the initial refresh has run.
    pub burst_on_start: bool,
}

impl CoordinatorConfig {
    /// Builds a config from the process environment, defaulting what is unset.
    ///
    /// `BALENA_SUPERVISOR_ADDRESS` may be a full URL (used verbatim) or a bare
    /// host, which is combined with `BALENA_SUPERVISOR_PORT` as `http://host:port`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`CoordinatorConfig::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let address = non_empty(ENV_SUPERVISOR_ADDRESS).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let base_url = if address.contains("://") {
            address.trim_end_matches('/').to_string()
        } else {
            let port = non_empty(ENV_SUPERVISOR_PORT).unwrap_or_else(|| DEFAULT_PORT.to_string());
            format!("http://{address}:{port}")
        };

        Self {
            base_url,
            api_key: non_empty(ENV_SUPERVISOR_API_KEY).unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Returns the per-request timeout as an `Option`.
    ///
    /// - `None` → no timeout
    /// - `Some(d)` → applied to every request
    #[inline]
    pub fn request_timeout_opt(&self) -> Option<Duration> {
        if self.request_timeout == Duration::ZERO {
            None
        } else {
            Some(self.request_timeout)
        }
    }

    /// Normal polling period, at least 1ms.
    #[inline]
    pub fn default_interval_clamped(&self) -> Duration {
        self.default_interval.max(MIN_INTERVAL)
    }

    /// Burst polling period, at least 1ms.
    #[inline]
    pub fn burst_interval_clamped(&self) -> Duration {
        self.burst_interval.max(MIN_INTERVAL)
    }
}

impl Default for CoordinatorConfig {
    /// Default configuration:
    ///
    /// - `base_url = http://localhost:8080`
    /// - `api_key = ""`
    /// - `default_interval = 5min`
    /// - `burst_interval = 10s`
    /// - `burst_duration = 90s`
    /// - `request_timeout = 10s`
    /// - `burst_on_start = true`
    fn default() -> Self {
        Self {
            base_url: format!("http://{DEFAULT_HOST}:{DEFAULT_PORT}"),
            api_key: String::new(),
            default_interval: Duration::from_secs(5 * 60),
            burst_interval: Duration::from_secs(10),
            burst_duration: Duration::from_secs(90),
            request_timeout: Duration::from_secs(10),
            burst_on_start: true,
        }
    }
}
