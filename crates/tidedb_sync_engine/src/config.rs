//! Configuration for the sync engine.

use std::time::Duration;

/// Configuration for sync operations.
///
/// Built programmatically or loaded from the environment via
/// [`SyncConfig::from_env`]. None of these settings require an engine
/// restart to pick up except `base_url`.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote base URL (e.g. "https://sync.example.com/api/sync").
    pub base_url: String,
    /// Interval between automatic sync rounds. None disables the
    /// periodic trigger.
    pub periodic_interval: Option<Duration>,
    /// Per-request network timeout.
    pub request_timeout: Duration,
    /// Capacity of the diagnostics ring log.
    pub log_capacity: usize,
    /// Whether the one-time bulk ("turbo") path may be used for a
    /// never-synced store.
    pub turbo_enabled: bool,
    /// Report freshly created local records to the server as
    /// "updated" instead of "created". Needed when the server may
    /// already know an identifier the client created locally before
    /// its first sync (identifier collisions from the turbo path).
    pub report_created_as_updated: bool,
}

impl SyncConfig {
    /// Creates a configuration for the given remote base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            periodic_interval: Some(Duration::from_secs(300)),
            request_timeout: Duration::from_secs(30),
            log_capacity: 10,
            turbo_enabled: true,
            report_created_as_updated: false,
        }
    }

    /// Loads configuration from the environment.
    ///
    /// Variables:
    /// - `TIDEDB_SYNC_URL` (required)
    /// - `TIDEDB_SYNC_INTERVAL_SECS` (0 disables the periodic trigger)
    /// - `TIDEDB_SYNC_TIMEOUT_SECS`
    /// - `TIDEDB_SYNC_LOG_CAPACITY`
    /// - `TIDEDB_SYNC_TURBO` ("true"/"false")
    ///
    /// Returns None when `TIDEDB_SYNC_URL` is unset.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var("TIDEDB_SYNC_URL").ok()?;
        let mut config = Self::new(base_url);

        if let Some(secs) = env_u64("TIDEDB_SYNC_INTERVAL_SECS") {
            config.periodic_interval = if secs == 0 {
                None
            } else {
                Some(Duration::from_secs(secs))
            };
        }
        if let Some(secs) = env_u64("TIDEDB_SYNC_TIMEOUT_SECS") {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(capacity) = env_u64("TIDEDB_SYNC_LOG_CAPACITY") {
            config.log_capacity = capacity as usize;
        }
        if let Ok(turbo) = std::env::var("TIDEDB_SYNC_TURBO") {
            config.turbo_enabled = turbo.eq_ignore_ascii_case("true") || turbo == "1";
        }

        Some(config)
    }

    /// Sets the periodic sync interval.
    pub fn with_periodic_interval(mut self, interval: Option<Duration>) -> Self {
        self.periodic_interval = interval;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the diagnostics log capacity.
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Enables or disables the turbo path.
    pub fn with_turbo(mut self, enabled: bool) -> Self {
        self.turbo_enabled = enabled;
        self
    }

    /// Enables or disables reporting creates as updates on push.
    pub fn with_report_created_as_updated(mut self, enabled: bool) -> Self {
        self.report_created_as_updated = enabled;
        self
    }
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = SyncConfig::new("https://sync.example.com");
        assert_eq!(config.base_url, "https://sync.example.com");
        assert_eq!(config.log_capacity, 10);
        assert!(config.turbo_enabled);
        assert!(!config.report_created_as_updated);
    }

    #[test]
    fn builder_overrides() {
        let config = SyncConfig::new("https://sync.example.com")
            .with_periodic_interval(None)
            .with_request_timeout(Duration::from_secs(5))
            .with_log_capacity(25)
            .with_turbo(false)
            .with_report_created_as_updated(true);

        assert!(config.periodic_interval.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.log_capacity, 25);
        assert!(!config.turbo_enabled);
        assert!(config.report_created_as_updated);
    }
}
