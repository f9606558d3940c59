use std::env;
use std::time::Duration;

use crate::multiplier::BoundsMultiplierTable;

/// Poll cadence when nothing else is configured.
pub const UPDATE_INTERVAL: Duration = Duration::from_millis(5000);

/// If loading vehicles takes longer than this, the loader is shown.
pub const SHOW_LOADER_FETCHING_TIMEOUT: Duration = Duration::from_millis(2000);

/// Upper bound for a single fetch before it settles as a failure.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Concurrent fetches allowed when a fetch outlasts the poll interval.
pub const MAX_IN_FLIGHT: usize = 2;

/// Configuration errors reported at startup.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "bounds multipliers must be strictly descending by zoom: {prev} is followed by {next}"
    )]
    UnsortedMultipliers { prev: f64, next: f64 },

    #[error("bounds multiplier entry {index} is invalid: {reason}")]
    InvalidMultiplier { index: usize, reason: String },

    #[error("cannot parse bounds multiplier `{0}`, expected `<zoom>:<multiplier>`")]
    UnparseableMultiplier(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Settings for the poll scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub update_interval: Duration,
    pub loader_delay: Duration,
    pub fetch_timeout: Duration,
    pub max_in_flight: usize,
    pub multipliers: BoundsMultiplierTable,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            update_interval: UPDATE_INTERVAL,
            loader_delay: SHOW_LOADER_FETCHING_TIMEOUT,
            fetch_timeout: FETCH_TIMEOUT,
            max_in_flight: MAX_IN_FLIGHT,
            multipliers: BoundsMultiplierTable::default(),
        }
    }
}

impl PollConfig {
    /// Read `TRACKER_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    ///
    /// Unparseable numbers fall back to their defaults; an invalid multiplier
    /// table or a zero duration is an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let multipliers = match lookup("TRACKER_BOUNDS_MULTIPLIERS") {
            Some(raw) => raw.parse()?,
            None => defaults.multipliers,
        };

        let config = Self {
            update_interval: lookup_millis(
                &lookup,
                "TRACKER_UPDATE_INTERVAL_MS",
                defaults.update_interval,
            ),
            loader_delay: lookup_millis(&lookup, "TRACKER_LOADER_DELAY_MS", defaults.loader_delay),
            fetch_timeout: lookup_millis(
                &lookup,
                "TRACKER_FETCH_TIMEOUT_MS",
                defaults.fetch_timeout,
            ),
            max_in_flight: lookup_parsed(&lookup, "TRACKER_MAX_IN_FLIGHT", defaults.max_in_flight)
                .max(1),
            multipliers,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("update interval"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("fetch timeout"));
        }
        Ok(())
    }
}

fn lookup_parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn lookup_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = PollConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, PollConfig::default());
        assert_eq!(config.loader_delay, Duration::from_millis(2000));
    }

    #[test]
    fn reads_overrides() {
        let config = PollConfig::from_lookup(lookup(&[
            ("TRACKER_UPDATE_INTERVAL_MS", "1000"),
            ("TRACKER_LOADER_DELAY_MS", "750"),
            ("TRACKER_MAX_IN_FLIGHT", "3"),
            ("TRACKER_BOUNDS_MULTIPLIERS", "10:2.0"),
        ]))
        .expect("config");
        assert_eq!(config.update_interval, Duration::from_millis(1000));
        assert_eq!(config.loader_delay, Duration::from_millis(750));
        assert_eq!(config.max_in_flight, 3);
        assert_eq!(config.multipliers.resolve(11.0), 2.0);
    }

    #[test]
    fn garbage_numbers_fall_back_to_defaults() {
        let config = PollConfig::from_lookup(lookup(&[
            ("TRACKER_UPDATE_INTERVAL_MS", "soon"),
            ("TRACKER_MAX_IN_FLIGHT", "0"),
        ]))
        .expect("config");
        assert_eq!(config.update_interval, UPDATE_INTERVAL);
        assert_eq!(config.max_in_flight, 1);
    }

    #[test]
    fn unsorted_multipliers_fail_at_startup() {
        let err = PollConfig::from_lookup(lookup(&[("TRACKER_BOUNDS_MULTIPLIERS", "9:1.2,16:3.0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsortedMultipliers { .. }));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = PollConfig::from_lookup(lookup(&[("TRACKER_UPDATE_INTERVAL_MS", "0")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroDuration("update interval"));
    }
}
