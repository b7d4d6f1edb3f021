//! Configuration for the sync engine.

use std::time::Duration;

/// Timing and addressing parameters of a [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Delay that coalesces bursts of observer changes into one reconciliation.
    pub activation_debounce: Duration,
    /// Interval at which the schema is re-requested until it arrives.
    pub schema_retry_interval: Duration,
    /// Delay between consecutive link/unlink requests.
    pub scheduler_interval: Duration,
    /// Delay before the first scheduler tick after the transport opens.
    pub open_delay: Duration,
    /// Port number of the first slot in the pool.
    pub first_port: u32,
    /// Separator used in outbound paths.
    pub path_separator: char,
}

impl SyncConfig {
    /// Creates a configuration with the default timings.
    pub fn new() -> Self {
        Self {
            activation_debounce: Duration::from_millis(100),
            schema_retry_interval: Duration::from_millis(2000),
            scheduler_interval: Duration::from_millis(1000),
            open_delay: Duration::from_millis(100),
            first_port: 1,
            path_separator: '.',
        }
    }

    /// Sets the activation debounce delay.
    pub fn with_activation_debounce(mut self, delay: Duration) -> Self {
        self.activation_debounce = delay;
        self
    }

    /// Sets the schema re-request interval.
    pub fn with_schema_retry_interval(mut self, interval: Duration) -> Self {
        self.schema_retry_interval = interval;
        self
    }

    /// Sets the delay between scheduler requests.
    pub fn with_scheduler_interval(mut self, interval: Duration) -> Self {
        self.scheduler_interval = interval;
        self
    }

    /// Sets the delay of the first scheduler tick after opening.
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    /// Sets the port base.
    pub fn with_first_port(mut self, port: u32) -> Self {
        self.first_port = port;
        self
    }

    /// Sets the outbound path separator.
    pub fn with_path_separator(mut self, separator: char) -> Self {
        self.path_separator = separator;
        self
    }

    /// Joins path segments with the configured separator.
    pub fn join_path<S: AsRef<str>>(&self, segments: &[S]) -> String {
        sdds_tree::join_path_with(segments, self.path_separator)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.activation_debounce, Duration::from_millis(100));
        assert_eq!(config.schema_retry_interval, Duration::from_secs(2));
        assert_eq!(config.scheduler_interval, Duration::from_secs(1));
        assert_eq!(config.open_delay, Duration::from_millis(100));
        assert_eq!(config.first_port, 1);
    }

    #[test]
    fn builder_and_join() {
        let config = SyncConfig::new()
            .with_scheduler_interval(Duration::from_millis(10))
            .with_first_port(4)
            .with_path_separator('/');
        assert_eq!(config.scheduler_interval, Duration::from_millis(10));
        assert_eq!(config.first_port, 4);
        assert_eq!(config.join_path(&["a", "b"]), "a/b");
        assert_eq!(config.join_path::<&str>(&[]), "");
    }
}
