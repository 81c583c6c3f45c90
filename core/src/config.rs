use serde::{Deserialize, Serialize};

/// Pipeline window: records a single consumer may hold unacknowledged.
pub const DEFAULT_WINDOW: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub host: String,
    pub producer_port: u16,
    pub consumer_port: u16,
    pub monitor_port: u16,
    /// Path of the append-only journal. Deleting it between runs is the
    /// documented reset procedure.
    pub journal_path: String,
    /// Per-consumer pipeline window `W`.
    pub window: usize,
    /// Capacity of each consumer's outbound channel; a full channel is the
    /// backpressure signal that skips the consumer for one dispatch pass.
    pub dispatch_buffer: usize,
    /// Seconds between counters summary log lines.
    pub stats_interval_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            producer_port: 9100,
            consumer_port: 9200,
            monitor_port: 8081,
            journal_path: "broker_log.txt".to_string(),
            window: DEFAULT_WINDOW,
            dispatch_buffer: 64,
            stats_interval_secs: 5,
        }
    }
}

impl BrokerConfig {
    /// Validate configuration bounds before binding anything.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.window == 0 {
            return Err("window must be > 0".to_string());
        }
        if self.dispatch_buffer == 0 {
            return Err("dispatch_buffer must be > 0".to_string());
        }
        if self.journal_path.is_empty() {
            return Err("journal_path must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(BrokerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_window_rejected() {
        let config = BrokerConfig {
            window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
