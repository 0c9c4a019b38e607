use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// System-wide configuration shared by every process.
///
/// Each process loads the same TOML file (or runs on defaults) so addresses,
/// the region name, and the symbol set agree across the process group.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SystemConfig {
    /// Address the gateway listens on for market data subscribers.
    pub gateway_addr: String,
    /// Address the order manager listens on for order flow.
    pub ordermanager_addr: String,
    /// Path of the shared book region (use a tmpfs mount for shared memory).
    pub book_region: String,
    /// Symbols carried by the gateway feed and the book region, in slot order.
    pub symbols: Vec<String>,
    pub log_level: String,
    /// Gateway pacing: one market data burst per interval.
    pub market_data_interval_ms: u64,
    /// Gateway pacing: one sentiment message per interval.
    pub sentiment_interval_ms: u64,
    /// Strategy: relative price move that can trigger a signal.
    pub price_change_threshold: f64,
    /// Strategy: sentiment magnitude that can trigger a signal.
    pub sentiment_threshold: f64,
    /// How often processes log throughput statistics, in seconds.
    pub stats_interval_secs: u64,
    /// File the order manager appends executions to, one JSON line each.
    pub trade_log: String,
    pub connect_attempts: u32,
    pub connect_retry_ms: u64,
    /// Receive deadline used by polling loops so shutdown is never blocked
    /// behind a silent socket.
    pub recv_timeout_ms: u64,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            gateway_addr: defaults::gateway_addr(),
            ordermanager_addr: defaults::ordermanager_addr(),
            book_region: defaults::book_region(),
            symbols: defaults::symbols(),
            log_level: defaults::log_level(),
            market_data_interval_ms: defaults::market_data_interval_ms(),
            sentiment_interval_ms: defaults::sentiment_interval_ms(),
            price_change_threshold: defaults::price_change_threshold(),
            sentiment_threshold: defaults::sentiment_threshold(),
            stats_interval_secs: defaults::stats_interval_secs(),
            trade_log: defaults::trade_log(),
            connect_attempts: defaults::connect_attempts(),
            connect_retry_ms: defaults::connect_retry_ms(),
            recv_timeout_ms: defaults::recv_timeout_ms(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
}

mod defaults {
    pub fn gateway_addr() -> String {
        "127.0.0.1:5555".into()
    }

    pub fn ordermanager_addr() -> String {
        "127.0.0.1:5558".into()
    }

    pub fn book_region() -> String {
        "/dev/shm/basalt_book".into()
    }

    pub fn symbols() -> Vec<String> {
        ["AAPL", "GOOGL", "MSFT", "AMZN", "TSLA"]
            .map(String::from)
            .to_vec()
    }

    pub fn log_level() -> String {
        "info".into()
    }

    pub fn market_data_interval_ms() -> u64 {
        100
    }

    pub fn sentiment_interval_ms() -> u64 {
        2_000
    }

    pub fn price_change_threshold() -> f64 {
        0.005
    }

    pub fn sentiment_threshold() -> f64 {
        0.3
    }

    pub fn stats_interval_secs() -> u64 {
        10
    }

    pub fn trade_log() -> String {
        "trades.log".into()
    }

    pub fn connect_attempts() -> u32 {
        5
    }

    pub fn connect_retry_ms() -> u64 {
        1_000
    }

    pub fn recv_timeout_ms() -> u64 {
        1_000
    }
}

impl SystemConfig {
    pub fn load(path: impl AsRef<Path> + ToString) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: SystemConfig = toml::from_str(&raw)?;
        Ok(config)
    }

    /// Load `path` when given, defaults otherwise. The first CLI argument of
    /// every bin routes here.
    pub fn load_or_default(path: Option<String>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_ms)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_field() {
        let cfg = SystemConfig::default();
        assert_eq!(cfg.gateway_addr, "127.0.0.1:5555");
        assert_eq!(cfg.symbols.len(), 5);
        assert_eq!(cfg.symbols[0], "AAPL");
        assert_eq!(cfg.market_data_interval_ms, 100);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: SystemConfig = toml::from_str(
            r#"
            gateway_addr = "10.0.0.1:9999"
            symbols = ["BTC", "ETH"]
            "#,
        )
        .unwrap();
        assert_eq!(cfg.gateway_addr, "10.0.0.1:9999");
        assert_eq!(cfg.symbols, vec!["BTC".to_string(), "ETH".to_string()]);
        // Untouched fields keep their defaults.
        assert_eq!(cfg.ordermanager_addr, "127.0.0.1:5558");
        assert_eq!(cfg.sentiment_threshold, 0.3);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = SystemConfig::load("/nonexistent/basalt.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
