//! Daemon configuration, loaded from TOML.

use coffer_ledger_client::{KnownWallet, KnownWalletKind, KnownWallets, RateTable};
use coffer_types::{Address, DecimalValue, NetworkProfile};
use coffer_utils::LogFormat;
use coffer_wallet_core::{WalletServices, DEFAULT_PENDING_SYNC_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config cannot be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// A fallback conversion rate seeded into the in-memory rate table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRateEntry {
    pub from: String,
    pub to: String,
    pub rate: DecimalValue,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownWalletEntry {
    pub address: Address,
    pub name: String,
    #[serde(default)]
    pub kind: KnownWalletKind,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Base URL of the ledger node's HTTP API.
    #[serde(default = "default_node_url")]
    pub node_url: String,

    #[serde(default)]
    pub network: NetworkProfile,

    /// Currency fiat values are reported in.
    #[serde(default = "default_exchange_currency")]
    pub exchange_currency: String,

    #[serde(default = "default_pending_poll_interval_secs")]
    pub pending_poll_interval_secs: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub exchange_rates: Vec<ExchangeRateEntry>,

    #[serde(default)]
    pub known_wallets: Vec<KnownWalletEntry>,
}

fn default_node_url() -> String {
    "http://127.0.0.1:4003/api".to_string()
}

fn default_exchange_currency() -> String {
    "USD".to_string()
}

fn default_pending_poll_interval_secs() -> u64 {
    DEFAULT_PENDING_SYNC_INTERVAL.as_secs()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            node_url: default_node_url(),
            network: NetworkProfile::default(),
            exchange_currency: default_exchange_currency(),
            pending_poll_interval_secs: default_pending_poll_interval_secs(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            exchange_rates: Vec::new(),
            known_wallets: Vec::new(),
        }
    }
}

impl DaemonConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Never zero: a zero interval would make the poll spin.
    pub fn pending_poll_interval(&self) -> Duration {
        Duration::from_secs(self.pending_poll_interval_secs.max(1))
    }

    /// Exchange rates and known wallets as wallet services.
    pub fn services(&self) -> WalletServices {
        let rates = RateTable::new();
        for entry in &self.exchange_rates {
            rates.set_fallback_rate(&entry.from, &entry.to, entry.rate.clone());
        }
        let known = KnownWallets::new(
            self.known_wallets
                .iter()
                .map(|entry| KnownWallet {
                    network: self.network.id.clone(),
                    address: entry.address.clone(),
                    name: entry.name.clone(),
                    kind: entry.kind,
                })
                .collect(),
        );
        WalletServices::new(Arc::new(rates), Arc::new(known))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_ledger_client::KnownWalletService;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = DaemonConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = DaemonConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = DaemonConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.pending_poll_interval(), Duration::from_secs(5));
        assert_eq!(config.exchange_currency, "USD");
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.network.ticker, "DARK");
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            node_url = "https://dwallets.ark.io/api"
            pending_poll_interval_secs = 0
            log_format = "json"

            [network]
            id = "ark.mainnet"
            ticker = "ARK"
            decimals = 8

            [[exchange_rates]]
            from = "ARK"
            to = "USD"
            rate = "0.31"

            [[known_wallets]]
            address = "AFrPtEmzu6wdVpa2CnRDEKGQQMWgq8nE9V"
            name = "Binance"
            kind = "exchange"
        "#;
        let config = DaemonConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.node_url, "https://dwallets.ark.io/api");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.pending_poll_interval(), Duration::from_secs(1));
        assert!(!config.network.uses_extended_public_key);

        let services = config.services();
        assert!(services
            .known_wallets
            .is_exchange("ark.mainnet", &"AFrPtEmzu6wdVpa2CnRDEKGQQMWgq8nE9V".into()));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "exchange_currency = \"EUR\"").unwrap();
        let config = DaemonConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.exchange_currency, "EUR");
    }

    #[test]
    fn missing_file_returns_read_error() {
        let result = DaemonConfig::from_toml_file(Path::new("/nonexistent/coffer.toml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
