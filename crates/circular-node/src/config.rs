//! Node configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use circular_rebalance::RebalanceConfig;
use circular_routing::{LiquidityAging, AGING_VARIANCE, AVERAGE_AGING_AMOUNT};

/// Full configuration for the Circular daemon.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CircularConfig {
    /// Connection to the Lightning node.
    #[serde(default)]
    pub lightning: LightningConfig,

    /// Refresh schedule.
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Rebalance engine settings.
    #[serde(default)]
    pub rebalance: RebalanceSettings,

    /// Liquidity aging window.
    #[serde(default)]
    pub aging: AgingConfig,

    /// API server settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightningConfig {
    /// Path to the Core Lightning `lightning-rpc` socket.
    #[serde(default = "default_rpc_path")]
    pub rpc_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_graph_interval")]
    pub graph_interval_secs: u64,
    #[serde(default = "default_peer_interval")]
    pub peer_interval_secs: u64,
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the data directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Graph snapshot file name inside `data_dir`.
    #[serde(default = "default_graph_file")]
    pub graph_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalanceSettings {
    #[serde(default = "default_max_hops_ceiling")]
    pub max_hops_ceiling: usize,
    #[serde(default = "default_hop_step")]
    pub hop_step: usize,
    #[serde(default = "default_final_cltv_delta")]
    pub final_cltv_delta: u32,
    #[serde(default = "default_payment_timeout")]
    pub payment_timeout_secs: u64,
    #[serde(default = "default_attempt_deadline")]
    pub attempt_deadline_secs: u64,
    /// Fee ceiling used when a request does not carry one.
    #[serde(default = "default_max_ppm")]
    pub default_max_ppm: u64,
    /// First hop limit used when a request does not carry one.
    #[serde(default = "default_initial_max_hops")]
    pub default_initial_max_hops: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgingConfig {
    #[serde(default = "default_aging_average")]
    pub average_msat: u64,
    #[serde(default = "default_aging_variance")]
    pub variance_msat: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API listen address.
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    /// API port.
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_rpc_path() -> PathBuf {
    PathBuf::from(".lightning/bitcoin/lightning-rpc")
}
fn default_graph_interval() -> u64 {
    600
}
fn default_peer_interval() -> u64 {
    30
}
fn default_stats_interval() -> u64 {
    600
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_graph_file() -> String {
    "graph.json".into()
}
fn default_max_hops_ceiling() -> usize {
    10
}
fn default_hop_step() -> usize {
    1
}
fn default_final_cltv_delta() -> u32 {
    9
}
fn default_payment_timeout() -> u64 {
    60
}
fn default_attempt_deadline() -> u64 {
    300
}
fn default_max_ppm() -> u64 {
    1_000
}
fn default_initial_max_hops() -> usize {
    3
}
fn default_aging_average() -> u64 {
    AVERAGE_AGING_AMOUNT
}
fn default_aging_variance() -> u64 {
    AGING_VARIANCE
}
fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    9101
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for LightningConfig {
    fn default() -> Self {
        Self {
            rpc_path: default_rpc_path(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            graph_interval_secs: default_graph_interval(),
            peer_interval_secs: default_peer_interval(),
            stats_interval_secs: default_stats_interval(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            graph_file: default_graph_file(),
        }
    }
}

impl Default for RebalanceSettings {
    fn default() -> Self {
        Self {
            max_hops_ceiling: default_max_hops_ceiling(),
            hop_step: default_hop_step(),
            final_cltv_delta: default_final_cltv_delta(),
            payment_timeout_secs: default_payment_timeout(),
            attempt_deadline_secs: default_attempt_deadline(),
            default_max_ppm: default_max_ppm(),
            default_initial_max_hops: default_initial_max_hops(),
        }
    }
}

impl Default for AgingConfig {
    fn default() -> Self {
        Self {
            average_msat: default_aging_average(),
            variance_msat: default_aging_variance(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl CircularConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: CircularConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn api_addr(&self) -> String {
        format!("{}:{}", self.api.listen_addr, self.api.port)
    }

    pub fn graph_path(&self) -> PathBuf {
        self.storage.data_dir.join(&self.storage.graph_file)
    }

    pub fn rebalance_config(&self) -> RebalanceConfig {
        RebalanceConfig {
            max_hops_ceiling: self.rebalance.max_hops_ceiling,
            hop_step: self.rebalance.hop_step,
            final_cltv_delta: self.rebalance.final_cltv_delta,
            payment_timeout: Duration::from_secs(self.rebalance.payment_timeout_secs),
            attempt_deadline: Duration::from_secs(self.rebalance.attempt_deadline_secs),
        }
    }

    pub fn liquidity_aging(&self) -> LiquidityAging {
        LiquidityAging {
            average: self.aging.average_msat,
            variance: self.aging.variance_msat,
        }
    }
}
