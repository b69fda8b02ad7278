use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Game backend base URL (serves /users and /barking-power)
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Hedera mirror node REST base URL
    #[serde(default = "default_mirror_node_url")]
    pub mirror_node_url: String,
    /// GeckoTerminal API base URL
    #[serde(default = "default_gecko_terminal_url")]
    pub gecko_terminal_url: String,
    /// GeckoTerminal network slug
    #[serde(default = "default_network")]
    pub network: String,
    /// $HBARK token id on the mirror node
    #[serde(default = "default_token_id")]
    pub token_id: String,
    /// HBARK/WHBAR pool address on GeckoTerminal
    #[serde(default = "default_pool_address")]
    pub pool_address: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardConfig {
    /// Rows fetched for the remaining-power table.
    #[serde(default = "default_table_limit")]
    pub table_limit: u32,
    /// Rows fetched when scanning barks received for an unlinked handle.
    #[serde(default = "default_scan_limit")]
    pub scan_limit: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_backend_url() -> String {
    "https://sure-angeline-piotrswierzy-b061c303.koyeb.app".to_string()
}
fn default_mirror_node_url() -> String {
    "https://mainnet-public.mirrornode.hedera.com/api/v1".to_string()
}
fn default_gecko_terminal_url() -> String {
    "https://api.geckoterminal.com/api/v2".to_string()
}
fn default_network() -> String {
    "hedera-hashgraph".to_string()
}
fn default_token_id() -> String {
    "0.0.5022567".to_string()
}
fn default_pool_address() -> String {
    "0x6c241d9dea13214b43d198585ce214caf4d346df".to_string()
}
fn default_request_timeout() -> u64 {
    30
}
fn default_table_limit() -> u32 {
    1000
}
fn default_scan_limit() -> u32 {
    2000
}
fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            mirror_node_url: default_mirror_node_url(),
            gecko_terminal_url: default_gecko_terminal_url(),
            network: default_network(),
            token_id: default_token_id(),
            pool_address: default_pool_address(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            table_limit: default_table_limit(),
            scan_limit: default_scan_limit(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load config from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.apply_env();
        Ok(config)
    }

    /// Defaults plus environment overrides (no file needed).
    pub fn from_env() -> Self {
        let mut config = Config {
            api: ApiConfig::default(),
            leaderboard: LeaderboardConfig::default(),
            dashboard: DashboardConfig::default(),
            logging: LoggingConfig::default(),
        };
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("BARK_BACKEND_URL") {
            self.api.backend_url = url;
        }
        if let Ok(url) = std::env::var("BARK_MIRROR_URL") {
            self.api.mirror_node_url = url;
        }
        if let Ok(url) = std::env::var("BARK_GECKO_URL") {
            self.api.gecko_terminal_url = url;
        }
        if let Ok(id) = std::env::var("BARK_TOKEN_ID") {
            self.api.token_id = id;
        }
        if let Ok(pool) = std::env::var("BARK_POOL_ADDRESS") {
            self.api.pool_address = pool;
        }
        if let Ok(addr) = std::env::var("BARK_DASHBOARD_ADDR") {
            self.dashboard.bind_addr = addr;
        }
    }
}
