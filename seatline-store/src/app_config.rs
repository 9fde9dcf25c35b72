use serde::Deserialize;
use seatline_domain::ConfirmPolicy;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// Postgres connection string, or `memory` for the in-process store.
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.eq_ignore_ascii_case("memory")
    }
}

fn default_max_connections() -> u32 { 5 }

#[derive(Debug, Deserialize, Clone)]
pub struct SweeperConfig {
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

impl SweeperConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds.max(1))
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self { interval_seconds: default_interval_seconds() }
    }
}

fn default_interval_seconds() -> u64 { 60 }

#[derive(Debug, Deserialize, Clone, Default)]
pub struct InventoryConfig {
    #[serde(default)]
    pub confirm_policy: ConfirmPolicy,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment overlay, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Untracked local overrides
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `SEATLINE_DATABASE__URL=memory`
            .add_source(config::Environment::with_prefix("SEATLINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
