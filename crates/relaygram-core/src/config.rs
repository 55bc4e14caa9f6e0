use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    env_vars, APP_DIR_NAME, APP_VERSION, DISPLAY_NAMES_FILE, LOG_FILE, POLL_INTERVAL_SECS,
    SEND_SETTLE_DELAY_MS,
};

/// Which messaging network deployment a session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkEnv {
    #[default]
    Dev,
    Production,
    Local,
}

impl NetworkEnv {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkEnv::Dev => "dev",
            NetworkEnv::Production => "production",
            NetworkEnv::Local => "local",
        }
    }
}

impl FromStr for NetworkEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(NetworkEnv::Dev),
            "production" | "prod" => Ok(NetworkEnv::Production),
            "local" => Ok(NetworkEnv::Local),
            other => Err(format!("unknown network env: {other}")),
        }
    }
}

impl std::fmt::Display for NetworkEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub data_dir: PathBuf,
    pub env: NetworkEnv,
    pub app_version: String,
    pub poll_interval: Duration,
    pub send_settle_delay: Duration,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            env: NetworkEnv::default(),
            app_version: APP_VERSION.to_string(),
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            send_settle_delay: Duration::from_millis(SEND_SETTLE_DELAY_MS),
        }
    }

    /// Defaults overridden by `RELAYGRAM_*` environment variables.
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var(env_vars::DATA_DIR) {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }

        if let Ok(env) = std::env::var(env_vars::NETWORK_ENV) {
            match env.parse() {
                Ok(env) => config.env = env,
                Err(err) => tracing::warn!("Ignoring {}: {}", env_vars::NETWORK_ENV, err),
            }
        }

        if let Ok(secs) = std::env::var(env_vars::POLL_SECS) {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.poll_interval = Duration::from_secs(secs),
                _ => tracing::warn!("Ignoring {}={:?}", env_vars::POLL_SECS, secs),
            }
        }

        config
    }

    pub fn with_env(mut self, env: NetworkEnv) -> Self {
        self.env = env;
        self
    }

    pub fn with_data_dir<P: AsRef<Path>>(mut self, data_dir: P) -> Self {
        self.data_dir = data_dir.as_ref().to_path_buf();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_send_settle_delay(mut self, delay: Duration) -> Self {
        self.send_settle_delay = delay;
        self
    }

    pub fn display_names_path(&self) -> PathBuf {
        self.data_dir.join(DISPLAY_NAMES_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.data_dir.join(LOG_FILE)
    }

    /// Per-identity local database path handed to the network session.
    pub fn session_db_path(&self, address: &str) -> PathBuf {
        self.data_dir
            .join(format!("xmtp-{}-{}.db3", self.env.as_str(), address.to_lowercase()))
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .unwrap_or_else(|| PathBuf::from(format!("{APP_DIR_NAME}_data")));
        Self::new(data_dir)
    }
}
