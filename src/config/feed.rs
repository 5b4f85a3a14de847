// src/config/feed.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use crate::feed::DEFAULT_FEED_CAPACITY;
use crate::live::{ChannelConfig, DEFAULT_CHANNEL};
use crate::news_api::DEFAULT_REQUEST_LIMIT;

pub const ENV_CONFIG_PATH: &str = "FEED_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/feed.toml";

const ENV_API_BASE_URL: &str = "FEED_API_BASE_URL";
const ENV_WS_URL: &str = "FEED_WS_URL";
const ENV_API_TOKEN: &str = "FEED_API_TOKEN";
const ENV_STATUS_ADDR: &str = "FEED_STATUS_ADDR";

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub api_base_url: String,
    pub ws_url: String,
    pub channel: String,
    /// "ENV" means: read from FEED_API_TOKEN.
    pub api_token: Option<String>,
    pub reconnect_delay_ms: u64,
    pub feed_capacity: usize,
    pub request_limit: usize,
    /// 0 disables the periodic snapshot refresh.
    pub refresh_interval_secs: u64,
    pub status_addr: String,
    pub preferences_path: PathBuf,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            ws_url: "ws://localhost:8000/ws".to_string(),
            channel: DEFAULT_CHANNEL.to_string(),
            api_token: None,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            feed_capacity: DEFAULT_FEED_CAPACITY,
            request_limit: DEFAULT_REQUEST_LIMIT,
            refresh_interval_secs: 0,
            status_addr: "127.0.0.1:3000".to_string(),
            preferences_path: PathBuf::from("preferences.json"),
        }
    }
}

impl FeedConfig {
    /// Parse a TOML file; missing keys take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading feed config from {}", path.display()))?;
        let mut cfg: FeedConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        cfg.resolve_token()?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Load using env var + fallbacks, then apply env overrides:
    /// 1) $FEED_CONFIG_PATH
    /// 2) config/feed.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load_from_file(DEFAULT_CONFIG_PATH)?
        } else {
            FeedConfig::default()
        };
        cfg.apply_env_overrides();
        cfg.sanitize();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = env::var(ENV_API_BASE_URL) {
            self.api_base_url = v;
        }
        if let Ok(v) = env::var(ENV_WS_URL) {
            self.ws_url = v;
        }
        if let Ok(v) = env::var(ENV_API_TOKEN) {
            self.api_token = Some(v);
        }
        if let Ok(v) = env::var(ENV_STATUS_ADDR) {
            self.status_addr = v;
        }
    }

    fn resolve_token(&mut self) -> Result<()> {
        let wants_env = self
            .api_token
            .as_deref()
            .is_some_and(|t| t.trim().eq_ignore_ascii_case("env"));
        if wants_env {
            let token = env::var(ENV_API_TOKEN)
                .map_err(|_| anyhow!("Missing {ENV_API_TOKEN} env var"))?;
            self.api_token = Some(token);
        }
        Ok(())
    }

    fn sanitize(&mut self) {
        let defaults = FeedConfig::default();
        if self.feed_capacity == 0 {
            self.feed_capacity = defaults.feed_capacity;
        }
        if self.request_limit == 0 {
            self.request_limit = defaults.request_limit;
        }
        if self.channel.trim().is_empty() {
            self.channel = defaults.channel;
        }
        if self
            .api_token
            .as_deref()
            .is_some_and(|t| t.trim().is_empty())
        {
            self.api_token = None;
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_interval_secs > 0).then(|| Duration::from_secs(self.refresh_interval_secs))
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig::new(self.ws_url.clone())
            .with_channel(self.channel.clone())
            .with_reconnect_delay(self.reconnect_delay())
            .with_bearer_token(self.api_token.clone())
    }
}
