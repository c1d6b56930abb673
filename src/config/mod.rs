use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Upstream catalog APIs and the paging defaults used when relaying them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of Source A, also the target of the `/api/home|detail|video` passthrough
    #[serde(default = "default_melolo_base_url")]
    pub melolo_base_url: String,
    #[serde(default = "default_dramabox_base_url")]
    pub dramabox_base_url: String,
    #[serde(default = "default_netshort_base_url")]
    pub netshort_base_url: String,
    /// Language used when the request does not carry one
    #[serde(default = "default_lang")]
    pub default_lang: String,
    /// Page size for the passthrough `home` route when `count` is absent
    #[serde(default = "default_proxy_count")]
    pub proxy_count: u32,
    /// Page size for the normalized catalog routes
    #[serde(default = "default_items_per_page")]
    pub items_per_page: u32,
    #[serde(with = "duration_serde::duration", default = "default_upstream_timeout")]
    pub upstream_timeout: Duration,
    #[serde(default = "default_cover_image")]
    pub default_cover: String,
}

/// Tunables of the resilient player controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Automatic retries allowed after an engine error before escalating
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Escalate if nothing started playing this long after the latest load
    #[serde(with = "duration_serde::duration", default = "default_stall_deadline")]
    pub stall_deadline: Duration,
    /// Absolute ceiling measured from `start`, never reset by automatic retries
    #[serde(with = "duration_serde::duration", default = "default_hard_deadline")]
    pub hard_deadline: Duration,
    /// Countdown shown before the fallback opens the source URL
    #[serde(with = "duration_serde::duration", default = "default_escalation_countdown")]
    pub escalation_countdown: Duration,
    /// Query parameter carrying the cache-busting token
    #[serde(default = "default_cache_bust_param")]
    pub cache_bust_param: String,
    /// When set, `/player` redirects to this hosted player instead of rendering its own page
    #[serde(default)]
    pub external_player_url: Option<String>,
    /// Command used by `dramashort watch` to open the source URL on escalation
    #[serde(default = "default_fallback_command")]
    pub fallback_command: String,
    /// Command used by `dramashort watch` to play a URL that probed successfully
    #[serde(default)]
    pub player_command: Option<String>,
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

// Catalog defaults
fn default_melolo_base_url() -> String {
    DEFAULT_MELOLO_BASE_URL.to_string()
}

fn default_dramabox_base_url() -> String {
    DEFAULT_DRAMABOX_BASE_URL.to_string()
}

fn default_netshort_base_url() -> String {
    DEFAULT_NETSHORT_BASE_URL.to_string()
}

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

fn default_proxy_count() -> u32 {
    DEFAULT_PROXY_COUNT
}

fn default_items_per_page() -> u32 {
    DEFAULT_ITEMS_PER_PAGE
}

fn default_upstream_timeout() -> Duration {
    DEFAULT_UPSTREAM_TIMEOUT
}

fn default_cover_image() -> String {
    DEFAULT_COVER_IMAGE.to_string()
}

// Player defaults
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_stall_deadline() -> Duration {
    DEFAULT_STALL_DEADLINE
}

fn default_hard_deadline() -> Duration {
    DEFAULT_HARD_DEADLINE
}

fn default_escalation_countdown() -> Duration {
    DEFAULT_ESCALATION_COUNTDOWN
}

fn default_cache_bust_param() -> String {
    DEFAULT_CACHE_BUST_PARAM.to_string()
}

fn default_fallback_command() -> String {
    DEFAULT_FALLBACK_COMMAND.to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            melolo_base_url: default_melolo_base_url(),
            dramabox_base_url: default_dramabox_base_url(),
            netshort_base_url: default_netshort_base_url(),
            default_lang: default_lang(),
            proxy_count: default_proxy_count(),
            items_per_page: default_items_per_page(),
            upstream_timeout: default_upstream_timeout(),
            default_cover: default_cover_image(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            stall_deadline: default_stall_deadline(),
            hard_deadline: default_hard_deadline(),
            escalation_countdown: default_escalation_countdown(),
            cache_bust_param: default_cache_bust_param(),
            external_player_url: None,
            fallback_command: default_fallback_command(),
            player_command: None,
        }
    }
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stall_deadline.is_zero() || self.hard_deadline.is_zero() {
            bail!("player deadlines must be greater than zero");
        }
        if self.stall_deadline > self.hard_deadline {
            bail!(
                "player.stall_deadline ({}) must not exceed player.hard_deadline ({})",
                humantime::format_duration(self.stall_deadline),
                humantime::format_duration(self.hard_deadline)
            );
        }
        if self.cache_bust_param.trim().is_empty() {
            bail!("player.cache_bust_param must not be empty");
        }
        Ok(())
    }
}

impl Config {
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        let config = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            toml::from_str(&contents)?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            default_config
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.player.validate()
    }
}
