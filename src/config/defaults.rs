//! Configuration default values
//!
//! This module contains all the default values for configuration options,
//! making them easily changeable in one central location.
use std::time::Duration;

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

// Catalog upstream defaults
pub const DEFAULT_MELOLO_BASE_URL: &str = "https://dramabos.asia/api/melolo/api/v1";
pub const DEFAULT_DRAMABOX_BASE_URL: &str = "https://dramabos.asia/api/dramabox/api";
pub const DEFAULT_NETSHORT_BASE_URL: &str = "https://dramabos.asia/api/netshort/api";
pub const DEFAULT_LANG: &str = "id";
pub const DEFAULT_PROXY_COUNT: u32 = 18;
pub const DEFAULT_ITEMS_PER_PAGE: u32 = 12;
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_COVER_IMAGE: &str = "https://www.svgrepo.com/show/475529/cinema.svg";

// Player defaults
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_STALL_DEADLINE: Duration = Duration::from_secs(4);
pub const DEFAULT_HARD_DEADLINE: Duration = Duration::from_secs(8);
pub const DEFAULT_ESCALATION_COUNTDOWN: Duration = Duration::from_secs(3);
pub const DEFAULT_CACHE_BUST_PARAM: &str = "_cb";
pub const DEFAULT_FALLBACK_COMMAND: &str = "xdg-open";
