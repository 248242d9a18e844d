use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-request timeout used when no config file overrides it.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: f64 = 15.0;
/// Maximum in-memory fetches allowed to transfer at once.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 10;
/// Minimum gap between two save admissions.
pub const DEFAULT_SAVE_INTERVAL_MS: u64 = 50;

/// Transfer settings, loaded from `~/.config/fetchgate/config.toml` or built from defaults.
///
/// Every value is fixed once a [`crate::Fetcher`] is built from it; there is no
/// per-request override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Whole-request timeout in seconds (connect + headers + body).
    pub request_timeout_secs: f64,
    /// Optional connect-phase timeout in seconds (None = bounded only by the request timeout).
    #[serde(default)]
    pub connect_timeout_secs: Option<f64>,
    /// Capacity of the in-memory fetch limiter. Zero is treated as one.
    pub max_concurrent_fetches: usize,
    /// Minimum gap in milliseconds between successive save admissions.
    pub save_interval_ms: u64,
    /// Optional `User-Agent` header sent with every request.
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Follow HTTP redirects (handled by libcurl, capped at 10 hops).
    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
}

fn default_follow_redirects() -> bool {
    true
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: None,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            save_interval_ms: DEFAULT_SAVE_INTERVAL_MS,
            user_agent: None,
            follow_redirects: true,
        }
    }
}

impl FetchConfig {
    /// Request timeout as a `Duration`. Negative, zero or non-finite values fall back to the default.
    pub fn request_timeout(&self) -> Duration {
        secs_to_duration(self.request_timeout_secs)
            .unwrap_or_else(|| Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Connect timeout, if one is configured and valid.
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.and_then(secs_to_duration)
    }

    /// Limiter capacity, never below one.
    pub fn fetch_capacity(&self) -> usize {
        self.max_concurrent_fetches.max(1)
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_millis(self.save_interval_ms)
    }
}

fn secs_to_duration(secs: f64) -> Option<Duration> {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fetchgate")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FetchConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FetchConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from(&path)
}

/// Load configuration from an explicit TOML file.
pub fn load_from(path: &Path) -> Result<FetchConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let cfg: FetchConfig = toml::from_str(&data)
        .with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(cfg)
}
