// File: vxs-server/src/config.rs
// Purpose: Configuration parsing from vxs.toml with environment overrides

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use vxs_loader::PreloadOptions;
use vxs_navigation::StoreOptions;
use vxs_router::{RenderMode, TreeOptions};

pub const CONFIG_FILE: &str = "vxs.toml";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub dev: DevConfig,

    #[serde(default)]
    pub preload: PreloadOptions,

    #[serde(default)]
    pub navigation: NavigationConfig,

    #[serde(default)]
    pub build: BuildConfig,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_version")]
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Directory containing route files (default: "app")
    #[serde(default = "default_routes_dir")]
    pub routes_dir: String,

    /// Base path the app is served under (e.g., "/app")
    #[serde(default)]
    pub base_url: Option<String>,

    /// Render mode for pages without a `+ssr|+ssg|+spa` suffix
    #[serde(default = "default_render_mode")]
    pub default_render_mode: RenderMode,

    /// Path prefixes the dispatcher leaves to the hosting server
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
}

/// Development configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    /// Development mode: diagnostic error pages, route watching
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub hot_reload: bool,

    #[serde(default = "default_watch_paths")]
    pub watch_paths: Vec<String>,

    /// Navigations slower than this are logged
    #[serde(default = "default_slow_navigation_ms")]
    pub slow_navigation_ms: u64,
}

/// Client router timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

/// Build configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Build-info file name inside `out_dir`
    #[serde(default = "default_build_info")]
    pub build_info: String,

    /// Client entry script loaded by every page
    #[serde(default = "default_client_entry")]
    pub client_entry: String,
}

// Default values
fn default_name() -> String {
    "vxs-app".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_routes_dir() -> String {
    "app".to_string()
}

fn default_render_mode() -> RenderMode {
    RenderMode::Ssr
}

fn default_ignore() -> Vec<String> {
    vec!["/assets/".to_string(), "/favicon.ico".to_string()]
}

fn default_watch_paths() -> Vec<String> {
    vec!["app".to_string()]
}

fn default_slow_navigation_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    16
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_out_dir() -> String {
    "dist".to_string()
}

fn default_build_info() -> String {
    "buildInfo.json".to_string()
}

fn default_client_entry() -> String {
    "/assets/client.js".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            routes_dir: default_routes_dir(),
            base_url: None,
            default_render_mode: default_render_mode(),
            ignore: default_ignore(),
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hot_reload: true,
            watch_paths: default_watch_paths(),
            slow_navigation_ms: default_slow_navigation_ms(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            build_info: default_build_info(),
            client_entry: default_client_entry(),
        }
    }
}

impl Config {
    /// Load configuration from a vxs.toml file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load ./vxs.toml, then `.env` and `VXS_*` overrides
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = ?path, "Loaded .env");
        }
        let mut config = Self::load(CONFIG_FILE)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `VXS_HOST`, `VXS_PORT`, `VXS_MODE` and `VXS_HOT_RELOAD`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(host) = lookup("VXS_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("VXS_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid VXS_PORT"),
            }
        }
        if let Some(mode) = lookup("VXS_MODE") {
            match mode.to_ascii_lowercase().as_str() {
                "development" | "dev" => self.dev.enabled = true,
                "production" | "prod" => self.dev.enabled = false,
                _ => warn!(value = %mode, "Ignoring unknown VXS_MODE"),
            }
        }
        if let Some(hot_reload) = lookup("VXS_HOT_RELOAD") {
            match hot_reload.parse() {
                Ok(enabled) => self.dev.hot_reload = enabled,
                Err(_) => warn!(value = %hot_reload, "Ignoring invalid VXS_HOT_RELOAD"),
            }
        }
    }

    pub fn is_dev(&self) -> bool {
        self.dev.enabled
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            default_render_mode: self.routing.default_render_mode,
            ..Default::default()
        }
    }

    /// Router store options for the client bundle.
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            base_url: self.routing.base_url.clone(),
            poll_interval: Duration::from_millis(self.navigation.poll_interval_ms),
            timeout: Duration::from_millis(self.navigation.timeout_ms),
            slow_navigation: self
                .dev
                .enabled
                .then(|| Duration::from_millis(self.dev.slow_navigation_ms)),
            ..Default::default()
        }
    }

    pub fn build_info_path(&self) -> std::path::PathBuf {
        Path::new(&self.build.out_dir).join(&self.build.build_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use vxs_loader::PreloadStrategy;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.routing.routes_dir, "app");
        assert_eq!(config.routing.default_render_mode, RenderMode::Ssr);
        assert_eq!(config.preload.strategy, PreloadStrategy::Intent);
        assert!(config.is_dev());
    }

    #[test]
    fn test_empty_config() {
        let config = toml::from_str::<Config>("").unwrap_or_default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.build.build_info, "buildInfo.json");
        assert_eq!(config.navigation.poll_interval_ms, 16);
    }

    #[test]
    fn test_sections() {
        let toml = r#"
            [routing]
            routes_dir = "routes"
            default_render_mode = "spa"
            base_url = "/docs"

            [preload]
            strategy = "viewport"
            history_limit = 10

            [navigation]
            timeout_ms = 250
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.routing.routes_dir, "routes");
        assert_eq!(config.routing.default_render_mode, RenderMode::Spa);
        assert_eq!(config.preload.strategy, PreloadStrategy::Viewport);
        assert_eq!(config.preload.history_limit, 10);
        assert_eq!(config.preload.cache_capacity, 50);

        let store = config.store_options();
        assert_eq!(store.base_url.as_deref(), Some("/docs"));
        assert_eq!(store.timeout, Duration::from_millis(250));
        assert_eq!(store.slow_navigation, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("VXS_HOST", "0.0.0.0"),
            ("VXS_PORT", "8080"),
            ("VXS_MODE", "production"),
            ("VXS_HOT_RELOAD", "nope"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.addr(), "0.0.0.0:8080");
        assert!(!config.is_dev());
        // invalid value keeps the file setting
        assert!(config.dev.hot_reload);
        assert_eq!(config.store_options().slow_navigation, None);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load("does/not/exist/vxs.toml").unwrap();
        assert_eq!(config.project.name, "vxs-app");
    }
}
