//! Configuration management for the floatwin daemon.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. The platform config dir (e.g. `%APPDATA%/floatwin/config/config.toml` on Windows)
//! 2. `~/.config/floatwin/config.toml`
//! 3. `./config.toml` (current directory, for development)

use anyhow::{Context, Result};
use directories::ProjectDirs;
use floatwin_core::{WindowDefaults, MIN_WINDOW_HEIGHT, MIN_WINDOW_WIDTH};
use floatwin_ipc::{BookmarkInfo, DEFAULT_IPC_ADDR};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure for floatwin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Geometry for new windows.
    pub window: WindowConfig,
    /// Behavior configuration.
    pub behavior: BehaviorConfig,
    /// IPC listener configuration.
    pub ipc: IpcConfig,
    /// Named menu entries that open a window.
    #[serde(default)]
    pub bookmarks: Vec<Bookmark>,
}

/// Default geometry and size floor for floating windows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    #[serde(default = "default_width")]
    pub default_width: i32,

    #[serde(default = "default_height")]
    pub default_height: i32,

    #[serde(default = "default_top")]
    pub default_top: i32,

    #[serde(default = "default_left")]
    pub default_left: i32,

    /// Minimum width during resize; never below 300.
    #[serde(default = "default_min_width")]
    pub min_width: i32,

    /// Minimum height during resize; never below 200.
    #[serde(default = "default_min_height")]
    pub min_height: i32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            default_width: default_width(),
            default_height: default_height(),
            default_top: default_top(),
            default_left: default_left(),
            min_width: default_min_width(),
            min_height: default_min_height(),
        }
    }
}

impl From<&WindowConfig> for WindowDefaults {
    fn from(config: &WindowConfig) -> Self {
        WindowDefaults {
            width: config.default_width,
            height: config.default_height,
            top: config.default_top,
            left: config.default_left,
            min_width: config.min_width,
            min_height: config.min_height,
        }
    }
}

/// Behavior-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Delay between marking a window closing and removing it, in milliseconds.
    #[serde(default = "default_close_delay")]
    pub close_delay_ms: u64,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            close_delay_ms: default_close_delay(),
            log_level: default_log_level(),
        }
    }
}

/// IPC listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Loopback address the daemon listens on.
    #[serde(default = "default_ipc_addr")]
    pub addr: String,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            addr: default_ipc_addr(),
        }
    }
}

/// A named menu entry.
///
/// # Example Config
///
/// ```toml
/// [[bookmarks]]
/// name = "zzz-pulls"
/// title = "Tiradas por version"
/// url = "https://docs.google.com/spreadsheets/d/e/.../pubhtml"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    /// Lookup key used by `open_bookmark`.
    pub name: String,
    /// Window title.
    pub title: String,
    /// URL embedded in the window.
    pub url: String,
}

impl From<&Bookmark> for BookmarkInfo {
    fn from(bookmark: &Bookmark) -> Self {
        BookmarkInfo {
            name: bookmark.name.clone(),
            title: bookmark.title.clone(),
            url: bookmark.url.clone(),
        }
    }
}

// Default value functions for serde
fn default_width() -> i32 {
    900
}

fn default_height() -> i32 {
    600
}

fn default_top() -> i32 {
    100
}

fn default_left() -> i32 {
    100
}

fn default_min_width() -> i32 {
    MIN_WINDOW_WIDTH
}

fn default_min_height() -> i32 {
    MIN_WINDOW_HEIGHT
}

fn default_close_delay() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ipc_addr() -> String {
    DEFAULT_IPC_ADDR.to_string()
}

const MAX_CLOSE_DELAY_MS: u64 = 10_000;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A problem found (and corrected) by [`Config::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Clamp out-of-range values and drop unusable bookmarks.
    ///
    /// Returns one warning per correction.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.window.min_width < MIN_WINDOW_WIDTH {
            warnings.push(ConfigWarning::new(
                "window.min_width",
                format!("{} is below {}, clamped", self.window.min_width, MIN_WINDOW_WIDTH),
            ));
            self.window.min_width = MIN_WINDOW_WIDTH;
        }
        if self.window.min_height < MIN_WINDOW_HEIGHT {
            warnings.push(ConfigWarning::new(
                "window.min_height",
                format!("{} is below {}, clamped", self.window.min_height, MIN_WINDOW_HEIGHT),
            ));
            self.window.min_height = MIN_WINDOW_HEIGHT;
        }
        if self.window.default_width < self.window.min_width {
            warnings.push(ConfigWarning::new(
                "window.default_width",
                format!("{} is below min_width, clamped", self.window.default_width),
            ));
            self.window.default_width = self.window.min_width;
        }
        if self.window.default_height < self.window.min_height {
            warnings.push(ConfigWarning::new(
                "window.default_height",
                format!("{} is below min_height, clamped", self.window.default_height),
            ));
            self.window.default_height = self.window.min_height;
        }

        if self.behavior.close_delay_ms > MAX_CLOSE_DELAY_MS {
            warnings.push(ConfigWarning::new(
                "behavior.close_delay_ms",
                format!("{} exceeds {}, clamped", self.behavior.close_delay_ms, MAX_CLOSE_DELAY_MS),
            ));
            self.behavior.close_delay_ms = MAX_CLOSE_DELAY_MS;
        }

        if !LOG_LEVELS.contains(&self.behavior.log_level.to_lowercase().as_str()) {
            warnings.push(ConfigWarning::new(
                "behavior.log_level",
                format!("unknown level '{}', using info", self.behavior.log_level),
            ));
            self.behavior.log_level = default_log_level();
        }

        if self.ipc.addr.parse::<SocketAddr>().is_err() {
            warnings.push(ConfigWarning::new(
                "ipc.addr",
                format!("'{}' is not a socket address, using {}", self.ipc.addr, DEFAULT_IPC_ADDR),
            ));
            self.ipc.addr = default_ipc_addr();
        }

        let mut seen = Vec::new();
        self.bookmarks.retain(|bookmark| {
            if !is_embeddable_url(&bookmark.url) {
                warnings.push(ConfigWarning::new(
                    format!("bookmarks.{}", bookmark.name),
                    format!("url '{}' is not http(s), dropped", bookmark.url),
                ));
                return false;
            }
            // Names match case-insensitively.
            let key = bookmark.name.to_ascii_lowercase();
            if seen.contains(&key) {
                warnings.push(ConfigWarning::new(
                    format!("bookmarks.{}", bookmark.name),
                    "duplicate name, dropped",
                ));
                return false;
            }
            seen.push(key);
            true
        });

        warnings
    }

    /// Geometry for new windows.
    pub fn window_defaults(&self) -> WindowDefaults {
        WindowDefaults::from(&self.window)
    }

    /// Find a bookmark by name (case-insensitive).
    pub fn bookmark(&self, name: &str) -> Option<&Bookmark> {
        self.bookmarks
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name))
    }
}

/// URLs a window may embed: absolute http(s) with a host.
const EMBEDDABLE_URL_PATTERN: &str = r"(?i)^https?://[^\s/]+";

fn is_embeddable_url(url: &str) -> bool {
    match Regex::new(EMBEDDABLE_URL_PATTERN) {
        Ok(re) => re.is_match(url),
        Err(e) => {
            tracing::warn!("Invalid embeddable URL pattern: {}", e);
            false
        }
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(proj_dirs) = ProjectDirs::from("com", "floatwin", "floatwin") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    if let Some(home) = dirs_home() {
        paths.push(home.join(".config").join("floatwin").join("config.toml"));
    }

    paths.push(PathBuf::from("config.toml"));

    paths
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.default_width, 900);
        assert_eq!(config.window.default_height, 600);
        assert_eq!(config.window.default_top, 100);
        assert_eq!(config.window.default_left, 100);
        assert_eq!(config.window.min_width, 300);
        assert_eq!(config.window.min_height, 200);
        assert_eq!(config.behavior.close_delay_ms, 300);
        assert_eq!(config.ipc.addr, DEFAULT_IPC_ADDR);
        assert!(config.bookmarks.is_empty());
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.window.default_width, config.window.default_width);
        assert_eq!(parsed.behavior.close_delay_ms, config.behavior.close_delay_ms);
    }

    #[test]
    fn test_config_partial_parse() {
        let toml_str = r#"
            [window]
            default_width = 1200
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.window.default_width, 1200);
        assert_eq!(config.window.default_height, 600); // default
        assert_eq!(config.behavior.close_delay_ms, 300); // default
    }

    #[test]
    fn test_window_defaults_conversion() {
        let config = Config::default();
        let defaults = config.window_defaults();
        assert_eq!(defaults, WindowDefaults::default());
    }

    #[test]
    fn test_bookmarks_parse() {
        let toml_str = r#"
            [[bookmarks]]
            name = "warps"
            title = "Tiradas por version"
            url = "https://docs.google.com/spreadsheets/d/e/abc/pubhtml"

            [[bookmarks]]
            name = "showcase"
            title = "Showcase"
            url = "https://enka.network/zzz/1500713525/"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bookmarks.len(), 2);
        assert_eq!(config.bookmark("WARPS").map(|b| b.title.as_str()), Some("Tiradas por version"));
        assert!(config.bookmark("missing").is_none());
    }

    #[test]
    fn test_validate_clean_config_has_no_warnings() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_clamps_size_floor() {
        let toml_str = r#"
            [window]
            min_width = 100
            min_height = 50
            default_width = 250
        "#;
        let mut config: Config = toml::from_str(toml_str).unwrap();
        let warnings = config.validate();

        assert_eq!(config.window.min_width, 300);
        assert_eq!(config.window.min_height, 200);
        assert_eq!(config.window.default_width, 300);
        assert!(warnings.iter().any(|w| w.field == "window.min_width"));
        assert!(warnings.iter().any(|w| w.field == "window.default_width"));
    }

    #[test]
    fn test_validate_drops_bad_bookmarks() {
        let toml_str = r#"
            [[bookmarks]]
            name = "ok"
            title = "OK"
            url = "https://sheet.example"

            [[bookmarks]]
            name = "script"
            title = "Script"
            url = "javascript:alert(1)"

            [[bookmarks]]
            name = "ok"
            title = "Duplicate"
            url = "http://other.example"

            [[bookmarks]]
            name = "OK"
            title = "Shadowed"
            url = "https://shadowed.example"
        "#;
        let mut config: Config = toml::from_str(toml_str).unwrap();
        let warnings = config.validate();

        assert_eq!(config.bookmarks.len(), 1);
        assert_eq!(config.bookmarks[0].title, "OK");
        assert_eq!(warnings.len(), 3);
        assert_eq!(warnings[2].field, "bookmarks.OK");
        assert_eq!(config.bookmark("OK").map(|b| b.title.as_str()), Some("OK"));
    }

    #[test]
    fn test_validate_fixes_behavior_and_ipc() {
        let toml_str = r#"
            [behavior]
            close_delay_ms = 999999
            log_level = "chatty"

            [ipc]
            addr = "not an address"
        "#;
        let mut config: Config = toml::from_str(toml_str).unwrap();
        let warnings = config.validate();

        assert_eq!(config.behavior.close_delay_ms, MAX_CLOSE_DELAY_MS);
        assert_eq!(config.behavior.log_level, "info");
        assert_eq!(config.ipc.addr, DEFAULT_IPC_ADDR);
        assert_eq!(warnings.len(), 3);
    }

    #[test]
    fn test_config_paths_not_empty() {
        let paths = config_paths();
        assert!(!paths.is_empty());
        assert_eq!(paths.last(), Some(&PathBuf::from("config.toml")));
    }

    #[test]
    fn test_load_from_missing_path_fails() {
        let result = Config::load_from_path(Path::new("/nonexistent/floatwin/config.toml"));
        assert!(result.is_err());
    }
}
