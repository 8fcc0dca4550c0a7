//! Configuration for the registry service.
//!
//! Layered the usual way:
//! - Default values
//! - TOML configuration file (`.netreg/settings.toml`)
//! - Environment variable overrides
//! - CLI argument overrides (applied by the caller)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `NETREG_` and use double
//! underscores to separate nested levels:
//! - `NETREG_CONFIG_FILE=/tmp/dhcpd.conf` sets `config_file`
//! - `NETREG_RESTART__MIN_INTERVAL_SECS=30` sets `restart.min_interval_secs`
//! - `NETREG_WATCH__ENABLED=false` sets `watch.enabled`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::registry::RegistryOptions;

/// Directory holding the settings file.
pub const SETTINGS_DIR: &str = ".netreg";
/// Settings file name inside [`SETTINGS_DIR`].
pub const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// dhcpd config file holding the host list
    #[serde(default = "default_config_file")]
    pub config_file: PathBuf,

    /// Service restart settings
    #[serde(default)]
    pub restart: RestartConfig,

    /// Config file watching
    #[serde(default)]
    pub watch: WatchConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RestartConfig {
    /// Command and arguments that restart the DHCP service
    #[serde(default = "default_restart_command")]
    pub command: Vec<String>,

    /// Minimum seconds between two restarts
    #[serde(default = "default_min_interval_secs")]
    pub min_interval_secs: u64,

    /// Capacity of the restart request queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Request a restart even when writing the config file failed
    #[serde(default = "default_true")]
    pub on_failed_save: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Reload when the config file is edited externally
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Delay before reloading after the file was removed or replaced
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// How long writes are ignored after the registry saved
    #[serde(default = "default_suppress_ms")]
    pub suppress_ms: u64,

    /// Capacity of the file event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `netreg::watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_config_file() -> PathBuf {
    PathBuf::from("/etc/dhcp/dhcpd.conf")
}
fn default_restart_command() -> Vec<String> {
    vec![
        "service".to_string(),
        "dhcpd".to_string(),
        "restart".to_string(),
    ]
}
fn default_min_interval_secs() -> u64 {
    60
}
fn default_queue_capacity() -> usize {
    256
}
fn default_true() -> bool {
    true
}
fn default_settle_ms() -> u64 {
    1000
}
fn default_suppress_ms() -> u64 {
    1000
}
fn default_event_buffer() -> usize {
    100
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            config_file: default_config_file(),
            restart: RestartConfig::default(),
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            command: default_restart_command(),
            min_interval_secs: default_min_interval_secs(),
            queue_capacity: default_queue_capacity(),
            on_failed_save: true,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settle_ms: default_settle_ms(),
            suppress_ms: default_suppress_ms(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl RestartConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }
}

impl WatchConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(SETTINGS_DIR).join(SETTINGS_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file, still honoring `NETREG_` variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels, single underscore stays
            .merge(Env::prefixed("NETREG_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by looking for a `.netreg` directory
    /// from the current directory up to the root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let config_dir = ancestor.join(SETTINGS_DIR);
            if config_dir.is_dir() {
                return Some(config_dir.join(SETTINGS_FILE));
            }
        }

        None
    }

    /// Options for the registry derived from these settings
    pub fn registry_options(&self) -> RegistryOptions {
        RegistryOptions {
            suppress_window: Duration::from_millis(self.watch.suppress_ms),
            restart_on_failed_save: self.restart.on_failed_save,
        }
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        Self::init_config_file_in(Path::new(""), force)
    }

    /// Create a default settings file under `root`
    pub fn init_config_file_in(
        root: &Path,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.join(SETTINGS_DIR).join(SETTINGS_FILE);

        if !force && config_path.exists() {
            return Err(format!(
                "Configuration file already exists at: {}. Use --force to overwrite",
                config_path.display()
            )
            .into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
