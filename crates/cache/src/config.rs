//! Cache configuration.
//!
//! Window shape, slot cap and load pacing for the windowed asset cache.
//! Configuration can be loaded from a TOML file, from environment variables,
//! or built programmatically.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thumbgrid_scheduler::WindowConfig;

/// Configuration for the windowed asset cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of Resident + Pending slots
    pub capacity: usize,
    /// Maximum number of loads issued per tick
    pub load_budget: usize,
    /// Frames between two ticks; read by the frame loop, not the cache
    pub ticks_per_load: u32,
    /// Window shape
    pub window: WindowConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 32,
            load_budget: 1,
            ticks_per_load: 1,
            window: WindowConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Creates a configuration with the given window and a capacity that
    /// fits exactly the widest window.
    pub fn for_window(window: WindowConfig) -> Self {
        Self {
            capacity: window.max_width(),
            window,
            ..Self::default()
        }
    }

    /// Sets the slot cap.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the number of loads issued per tick.
    pub fn with_load_budget(mut self, load_budget: usize) -> Self {
        self.load_budget = load_budget;
        self
    }

    /// Sets the number of frames between ticks.
    pub fn with_ticks_per_load(mut self, ticks_per_load: u32) -> Self {
        self.ticks_per_load = ticks_per_load;
        self
    }

    /// Sets the window shape.
    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    /// Returns the default configuration file for the current platform.
    ///
    /// - macOS: ~/Library/Application Support/thumbgrid/config.toml
    /// - Linux: ~/.config/thumbgrid/config.toml
    /// - Windows: %APPDATA%\thumbgrid\config.toml
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("thumbgrid").join("config.toml")
        } else {
            PathBuf::from("thumbgrid.toml")
        }
    }

    /// Checks that the configuration can be used.
    ///
    /// The capacity must hold the widest window the tracker can produce, so
    /// that evicting everything outside the window always leaves room for
    /// the window itself.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.columns == 0 {
            return Err(ConfigError::Invalid("columns must be at least 1".to_string()));
        }
        let bias = self.window.forward_bias;
        if !bias.is_finite() || !(0.0..=1.0).contains(&bias) {
            return Err(ConfigError::Invalid(format!(
                "forward_bias must be between 0 and 1, got {bias}"
            )));
        }
        if self.load_budget == 0 {
            return Err(ConfigError::Invalid("load_budget must be at least 1".to_string()));
        }
        if self.ticks_per_load == 0 {
            return Err(ConfigError::Invalid("ticks_per_load must be at least 1".to_string()));
        }
        if self.capacity < self.window.max_width() {
            return Err(ConfigError::Invalid(format!(
                "capacity {} cannot hold a window of radius {} ({} slots)",
                self.capacity,
                self.window.radius,
                self.window.max_width()
            )));
        }
        Ok(())
    }

    /// Loads configuration from environment variables.
    ///
    /// Environment variables:
    /// - `THUMBGRID_RADIUS`: window radius (default: 10)
    /// - `THUMBGRID_FORWARD_BIAS`: forward bias, 0.0 to 1.0 (default: 0.6)
    /// - `THUMBGRID_COLUMNS`: grid columns (default: 4)
    /// - `THUMBGRID_CAPACITY`: slot cap (default: 32)
    /// - `THUMBGRID_LOAD_BUDGET`: loads per tick (default: 1)
    /// - `THUMBGRID_TICKS_PER_LOAD`: frames per tick (default: 1)
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env()
    }

    /// Overrides fields with any `THUMBGRID_*` environment variables that
    /// are set, leaving the others untouched.
    ///
    /// # Errors
    /// Returns an error if any environment variable contains an invalid value.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Some(radius) = env_value("THUMBGRID_RADIUS")? {
            self.window.radius = radius;
        }
        if let Some(bias) = env_value("THUMBGRID_FORWARD_BIAS")? {
            self.window.forward_bias = bias;
        }
        if let Some(columns) = env_value("THUMBGRID_COLUMNS")? {
            self.window.columns = columns;
        }
        if let Some(capacity) = env_value("THUMBGRID_CAPACITY")? {
            self.capacity = capacity;
        }
        if let Some(load_budget) = env_value("THUMBGRID_LOAD_BUDGET")? {
            self.load_budget = load_budget;
        }
        if let Some(ticks_per_load) = env_value("THUMBGRID_TICKS_PER_LOAD")? {
            self.ticks_per_load = ticks_per_load;
        }

        Ok(self)
    }

    /// Loads configuration from a TOML file.
    ///
    /// Expected file format (every key optional):
    /// ```toml
    /// capacity = 32
    /// load_budget = 1
    /// ticks_per_load = 1
    ///
    /// [window]
    /// radius = 10
    /// forward_bias = 0.6
    /// columns = 4
    /// ```
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Saves configuration to a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path.as_ref(), self.to_toml_string()?)?;
        Ok(())
    }

    /// Converts configuration to TOML format.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Reads and parses one environment variable, if set.
fn env_value<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

/// Errors that can occur during configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid value for a configuration parameter
    #[error("invalid value {value:?} for configuration key {key}")]
    InvalidValue { key: String, value: String },
    /// Values parse but cannot work together
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// I/O error reading or writing configuration file
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Malformed TOML
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// Configuration could not be rendered as TOML
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}
