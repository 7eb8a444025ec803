//! Shell configuration loaded from `pmr-stack.toml`
//!
//! Precedence, lowest first: built-in defaults, config file, environment
//! (`PMR_STACK_CAPACITY`, `PMR_STACK_LOG`), command-line flags.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::Level;

use crate::errors::ConfigError;
use crate::logging::{LogConfig, LogFormat, LogOutput};

pub const CONFIG_FILE_NAME: &str = "pmr-stack.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub arena: ArenaConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Arena size in bytes
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Where arena events go
    #[serde(default)]
    pub events: EventSink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSink {
    /// `ALLOC - new:0x...` lines on stdout
    #[default]
    Console,
    /// JSON lines on stdout
    Json,
    /// `tracing` events under `pmr_stack::arena`
    Trace,
    Off,
}

impl FromStr for EventSink {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "console" => Ok(Self::Console),
            "json" => Ok(Self::Json),
            "trace" => Ok(Self::Trace),
            "off" | "none" => Ok(Self::Off),
            other => Err(ConfigError::Invalid(format!("unknown event sink '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormatConfig,

    /// Log directory; stderr when unset
    #[serde(default)]
    pub directory: Option<String>,

    #[serde(default)]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatConfig {
    Pretty,
    #[default]
    Compact,
    Json,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            events: EventSink::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormatConfig::default(),
            directory: None,
            filter: None,
        }
    }
}

fn default_capacity() -> usize { 1024 }
fn default_level() -> String { "warn".to_string() }

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Find `pmr-stack.toml` in the current directory or its parents
    ///
    /// Falls back to defaults when no readable file is found.
    pub fn discover() -> Self {
        let mut current = std::env::current_dir().ok();

        while let Some(dir) = current {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                match Self::load(&config_path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(path = %config_path.display(), error = %e, "ignoring config file");
                    }
                }
            }

            current = dir.parent().map(|p| p.to_path_buf());
        }

        Self::default()
    }

    /// Apply `PMR_STACK_CAPACITY` and `PMR_STACK_LOG`
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(
            std::env::var("PMR_STACK_CAPACITY").ok().as_deref(),
            std::env::var("PMR_STACK_LOG").ok().as_deref(),
        )
    }

    fn apply_overrides(
        &mut self,
        capacity: Option<&str>,
        level: Option<&str>,
    ) -> Result<(), ConfigError> {
        if let Some(capacity) = capacity {
            self.arena.capacity = capacity.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("PMR_STACK_CAPACITY is not a byte count: '{}'", capacity))
            })?;
        }
        if let Some(level) = level {
            self.logging.level = level.trim().to_string();
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.arena.capacity == 0 {
            return Err(ConfigError::Invalid("arena capacity must be non-zero".to_string()));
        }
        self.log_level()?;
        Ok(())
    }

    pub fn log_level(&self) -> Result<Level, ConfigError> {
        Level::from_str(&self.logging.level)
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.logging.level)))
    }

    /// Logging setup described by this config
    pub fn log_config(&self) -> Result<LogConfig, ConfigError> {
        let format = match self.logging.format {
            LogFormatConfig::Pretty => LogFormat::Pretty,
            LogFormatConfig::Compact => LogFormat::Compact,
            LogFormatConfig::Json => LogFormat::Json,
        };
        let output = match &self.logging.directory {
            Some(directory) => LogOutput::File {
                directory: directory.clone(),
                prefix: "pmr-stack".to_string(),
            },
            None => LogOutput::Stderr,
        };

        let mut config = LogConfig::new()
            .with_level(self.log_level()?)
            .with_format(format)
            .with_output(output);
        if self.arena.events == EventSink::Trace {
            config = config.with_filter("pmr_stack::arena=trace");
        }
        if let Some(filter) = &self.logging.filter {
            let merged = match config.filter.take() {
                Some(existing) => format!("{},{}", existing, filter),
                None => filter.clone(),
            };
            config = config.with_filter(merged);
        }
        Ok(config)
    }
}
