//! Logging setup built on `tracing`
//!
//! Library code only emits events; binaries pick a format and destination
//! through [`LogConfig`] and keep the returned guard alive until exit.

use once_cell::sync::OnceCell;
use tracing::Level;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

static LOGGER_INITIALIZED: OnceCell<()> = OnceCell::new();

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, multi-line
    Pretty,
    /// One line per event
    Compact,
    /// Newline-delimited JSON
    Json,
}

/// Log output destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    /// Daily rotated files `directory/prefix.YYYY-MM-DD`
    File { directory: String, prefix: String },
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
    pub output: LogOutput,
    pub span_events: bool,
    /// Extra filter directives (e.g., "pmr_stack::arena=trace")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            span_events: false,
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Install the global subscriber
///
/// Only the first call installs anything; later calls return `None`.
/// Keep the returned guard alive so buffered lines are flushed.
pub fn init_logging(config: LogConfig) -> Option<WorkerGuard> {
    if LOGGER_INITIALIZED.set(()).is_err() {
        return None;
    }

    let (writer, guard) = match &config.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::Stderr => tracing_appender::non_blocking(std::io::stderr()),
        LogOutput::File { directory, prefix } => {
            tracing_appender::non_blocking(rolling::daily(directory, prefix))
        }
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_span_events(span_events_config(config.span_events));
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(build_filter(&config)))
        .try_init()
        .ok()?;
    Some(guard)
}

/// Whether [`init_logging`] has run
pub fn is_initialized() -> bool {
    LOGGER_INITIALIZED.get().is_some()
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let base_filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    match &config.filter {
        Some(filter_str) => filter_str
            .split(',')
            .map(str::trim)
            .filter(|directive| !directive.is_empty())
            .fold(base_filter, |filter, directive| match directive.parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(_) => {
                    tracing::warn!("Invalid filter directive: {}", directive);
                    filter
                }
            }),
        None => base_filter,
    }
}

fn span_events_config(enabled: bool) -> FmtSpan {
    if enabled {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder() {
        let config = LogConfig::new()
            .with_level(Level::DEBUG)
            .with_format(LogFormat::Json)
            .with_span_events(true)
            .with_filter("pmr_stack=trace");

        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.span_events);
        assert_eq!(config.filter, Some("pmr_stack=trace".to_string()));
        assert_eq!(config.output, LogOutput::Stderr);
    }

    #[test]
    fn init_installs_once() {
        let first = init_logging(LogConfig::new().with_output(LogOutput::Stderr));
        assert!(is_initialized());
        assert!(first.is_some());

        assert!(init_logging(LogConfig::new()).is_none());
    }

    #[test]
    fn bad_directives_are_skipped() {
        let config = LogConfig::new().with_filter("pmr_stack=trace,,=[bad");
        // Must not panic
        let _ = build_filter(&config);
    }
}
