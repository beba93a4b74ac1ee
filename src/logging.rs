//! Structured logging setup

use tracing_subscriber::EnvFilter;

/// Filter used when neither an explicit filter nor `RUST_LOG` is set
pub const DEFAULT_FILTER: &str = "info,outpost=debug";

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,
    /// Single-line output
    #[default]
    Compact,
}

/// Configuration for logging behavior
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Whether to include the target module
    pub include_target: bool,
    /// Whether to include file and line numbers
    pub include_location: bool,
    /// Explicit filter (e.g. `"warn,outpost=debug"`); `RUST_LOG` otherwise
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            include_target: true,
            include_location: cfg!(debug_assertions),
            filter: None,
        }
    }
}

impl LogConfig {
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        Ok(match &self.filter {
            Some(filter) => EnvFilter::try_new(filter)?,
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        })
    }
}

/// Install the global subscriber
///
/// Fails if the filter is invalid or a subscriber is already installed.
pub fn init_logging(config: LogConfig) -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter()?)
        .with_target(config.include_target)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    match config.format {
        LogFormat::Pretty => subscriber
            .pretty()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize pretty logger: {}", e))?,
        LogFormat::Compact => subscriber
            .compact()
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize compact logger: {}", e))?,
    }

    tracing::info!(format = ?config.format, "Logging initialized");
    Ok(())
}
