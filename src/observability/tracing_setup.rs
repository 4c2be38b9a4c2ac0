/// Tracing and structured logging configuration
use std::str::FromStr;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable lines for development
    Human,
    /// One JSON object per event, for log aggregation
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    /// Unknown values fall back to `Human`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("json") {
            Ok(OutputFormat::Json)
        } else {
            Ok(OutputFormat::Human)
        }
    }
}

/// Logging settings resolved from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub format: OutputFormat,
    /// Level for the `estado` target when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Human,
            level: "info".to_string(),
        }
    }
}

impl LogSettings {
    /// Read `LOG_FORMAT` ("json" or "human") and `LOG_LEVEL` (default "info").
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::var("LOG_FORMAT").ok().as_deref(),
            std::env::var("LOG_LEVEL").ok().as_deref(),
        )
    }

    fn from_vars(format: Option<&str>, level: Option<&str>) -> Self {
        let defaults = Self::default();
        Self {
            format: format
                .and_then(|f| OutputFormat::from_str(f).ok())
                .unwrap_or(defaults.format),
            level: level
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.trim().to_string())
                .unwrap_or(defaults.level),
        }
    }

    /// Filter used when `RUST_LOG` is not set
    fn default_directives(&self) -> String {
        format!("estado={},tower=warn,axum=info", self.level)
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `settings.level` when present. Returns an error if
/// a global subscriber is already installed.
///
/// ```no_run
/// use estado::observability::tracing_setup::{init_tracing, LogSettings, OutputFormat};
///
/// init_tracing(&LogSettings { format: OutputFormat::Json, level: "debug".into() }).unwrap();
/// ```
pub fn init_tracing(settings: &LogSettings) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.default_directives()));

    let registry = tracing_subscriber::registry().with(env_filter);
    match settings.format {
        OutputFormat::Human => registry
            .with(fmt::layer().with_target(true).with_ansi(true))
            .try_init()?,
        OutputFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init()?,
    }

    tracing::info!(format = ?settings.format, level = %settings.level, "tracing initialized");
    Ok(())
}

/// Install the global subscriber using [`LogSettings::from_env`].
pub fn init_tracing_from_env() -> Result<(), tracing_subscriber::util::TryInitError> {
    init_tracing(&LogSettings::from_env())
}
