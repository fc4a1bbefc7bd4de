//! Tracing setup for ragchat services.
//!
//! [`init_telemetry`] installs the process-wide subscriber: an `EnvFilter`
//! honouring `RUST_LOG` (falling back to the configured level) and either a
//! compact text or a JSON formatter. [`EventCapture`] is an in-memory layer
//! used by tests to assert on emitted events.
//!
//! ```rust,ignore
//! use ragchat_telemetry::{LogFormat, TelemetryConfig, init_telemetry};
//!
//! init_telemetry(TelemetryConfig::new("ragchat-indexer").with_format(LogFormat::Json))?;
//! ```

mod capture;

pub use capture::{CapturedEvent, EventCapture};

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Errors raised while installing the subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter '{directive}': {message}")]
    InvalidFilter { directive: String, message: String },

    /// A global subscriber is already installed.
    #[error("tracing subscriber already initialised: {0}")]
    AlreadyInitialized(String),

    /// Unknown [`LogFormat`] name.
    #[error("unknown log format '{0}', expected 'compact' or 'json'")]
    UnknownFormat(String),
}

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human readable output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::UnknownFormat(other.to_string())),
        }
    }
}

/// Subscriber configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Name recorded on startup.
    pub service_name: String,
    /// Filter used when `RUST_LOG` is unset.
    pub default_level: String,
    pub format: LogFormat,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            default_level: "info".into(),
            format: LogFormat::Compact,
        }
    }

    pub fn with_default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// The filter: `RUST_LOG` if set and valid, else `default_level`.
    pub fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.default_level).map_err(|e| TelemetryError::InvalidFilter {
            directive: self.default_level.clone(),
            message: e.to_string(),
        })
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::new("ragchat")
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadyInitialized`] when a global subscriber
/// exists; callers that may initialise twice can ignore it.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Compact => registry.with(fmt::layer().with_target(false).compact()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json().with_current_span(false)).try_init(),
    };
    result.map_err(|e| TelemetryError::AlreadyInitialized(e.to_string()))?;

    tracing::info!(
        service = %config.service_name,
        format = ?config.format,
        "telemetry initialised"
    );
    Ok(())
}
