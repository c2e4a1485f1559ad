//! Process-wide tracing setup for the admission service.

use crate::config::{LogFormat, TelemetryConfig};
use tracing_subscriber::filter::{Directive, ParseError};
use tracing_subscriber::EnvFilter;

/// HTTP plumbing that is only interesting when something is wrong.
const QUIET_TARGETS: [&str; 3] = ["hyper=warn", "reqwest=warn", "h2=warn"];

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("ADMISSION_LOG_LEVEL '{value}' is not a valid tracing filter")]
    Filter {
        value: String,
        #[source]
        source: ParseError,
    },
    #[error("tracing subscriber already installed: {0}")]
    Subscriber(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// `RUST_LOG` wins when set. Otherwise the configured level applies and the
/// HTTP client and server crates are held at `warn` unless the level names
/// them itself.
pub fn env_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let invalid = |source: ParseError| TelemetryError::Filter {
        value: config.log_level.clone(),
        source,
    };
    let mut filter = EnvFilter::try_new(&config.log_level).map_err(invalid)?;
    for quiet in QUIET_TARGETS {
        let target = quiet.split('=').next().unwrap_or(quiet);
        if config.log_level.contains(target) {
            continue;
        }
        let directive: Directive = quiet.parse().map_err(invalid)?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);

    match config.log_format {
        LogFormat::Compact => builder.with_target(false).compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    }
    .map_err(TelemetryError::Subscriber)
}
