//! Tracing setup shared by the sitewatch binaries.
//!
//! The filter comes from `RUST_LOG` (default `info`). Setting
//! `LOG_FORMAT=json` switches to one JSON object per line.

use std::env;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of the global subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Read the format from `LOG_FORMAT`, falling back to pretty output
    pub fn from_env() -> Self {
        match env::var("LOG_FORMAT") {
            Ok(value) => Self::parse(&value),
            Err(_) => Self::default(),
        }
    }

    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") { Self::Json } else { Self::Pretty }
    }
}

/// Install the global tracing subscriber using the environment's settings
pub fn init_tracing() {
    init_tracing_with(LogFormat::from_env());
}

/// Install the global tracing subscriber with an explicit format.
///
/// Calling this more than once is harmless; later calls leave the first
/// subscriber in place.
pub fn init_tracing_with(format: LogFormat) {
    let env_filter =
        EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy();

    let log_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_filter(env_filter)
            .boxed(),
    };

    if tracing_subscriber::registry().with(log_layer).try_init().is_ok() {
        tracing::debug!(?format, "Tracing initialized");
    }
}
