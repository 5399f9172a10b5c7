//! Tracing subscriber setup.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingSection;

/// Environment variable that overrides `logging.level`.
pub const LOG_ENV: &str = "COURSE_FORGE_LOG";

/// Build the filter: `COURSE_FORGE_LOG` if set and valid, otherwise the
/// configured level.
pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingSection) -> Result<()> {
    let filter = env_filter(&config.level);

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).compact())
            .try_init()
    }
    .map_err(|e| anyhow!("Failed to initialize logging: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_falls_back_to_info() {
        // An unparseable directive must not panic.
        let filter = env_filter("not a level [");
        assert!(!filter.to_string().is_empty());
    }

    #[test]
    fn test_second_init_is_an_error() {
        let config = LoggingSection::default();
        let first = init_logging(&config);
        let second = init_logging(&config);
        // Another test may have installed a subscriber first.
        assert!(first.is_err() || second.is_err());
        assert!(second.is_err());
    }
}
