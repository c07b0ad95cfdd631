//! Tracing subscriber setup

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over the configured level;
/// `verbose` forces debug output for this crate.
pub fn init_tracing(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(default_directives(&config.level, verbose)),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = if config.format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
    };

    result.map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

fn default_directives(level: &str, verbose: bool) -> String {
    let level = if verbose { "debug" } else { level };
    format!("panchangam={level},panchangam_bot={level},warn")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_level() {
        assert_eq!(
            default_directives("info", true),
            "panchangam=debug,panchangam_bot=debug,warn"
        );
        assert_eq!(
            default_directives("error", false),
            "panchangam=error,panchangam_bot=error,warn"
        );
    }
}
