//! Logging setup. Log lines go to stderr so the tables printed on stdout can be
//! piped on their own.

use std::io;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

const CRATE_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Per-target filter for this crate: debug when verbose, silent otherwise.
fn crate_filter(verbose: bool) -> Targets {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::OFF
    };
    Targets::new().with_target(CRATE_TARGET, level)
}

/// Installs the global subscriber. `RUST_LOG` overrides the default directive,
/// which follows `verbose`.
pub fn init_logging(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "off" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbose)
                .without_time(),
        )
        .with(crate_filter(verbose))
        .with(env_filter)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_crate_filter_levels() {
        let verbose = crate_filter(true);
        assert!(verbose.would_enable("hpx::core::cleaning", &Level::DEBUG));
        assert!(!verbose.would_enable("hpx::core::cleaning", &Level::TRACE));
        assert!(!verbose.would_enable("reqwest", &Level::DEBUG));

        let quiet = crate_filter(false);
        assert!(!quiet.would_enable("hpx::providers::tgju", &Level::ERROR));
    }
}
