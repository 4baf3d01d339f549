//! Diagnostic output
//!
//! Warnings about misuse of the registration API go to stderr through a
//! `tracing` subscriber. A subscriber installed earlier by the application
//! is left in place.

use tracing_subscriber::EnvFilter;

use crate::config::ProfConfig;

/// Filter from `config.log_var`, falling back to `config.default_log_level`.
/// `debug` forces trace level.
pub fn filter(config: &ProfConfig, debug: bool) -> EnvFilter {
    if debug {
        return EnvFilter::new("trace");
    }
    EnvFilter::try_from_env(&config.log_var)
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level))
}

/// Install the stderr subscriber unless one already exists.
pub fn init_with(config: &ProfConfig, debug: bool) {
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(filter(config, debug))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        // Goes to whichever subscriber the application installed.
        tracing::debug!("keeping existing subscriber: {err}");
    }
}

/// Initialize diagnostics with the default configuration.
pub fn init() {
    init_with(&ProfConfig::default(), false);
}
