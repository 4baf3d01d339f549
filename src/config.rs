// Configuration for the profiling interface
//
// Everything is read from the environment of the profiled process: there is
// no command line to parse when the tool is loaded by the OpenMP runtime.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::error::ConfigError;
use crate::proflib;

/// Configuration for tool start
///
/// # Example
/// ```
/// use accprof::config::ProfConfig;
///
/// let config = ProfConfig::default();
/// assert_eq!(config.proflib_var, "ACC_PROFLIB");
/// assert_eq!(config.parse_proflibs("libA.so;;libB.so"), vec!["libA.so", "libB.so"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfConfig {
    /// Environment variable listing profiling libraries to load at start
    ///
    /// Default: `ACC_PROFLIB`
    pub proflib_var: String,

    /// Characters separating entries of the library list
    ///
    /// Default: `;`
    pub separators: String,

    /// Environment variable holding the log filter
    ///
    /// Default: `ACCPROF_LOG`
    pub log_var: String,

    /// Filter directive used when `log_var` is unset or invalid
    ///
    /// Default: `warn`, so usage warnings reach stderr.
    pub default_log_level: String,
}

impl Default for ProfConfig {
    fn default() -> Self {
        Self {
            proflib_var: "ACC_PROFLIB".to_string(),
            separators: ";".to_string(),
            log_var: "ACCPROF_LOG".to_string(),
            default_log_level: "warn".to_string(),
        }
    }
}

impl ProfConfig {
    /// Split a library list, skipping empty entries.
    pub fn parse_proflibs(&self, value: &str) -> Vec<String> {
        proflib::split_list(value, &self.separators)
            .map(str::to_string)
            .collect()
    }

    /// Libraries listed in the environment, in load order.
    pub fn proflibs(&self) -> Vec<String> {
        std::env::var(&self.proflib_var)
            .map(|value| self.parse_proflibs(&value))
            .unwrap_or_default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.proflib_var.is_empty() {
            return Err(ConfigError::EmptyField("proflib_var"));
        }
        if self.separators.is_empty() {
            return Err(ConfigError::EmptyField("separators"));
        }
        if self.log_var.is_empty() {
            return Err(ConfigError::EmptyField("log_var"));
        }
        EnvFilter::try_new(&self.default_log_level).map_err(|err| {
            ConfigError::InvalidLogLevel {
                level: self.default_log_level.clone(),
                reason: err.to_string(),
            }
        })?;
        Ok(())
    }
}
