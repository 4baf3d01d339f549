//! CLI argument parsing for accprof

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "accprof")]
#[command(version)]
#[command(about = "OpenACC Profiling Interface on top of OMPT", long_about = None)]
pub struct Cli {
    /// Enable debug tracing output (trace-level logs to stderr)
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List OpenACC events and the OMPT callbacks each one needs
    Events {
        /// Output format (text or json)
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List OMPT callbacks and the OpenACC events sharing each one
    Callbacks {
        /// Output format (text or json)
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Check that profiling libraries load and export acc_register_library
    Proflib {
        /// Libraries to check (default: the ACC_PROFLIB list)
        #[arg(value_name = "PATH")]
        paths: Vec<String>,

        /// Output format (text or json)
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the effective configuration
    Config {
        /// Output format (text or json)
        #[arg(long = "format", value_enum, default_value = "text")]
        format: OutputFormat,
    },
}
