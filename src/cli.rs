// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;
use crate::types::{FailurePolicy, OnExit};

/// Command-line arguments for `cellfarm`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cellfarm",
    version,
    about = "Solve a grid of dependent cells across a pool of machines.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Cellfarm.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CELLFARM_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load config and inspect the store, print the plan, run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Override `[control].poll_interval_ms`.
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_ms: Option<u64>,

    /// Override `[control].on_exit` (drain or abandon).
    #[arg(long, value_name = "MODE")]
    pub on_exit: Option<OnExit>,

    /// Override `[control].on_failure` (skip or requeue).
    #[arg(long, value_name = "POLICY")]
    pub on_failure: Option<FailurePolicy>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_parse_through_from_str() {
        let args = CliArgs::try_parse_from([
            "cellfarm",
            "--config",
            "farm.toml",
            "--poll-ms",
            "250",
            "--on-exit",
            "abandon",
            "--on-failure",
            "requeue",
        ])
        .unwrap();
        assert_eq!(args.config, PathBuf::from("farm.toml"));
        assert_eq!(args.poll_ms, Some(250));
        assert_eq!(args.on_exit, Some(OnExit::Abandon));
        assert_eq!(args.on_failure, Some(FailurePolicy::Requeue));
    }

    #[test]
    fn config_defaults_to_cellfarm_toml() {
        let args = CliArgs::try_parse_from(["cellfarm"]).unwrap();
        assert_eq!(args.config, default_config_path());
        assert_eq!(args.config, PathBuf::from("Cellfarm.toml"));
        assert!(!args.dry_run);
    }

    #[test]
    fn zero_poll_is_rejected() {
        assert!(CliArgs::try_parse_from(["cellfarm", "--poll-ms", "0"]).is_err());
    }
}
