//! CLI argument definitions using clap
//!
//! Commands:
//! - matchparam parameterize [--config <path>] [--max-params N] [--start-id K]
//! - matchparam explain [--config <path>] [--max-params N] [--start-id K] [FILTER]

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::observability::{log_event_with_fields, Event};
use crate::parameterization::ParameterizationConfig;

use super::errors::CliResult;

/// matchparam - auto-parameterize query filters for plan caching
#[derive(Parser, Debug)]
#[command(name = "matchparam")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit TRACE-level log lines on stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read one JSON filter per line from stdin and write one JSON response per line
    Parameterize {
        #[command(flatten)]
        budget: BudgetArgs,
    },

    /// Print a readable report for a single filter
    Explain {
        #[command(flatten)]
        budget: BudgetArgs,

        /// Filter document as JSON. Read from stdin when omitted.
        filter: Option<String>,
    },
}

/// Budget options shared by every command. Flags override the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct BudgetArgs {
    /// Path to a JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Slot ids at or beyond this value are never issued. Absolute, so it
    /// also counts ids below --start-id.
    #[arg(long = "max-params")]
    pub max_params: Option<usize>,

    /// First parameter slot id
    #[arg(long = "start-id")]
    pub start_id: Option<usize>,
}

impl BudgetArgs {
    /// Builds the effective configuration
    pub fn resolve(&self) -> CliResult<ParameterizationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let config = ParameterizationConfig::load(path)?;
                log_event_with_fields(
                    Event::ConfigLoaded,
                    &[("path", path.to_string_lossy().as_ref())],
                );
                config
            }
            None => ParameterizationConfig::default(),
        };

        if let Some(max) = self.max_params {
            config = config.with_max_param_count(max);
        }
        if let Some(start) = self.start_id {
            config = config.with_starting_param_id(start);
        }
        config.validate()?;

        Ok(config)
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_parameterize_flags() {
        let cli = Cli::try_parse_from([
            "matchparam",
            "parameterize",
            "--max-params",
            "8",
            "--start-id",
            "2",
        ])
        .unwrap();

        match cli.command {
            Command::Parameterize { budget } => {
                assert_eq!(budget.max_params, Some(8));
                assert_eq!(budget.start_id, Some(2));
                assert!(budget.config.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_explain_with_filter() {
        let cli =
            Cli::try_parse_from(["matchparam", "--verbose", "explain", r#"{"a":1}"#]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Explain { filter, .. } => assert_eq!(filter.as_deref(), Some(r#"{"a":1}"#)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_max_params_help_describes_absolute_bound() {
        let cmd = Cli::command();
        let parameterize = cmd.find_subcommand("parameterize").unwrap();
        let help = parameterize
            .get_arguments()
            .find(|arg| arg.get_id() == "max_params")
            .and_then(|arg| arg.get_help())
            .map(ToString::to_string)
            .unwrap();

        assert!(help.contains("never issued"));
        assert!(help.contains("--start-id"));
    }

    #[test]
    fn test_flags_override_nothing_by_default() {
        let config = BudgetArgs::default().resolve().unwrap();
        assert_eq!(config, ParameterizationConfig::unlimited());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matchparam.json");
        std::fs::write(&path, r#"{"max_param_count": 4, "starting_param_id": 1}"#).unwrap();

        let args = BudgetArgs {
            config: Some(path),
            max_params: Some(16),
            start_id: None,
        };
        let config = args.resolve().unwrap();
        assert_eq!(config.max_param_count, Some(16));
        assert_eq!(config.starting_param_id, 1);
    }

    #[test]
    fn test_flags_are_validated() {
        let args = BudgetArgs {
            config: None,
            max_params: Some(1),
            start_id: Some(3),
        };
        let err = args.resolve().unwrap_err();
        assert_eq!(err.code_str(), "MATCHPARAM_CLI_CONFIG_ERROR");
    }
}
