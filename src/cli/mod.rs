//! CLI module for matchparam
//!
//! Provides command-line interface for:
//! - parameterize: stream filters from stdin, one JSON response per line
//! - explain: readable report for a single filter

mod args;
mod commands;
mod errors;
mod io;

pub use args::{BudgetArgs, Cli, Command};
pub use commands::{
    explain, explain_report, parameterize_filter, parameterize_lines, parameterize_stream, run,
    run_command, StreamSummary,
};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{
    read_filters, read_request, write_error_to, write_response_to, FilterLine, FilterLines,
};
