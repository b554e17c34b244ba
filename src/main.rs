//! matchparam CLI entry point
//!
//! Parses arguments, dispatches to the CLI module, and exits non-zero on
//! failure. All logic lives in `cli`.

use matchparam::cli;
use matchparam::observability::{log_event_with_fields, Event};

fn main() {
    if let Err(e) = cli::run() {
        log_event_with_fields(Event::FatalError, &[("code", e.code_str())]);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
