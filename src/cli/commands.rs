//! CLI command implementations
//!
//! `parameterize` answers one JSON line per input line. A bad filter yields
//! an error line and the loop continues. Config and I/O failures stop the
//! command.

use std::fmt::Write as _;
use std::io::{self, BufRead, Write};

use serde_json::{json, Value};

use crate::matcher::{FilterParser, MatchExpr};
use crate::observability::{
    log_event_at, log_event_with_fields, metrics, Event, Logger, MetricsSnapshot, Severity,
};
use crate::parameterization::{parameterize, ParameterizationConfig, ParamValue};
use crate::plan_cache::PlanCacheKey;

use super::args::{BudgetArgs, Command};
use super::errors::{CliError, CliResult};
use super::io::{
    read_filters, read_request, write_error_to, write_response_to, write_text, FilterLines,
};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    if cli.verbose {
        Logger::set_min_severity(Severity::Trace);
    }
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Parameterize { budget } => parameterize_stream(&budget),
        Command::Explain { budget, filter } => explain(&budget, filter.as_deref()),
    }
}

/// Parameterize every filter on stdin
pub fn parameterize_stream(budget: &BudgetArgs) -> CliResult<()> {
    let config = budget.resolve()?;
    let summary = parameterize_lines(read_filters(), &mut io::stdout().lock(), &config)?;
    log_stream_summary(&summary, &metrics::global().snapshot());
    Ok(())
}

/// Filters answered by one stream run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamSummary {
    pub answered: u64,
    pub rejected: u64,
}

/// Answers each filter line on `out`; stops only on a fatal error
pub fn parameterize_lines<R: BufRead, W: Write>(
    lines: FilterLines<R>,
    out: &mut W,
    config: &ParameterizationConfig,
) -> CliResult<StreamSummary> {
    let mut summary = StreamSummary::default();

    for line in lines {
        let result = line?
            .filter
            .and_then(|filter| parameterize_filter(&filter, config));

        match result {
            Ok(data) => {
                summary.answered += 1;
                write_response_to(out, data)?;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                summary.rejected += 1;
                write_error_to(out, e.code_str(), e.message())?;
            }
        }
    }

    Ok(summary)
}

/// Log fields for the end-of-stream line: the run's filter counts followed
/// by the process-wide walk counters
fn stream_summary_fields(
    summary: &StreamSummary,
    counters: &MetricsSnapshot,
) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("answered", summary.answered.to_string()),
        ("rejected", summary.rejected.to_string()),
    ];
    fields.extend(counters.log_fields());
    fields
}

fn log_stream_summary(summary: &StreamSummary, counters: &MetricsSnapshot) {
    let fields = stream_summary_fields(summary, counters);
    let borrowed: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    log_event_with_fields(Event::StreamComplete, &borrowed);
}

/// Parses, parameterizes, and keys one filter, returning the `data` payload
pub fn parameterize_filter(filter: &Value, config: &ParameterizationConfig) -> CliResult<Value> {
    let tree = parse(filter)?;
    let outcome = parameterize(&tree, config);

    let (key, bindings) = if outcome.parameterized {
        (PlanCacheKey::build(&tree)?, outcome.bindings()?)
    } else {
        (PlanCacheKey::build_unparameterized(&tree), Vec::new())
    };

    Ok(json!({
        "parameterized": outcome.parameterized,
        "shape": key.shape(),
        "query_hash": key.query_hash(),
        "slots": outcome.slot_count(),
        "bindings": bindings,
    }))
}

/// Print a report for one filter, given inline or as the first stdin line
pub fn explain(budget: &BudgetArgs, filter: Option<&str>) -> CliResult<()> {
    let config = budget.resolve()?;

    let filter = match filter {
        Some(text) => serde_json::from_str::<Value>(text)
            .map_err(|e| CliError::invalid_filter(format!("invalid JSON: {}", e)))?,
        None => read_request()?,
    };

    write_text(&explain_report(&filter, &config)?)
}

/// Human-readable report of one walk
pub fn explain_report(filter: &Value, config: &ParameterizationConfig) -> CliResult<String> {
    let tree = parse(filter)?;
    let outcome = parameterize(&tree, config);

    let key = if outcome.parameterized {
        PlanCacheKey::build(&tree)?
    } else {
        PlanCacheKey::build_unparameterized(&tree)
    };
    let budget = config
        .max_param_count
        .map_or_else(|| "unlimited".to_string(), |max| max.to_string());

    let mut report = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(report, "filter:         {}", filter);
    let _ = writeln!(report, "nodes:          {}", tree.node_count());
    let _ = writeln!(report, "budget:         {}", budget);
    let _ = writeln!(report, "start id:       {}", config.starting_param_id);
    let _ = writeln!(report, "parameterized:  {}", outcome.parameterized);
    let _ = writeln!(
        report,
        "slots:          {} ({} reused)",
        outcome.slot_count(),
        outcome.reused
    );
    let _ = writeln!(report, "shape:          {}", key.shape());
    let _ = writeln!(report, "query hash:     {}", key.query_hash());

    if outcome.parameterized && outcome.slot_count() > 0 {
        let _ = writeln!(report, "bindings:");
        for binding in outcome.bindings()? {
            let _ = writeln!(
                report,
                "  ?{:<4} {:<12} {:<12} {}",
                binding.param_id,
                binding.kind.name(),
                binding.path.as_deref().unwrap_or("-"),
                describe(&binding.value)
            );
        }
    } else if !outcome.parameterized {
        let _ = writeln!(
            report,
            "note:           budget exhausted, plan must be cached by literal shape"
        );
    }

    Ok(report)
}

fn parse(filter: &Value) -> CliResult<MatchExpr> {
    match FilterParser::parse(filter) {
        Ok(tree) => {
            if Logger::enabled(Severity::Trace) {
                let nodes = tree.node_count().to_string();
                log_event_at(
                    Severity::Trace,
                    Event::FilterParsed,
                    &[("nodes", nodes.as_str())],
                );
            }
            Ok(tree)
        }
        Err(e) => {
            let reason = e.to_string();
            log_event_at(
                Severity::Warn,
                Event::FilterRejected,
                &[("code", e.code()), ("reason", reason.as_str())],
            );
            Err(e.into())
        }
    }
}

fn describe(value: &ParamValue) -> String {
    match value {
        ParamValue::Literal(literal) => format!("literal {}", literal),
        ParamValue::List(items) => format!(
            "list [{}]",
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        ),
        ParamValue::BitPositions(bits) => format!("bit positions {:?}", bits),
        ParamValue::BitMask(mask) => format!("bitmask {:#x}", mask),
        ParamValue::Divisor(d) => format!("divisor {}", d),
        ParamValue::Remainder(r) => format!("remainder {}", r),
        ParamValue::RegexSource { pattern, flags } => {
            format!("regex source /{}/{}", pattern, flags)
        }
        ParamValue::CompiledRegex { pattern, flags } => {
            format!("compiled regex /{}/{}", pattern, flags)
        }
        ParamValue::TypeSet(types) => format!("types {}", types),
        ParamValue::Size(size) => format!("size {}", size),
        ParamValue::Code(code) => format!("code {:?}", code),
    }
}
