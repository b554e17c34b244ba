//! Auto-parameterization of match expression trees
//!
//! A walk visits every node of a tree in pre-order and replaces eligible
//! literal operands with parameter slots. The result is a slot table mapping
//! each slot id back to the node it came from, plus a flag telling whether
//! every eligible operand received a slot within the budget.
//!
//! # Pieces
//!
//! - `ParameterizationContext`: budget, id counter, sticky flag, slot table
//! - `ParameterizationVisitor`: per-kind policy, one exhaustive match
//! - `ParameterizationWalker`: hooks the visitor into `tree_walker::walk`
//! - `parameterize` / `parameterize_forest`: one fresh context per tree
//!
//! # Outcome contract
//!
//! When `parameterized` is false the whole tree must be treated as
//! unparameterized, even though some leaves carry slot ids.

mod bindings;
mod config;
mod context;
mod visitor;
mod walker;

pub use bindings::{resolve_bindings, BindingError, ParamBinding, ParamValue};
pub use config::{ConfigError, ParameterizationConfig};
pub use context::ParameterizationContext;
pub use visitor::{
    excluded_comparison_operand, ExcludedLiteral, ParameterizationVisitor, COMPARISON_EXCLUSIONS,
};
pub use walker::ParameterizationWalker;

use crate::matcher::tree_walker::walk;
use crate::matcher::{InputParamId, MatchExpr};
use crate::observability::{log_event_at, metrics, Event, Logger, Severity};

/// Result of one walk
#[derive(Debug)]
pub struct ParameterizationOutcome<'a> {
    /// False if any slot request exceeded the budget
    pub parameterized: bool,
    /// Entry `i` is the node holding slot `starting_param_id + i`
    pub slot_table: Vec<&'a MatchExpr>,
    pub starting_param_id: InputParamId,
    pub next_param_id: InputParamId,
    /// Reusable requests answered by an existing slot
    pub reused: usize,
}

impl<'a> ParameterizationOutcome<'a> {
    /// Distinct slots issued by this walk
    pub fn slot_count(&self) -> usize {
        self.slot_table.len()
    }

    /// Operand each slot stands for, in slot order
    pub fn bindings(&self) -> Result<Vec<ParamBinding>, BindingError> {
        resolve_bindings(&self.slot_table, self.starting_param_id)
    }
}

/// Walks `root` once with a fresh context built from `config`
pub fn parameterize<'a>(
    root: &'a MatchExpr,
    config: &ParameterizationConfig,
) -> ParameterizationOutcome<'a> {
    let mut context =
        ParameterizationContext::new(config.max_param_count, config.starting_param_id);
    {
        let mut visitor = ParameterizationVisitor::new(&mut context);
        let mut walker = ParameterizationWalker::new(&mut visitor);
        walk(root, &mut walker);
    }

    let parameterized = context.parameterized();
    let next_param_id = context.next_param_id();
    let reused = context.reused_count();
    let outcome = ParameterizationOutcome {
        parameterized,
        starting_param_id: context.starting_param_id(),
        next_param_id,
        reused,
        slot_table: context.into_slot_table(),
    };

    metrics::global().record_walk(
        parameterized,
        outcome.slot_count() as u64,
        reused as u64,
    );
    log_summary(root, &outcome, config);

    outcome
}

fn log_summary(
    root: &MatchExpr,
    outcome: &ParameterizationOutcome<'_>,
    config: &ParameterizationConfig,
) {
    let (severity, event) = if outcome.parameterized {
        (Severity::Trace, Event::ParameterizationComplete)
    } else {
        (Severity::Warn, Event::ParameterizationBudgetExhausted)
    };
    if !Logger::enabled(severity) {
        return;
    }

    let nodes = root.node_count().to_string();
    let slots = outcome.slot_count().to_string();
    let reused = outcome.reused.to_string();
    let start = outcome.starting_param_id.to_string();
    let next = outcome.next_param_id.to_string();
    let budget = config
        .max_param_count
        .map_or_else(|| "unlimited".to_string(), |max| max.to_string());

    log_event_at(
        severity,
        event,
        &[
            ("budget", budget.as_str()),
            ("next_param_id", next.as_str()),
            ("nodes", nodes.as_str()),
            ("reused", reused.as_str()),
            ("slots", slots.as_str()),
            ("starting_param_id", start.as_str()),
        ],
    );
}

/// Result of parameterizing several trees against one id space
#[derive(Debug)]
pub struct ForestOutcome<'a> {
    pub trees: Vec<ParameterizationOutcome<'a>>,
}

impl ForestOutcome<'_> {
    /// True only if every tree was parameterized
    pub fn parameterized(&self) -> bool {
        self.trees.iter().all(|tree| tree.parameterized)
    }

    /// Id the next tree would start from
    pub fn next_param_id(&self) -> Option<InputParamId> {
        self.trees.last().map(|tree| tree.next_param_id)
    }

    pub fn slot_count(&self) -> usize {
        self.trees.iter().map(ParameterizationOutcome::slot_count).sum()
    }
}

/// Parameterizes each tree in order. Tree `n + 1` starts where tree `n`
/// stopped, so ids are unique across the forest. Equivalent leaves in
/// different trees do not share slots.
pub fn parameterize_forest<'a>(
    roots: &'a [MatchExpr],
    config: &ParameterizationConfig,
) -> ForestOutcome<'a> {
    let mut trees = Vec::with_capacity(roots.len());
    let mut tree_config = *config;

    for root in roots {
        let outcome = parameterize(root, &tree_config);
        tree_config.starting_param_id = outcome.next_param_id;
        trees.push(outcome);
    }

    let forest = ForestOutcome { trees };

    if Logger::enabled(Severity::Info) {
        let trees = forest.trees.len().to_string();
        let slots = forest.slot_count().to_string();
        let parameterized = forest.parameterized().to_string();
        log_event_at(
            Severity::Info,
            Event::ForestParameterized,
            &[
                ("parameterized", parameterized.as_str()),
                ("slots", slots.as_str()),
                ("trees", trees.as_str()),
            ],
        );
    }

    forest
}
