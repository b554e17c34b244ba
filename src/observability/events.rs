//! Observable events
//!
//! Every log line names exactly one of these.

use std::fmt;

/// Observable events emitted by the parameterization pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A walk finished with every issued slot inside the budget
    ParameterizationComplete,
    /// A walk asked for more slots than the budget allows
    ParameterizationBudgetExhausted,
    /// A list of trees was parameterized against one shared budget
    ForestParameterized,
    /// A configuration file was read and validated
    ConfigLoaded,
    /// A filter document parsed into a tree
    FilterParsed,
    /// A filter document was rejected by the parser
    FilterRejected,
    /// A filter stream reached end of input
    StreamComplete,
    /// The process is exiting because of an unrecoverable error
    FatalError,
}

impl Event {
    /// Returns the event name as it appears in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ParameterizationComplete => "PARAMETERIZATION_COMPLETE",
            Event::ParameterizationBudgetExhausted => "PARAMETERIZATION_BUDGET_EXHAUSTED",
            Event::ForestParameterized => "FOREST_PARAMETERIZED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::FilterParsed => "FILTER_PARSED",
            Event::FilterRejected => "FILTER_REJECTED",
            Event::StreamComplete => "STREAM_COMPLETE",
            Event::FatalError => "FATAL_ERROR",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::FatalError)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
