//! Match expression parse errors
//!
//! Raised while turning a filter document into a `MatchExpr` tree.
//! The parameterization engine itself never fails with these.

use thiserror::Error;

/// Result type for filter parsing
pub type ParseResult<T> = Result<T, ParseError>;

/// Filter parse errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// Filter root (or a nested clause) is not an object
    #[error("Filter must be a JSON object")]
    NotAnObject,

    /// Filter text is not JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// Operator is not part of the supported set
    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    /// Operator was given an operand of the wrong shape
    #[error("{operator} expects {expected}")]
    BadOperand {
        operator: String,
        expected: &'static str,
    },

    /// $and / $or / $nor with no clauses
    #[error("{0} must be a non-empty array")]
    EmptyClauseList(String),

    /// Regular expression failed to compile
    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidRegex { pattern: String, reason: String },

    /// Regular expression options outside of `imsxu`
    #[error("Invalid regex options: '{0}'")]
    InvalidRegexOptions(String),

    /// $options given without $regex
    #[error("$options needs a $regex")]
    OptionsWithoutRegex,

    /// $mod operand is not `[divisor, remainder]`
    #[error("$mod requires exactly [divisor, remainder]")]
    BadModArity,

    /// $mod with a zero divisor
    #[error("$mod divisor cannot be 0")]
    ZeroDivisor,

    /// Unknown $type alias or code
    #[error("Unknown type: {0}")]
    UnknownType(String),

    /// Extended JSON wrapper with an unusable payload
    #[error("Invalid extended JSON value for {0}")]
    BadExtendedJson(String),
}

impl ParseError {
    /// Stable error code reported by the CLI
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::NotAnObject => "MATCHPARAM_PARSE_NOT_AN_OBJECT",
            ParseError::InvalidJson(_) => "MATCHPARAM_PARSE_INVALID_JSON",
            ParseError::UnknownOperator(_) => "MATCHPARAM_PARSE_UNKNOWN_OPERATOR",
            ParseError::BadOperand { .. } => "MATCHPARAM_PARSE_BAD_OPERAND",
            ParseError::EmptyClauseList(_) => "MATCHPARAM_PARSE_EMPTY_CLAUSES",
            ParseError::InvalidRegex { .. } => "MATCHPARAM_PARSE_INVALID_REGEX",
            ParseError::InvalidRegexOptions(_) => "MATCHPARAM_PARSE_INVALID_REGEX_OPTIONS",
            ParseError::OptionsWithoutRegex => "MATCHPARAM_PARSE_OPTIONS_WITHOUT_REGEX",
            ParseError::BadModArity => "MATCHPARAM_PARSE_BAD_MOD",
            ParseError::ZeroDivisor => "MATCHPARAM_PARSE_ZERO_DIVISOR",
            ParseError::UnknownType(_) => "MATCHPARAM_PARSE_UNKNOWN_TYPE",
            ParseError::BadExtendedJson(_) => "MATCHPARAM_PARSE_BAD_EXTENDED_JSON",
        }
    }

    pub(crate) fn bad_operand(operator: &str, expected: &'static str) -> Self {
        ParseError::BadOperand {
            operator: operator.to_string(),
            expected,
        }
    }
}
