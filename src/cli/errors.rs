//! CLI-specific error types
//!
//! A filter-level error becomes an error response on stdout and the command
//! keeps reading. Any other error ends the process.

use std::fmt;
use std::io;

use crate::matcher::ParseError;
use crate::parameterization::{BindingError, ConfigError};
use crate::plan_cache::KeyError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file or flag error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// Input line is not a valid filter
    InvalidFilter,
    /// Shape key could not be built
    KeyError,
    /// Slot table does not match the tree annotations
    BindingError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "MATCHPARAM_CLI_CONFIG_ERROR",
            Self::IoError => "MATCHPARAM_CLI_IO_ERROR",
            Self::InvalidFilter => "MATCHPARAM_CLI_INVALID_FILTER",
            Self::KeyError => "MATCHPARAM_CLI_KEY_ERROR",
            Self::BindingError => "MATCHPARAM_CLI_BINDING_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Invalid filter
    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidFilter, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the command should stop instead of answering with an error line
    pub fn is_fatal(&self) -> bool {
        matches!(self.code, CliErrorCode::ConfigError | CliErrorCode::IoError)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(format!("{}: {}", e.code(), e))
    }
}

impl From<ParseError> for CliError {
    fn from(e: ParseError) -> Self {
        Self::invalid_filter(format!("{}: {}", e.code(), e))
    }
}

impl From<KeyError> for CliError {
    fn from(e: KeyError) -> Self {
        Self::new(CliErrorCode::KeyError, format!("{}: {}", e.code(), e))
    }
}

impl From<BindingError> for CliError {
    fn from(e: BindingError) -> Self {
        Self::new(CliErrorCode::BindingError, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
