//! Structured error handling for the quad store
//!
//! Every fallible operation in the crate returns [`RdfResult`]. An [`RdfError`]
//! carries:
//! - an [`ErrorCode`] naming the error kind for programmatic handling
//! - a human-readable message
//! - optional key/value context and a resolution hint
//! - for update command sets, the failing command index and the number of
//!   commands that had already committed
//!
//! # Error Categories
//!
//! - `MalformedTerm` (1xxx) - invalid terms or triples, rejected at construction
//! - `PatternEvaluation` (2xxx) - expression errors; swallowed by the operator
//!   that raised them under SPARQL's error-tolerant evaluation
//! - `TimeoutExceeded` (3xxx) - query or update deadline passed
//! - `UpdateCommandFailed` (4xxx) - runtime failure of an update command
//! - `DatasetConsistency` (5xxx) - graph management against missing/existing graphs
//! - `ConfigError` (7xxx) - configuration loading
//! - `InternalError` (9xxx)
//!
//! # Example
//!
//! ```rust
//! use quadstore::error::{RdfError, ErrorCode};
//!
//! let err = RdfError::graph_not_found("http://example.org/g")
//!     .with_hint("Use SILENT to ignore missing graphs");
//! assert_eq!(err.code, ErrorCode::GraphNotFound);
//! assert!(err.is_dataset_consistency());
//! ```

use std::collections::HashMap;
use std::fmt;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

// ============================================================================
// Error Codes
// ============================================================================

/// Unique error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Malformed terms (1xxx)
    /// Generic malformed term
    MalformedTerm = 1000,
    /// Term kind not allowed in this triple position
    InvalidPosition = 1001,
    /// Literal with both a language tag and a datatype
    LanguageAndDatatype = 1002,
    /// Invalid IRI
    InvalidIri = 1003,
    /// Invalid language tag
    InvalidLanguageTag = 1004,

    // Pattern evaluation (2xxx)
    /// Generic expression evaluation error
    PatternEvaluation = 2000,
    /// Operand types are not supported by the operator
    TypeError = 2001,
    /// Variable is not bound in the current row
    UnboundVariable = 2002,
    /// Function argument has an invalid value
    InvalidArgument = 2003,
    /// Division by zero
    DivisionByZero = 2004,
    /// Invalid regular expression
    InvalidRegex = 2005,

    // Timeouts (3xxx)
    /// Evaluation exceeded its deadline
    TimeoutExceeded = 3001,

    // Update failures (4xxx)
    /// Generic update command failure
    UpdateCommandFailed = 4000,
    /// LOAD source could not be resolved
    LoadFailed = 4001,
    /// No resolver configured for LOAD
    NoResolver = 4002,
    /// SERVICE endpoint failed or no handler configured
    ServiceFailed = 4003,
    /// LOAD disabled by configuration
    LoadDisabled = 4004,

    // Dataset consistency (5xxx)
    /// Generic dataset consistency error
    DatasetConsistency = 5000,
    /// Named graph does not exist
    GraphNotFound = 5001,
    /// Named graph already exists
    GraphAlreadyExists = 5002,

    // Config errors (7xxx)
    /// Generic config error
    ConfigError = 7000,
    /// Config file not found or unreadable
    ConfigNotFound = 7001,
    /// Invalid config syntax
    InvalidConfigSyntax = 7002,
    /// Invalid config value
    InvalidConfigValue = 7003,

    // Internal errors (9xxx)
    /// Internal error
    InternalError = 9000,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Get a short description of the error code
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCode::MalformedTerm => "Malformed term",
            ErrorCode::InvalidPosition => "Term not allowed in triple position",
            ErrorCode::LanguageAndDatatype => "Literal has both language and datatype",
            ErrorCode::InvalidIri => "Invalid IRI",
            ErrorCode::InvalidLanguageTag => "Invalid language tag",

            ErrorCode::PatternEvaluation => "Expression evaluation error",
            ErrorCode::TypeError => "Type error",
            ErrorCode::UnboundVariable => "Unbound variable",
            ErrorCode::InvalidArgument => "Invalid function argument",
            ErrorCode::DivisionByZero => "Division by zero",
            ErrorCode::InvalidRegex => "Invalid regular expression",

            ErrorCode::TimeoutExceeded => "Timeout exceeded",

            ErrorCode::UpdateCommandFailed => "Update command failed",
            ErrorCode::LoadFailed => "LOAD failed",
            ErrorCode::NoResolver => "No graph resolver configured",
            ErrorCode::ServiceFailed => "SERVICE failed",
            ErrorCode::LoadDisabled => "LOAD disabled",

            ErrorCode::DatasetConsistency => "Dataset consistency error",
            ErrorCode::GraphNotFound => "Graph not found",
            ErrorCode::GraphAlreadyExists => "Graph already exists",

            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::ConfigNotFound => "Configuration file not found",
            ErrorCode::InvalidConfigSyntax => "Invalid configuration syntax",
            ErrorCode::InvalidConfigValue => "Invalid configuration value",

            ErrorCode::InternalError => "Internal error",
        }
    }

    /// The error family this code belongs to, as its base code
    pub fn family(&self) -> u32 {
        (self.code() / 1000) * 1000
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// ============================================================================
// Error Context
// ============================================================================

/// Additional context information for an error
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Key-value pairs of context information
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, String>,
    /// Source location (file:line)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Stack of error causes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ErrorContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field to the context
    pub fn field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// The main error type of the crate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RdfError {
    /// Error code for programmatic handling
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Additional context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ErrorContext>,
    /// Hint for resolving the error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Index of the failing command in an update command set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_index: Option<usize>,
    /// Number of commands of the set whose mutations were already applied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub committed: Option<usize>,
}

impl RdfError {
    /// Create a new error with a code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
            hint: None,
            command_index: None,
            committed: None,
        }
    }

    // ========================================================================
    // Factory methods for common error types
    // ========================================================================

    /// A term of the wrong kind in a triple position
    pub fn invalid_position(position: &str, term: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidPosition,
            format!("{} cannot appear in {} position", term, position),
        )
        .with_context("position", position)
    }

    /// Create a type error raised by expression evaluation
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TypeError, message)
    }

    /// Variable has no value in the current solution
    pub fn unbound(variable: &str) -> Self {
        Self::new(ErrorCode::UnboundVariable, format!("?{} is not bound", variable))
    }

    /// Invalid argument passed to a function
    pub fn invalid_argument(function: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidArgument, message).with_context("function", function)
    }

    /// Create a timeout error
    pub fn timeout(elapsed_ms: u128, limit_ms: u128) -> Self {
        Self::new(
            ErrorCode::TimeoutExceeded,
            format!("Evaluation stopped after {} ms (limit: {} ms)", elapsed_ms, limit_ms),
        )
    }

    /// LOAD source could not be resolved
    pub fn load_failed(source: &str, cause: impl Into<String>) -> Self {
        Self::new(ErrorCode::LoadFailed, format!("Could not load <{}>", source))
            .with_cause(cause)
            .with_context("source", source)
    }

    /// Create a service error
    pub fn service(endpoint: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceFailed, message).with_context("endpoint", endpoint)
    }

    /// Named graph is missing
    pub fn graph_not_found(graph: impl fmt::Display) -> Self {
        Self::new(ErrorCode::GraphNotFound, format!("Graph does not exist: {}", graph))
    }

    /// Named graph already exists
    pub fn graph_exists(graph: impl fmt::Display) -> Self {
        Self::new(ErrorCode::GraphAlreadyExists, format!("Graph already exists: {}", graph))
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }

    // ========================================================================
    // Builder methods
    // ========================================================================

    /// Set the error code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = code;
        self
    }

    /// Add context to the error
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.fields.insert(key.into(), value.into());
        self
    }

    /// Add a cause to the error chain
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.causes.push(cause.into());
        self
    }

    /// Add source location
    pub fn at(mut self, location: impl Into<String>) -> Self {
        let ctx = self.context.get_or_insert_with(ErrorContext::new);
        ctx.location = Some(location.into());
        self
    }

    /// Add a hint for resolving the error
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Record where in an update command set this error stopped execution
    pub fn in_command(mut self, index: usize, committed: usize) -> Self {
        self.command_index = Some(index);
        self.committed = Some(committed);
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Term or triple construction failure
    pub fn is_malformed_term(&self) -> bool {
        self.code.family() == 1000
    }

    /// Expression evaluation failure
    pub fn is_evaluation_error(&self) -> bool {
        self.code.family() == 2000
    }

    /// Deadline exceeded
    pub fn is_timeout(&self) -> bool {
        self.code == ErrorCode::TimeoutExceeded
    }

    /// Update command runtime failure
    pub fn is_update_failure(&self) -> bool {
        self.code.family() == 4000
    }

    /// Graph existence conflict
    pub fn is_dataset_consistency(&self) -> bool {
        self.code.family() == 5000
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":"INTERNAL_ERROR","message":"{}"}}"#, self.message)
        })
    }
}

impl fmt::Display for RdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)?;

        if let Some(index) = self.command_index {
            write!(f, " (command {}", index)?;
            if let Some(committed) = self.committed {
                write!(f, ", {} committed", committed)?;
            }
            write!(f, ")")?;
        }

        if let Some(ref ctx) = self.context {
            if let Some(ref loc) = ctx.location {
                write!(f, " at {}", loc)?;
            }
            if !ctx.causes.is_empty() {
                write!(f, "\nCaused by:")?;
                for cause in &ctx.causes {
                    write!(f, "\n  - {}", cause)?;
                }
            }
        }

        if let Some(ref hint) = self.hint {
            write!(f, "\nHint: {}", hint)?;
        }

        Ok(())
    }
}

impl std::error::Error for RdfError {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<std::io::Error> for RdfError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;
        let code = match err.kind() {
            ErrorKind::NotFound => ErrorCode::ConfigNotFound,
            ErrorKind::TimedOut => ErrorCode::TimeoutExceeded,
            _ => ErrorCode::InternalError,
        };
        RdfError::new(code, err.to_string())
    }
}

impl From<toml::de::Error> for RdfError {
    fn from(err: toml::de::Error) -> Self {
        RdfError::config(err.to_string()).with_code(ErrorCode::InvalidConfigSyntax)
    }
}

impl From<ConfigError> for RdfError {
    fn from(err: ConfigError) -> Self {
        let code = match &err {
            ConfigError::IoError(..) => ErrorCode::ConfigNotFound,
            ConfigError::ParseError(..) => ErrorCode::InvalidConfigSyntax,
            ConfigError::Invalid { .. } => ErrorCode::InvalidConfigValue,
        };
        RdfError::new(code, err.to_string())
    }
}

impl From<regex::Error> for RdfError {
    fn from(err: regex::Error) -> Self {
        RdfError::new(ErrorCode::InvalidRegex, err.to_string())
    }
}

// ============================================================================
// Result type alias
// ============================================================================

/// A Result type using RdfError
pub type RdfResult<T> = Result<T, RdfError>;

// ============================================================================
// Macros for convenient error creation
// ============================================================================

/// Create an RdfError with context from the current location
#[macro_export]
macro_rules! rdf_error {
    ($code:expr, $msg:expr) => {
        $crate::error::RdfError::new($code, $msg)
            .at(format!("{}:{}", file!(), line!()))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        $crate::error::RdfError::new($code, format!($fmt, $($arg)*))
            .at(format!("{}:{}", file!(), line!()))
    };
}

/// Bail out early with an error
#[macro_export]
macro_rules! rdf_bail {
    ($code:expr, $msg:expr) => {
        return Err($crate::rdf_error!($code, $msg))
    };
    ($code:expr, $fmt:expr, $($arg:tt)*) => {
        return Err($crate::rdf_error!($code, $fmt, $($arg)*))
    };
}

/// Ensure a condition holds, or return an error
#[macro_export]
macro_rules! rdf_ensure {
    ($cond:expr, $code:expr, $msg:expr) => {
        if !$cond {
            $crate::rdf_bail!($code, $msg);
        }
    };
    ($cond:expr, $code:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::rdf_bail!($code, $fmt, $($arg)*);
        }
    };
}

// ============================================================================
// Tests
// ============================================================================
