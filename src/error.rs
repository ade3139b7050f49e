use thiserror::Error;

use crate::jsx::Dialect;

pub type CanvasResult<T> = Result<T, CanvasError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CanvasError {
    // --- compile errors ---

    #[error("Compile error at line {line}, column {column}: {message}")]
    Compile {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Unsupported syntax for the {dialect} dialect: {construct}")]
    UnsupportedSyntax { dialect: Dialect, construct: String },

    #[error("Component '{name}' does not return any JSX")]
    NoComponent { name: String },

    // --- addressing / patching errors ---

    #[error("Invalid structural address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("No element matches the structural address '{address}'")]
    NotFound { address: String },

    #[error("Structural address '{address}' is ambiguous: {candidates} elements match")]
    AmbiguousMatch { address: String, candidates: usize },

    // --- style errors ---

    #[error("Invalid token '{token}' for style dimension '{dimension}': {reason}")]
    InvalidStyleToken {
        dimension: String,
        token: String,
        reason: String,
    },

    // --- render errors ---

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Maximum nesting depth ({max_depth}) exceeded")]
    MaxNestingDepthExceeded { max_depth: usize },

    #[error("Markup parse error: {0}")]
    Markup(String),

    // --- session errors ---

    #[error("Operation '{operation}' is not valid in the {state} state")]
    InvalidTransition { state: String, operation: String },

    // --- collaborators ---

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CanvasError {
    /// Builds a [`CanvasError::Compile`] from a byte offset into `source`.
    pub fn compile_at(source: &str, offset: usize, message: impl Into<String>) -> Self {
        let (line, column) = line_column(source, offset);
        CanvasError::Compile {
            line,
            column,
            message: message.into(),
        }
    }

    /// True for every failure the compiler reports: last good render stays up.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            CanvasError::Compile { .. }
                | CanvasError::UnsupportedSyntax { .. }
                | CanvasError::NoComponent { .. }
        )
    }

    /// True when a structural address no longer resolves to exactly one node.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CanvasError::NotFound { .. } | CanvasError::AmbiguousMatch { .. }
        )
    }
}

impl From<roxmltree::Error> for CanvasError {
    fn from(err: roxmltree::Error) -> Self {
        CanvasError::Markup(err.to_string())
    }
}

impl From<serde_yaml::Error> for CanvasError {
    fn from(err: serde_yaml::Error) -> Self {
        CanvasError::Config(err.to_string())
    }
}

/// 1-based line and column (in characters) of a byte offset.
pub fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let mut end = offset.min(source.len());
    while end > 0 && !source.is_char_boundary(end) {
        end -= 1;
    }
    let before = &source[..end];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}
