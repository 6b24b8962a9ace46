//! Error handling for the benchmark-language front end

use crate::utils::Span;
use serde::Serialize;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal compiler diagnostic
///
/// Any of these aborts the remaining pipeline; no partial tree is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ==================== Tokenizer / Parser Errors ====================

    #[error("syntax error at {span}: {message}")]
    Syntax { message: String, span: Span },

    // ==================== Semantic Errors ====================

    #[error("{span}: \"{name}\" redefines a {what}")]
    Redefinition {
        name: String,
        what: String,
        span: Span,
    },

    #[error("{span}: variable \"{name}\" is used without being declared")]
    UndeclaredVariable { name: String, span: Span },

    #[error("{span}: ambiguous scope in \"{text}\": {message}")]
    ScopeAmbiguity {
        message: String,
        text: String,
        span: Span,
    },

    #[error("{span}: conflicting attributes in \"{text}\": {message}")]
    AttributeConflict {
        message: String,
        text: String,
        span: Span,
    },

    #[error("{span}: invalid reduction \"{text}\": {message}")]
    ReduceUsage {
        message: String,
        text: String,
        span: Span,
    },

    #[error("{span}: random value in \"{text}\" is not allowed {context}")]
    RandomUsage {
        context: String,
        text: String,
        span: Span,
    },

    #[error("{span}: invalid task expression \"{text}\": {message}")]
    TaskExpression {
        message: String,
        text: String,
        span: Span,
    },

    #[error("{span}: invalid parameter declaration \"{text}\": {message}")]
    ParameterDeclaration {
        message: String,
        text: String,
        span: Span,
    },

    #[error("{span}: invalid let binding \"{text}\": {message}")]
    LetBinding {
        message: String,
        text: String,
        span: Span,
    },

    // ==================== Analyzer Defects ====================

    #[error("internal error at {span}: {message}")]
    InternalInvariant { message: String, span: Span },

    #[error("IO error: {0}")]
    Io(String),
}

impl Error {
    pub fn syntax(message: impl Into<String>, span: Span) -> Self {
        Self::Syntax {
            message: message.into(),
            span,
        }
    }

    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Syntax { span, .. } => Some(*span),
            Self::Redefinition { span, .. } => Some(*span),
            Self::UndeclaredVariable { span, .. } => Some(*span),
            Self::ScopeAmbiguity { span, .. } => Some(*span),
            Self::AttributeConflict { span, .. } => Some(*span),
            Self::ReduceUsage { span, .. } => Some(*span),
            Self::RandomUsage { span, .. } => Some(*span),
            Self::TaskExpression { span, .. } => Some(*span),
            Self::ParameterDeclaration { span, .. } => Some(*span),
            Self::LetBinding { span, .. } => Some(*span),
            Self::InternalInvariant { span, .. } => Some(*span),
            Self::Io(_) => None,
        }
    }

    /// Short, stable name of the error class
    pub fn class(&self) -> &'static str {
        match self {
            Self::Syntax { .. } => "SyntaxError",
            Self::Redefinition { .. } => "RedefinitionError",
            Self::UndeclaredVariable { .. } => "UndeclaredVariableError",
            Self::ScopeAmbiguity { .. } => "ScopeAmbiguityError",
            Self::AttributeConflict { .. } => "AttributeConflictError",
            Self::ReduceUsage { .. } => "ReduceUsageError",
            Self::RandomUsage { .. } => "RandomUsageError",
            Self::TaskExpression { .. } => "TaskExpressionError",
            Self::ParameterDeclaration { .. } => "ParameterDeclarationError",
            Self::LetBinding { .. } => "LetBindingError",
            Self::InternalInvariant { .. } => "InternalInvariantError",
            Self::Io(_) => "IoError",
        }
    }
}

// ==================== Warnings ====================

/// Kind of non-fatal diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningKind {
    UnusedDefinition,
    DeprecatedSyntax,
    UnknownEscape,
    MyTaskAdvisory,
}

/// A collected warning; never alters whether the program is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
    pub span: Span,
}

impl Warning {
    /// Record a warning and forward it to the log
    pub fn emit(sink: &mut Vec<Warning>, kind: WarningKind, message: String, span: Span) {
        log::warn!("{}: {}", span, message);
        sink.push(Warning { kind, message, span });
    }
}
