//! Structured Feedback Module
//!
//! Machine-readable summary of one compilation:
//! - diagnostics with severity, class and line span
//! - statistics about the input and the analyzed tree

use serde::{Deserialize, Serialize};

use crate::frontend::ast::NodeKind;
use crate::utils::{Error, Span, Warning, WarningKind};
use crate::Compilation;

// ==================== Diagnostic Report ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub end_line: u32,
}

impl Location {
    fn new(file: &str, span: Span) -> Self {
        Self {
            file: file.to_string(),
            line: span.start,
            end_line: span.end,
        }
    }
}

/// One error or warning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Error class, e.g. "UndeclaredVariableError"
    pub class: String,
    pub severity: Severity,
    pub message: String,
    pub location: Option<Location>,
    /// Possible fix, when one is obvious
    pub suggestion: Option<String>,
}

fn suggest(error: &Error) -> Option<String> {
    match error {
        Error::UndeclaredVariable { name, .. } => Some(format!(
            "declare \"{}\" as a parameter, or compile with --lenient to declare it automatically",
            name
        )),
        Error::Redefinition { name, .. } => Some(format!("rename \"{}\"", name)),
        Error::AttributeConflict { .. } => {
            Some("drop one of the conflicting message attributes".to_string())
        }
        Error::RandomUsage { .. } => {
            Some("bind the random value to a parameter or compute it in a loop body".to_string())
        }
        _ => None,
    }
}

fn warning_class(kind: WarningKind) -> &'static str {
    match kind {
        WarningKind::UnusedDefinition => "UnusedDefinitionWarning",
        WarningKind::DeprecatedSyntax => "DeprecatedSyntaxWarning",
        WarningKind::UnknownEscape => "UnknownEscapeWarning",
        WarningKind::MyTaskAdvisory => "MyTaskAdvisory",
    }
}

impl DiagnosticReport {
    pub fn from_error(error: &Error, file_name: &str) -> Self {
        Self {
            class: error.class().to_string(),
            severity: Severity::Error,
            message: error.to_string(),
            location: error.span().map(|span| Location::new(file_name, span)),
            suggestion: suggest(error),
        }
    }

    pub fn from_warning(warning: &Warning, file_name: &str) -> Self {
        Self {
            class: warning_class(warning.kind).to_string(),
            severity: Severity::Warning,
            message: warning.message.clone(),
            location: Some(Location::new(file_name, warning.span)),
            suggestion: None,
        }
    }
}

// ==================== Compilation Feedback ====================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompilationStats {
    /// Tokens read, end of input included
    pub token_count: usize,
    /// Nodes in the analyzed tree
    pub node_count: usize,
    /// Command-line parameters, automatically declared ones included
    pub parameter_count: usize,
    /// Lines of source text
    pub loc: usize,
    /// Wall-clock time of the whole compilation
    pub total_time_ms: u64,
}

/// Complete feedback for one source file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationFeedback {
    pub success: bool,
    pub source_file: String,
    /// Warnings in the order raised, then the fatal error if any
    pub diagnostics: Vec<DiagnosticReport>,
    pub stats: CompilationStats,
}

impl CompilationFeedback {
    /// Feedback for an accepted program
    pub fn success(source_file: &str, compilation: &Compilation, mut stats: CompilationStats) -> Self {
        stats.token_count = compilation.token_count;
        stats.node_count = compilation.root.count_nodes();
        stats.parameter_count = compilation
            .root
            .children
            .iter()
            .filter(|c| c.kind == NodeKind::ParamDecl)
            .count();

        Self {
            success: true,
            source_file: source_file.to_string(),
            diagnostics: compilation
                .warnings
                .iter()
                .map(|w| DiagnosticReport::from_warning(w, source_file))
                .collect(),
            stats,
        }
    }

    /// Feedback for a rejected program
    pub fn failure(source_file: &str, error: &Error, stats: CompilationStats) -> Self {
        Self {
            success: false,
            source_file: source_file.to_string(),
            diagnostics: vec![DiagnosticReport::from_error(error, source_file)],
            stats,
        }
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Output as compact JSON (for programmatic use)
    pub fn to_json_compact(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
