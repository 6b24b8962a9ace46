//! ncptl-front
//!
//! Front end for a declarative language of parallel-communication
//! benchmarks. Source text is tokenized, parsed into an owned tree and run
//! through the semantic passes; the result is a validated, annotated tree for
//! code generators to read.

pub mod feedback;
pub mod frontend;
pub mod utils;

use std::collections::BTreeMap;

use frontend::ast::Node;
use frontend::lexer::Lexer;
use frontend::parser::Parser;
use frontend::semantic::SemanticAnalyzer;
use utils::{Error, Result, Warning};

/// Settings for one compilation
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Label for the source in reported diagnostics. `Error` and `Warning`
    /// carry only a line span; `report_error` and `report_warning` prefix it.
    pub source_name: String,
    /// Declare undeclared variables as command-line parameters
    pub lenient: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            source_name: "<stdin>".to_string(),
            lenient: false,
        }
    }
}

impl CompileOptions {
    /// `name: line N: message`
    pub fn report_error(&self, error: &Error) -> String {
        format!("{}: {}", self.source_name, error)
    }

    /// `name: warning: line N: message`
    pub fn report_warning(&self, warning: &Warning) -> String {
        format!("{}: warning: {}: {}", self.source_name, warning.span, warning.message)
    }
}

/// A successfully analyzed program
#[derive(Debug, Clone)]
pub struct Compilation {
    pub root: Node,
    /// Comment text by line
    pub comments: BTreeMap<u32, String>,
    /// Warnings from every stage, in the order they were raised
    pub warnings: Vec<Warning>,
    /// Tokens read, end of input included
    pub token_count: usize,
}

/// Compile `source` into a validated tree
pub fn compile(source: &str, options: &CompileOptions) -> Result<Compilation> {
    log::debug!("compiling {}", options.source_name);

    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize()?;
    let mut warnings = lexer.take_warnings();
    let comments = lexer.take_comments();
    log::trace!("{} tokens", tokens.len());

    let mut parser = Parser::from_tokens(tokens);
    let token_count = parser.token_count();
    let mut root = parser.parse_program()?;
    warnings.extend(parser.take_warnings());

    warnings.extend(analyze(&mut root, options)?);

    Ok(Compilation {
        root,
        comments,
        warnings,
        token_count,
    })
}

/// Run the semantic passes over a parsed (or already analyzed) tree
pub fn analyze(root: &mut Node, options: &CompileOptions) -> Result<Vec<Warning>> {
    let mut analyzer = SemanticAnalyzer::new();
    analyzer.set_lenient_mode(options.lenient);
    analyzer.analyze(root)?;
    Ok(analyzer.take_warnings())
}
