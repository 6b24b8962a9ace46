//! Passes 10-15: validation
//!
//! These passes only read the tree, except parameter validation, which in
//! lenient mode declares the names that pass 8 could not resolve.

use std::collections::BTreeSet;

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::lexicon::{self, TASK_COUNT};
use crate::frontend::parser::Parser;
use crate::frontend::parser_message::field_specified;
use crate::frontend::token::DataType;
use crate::utils::{Error, Result, Span, Warning, WarningKind};

use super::{structure, try_for_each, SemanticAnalyzer};

/// First use of a predefined variable other than the task count
fn restricted_predefined(expr: &Node) -> Option<&Node> {
    expr.find(&|n: &Node| n.info.predefined && n.name() != Some(TASK_COUNT))
}

// ==================== Pass 10: Let Bindings ====================

/// Pass 10: let bindings may only read the task count among the predefined
/// variables
pub(super) fn check_let_bindings(root: &Node) -> Result<()> {
    try_for_each(root, &mut |node| {
        if node.kind != NodeKind::LetBinding {
            return Ok(());
        }
        match node.children.get(1).and_then(restricted_predefined) {
            Some(var) => Err(Error::LetBinding {
                message: format!(
                    "predefined variable \"{}\" cannot be bound with let",
                    var.text
                ),
                text: node.text.clone(),
                span: node.span,
            }),
            None => Ok(()),
        }
    })
}

// ==================== Pass 11: Parameters ====================

/// Names and options already claimed by parameter declarations
#[derive(Default)]
struct Declared {
    names: BTreeSet<String>,
    longs: BTreeSet<String>,
    shorts: BTreeSet<String>,
}

fn string_value(node: Option<&Node>) -> &str {
    match node.map(|n| &n.attr) {
        Some(Attr::Str(value)) => value,
        _ => "",
    }
}

fn is_long_option(option: &str) -> bool {
    match option.strip_prefix("--") {
        Some(rest) => {
            let mut chars = rest.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
                && chars.all(|c| c == '-' || c.is_ascii_lowercase() || c.is_ascii_digit())
        }
        None => false,
    }
}

fn is_short_option(option: &str) -> bool {
    let mut chars = option.chars();
    chars.next() == Some('-')
        && matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.next().is_none()
}

fn collect_declarations(root: &Node) -> Result<Declared> {
    let mut declared = Declared::default();

    for decl in root.children.iter().filter(|c| c.kind == NodeKind::ParamDecl) {
        let invalid = |message: String| Error::ParameterDeclaration {
            message,
            text: decl.text.clone(),
            span: decl.span,
        };
        let name = decl.children.first().and_then(Node::name).unwrap_or_default();
        let long = string_value(decl.children.get(2));
        let short = string_value(decl.children.get(3));

        if !is_long_option(long) {
            return Err(invalid(format!("\"{}\" is not a valid long option name", long)));
        }
        if !is_short_option(short) {
            return Err(invalid(format!("\"{}\" is not a valid short option name", short)));
        }
        if !declared.names.insert(name.to_string()) {
            return Err(invalid(format!("parameter \"{}\" is declared twice", name)));
        }
        if !declared.longs.insert(long.to_string()) {
            return Err(invalid(format!("option \"{}\" is used twice", long)));
        }
        if !declared.shorts.insert(short.to_string()) {
            return Err(invalid(format!("option \"{}\" is used twice", short)));
        }
        let circular = decl
            .children
            .get(4)
            .and_then(|d| d.find(&|n: &Node| n.name() == Some(name) && n.info.definition.is_none()));
        if circular.is_some() {
            return Err(invalid(format!("parameter \"{}\" cannot default to itself", name)));
        }
        if let Some(var) = decl.children.get(4).and_then(|d| d.find(&|n: &Node| n.info.predefined)) {
            return Err(invalid(format!(
                "predefined variable \"{}\" cannot be a default value",
                var.text
            )));
        }
    }
    Ok(declared)
}

/// `--name`, or `--name2`, `--name3`... when taken
fn free_long_option(name: &str, taken: &BTreeSet<String>) -> String {
    let spelled: String = name
        .chars()
        .map(|c| if c == '_' { '-' } else { c.to_ascii_lowercase() })
        .collect();
    let base = match spelled.trim_start_matches(|c: char| !c.is_ascii_lowercase()) {
        "" => "param",
        trimmed => trimmed,
    };

    let first = format!("--{}", base);
    if !taken.contains(&first) {
        return first;
    }
    (2..)
        .map(|n| format!("--{}{}", base, n))
        .find(|option| !taken.contains(option))
        .unwrap_or(first)
}

/// The name's own letters first, then the alphabet
fn free_short_option(name: &str, taken: &BTreeSet<String>) -> Option<String> {
    name.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .chain('a'..='z')
        .chain('A'..='Z')
        .map(|c| format!("-{}", c))
        .find(|option| !taken.contains(option))
}

impl SemanticAnalyzer {
    /// Pass 11: validate declared parameters, then declare whatever pass 8
    /// queued in lenient mode
    pub(super) fn check_parameters(&mut self, root: &mut Node) -> Result<()> {
        let mut declared = collect_declarations(root)?;

        let pending = std::mem::take(&mut self.pending);
        let mut first_uses: Vec<(String, Span)> = Vec::new();
        for usage in &pending {
            if !first_uses.iter().any(|(name, _)| name == &usage.name) {
                first_uses.push((usage.name.clone(), usage.span));
            }
        }

        for (name, span) in first_uses {
            let decl = self.declare_parameter(&name, span, &mut declared)?;
            let def = decl.children.first().map(|ident| ident.id);
            let uses: BTreeSet<NodeId> = pending
                .iter()
                .filter(|usage| usage.name == name)
                .map(|usage| usage.id)
                .collect();
            root.for_each_mut(&mut |node| {
                if uses.contains(&node.id) {
                    node.info.definition = def;
                }
            });

            // After the leading headers, ahead of the first statement.
            let position = root
                .children
                .iter()
                .position(|c| !matches!(c.kind, NodeKind::ParamDecl | NodeKind::VersionDecl))
                .unwrap_or(root.children.len());
            root.children.insert(position, decl);
            root.attr = Attr::Count(root.children.len());
        }
        Ok(())
    }

    /// Build a declaration for `name` by compiling a declaration string
    fn declare_parameter(&mut self, name: &str, span: Span, declared: &mut Declared) -> Result<Node> {
        let long = free_long_option(name, &declared.longs);
        let short = free_short_option(name, &declared.shorts).ok_or_else(|| {
            Error::ParameterDeclaration {
                message: "no single-letter option name is left".to_string(),
                text: name.to_string(),
                span,
            }
        })?;
        let source = format!(
            "{} is \"Automatically declared parameter {}\" and comes from \"{}\" or \"{}\" with default 0",
            name, name, long, short
        );
        log::debug!("declaring parameter: {}", source);

        let tokens = Lexer::new(&source).tokenize()?;
        let mut parser = Parser::with_ids(tokens, self.ids.clone());
        let mut decl = parser.parse_declaration()?;
        self.ids = parser.into_ids();

        decl.for_each_mut(&mut |node| node.span = span);
        structure::initialize(&mut decl);
        if let Some(ident) = decl.children.first_mut() {
            ident.info.defines = true;
            ident.info.used = true;
        }

        declared.names.insert(name.to_string());
        declared.longs.insert(long);
        declared.shorts.insert(short);
        Ok(decl)
    }
}

// ==================== Pass 12: Message Attributes ====================

fn check_spec(spec: &Node) -> Result<()> {
    if spec.children.len() != MsgField::ALL.len() {
        return Err(Error::InternalInvariant {
            message: format!(
                "message specification \"{}\" has {} fields",
                spec.text,
                spec.children.len()
            ),
            span: spec.span,
        });
    }
    let field = |f: MsgField| &spec.children[f.index()];
    let conflict = |message: &str| Error::AttributeConflict {
        message: message.to_string(),
        text: spec.text.clone(),
        span: spec.span,
    };

    if field_specified(field(MsgField::Alignment)) && field_specified(field(MsgField::BufferOffset)) {
        return Err(conflict("a message cannot be both aligned and offset"));
    }
    // Only clauses written on this side can contradict each other.
    let unique = field(MsgField::Uniqueness);
    let buffer = field(MsgField::Buffer);
    if unique.attr == Attr::Flag(true)
        && !unique.copied
        && buffer.attr == Attr::Buffer(BufferKind::Numbered)
        && !buffer.copied
    {
        return Err(conflict("a unique message cannot name a message buffer"));
    }
    Ok(())
}

fn verifies(spec: Option<&Node>) -> bool {
    spec.and_then(|s| s.children.get(MsgField::Touching.index()))
        .map_or(false, |t| t.attr == Attr::Touch(TouchMode::Verify))
}

/// Pass 12: reject contradictory message attributes
pub(super) fn check_message_attributes(root: &Node) -> Result<()> {
    try_for_each(root, &mut |node| match node.kind {
        NodeKind::MessageSpec => check_spec(node),
        NodeKind::Send if verifies(node.children.get(1)) != verifies(node.children.get(3)) => {
            Err(Error::AttributeConflict {
                message: "the sender and the receiver disagree on verification".to_string(),
                text: node.text.clone(),
                span: node.span,
            })
        }
        _ => Ok(()),
    })
}

// ==================== Pass 13: Random Values ====================

fn random_walk(node: &Node, context: Option<&'static str>) -> Result<()> {
    if let (Some(context), NodeKind::FuncCall, Attr::Name(name)) = (context, node.kind, &node.attr) {
        if lexicon::function(name).map_or(false, |f| f.random) {
            return Err(Error::RandomUsage {
                context: context.to_string(),
                text: node.text.clone(),
                span: node.span,
            });
        }
    }

    let kind = node.kind;
    let context = context.or(match kind {
        k if k.is_task_expr() => Some("in a task expression"),
        NodeKind::MessageSpec => Some("in a message specification"),
        _ => None,
    });
    for (index, child) in node.children.iter().enumerate() {
        let inner = match (kind, index) {
            (NodeKind::IfStmt, 0) => context.or(Some("in an if condition")),
            (NodeKind::LetBinding, 1) => context.or(Some("in a let binding")),
            _ => context,
        };
        random_walk(child, inner)?;
    }
    Ok(())
}

/// Pass 13: random values cannot select tasks, decide conditions, be bound
/// with let, or shape messages
pub(super) fn check_random_usage(root: &Node) -> Result<()> {
    random_walk(root, None)
}

// ==================== Pass 14: Task Expressions ====================

fn ensure_selectable(task: &Node, owner: &Node) -> Result<()> {
    match task.kind {
        NodeKind::TaskSingle | NodeKind::TaskAll | NodeKind::TaskRestricted | NodeKind::TaskGroup => {
            Ok(())
        }
        _ => Err(Error::TaskExpression {
            message: format!("\"{}\" cannot select the tasks here", task.text),
            text: owner.text.clone(),
            span: owner.span,
        }),
    }
}

impl SemanticAnalyzer {
    /// Pass 14: restrict where task expressions and `my task` may appear
    pub(super) fn check_task_expressions(&mut self, root: &Node) -> Result<()> {
        let mut groups = BTreeSet::new();
        root.for_each(&mut |node| {
            if node.kind == NodeKind::LetBinding && node.attr == Attr::Flag(true) {
                if let Some(ident) = node.children.first() {
                    groups.insert(ident.id);
                }
            }
        });
        self.task_walk(root, &groups, false)
    }

    fn task_walk(&mut self, node: &Node, groups: &BTreeSet<NodeId>, in_condition: bool) -> Result<()> {
        match node.kind {
            NodeKind::Receive => {}
            kind if kind.has_actor() => {
                if let Some(actor) = node.children.first() {
                    ensure_selectable(actor, node)?;
                }
            }
            NodeKind::LetBinding if node.attr == Attr::Flag(true) => {
                if let Some(value) = node.children.get(1) {
                    ensure_selectable(value, node)?;
                }
            }
            NodeKind::TaskGroup => {
                let ident = node.children.first();
                let is_group = ident
                    .and_then(|i| i.info.definition)
                    .map_or(false, |def| groups.contains(&def));
                if !is_group {
                    return Err(Error::TaskExpression {
                        message: format!(
                            "\"{}\" does not name a task group",
                            ident.map_or("", |i| i.text.as_str())
                        ),
                        text: node.text.clone(),
                        span: node.span,
                    });
                }
            }
            NodeKind::MyTask if !in_condition => {
                return Err(Error::TaskExpression {
                    message: "\"my task\" may only appear in the condition of an if statement"
                        .to_string(),
                    text: node.text.clone(),
                    span: node.span,
                });
            }
            NodeKind::MyTask if !self.my_task_warned => {
                self.my_task_warned = true;
                Warning::emit(
                    &mut self.warnings,
                    WarningKind::MyTaskAdvisory,
                    "conditions on \"my task\" make tasks take different branches".to_string(),
                    node.span,
                );
            }
            _ => {}
        }

        let kind = node.kind;
        for (index, child) in node.children.iter().enumerate() {
            let inside = in_condition || (kind == NodeKind::IfStmt && index == 0);
            self.task_walk(child, groups, inside)?;
        }
        Ok(())
    }
}

// ==================== Pass 15: Reductions ====================

fn element_type(spec: &Node) -> Option<DataType> {
    match spec.children.get(MsgField::Size.index()).map(|n| &n.attr) {
        Some(Attr::DataType(data_type)) => Some(*data_type),
        _ => None,
    }
}

fn element_count(spec: &Node) -> Option<&Node> {
    spec.children
        .get(MsgField::ItemCount.index())
        .and_then(|count| count.children.first())
}

fn check_reduce(node: &Node) -> Result<()> {
    let (source, target) = match (node.children.get(1), node.children.get(3)) {
        (Some(source), Some(target)) => (source, target),
        _ => return Ok(()),
    };
    let invalid = |message: String| Error::ReduceUsage {
        message,
        text: node.text.clone(),
        span: node.span,
    };

    let source_type = element_type(source);
    if !matches!(source_type, Some(DataType::Integer) | Some(DataType::Doubleword)) {
        return Err(invalid("only integers and doublewords can be reduced".to_string()));
    }
    if element_type(target) != source_type {
        return Err(invalid("source and target element types differ".to_string()));
    }
    if let (Some(sent), Some(received)) = (element_count(source), element_count(target)) {
        if !sent.same_shape(received) {
            return Err(invalid(format!(
                "{} items are reduced but {} are received",
                sent.text, received.text
            )));
        }
    }
    if verifies(Some(source)) || verifies(Some(target)) {
        return Err(invalid("reductions cannot be verified".to_string()));
    }
    Ok(())
}

/// Pass 15: reductions combine like with like
pub(super) fn check_reductions(root: &Node) -> Result<()> {
    try_for_each(root, &mut |node| match node.kind {
        NodeKind::Reduce => check_reduce(node),
        _ => Ok(()),
    })
}
