//! Passes 1-4: annotation reset, spans, printable text, emptiness

use crate::frontend::ast::*;
use crate::utils::{Error, Result, Span};

/// Pass 1: give every node a fresh analysis record
pub(super) fn initialize(root: &mut Node) {
    root.for_each_mut(&mut |node| node.info = NodeInfo::default());
}

// ==================== Spans ====================

/// Unset spans take the union of the children's spans
struct SpansUp;

impl Visitor for SpansUp {
    fn post(&mut self, node: &mut Node) -> Result<()> {
        if node.span.is_unset() {
            node.span = node
                .children
                .iter()
                .fold(Span::unset(), |acc, child| acc.merge(&child.span));
        }
        Ok(())
    }
}

fn spans_down(node: &mut Node) {
    let span = node.span;
    for child in &mut node.children {
        if child.span.is_unset() {
            child.span = span;
        }
        spans_down(child);
    }
}

/// Pass 2: fill unset spans from children, then from parents
pub(super) fn propagate_spans(root: &mut Node) -> Result<()> {
    walk(root, &mut SpansUp)?;
    spans_down(root);

    match root.find(&|node: &Node| !node.span.is_valid()) {
        Some(node) => Err(Error::InternalInvariant {
            message: format!(
                "{:?} node \"{}\" has no valid line span ({}-{})",
                node.kind, node.text, node.span.start, node.span.end
            ),
            span: node.span,
        }),
        None => Ok(()),
    }
}

// ==================== Text ====================

struct TextUp;

impl Visitor for TextUp {
    fn post(&mut self, node: &mut Node) -> Result<()> {
        let silent_left = matches!(node.kind, NodeKind::EqExpr | NodeKind::RestrictedIdent)
            && node.children.first().map_or(false, |left| left.text.is_empty());

        if silent_left {
            // A synthesized variable prints as its membership test alone.
            node.text = join_text(node.children[1..].iter().map(|c| c.text.as_str()));
        } else if node.text.is_empty() && !node.children.is_empty() {
            node.text = join_text(node.children.iter().map(|c| c.text.as_str()));
        }
        Ok(())
    }
}

/// Pass 3: nodes without text take their children's
pub(super) fn propagate_text(root: &mut Node) -> Result<()> {
    walk(root, &mut TextUp)
}

// ==================== Emptiness ====================

/// Pass 4: decide which statements do nothing and discard their children.
/// Returns how many statements were found empty.
pub(super) fn propagate_emptiness(node: &mut Node) -> usize {
    let mut pruned = 0;
    for child in &mut node.children {
        pruned += propagate_emptiness(child);
    }
    if !node.kind.is_statement() {
        return pruned;
    }

    if node.kind == NodeKind::IfStmt
        && node.children.len() == 3
        && node.children[2].info.is_empty == Some(true)
    {
        node.children.pop();
    }

    let empty = match node.kind {
        NodeKind::EmptyStmt => true,
        NodeKind::ForTime => false,
        NodeKind::ForCount if node.attr == Attr::Flag(true) => false,
        kind if kind.is_compound_statement() => node
            .statements()
            .all(|stmt| stmt.info.is_empty == Some(true)),
        _ => false,
    };

    node.info.is_empty = Some(empty);
    if empty {
        node.children.clear();
        pruned += 1;
    }
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse_source;
    use pretty_assertions::assert_eq;

    fn settled(source: &str) -> Node {
        let mut root = parse_source(source).unwrap();
        initialize(&mut root);
        propagate_spans(&mut root).unwrap();
        propagate_text(&mut root).unwrap();
        root
    }

    #[test]
    fn test_fabricated_nodes_inherit_parent_span() {
        let root = settled("\n\ntask 0 sends a 4 byte message to task 1");
        let received = &root.children[0].children[3];
        assert_eq!(received.span, Span::line(3));
        assert!(received.children.iter().all(|c| c.span == Span::line(3)));
    }

    #[test]
    fn test_invalid_span_is_internal_error() {
        let mut root = parse_source("task 0 synchronizes").unwrap();
        root.children[0].children[0].span = Span::new(5, 2);
        let err = propagate_spans(&mut root).unwrap_err();
        assert_eq!(err.class(), "InternalInvariantError");
    }

    #[test]
    fn test_sugar_text() {
        let root = settled("task {1, 2} synchronizes");
        let restricted = &root.children[0].children[0].children[0];
        assert_eq!(restricted.kind, NodeKind::RestrictedIdent);
        assert_eq!(restricted.text, "{1, 2}");
        assert_eq!(root.children[0].text, "task {1, 2} synchronizes");
    }

    #[test]
    fn test_else_branch_dropped_when_empty() {
        let mut root = settled("if 1 = 1 then task 0 synchronizes otherwise { }");
        assert_eq!(propagate_emptiness(&mut root), 1);
        let stmt = &root.children[0];
        assert_eq!(stmt.children.len(), 2);
        assert_eq!(stmt.info.is_empty, Some(false));
    }

    #[test]
    fn test_nested_empty_blocks() {
        let mut root = settled("{ { } then { } } then task 0 synchronizes");
        propagate_emptiness(&mut root);
        let list = &root.children[0];
        assert_eq!(list.info.is_empty, Some(false));
        assert_eq!(list.children[0].info.is_empty, Some(true));
        assert!(list.children[0].children.is_empty());
    }
}
