//! Passes 16-18: constants, processor-map use, aggregate splitting

use crate::frontend::ast::*;
use crate::frontend::lexicon::{self, TASK_COUNT};

fn is_random_call(node: &Node) -> bool {
    match (&node.kind, &node.attr) {
        (NodeKind::FuncCall, Attr::Name(name)) => lexicon::function(name).map_or(false, |f| f.random),
        _ => false,
    }
}

/// Pass 16: mark every node whose value is fixed before the program runs.
/// Returns whether `node` is constant.
pub(super) fn identify_constants(node: &mut Node) -> bool {
    // Children are always visited so that every node gets an answer.
    let children_constant = node
        .children
        .iter_mut()
        .fold(true, |acc, child| identify_constants(child) && acc);

    let constant = match node.kind {
        NodeKind::Integer | NodeKind::Str | NodeKind::Wildcard => true,
        NodeKind::Ident => node.info.defines || node.name() == Some(TASK_COUNT),
        NodeKind::MyTask => false,
        NodeKind::FuncCall if is_random_call(node) => false,
        NodeKind::Stride => match node.attr {
            Attr::Stride(StrideKind::Default) => true,
            Attr::Stride(StrideKind::Random) => false,
            _ => children_constant,
        },
        _ => children_constant,
    };
    node.info.is_constant = Some(constant);
    constant
}

/// Pass 17: flag every ancestor of a call that needs the processor map.
/// Returns whether `node` needs it.
pub(super) fn mark_processor_map(node: &mut Node) -> bool {
    let mut needs = match (&node.kind, &node.attr) {
        (NodeKind::FuncCall, Attr::Name(name)) => {
            lexicon::function(name).map_or(false, |f| f.processor_map)
        }
        _ => false,
    };
    for child in &mut node.children {
        needs |= mark_processor_map(child);
    }
    node.info.needs_processor_map = needs;
    needs
}

/// One copy of `item` per aggregate it names
fn split_item(item: &Node, ids: &mut IdGen) -> Vec<Node> {
    let aggregates = match &item.attr {
        Attr::Aggregates(aggregates) if aggregates.len() > 1 => aggregates,
        _ => return vec![item.clone()],
    };
    let expr = item.children.first().map_or("", |c| c.text.as_str());
    let description = item.children.get(1).map_or("", |c| c.text.as_str());

    aggregates
        .iter()
        .enumerate()
        .map(|(index, aggregate)| {
            let mut copy = if index == 0 { item.clone() } else { item.clone_fresh(ids) };
            copy.attr = Attr::Aggregates(vec![*aggregate]);
            copy.text = format!("the {} of {} as {}", aggregate, expr, description);
            copy
        })
        .collect()
}

/// Pass 18: give every logged expression a single aggregate. Returns the
/// number of expressions added.
pub(super) fn split_aggregates(node: &mut Node, ids: &mut IdGen) -> usize {
    let mut added = 0;
    for child in &mut node.children {
        added += split_aggregates(child, ids);
    }
    if node.kind != NodeKind::LogExprList {
        return added;
    }

    let before = node.children.len();
    let items = std::mem::take(&mut node.children);
    node.children = items.iter().flat_map(|item| split_item(item, ids)).collect();
    node.attr = Attr::Count(node.children.len());
    if node.children.len() > before {
        log::trace!("\"{}\" split into {} expressions", node.text, node.children.len());
    }
    added + node.children.len() - before
}
