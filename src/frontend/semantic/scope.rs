//! Passes 5-9: definitions, scopes, receive direction and uses
//!
//! Every node gets its own copy of the scope it is evaluated in. Binding forms
//! extend the copy handed to the children that can see the new name; the
//! acting task expression of a statement binds names for the rest of it.

use std::collections::BTreeSet;

use crate::frontend::ast::*;
use crate::frontend::lexicon;
use crate::utils::{Error, Result, Warning, WarningKind};

use super::PendingUse;

// ==================== Pass 5: Definitions ====================

struct Definitions;

impl Visitor for Definitions {
    fn pre(&mut self, node: &mut Node) -> Result<()> {
        let index = match node.kind {
            NodeKind::RestrictedIdent
            | NodeKind::LetBinding
            | NodeKind::ForEach
            | NodeKind::ParamDecl
            | NodeKind::TaskAll => 0,
            NodeKind::ListComp => 1,
            _ => return Ok(()),
        };
        let def = match node.children.get_mut(index) {
            Some(def) if def.kind == NodeKind::Ident => def,
            _ => return Ok(()),
        };

        def.info.defines = true;
        if let Some(name) = def.name() {
            if lexicon::is_predefined(name) {
                return Err(Error::Redefinition {
                    name: def.text.clone(),
                    what: "predefined variable".to_string(),
                    span: def.span,
                });
            }
        }
        Ok(())
    }
}

/// Pass 5: mark identifiers that introduce a name
pub(super) fn identify_definitions(root: &mut Node) -> Result<()> {
    walk(root, &mut Definitions)
}

// ==================== Pass 6: Scopes ====================

/// The name a task expression binds for the rest of its statement
pub(super) fn task_bindings(task: &Node) -> Vec<(String, NodeId)> {
    let ident = match task.kind {
        NodeKind::TaskRestricted => task.children.first().and_then(|r| r.children.first()),
        NodeKind::TaskAll => task.children.first(),
        _ => None,
    };
    ident_binding(ident)
}

fn ident_binding(ident: Option<&Node>) -> Vec<(String, NodeId)> {
    match ident {
        Some(ident) => match ident.name() {
            Some(name) => vec![(name.to_string(), ident.id)],
            None => Vec::new(),
        },
        None => Vec::new(),
    }
}

/// Which side of a receive sees the other side's bindings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flow {
    SourceToActor,
    ActorToSource,
}

/// Hand `scope` to `node`'s children, extended with `bindings` for the
/// children at the positions `sees` accepts
fn spread(node: &mut Node, scope: &Scope, bindings: &[(String, NodeId)], sees: impl Fn(usize) -> bool) {
    let inner = scope.extended(bindings);
    for (index, child) in node.children.iter_mut().enumerate() {
        let copy = if sees(index) { inner.clone() } else { scope.clone() };
        assign(child, copy);
    }
}

fn assign(node: &mut Node, scope: Scope) {
    node.info.scope = Some(scope.clone());

    match node.kind {
        NodeKind::Program => {
            let mut global = scope;
            for decl in node.children.iter().filter(|c| c.kind == NodeKind::ParamDecl) {
                if let Some(ident) = decl.children.first() {
                    if let Some(name) = ident.name() {
                        global.insert(name, ident.id);
                    }
                }
            }
            node.info.scope = Some(global.clone());
            for child in &mut node.children {
                // A default value cannot refer to the parameter it defaults.
                let own = match child.kind {
                    NodeKind::ParamDecl => child.children.first().and_then(Node::name).map(str::to_string),
                    _ => None,
                };
                match own {
                    Some(name) => assign(child, global.without(&name)),
                    None => assign(child, global.clone()),
                }
            }
        }
        NodeKind::LetStmt => {
            let mut current = scope.clone();
            if let Some(list) = node.children.first_mut() {
                list.info.scope = Some(scope);
                for binding in &mut list.children {
                    assign(binding, current.clone());
                    for (name, id) in ident_binding(binding.children.first()) {
                        current.insert(name, id);
                    }
                }
            }
            for child in node.children.iter_mut().skip(1) {
                assign(child, current.clone());
            }
        }
        NodeKind::ForEach => {
            let bindings = ident_binding(node.children.first());
            spread(node, &scope, &bindings, |i| i >= 2);
        }
        NodeKind::ListComp => {
            let bindings = ident_binding(node.children.get(1));
            spread(node, &scope, &bindings, |i| i == 0 || i >= 3);
        }
        NodeKind::RestrictedIdent => {
            let bindings = ident_binding(node.children.first());
            spread(node, &scope, &bindings, |i| i >= 1);
        }
        NodeKind::Receive => assign_receive(node, scope, Flow::SourceToActor),
        kind if kind.has_actor() => {
            let bindings = node.children.first().map(task_bindings).unwrap_or_default();
            spread(node, &scope, &bindings, |i| i >= 1);
        }
        _ => spread(node, &scope, &[], |_| false),
    }
}

/// Scopes of a receive's children: `[receiver, message, source]`. The message
/// sees both sides' bindings.
fn assign_receive(node: &mut Node, scope: Scope, flow: Flow) {
    node.info.scope = Some(scope.clone());
    let actor = node.children.first().map(task_bindings).unwrap_or_default();
    let source = node.children.get(2).map(task_bindings).unwrap_or_default();

    let both = scope.extended(&actor).extended(&source);
    let (actor_scope, source_scope) = match flow {
        Flow::SourceToActor => (scope.extended(&source), scope),
        Flow::ActorToSource => (scope.clone(), scope.extended(&actor)),
    };

    for (index, child) in node.children.iter_mut().enumerate() {
        let copy = match index {
            0 => actor_scope.clone(),
            2 => source_scope.clone(),
            _ => both.clone(),
        };
        assign(child, copy);
    }
}

/// Pass 6: give every node the scope it is evaluated in
pub(super) fn propagate_scopes(root: &mut Node) {
    assign(root, Scope::new());
}

// ==================== Pass 7: Receive Direction ====================

/// Names used in `task` that neither the enclosing scope, the expression's
/// own binding, nor the predefined variables account for
fn free_names(task: &Node, outer: &Scope, own: &[(String, NodeId)]) -> Vec<String> {
    let mut names = Vec::new();
    task.for_each(&mut |node| {
        if let Some(name) = node.name() {
            if !node.info.defines
                && outer.get(name).is_none()
                && !own.iter().any(|(bound, _)| bound == name)
                && !lexicon::is_predefined(name)
            {
                names.push(name.to_string());
            }
        }
    });
    names
}

fn receive_flow(node: &Node, outer: &Scope) -> Result<Flow> {
    let (actor, source) = match (node.children.first(), node.children.get(2)) {
        (Some(actor), Some(source)) => (actor, source),
        _ => return Ok(Flow::SourceToActor),
    };
    let ambiguous = |message: String| Error::ScopeAmbiguity {
        message,
        text: node.text.clone(),
        span: node.span,
    };

    if actor.kind == NodeKind::TaskAllOthers && source.kind == NodeKind::TaskAllOthers {
        return Err(ambiguous(
            "\"all other tasks\" cannot appear on both sides".to_string(),
        ));
    }

    let actor_binds = task_bindings(actor);
    let source_binds = task_bindings(source);
    match (!actor_binds.is_empty(), !source_binds.is_empty()) {
        (false, _) => Ok(Flow::SourceToActor),
        (true, false) => Ok(Flow::ActorToSource),
        (true, true) => {
            for (name, id) in &actor_binds {
                if source_binds.iter().any(|(other, other_id)| other == name && other_id != id) {
                    return Err(ambiguous(format!(
                        "\"{}\" is bound by both the receiver and the sender",
                        name
                    )));
                }
            }
            // First match wins: the receiver's free names are tried first.
            if any_bound(&free_names(actor, outer, &actor_binds), &source_binds) {
                Ok(Flow::SourceToActor)
            } else if any_bound(&free_names(source, outer, &source_binds), &actor_binds) {
                Ok(Flow::ActorToSource)
            } else {
                Ok(Flow::SourceToActor)
            }
        }
    }
}

fn any_bound(names: &[String], bindings: &[(String, NodeId)]) -> bool {
    names
        .iter()
        .any(|name| bindings.iter().any(|(bound, _)| bound == name))
}

/// Pass 7: decide which side of each receive binds names for the other
pub(super) fn resolve_receives(node: &mut Node) -> Result<()> {
    if node.kind != NodeKind::Receive {
        for child in &mut node.children {
            resolve_receives(child)?;
        }
        return Ok(());
    }

    let outer = node.info.scope.clone().unwrap_or_default();
    let flow = receive_flow(node, &outer)?;
    if flow != Flow::SourceToActor {
        log::trace!("receive \"{}\" binds from the receiver side", node.text);
        assign_receive(node, outer, flow);
    }
    Ok(())
}

// ==================== Pass 8: Uses ====================

struct Uses<'a> {
    lenient: bool,
    pending: &'a mut Vec<PendingUse>,
}

impl Visitor for Uses<'_> {
    fn pre(&mut self, node: &mut Node) -> Result<()> {
        if node.kind != NodeKind::Ident || node.info.defines {
            return Ok(());
        }
        let name = match node.name() {
            Some(name) => name.to_string(),
            None => return Ok(()),
        };

        let definition = node.info.scope.as_ref().and_then(|scope| scope.get(&name));
        if let Some(def) = definition {
            node.info.definition = Some(def);
        } else if lexicon::is_predefined(&name) {
            node.info.predefined = true;
        } else if self.lenient {
            log::debug!("queueing \"{}\" for automatic declaration", name);
            self.pending.push(PendingUse {
                name,
                id: node.id,
                span: node.span,
            });
        } else {
            return Err(Error::UndeclaredVariable {
                name: node.text.clone(),
                span: node.span,
            });
        }
        Ok(())
    }
}

/// Pass 8: link every identifier use to its definition
pub(super) fn check_uses(root: &mut Node, lenient: bool, pending: &mut Vec<PendingUse>) -> Result<()> {
    walk(root, &mut Uses { lenient, pending })
}

// ==================== Pass 9: Unused Definitions ====================

/// Pass 9: flag definitions that something refers to; warn about the rest
pub(super) fn mark_used(root: &mut Node, warnings: &mut Vec<Warning>) {
    let mut referenced = BTreeSet::new();
    root.for_each(&mut |node| {
        if let Some(def) = node.info.definition {
            referenced.insert(def);
        }
    });

    root.for_each_mut(&mut |node| {
        if !node.info.defines {
            return;
        }
        node.info.used = referenced.contains(&node.id);
        // Synthesized variables have no printable text and are never reported.
        if !node.info.used && !node.text.is_empty() {
            Warning::emit(
                warnings,
                WarningKind::UnusedDefinition,
                format!("\"{}\" is defined but never used", node.text),
                node.span,
            );
        }
    });
}
