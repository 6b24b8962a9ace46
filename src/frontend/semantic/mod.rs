//! Semantic Analyzer
//!
//! An ordered pipeline of whole-tree passes that annotate, validate, prune and
//! rewrite the tree produced by the parser. The order is load-bearing: spans
//! and text are settled before emptiness, definitions before scopes, scopes
//! before uses, and constants are identified on the final structure.
//!
//! - `structure`: passes 1-4 (annotations, spans, text, emptiness)
//! - `scope`: passes 5-9 (definitions, scopes, receive direction, uses)
//! - `validate`: passes 10-15 (bindings, parameters, messages, random values,
//!   task expressions, reductions)
//! - `rewrite`: passes 16-18 (constants, processor map, aggregate splitting)

mod rewrite;
mod scope;
mod structure;
mod validate;

use crate::frontend::ast::{IdGen, Node, NodeId};
use crate::utils::{Result, Span, Warning};

/// An undeclared name waiting for an automatic parameter declaration
#[derive(Debug, Clone)]
pub(crate) struct PendingUse {
    pub name: String,
    pub id: NodeId,
    pub span: Span,
}

/// Run context of one analysis
pub struct SemanticAnalyzer {
    lenient: bool,
    warnings: Vec<Warning>,
    /// The advisory about `my task` has been given
    my_task_warned: bool,
    ids: IdGen,
    pending: Vec<PendingUse>,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            lenient: false,
            warnings: Vec::new(),
            my_task_warned: false,
            ids: IdGen::new(),
            pending: Vec::new(),
        }
    }

    /// Declare undeclared variables as parameters instead of failing
    pub fn set_lenient_mode(&mut self, lenient: bool) {
        self.lenient = lenient;
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Run every pass over `root`. The first fatal diagnostic stops the
    /// pipeline.
    pub fn analyze(&mut self, root: &mut Node) -> Result<()> {
        self.ids = IdGen::after(root);
        self.pending.clear();

        log::debug!("pass 1: resetting annotations");
        structure::initialize(root);
        log::debug!("pass 2: propagating spans");
        structure::propagate_spans(root)?;
        log::debug!("pass 3: propagating printable text");
        structure::propagate_text(root)?;
        log::debug!("pass 4: propagating emptiness");
        let pruned = structure::propagate_emptiness(root);
        log::trace!("pruned {} empty statements", pruned);

        log::debug!("pass 5: identifying definitions");
        scope::identify_definitions(root)?;
        log::debug!("pass 6: propagating scopes");
        scope::propagate_scopes(root);
        log::debug!("pass 7: resolving receive direction");
        scope::resolve_receives(root)?;
        log::debug!("pass 8: checking uses");
        scope::check_uses(root, self.lenient, &mut self.pending)?;
        log::debug!("pass 9: marking used definitions");
        scope::mark_used(root, &mut self.warnings);

        log::debug!("pass 10: checking let bindings");
        validate::check_let_bindings(root)?;
        log::debug!("pass 11: checking parameter declarations");
        self.check_parameters(root)?;
        log::debug!("pass 12: checking message attributes");
        validate::check_message_attributes(root)?;
        log::debug!("pass 13: checking random values");
        validate::check_random_usage(root)?;
        log::debug!("pass 14: checking task expressions");
        self.check_task_expressions(root)?;
        log::debug!("pass 15: checking reductions");
        validate::check_reductions(root)?;

        log::debug!("pass 16: identifying constants");
        rewrite::identify_constants(root);
        log::debug!("pass 17: marking processor-map use");
        rewrite::mark_processor_map(root);
        log::debug!("pass 18: splitting aggregate lists");
        let split = rewrite::split_aggregates(root, &mut self.ids);
        log::trace!("split off {} logged expressions", split);

        Ok(())
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pre-order traversal that stops at the first error
pub(crate) fn try_for_each(node: &Node, f: &mut impl FnMut(&Node) -> Result<()>) -> Result<()> {
    f(node)?;
    for child in &node.children {
        try_for_each(child, f)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::ast::{Attr, NodeKind};
    use crate::frontend::parser::parse_source;
    use crate::frontend::token::Aggregate;
    use crate::utils::{Error, WarningKind};
    use pretty_assertions::assert_eq;

    fn run(source: &str, lenient: bool) -> Result<(Node, Vec<Warning>)> {
        let mut root = parse_source(source)?;
        let mut analyzer = SemanticAnalyzer::new();
        analyzer.set_lenient_mode(lenient);
        analyzer.analyze(&mut root)?;
        Ok((root, analyzer.take_warnings()))
    }

    fn accept(source: &str) -> (Node, Vec<Warning>) {
        run(source, false).unwrap()
    }

    fn reject(source: &str) -> Error {
        run(source, false).unwrap_err()
    }

    #[test]
    fn test_every_span_resolved() {
        let (root, _) = accept(
            "for 4 repetitions {\n task 0 sends a 4 byte message to task 1\n} then\n all tasks synchronize",
        );
        root.for_each(&mut |n| assert!(n.span.is_valid(), "{:?} {:?}", n.kind, n.span));
    }

    #[test]
    fn test_split_mean_and_maximum() {
        let (root, _) = accept("task 0 logs the mean and the maximum of elapsed_usecs as \"t\"");
        let list = &root.children[0].children[1];
        assert_eq!(list.kind, NodeKind::LogExprList);
        assert_eq!(list.attr, Attr::Count(2));
        assert_eq!(list.children[0].attr, Attr::Aggregates(vec![Aggregate::Mean]));
        assert_eq!(list.children[1].attr, Attr::Aggregates(vec![Aggregate::Maximum]));
        assert!(list.children[0].children[0].same_shape(&list.children[1].children[0]));
        assert_ne!(list.children[0].id, list.children[1].id);
    }

    #[test]
    fn test_all_others_on_both_sides() {
        let err = reject("all other tasks receive a 4 byte message from all other tasks");
        assert_eq!(err.class(), "ScopeAmbiguityError");
    }

    #[test]
    fn test_reduce_count_mismatch() {
        let err = reject("all tasks reduce 4 integers to task 0 who receives 8 integers");
        match err {
            Error::ReduceUsage { message, .. } => assert!(message.contains('4') && message.contains('8')),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_verification_mismatch() {
        let err = reject(
            "task 0 sends a 8 byte message with verification to task 1 who receives a 8 byte message",
        );
        assert_eq!(err.class(), "AttributeConflictError");

        accept("task 0 sends a 8 byte message with verification to task 1 who receives it");
    }

    #[test]
    fn test_undeclared_strict_and_lenient() {
        let source = "task 0 sends msgsize 1 byte messages to task 1";
        assert_eq!(reject(source).class(), "UndeclaredVariableError");

        let (root, _) = run(source, true).unwrap();
        let decl = &root.children[0];
        assert_eq!(decl.kind, NodeKind::ParamDecl);
        assert_eq!(decl.children[0].name(), Some("msgsize"));
        assert_eq!(decl.children[2].attr, Attr::Str("--msgsize".into()));
        assert_eq!(decl.children[3].attr, Attr::Str("-m".into()));
        assert_eq!(root.attr, Attr::Count(2));

        let count = &root.children[1].children[1].children[0].children[0];
        assert_eq!(count.info.definition, Some(decl.children[0].id));
    }

    #[test]
    fn test_lenient_avoids_taken_option_names() {
        let source = "m is \"x\" and comes from \"--msgsize\" or \"-m\" with default m_default_unused_free.\n\
                      task 0 sends msgsize 1 byte messages to task 1";
        // The default refers to an undeclared name, which gets declared too.
        let (root, _) = run(source, true).unwrap();
        let decls: Vec<&Node> = root.children.iter().filter(|c| c.kind == NodeKind::ParamDecl).collect();
        assert_eq!(decls.len(), 3);
        let longs: Vec<&Attr> = decls.iter().map(|d| &d.children[2].attr).collect();
        assert!(longs.contains(&&Attr::Str("--msgsize2".into())));
        let shorts: Vec<&Attr> = decls.iter().map(|d| &d.children[3].attr).collect();
        assert!(shorts.contains(&&Attr::Str("-s".into())));
    }

    #[test]
    fn test_default_naming_own_parameter() {
        let source = "n is \"n\" and comes from \"--n\" or \"-n\" with default n.\ntask n synchronizes";
        assert_eq!(reject(source).class(), "UndeclaredVariableError");

        let err = run(source, true).unwrap_err();
        assert_eq!(err.class(), "ParameterDeclarationError");
        assert!(err.to_string().contains("cannot default to itself"), "{}", err);

        let (root, _) = accept(
            "m is \"m\" and comes from \"--m\" or \"-m\" with default 2.\n\
             n is \"n\" and comes from \"--n\" or \"-n\" with default m * 2.\n\
             task n synchronizes",
        );
        let m_def = root.children[0].children[0].id;
        let m_use = root.children[1].children[4].find(&|n: &Node| n.name() == Some("m")).unwrap();
        assert_eq!(m_use.info.definition, Some(m_def));
    }

    #[test]
    fn test_lenient_declaration_precedes_first_statement() {
        let source = "task 0 sends nmsgs 1 byte messages to task 1.\n\
                      p is \"p\" and comes from \"--p\" or \"-p\" with default 1.\n\
                      task p synchronizes";
        let (root, _) = run(source, true).unwrap();
        let kinds: Vec<NodeKind> = root.children.iter().map(|c| c.kind).collect();
        assert_eq!(kinds[0], NodeKind::ParamDecl);
        assert_eq!(root.children[0].children[0].name(), Some("nmsgs"));
        assert_eq!(kinds[1], NodeKind::Send);
        assert_eq!(kinds[2], NodeKind::ParamDecl);
        assert_eq!(root.children[2].children[0].name(), Some("p"));
        assert_eq!(root.attr, Attr::Count(root.children.len()));
    }

    #[test]
    fn test_reanalysis_is_idempotent() {
        let source = "n is \"Count\" and comes from \"--n\" or \"-n\" with default 4.\n\
                      for n repetitions plus 1 warmup repetitions { } then\n\
                      if num_tasks > 1 then task 0 outputs \"a\\qb\" otherwise { }\n\
                      task 0 logs the mean and the median of elapsed_usecs as \"t\"";
        let (mut root, _) = accept(source);
        let nodes = root.count_nodes();
        let before = root.clone();

        let mut analyzer = SemanticAnalyzer::new();
        analyzer.analyze(&mut root).unwrap();
        assert_eq!(root.count_nodes(), nodes);
        assert!(root.same_shape(&before));
    }

    #[test]
    fn test_empty_statements_pruned() {
        let (root, _) = accept("for 3 repetitions { } then for 2 seconds { }");
        let list = &root.children[0];
        assert_eq!(list.info.is_empty, Some(false));
        assert_eq!(list.children[0].info.is_empty, Some(true));
        assert!(list.children[0].children.is_empty());
        assert_eq!(list.children[1].info.is_empty, Some(false));

        let (root, _) = accept(
            "for 3 repetitions plus 1 warmup repetitions and a synchronization { }",
        );
        assert_eq!(root.children[0].info.is_empty, Some(false));
    }

    #[test]
    fn test_unused_definition_warns() {
        let (_, warnings) = accept("for each i in {1, 2} all tasks synchronize");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::UnusedDefinition);
    }

    #[test]
    fn test_redefining_predefined_variable() {
        let err = reject("for each num_tasks in {1} task num_tasks synchronizes");
        assert_eq!(err.class(), "RedefinitionError");
    }

    #[test]
    fn test_my_task_only_in_conditions() {
        let (_, warnings) = accept(
            "if my task = 0 then task 0 synchronizes then if my task = 1 then task 1 synchronizes",
        );
        let advisories = warnings.iter().filter(|w| w.kind == WarningKind::MyTaskAdvisory).count();
        assert_eq!(advisories, 1);

        assert_eq!(reject("task my task synchronizes").class(), "TaskExpressionError");
    }

    #[test]
    fn test_random_usage_contexts() {
        let cases = [
            ("task random_uniform(0, 3) synchronizes", "in a task expression"),
            (
                "if random_uniform(0, 2) > 1 then task 0 synchronizes",
                "in an if condition",
            ),
            (
                "task 0 sends a random_uniform(1, 4) byte message to task 1",
                "in a message specification",
            ),
            (
                "let x be random_poisson(2) while task x synchronizes",
                "in a let binding",
            ),
        ];
        for (source, expected) in cases {
            match reject(source) {
                Error::RandomUsage { context, .. } => assert_eq!(context, expected, "{}", source),
                other => panic!("unexpected {:?} for {}", other, source),
            }
        }

        accept("task 0 sleeps for random_uniform(1, 5) seconds");
    }

    #[test]
    fn test_constants() {
        let (root, _) = accept(
            "n is \"n\" and comes from \"--n\" or \"-n\" with default 3.\n\
             task 0 computes for num_tasks * 2 seconds then task 0 computes for n seconds",
        );
        let list = &root.children[1];
        assert_eq!(list.children[0].children[1].info.is_constant, Some(true));
        assert_eq!(list.children[1].children[1].info.is_constant, Some(false));
    }

    #[test]
    fn test_processor_map_marks_ancestors() {
        let (root, _) = accept("task processor_of(0) synchronizes then all tasks synchronize");
        assert!(root.info.needs_processor_map);
        let list = &root.children[0];
        assert!(list.children[0].info.needs_processor_map);
        assert!(!list.children[1].info.needs_processor_map);
    }
}
