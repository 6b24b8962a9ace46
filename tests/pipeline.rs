//! Integration tests for the compile pipeline.

use ncptl_front::frontend::ast::{Attr, MsgField, Node, NodeKind, TouchMode};
use ncptl_front::utils::{Span, WarningKind};
use ncptl_front::{analyze, compile, CompileOptions};
use pretty_assertions::assert_eq;

const PING_PONG: &str = r#"# A ping-pong latency test
require language version "1.5".

reps is "Number of repetitions" and comes from "--reps" or "-r" with default 1000.
msgsize is "Message size in bytes" and comes from "--bytes" or "-b" with default 0.

for reps repetitions plus 3 warmup repetitions {
  task 0 resets its counters then
  task 0 sends a msgsize byte message to task 1 then
  task 1 sends a msgsize byte message to task 0 then
  task 0 logs the mean and the median of elapsed_usecs/2 as "1/2 RTT (usecs)"
}
"#;

fn strict() -> CompileOptions {
    CompileOptions::default()
}

fn lenient() -> CompileOptions {
    CompileOptions {
        lenient: true,
        ..CompileOptions::default()
    }
}

fn find_kind(root: &Node, kind: NodeKind) -> &Node {
    root.find(&|n: &Node| n.kind == kind)
        .unwrap_or_else(|| panic!("no {:?} node", kind))
}

#[test]
fn test_ping_pong_pipeline() {
    let compilation = compile(PING_PONG, &strict()).expect("ping-pong should compile");
    let root = &compilation.root;

    assert!(compilation.warnings.is_empty(), "{:?}", compilation.warnings);
    assert_eq!(
        compilation.comments.get(&1).map(String::as_str),
        Some("# A ping-pong latency test")
    );

    let decls: Vec<&Node> = root.children.iter().filter(|c| c.kind == NodeKind::ParamDecl).collect();
    assert_eq!(decls.len(), 2);

    let repetitions = find_kind(root, NodeKind::ForCount);
    assert_eq!(repetitions.span, Span::new(7, 12));
    assert_eq!(repetitions.children[0].info.definition, Some(decls[0].children[0].id));

    let logged = find_kind(root, NodeKind::LogExprList);
    assert_eq!(logged.attr, Attr::Count(2));

    root.for_each(&mut |n| {
        assert!(n.span.is_valid(), "{:?} has span {:?}", n.kind, n.span);
        assert!(n.info.is_constant.is_some(), "{:?} has no constness", n.kind);
    });
}

#[test]
fn test_reanalysis_keeps_tree() {
    let mut compilation = compile(PING_PONG, &strict()).unwrap();
    let before = compilation.root.clone();

    let warnings = analyze(&mut compilation.root, &strict()).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(compilation.root.count_nodes(), before.count_nodes());
    assert!(compilation.root.same_shape(&before));
}

#[test]
fn test_abbreviated_receiver_inherits_every_field() {
    let source = "task 0 sends 3 unique 64 byte page aligned messages with verification \
                  to task 1 who receives them";
    let compilation = compile(source, &strict()).unwrap();
    let send = find_kind(&compilation.root, NodeKind::Send);
    let (sent, received) = (&send.children[1], &send.children[3]);

    let touching = &received.children[MsgField::Touching.index()];
    assert_eq!(touching.attr, Attr::Touch(TouchMode::Verify));
    assert!(touching.copied);

    let alignment = MsgField::Alignment.index();
    assert!(received.children[alignment].same_shape(&sent.children[alignment]));
    assert_ne!(received.children[alignment].id, sent.children[alignment].id);

    match &received.attr {
        Attr::Copied(fields) => {
            assert!(fields.contains(&MsgField::Touching));
            assert!(fields.contains(&MsgField::ItemCount));
        }
        other => panic!("unexpected attribute {:?}", other),
    }
}

#[test]
fn test_receiver_conflicts_only_on_written_clauses() {
    let source = "task 0 sends a 4 byte message from buffer 2 to task 1 who receives a unique 4 byte message";
    let compilation = compile(source, &strict()).expect(source);
    let send = find_kind(&compilation.root, NodeKind::Send);
    let received = &send.children[3];
    assert!(received.children[MsgField::Buffer.index()].copied);
    assert!(!received.children[MsgField::Uniqueness.index()].copied);

    let source = "task 0 sends a unique 4 byte message to task 1 who receives a 4 byte message into buffer 3";
    compile(source, &strict()).expect(source);

    let source = "task 0 sends a 4 byte message to task 1 who receives a unique 4 byte message into buffer 3";
    assert_eq!(
        compile(source, &strict()).unwrap_err().class(),
        "AttributeConflictError"
    );
}

#[test]
fn test_receive_binds_from_actor() {
    let source = "all tasks t receive a 4 byte message from task t + 1";
    let compilation = compile(source, &strict()).unwrap();
    let receive = find_kind(&compilation.root, NodeKind::Receive);

    let actor_var = &receive.children[0].children[0];
    assert!(actor_var.info.defines);
    let used = receive.children[2]
        .find(&|n: &Node| n.kind == NodeKind::Ident)
        .unwrap();
    assert_eq!(used.info.definition, Some(actor_var.id));
    assert!(compilation.warnings.is_empty());
}

#[test]
fn test_lenient_declares_in_first_use_order() {
    let source = "task 0 sends nmsgs 1 byte messages to task peer then \
                  task peer sends nmsgs 1 byte messages to task 0";
    assert_eq!(
        compile(source, &strict()).unwrap_err().class(),
        "UndeclaredVariableError"
    );

    let mut compilation = compile(source, &lenient()).unwrap();
    let root = &compilation.root;
    assert_eq!(root.attr, Attr::Count(3));

    let options: Vec<(&Attr, &Attr)> = root.children[..2]
        .iter()
        .map(|d| (&d.children[2].attr, &d.children[3].attr))
        .collect();
    assert_eq!(
        options,
        vec![
            (&Attr::Str("--nmsgs".into()), &Attr::Str("-n".into())),
            (&Attr::Str("--peer".into()), &Attr::Str("-p".into())),
        ]
    );
    assert_eq!(root.children[0].span, Span::line(1));

    // The declarations now exist, so a strict pass accepts the tree as is.
    let nodes = compilation.root.count_nodes();
    analyze(&mut compilation.root, &strict()).unwrap();
    assert_eq!(compilation.root.count_nodes(), nodes);
}

#[test]
fn test_fatal_diagnostic_classes() {
    let cases = [
        ("task 0 sends", "SyntaxError"),
        ("task 0 synchronizes @", "SyntaxError"),
        ("task undefined_thing synchronizes", "UndeclaredVariableError"),
        ("for each num_tasks in {1} task num_tasks synchronizes", "RedefinitionError"),
        (
            "all other tasks receive a 4 byte message from all other tasks",
            "ScopeAmbiguityError",
        ),
        (
            "task 0 sends a 8 byte page aligned message at offset 4 to task 1",
            "AttributeConflictError",
        ),
        ("all tasks reduce a word to task 0", "ReduceUsageError"),
        ("task random_uniform(0, 3) synchronizes", "RandomUsageError"),
        ("task my task synchronizes", "TaskExpressionError"),
        ("let n be bytes_sent while task n synchronizes", "LetBindingError"),
        (
            "x is \"x\" and comes from \"x\" or \"-x\" with default 1. task x synchronizes",
            "ParameterDeclarationError",
        ),
    ];
    for (source, class) in cases {
        let err = compile(source, &strict()).expect_err(source);
        assert_eq!(err.class(), class, "{}", source);
    }
}

#[test]
fn test_error_reports_line_span() {
    let source = "\n\ntask 0 sends a 8 byte page aligned message at offset 4 to task 1";
    let err = compile(source, &strict()).unwrap_err();
    assert_eq!(err.span(), Some(Span::line(3)));
}

#[test]
fn test_reports_carry_source_name() {
    let options = CompileOptions {
        source_name: "bench.ncptl".to_string(),
        ..CompileOptions::default()
    };
    let err = compile("\ntask x synchronizes", &options).unwrap_err();
    let report = options.report_error(&err);
    assert!(report.starts_with("bench.ncptl: line 2: "), "{}", report);

    let compilation = compile("for each i in {1, 2} task 0 synchronizes", &options).unwrap();
    assert_eq!(compilation.warnings.len(), 1);
    let report = options.report_warning(&compilation.warnings[0]);
    assert!(report.starts_with("bench.ncptl: warning: line 1: "), "{}", report);
}

#[test]
fn test_warnings_from_every_stage() {
    let source = "tasks t such that t is in [1, 3] synchronize then task 0 outputs \"a\\qb\"";
    let compilation = compile(source, &strict()).unwrap();
    let kinds: Vec<WarningKind> = compilation.warnings.iter().map(|w| w.kind).collect();
    assert_eq!(kinds, vec![WarningKind::UnknownEscape, WarningKind::DeprecatedSyntax]);
}

#[test]
fn test_integer_suffixes() {
    let compilation = compile(
        "task 0 sleeps for 10K microseconds then task 0 computes for 2G microseconds then task 12th synchronizes",
        &strict(),
    )
    .unwrap();
    let list = &compilation.root.children[0];
    assert_eq!(list.children[0].children[1].int_value(), Some(10240));
    assert_eq!(list.children[1].children[1].int_value(), Some(2147483648));
    assert_eq!(list.children[2].children[0].children[0].int_value(), Some(12));
}

#[test]
fn test_empty_program() {
    let compilation = compile("# nothing here\n", &strict()).unwrap();
    assert_eq!(compilation.root.kind, NodeKind::Program);
    assert_eq!(compilation.root.attr, Attr::Count(0));
    assert!(compilation.root.span.is_valid());
}

#[test]
fn test_tree_serializes() {
    let compilation = compile("task 0 synchronizes", &strict()).unwrap();
    let json = serde_json::to_value(&compilation.root).unwrap();
    assert_eq!(json["kind"], "Program");
    assert_eq!(json["children"][0]["kind"], "Sync");
    assert_eq!(json["children"][0]["text"], "task 0 synchronizes");
}
