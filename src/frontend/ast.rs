//! Abstract Syntax Tree for the benchmark language
//!
//! The tree is uniform: every node carries a kind tag, an attribute payload,
//! positional children, a line span and its printable source text. Children
//! are owned, so pruning, splitting and splicing are local edits.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::frontend::token::{Aggregate, DataType, TimeUnit};
use crate::utils::{Result, Span};

/// Identity of a node within one compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub u32);

/// Grammar symbol a node was built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeKind {
    // ============ Top level ============
    Program,
    VersionDecl,
    ParamDecl,

    // ============ Statements ============
    StmtList,
    EmptyStmt,
    Block,
    ForCount,
    ForTime,
    ForEach,
    IfStmt,
    LetStmt,
    LetBindingList,
    LetBinding,
    Assert,
    Send,
    Receive,
    Multicast,
    Reduce,
    Sync,
    Await,
    Sleep,
    Compute,
    Touch,
    Output,
    OutputList,
    Log,
    LogExprList,
    LogExpr,
    Reset,

    // ============ Task expressions ============
    TaskSingle,
    TaskAll,
    TaskAllOthers,
    TaskRestricted,
    TaskGroup,
    RestrictedIdent,

    // ============ Message specifications ============
    MessageSpec,
    ItemCount,
    Uniqueness,
    MessageSize,
    Alignment,
    Touching,
    Tag,
    BufferOffset,
    Buffer,
    Stride,

    // ============ Expressions ============
    Ident,
    Integer,
    Str,
    Wildcard,
    MyTask,
    FuncCall,
    BinaryOp,
    UnaryOp,
    EqExpr,
    RelConj,
    RelDisj,
    RelNot,
    Range,
    RangeList,
    ListComp,
}

impl NodeKind {
    /// Kinds that stand for an executable statement
    pub fn is_statement(self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            StmtList
                | EmptyStmt
                | Block
                | ForCount
                | ForTime
                | ForEach
                | IfStmt
                | LetStmt
                | Assert
                | Send
                | Receive
                | Multicast
                | Reduce
                | Sync
                | Await
                | Sleep
                | Compute
                | Touch
                | Output
                | Log
                | Reset
        )
    }

    /// Statements that exist only to contain other statements
    pub fn is_compound_statement(self) -> bool {
        use NodeKind::*;
        matches!(self, StmtList | Block | ForCount | ForTime | ForEach | IfStmt | LetStmt)
    }

    pub fn is_task_expr(self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            TaskSingle | TaskAll | TaskAllOthers | TaskRestricted | TaskGroup
        )
    }

    /// Statements whose first child is the acting task expression
    pub fn has_actor(self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            Send | Receive
                | Multicast
                | Reduce
                | Sync
                | Await
                | Sleep
                | Compute
                | Touch
                | Output
                | Log
                | Reset
        )
    }
}

/// Operators carried by expression nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    Xor,
    Neg,
    Plus,
    Not,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Even,
    Odd,
    Divides,
    In,
    NotIn,
}

/// How a message buffer is aligned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlignKind {
    Unspecified,
    Page,
    /// Aligned to a multiple of the child expression in the given units
    Multiple(DataType),
}

/// How message contents are touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TouchMode {
    Default,
    Touch,
    NoTouch,
    Verify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BufferKind {
    Unspecified,
    Default,
    Numbered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StrideKind {
    Default,
    Random,
    Specified(DataType),
}

/// The eight positional fields of a message specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MsgField {
    ItemCount,
    Uniqueness,
    Size,
    Alignment,
    Touching,
    Tag,
    BufferOffset,
    Buffer,
}

impl MsgField {
    pub const ALL: [MsgField; 8] = [
        MsgField::ItemCount,
        MsgField::Uniqueness,
        MsgField::Size,
        MsgField::Alignment,
        MsgField::Touching,
        MsgField::Tag,
        MsgField::BufferOffset,
        MsgField::Buffer,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Communication flags of a point-to-point statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CommFlags {
    pub async_send: bool,
    pub async_recv: bool,
}

/// Per-kind attribute payload
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum Attr {
    #[default]
    None,
    Int(i64),
    Str(String),
    /// Canonical identifier or function name
    Name(String),
    /// Element count of a flattened list
    Count(usize),
    Flag(bool),
    Op(Op),
    DataType(DataType),
    TimeUnit(TimeUnit),
    Aggregates(Vec<Aggregate>),
    Align(AlignKind),
    Touch(TouchMode),
    Buffer(BufferKind),
    Stride(StrideKind),
    Comm(CommFlags),
    /// Fields of a message specification copied from its counterpart
    Copied(Vec<MsgField>),
}

// ==================== Scopes ====================

/// Names visible at a node, each mapped to the identifier that defines it
///
/// Always handed on by value; a subtree never shares its parent's map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    names: BTreeMap<String, NodeId>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn insert(&mut self, name: impl Into<String>, id: NodeId) {
        self.names.insert(name.into(), id);
    }

    /// A copy of this scope extended with the given bindings
    pub fn extended<'a>(&self, bindings: impl IntoIterator<Item = &'a (String, NodeId)>) -> Scope {
        let mut scope = self.clone();
        for (name, id) in bindings {
            scope.insert(name.clone(), *id);
        }
        scope
    }

    /// A copy of this scope with `name` hidden
    pub fn without(&self, name: &str) -> Scope {
        let mut scope = self.clone();
        scope.names.remove(name);
        scope
    }
}

// ==================== Analysis Record ====================

/// Annotations written by the semantic passes
///
/// Reset at the start of every analysis run; backends only read it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeInfo {
    #[serde(skip)]
    pub scope: Option<Scope>,
    pub is_constant: Option<bool>,
    /// This identifier introduces a name
    pub defines: bool,
    /// For identifier uses: the defining identifier
    pub definition: Option<NodeId>,
    /// For identifier uses: the name is a predefined variable
    pub predefined: bool,
    /// For definitions: referenced at least once
    pub used: bool,
    pub is_empty: Option<bool>,
    pub needs_processor_map: bool,
}

// ==================== Nodes ====================

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub attr: Attr,
    pub children: Vec<Node>,
    pub span: Span,
    pub text: String,
    /// Stands in for an omitted optional element
    pub fabricated: bool,
    /// Inherited from the paired half of a statement
    pub copied: bool,
    pub info: NodeInfo,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, attr: Attr) -> Self {
        Self {
            id,
            kind,
            attr,
            children: Vec::new(),
            span: Span::unset(),
            text: String::new(),
            fabricated: false,
            copied: false,
            info: NodeInfo::default(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match &self.attr {
            Attr::Name(name) if self.kind == NodeKind::Ident => Some(name),
            _ => None,
        }
    }

    pub fn int_value(&self) -> Option<i64> {
        match (&self.kind, &self.attr) {
            (NodeKind::Integer, Attr::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Statement children only
    pub fn statements(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter(|c| c.kind.is_statement())
    }

    /// Depth-first search for the first node satisfying `pred`
    pub fn find(&self, pred: &impl Fn(&Node) -> bool) -> Option<&Node> {
        if pred(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(pred))
    }

    /// Visit every node, parents before children
    pub fn for_each(&self, f: &mut impl FnMut(&Node)) {
        f(self);
        for child in &self.children {
            child.for_each(f);
        }
    }

    pub fn for_each_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }

    pub fn count_nodes(&self) -> usize {
        1 + self.children.iter().map(Node::count_nodes).sum::<usize>()
    }

    pub fn max_id(&self) -> NodeId {
        self.children
            .iter()
            .map(Node::max_id)
            .fold(self.id, std::cmp::max)
    }

    /// Structural equality: kind, attribute and children, ignoring ids,
    /// spans, text and annotations
    pub fn same_shape(&self, other: &Node) -> bool {
        self.kind == other.kind
            && self.attr == other.attr
            && self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.same_shape(b))
    }

    /// Deep copy with fresh ids; definition links internal to the copy are
    /// redirected to the copied definitions
    pub fn clone_fresh(&self, ids: &mut IdGen) -> Node {
        let mut remap = BTreeMap::new();
        let mut copy = self.clone();
        copy.renumber(ids, &mut remap);
        copy.relink(&remap);
        copy
    }

    fn renumber(&mut self, ids: &mut IdGen, remap: &mut BTreeMap<NodeId, NodeId>) {
        let fresh = ids.next();
        remap.insert(self.id, fresh);
        self.id = fresh;
        for child in &mut self.children {
            child.renumber(ids, remap);
        }
    }

    fn relink(&mut self, remap: &BTreeMap<NodeId, NodeId>) {
        if let Some(def) = self.info.definition {
            if let Some(new) = remap.get(&def) {
                self.info.definition = Some(*new);
            }
        }
        for child in &mut self.children {
            child.relink(remap);
        }
    }
}

/// Allocates node ids for one compilation
#[derive(Debug, Clone)]
pub struct IdGen {
    next: u32,
}

impl IdGen {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Continue numbering after an existing tree
    pub fn after(root: &Node) -> Self {
        Self {
            next: root.max_id().0 + 1,
        }
    }

    pub fn next(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdGen {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Printable Text ====================

/// Join fragments of printable text: no space before "." or ",", and
/// brackets of every shape hug their contents
pub fn join_text<'a>(pieces: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for piece in pieces {
        if piece.is_empty() {
            continue;
        }
        let hug = out.is_empty()
            || out.ends_with(|c| matches!(c, '(' | '{' | '['))
            || piece == "."
            || piece == ","
            || piece.starts_with(|c| matches!(c, ')' | '}' | ']'));
        if !hug {
            out.push(' ');
        }
        out.push_str(piece);
    }
    out
}

// ==================== Traversal ====================

/// A whole-tree pass: `pre` runs before a node's children, `post` after
pub trait Visitor {
    fn pre(&mut self, _node: &mut Node) -> Result<()> {
        Ok(())
    }

    fn post(&mut self, _node: &mut Node) -> Result<()> {
        Ok(())
    }
}

/// Visit self, recurse into children, then post-visit
pub fn walk<V: Visitor + ?Sized>(node: &mut Node, visitor: &mut V) -> Result<()> {
    visitor.pre(node)?;
    for child in &mut node.children {
        walk(child, visitor)?;
    }
    visitor.post(node)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(ids: &mut IdGen, kind: NodeKind, attr: Attr) -> Node {
        Node::new(ids.next(), kind, attr)
    }

    #[test]
    fn test_join_text_spacing() {
        assert_eq!(join_text(["x", "in", "(", "y", ",", "z", ")"]), "x in (y, z)");
        assert_eq!(join_text(["a", "", "b", "."]), "a b.");
        assert_eq!(join_text(["(", "(", "1", ")", ")"]), "((1))");
        assert_eq!(join_text(["{", "1", ",", "...", ",", "9", "}"]), "{1, ..., 9}");
    }

    #[test]
    fn test_same_shape_ignores_ids_and_text() {
        let mut ids = IdGen::new();
        let mut a = leaf(&mut ids, NodeKind::Integer, Attr::Int(1));
        a.text = "a".to_string();
        let mut b = leaf(&mut ids, NodeKind::Integer, Attr::Int(1));
        b.text = "1".to_string();
        assert!(a.same_shape(&b));
        let c = leaf(&mut ids, NodeKind::Integer, Attr::Int(2));
        assert!(!a.same_shape(&c));
    }

    #[test]
    fn test_clone_fresh_relinks_internal_definitions() {
        let mut ids = IdGen::new();
        let mut parent = leaf(&mut ids, NodeKind::ListComp, Attr::None);
        let def = leaf(&mut ids, NodeKind::Ident, Attr::Name("i".into()));
        let mut usage = leaf(&mut ids, NodeKind::Ident, Attr::Name("i".into()));
        usage.info.definition = Some(def.id);
        let outer = NodeId(999);
        let mut outer_use = leaf(&mut ids, NodeKind::Ident, Attr::Name("n".into()));
        outer_use.info.definition = Some(outer);
        parent.children = vec![usage, def, outer_use];

        let copy = parent.clone_fresh(&mut ids);
        assert_ne!(copy.id, parent.id);
        assert_eq!(copy.children[0].info.definition, Some(copy.children[1].id));
        assert_eq!(copy.children[2].info.definition, Some(outer));
    }

    #[test]
    fn test_scope_extension_copies() {
        let base = Scope::new();
        let extended = base.extended(&[("t".to_string(), NodeId(4))]);
        assert_eq!(extended.get("t"), Some(NodeId(4)));
        assert_eq!(base.get("t"), None);

        let hidden = extended.without("t");
        assert_eq!(hidden.get("t"), None);
        assert_eq!(extended.get("t"), Some(NodeId(4)));
    }
}
