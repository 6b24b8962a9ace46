//! Parser for the benchmark language
//!
//! Recursive descent over the token stream. Every rule hands the symbols it
//! matched to one node builder, which derives the node's span and printable
//! text; omitted optional clauses become fabricated placeholder nodes.
//! Expression rules live in `parser_expr`, message specifications in
//! `parser_message`.

use crate::frontend::ast::*;
use crate::frontend::lexer::Lexer;
use crate::frontend::token::{Aggregate, DataType, TimeUnit, Token, TokenKind};
use crate::utils::{Error, Result, Span, Warning};

/// One matched grammar symbol handed to the node builder
pub(crate) enum Piece {
    /// Index of a consumed token
    Tok(usize),
    Node(Node),
}

impl From<Node> for Piece {
    fn from(node: Node) -> Self {
        Piece::Node(node)
    }
}

/// The parser
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    pub(crate) ids: IdGen,
    pub(crate) warnings: Vec<Warning>,
    /// Counter for identifiers synthesized by sugar expansion
    pub(crate) synthetic: u32,
}

impl Parser {
    /// Tokenize `lexer`'s input and create a parser over it
    pub fn new(lexer: &mut Lexer) -> Result<Self> {
        Ok(Self::from_tokens(lexer.tokenize()?))
    }

    /// Create a parser from pre-tokenized input
    pub fn from_tokens(tokens: Vec<Token>) -> Self {
        Self::with_ids(tokens, IdGen::new())
    }

    /// Create a parser that numbers its nodes with `ids`
    pub fn with_ids(mut tokens: Vec<Token>, ids: IdGen) -> Self {
        if tokens.last().map(|t| &t.kind) != Some(&TokenKind::Eof) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::eof(line));
        }
        Self {
            tokens,
            pos: 0,
            ids,
            warnings: Vec::new(),
            synthetic: 0,
        }
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Hand back the id allocator so later tree edits keep ids unique
    pub fn into_ids(self) -> IdGen {
        self.ids
    }

    // ==================== Helper Methods ====================

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    /// Kind of the token `n` positions ahead
    pub(crate) fn peek_kind(&self, n: usize) -> &TokenKind {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    pub(crate) fn advance(&mut self) -> usize {
        let index = self.pos;
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        index
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.kind()) == std::mem::discriminant(kind)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.kind(), TokenKind::Eof)
    }

    pub(crate) fn unexpected(&self, expected: &str) -> Error {
        let token = self.current();
        let found = if token.spelling.is_empty() {
            token.kind.describe()
        } else {
            format!("\"{}\"", token.spelling)
        };
        Error::syntax(
            format!("expected {}, found {}", expected, found),
            Span::line(token.line),
        )
    }

    pub(crate) fn expect(&mut self, expected: TokenKind) -> Result<Piece> {
        if self.check(&expected) {
            Ok(Piece::Tok(self.advance()))
        } else {
            Err(self.unexpected(&expected.describe()))
        }
    }

    pub(crate) fn consume(&mut self, kind: &TokenKind) -> Option<Piece> {
        if self.check(kind) {
            Some(Piece::Tok(self.advance()))
        } else {
            None
        }
    }

    // ==================== Node Builder ====================

    /// Build a node from the symbols a production matched. Tokens contribute
    /// their line and spelling; nodes become children in order.
    pub(crate) fn build(&mut self, kind: NodeKind, attr: Attr, pieces: Vec<Piece>) -> Node {
        let mut node = Node::new(self.ids.next(), kind, attr);
        if pieces.is_empty() {
            node.fabricated = true;
            return node;
        }

        let mut texts = Vec::with_capacity(pieces.len());
        for piece in pieces {
            match piece {
                Piece::Tok(index) => {
                    let token = &self.tokens[index];
                    node.span = node.span.merge(&Span::line(token.line));
                    texts.push(token.spelling.clone());
                }
                Piece::Node(child) => {
                    node.span = node.span.merge(&child.span);
                    texts.push(child.text.clone());
                    node.children.push(child);
                }
            }
        }
        node.text = join_text(texts.iter().map(String::as_str));
        node
    }

    /// A placeholder for an optional element the input left out
    pub(crate) fn fabricate(&mut self, kind: NodeKind, attr: Attr) -> Node {
        self.build(kind, attr, Vec::new())
    }

    pub(crate) fn parse_ident(&mut self) -> Result<Node> {
        match self.kind().clone() {
            TokenKind::Ident(name) => {
                let tok = self.advance();
                Ok(self.build(NodeKind::Ident, Attr::Name(name), vec![Piece::Tok(tok)]))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    pub(crate) fn parse_string(&mut self) -> Result<Node> {
        match self.kind().clone() {
            TokenKind::Str(value) => {
                let tok = self.advance();
                Ok(self.build(NodeKind::Str, Attr::Str(value), vec![Piece::Tok(tok)]))
            }
            _ => Err(self.unexpected("string")),
        }
    }

    pub(crate) fn parse_data_type(&mut self) -> Result<(DataType, Piece)> {
        match *self.kind() {
            TokenKind::DataType(dt) => Ok((dt, Piece::Tok(self.advance()))),
            _ => Err(self.unexpected("data type")),
        }
    }

    pub(crate) fn parse_time_unit(&mut self) -> Result<(TimeUnit, Piece)> {
        match *self.kind() {
            TokenKind::TimeUnit(unit) => Ok((unit, Piece::Tok(self.advance()))),
            _ => Err(self.unexpected("time unit")),
        }
    }

    // ==================== Program ====================

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Node> {
        let mut pieces = Vec::new();

        while !self.is_at_end() {
            let item = match self.kind() {
                TokenKind::Require => self.parse_version_decl()?,
                TokenKind::Ident(_) if self.peek_kind(1) == &TokenKind::Is => {
                    self.parse_param_decl()?
                }
                _ => self.parse_stmt()?,
            };
            pieces.push(Piece::Node(item));
            self.consume(&TokenKind::Period);
        }

        let count = pieces.len();
        let mut program = self.build(NodeKind::Program, Attr::Count(count), pieces);
        if count == 0 {
            program.fabricated = false;
            program.span = Span::line(self.current().line);
        }
        log::debug!("parsed program with {} top-level items", count);
        Ok(program)
    }

    /// Parse exactly one parameter declaration and nothing else
    pub fn parse_declaration(&mut self) -> Result<Node> {
        let decl = self.parse_param_decl()?;
        self.consume(&TokenKind::Period);
        if !self.is_at_end() {
            return Err(self.unexpected("end of declaration"));
        }
        Ok(decl)
    }

    fn parse_version_decl(&mut self) -> Result<Node> {
        let mut pieces = vec![self.expect(TokenKind::Require)?];
        pieces.push(self.expect(TokenKind::Language)?);
        pieces.push(self.expect(TokenKind::Version)?);
        let version = match self.kind().clone() {
            TokenKind::Str(v) => v,
            _ => return Err(self.unexpected("version string")),
        };
        pieces.push(Piece::Tok(self.advance()));
        Ok(self.build(NodeKind::VersionDecl, Attr::Str(version), pieces))
    }

    /// `name is "desc" and comes from "--long" or "-s" with default expr`
    pub(crate) fn parse_param_decl(&mut self) -> Result<Node> {
        let ident = self.parse_ident()?;
        let is = self.expect(TokenKind::Is)?;
        let description = self.parse_string()?;
        let and = self.expect(TokenKind::And)?;
        let comes = self.expect(TokenKind::Comes)?;
        let from = self.expect(TokenKind::From)?;
        let long = self.parse_string()?;
        let or = self.expect(TokenKind::Or)?;
        let short = self.parse_string()?;
        let with = self.expect(TokenKind::With)?;
        let default = self.expect(TokenKind::Default)?;
        let value = self.parse_expr()?;
        Ok(self.build(
            NodeKind::ParamDecl,
            Attr::None,
            vec![
                ident.into(),
                is,
                description.into(),
                and,
                comes,
                from,
                long.into(),
                or,
                short.into(),
                with,
                default,
                value.into(),
            ],
        ))
    }

    // ==================== Statements ====================

    /// `simple_stmt ('then' simple_stmt)*`
    pub(crate) fn parse_stmt(&mut self) -> Result<Node> {
        let first = self.parse_simple_stmt()?;
        if !self.check(&TokenKind::Then) {
            return Ok(first);
        }

        let mut pieces = vec![Piece::Node(first)];
        let mut count = 1;
        while let Some(then) = self.consume(&TokenKind::Then) {
            pieces.push(then);
            pieces.push(self.parse_simple_stmt()?.into());
            count += 1;
        }
        Ok(self.build(NodeKind::StmtList, Attr::Count(count), pieces))
    }

    fn parse_simple_stmt(&mut self) -> Result<Node> {
        match self.kind() {
            TokenKind::For => self.parse_for(),
            TokenKind::If => self.parse_if(),
            TokenKind::Let => self.parse_let(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Assert => self.parse_assert(),
            TokenKind::Task | TokenKind::All => self.parse_task_stmt(),
            _ => Err(self.unexpected("statement")),
        }
    }

    fn parse_for(&mut self) -> Result<Node> {
        let for_tok = self.expect(TokenKind::For)?;

        if let Some(each) = self.consume(&TokenKind::Each) {
            let var = self.parse_ident()?;
            let in_tok = self.expect(TokenKind::In)?;
            let ranges = self.parse_range_list()?;
            let body = self.parse_simple_stmt()?;
            return Ok(self.build(
                NodeKind::ForEach,
                Attr::None,
                vec![for_tok, each, var.into(), in_tok, ranges.into(), body.into()],
            ));
        }

        let count = self.parse_expr()?;
        match *self.kind() {
            TokenKind::Repetitions => {
                let reps = Piece::Tok(self.advance());
                let mut pieces = vec![for_tok, count.into(), reps];
                let mut synchronized = false;
                let warmup = if let Some(plus) = self.consume(&TokenKind::Plus) {
                    pieces.push(plus);
                    let warmup = self.parse_expr()?;
                    let tail = vec![
                        self.expect(TokenKind::Warmup)?,
                        self.expect(TokenKind::Repetitions)?,
                    ];
                    pieces.push(warmup.into());
                    pieces.extend(tail);
                    if self.check(&TokenKind::And) && self.peek_kind(1) == &TokenKind::A {
                        pieces.push(Piece::Tok(self.advance()));
                        pieces.push(Piece::Tok(self.advance()));
                        pieces.push(self.expect(TokenKind::Synchronization)?);
                        synchronized = true;
                    }
                    None
                } else {
                    Some(self.fabricate(NodeKind::Integer, Attr::Int(0)))
                };
                // Keep children positional: count, warmup, body.
                if let Some(placeholder) = warmup {
                    pieces.insert(2, placeholder.into());
                }
                pieces.push(self.parse_simple_stmt()?.into());
                Ok(self.build(NodeKind::ForCount, Attr::Flag(synchronized), pieces))
            }
            TokenKind::TimeUnit(_) => {
                let (unit, unit_tok) = self.parse_time_unit()?;
                let body = self.parse_simple_stmt()?;
                Ok(self.build(
                    NodeKind::ForTime,
                    Attr::TimeUnit(unit),
                    vec![for_tok, count.into(), unit_tok, body.into()],
                ))
            }
            _ => Err(self.unexpected("\"repetitions\" or a time unit")),
        }
    }

    fn parse_if(&mut self) -> Result<Node> {
        let if_tok = self.expect(TokenKind::If)?;
        let cond = self.parse_rel_expr()?;
        let then = self.expect(TokenKind::Then)?;
        let body = self.parse_simple_stmt()?;
        let mut pieces = vec![if_tok, cond.into(), then, body.into()];
        if let Some(otherwise) = self.consume(&TokenKind::Otherwise) {
            pieces.push(otherwise);
            pieces.push(self.parse_simple_stmt()?.into());
        } else {
            pieces.push(self.fabricate(NodeKind::EmptyStmt, Attr::None).into());
        }
        Ok(self.build(NodeKind::IfStmt, Attr::None, pieces))
    }

    fn parse_let(&mut self) -> Result<Node> {
        let let_tok = self.expect(TokenKind::Let)?;

        let mut bindings = vec![Piece::Node(self.parse_let_binding()?)];
        let mut count = 1;
        while self.check(&TokenKind::And)
            && matches!(self.peek_kind(1), TokenKind::Ident(_))
            && self.peek_kind(2) == &TokenKind::Be
        {
            bindings.push(Piece::Tok(self.advance()));
            bindings.push(self.parse_let_binding()?.into());
            count += 1;
        }
        let list = self.build(NodeKind::LetBindingList, Attr::Count(count), bindings);

        let while_tok = self.expect(TokenKind::While)?;
        let body = self.parse_simple_stmt()?;
        Ok(self.build(
            NodeKind::LetStmt,
            Attr::None,
            vec![let_tok, list.into(), while_tok, body.into()],
        ))
    }

    /// `name be expr` or `name be task_expr`; the flag marks a task group
    fn parse_let_binding(&mut self) -> Result<Node> {
        let name = self.parse_ident()?;
        let be = self.expect(TokenKind::Be)?;
        let is_group = matches!(self.kind(), TokenKind::Task | TokenKind::All);
        let value = if is_group {
            self.parse_task_expr()?
        } else {
            self.parse_expr()?
        };
        Ok(self.build(
            NodeKind::LetBinding,
            Attr::Flag(is_group),
            vec![name.into(), be, value.into()],
        ))
    }

    fn parse_block(&mut self) -> Result<Node> {
        let open = self.expect(TokenKind::LBrace)?;
        if let Some(close) = self.consume(&TokenKind::RBrace) {
            return Ok(self.build(NodeKind::EmptyStmt, Attr::None, vec![open, close]));
        }
        let body = self.parse_stmt()?;
        let close = self.expect(TokenKind::RBrace)?;
        Ok(self.build(NodeKind::Block, Attr::None, vec![open, body.into(), close]))
    }

    fn parse_assert(&mut self) -> Result<Node> {
        let assert = self.expect(TokenKind::Assert)?;
        let that = self.expect(TokenKind::That)?;
        let message = self.parse_string()?;
        let with = self.expect(TokenKind::With)?;
        let cond = self.parse_rel_expr()?;
        Ok(self.build(
            NodeKind::Assert,
            Attr::None,
            vec![assert, that, message.into(), with, cond.into()],
        ))
    }

    /// Statements introduced by the task expression that performs them
    fn parse_task_stmt(&mut self) -> Result<Node> {
        let actor = self.parse_task_expr()?;
        let asynchronous = self.consume(&TokenKind::Asynchronously);

        match self.kind() {
            TokenKind::Sends => self.parse_send(actor, asynchronous),
            TokenKind::Receives => self.parse_receive(actor, asynchronous),
            _ if asynchronous.is_some() => Err(self.unexpected("\"sends\" or \"receives\"")),
            TokenKind::Multicasts => self.parse_multicast(actor),
            TokenKind::Reduces => self.parse_reduce(actor),
            TokenKind::Synchronizes => {
                let verb = Piece::Tok(self.advance());
                Ok(self.build(NodeKind::Sync, Attr::None, vec![actor.into(), verb]))
            }
            TokenKind::Awaits => {
                let verb = Piece::Tok(self.advance());
                let completion = self.expect(TokenKind::Completion)?;
                Ok(self.build(
                    NodeKind::Await,
                    Attr::None,
                    vec![actor.into(), verb, completion],
                ))
            }
            TokenKind::Sleeps | TokenKind::Computes => {
                let kind = if self.check(&TokenKind::Sleeps) {
                    NodeKind::Sleep
                } else {
                    NodeKind::Compute
                };
                let verb = Piece::Tok(self.advance());
                let for_tok = self.expect(TokenKind::For)?;
                let duration = self.parse_expr()?;
                let (unit, unit_tok) = self.parse_time_unit()?;
                Ok(self.build(
                    kind,
                    Attr::TimeUnit(unit),
                    vec![actor.into(), verb, for_tok, duration.into(), unit_tok],
                ))
            }
            TokenKind::Touches => self.parse_touch(actor),
            TokenKind::Outputs => self.parse_output(actor),
            TokenKind::Logs => self.parse_log(actor),
            TokenKind::Resets => {
                let verb = Piece::Tok(self.advance());
                let its = self.expect(TokenKind::Its)?;
                let counters = self.expect(TokenKind::Counters)?;
                Ok(self.build(
                    NodeKind::Reset,
                    Attr::None,
                    vec![actor.into(), verb, its, counters],
                ))
            }
            _ => Err(self.unexpected("an action such as \"sends\" or \"logs\"")),
        }
    }

    /// `touches count size TYPE memory region [with random stride | with stride e TYPE]`
    fn parse_touch(&mut self, actor: Node) -> Result<Node> {
        let verb = self.expect(TokenKind::Touches)?;
        let count = self.parse_item_count()?;
        let size_expr = self.parse_expr()?;
        let (data_type, type_tok) = self.parse_data_type()?;
        let size = self.build(
            NodeKind::MessageSize,
            Attr::DataType(data_type),
            vec![size_expr.into(), type_tok],
        );
        let memory = self.expect(TokenKind::Memory)?;
        let region = self.expect(TokenKind::Region)?;

        let stride = if self.check(&TokenKind::With) {
            let with = Piece::Tok(self.advance());
            if let Some(random) = self.consume(&TokenKind::Random) {
                let stride_tok = self.expect(TokenKind::Stride)?;
                self.build(
                    NodeKind::Stride,
                    Attr::Stride(StrideKind::Random),
                    vec![with, random, stride_tok],
                )
            } else {
                let stride_tok = self.expect(TokenKind::Stride)?;
                let amount = self.parse_expr()?;
                let (unit, unit_tok) = self.parse_data_type()?;
                self.build(
                    NodeKind::Stride,
                    Attr::Stride(StrideKind::Specified(unit)),
                    vec![with, stride_tok, amount.into(), unit_tok],
                )
            }
        } else {
            self.fabricate(NodeKind::Stride, Attr::Stride(StrideKind::Default))
        };

        Ok(self.build(
            NodeKind::Touch,
            Attr::None,
            vec![
                actor.into(),
                verb,
                count.into(),
                size.into(),
                memory,
                region,
                stride.into(),
            ],
        ))
    }

    fn parse_output(&mut self, actor: Node) -> Result<Node> {
        let verb = self.expect(TokenKind::Outputs)?;
        let mut items = Vec::new();
        let mut count = 0;
        loop {
            let item = if self.check(&TokenKind::Str(String::new())) {
                self.parse_string()?
            } else {
                self.parse_expr()?
            };
            items.push(Piece::Node(item));
            count += 1;
            match self.consume(&TokenKind::And) {
                Some(and) => items.push(and),
                None => break,
            }
        }
        let list = self.build(NodeKind::OutputList, Attr::Count(count), items);
        Ok(self.build(NodeKind::Output, Attr::None, vec![actor.into(), verb, list.into()]))
    }

    fn parse_log(&mut self, actor: Node) -> Result<Node> {
        let verb = self.expect(TokenKind::Logs)?;
        let mut items = Vec::new();
        let mut count = 0;
        loop {
            items.push(Piece::Node(self.parse_log_expr()?));
            count += 1;
            match self.consume(&TokenKind::And) {
                Some(and) => items.push(and),
                None => break,
            }
        }
        let list = self.build(NodeKind::LogExprList, Attr::Count(count), items);
        Ok(self.build(NodeKind::Log, Attr::None, vec![actor.into(), verb, list.into()]))
    }

    /// `[the AGG (and the AGG)* of] expr as "description"`
    fn parse_log_expr(&mut self) -> Result<Node> {
        let mut pieces = Vec::new();
        let mut aggregates = Vec::new();

        if self.check(&TokenKind::The) {
            loop {
                pieces.push(self.expect(TokenKind::The)?);
                aggregates.push(self.parse_aggregate(&mut pieces)?);
                if self.check(&TokenKind::And) && self.peek_kind(1) == &TokenKind::The {
                    pieces.push(Piece::Tok(self.advance()));
                } else {
                    break;
                }
            }
            pieces.push(self.expect(TokenKind::Of)?);
        }

        pieces.push(self.parse_expr()?.into());
        pieces.push(self.expect(TokenKind::As)?);
        pieces.push(self.parse_string()?.into());
        Ok(self.build(NodeKind::LogExpr, Attr::Aggregates(aggregates), pieces))
    }

    fn parse_aggregate(&mut self, pieces: &mut Vec<Piece>) -> Result<Aggregate> {
        let qualified = match self.kind() {
            TokenKind::Arithmetic => Some(Aggregate::Mean),
            TokenKind::Harmonic => Some(Aggregate::HarmonicMean),
            TokenKind::Geometric => Some(Aggregate::GeometricMean),
            _ => None,
        };
        if let Some(aggregate) = qualified {
            pieces.push(Piece::Tok(self.advance()));
            if self.kind() != &TokenKind::Aggregate(Aggregate::Mean) {
                return Err(self.unexpected("\"mean\""));
            }
            pieces.push(Piece::Tok(self.advance()));
            return Ok(aggregate);
        }

        match *self.kind() {
            TokenKind::Standard => {
                pieces.push(Piece::Tok(self.advance()));
                pieces.push(self.expect(TokenKind::Deviation)?);
                Ok(Aggregate::StandardDeviation)
            }
            TokenKind::Aggregate(aggregate) => {
                pieces.push(Piece::Tok(self.advance()));
                Ok(aggregate)
            }
            _ => Err(self.unexpected("aggregate function")),
        }
    }
}

/// Tokenize and parse a complete source text
pub fn parse_source(source: &str) -> Result<Node> {
    let mut lexer = Lexer::new(source);
    let mut parser = Parser::new(&mut lexer)?;
    parser.parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Node {
        parse_source(source).unwrap()
    }

    fn first_stmt(source: &str) -> Node {
        parse(source).children.remove(0)
    }

    #[test]
    fn test_empty_program() {
        let program = parse("");
        assert_eq!(program.kind, NodeKind::Program);
        assert!(program.children.is_empty());
        assert!(program.span.is_valid());
    }

    #[test]
    fn test_param_decl() {
        let program = parse(
            "reps is \"Number of repetitions\" and comes from \"--reps\" or \"-r\" with default 10K.",
        );
        let decl = &program.children[0];
        assert_eq!(decl.kind, NodeKind::ParamDecl);
        assert_eq!(decl.children.len(), 5);
        assert_eq!(decl.children[0].name(), Some("reps"));
        assert_eq!(decl.children[4].int_value(), Some(10240));
    }

    #[test]
    fn test_statement_list_is_flat() {
        let stmt = first_stmt("task 0 synchronizes then task 1 synchronizes then all tasks synchronize");
        assert_eq!(stmt.kind, NodeKind::StmtList);
        assert_eq!(stmt.attr, Attr::Count(3));
        assert_eq!(stmt.children.len(), 3);
        assert!(stmt.children.iter().all(|c| c.kind == NodeKind::Sync));
    }

    #[test]
    fn test_for_count_fabricates_warmup() {
        let stmt = first_stmt("for 10 repetitions task 0 synchronizes");
        assert_eq!(stmt.kind, NodeKind::ForCount);
        assert_eq!(stmt.attr, Attr::Flag(false));
        assert!(stmt.children[1].fabricated);
        assert_eq!(stmt.children[1].int_value(), Some(0));

        let stmt = first_stmt(
            "for 10 repetitions plus 2 warmup repetitions and a synchronization task 0 synchronizes",
        );
        assert_eq!(stmt.attr, Attr::Flag(true));
        assert_eq!(stmt.children[1].int_value(), Some(2));
        assert_eq!(stmt.children[2].kind, NodeKind::Sync);
    }

    #[test]
    fn test_for_time_and_each() {
        let stmt = first_stmt("for 3 seconds all tasks synchronize");
        assert_eq!(stmt.kind, NodeKind::ForTime);
        assert_eq!(stmt.attr, Attr::TimeUnit(TimeUnit::Seconds));

        let stmt = first_stmt("for each i in {1, 2, 4, ..., 64} task i synchronizes");
        assert_eq!(stmt.kind, NodeKind::ForEach);
        assert_eq!(stmt.children[0].name(), Some("i"));
        assert_eq!(stmt.children[1].kind, NodeKind::RangeList);
    }

    #[test]
    fn test_if_without_else_gets_placeholder() {
        let stmt = first_stmt("if num_tasks > 2 then task 0 synchronizes");
        assert_eq!(stmt.kind, NodeKind::IfStmt);
        assert_eq!(stmt.children.len(), 3);
        assert_eq!(stmt.children[2].kind, NodeKind::EmptyStmt);
        assert!(stmt.children[2].fabricated);
    }

    #[test]
    fn test_let_chain_and_group() {
        let stmt = first_stmt(
            "let x be 3 and evens be tasks e such that e is even and y be x + 1 while task group evens synchronizes",
        );
        assert_eq!(stmt.kind, NodeKind::LetStmt);
        let list = &stmt.children[0];
        assert_eq!(list.attr, Attr::Count(3));
        assert_eq!(list.children[1].attr, Attr::Flag(true));
        assert_eq!(list.children[1].children[1].kind, NodeKind::TaskRestricted);
        assert_eq!(stmt.children[1].children[0].kind, NodeKind::TaskGroup);
    }

    #[test]
    fn test_log_aggregates() {
        let stmt = first_stmt(
            "task 0 logs the mean and the maximum of elapsed_usecs as \"Time\" and bytes_sent as \"Bytes\"",
        );
        assert_eq!(stmt.kind, NodeKind::Log);
        let list = &stmt.children[1];
        assert_eq!(list.attr, Attr::Count(2));
        assert_eq!(
            list.children[0].attr,
            Attr::Aggregates(vec![Aggregate::Mean, Aggregate::Maximum])
        );
        assert_eq!(list.children[1].attr, Attr::Aggregates(vec![]));
    }

    #[test]
    fn test_multiword_aggregates() {
        let stmt = first_stmt(
            "task 0 logs the harmonic mean and the standard deviation of elapsed_usecs as \"t\"",
        );
        assert_eq!(
            stmt.children[1].children[0].attr,
            Attr::Aggregates(vec![Aggregate::HarmonicMean, Aggregate::StandardDeviation])
        );
    }

    #[test]
    fn test_touch_stride() {
        let stmt = first_stmt("all tasks touch a 1M byte memory region with stride 64 bytes");
        assert_eq!(stmt.kind, NodeKind::Touch);
        assert_eq!(
            stmt.children[3].attr,
            Attr::Stride(StrideKind::Specified(DataType::Byte))
        );
        let stmt = first_stmt("all tasks touch a 1M byte memory region");
        assert!(stmt.children[3].fabricated);
    }

    #[test]
    fn test_printable_text() {
        let stmt = first_stmt("task 0 outputs \"x=\" and max(1, (2))");
        assert_eq!(stmt.text, "task 0 outputs \"x=\" and max(1, (2))");
    }

    #[test]
    fn test_span_covers_lines() {
        let stmt = first_stmt("for 2 repetitions {\n  task 0 synchronizes\n}");
        assert_eq!(stmt.span, Span::new(1, 3));
        assert_eq!(stmt.children[2].children[0].span, Span::line(2));
    }

    #[test]
    fn test_syntax_error_names_token() {
        match parse_source("task 0 jumps") {
            Err(Error::Syntax { message, span }) => {
                assert!(message.contains("\"jumps\""));
                assert_eq!(span, Span::line(1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_declaration_only() {
        let mut lexer = Lexer::new("n is \"x\" and comes from \"--n\" or \"-n\" with default 0");
        let mut parser = Parser::new(&mut lexer).unwrap();
        assert_eq!(parser.parse_declaration().unwrap().kind, NodeKind::ParamDecl);

        let mut lexer = Lexer::new("n is \"x\" and comes from \"--n\" or \"-n\" with default 0 task");
        let mut parser = Parser::new(&mut lexer).unwrap();
        assert!(parser.parse_declaration().is_err());
    }
}
