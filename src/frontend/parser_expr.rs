//! Expression, relation, range and task-expression rules

use crate::frontend::ast::*;
use crate::frontend::lexicon;
use crate::frontend::parser::{Parser, Piece};
use crate::frontend::token::TokenKind;
use crate::utils::{Error, Result, Span, Warning, WarningKind};

impl Parser {
    // ==================== Arithmetic ====================

    /// `mul (('+' | '-' | '|' | 'xor') mul)*`
    pub(crate) fn parse_expr(&mut self) -> Result<Node> {
        let mut left = self.parse_mul_expr()?;
        loop {
            let op = match self.kind() {
                TokenKind::Add => Op::Add,
                TokenKind::Sub => Op::Sub,
                TokenKind::Pipe => Op::BitOr,
                TokenKind::Xor => Op::Xor,
                _ => return Ok(left),
            };
            let tok = Piece::Tok(self.advance());
            let right = self.parse_mul_expr()?;
            left = self.build(NodeKind::BinaryOp, Attr::Op(op), vec![left.into(), tok, right.into()]);
        }
    }

    fn parse_mul_expr(&mut self) -> Result<Node> {
        let mut left = self.parse_power_expr()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => Op::Mul,
                TokenKind::Slash => Op::Div,
                TokenKind::Mod => Op::Mod,
                TokenKind::Shl => Op::Shl,
                TokenKind::Shr => Op::Shr,
                TokenKind::Ampersand => Op::BitAnd,
                _ => return Ok(left),
            };
            let tok = Piece::Tok(self.advance());
            let right = self.parse_power_expr()?;
            left = self.build(NodeKind::BinaryOp, Attr::Op(op), vec![left.into(), tok, right.into()]);
        }
    }

    /// `**` binds right to left
    fn parse_power_expr(&mut self) -> Result<Node> {
        let base = self.parse_unary_expr()?;
        match self.consume(&TokenKind::Power) {
            Some(tok) => {
                let exponent = self.parse_power_expr()?;
                Ok(self.build(
                    NodeKind::BinaryOp,
                    Attr::Op(Op::Pow),
                    vec![base.into(), tok, exponent.into()],
                ))
            }
            None => Ok(base),
        }
    }

    /// Unary operators applied to an integer literal fold into the literal
    fn parse_unary_expr(&mut self) -> Result<Node> {
        let op = match self.kind() {
            TokenKind::Add => Op::Plus,
            TokenKind::Sub => Op::Neg,
            TokenKind::Not => Op::Not,
            _ => return self.parse_primary(),
        };
        let tok = self.advance();
        let mut operand = self.parse_unary_expr()?;

        if let Some(value) = operand.int_value() {
            let line = self.tokens[tok].line;
            operand.span = operand.span.merge(&Span::line(line));
            match op {
                Op::Neg => {
                    operand.attr = Attr::Int(value.wrapping_neg());
                    operand.text = format!("-{}", operand.text);
                }
                Op::Not => {
                    operand.attr = Attr::Int((value == 0) as i64);
                    operand.text = format!("not {}", operand.text);
                }
                _ => {}
            }
            return Ok(operand);
        }

        Ok(self.build(NodeKind::UnaryOp, Attr::Op(op), vec![Piece::Tok(tok), operand.into()]))
    }

    fn parse_primary(&mut self) -> Result<Node> {
        match self.kind().clone() {
            TokenKind::Integer(value) => {
                let tok = self.advance();
                Ok(self.build(NodeKind::Integer, Attr::Int(value), vec![Piece::Tok(tok)]))
            }
            TokenKind::Ident(name) => {
                if self.peek_kind(1) == &TokenKind::LParen {
                    self.parse_call(name)
                } else {
                    self.parse_ident()
                }
            }
            TokenKind::LParen => {
                let open = self.advance();
                let mut inner = self.parse_expr()?;
                let close = self.expect(TokenKind::RParen)?;
                self.wrap_parens(&mut inner, open, close);
                Ok(inner)
            }
            TokenKind::My => {
                let my = Piece::Tok(self.advance());
                let task = self.expect(TokenKind::Task)?;
                Ok(self.build(NodeKind::MyTask, Attr::None, vec![my, task]))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Fold surrounding parentheses into a node's span and text
    pub(crate) fn wrap_parens(&self, node: &mut Node, open: usize, close: Piece) {
        node.span = node.span.merge(&Span::line(self.tokens[open].line));
        if let Piece::Tok(close) = close {
            node.span = node.span.merge(&Span::line(self.tokens[close].line));
        }
        node.text = format!("({})", node.text);
    }

    /// `name(arg, ...)`; arguments may be `*` for functions that accept it
    fn parse_call(&mut self, name: String) -> Result<Node> {
        let line = self.current().line;
        let spelling = self.current().spelling.clone();
        let name_tok = Piece::Tok(self.advance());
        let function = lexicon::function(&name).ok_or_else(|| {
            Error::syntax(format!("unknown function \"{}\"", spelling), Span::line(line))
        })?;

        let mut pieces = vec![name_tok, self.expect(TokenKind::LParen)?];
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                let arg = if self.check(&TokenKind::Wildcard) {
                    let tok = self.advance();
                    self.build(NodeKind::Wildcard, Attr::None, vec![Piece::Tok(tok)])
                } else {
                    self.parse_expr()?
                };
                args.push(arg.text.clone());
                pieces.push(arg.into());
                match self.consume(&TokenKind::Comma) {
                    Some(comma) => pieces.push(comma),
                    None => break,
                }
            }
        }
        pieces.push(self.expect(TokenKind::RParen)?);

        if args.len() < function.min_args || args.len() > function.max_args {
            return Err(Error::syntax(
                format!(
                    "function \"{}\" takes {} to {} arguments but was given {}",
                    function.name,
                    function.min_args,
                    function.max_args,
                    args.len()
                ),
                Span::line(line),
            ));
        }

        let mut call = self.build(NodeKind::FuncCall, Attr::Name(name), pieces);
        call.text = format!("{}({})", spelling, args.join(", "));
        Ok(call)
    }

    // ==================== Relations ====================

    /// `conj (('\/' | 'or') conj)*`
    pub(crate) fn parse_rel_expr(&mut self) -> Result<Node> {
        let mut left = self.parse_rel_conj()?;
        while matches!(self.kind(), TokenKind::Or | TokenKind::Disjunction) {
            let tok = Piece::Tok(self.advance());
            let right = self.parse_rel_conj()?;
            left = self.build(NodeKind::RelDisj, Attr::None, vec![left.into(), tok, right.into()]);
        }
        Ok(left)
    }

    /// `and` ends the relation when it introduces another let binding
    fn parse_rel_conj(&mut self) -> Result<Node> {
        let mut left = self.parse_rel_prim()?;
        loop {
            let joins = match self.kind() {
                TokenKind::Conjunction => true,
                TokenKind::And => !(matches!(self.peek_kind(1), TokenKind::Ident(_))
                    && self.peek_kind(2) == &TokenKind::Be),
                _ => false,
            };
            if !joins {
                return Ok(left);
            }
            let tok = Piece::Tok(self.advance());
            let right = self.parse_rel_prim()?;
            left = self.build(NodeKind::RelConj, Attr::None, vec![left.into(), tok, right.into()]);
        }
    }

    fn parse_rel_prim(&mut self) -> Result<Node> {
        if let Some(not) = self.consume(&TokenKind::Not) {
            let operand = self.parse_rel_prim()?;
            return Ok(self.build(NodeKind::RelNot, Attr::None, vec![not, operand.into()]));
        }

        // A parenthesis opens either a nested relation or an arithmetic
        // operand; try the relation first and rewind on failure.
        if self.check(&TokenKind::LParen) {
            let saved = (self.pos, self.warnings.len());
            let open = self.advance();
            if let Ok(mut inner) = self.parse_rel_expr() {
                if let Some(close) = self.consume(&TokenKind::RParen) {
                    self.wrap_parens(&mut inner, open, close);
                    return Ok(inner);
                }
            }
            self.pos = saved.0;
            self.warnings.truncate(saved.1);
        }

        let left = self.parse_expr()?;
        let op = match self.kind() {
            TokenKind::Eq => Op::Eq,
            TokenKind::Ne => Op::Ne,
            TokenKind::Lt => Op::Lt,
            TokenKind::Gt => Op::Gt,
            TokenKind::Le => Op::Le,
            TokenKind::Ge => Op::Ge,
            TokenKind::Divides => Op::Divides,
            TokenKind::Is => return self.parse_is_relation(left),
            _ => return Err(self.unexpected("relational operator")),
        };
        let tok = Piece::Tok(self.advance());
        let right = self.parse_expr()?;
        Ok(self.build(NodeKind::EqExpr, Attr::Op(op), vec![left.into(), tok, right.into()]))
    }

    /// `e is even`, `e is odd`, `e is [not] in ranges`
    fn parse_is_relation(&mut self, left: Node) -> Result<Node> {
        let is = self.expect(TokenKind::Is)?;
        match self.kind() {
            TokenKind::Even | TokenKind::Odd => {
                let op = if self.check(&TokenKind::Even) { Op::Even } else { Op::Odd };
                let tok = Piece::Tok(self.advance());
                return Ok(self.build(NodeKind::EqExpr, Attr::Op(op), vec![left.into(), is, tok]));
            }
            _ => {}
        }

        let mut pieces = vec![left.into(), is];
        let op = match self.consume(&TokenKind::Not) {
            Some(not) => {
                pieces.push(not);
                Op::NotIn
            }
            None => Op::In,
        };
        pieces.push(self.expect(TokenKind::In)?);
        let ranges = if self.check(&TokenKind::LBracket) {
            self.parse_bracket_range()?
        } else {
            self.parse_range_list()?
        };
        pieces.push(ranges.into());
        Ok(self.build(NodeKind::EqExpr, Attr::Op(op), pieces))
    }

    /// Obsolete `[lo, hi]` interval, rewritten as `{lo, ..., hi}`
    fn parse_bracket_range(&mut self) -> Result<Node> {
        let open = self.expect(TokenKind::LBracket)?;
        let line = self.tokens[self.pos.saturating_sub(1)].line;
        let low = self.parse_expr()?;
        let comma = self.expect(TokenKind::Comma)?;
        let high = self.parse_expr()?;
        let close = self.expect(TokenKind::RBracket)?;

        let mut range = self.build(
            NodeKind::Range,
            Attr::Flag(true),
            vec![open, low.into(), comma, high.into(), close],
        );
        range.text = format!("{{{}, ..., {}}}", range.children[0].text, range.children[1].text);
        Warning::emit(
            &mut self.warnings,
            WarningKind::DeprecatedSyntax,
            format!(
                "\"[{}, {}]\" is deprecated; use \"{}\" instead",
                range.children[0].text, range.children[1].text, range.text
            ),
            Span::line(line),
        );
        Ok(self.build(NodeKind::RangeList, Attr::Count(1), vec![range.into()]))
    }

    // ==================== Ranges ====================

    /// `range (',' range)*`
    pub(crate) fn parse_range_list(&mut self) -> Result<Node> {
        let mut pieces = vec![Piece::Node(self.parse_range()?)];
        let mut count = 1;
        while self.check(&TokenKind::Comma) && self.peek_kind(1) == &TokenKind::LBrace {
            pieces.push(Piece::Tok(self.advance()));
            pieces.push(self.parse_range()?.into());
            count += 1;
        }
        Ok(self.build(NodeKind::RangeList, Attr::Count(count), pieces))
    }

    /// `{e, ...}`, `{e, e, ..., e}` or `{e for each v in ranges [such that rel]}`
    fn parse_range(&mut self) -> Result<Node> {
        let open = self.expect(TokenKind::LBrace)?;
        let first = self.parse_expr()?;

        if let Some(for_tok) = self.consume(&TokenKind::For) {
            let each = self.expect(TokenKind::Each)?;
            let var = self.parse_ident()?;
            let in_tok = self.expect(TokenKind::In)?;
            let ranges = self.parse_range_list()?;
            let mut pieces = vec![
                open,
                first.into(),
                for_tok,
                each,
                var.into(),
                in_tok,
                ranges.into(),
            ];
            if let Some(such) = self.consume(&TokenKind::Such) {
                pieces.push(such);
                pieces.push(self.expect(TokenKind::That)?);
                pieces.push(self.parse_rel_expr()?.into());
            }
            pieces.push(self.expect(TokenKind::RBrace)?);
            return Ok(self.build(NodeKind::ListComp, Attr::None, pieces));
        }

        let mut pieces = vec![open, first.into()];
        let mut ellipsis = false;
        while let Some(comma) = self.consume(&TokenKind::Comma) {
            pieces.push(comma);
            if let Some(dots) = self.consume(&TokenKind::Ellipsis) {
                pieces.push(dots);
                pieces.push(self.expect(TokenKind::Comma)?);
                pieces.push(self.parse_expr()?.into());
                ellipsis = true;
                break;
            }
            pieces.push(self.parse_expr()?.into());
        }
        pieces.push(self.expect(TokenKind::RBrace)?);
        Ok(self.build(NodeKind::Range, Attr::Flag(ellipsis), pieces))
    }

    // ==================== Task Expressions ====================

    pub(crate) fn parse_task_expr(&mut self) -> Result<Node> {
        if let Some(all) = self.consume(&TokenKind::All) {
            if let Some(other) = self.consume(&TokenKind::Other) {
                let tasks = self.expect(TokenKind::Task)?;
                return Ok(self.build(NodeKind::TaskAllOthers, Attr::None, vec![all, other, tasks]));
            }
            let tasks = self.expect(TokenKind::Task)?;
            let mut pieces = vec![all, tasks];
            if matches!(self.kind(), TokenKind::Ident(_)) {
                pieces.push(self.parse_ident()?.into());
            }
            return Ok(self.build(NodeKind::TaskAll, Attr::None, pieces));
        }

        let task = self.expect(TokenKind::Task)?;
        match self.kind() {
            TokenKind::Group => {
                let group = Piece::Tok(self.advance());
                let name = self.parse_ident()?;
                Ok(self.build(NodeKind::TaskGroup, Attr::None, vec![task, group, name.into()]))
            }
            TokenKind::LBrace => {
                let restricted = self.desugar_task_range()?;
                Ok(self.build(NodeKind::TaskRestricted, Attr::None, vec![task, restricted.into()]))
            }
            TokenKind::Ident(_) if self.peek_kind(1) == &TokenKind::Such => {
                let var = self.parse_ident()?;
                let such = self.expect(TokenKind::Such)?;
                let that = self.expect(TokenKind::That)?;
                let cond = self.parse_rel_expr()?;
                let restricted = self.build(
                    NodeKind::RestrictedIdent,
                    Attr::None,
                    vec![var.into(), such, that, cond.into()],
                );
                Ok(self.build(NodeKind::TaskRestricted, Attr::None, vec![task, restricted.into()]))
            }
            _ => {
                let expr = self.parse_expr()?;
                Ok(self.build(NodeKind::TaskSingle, Attr::None, vec![task, expr.into()]))
            }
        }
    }

    /// `task {ranges}` means `tasks v such that v is in {ranges}` for a
    /// fresh variable `v` whose printable text is empty
    fn desugar_task_range(&mut self) -> Result<Node> {
        let ranges = self.parse_range_list()?;
        self.synthetic += 1;
        let name = format!("#t{}", self.synthetic);

        let mut var = Node::new(self.ids.next(), NodeKind::Ident, Attr::Name(name.clone()));
        var.span = ranges.span;
        let mut use_site = Node::new(self.ids.next(), NodeKind::Ident, Attr::Name(name));
        use_site.span = ranges.span;

        let member = self.build(
            NodeKind::EqExpr,
            Attr::Op(Op::In),
            vec![use_site.into(), ranges.into()],
        );
        Ok(self.build(NodeKind::RestrictedIdent, Attr::None, vec![var.into(), member.into()]))
    }
}

#[cfg(test)]
mod tests {
    use crate::frontend::ast::*;
    use crate::frontend::lexer::Lexer;
    use crate::frontend::parser::Parser;
    use crate::utils::WarningKind;
    use pretty_assertions::assert_eq;

    fn parser(source: &str) -> Parser {
        let mut lexer = Lexer::new(source);
        Parser::new(&mut lexer).unwrap()
    }

    fn expr(source: &str) -> Node {
        parser(source).parse_expr().unwrap()
    }

    fn rel(source: &str) -> Node {
        parser(source).parse_rel_expr().unwrap()
    }

    #[test]
    fn test_precedence() {
        let node = expr("1 + 2 * 3");
        assert_eq!(node.attr, Attr::Op(Op::Add));
        assert_eq!(node.children[1].attr, Attr::Op(Op::Mul));

        let node = expr("2 ** 3 ** 2");
        assert_eq!(node.attr, Attr::Op(Op::Pow));
        assert_eq!(node.children[1].attr, Attr::Op(Op::Pow));
    }

    #[test]
    fn test_unary_folding() {
        let node = expr("-5");
        assert_eq!(node.kind, NodeKind::Integer);
        assert_eq!(node.int_value(), Some(-5));
        assert_eq!(node.text, "-5");

        assert_eq!(expr("not 0").int_value(), Some(1));
        assert_eq!(expr("not 7").int_value(), Some(0));
        assert_eq!(expr("+3").int_value(), Some(3));

        let node = expr("-x");
        assert_eq!(node.kind, NodeKind::UnaryOp);
        assert_eq!(node.attr, Attr::Op(Op::Neg));
    }

    #[test]
    fn test_call_arity() {
        let node = expr("mesh_neighbor(4, *, 1)");
        assert_eq!(node.kind, NodeKind::FuncCall);
        assert_eq!(node.children[1].kind, NodeKind::Wildcard);
        assert_eq!(node.text, "mesh_neighbor(4, *, 1)");

        assert!(parser("sqrt(1, 2)").parse_expr().is_err());
        assert!(parser("frobnicate(1)").parse_expr().is_err());
    }

    #[test]
    fn test_parenthesized_relation() {
        let node = rel("(x = 1) or (x + 1) = 3");
        assert_eq!(node.kind, NodeKind::RelDisj);
        assert_eq!(node.children[0].kind, NodeKind::EqExpr);
        assert_eq!(node.children[0].text, "(x = 1)");
        assert_eq!(node.children[1].children[0].attr, Attr::Op(Op::Add));
    }

    #[test]
    fn test_membership() {
        let node = rel("t is not in {1, 3, ..., 9}, {20}");
        assert_eq!(node.attr, Attr::Op(Op::NotIn));
        let ranges = &node.children[1];
        assert_eq!(ranges.attr, Attr::Count(2));
        assert_eq!(ranges.children[0].attr, Attr::Flag(true));
    }

    #[test]
    fn test_bracket_membership_warns() {
        let mut p = parser("t is in [2, 5]");
        let node = p.parse_rel_expr().unwrap();
        let range = &node.children[1].children[0];
        assert_eq!(range.kind, NodeKind::Range);
        assert_eq!(range.attr, Attr::Flag(true));
        assert_eq!(range.text, "{2, ..., 5}");
        let warnings = p.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::DeprecatedSyntax);
    }

    #[test]
    fn test_negated_bracket_membership() {
        let mut p = parser("t is not in [1, 3]");
        let node = p.parse_rel_expr().unwrap();
        assert_eq!(node.kind, NodeKind::EqExpr);
        assert_eq!(node.attr, Attr::Op(Op::NotIn));

        let ranges = &node.children[1];
        assert_eq!(ranges.kind, NodeKind::RangeList);
        assert_eq!(ranges.attr, Attr::Count(1));
        let range = &ranges.children[0];
        assert_eq!(range.kind, NodeKind::Range);
        assert_eq!(range.attr, Attr::Flag(true));
        assert_eq!(range.children.len(), 2);
        assert_eq!(range.children[0].int_value(), Some(1));
        assert_eq!(range.children[1].int_value(), Some(3));
        assert_eq!(range.text, "{1, ..., 3}");

        let warnings = p.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::DeprecatedSyntax);
        assert!(warnings[0].message.contains("{1, ..., 3}"), "{}", warnings[0].message);
    }

    #[test]
    fn test_list_comprehension() {
        let node = rel("t is in {2*i for each i in {0, ..., 7} such that i divides 12}");
        let comp = &node.children[1].children[0];
        assert_eq!(comp.kind, NodeKind::ListComp);
        assert_eq!(comp.children.len(), 4);
        assert_eq!(comp.children[1].name(), Some("i"));
    }

    #[test]
    fn test_task_range_sugar() {
        let node = parser("task {1, 2}").parse_task_expr().unwrap();
        assert_eq!(node.kind, NodeKind::TaskRestricted);
        let restricted = &node.children[0];
        assert_eq!(restricted.kind, NodeKind::RestrictedIdent);
        let var = &restricted.children[0];
        assert!(var.name().unwrap().starts_with('#'));
        assert_eq!(var.text, "");
        assert_eq!(restricted.children[1].attr, Attr::Op(Op::In));
        assert_eq!(restricted.children[1].children[0].name(), var.name());
    }

    #[test]
    fn test_task_expressions() {
        let kind = |s: &str| parser(s).parse_task_expr().unwrap().kind;
        assert_eq!(kind("task 3"), NodeKind::TaskSingle);
        assert_eq!(kind("all tasks"), NodeKind::TaskAll);
        assert_eq!(kind("all tasks t"), NodeKind::TaskAll);
        assert_eq!(kind("all other tasks"), NodeKind::TaskAllOthers);
        assert_eq!(kind("tasks t such that t > 0"), NodeKind::TaskRestricted);
        assert_eq!(kind("task group evens"), NodeKind::TaskGroup);
    }
}
