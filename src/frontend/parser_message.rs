//! Message specifications and the communication statements built on them
//!
//! A message specification always has eight positional children, one per
//! [`MsgField`]. When the receiving half of a statement leaves fields out,
//! they are copied from the sending half so both halves are complete.

use crate::frontend::ast::*;
use crate::frontend::parser::{Parser, Piece};
use crate::frontend::token::{DataType, TokenKind};
use crate::utils::Result;

/// Message clauses that may follow `message` or an abbreviated `it`
struct Clauses {
    touching: Node,
    tag: Node,
    offset: Node,
    buffer: Node,
}

impl Parser {
    // ==================== Statements ====================

    /// `sends spec to task_expr [who [asynchronously] receives (it clauses | spec)]`
    pub(crate) fn parse_send(&mut self, actor: Node, asynchronous: Option<Piece>) -> Result<Node> {
        let mut flags = CommFlags {
            async_send: asynchronous.is_some(),
            async_recv: false,
        };
        let mut pieces = vec![actor.into()];
        pieces.extend(asynchronous);
        pieces.push(self.expect(TokenKind::Sends)?);

        let sent = self.parse_message_spec()?;
        let to = self.expect(TokenKind::To)?;
        let target = self.parse_task_expr()?;

        let mut tail = Vec::new();
        let received = if let Some(who) = self.consume(&TokenKind::Who) {
            tail.push(who);
            if let Some(tok) = self.consume(&TokenKind::Asynchronously) {
                flags.async_recv = true;
                tail.push(tok);
            }
            tail.push(self.expect(TokenKind::Receives)?);
            if self.check(&TokenKind::It) {
                let mut spec = self.parse_abbreviated_spec()?;
                inherit_fields(&sent, &mut spec, true, &mut self.ids);
                spec
            } else {
                let mut spec = self.parse_message_spec()?;
                inherit_fields(&sent, &mut spec, false, &mut self.ids);
                spec
            }
        } else {
            let mut spec = self.placeholder_spec();
            inherit_fields(&sent, &mut spec, true, &mut self.ids);
            spec
        };

        pieces.push(sent.into());
        pieces.push(to);
        pieces.push(target.into());
        pieces.extend(tail);
        pieces.push(received.into());
        Ok(self.build(NodeKind::Send, Attr::Comm(flags), pieces))
    }

    /// `receives spec from task_expr`; children are receiver, spec, source
    pub(crate) fn parse_receive(&mut self, actor: Node, asynchronous: Option<Piece>) -> Result<Node> {
        let flags = CommFlags {
            async_send: false,
            async_recv: asynchronous.is_some(),
        };
        let mut pieces = vec![actor.into()];
        pieces.extend(asynchronous);
        pieces.push(self.expect(TokenKind::Receives)?);
        pieces.push(self.parse_message_spec()?.into());
        pieces.push(self.expect(TokenKind::From)?);
        pieces.push(self.parse_task_expr()?.into());
        Ok(self.build(NodeKind::Receive, Attr::Comm(flags), pieces))
    }

    /// `multicasts spec to task_expr`
    pub(crate) fn parse_multicast(&mut self, actor: Node) -> Result<Node> {
        let verb = self.expect(TokenKind::Multicasts)?;
        let spec = self.parse_message_spec()?;
        let to = self.expect(TokenKind::To)?;
        let target = self.parse_task_expr()?;
        Ok(self.build(
            NodeKind::Multicast,
            Attr::None,
            vec![actor.into(), verb, spec.into(), to, target.into()],
        ))
    }

    /// `reduces rspec to task_expr [who receives (it clauses | rspec)]`
    pub(crate) fn parse_reduce(&mut self, actor: Node) -> Result<Node> {
        let verb = self.expect(TokenKind::Reduces)?;
        let source = self.parse_reduce_spec()?;
        let to = self.expect(TokenKind::To)?;
        let target = self.parse_task_expr()?;

        let mut tail = Vec::new();
        let result = if let Some(who) = self.consume(&TokenKind::Who) {
            tail.push(who);
            tail.push(self.expect(TokenKind::Receives)?);
            if self.check(&TokenKind::It) {
                let mut spec = self.parse_abbreviated_spec()?;
                inherit_fields(&source, &mut spec, true, &mut self.ids);
                spec
            } else {
                let mut spec = self.parse_reduce_spec()?;
                inherit_fields(&source, &mut spec, false, &mut self.ids);
                spec
            }
        } else {
            let mut spec = self.placeholder_spec();
            inherit_fields(&source, &mut spec, true, &mut self.ids);
            spec
        };

        let mut pieces = vec![actor.into(), verb, source.into(), to, target.into()];
        pieces.extend(tail);
        pieces.push(result.into());
        Ok(self.build(NodeKind::Reduce, Attr::None, pieces))
    }

    // ==================== Specifications ====================

    /// `a` or an expression
    pub(crate) fn parse_item_count(&mut self) -> Result<Node> {
        if let Some(article) = self.consume(&TokenKind::A) {
            let mut one = self.build(NodeKind::Integer, Attr::Int(1), vec![article]);
            one.text = "a".to_string();
            return Ok(self.build(NodeKind::ItemCount, Attr::Flag(true), vec![one.into()]));
        }
        let count = self.parse_expr()?;
        Ok(self.build(NodeKind::ItemCount, Attr::Flag(false), vec![count.into()]))
    }

    /// `count [unique] size TYPE [alignment] message clauses`
    pub(crate) fn parse_message_spec(&mut self) -> Result<Node> {
        let count = self.parse_item_count()?;
        let unique = self.parse_uniqueness();
        let size_expr = self.parse_expr()?;
        let (data_type, type_tok) = self.parse_data_type()?;
        let size = self.build(
            NodeKind::MessageSize,
            Attr::DataType(data_type),
            vec![size_expr.into(), type_tok],
        );
        let alignment = self.parse_alignment()?;
        let message = self.expect(TokenKind::Message)?;
        let clauses = self.parse_clauses()?;

        Ok(self.build(
            NodeKind::MessageSpec,
            Attr::Copied(Vec::new()),
            vec![
                count.into(),
                unique.into(),
                size.into(),
                alignment.into(),
                message,
                clauses.touching.into(),
                clauses.tag.into(),
                clauses.offset.into(),
                clauses.buffer.into(),
            ],
        ))
    }

    /// `count [unique] TYPE [alignment] clauses`; the element type is the size
    pub(crate) fn parse_reduce_spec(&mut self) -> Result<Node> {
        let count = self.parse_item_count()?;
        let unique = self.parse_uniqueness();
        let (data_type, type_tok) = self.parse_data_type()?;
        let size = self.build(NodeKind::MessageSize, Attr::DataType(data_type), vec![type_tok]);
        let alignment = self.parse_alignment()?;
        let clauses = self.parse_clauses()?;

        Ok(self.build(
            NodeKind::MessageSpec,
            Attr::Copied(Vec::new()),
            vec![
                count.into(),
                unique.into(),
                size.into(),
                alignment.into(),
                clauses.touching.into(),
                clauses.tag.into(),
                clauses.offset.into(),
                clauses.buffer.into(),
            ],
        ))
    }

    /// `it [alignment] clauses`; every other field comes from the sender
    fn parse_abbreviated_spec(&mut self) -> Result<Node> {
        let it = self.expect(TokenKind::It)?;
        let count = self.fabricate(NodeKind::ItemCount, Attr::Flag(false));
        let unique = self.fabricate(NodeKind::Uniqueness, Attr::Flag(false));
        let size = self.fabricate(NodeKind::MessageSize, Attr::None);
        let alignment = self.parse_alignment()?;
        let clauses = self.parse_clauses()?;

        Ok(self.build(
            NodeKind::MessageSpec,
            Attr::Copied(Vec::new()),
            vec![
                it,
                count.into(),
                unique.into(),
                size.into(),
                alignment.into(),
                clauses.touching.into(),
                clauses.tag.into(),
                clauses.offset.into(),
                clauses.buffer.into(),
            ],
        ))
    }

    /// A specification with every field omitted
    fn placeholder_spec(&mut self) -> Node {
        let mut spec = self.fabricate(NodeKind::MessageSpec, Attr::Copied(Vec::new()));
        spec.children = vec![
            self.fabricate(NodeKind::ItemCount, Attr::Flag(false)),
            self.fabricate(NodeKind::Uniqueness, Attr::Flag(false)),
            self.fabricate(NodeKind::MessageSize, Attr::None),
            self.fabricate(NodeKind::Alignment, Attr::Align(AlignKind::Unspecified)),
            self.fabricate(NodeKind::Touching, Attr::Touch(TouchMode::Default)),
            self.fabricate(NodeKind::Tag, Attr::None),
            self.fabricate(NodeKind::BufferOffset, Attr::None),
            self.fabricate(NodeKind::Buffer, Attr::Buffer(BufferKind::Unspecified)),
        ];
        spec
    }

    fn parse_uniqueness(&mut self) -> Node {
        match self.consume(&TokenKind::Unique) {
            Some(tok) => self.build(NodeKind::Uniqueness, Attr::Flag(true), vec![tok]),
            None => self.fabricate(NodeKind::Uniqueness, Attr::Flag(false)),
        }
    }

    /// `page aligned` or `expr TYPE aligned`
    fn parse_alignment(&mut self) -> Result<Node> {
        if self.kind() == &TokenKind::DataType(DataType::Page)
            && self.peek_kind(1) == &TokenKind::Aligned
        {
            let page = Piece::Tok(self.advance());
            let aligned = Piece::Tok(self.advance());
            return Ok(self.build(
                NodeKind::Alignment,
                Attr::Align(AlignKind::Page),
                vec![page, aligned],
            ));
        }
        if !self.kind().starts_expr() || self.check(&TokenKind::Not) {
            return Ok(self.fabricate(NodeKind::Alignment, Attr::Align(AlignKind::Unspecified)));
        }

        let amount = self.parse_expr()?;
        let (unit, unit_tok) = self.parse_data_type()?;
        let aligned = self.expect(TokenKind::Aligned)?;
        Ok(self.build(
            NodeKind::Alignment,
            Attr::Align(AlignKind::Multiple(unit)),
            vec![amount.into(), unit_tok, aligned],
        ))
    }

    fn parse_clauses(&mut self) -> Result<Clauses> {
        let touching = match self.kind() {
            TokenKind::With if self.peek_kind(1) == &TokenKind::Verification => {
                let pieces = vec![Piece::Tok(self.advance()), Piece::Tok(self.advance())];
                self.build(NodeKind::Touching, Attr::Touch(TouchMode::Verify), pieces)
            }
            TokenKind::With if self.peek_kind(1) == &TokenKind::Data => {
                let pieces = vec![
                    Piece::Tok(self.advance()),
                    Piece::Tok(self.advance()),
                    self.expect(TokenKind::Touching)?,
                ];
                self.build(NodeKind::Touching, Attr::Touch(TouchMode::Touch), pieces)
            }
            TokenKind::Without => {
                let pieces = vec![
                    Piece::Tok(self.advance()),
                    self.expect(TokenKind::Data)?,
                    self.expect(TokenKind::Touching)?,
                ];
                self.build(NodeKind::Touching, Attr::Touch(TouchMode::NoTouch), pieces)
            }
            _ => self.fabricate(NodeKind::Touching, Attr::Touch(TouchMode::Default)),
        };

        let tag = match self.consume(&TokenKind::Using) {
            Some(using) => {
                let tag_tok = self.expect(TokenKind::Tag)?;
                let value = self.parse_expr()?;
                self.build(NodeKind::Tag, Attr::None, vec![using, tag_tok, value.into()])
            }
            None => self.fabricate(NodeKind::Tag, Attr::None),
        };

        let offset = if self.check(&TokenKind::At) && self.peek_kind(1) == &TokenKind::Offset {
            let at = Piece::Tok(self.advance());
            let offset_tok = Piece::Tok(self.advance());
            let value = self.parse_expr()?;
            self.build(NodeKind::BufferOffset, Attr::None, vec![at, offset_tok, value.into()])
        } else {
            self.fabricate(NodeKind::BufferOffset, Attr::None)
        };

        // `from task ...` after a receive's message is the source, not a buffer.
        let names_buffer = matches!(self.kind(), TokenKind::From | TokenKind::Into)
            && match self.peek_kind(1) {
                TokenKind::Buffer => true,
                TokenKind::The => self.peek_kind(2) == &TokenKind::Default,
                _ => false,
            };
        let buffer = if !names_buffer {
            self.fabricate(NodeKind::Buffer, Attr::Buffer(BufferKind::Unspecified))
        } else if self.peek_kind(1) == &TokenKind::Buffer {
            let prep = Piece::Tok(self.advance());
            let buffer_tok = Piece::Tok(self.advance());
            let number = self.parse_expr()?;
            self.build(
                NodeKind::Buffer,
                Attr::Buffer(BufferKind::Numbered),
                vec![prep, buffer_tok, number.into()],
            )
        } else {
            let pieces = vec![
                Piece::Tok(self.advance()),
                Piece::Tok(self.advance()),
                Piece::Tok(self.advance()),
                self.expect(TokenKind::Buffer)?,
            ];
            self.build(NodeKind::Buffer, Attr::Buffer(BufferKind::Default), pieces)
        };

        Ok(Clauses {
            touching,
            tag,
            offset,
            buffer,
        })
    }
}

/// Whether a message field was given a value rather than left out
pub fn field_specified(field: &Node) -> bool {
    match (&field.kind, &field.attr) {
        (NodeKind::Alignment, Attr::Align(kind)) => *kind != AlignKind::Unspecified,
        (NodeKind::Touching, Attr::Touch(mode)) => *mode != TouchMode::Default,
        (NodeKind::Buffer, Attr::Buffer(kind)) => *kind != BufferKind::Unspecified,
        (NodeKind::Uniqueness, Attr::Flag(unique)) => *unique,
        _ => !field.children.is_empty() || !field.fabricated,
    }
}

/// Complete `receiver` from `sender`.
///
/// An abbreviated receiver (`it`, or no receiving clause at all) copies every
/// omitted field. A fully written receiver copies omitted fields except how
/// the data is touched. Alignment and buffer offset form one placement: when
/// the receiver gives either, neither is copied.
pub(crate) fn inherit_fields(sender: &Node, receiver: &mut Node, abbreviated: bool, ids: &mut IdGen) {
    let placed = !receiver.children[MsgField::Alignment.index()].fabricated
        || !receiver.children[MsgField::BufferOffset.index()].fabricated;

    let mut copied = Vec::new();
    for field in MsgField::ALL {
        let index = field.index();
        if !receiver.children[index].fabricated {
            continue;
        }
        if field == MsgField::Touching && !abbreviated {
            continue;
        }
        if placed && matches!(field, MsgField::Alignment | MsgField::BufferOffset) {
            continue;
        }
        let mut copy = sender.children[index].clone_fresh(ids);
        copy.fabricated = true;
        copy.copied = true;
        receiver.children[index] = copy;
        copied.push(field);
    }
    receiver.attr = Attr::Copied(copied);
}
