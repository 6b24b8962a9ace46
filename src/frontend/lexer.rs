//! Lexer for the benchmark language
//!
//! Converts source text into a stream of tokens, collapsing alternate
//! keyword spellings and recording comments by line.

use std::collections::BTreeMap;

use crate::frontend::lexicon;
use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Result, Span, Warning, WarningKind};

/// The lexer state
pub struct Lexer {
    /// Source code as characters
    source: Vec<char>,
    /// Current position in source
    pos: usize,
    /// Start position of current token
    start: usize,
    /// Current line (1-based)
    line: u32,
    /// Line on which the current token started
    start_line: u32,
    comments: BTreeMap<u32, String>,
    warnings: Vec<Warning>,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            start: 0,
            line: 1,
            start_line: 1,
            comments: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Comments seen so far, keyed by line
    pub fn comments(&self) -> &BTreeMap<u32, String> {
        &self.comments
    }

    pub fn take_comments(&mut self) -> BTreeMap<u32, String> {
        std::mem::take(&mut self.comments)
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn spelling(&self) -> String {
        self.source[self.start..self.pos].iter().collect()
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.spelling(), self.start_line)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::syntax(message, Span::line(self.start_line))
    }

    /// Skip whitespace and record comments
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                '\n' => {
                    self.line += 1;
                    self.advance();
                }
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '#' => {
                    let begin = self.pos;
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                    let text: String = self.source[begin..self.pos].iter().collect();
                    self.comments.insert(self.line, text);
                }
                _ => break,
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let canonical = self.spelling().to_ascii_lowercase();
        let kind = lexicon::keyword(&canonical).unwrap_or(TokenKind::Ident(canonical));
        self.make_token(kind)
    }

    fn too_large(&self) -> Error {
        self.error(format!("integer \"{}\" is too large", self.spelling()))
    }

    fn at_word_boundary(&self, offset: usize) -> bool {
        !self
            .peek_at(offset)
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
    }

    /// Read an integer literal and apply its suffix
    fn read_number(&mut self) -> Result<Token> {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let mut value: i64 = self.spelling().parse().map_err(|_| self.too_large())?;

        let suffix = self.peek().map(|c| c.to_ascii_lowercase());
        match suffix {
            Some(s @ ('k' | 'm' | 'g' | 't')) if self.at_word_boundary(1) => {
                self.advance();
                let power = match s {
                    'k' => 1,
                    'm' => 2,
                    'g' => 3,
                    _ => 4,
                };
                for _ in 0..power {
                    value = value.checked_mul(1024).ok_or_else(|| self.too_large())?;
                }
            }
            Some('e') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.advance();
                let exp_start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
                let exponent: String = self.source[exp_start..self.pos].iter().collect();
                let exponent: u32 = exponent.parse().map_err(|_| self.too_large())?;
                let scale = 10i64.checked_pow(exponent).ok_or_else(|| self.too_large())?;
                value = value.checked_mul(scale).ok_or_else(|| self.too_large())?;
            }
            Some('s' | 'n' | 'r' | 't') if self.at_word_boundary(2) => {
                let pair: String = [self.peek_at(0), self.peek_at(1)]
                    .iter()
                    .flatten()
                    .map(|c| c.to_ascii_lowercase())
                    .collect();
                if matches!(pair.as_str(), "st" | "nd" | "rd" | "th") {
                    self.advance();
                    self.advance();
                }
            }
            _ => {}
        }

        if !self.at_word_boundary(0) {
            return Err(self.error(format!("malformed number \"{}\"", self.spelling())));
        }
        Ok(self.make_token(TokenKind::Integer(value)))
    }

    /// Read a string literal
    fn read_string(&mut self) -> Result<Token> {
        self.advance(); // opening quote

        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(self.error("unterminated string")),
                Some('"') => break,
                Some('\n') => {
                    self.line += 1;
                    value.push('\n');
                }
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some('r') => value.push('\r'),
                    Some('\\') => value.push('\\'),
                    Some('"') => value.push('"'),
                    Some(other) => {
                        if other == '\n' {
                            self.line += 1;
                        }
                        Warning::emit(
                            &mut self.warnings,
                            WarningKind::UnknownEscape,
                            format!("unrecognized escape sequence \"\\{}\"", other),
                            Span::line(self.line),
                        );
                        value.push(other);
                    }
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => value.push(c),
            }
        }

        Ok(self.make_token(TokenKind::Str(value)))
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();
        self.start = self.pos;
        self.start_line = self.line;

        let Some(c) = self.peek() else {
            return Ok(Token::eof(self.line));
        };

        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.read_identifier());
        }
        if c.is_ascii_digit() {
            return self.read_number();
        }
        if c == '"' {
            return self.read_string();
        }

        self.advance();
        let kind = match c {
            '+' => TokenKind::Add,
            '-' => TokenKind::Sub,
            '*' => {
                if self.peek() == Some('*') {
                    self.advance();
                    TokenKind::Power
                } else {
                    TokenKind::Star
                }
            }
            '/' => {
                if self.peek() == Some('\\') {
                    self.advance();
                    TokenKind::Conjunction
                } else {
                    TokenKind::Slash
                }
            }
            '\\' if self.peek() == Some('/') => {
                self.advance();
                TokenKind::Disjunction
            }
            '=' => TokenKind::Eq,
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    TokenKind::Le
                }
                Some('>') => {
                    self.advance();
                    TokenKind::Ne
                }
                Some('<') => {
                    self.advance();
                    TokenKind::Shl
                }
                _ => TokenKind::Lt,
            },
            '>' => match self.peek() {
                Some('=') => {
                    self.advance();
                    TokenKind::Ge
                }
                Some('>') => {
                    self.advance();
                    TokenKind::Shr
                }
                _ => TokenKind::Gt,
            },
            '&' => TokenKind::Ampersand,
            '|' => TokenKind::Pipe,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '.' => {
                if self.peek() == Some('.') && self.peek_at(1) == Some('.') {
                    self.advance();
                    self.advance();
                    TokenKind::Ellipsis
                } else {
                    TokenKind::Period
                }
            }
            other => return Err(self.error(format!("unrecognized character '{}'", other))),
        };

        Ok(self.make_token(kind))
    }

    /// Tokenize the entire source and return all tokens, ending with `Eof`
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens: Vec<Token> = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;

            // A '*' directly before ',' or ')' was an argument placeholder.
            if matches!(token.kind, TokenKind::Comma | TokenKind::RParen) {
                if let Some(prev) = tokens.last_mut() {
                    if prev.kind == TokenKind::Star {
                        prev.kind = TokenKind::Wildcard;
                    }
                }
            }

            tokens.push(token);
            if is_eof {
                break;
            }
        }
        log::trace!("tokenized {} tokens", tokens.len());
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source);
        lexer
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_keywords_canonicalize() {
        let k = kinds("Task 0 SENDS a message to tasks");
        assert_eq!(k[0], TokenKind::Task);
        assert_eq!(k[1], TokenKind::Integer(0));
        assert_eq!(k[2], TokenKind::Sends);
        assert_eq!(k[3], TokenKind::A);
        assert_eq!(k[4], TokenKind::Message);
        assert_eq!(k[6], TokenKind::Task);
        assert_eq!(k[7], TokenKind::Eof);
    }

    #[test]
    fn test_identifier_keeps_spelling() {
        let mut lexer = Lexer::new("MsgSize");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Ident("msgsize".to_string()));
        assert_eq!(tokens[0].spelling, "MsgSize");
    }

    #[test]
    fn test_magnitude_suffixes() {
        assert_eq!(kinds("10K")[0], TokenKind::Integer(10240));
        assert_eq!(kinds("2G")[0], TokenKind::Integer(2147483648));
        assert_eq!(kinds("3m")[0], TokenKind::Integer(3 * 1024 * 1024));
        assert_eq!(kinds("1T")[0], TokenKind::Integer(1 << 40));
        assert_eq!(kinds("5E3")[0], TokenKind::Integer(5000));
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(kinds("3rd")[0], TokenKind::Integer(3));
        assert_eq!(kinds("12th")[0], TokenKind::Integer(12));
        assert_eq!(kinds("1st 2nd")[1], TokenKind::Integer(2));
    }

    #[test]
    fn test_bad_number() {
        let mut lexer = Lexer::new("12abc");
        assert!(matches!(lexer.tokenize(), Err(Error::Syntax { .. })));
        let mut lexer = Lexer::new("99999999999T");
        assert!(lexer.tokenize().is_err());
    }

    #[test]
    fn test_string_escapes() {
        let mut lexer = Lexer::new(r#""a\tb\"c\\""#);
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str("a\tb\"c\\".to_string()));
        assert!(lexer.take_warnings().is_empty());
    }

    #[test]
    fn test_unknown_escape_warns_once() {
        let mut lexer = Lexer::new(r#""x\qy""#);
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str("xqy".to_string()));
        let warnings = lexer.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::UnknownEscape);
    }

    #[test]
    fn test_newline_in_string_advances_line() {
        let mut lexer = Lexer::new("\"one\ntwo\" x");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_wildcard_lookback() {
        let k = kinds("f(*, 2 * 3, *)");
        assert_eq!(k[2], TokenKind::Wildcard);
        assert_eq!(k[5], TokenKind::Star);
        assert_eq!(k[8], TokenKind::Wildcard);
    }

    #[test]
    fn test_comments_recorded() {
        let mut lexer = Lexer::new("# first\ntask 0 # second\n");
        let tokens = lexer.tokenize().unwrap();
        assert_eq!(tokens[0].line, 2);
        assert_eq!(lexer.comments().get(&1).map(String::as_str), Some("# first"));
        assert_eq!(lexer.comments().get(&2).map(String::as_str), Some("# second"));
    }

    #[test]
    fn test_operators() {
        let k = kinds("<> <= << ** \\/ /\\ ...");
        assert_eq!(
            &k[..7],
            &[
                TokenKind::Ne,
                TokenKind::Le,
                TokenKind::Shl,
                TokenKind::Power,
                TokenKind::Disjunction,
                TokenKind::Conjunction,
                TokenKind::Ellipsis,
            ]
        );
    }

    #[test]
    fn test_unrecognized_character() {
        let mut lexer = Lexer::new("task 0\n  @");
        match lexer.tokenize() {
            Err(Error::Syntax { span, .. }) => assert_eq!(span.start, 2),
            other => panic!("unexpected {:?}", other),
        }
    }
}
