//! Token definitions for the benchmark language

use serde::Serialize;
use std::fmt;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The token exactly as written in the source
    pub spelling: String,
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, spelling: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
            line,
        }
    }

    pub fn eof(line: u32) -> Self {
        Self {
            kind: TokenKind::Eof,
            spelling: String::new(),
            line,
        }
    }
}

/// Size of one element of a message or memory region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DataType {
    Bit,
    Byte,
    Halfword,
    Word,
    Integer,
    Doubleword,
    Quadword,
    Page,
}

/// Unit attached to a duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimeUnit {
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

/// Aggregate function applied to logged values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Aggregate {
    Mean,
    HarmonicMean,
    GeometricMean,
    Median,
    StandardDeviation,
    Variance,
    Minimum,
    Maximum,
    Sum,
    Final,
    Histogram,
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregate::Mean => "mean",
            Aggregate::HarmonicMean => "harmonic mean",
            Aggregate::GeometricMean => "geometric mean",
            Aggregate::Median => "median",
            Aggregate::StandardDeviation => "standard deviation",
            Aggregate::Variance => "variance",
            Aggregate::Minimum => "minimum",
            Aggregate::Maximum => "maximum",
            Aggregate::Sum => "sum",
            Aggregate::Final => "final",
            Aggregate::Histogram => "histogram",
        };
        f.write_str(name)
    }
}

/// Token kinds
///
/// Keywords are canonical categories: every alternate spelling listed in the
/// lexicon collapses onto one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ============ Keywords ============
    A,
    Aligned,
    All,
    And,
    Arithmetic,
    As,
    Assert,
    Asynchronously,
    At,
    Awaits,
    Be,
    Buffer,
    Comes,
    Completion,
    Computes,
    Counters,
    Data,
    Default,
    Deviation,
    Divides,
    Each,
    Even,
    For,
    From,
    Geometric,
    Group,
    Harmonic,
    If,
    In,
    Into,
    Is,
    It,
    Its,
    Language,
    Let,
    Logs,
    Memory,
    Message,
    Mod,
    Multicasts,
    My,
    Not,
    Odd,
    Of,
    Offset,
    Or,
    Other,
    Otherwise,
    Outputs,
    Plus,
    Random,
    Receives,
    Reduces,
    Region,
    Repetitions,
    Require,
    Resets,
    Sends,
    Sleeps,
    Standard,
    Stride,
    Such,
    Synchronization,
    Synchronizes,
    Tag,
    Task,
    That,
    The,
    Then,
    To,
    Touches,
    Touching,
    Unique,
    Using,
    Verification,
    Version,
    Warmup,
    While,
    Who,
    With,
    Without,
    Xor,

    // ============ Keyword families ============
    DataType(DataType),
    TimeUnit(TimeUnit),
    Aggregate(Aggregate),

    // ============ Identifiers and Literals ============
    /// Identifier, lowercased
    Ident(String),
    /// Integer literal with suffixes already applied
    Integer(i64),
    /// Decoded string literal
    Str(String),

    // ============ Operators ============
    /// +
    Add,
    /// -
    Sub,
    /// * used as multiplication
    Star,
    /// * used as an argument placeholder
    Wildcard,
    /// /
    Slash,
    /// **
    Power,
    /// =
    Eq,
    /// <>
    Ne,
    /// <
    Lt,
    /// >
    Gt,
    /// <=
    Le,
    /// >=
    Ge,
    /// <<
    Shl,
    /// >>
    Shr,
    /// &
    Ampersand,
    /// |
    Pipe,
    /// \/
    Disjunction,
    /// /\
    Conjunction,

    // ============ Delimiters ============
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Period,
    /// ...
    Ellipsis,

    // ============ Special ============
    Eof,
}

impl TokenKind {
    /// Whether this token can begin an arithmetic expression
    pub fn starts_expr(&self) -> bool {
        matches!(
            self,
            TokenKind::Ident(_)
                | TokenKind::Integer(_)
                | TokenKind::LParen
                | TokenKind::Add
                | TokenKind::Sub
                | TokenKind::Not
                | TokenKind::My
        )
    }

    /// Name used when reporting an unexpected token
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier \"{}\"", name),
            TokenKind::Integer(value) => format!("integer {}", value),
            TokenKind::Str(s) => format!("string \"{}\"", s),
            TokenKind::DataType(d) => format!("data type {:?}", d),
            TokenKind::TimeUnit(u) => format!("time unit {:?}", u),
            TokenKind::Aggregate(a) => format!("aggregate \"{}\"", a),
            TokenKind::Eof => "end of input".to_string(),
            other => format!("\"{}\"", format!("{:?}", other).to_lowercase()),
        }
    }
}
