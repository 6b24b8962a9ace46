//! Static language data: keyword canonicalization, predefined variables,
//! and built-in functions.

use crate::frontend::token::{Aggregate, DataType, TimeUnit, TokenKind};

/// Every accepted keyword spelling and the category it collapses onto
pub static KEYWORDS: &[(&str, TokenKind)] = &[
    ("a", TokenKind::A),
    ("an", TokenKind::A),
    ("aligned", TokenKind::Aligned),
    ("all", TokenKind::All),
    ("and", TokenKind::And),
    ("arithmetic", TokenKind::Arithmetic),
    ("as", TokenKind::As),
    ("assert", TokenKind::Assert),
    ("asynchronously", TokenKind::Asynchronously),
    ("at", TokenKind::At),
    ("await", TokenKind::Awaits),
    ("awaits", TokenKind::Awaits),
    ("be", TokenKind::Be),
    ("buffer", TokenKind::Buffer),
    ("come", TokenKind::Comes),
    ("comes", TokenKind::Comes),
    ("completion", TokenKind::Completion),
    ("completions", TokenKind::Completion),
    ("compute", TokenKind::Computes),
    ("computes", TokenKind::Computes),
    ("counter", TokenKind::Counters),
    ("counters", TokenKind::Counters),
    ("data", TokenKind::Data),
    ("default", TokenKind::Default),
    ("deviation", TokenKind::Deviation),
    ("divide", TokenKind::Divides),
    ("divides", TokenKind::Divides),
    ("each", TokenKind::Each),
    ("even", TokenKind::Even),
    ("for", TokenKind::For),
    ("from", TokenKind::From),
    ("geometric", TokenKind::Geometric),
    ("group", TokenKind::Group),
    ("harmonic", TokenKind::Harmonic),
    ("if", TokenKind::If),
    ("in", TokenKind::In),
    ("into", TokenKind::Into),
    ("is", TokenKind::Is),
    ("are", TokenKind::Is),
    ("it", TokenKind::It),
    ("them", TokenKind::It),
    ("its", TokenKind::Its),
    ("their", TokenKind::Its),
    ("language", TokenKind::Language),
    ("let", TokenKind::Let),
    ("log", TokenKind::Logs),
    ("logs", TokenKind::Logs),
    ("memory", TokenKind::Memory),
    ("message", TokenKind::Message),
    ("messages", TokenKind::Message),
    ("mod", TokenKind::Mod),
    ("multicast", TokenKind::Multicasts),
    ("multicasts", TokenKind::Multicasts),
    ("my", TokenKind::My),
    ("not", TokenKind::Not),
    ("odd", TokenKind::Odd),
    ("of", TokenKind::Of),
    ("offset", TokenKind::Offset),
    ("or", TokenKind::Or),
    ("other", TokenKind::Other),
    ("otherwise", TokenKind::Otherwise),
    ("output", TokenKind::Outputs),
    ("outputs", TokenKind::Outputs),
    ("plus", TokenKind::Plus),
    ("random", TokenKind::Random),
    ("receive", TokenKind::Receives),
    ("receives", TokenKind::Receives),
    ("reduce", TokenKind::Reduces),
    ("reduces", TokenKind::Reduces),
    ("region", TokenKind::Region),
    ("regions", TokenKind::Region),
    ("repetition", TokenKind::Repetitions),
    ("repetitions", TokenKind::Repetitions),
    ("require", TokenKind::Require),
    ("requires", TokenKind::Require),
    ("reset", TokenKind::Resets),
    ("resets", TokenKind::Resets),
    ("send", TokenKind::Sends),
    ("sends", TokenKind::Sends),
    ("sleep", TokenKind::Sleeps),
    ("sleeps", TokenKind::Sleeps),
    ("standard", TokenKind::Standard),
    ("stride", TokenKind::Stride),
    ("such", TokenKind::Such),
    ("synchronization", TokenKind::Synchronization),
    ("synchronize", TokenKind::Synchronizes),
    ("synchronizes", TokenKind::Synchronizes),
    ("tag", TokenKind::Tag),
    ("task", TokenKind::Task),
    ("tasks", TokenKind::Task),
    ("that", TokenKind::That),
    ("the", TokenKind::The),
    ("then", TokenKind::Then),
    ("to", TokenKind::To),
    ("touch", TokenKind::Touches),
    ("touches", TokenKind::Touches),
    ("touching", TokenKind::Touching),
    ("unique", TokenKind::Unique),
    ("using", TokenKind::Using),
    ("verification", TokenKind::Verification),
    ("version", TokenKind::Version),
    ("warmup", TokenKind::Warmup),
    ("while", TokenKind::While),
    ("who", TokenKind::Who),
    ("with", TokenKind::With),
    ("without", TokenKind::Without),
    ("xor", TokenKind::Xor),
    // data types
    ("bit", TokenKind::DataType(DataType::Bit)),
    ("bits", TokenKind::DataType(DataType::Bit)),
    ("byte", TokenKind::DataType(DataType::Byte)),
    ("bytes", TokenKind::DataType(DataType::Byte)),
    ("halfword", TokenKind::DataType(DataType::Halfword)),
    ("halfwords", TokenKind::DataType(DataType::Halfword)),
    ("word", TokenKind::DataType(DataType::Word)),
    ("words", TokenKind::DataType(DataType::Word)),
    ("integer", TokenKind::DataType(DataType::Integer)),
    ("integers", TokenKind::DataType(DataType::Integer)),
    ("doubleword", TokenKind::DataType(DataType::Doubleword)),
    ("doublewords", TokenKind::DataType(DataType::Doubleword)),
    ("quadword", TokenKind::DataType(DataType::Quadword)),
    ("quadwords", TokenKind::DataType(DataType::Quadword)),
    ("page", TokenKind::DataType(DataType::Page)),
    ("pages", TokenKind::DataType(DataType::Page)),
    // time units
    ("microsecond", TokenKind::TimeUnit(TimeUnit::Microseconds)),
    ("microseconds", TokenKind::TimeUnit(TimeUnit::Microseconds)),
    ("usecs", TokenKind::TimeUnit(TimeUnit::Microseconds)),
    ("millisecond", TokenKind::TimeUnit(TimeUnit::Milliseconds)),
    ("milliseconds", TokenKind::TimeUnit(TimeUnit::Milliseconds)),
    ("msecs", TokenKind::TimeUnit(TimeUnit::Milliseconds)),
    ("second", TokenKind::TimeUnit(TimeUnit::Seconds)),
    ("seconds", TokenKind::TimeUnit(TimeUnit::Seconds)),
    ("minute", TokenKind::TimeUnit(TimeUnit::Minutes)),
    ("minutes", TokenKind::TimeUnit(TimeUnit::Minutes)),
    ("hour", TokenKind::TimeUnit(TimeUnit::Hours)),
    ("hours", TokenKind::TimeUnit(TimeUnit::Hours)),
    ("day", TokenKind::TimeUnit(TimeUnit::Days)),
    ("days", TokenKind::TimeUnit(TimeUnit::Days)),
    // aggregates
    ("mean", TokenKind::Aggregate(Aggregate::Mean)),
    ("means", TokenKind::Aggregate(Aggregate::Mean)),
    ("median", TokenKind::Aggregate(Aggregate::Median)),
    ("medians", TokenKind::Aggregate(Aggregate::Median)),
    ("variance", TokenKind::Aggregate(Aggregate::Variance)),
    ("variances", TokenKind::Aggregate(Aggregate::Variance)),
    ("minimum", TokenKind::Aggregate(Aggregate::Minimum)),
    ("minima", TokenKind::Aggregate(Aggregate::Minimum)),
    ("maximum", TokenKind::Aggregate(Aggregate::Maximum)),
    ("maxima", TokenKind::Aggregate(Aggregate::Maximum)),
    ("sum", TokenKind::Aggregate(Aggregate::Sum)),
    ("sums", TokenKind::Aggregate(Aggregate::Sum)),
    ("final", TokenKind::Aggregate(Aggregate::Final)),
    ("histogram", TokenKind::Aggregate(Aggregate::Histogram)),
    ("histograms", TokenKind::Aggregate(Aggregate::Histogram)),
];

/// Look up the canonical category of a lowercased word
pub fn keyword(word: &str) -> Option<TokenKind> {
    KEYWORDS
        .iter()
        .find(|(spelling, _)| *spelling == word)
        .map(|(_, kind)| kind.clone())
}

/// Render the canonicalization table as `(spelling, category)` pairs
pub fn keyword_table() -> Vec<(String, String)> {
    KEYWORDS
        .iter()
        .map(|(spelling, kind)| (spelling.to_string(), format!("{:?}", kind)))
        .collect()
}

// ==================== Predefined Variables ====================

/// The variable holding the number of tasks; the only predefined variable a
/// let binding or a constant expression may refer to.
pub const TASK_COUNT: &str = "num_tasks";

pub static PREDEFINED: &[(&str, &str)] = &[
    ("num_tasks", "Number of tasks running the program"),
    ("elapsed_usecs", "Elapsed time in microseconds since the last counter reset"),
    ("bytes_sent", "Total number of bytes sent since the last counter reset"),
    ("bytes_received", "Total number of bytes received since the last counter reset"),
    ("msgs_sent", "Total number of messages sent since the last counter reset"),
    ("msgs_received", "Total number of messages received since the last counter reset"),
    ("total_bytes", "Sum of bytes sent and bytes received"),
    ("total_msgs", "Sum of messages sent and messages received"),
    ("bit_errors", "Number of bit errors observed during message verification"),
];

pub fn is_predefined(name: &str) -> bool {
    PREDEFINED.iter().any(|(n, _)| *n == name)
}

// ==================== Built-in Functions ====================

/// Properties of a built-in function
#[derive(Debug, Clone, Copy)]
pub struct Function {
    pub name: &'static str,
    pub min_args: usize,
    pub max_args: usize,
    /// Produces a different value on every evaluation
    pub random: bool,
    /// Needs the task-to-processor map at run time
    pub processor_map: bool,
}

const fn func(name: &'static str, min_args: usize, max_args: usize) -> Function {
    Function {
        name,
        min_args,
        max_args,
        random: false,
        processor_map: false,
    }
}

const fn random(name: &'static str, min_args: usize, max_args: usize) -> Function {
    Function {
        random: true,
        ..func(name, min_args, max_args)
    }
}

const fn procmap(name: &'static str) -> Function {
    Function {
        processor_map: true,
        ..func(name, 1, 1)
    }
}

pub static FUNCTIONS: &[Function] = &[
    func("abs", 1, 1),
    func("bits", 1, 1),
    func("cbrt", 1, 1),
    func("factor10", 1, 1),
    func("log10", 1, 1),
    func("max", 1, usize::MAX),
    func("min", 1, usize::MAX),
    func("root", 2, 2),
    func("sqrt", 1, 1),
    func("tree_parent", 1, 2),
    func("tree_child", 2, 3),
    func("mesh_neighbor", 3, 3),
    random("random_uniform", 2, 2),
    random("random_gaussian", 2, 2),
    random("random_poisson", 1, 1),
    random("random_pareto", 2, 3),
    procmap("processor_of"),
    procmap("task_of"),
];

pub fn function(name: &str) -> Option<&'static Function> {
    FUNCTIONS.iter().find(|f| f.name == name)
}
