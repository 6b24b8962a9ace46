//! ncptlc
//!
//! Command-line driver for the benchmark-language front end. Compiles one
//! source file and reports the outcome; code generation is left to backends.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use ncptl_front::feedback::{CompilationFeedback, CompilationStats};
use ncptl_front::frontend::{grammar, lexicon};
use ncptl_front::{compile, CompileOptions};

/// Benchmark-language front end
#[derive(Parser, Debug)]
#[command(name = "ncptlc")]
#[command(version = "0.1.0")]
#[command(about = "Validate benchmark programs and dump their syntax trees")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input source file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Declare undeclared variables as command-line parameters
    #[arg(long)]
    lenient: bool,

    /// Print the analyzed syntax tree as JSON
    #[arg(long)]
    dump_ast: bool,

    /// Print a structured diagnostics report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every grammar production and token rule
    Grammar,
    /// List every keyword spelling and its canonical category
    Keywords,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Grammar) => {
            for production in grammar::productions() {
                println!("{}", production);
            }
            println!();
            for (name, rule) in grammar::token_rules() {
                println!("{:<12} {}", name, rule);
            }
        }
        Some(Commands::Keywords) => {
            for (spelling, kind) in lexicon::keyword_table() {
                println!("{:<20} {}", spelling, kind);
            }
            println!();
            for (name, description) in lexicon::PREDEFINED {
                println!("{:<20} {}", name, description);
            }
        }
        None => match cli.input {
            Some(ref input) => compile_file(input, &cli)?,
            None => {
                eprintln!("Error: No input file specified");
                eprintln!("Usage: ncptlc <FILE> [--lenient] [--dump-ast] [--json]");
                process::exit(2);
            }
        },
    }
    Ok(())
}

/// Compile a source file and report the result
fn compile_file(input: &Path, cli: &Cli) -> anyhow::Result<()> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("could not read {}", input.display()))?;
    let options = CompileOptions {
        source_name: input.display().to_string(),
        lenient: cli.lenient,
    };

    let started = Instant::now();
    let result = compile(&source, &options);
    let stats = CompilationStats {
        loc: source.lines().count(),
        total_time_ms: started.elapsed().as_millis() as u64,
        ..CompilationStats::default()
    };

    let compilation = match result {
        Ok(compilation) => compilation,
        Err(e) => {
            if cli.json {
                let feedback = CompilationFeedback::failure(&options.source_name, &e, stats);
                println!("{}", feedback.to_json());
            } else {
                eprintln!("{}", options.report_error(&e));
            }
            process::exit(1);
        }
    };

    if cli.json {
        let feedback = CompilationFeedback::success(&options.source_name, &compilation, stats);
        println!("{}", feedback.to_json());
    } else {
        for warning in &compilation.warnings {
            eprintln!("{}", options.report_warning(warning));
        }
    }

    if cli.dump_ast {
        let tree = serde_json::to_string_pretty(&compilation.root)
            .context("could not serialize the syntax tree")?;
        println!("{}", tree);
    } else if !cli.json {
        println!("{}: no errors found", options.source_name);
    }
    Ok(())
}
