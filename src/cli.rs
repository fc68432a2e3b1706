//! The Quill command-line interface.
//!
//! Every subcommand works against the employee grammar. With no subcommand
//! the interactive session starts.

use std::{fs, io, path::PathBuf, process};

use clap::{Parser, Subcommand};
use serde::Serialize;
use termcolor::ColorChoice;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::{
    aggregate::FromAttribute,
    driver::{self, ParseConfig, DEFAULT_MAX_DEPTH},
    employee::{employee_grammar, Employee},
    errors::{print_error, QuillError},
    grammar::Grammar,
    repl,
};

// ============================================================================
// CLI ARGUMENTS - Command-line argument definitions
// ============================================================================

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "quill",
    version,
    about = "A grammar-combinator parser for employee records."
)]
pub struct QuillArgs {
    /// Log every rule entry and exit to stderr.
    #[arg(long, global = true)]
    pub trace: bool,

    /// Maximum rule nesting depth before a parse is aborted.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    /// Disable coloured output.
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<ArgsCommand>,
}

/// An enumeration of all available CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum ArgsCommand {
    /// Read employee records from stdin, one per line.
    Repl,
    /// Parse a single employee record.
    Parse {
        /// The record text, e.g. 'employee{23, "Turner", "Mary", 5000.00}'.
        #[arg(required = true)]
        text: String,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Parse every non-empty line of a file and report a summary.
    Check {
        /// The path to the file of records.
        #[arg(required = true)]
        file: PathBuf,
    },
    /// Print the employee grammar.
    Grammar,
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

/// The main entry point for the CLI.
pub fn run() {
    let args = QuillArgs::parse();
    init_tracing(args.trace);

    let grammar = employee_grammar().unwrap_or_else(|e| {
        print_error(e);
        process::exit(2);
    });
    let config = ParseConfig {
        max_depth: args.max_depth,
    };
    let color = if args.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match args.command.unwrap_or(ArgsCommand::Repl) {
        ArgsCommand::Repl => {
            if let Err(e) = repl::run_repl(&grammar, config, color) {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }

        ArgsCommand::Parse { text, json } => {
            if !parse_one(&grammar, &config, &text, json) {
                process::exit(1);
            }
        }

        ArgsCommand::Check { file } => {
            let source = read_file_or_exit(&file);
            if !check_lines(&grammar, &config, &source) {
                process::exit(1);
            }
        }

        ArgsCommand::Grammar => {
            print!("{grammar}");
        }
    }
}

fn init_tracing(trace: bool) {
    let filter = if trace {
        EnvFilter::new("quill=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when run() is embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

// ============================================================================
// SUBCOMMANDS
// ============================================================================

#[derive(Debug, Serialize)]
struct ParseReport {
    success: bool,
    consumed_end: usize,
    employee: Option<Employee>,
}

/// Parses one record. Returns whether it parsed.
fn parse_one(grammar: &Grammar, config: &ParseConfig, text: &str, json: bool) -> bool {
    let outcome = match driver::parse_with(text, grammar, grammar.skipper(), config) {
        Ok(outcome) => outcome,
        Err(e) => {
            print_error(e);
            return false;
        }
    };

    let consumed_end = outcome.consumed_end;
    let employee = outcome.into_value().and_then(Employee::from_attribute);
    let success = employee.is_some();

    if json {
        let report = ParseReport {
            success,
            consumed_end,
            employee,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => eprintln!("Error: {e}"),
        }
    } else {
        match employee {
            Some(employee) => {
                println!("Parsing succeeded");
                println!("got: {employee}");
            }
            None => println!("Parsing failed at byte {consumed_end}"),
        }
    }
    success
}

/// Parses each non-empty line. Returns whether every line parsed.
fn check_lines(grammar: &Grammar, config: &ParseConfig, source: &str) -> bool {
    let mut passed = 0;
    let mut failed = 0;

    for (index, line) in source.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let line_number = index + 1;
        match driver::parse_with(line, grammar, grammar.skipper(), config) {
            Ok(outcome) if outcome.success => passed += 1,
            Ok(outcome) => {
                failed += 1;
                println!(
                    "line {line_number}: Parsing failed at byte {}",
                    outcome.consumed_end
                );
            }
            Err(e) => {
                failed += 1;
                println!("line {line_number}: Parsing aborted");
                print_error(e);
            }
        }
    }

    debug!(passed, failed, "check finished");
    println!("{passed} parsed, {failed} failed");
    failed == 0
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn read_file_or_exit(path: &PathBuf) -> String {
    fs::read_to_string(path).unwrap_or_else(|source| {
        print_error(QuillError::Io {
            path: path.display().to_string(),
            source,
        });
        process::exit(1);
    })
}
