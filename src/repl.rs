//! Interactive employee parser.
//!
//! Reads one record per line and reports whether it parsed. An empty line,
//! or a line starting with `q` or `Q`, ends the session.

use std::io::{self, BufRead, Write};

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::aggregate::FromAttribute;
use crate::driver::{self, ParseConfig};
use crate::employee::Employee;
use crate::grammar::Grammar;

const RULE: &str = "-------------------------";

/// Session state that persists across lines.
pub struct ReplSession<'g> {
    grammar: &'g Grammar,
    config: ParseConfig,
    line_number: usize,
}

impl<'g> ReplSession<'g> {
    pub fn new(grammar: &'g Grammar, config: ParseConfig) -> Self {
        Self {
            grammar,
            config,
            line_number: 0,
        }
    }

    /// Number of records attempted so far.
    pub fn lines_seen(&self) -> usize {
        self.line_number
    }

    /// Parses one line and writes the report block. Returns whether the
    /// record parsed.
    pub fn eval_line<W: WriteColor>(&mut self, line: &str, out: &mut W) -> io::Result<bool> {
        self.line_number += 1;
        let outcome = driver::parse_with(line, self.grammar, self.grammar.skipper(), &self.config);

        writeln!(out, "{RULE}")?;
        let parsed = match outcome {
            Ok(outcome) if outcome.success => {
                status(out, Color::Green, "Parsing succeeded")?;
                let value = outcome.into_value().unwrap_or_default();
                match Employee::from_attribute(value.clone()) {
                    Some(employee) => writeln!(out, "got: {employee}")?,
                    None => writeln!(out, "got: {value}")?,
                }
                writeln!(out)?;
                true
            }
            Ok(_) => {
                status(out, Color::Red, "Parsing failed")?;
                false
            }
            Err(err) => {
                status(out, Color::Red, "Parsing failed")?;
                writeln!(out, "{:?}", miette::Report::new(err))?;
                false
            }
        };
        writeln!(out, "{RULE}")?;
        Ok(parsed)
    }

    /// Runs the read-report loop until end of input or a quit line.
    pub fn run<R: BufRead, W: WriteColor>(&mut self, input: R, out: &mut W) -> io::Result<()> {
        print_banner(out)?;
        for line in input.lines() {
            let line = line?;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() || line.starts_with(['q', 'Q']) {
                break;
            }
            self.eval_line(line, out)?;
            out.flush()?;
        }
        writeln!(out, "Bye... :-) ")?;
        writeln!(out)?;
        Ok(())
    }
}

fn status<W: WriteColor>(out: &mut W, color: Color, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{text}")?;
    out.reset()?;
    writeln!(out)
}

fn print_banner<W: Write>(out: &mut W) -> io::Result<()> {
    let bar = "/".repeat(57);
    writeln!(out, "{bar}")?;
    writeln!(out)?;
    writeln!(out, "\t\tAn employee parser for Quill...")?;
    writeln!(out)?;
    writeln!(out, "{bar}")?;
    writeln!(out)?;
    writeln!(
        out,
        "Give me an employee of the form :employee{{age, \"surname\", \"forename\", salary }} "
    )?;
    writeln!(out, "Type [q or Q] to quit")?;
    writeln!(out)
}

/// Runs the session on stdin/stdout.
pub fn run_repl(grammar: &Grammar, config: ParseConfig, color: ColorChoice) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = StandardStream::stdout(color);
    ReplSession::new(grammar, config).run(stdin.lock(), &mut stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employee::employee_grammar;
    use termcolor::NoColor;

    fn session(input: &str) -> String {
        let grammar = employee_grammar().unwrap();
        let mut out = NoColor::new(Vec::new());
        ReplSession::new(&grammar, ParseConfig::default())
            .run(input.as_bytes(), &mut out)
            .unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn reports_success_with_fields() {
        let text = session("employee{23, \"Turner\", \"Mary\", 5000.00}\n");
        assert!(text.contains("Parsing succeeded\ngot: [23, Turner, Mary, 5000]\n"));
        assert!(text.ends_with("Bye... :-) \n\n"));
    }

    #[test]
    fn reports_failure() {
        let text = session("employee{23, \"Turner\", \"Mary\"}\n");
        assert!(text.contains(&format!("{RULE}\nParsing failed\n{RULE}\n")));
    }

    #[test]
    fn quit_line_stops_the_loop() {
        let text = session("q\nemployee{23, \"Turner\", \"Mary\", 5000.00}\n");
        assert!(!text.contains("Parsing"));
    }

    #[test]
    fn empty_line_stops_the_loop() {
        let text = session("\nemployee{23, \"Turner\", \"Mary\", 5000.00}\n");
        assert!(!text.contains("Parsing"));
    }

    #[test]
    fn overflow_is_reported_as_failure_with_diagnostic() {
        let text = session("employee{99999999999, \"Turner\", \"Mary\", 1.0}\n");
        assert!(text.contains("Parsing failed"));
        assert!(text.contains("numeric_overflow"));
    }

    #[test]
    fn counts_lines() {
        let grammar = employee_grammar().unwrap();
        let mut session = ReplSession::new(&grammar, ParseConfig::default());
        let mut out = NoColor::new(Vec::new());
        assert!(!session.eval_line("nope", &mut out).unwrap());
        assert_eq!(session.lines_seen(), 1);
    }
}
