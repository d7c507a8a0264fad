//! Handles all user-facing output for the CLI.
//!
//! Diagnostics go to stderr as miette reports. Status and summary lines go to stdout,
//! coloured with `termcolor` when stdout is a terminal.

use std::io::{self, IsTerminal, Write};

use miette::Report;
use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::diagnostics::{SourceContext, ValidationDiagnostic, ValidationResult};

/// One batch entry as printed by `batch --json`.
#[derive(Debug, Serialize)]
pub struct BatchEntry<'a> {
    pub name: &'a str,
    #[serde(flatten)]
    pub result: &'a ValidationResult,
}

// ============================================================================
// CORE OUTPUT FUNCTIONS
// ============================================================================

/// Prints every error of `result` as a miette report against `source`.
pub fn print_reports(result: &ValidationResult, source: &SourceContext) {
    let named = source.to_named_source();
    for error in &result.errors {
        let report = Report::new(ValidationDiagnostic::new(error.clone(), named.clone()));
        eprintln!("{report:?}");
    }
}

/// Prints a `✓ name` or `✗ name (N errors)` status line.
pub fn print_status(name: &str, result: &ValidationResult) {
    let mut stdout = StandardStream::stdout(color_choice());
    if result.ok {
        write_colored(&mut stdout, Color::Green, "✓");
        let _ = writeln!(stdout, " {}", name);
    } else {
        write_colored(&mut stdout, Color::Red, "✗");
        let _ = writeln!(stdout, " {} ({})", name, plural(result.error_count(), "error"));
    }
}

/// Prints the closing tally of a batch run.
pub fn print_summary(total: usize, invalid: usize) {
    let mut stdout = StandardStream::stdout(color_choice());
    let _ = writeln!(stdout);
    let _ = stdout.set_color(ColorSpec::new().set_bold(true));
    let _ = write!(stdout, "{} checked", plural(total, "expression"));
    let _ = stdout.reset();
    let _ = write!(stdout, ": ");
    write_colored(&mut stdout, Color::Green, &format!("{} valid", total - invalid));
    let _ = write!(stdout, ", ");
    let colour = if invalid > 0 { Color::Red } else { Color::Green };
    write_colored(&mut stdout, colour, &format!("{} invalid", invalid));
    let _ = writeln!(stdout);
}

/// Pretty-prints any serializable value as JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints a plain list, one item per line.
pub fn print_list<I, S>(items: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut any = false;
    for item in items {
        println!("{}", item.as_ref());
        any = true;
    }
    if !any {
        println!("  No items found.");
    }
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn color_choice() -> ColorChoice {
    if io::stdout().is_terminal() {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

fn write_colored(stdout: &mut StandardStream, colour: Color, text: &str) {
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(colour)).set_bold(true));
    let _ = write!(stdout, "{}", text);
    let _ = stdout.reset();
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {}", noun)
    } else {
        format!("{} {}s", count, noun)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{ErrorKind, ValidationError};

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "error"), "1 error");
        assert_eq!(plural(3, "expression"), "3 expressions");
    }

    #[test]
    fn batch_entry_flattens_result() {
        let result = ValidationResult::new(vec![ValidationError::unpositioned(
            ErrorKind::Configuration,
            "unknown market configuration `USA_2_TOP3000`",
        )]);
        let json = serde_json::to_value(BatchEntry {
            name: "alphas.txt:1",
            result: &result,
        })
        .unwrap();
        assert_eq!(json["name"], "alphas.txt:1");
        assert_eq!(json["ok"], false);
        assert_eq!(json["errors"][0]["kind"], "ConfigurationError");
    }
}
