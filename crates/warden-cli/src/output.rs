//! Output formatting utilities

use colored::*;
use serde::Serialize;

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize + ?Sized>(data: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

fn success_line(message: &str) -> String {
    format!("{} {}", "✓".green(), message)
}

fn error_line(message: &str) -> String {
    format!("{} {}", "✗".red(), message)
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{}", success_line(message));
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{}", error_line(message));
}
