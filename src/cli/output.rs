//! Operator-facing output helpers.

use std::fmt::Display;

const RULE_WIDTH: usize = 56;

/// Section header with a rule underneath.
pub fn section(title: &str) {
    println!();
    println!("{title}");
    println!("{}", "─".repeat(RULE_WIDTH));
}

pub fn key_value(label: &str, value: impl Display) {
    println!("  {label:<16} {value}");
}

pub fn ok(message: &str) {
    println!("✓ {message}");
}

pub fn warn(message: &str) {
    println!("⚠ {message}");
}

/// Errors go to stderr.
pub fn error(message: &str) {
    eprintln!("✗ {message}");
}
