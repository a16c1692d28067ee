//! Output formatting for CLI commands

use std::io::IsTerminal;

use crossterm::style::{Color, Stylize};
use serde::Serialize;

use crate::domain::AccessLevel;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Output helper for consistent formatting
///
/// In text mode every line goes to stdout with a colored level tag. In JSON
/// mode the tagged lines are dropped and commands print one document with
/// [`Output::data`]; errors still reach stderr as JSON.
pub struct Output {
    format: OutputFormat,
    verbose: bool,
    color: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        let color = std::io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none();
        Self {
            format,
            verbose,
            color,
        }
    }

    /// Colors `text` when writing to a terminal
    pub fn paint(&self, text: &str, color: Color) -> String {
        if self.color {
            text.with(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn dimmed(&self, text: &str) -> String {
        if self.color {
            text.dim().to_string()
        } else {
            text.to_string()
        }
    }

    fn tagged(&self, tag: &str, color: Color, message: &str) {
        if self.is_text() {
            println!("{} {}", self.paint(&format!("{:<5}", tag), color), message);
        }
    }

    pub fn info(&self, message: &str) {
        self.tagged("info", Color::Blue, message);
    }

    pub fn ok(&self, message: &str) {
        self.tagged("ok", Color::Green, message);
    }

    pub fn warn(&self, message: &str) {
        self.tagged("warn", Color::Yellow, message);
    }

    /// Prints an error message
    pub fn error(&self, message: &str) {
        match self.format {
            OutputFormat::Text => self.tagged("error", Color::Red, message),
            OutputFormat::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "success": false,
                        "error": message
                    })
                );
            }
        }
    }

    /// Prints a hint line
    pub fn dim(&self, message: &str) {
        if self.is_text() {
            println!("{}", self.dimmed(message));
        }
    }

    /// Prints a section title surrounded by blank lines
    pub fn title(&self, message: &str) {
        if self.is_text() {
            let title = if self.color {
                message.bold().with(Color::Cyan).to_string()
            } else {
                message.to_string()
            };
            println!("\n{}\n", title);
        }
    }

    /// Prints a plain line (text only)
    pub fn line(&self, message: &str) {
        if self.is_text() {
            println!("{}", message);
        }
    }

    /// Prints a blank line (text only)
    pub fn blank(&self) {
        if self.is_text() {
            println!();
        }
    }

    /// Bracketed access level, colored by how restricted it is
    pub fn access_tag(&self, level: AccessLevel) -> String {
        let color = match level {
            AccessLevel::Public => Color::AnsiValue(208),
            AccessLevel::Reader => Color::Yellow,
            AccessLevel::Admin => Color::Red,
        };
        self.paint(&format!("[{}]", level), color)
    }

    /// Prints structured data (JSON only)
    pub fn data<T: Serialize>(&self, data: &T) {
        if self.is_json() {
            if let Ok(json) = serde_json::to_string(data) {
                println!("{}", json);
            }
        }
    }

    /// Returns true if using JSON format
    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Returns true if using text format
    pub fn is_text(&self) -> bool {
        self.format == OutputFormat::Text
    }

    /// Prints a verbose debug message with context (only when --verbose is set)
    pub fn verbose_ctx(&self, context: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", context, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_is_plain_without_terminal() {
        let output = Output {
            format: OutputFormat::Text,
            verbose: false,
            color: false,
        };
        assert_eq!(output.paint("x", Color::Red), "x");
        assert_eq!(output.access_tag(AccessLevel::Admin), "[admin]");
    }

    #[test]
    fn paint_wraps_in_escape_codes() {
        let output = Output {
            format: OutputFormat::Text,
            verbose: false,
            color: true,
        };
        let painted = output.paint("x", Color::Red);
        assert!(painted.contains('x'));
        assert!(painted.starts_with('\u{1b}'));
    }
}
