//! Output formatter trait

use super::console::ConsoleFormatter;
use super::json::JsonFormatter;
use bridge_domain::{OutputFormat, Variant};

/// Trait for formatting script results
pub trait OutputFormatter {
    /// Format the value a script evaluated to
    fn format(&self, value: &Variant) -> String;

    /// Format a script failure
    fn format_error(&self, message: &str) -> String;
}

/// Formatter for the configured output format.
pub fn formatter_for(format: OutputFormat, color: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Plain => Box::new(ConsoleFormatter::new(color)),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}
