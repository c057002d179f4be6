//! Presentation layer for script-bridge
//!
//! This crate contains the CLI definition and the formatters that render
//! script results for the terminal.

pub mod cli;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat};
pub use output::console::ConsoleFormatter;
pub use output::formatter::{OutputFormatter, formatter_for};
pub use output::json::JsonFormatter;
