//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for script results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable rendering
    Plain,
    /// JSON rendering of the result value
    Json,
}

impl From<OutputFormat> for bridge_domain::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Plain => Self::Plain,
            OutputFormat::Json => Self::Json,
        }
    }
}

/// CLI arguments for script-bridge
#[derive(Parser, Debug)]
#[command(name = "script-bridge")]
#[command(author, version, about = "Drive native scriptable objects from Lua scripts")]
#[command(long_about = r#"
script-bridge runs a Lua script against a context whose global `bus` is a
scriptable proxy of a built-in demo bus service. Remote methods, signals and
properties are resolved by name at lookup time; `$`-prefixed members expose
control operations such as `$callMethod` and `$timeout`.

Pending asynchronous replies are delivered after the script ran, and the
value of the last expression is printed.

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./bridge.toml       Project-level config
3. ~/.config/script-bridge/config.toml   Global config

Example:
  script-bridge -e "bus:Ping()"
  script-bridge -e "bus:DivMod(7, 2)" --output json
  script-bridge demo.lua -vv
"#)]
pub struct Cli {
    /// Lua script to run
    #[arg(value_name = "SCRIPT", conflicts_with = "eval")]
    pub script: Option<PathBuf>,

    /// Evaluate a Lua chunk given on the command line
    #[arg(short, long, value_name = "CODE")]
    pub eval: Option<String>,

    /// Output format (overrides the config file)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Allow native module loading in scripts
    #[arg(long)]
    pub no_sandbox: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_eval_with_options() {
        let cli = Cli::try_parse_from(["script-bridge", "-e", "bus:Ping()", "--output", "json", "-vv"]).unwrap();
        assert_eq!(cli.eval.as_deref(), Some("bus:Ping()"));
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert_eq!(cli.verbose, 2);
        assert!(cli.script.is_none());
    }

    #[test]
    fn test_script_conflicts_with_eval() {
        assert!(Cli::try_parse_from(["script-bridge", "run.lua", "-e", "1"]).is_err());
    }

    #[test]
    fn test_output_format_maps_to_domain() {
        assert_eq!(
            bridge_domain::OutputFormat::from(OutputFormat::Json),
            bridge_domain::OutputFormat::Json
        );
    }
}
