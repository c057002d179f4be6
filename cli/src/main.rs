//! CLI entrypoint for script-bridge
//!
//! This is the main binary that wires together all layers: it loads the
//! configuration, creates the Lua script context, exposes the demo bus
//! service as the global `bus` and prints what the script evaluated to.

use anyhow::{Context, Result, anyhow, bail};
use bridge_application::{ScriptContextPort, ScriptableBusObject};
use bridge_domain::Variant;
use bridge_infrastructure::{
    ConfigLoader, DEMO_INTERFACE, DEMO_PATH, DEMO_SERVICE, LuaScriptContext, demo_bus,
};
use bridge_presentation::{Cli, formatter_for};
use clap::Parser;
use std::fs::{self, File};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Installs the tracing subscriber. The returned guard flushes the log
/// file on drop.
fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    // Initialize logging based on verbosity level
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    match &cli.log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("cannot create log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = init_logging(&cli)?;

    if cli.show_config {
        ConfigLoader::print_config_sources();
        return Ok(ExitCode::SUCCESS);
    }

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).map_err(|e| anyhow!("invalid configuration: {}", e))?
    };
    config.validate()?;

    let mut options = config.context_options();
    if cli.no_sandbox {
        options = options.with_sandbox(false);
    }
    let format = cli.output.map(Into::into).unwrap_or(config.output.format);
    let formatter = formatter_for(format, config.output.color && !cli.no_color);

    let (source, filename) = match (&cli.script, &cli.eval) {
        (Some(path), _) => (
            fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?,
            path.display().to_string(),
        ),
        (None, Some(code)) => (code.clone(), String::new()),
        (None, None) => bail!("Nothing to run. Pass a SCRIPT file or -e CODE."),
    };

    // === Dependency Injection ===
    let context = LuaScriptContext::new(&options)?;
    let bus = demo_bus();
    bus.set_default_timeout(options.default_timeout_ms);
    let proxy = bus
        .proxy(DEMO_SERVICE, DEMO_PATH, DEMO_INTERFACE)
        .context("demo service is not registered")?;
    context.assign_global("bus", Variant::object(ScriptableBusObject::new(proxy)))?;

    info!("Running {}", if filename.is_empty() { "inline chunk" } else { filename.as_str() });

    let result = context.evaluate(&source, &filename);

    // Replies may trigger further asynchronous calls.
    let mut delivered = 0;
    loop {
        let count = bus.dispatch_pending();
        if count == 0 {
            break;
        }
        delivered += count;
    }
    debug!("Delivered {} asynchronous replies", delivered);

    match result {
        Ok(value) => {
            let value = context.table_json(&value).unwrap_or(value);
            let output = formatter.format(&value);
            if !output.is_empty() {
                println!("{}", output);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", formatter.format_error(&e.message));
            Ok(ExitCode::FAILURE)
        }
    }
}
