//! Configuration file loading for script-bridge
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. `SCRIPT_BRIDGE_*` environment variables
//! 3. Project root: `./bridge.toml` or `./.bridge.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/script-bridge/config.toml`
//! 5. Fallback: `~/.config/script-bridge/config.toml`
//! 6. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileContextConfig, FileOutputConfig, FileOutputFormat,
};
pub use loader::ConfigLoader;
