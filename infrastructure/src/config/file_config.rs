//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

use bridge_application::ContextOptions;
use bridge_domain::OutputFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export OutputFormat from domain for convenience
pub use bridge_domain::OutputFormat as FileOutputFormat;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("default_timeout_ms must be -1 or >= 0, got {0}")]
    InvalidTimeout(i64),

    #[error("chunk_name cannot be empty")]
    EmptyChunkName,
}

/// Raw script context configuration (`[context]` section)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileContextConfig {
    /// Block native module loading in scripts
    pub sandbox: bool,
    /// Default bus method call timeout in milliseconds (`-1` for none)
    pub default_timeout_ms: i64,
    /// Chunk name used in script error messages
    pub chunk_name: String,
}

impl Default for FileContextConfig {
    fn default() -> Self {
        let options = ContextOptions::default();
        Self {
            sandbox: options.sandbox,
            default_timeout_ms: i64::from(options.default_timeout_ms),
            chunk_name: options.chunk_name,
        }
    }
}

/// Raw output configuration (`[output]` section)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Output format (uses domain type)
    pub format: OutputFormat,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Plain,
            color: true,
        }
    }
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Script context settings
    pub context: FileContextConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let timeout = self.context.default_timeout_ms;
        if timeout < -1 || timeout > i64::from(i32::MAX) {
            return Err(ConfigValidationError::InvalidTimeout(timeout));
        }
        if self.context.chunk_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyChunkName);
        }
        Ok(())
    }

    /// Script context options described by this configuration.
    ///
    /// Call [`validate`](Self::validate) first; out of range timeouts are
    /// clamped here.
    pub fn context_options(&self) -> ContextOptions {
        let timeout = self.context.default_timeout_ms.clamp(-1, i64::from(i32::MAX)) as i32;
        ContextOptions::default()
            .with_sandbox(self.context.sandbox)
            .with_default_timeout_ms(timeout)
            .with_chunk_name(self.context.chunk_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert!(config.context.sandbox);
        assert_eq!(config.context.default_timeout_ms, -1);
        assert_eq!(config.output.format, OutputFormat::Plain);
        assert!(config.output.color);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_partial() {
        let toml_str = r#"
[context]
sandbox = false
default_timeout_ms = 2500

[output]
format = "json"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(!config.context.sandbox);
        assert_eq!(config.context.chunk_name, "script");
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.output.color);

        let options = config.context_options();
        assert!(!options.sandbox);
        assert_eq!(options.default_timeout_ms, 2500);
    }

    #[test]
    fn test_validate_timeout() {
        let mut config = FileConfig::default();
        config.context.default_timeout_ms = -2;
        assert_eq!(config.validate(), Err(ConfigValidationError::InvalidTimeout(-2)));

        config.context.default_timeout_ms = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_chunk_name() {
        let mut config = FileConfig::default();
        config.context.chunk_name = "  ".to_string();
        assert_eq!(config.validate(), Err(ConfigValidationError::EmptyChunkName));
    }

    #[test]
    fn test_unknown_output_format_rejected() {
        let toml_str = r#"
[output]
format = "yaml"
"#;
        assert!(toml::from_str::<FileConfig>(toml_str).is_err());
    }
}
