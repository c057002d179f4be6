//! Script context options.

use serde::{Deserialize, Serialize};

/// Options applied when a script context is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextOptions {
    /// Strip native module loading from the engine.
    pub sandbox: bool,
    /// Default bus method call timeout in milliseconds, `-1` for none.
    pub default_timeout_ms: i32,
    /// Chunk name reported in script error messages.
    pub chunk_name: String,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            sandbox: true,
            default_timeout_ms: -1,
            chunk_name: "script".to_string(),
        }
    }
}

impl ContextOptions {
    // ==================== Builder Methods ====================

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_default_timeout_ms(mut self, timeout_ms: i32) -> Self {
        self.default_timeout_ms = if timeout_ms >= 0 { timeout_ms } else { -1 };
        self
    }

    pub fn with_chunk_name(mut self, name: impl Into<String>) -> Self {
        self.chunk_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ContextOptions::default();
        assert!(options.sandbox);
        assert_eq!(options.default_timeout_ms, -1);
        assert_eq!(options.chunk_name, "script");
    }

    #[test]
    fn test_negative_timeout_means_none() {
        let options = ContextOptions::default().with_default_timeout_ms(-30);
        assert_eq!(options.default_timeout_ms, -1);
        let options = options.with_default_timeout_ms(500).with_sandbox(false);
        assert_eq!(options.default_timeout_ms, 500);
        assert!(!options.sandbox);
    }
}
