//! Script context port: interface for the embedded script engine.
//!
//! This port keeps the application and presentation layers independent of
//! mlua. The infrastructure layer provides `LuaScriptContext`.

use bridge_domain::{ScriptableRef, SlotRef, Variant};
use thiserror::Error;

/// Error from a script context operation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("script error: {message}")]
pub struct ScriptError {
    pub message: String,
}

impl ScriptError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Port for one script context (one engine instance with its own globals
/// and wrapper registry).
pub trait ScriptContextPort {
    /// Runs `source` for its side effects.
    fn execute(&self, source: &str, filename: &str) -> Result<(), ScriptError>;

    /// Runs `source` and converts its first result.
    fn evaluate(&self, source: &str, filename: &str) -> Result<Variant, ScriptError>;

    /// Compiles `source` into a callable slot without running it.
    fn compile(&self, source: &str, filename: &str) -> Result<SlotRef, ScriptError>;

    /// Makes the members of `object` reachable as globals.
    fn set_global_object(&self, object: ScriptableRef) -> Result<(), ScriptError>;

    /// Binds a global variable.
    fn assign_global(&self, name: &str, value: Variant) -> Result<(), ScriptError>;

    /// Assigns `value` to `property` of the object `object_expression`
    /// evaluates to.
    fn set_value(&self, object_expression: &str, property: &str, value: Variant) -> Result<(), ScriptError>;

    /// Runs a full garbage collection cycle.
    fn collect_garbage(&self);
}
