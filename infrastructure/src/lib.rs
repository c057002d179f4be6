//! Infrastructure layer for script-bridge
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: the Lua script context, the in-memory bus
//! and configuration file loading.

pub mod bus;
pub mod config;
pub mod scripting;

// Re-export commonly used types
pub use bus::{
    DEMO_INTERFACE, DEMO_PATH, DEMO_SERVICE, InterfaceDef, MemoryBus, MemoryBusProxy,
    MethodHandler, demo_bus,
};
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileContextConfig, FileOutputConfig,
    FileOutputFormat,
};
pub use scripting::{LuaScriptContext, ScriptDate, apply_sandbox, describe_value};
