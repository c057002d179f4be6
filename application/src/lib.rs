//! Application layer for script-bridge
//!
//! This crate contains the port definitions, the dynamic member resolution
//! chain and the scriptable bus object built on it. It depends only on the
//! domain layer.

pub mod bus_object;
pub mod config;
pub mod dynamic;
pub mod ports;

// Re-export commonly used types
pub use bus_object::{BusMethodSlot, ScriptableBusObject};
pub use config::ContextOptions;
pub use dynamic::{MemberIntrospection, SignalCache, resolve_get, resolve_set};
pub use ports::{
    bus_proxy::{
        BusError, BusProxy, CallId, MethodInfo, PropertyAccess, ResultCallback, SignalHandler,
    },
    script_context::{ScriptContextPort, ScriptError},
};
