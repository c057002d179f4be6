//! Lua scripting bridge
//!
//! Provides the `LuaScriptContext` that implements `ScriptContextPort`
//! from the application layer, backed by mlua (Lua 5.4).
//!
//! # Modules
//!
//! - `converter`: Lua value <-> variant conversion, argument lists
//! - `native_wrapper`: userdata exposing a native object's members
//! - `function_slot`: native slot calling a pinned Lua function
//! - `object_adapter`: native object view of a Lua table
//! - `wrapper_registry`: one wrapper per object, weakly held
//! - `date`: the `Date` API
//! - `sandbox`: native module blocking
//! - `print`: value rendering for diagnostics
//! - `script_context`: the context tying everything together

mod converter;
mod date;
mod function_slot;
mod native_wrapper;
mod object_adapter;
mod print;
mod sandbox;
mod script_context;
mod wrapper_registry;

pub use date::ScriptDate;
pub use print::describe_value;
pub use sandbox::apply_sandbox;
pub use script_context::LuaScriptContext;
