//! Lua script context: one engine instance bridged to native objects.
//!
//! `LuaScriptContext` implements `ScriptContextPort` from the application
//! layer on top of an mlua Lua 5.4 VM. Every value crossing the boundary
//! goes through the converter; native objects appear as wrapper userdata
//! owned by this context's registry.

use super::converter::{to_native, to_native_as, to_script};
use super::date::register_date_api;
use super::native_wrapper::NativeWrapper;
use super::object_adapter::LuaObjectAdapter;
use super::sandbox::apply_sandbox;
use super::wrapper_registry::WrapperRegistry;
use bridge_application::{ContextOptions, ScriptContextPort, ScriptError};
use bridge_domain::{BridgeError, ScriptableRef, SlotRef, Variant, VariantType, downcast};
use mlua::prelude::*;
use std::rc::{Rc, Weak};
use tracing::debug;

/// State shared by the context and everything it hands out.
///
/// Wrappers, slot adapters and table adapters hold it weakly; only the
/// owning [`LuaScriptContext`] keeps it alive.
pub(crate) struct ContextShared {
    pub(crate) registry: WrapperRegistry,
    pub(crate) options: ContextOptions,
    this: Weak<ContextShared>,
    pub(crate) lua: Lua,
}

impl ContextShared {
    pub(crate) fn weak(&self) -> Weak<ContextShared> {
        self.this.clone()
    }
}

pub(crate) fn upgrade(ctx: &Weak<ContextShared>) -> LuaResult<Rc<ContextShared>> {
    ctx.upgrade()
        .ok_or_else(|| LuaError::external("script context has been destroyed"))
}

/// Convert a mlua error to a `ScriptError`.
fn lua_to_script_error(e: LuaError) -> ScriptError {
    ScriptError::new(e.to_string())
}

fn bridge_to_script_error(e: BridgeError) -> ScriptError {
    ScriptError::new(e.to_string())
}

/// Lua 5.4 script context implementing `ScriptContextPort`.
///
/// Not `Send`: the context and every object it touches live on one thread.
pub struct LuaScriptContext {
    shared: Rc<ContextShared>,
}

impl LuaScriptContext {
    /// Create a new context.
    ///
    /// Sets up the VM with:
    /// - Sandbox (native module loading blocked), unless disabled
    /// - `null`, the sentinel for null strings and objects
    /// - `Date(ms)` / `Date.now()`
    pub fn new(options: &ContextOptions) -> Result<Self, ScriptError> {
        let lua = Lua::new();

        if options.sandbox {
            apply_sandbox(&lua)
                .map_err(|e| ScriptError::new(format!("sandbox setup failed: {}", e)))?;
        }
        lua.globals()
            .set("null", LuaValue::NULL)
            .map_err(lua_to_script_error)?;
        register_date_api(&lua).map_err(lua_to_script_error)?;
        let registry = WrapperRegistry::new(&lua).map_err(lua_to_script_error)?;

        let shared = Rc::new_cyclic(|this| ContextShared {
            registry,
            options: options.clone(),
            this: this.clone(),
            lua,
        });
        debug!("Script context created (sandbox: {})", options.sandbox);
        Ok(Self { shared })
    }

    pub fn options(&self) -> &ContextOptions {
        &self.shared.options
    }

    /// Number of native objects currently wrapped in this context.
    pub fn wrapper_count(&self) -> usize {
        self.shared.registry.wrapper_count()
    }

    /// JSON form of a table created by a script of this context, `None`
    /// for any other value.
    pub fn table_json(&self, value: &Variant) -> Option<Variant> {
        let Variant::Scriptable(Some(object)) = value else {
            return None;
        };
        let adapter = downcast::<LuaObjectAdapter>(object).filter(|a| a.belongs_to(&self.shared))?;
        let table = adapter.table(&self.shared).ok()?;
        to_native_as(&self.shared, &LuaValue::Table(table), VariantType::Json, None).ok()
    }

    pub(crate) fn shared(&self) -> &ContextShared {
        &self.shared
    }

    fn chunk_name(&self, filename: &str) -> String {
        if filename.is_empty() {
            self.shared.options.chunk_name.clone()
        } else {
            filename.to_string()
        }
    }
}

impl ScriptContextPort for LuaScriptContext {
    fn execute(&self, source: &str, filename: &str) -> Result<(), ScriptError> {
        self.shared
            .lua
            .load(source)
            .set_name(self.chunk_name(filename))
            .exec()
            .map_err(lua_to_script_error)
    }

    fn evaluate(&self, source: &str, filename: &str) -> Result<Variant, ScriptError> {
        let values: LuaMultiValue = self
            .shared
            .lua
            .load(source)
            .set_name(self.chunk_name(filename))
            .eval()
            .map_err(lua_to_script_error)?;
        let first = values.into_iter().next().unwrap_or(LuaValue::Nil);
        to_native(&self.shared, &first).map_err(bridge_to_script_error)
    }

    fn compile(&self, source: &str, filename: &str) -> Result<SlotRef, ScriptError> {
        let function = self
            .shared
            .lua
            .load(source)
            .set_name(self.chunk_name(filename))
            .into_function()
            .map_err(lua_to_script_error)?;
        self.shared
            .registry
            .function_slot(&self.shared, function, None)
            .map_err(lua_to_script_error)
    }

    fn set_global_object(&self, object: ScriptableRef) -> Result<(), ScriptError> {
        let lua = &self.shared.lua;
        let wrapper = self
            .shared
            .registry
            .wrapper_for(&self.shared, &object)
            .map_err(lua_to_script_error)?;

        let forward = wrapper.clone();
        let new_index = lua
            .create_function(move |_, (globals, key, value): (LuaTable, LuaValue, LuaValue)| {
                let routed = match &key {
                    LuaValue::String(name) => forward
                        .borrow::<NativeWrapper>()?
                        .has_member(&name.to_string_lossy()),
                    _ => false,
                };
                if routed {
                    forward.borrow::<NativeWrapper>()?.new_index(key, value)
                } else {
                    globals.raw_set(key, value)
                }
            })
            .map_err(lua_to_script_error)?;

        let meta = lua.create_table().map_err(lua_to_script_error)?;
        meta.set("__index", wrapper).map_err(lua_to_script_error)?;
        meta.set("__newindex", new_index)
            .map_err(lua_to_script_error)?;
        lua.globals().set_metatable(Some(meta));
        Ok(())
    }

    fn assign_global(&self, name: &str, value: Variant) -> Result<(), ScriptError> {
        let value = to_script(&self.shared, &value).map_err(bridge_to_script_error)?;
        self.shared
            .lua
            .globals()
            .raw_set(name, value)
            .map_err(lua_to_script_error)
    }

    fn set_value(&self, object_expression: &str, property: &str, value: Variant) -> Result<(), ScriptError> {
        let lua = &self.shared.lua;
        let target: LuaValue = lua
            .load(object_expression)
            .set_name(self.chunk_name(""))
            .eval()
            .map_err(lua_to_script_error)?;
        if target.is_nil() || super::print::is_null(&target) {
            return Err(ScriptError::new(format!(
                "'{}' does not evaluate to an object",
                object_expression
            )));
        }
        let value = to_script(&self.shared, &value).map_err(bridge_to_script_error)?;
        let assign: LuaFunction = lua
            .load("local target, key, value = ...; target[key] = value")
            .set_name("set_value")
            .into_function()
            .map_err(lua_to_script_error)?;
        assign
            .call::<()>((target, property, value))
            .map_err(lua_to_script_error)
    }

    fn collect_garbage(&self) {
        let lua = &self.shared.lua;
        // Finalizers release pinned values, which the second pass reclaims.
        for _ in 0..2 {
            if let Err(e) = lua.gc_collect() {
                debug!("Garbage collection failed: {}", e);
            }
        }
        lua.expire_registry_values();
    }
}
