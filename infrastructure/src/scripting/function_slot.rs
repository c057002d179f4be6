//! Native slot backed by a Lua function.

use super::converter::{lua_error, to_native_as, to_script};
use super::script_context::ContextShared;
use bridge_domain::{BridgeError, BridgeResult, Signature, Slot, SlotRef, Variant, slot_key};
use mlua::prelude::*;
use std::any::Any;
use std::rc::{Rc, Weak};

/// Callback adapter that pins a Lua function for its own lifetime.
///
/// Carries the metadata of the prototype slot it was converted against, if
/// any. Without a prototype the function's result is discarded.
pub(crate) struct LuaFunctionSlot {
    prototype: Option<SlotRef>,
    ctx: Weak<ContextShared>,
    function: LuaRegistryKey,
    identity: usize,
}

impl LuaFunctionSlot {
    pub(crate) fn new(ctx: &ContextShared, function: LuaFunction, prototype: Option<SlotRef>) -> LuaResult<Self> {
        let identity = function.to_pointer() as usize;
        let function = ctx.lua.create_registry_value(function)?;
        Ok(Self {
            prototype,
            ctx: ctx.weak(),
            function,
            identity,
        })
    }

    /// The pinned function.
    pub(crate) fn function(&self, ctx: &ContextShared) -> LuaResult<LuaFunction> {
        ctx.lua.registry_value::<LuaFunction>(&self.function)
    }

    pub(crate) fn belongs_to(&self, ctx: &ContextShared) -> bool {
        std::ptr::eq(self.ctx.as_ptr(), ctx)
    }

    fn prototype_key(&self) -> usize {
        self.prototype.as_ref().map(slot_key).unwrap_or(0)
    }

    fn context(&self) -> BridgeResult<Rc<ContextShared>> {
        self.ctx
            .upgrade()
            .ok_or_else(|| BridgeError::Script("script context has been destroyed".to_string()))
    }
}

impl Slot for LuaFunctionSlot {
    fn call(&self, args: &[Variant]) -> BridgeResult<Variant> {
        let ctx = self.context()?;
        let function = self.function(&ctx).map_err(lua_error)?;
        let args = args
            .iter()
            .map(|arg| to_script(&ctx, arg))
            .collect::<BridgeResult<Vec<_>>>()?;
        let result: LuaValue = function
            .call(LuaMultiValue::from_vec(args))
            .map_err(lua_error)?;

        match &self.prototype {
            Some(prototype) => to_native_as(&ctx, &result, prototype.return_type(), None),
            None => Ok(Variant::Void),
        }
    }

    fn signature(&self) -> Option<&Signature> {
        self.prototype.as_ref().and_then(|prototype| prototype.signature())
    }

    fn same_as(&self, other: &dyn Slot) -> bool {
        other
            .as_any()
            .downcast_ref::<LuaFunctionSlot>()
            .is_some_and(|other| other.identity == self.identity && Weak::ptr_eq(&other.ctx, &self.ctx))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for LuaFunctionSlot {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.upgrade() {
            ctx.registry.prune_function((self.identity, self.prototype_key()));
        }
    }
}
