//! Scriptable object forwarding member access to a Lua table.

use super::converter::{lua_error, to_native, to_script};
use super::script_context::ContextShared;
use bridge_domain::{
    BridgeError, BridgeResult, ClassId, PropertyId, PropertyInfo, ScriptableHelper,
    ScriptableObject, Variant,
};
use mlua::prelude::*;
use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A plain Lua table seen from the native side.
///
/// Every name resolves. Functions are reported as methods, other fields as
/// untyped properties. Non-negative ids address `table[id + 1]`.
pub(crate) struct LuaObjectAdapter {
    helper: ScriptableHelper,
    ctx: Weak<ContextShared>,
    table: LuaRegistryKey,
    identity: usize,
    names: RefCell<Vec<String>>,
}

impl LuaObjectAdapter {
    pub(crate) const CLASS_ID: ClassId = ClassId(0x4f7e_13c6_a9d2_4e81);

    pub(crate) fn new(ctx: &ContextShared, table: LuaTable) -> LuaResult<Self> {
        let identity = table.to_pointer() as usize;
        let table = ctx.lua.create_registry_value(table)?;
        Ok(Self {
            helper: ScriptableHelper::new(),
            ctx: ctx.weak(),
            table,
            identity,
            names: RefCell::new(Vec::new()),
        })
    }

    /// The original table.
    pub(crate) fn table(&self, ctx: &ContextShared) -> LuaResult<LuaTable> {
        ctx.lua.registry_value::<LuaTable>(&self.table)
    }

    pub(crate) fn belongs_to(&self, ctx: &ContextShared) -> bool {
        std::ptr::eq(self.ctx.as_ptr(), ctx)
    }

    fn context(&self) -> BridgeResult<Rc<ContextShared>> {
        self.ctx
            .upgrade()
            .ok_or_else(|| BridgeError::Script("script context has been destroyed".to_string()))
    }

    fn name_id(&self, name: &str) -> PropertyId {
        let mut names = self.names.borrow_mut();
        let pos = match names.iter().position(|n| n == name) {
            Some(pos) => pos,
            None => {
                names.push(name.to_string());
                names.len() - 1
            }
        };
        -(pos as PropertyId) - 1
    }

    fn field_key(&self, ctx: &ContextShared, id: PropertyId) -> Option<LuaValue> {
        if id >= 0 {
            return Some(LuaValue::Integer(i64::from(id) + 1));
        }
        let pos = usize::try_from(-i64::from(id) - 1).ok()?;
        let name = self.names.borrow().get(pos).cloned()?;
        ctx.lua.create_string(name).ok().map(LuaValue::String)
    }

    fn field(&self, ctx: &ContextShared, key: LuaValue) -> BridgeResult<LuaValue> {
        self.table(ctx)
            .and_then(|table| table.get::<LuaValue>(key))
            .map_err(lua_error)
    }

    fn describe(&self, ctx: &ContextShared, id: PropertyId, key: LuaValue) -> Option<PropertyInfo> {
        let info = match self.field(ctx, key).ok()? {
            LuaValue::Function(function) => PropertyInfo {
                id,
                prototype: Variant::Slot(ctx.registry.function_slot(ctx, function, None).ok()),
                is_method: true,
            },
            _ => PropertyInfo {
                id,
                prototype: Variant::Any,
                is_method: false,
            },
        };
        Some(info)
    }
}

impl ScriptableObject for LuaObjectAdapter {
    fn class_id(&self) -> ClassId {
        Self::CLASS_ID
    }

    fn helper(&self) -> &ScriptableHelper {
        &self.helper
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn property_info_by_name(&self, name: &str) -> Option<PropertyInfo> {
        let ctx = self.context().ok()?;
        let key = ctx.lua.create_string(name).ok()?;
        self.describe(&ctx, self.name_id(name), LuaValue::String(key))
    }

    fn property_info_by_id(&self, id: PropertyId) -> Option<PropertyInfo> {
        let ctx = self.context().ok()?;
        let key = self.field_key(&ctx, id)?;
        self.describe(&ctx, id, key)
    }

    fn get_property(&self, id: PropertyId) -> BridgeResult<Variant> {
        let ctx = self.context()?;
        let Some(key) = self.field_key(&ctx, id) else {
            return Ok(Variant::Void);
        };
        let value = self.field(&ctx, key)?;
        to_native(&ctx, &value)
    }

    fn set_property(&self, id: PropertyId, value: Variant) -> bool {
        let Ok(ctx) = self.context() else {
            return false;
        };
        let Some(key) = self.field_key(&ctx, id) else {
            return false;
        };
        let Ok(value) = to_script(&ctx, &value) else {
            return false;
        };
        self.table(&ctx)
            .and_then(|table| table.set(key, value))
            .is_ok()
    }
}

impl Drop for LuaObjectAdapter {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.upgrade() {
            ctx.registry.prune_table(self.identity);
        }
    }
}
