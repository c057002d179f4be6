//! Per-context bookkeeping of wrappers and adapters.
//!
//! The registry never keeps a wrapper alive: wrappers sit in a weak-valued
//! Lua table keyed by a serial number, and native objects map to the serial
//! of their current wrapper. Finalisation and native deletion both end in
//! [`WrapperRegistry::forget`], which only acts while the serial matches, so
//! whichever comes second is a no-op.

use super::function_slot::LuaFunctionSlot;
use super::native_wrapper::NativeWrapper;
use super::object_adapter::LuaObjectAdapter;
use super::script_context::ContextShared;
use bridge_domain::{BridgeError, ScriptableRef, SlotRef, object_key, slot_key};
use mlua::prelude::*;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::trace;

pub(crate) struct WrapperRegistry {
    wrappers: LuaTable,
    objects: RefCell<HashMap<usize, i64>>,
    next_serial: Cell<i64>,
    functions: RefCell<HashMap<(usize, usize), Weak<LuaFunctionSlot>>>,
    tables: RefCell<HashMap<usize, Weak<LuaObjectAdapter>>>,
}

impl WrapperRegistry {
    pub(crate) fn new(lua: &Lua) -> LuaResult<Self> {
        let wrappers = lua.create_table()?;
        let meta = lua.create_table()?;
        meta.set("__mode", "v")?;
        wrappers.set_metatable(Some(meta));
        Ok(Self {
            wrappers,
            objects: RefCell::new(HashMap::new()),
            next_serial: Cell::new(0),
            functions: RefCell::new(HashMap::new()),
            tables: RefCell::new(HashMap::new()),
        })
    }

    /// The sole wrapper of `object` in this context, created on first use.
    pub(crate) fn wrapper_for(&self, ctx: &ContextShared, object: &ScriptableRef) -> LuaResult<LuaAnyUserData> {
        let key = object_key(object);
        let serial = self.objects.borrow().get(&key).copied();
        if let Some(serial) = serial {
            if let LuaValue::UserData(existing) = self.wrappers.raw_get::<LuaValue>(serial)? {
                return Ok(existing);
            }
        }

        if object.is_deleted() {
            return Err(LuaError::external(BridgeError::ObjectDeleted));
        }

        let serial = self.next_serial.get() + 1;
        self.next_serial.set(serial);
        let wrapper = ctx
            .lua
            .create_userdata(NativeWrapper::new(ctx, object.clone(), serial))?;
        self.wrappers.raw_set(serial, wrapper.clone())?;
        self.objects.borrow_mut().insert(key, serial);
        trace!("Created wrapper #{} for object {:#x}", serial, key);
        Ok(wrapper)
    }

    /// Drops the entry of wrapper `serial`. `clear_script_entry` also removes
    /// it from the Lua side; finalizers must pass `false`.
    pub(crate) fn forget(&self, key: usize, serial: i64, clear_script_entry: bool) {
        if let Ok(mut objects) = self.objects.try_borrow_mut() {
            if objects.get(&key) == Some(&serial) {
                objects.remove(&key);
                trace!("Forgot wrapper #{} of object {:#x}", serial, key);
            }
        }
        if clear_script_entry {
            let _ = self.wrappers.raw_set(serial, LuaValue::Nil);
        }
    }

    /// Number of objects that currently have a wrapper.
    pub(crate) fn wrapper_count(&self) -> usize {
        self.objects.borrow().len()
    }

    /// Slot adapter for `function`, shared while the same function is
    /// adapted with the same prototype.
    pub(crate) fn function_slot(
        &self,
        ctx: &ContextShared,
        function: LuaFunction,
        prototype: Option<&SlotRef>,
    ) -> LuaResult<SlotRef> {
        let key = (function.to_pointer() as usize, prototype.map(slot_key).unwrap_or(0));
        let existing = self.functions.borrow().get(&key).and_then(Weak::upgrade);
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let slot = Rc::new(LuaFunctionSlot::new(ctx, function, prototype.cloned())?);
        self.functions.borrow_mut().insert(key, Rc::downgrade(&slot));
        Ok(slot)
    }

    /// Number of live script-function slot adapters.
    #[cfg(test)]
    pub(crate) fn function_count(&self) -> usize {
        self.functions
            .borrow()
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }

    pub(crate) fn prune_function(&self, key: (usize, usize)) {
        if let Ok(mut functions) = self.functions.try_borrow_mut() {
            if functions.get(&key).is_some_and(|slot| slot.strong_count() == 0) {
                functions.remove(&key);
            }
        }
    }

    /// Adapter object forwarding member access to `table`.
    pub(crate) fn table_adapter(&self, ctx: &ContextShared, table: LuaTable) -> LuaResult<Rc<LuaObjectAdapter>> {
        let key = table.to_pointer() as usize;
        let existing = self.tables.borrow().get(&key).and_then(Weak::upgrade);
        if let Some(existing) = existing {
            return Ok(existing);
        }

        let adapter = Rc::new(LuaObjectAdapter::new(ctx, table)?);
        self.tables.borrow_mut().insert(key, Rc::downgrade(&adapter));
        Ok(adapter)
    }

    pub(crate) fn prune_table(&self, key: usize) {
        if let Ok(mut tables) = self.tables.try_borrow_mut() {
            if tables.get(&key).is_some_and(|adapter| adapter.strong_count() == 0) {
                tables.remove(&key);
            }
        }
    }
}
