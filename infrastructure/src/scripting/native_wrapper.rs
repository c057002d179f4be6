//! Lua userdata fronting a native scriptable object.
//!
//! A wrapper holds the strong reference to its object and keeps it attached
//! until the wrapper is finalised or the native side deletes the object.

use super::converter::{convert_args, to_native_typed, to_script};
use super::print::describe_value;
use super::script_context::{ContextShared, upgrade};
use bridge_domain::{
    BridgeError, Connection, NativeSlot, PropertyId, ScriptableFunction, ScriptableRef, SlotRef,
    Variant, downcast, object_key,
};
use mlua::prelude::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::trace;

struct WrapperState {
    object: RefCell<Option<ScriptableRef>>,
    key: usize,
    serial: i64,
    ctx: Weak<ContextShared>,
    on_delete: RefCell<Option<Connection>>,
    /// Method functions handed out so far, so that repeated lookups compare
    /// equal in scripts.
    methods: RefCell<HashMap<PropertyId, (SlotRef, LuaFunction)>>,
}

impl WrapperState {
    /// Detaches the object and drops the registry entry. Runs once.
    fn release(&self, deleted: bool) {
        let Some(object) = self.object.borrow_mut().take() else {
            return;
        };
        if let Some(connection) = self.on_delete.borrow_mut().take() {
            connection.disconnect();
        }
        object.detach();
        if let Some(ctx) = self.ctx.upgrade() {
            ctx.registry.forget(self.key, self.serial, deleted);
        }
        trace!(
            "Released wrapper #{} ({})",
            self.serial,
            if deleted { "object deleted" } else { "finalized" }
        );
    }
}

pub(crate) struct NativeWrapper {
    state: Rc<WrapperState>,
}

impl NativeWrapper {
    pub(crate) fn new(ctx: &ContextShared, object: ScriptableRef, serial: i64) -> Self {
        object.attach();
        let state = Rc::new(WrapperState {
            key: object_key(&object),
            object: RefCell::new(Some(object.clone())),
            serial,
            ctx: ctx.weak(),
            on_delete: RefCell::new(None),
            methods: RefCell::new(HashMap::new()),
        });

        let weak = Rc::downgrade(&state);
        let on_delete = NativeSlot::untyped(move |_| {
            if let Some(state) = weak.upgrade() {
                state.release(true);
            }
            Ok(Variant::Void)
        })
        .into_ref();
        *state.on_delete.borrow_mut() = Some(object.connect_on_delete(on_delete));

        Self { state }
    }

    /// The wrapped object, `None` once it has been deleted.
    pub(crate) fn object(&self) -> Option<ScriptableRef> {
        self.state.object.borrow().clone()
    }

    pub(crate) fn key(&self) -> usize {
        self.state.key
    }

    /// Whether assigning `name` should be routed to the object.
    pub(crate) fn has_member(&self, name: &str) -> bool {
        self.object()
            .and_then(|object| object.property_info_by_name(name))
            .is_some()
    }

    fn context(&self) -> LuaResult<Rc<ContextShared>> {
        upgrade(&self.state.ctx)
    }

    fn live_object(&self) -> LuaResult<ScriptableRef> {
        self.object()
            .ok_or_else(|| LuaError::external(BridgeError::ObjectDeleted))
    }

    /// The function exposing method `id`, reused while the member keeps
    /// the same slot.
    fn method(&self, ctx: &ContextShared, id: PropertyId, slot: &SlotRef) -> LuaResult<LuaFunction> {
        if let Some((cached, function)) = self.state.methods.borrow().get(&id) {
            if cached.same_as(slot.as_ref()) {
                return Ok(function.clone());
            }
        }
        let function = method_function(ctx, slot.clone(), self.state.key)?;
        self.state
            .methods
            .borrow_mut()
            .insert(id, (slot.clone(), function.clone()));
        Ok(function)
    }

    fn index(&self, key: LuaValue) -> LuaResult<LuaValue> {
        let ctx = self.context()?;
        let object = self.live_object()?;

        let value = match key {
            LuaValue::Integer(index) if index >= 1 => {
                let Ok(id) = PropertyId::try_from(index - 1) else {
                    return Ok(LuaValue::Nil);
                };
                if object.property_info_by_id(id).is_none() {
                    return Ok(LuaValue::Nil);
                }
                object.get_property(id).map_err(LuaError::external)?
            }
            LuaValue::String(name) => {
                let name = name.to_string_lossy();
                let Some(info) = object.property_info_by_name(&name) else {
                    return Ok(LuaValue::Nil);
                };
                if info.is_constant() {
                    info.prototype
                } else if let (true, Some(slot)) = (info.is_method, info.prototype.as_slot()) {
                    return self.method(&ctx, info.id, slot).map(LuaValue::Function);
                } else {
                    object.get_property(info.id).map_err(LuaError::external)?
                }
            }
            _ => return Ok(LuaValue::Nil),
        };
        to_script(&ctx, &value).map_err(LuaError::external)
    }

    pub(crate) fn new_index(&self, key: LuaValue, value: LuaValue) -> LuaResult<()> {
        let ctx = self.context()?;
        let object = self.live_object()?;

        let (id, prototype, name) = match &key {
            LuaValue::Integer(index) if *index >= 1 => {
                let info = PropertyId::try_from(index - 1)
                    .ok()
                    .and_then(|id| object.property_info_by_id(id))
                    .ok_or_else(|| LuaError::external(BridgeError::NotFound(index.to_string())))?;
                (info.id, info.prototype, index.to_string())
            }
            LuaValue::String(name) => {
                let name = name.to_string_lossy().to_string();
                let Some(info) = object.property_info_by_name(&name) else {
                    return Err(LuaError::external(BridgeError::NotFound(name)));
                };
                if info.is_constant() || info.is_method {
                    return Err(LuaError::external(BridgeError::ReadOnly(name)));
                }
                (info.id, info.prototype, name)
            }
            other => {
                return Err(LuaError::external(BridgeError::NotFound(describe_value(
                    &ctx.lua, other,
                ))));
            }
        };

        let value = to_native_typed(&ctx, &value, &prototype).map_err(LuaError::external)?;
        if object.set_property(id, value) {
            Ok(())
        } else {
            Err(LuaError::external(BridgeError::SetFailed(name)))
        }
    }

    fn call(&self, args: LuaMultiValue) -> LuaResult<LuaValue> {
        let ctx = self.context()?;
        let object = self.live_object()?;
        let Some(function) = downcast::<ScriptableFunction>(&object) else {
            return Err(LuaError::external(format!(
                "object of class {} is not callable",
                object.class_id()
            )));
        };

        let mut args: Vec<LuaValue> = args.into_vec();
        let called_on_owner = match args.first() {
            Some(LuaValue::UserData(ud)) => ud
                .borrow::<NativeWrapper>()
                .ok()
                .and_then(|receiver| receiver.object())
                .is_some_and(|receiver| function.is_owned_by(&receiver)),
            _ => false,
        };
        if called_on_owner {
            args.remove(0);
        }
        call_slot(&ctx, function.slot(), &args)
    }

    fn describe(&self) -> String {
        match self.object() {
            Some(object) => format!("ScriptableObject({})", object.class_id()),
            None => "ScriptableObject(deleted)".to_string(),
        }
    }
}

impl Drop for NativeWrapper {
    fn drop(&mut self) {
        self.state.release(false);
    }
}

impl LuaUserData for NativeWrapper {
    fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(LuaMetaMethod::Index, |_, this, key: LuaValue| this.index(key));
        methods.add_meta_method(
            LuaMetaMethod::NewIndex,
            |_, this, (key, value): (LuaValue, LuaValue)| this.new_index(key, value),
        );
        methods.add_meta_method(LuaMetaMethod::Call, |_, this, args: LuaMultiValue| this.call(args));
        methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.describe()));
    }
}

/// Converts `args` against the slot's metadata, calls it and converts the
/// result back.
pub(crate) fn call_slot(ctx: &ContextShared, slot: &SlotRef, args: &[LuaValue]) -> LuaResult<LuaValue> {
    let args = convert_args(ctx, slot.as_ref(), args).map_err(LuaError::external)?;
    let result = slot.call(&args).map_err(LuaError::external)?;
    to_script(ctx, &result).map_err(LuaError::external)
}

/// Lua function for a method of the object `owner`. Accepts both `obj:m()`
/// and `obj.m()`.
fn method_function(ctx: &ContextShared, slot: SlotRef, owner: usize) -> LuaResult<LuaFunction> {
    let weak = ctx.weak();
    ctx.lua.create_function(move |_, args: LuaMultiValue| {
        let ctx = upgrade(&weak)?;
        let mut args: Vec<LuaValue> = args.into_vec();
        let called_on_owner = match args.first() {
            Some(LuaValue::UserData(ud)) => ud
                .borrow::<NativeWrapper>()
                .is_ok_and(|receiver| receiver.key() == owner),
            _ => false,
        };
        if called_on_owner {
            args.remove(0);
        }
        call_slot(&ctx, &slot, &args)
    })
}
