//! Reusable member table for scriptable objects

use super::{PropertyId, PropertyInfo};
use crate::error::BridgeResult;
use crate::signal::{Connection, Signal};
use crate::slot::SlotRef;
use crate::variant::{Variant, VariantType};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Weak;
use tracing::{debug, trace};

/// Resolves names that are not in the static member table.
pub trait DynamicPropertyHandler {
    /// Returns the member's value, or its prototype when `want_info` is set.
    /// A `Void` info result means the name is unknown.
    fn dynamic_get(&self, name: &str, want_info: bool) -> BridgeResult<Variant>;

    fn dynamic_set(&self, name: &str, value: Variant) -> bool;
}

/// Positional access for array-like objects.
pub trait ArrayHandler {
    fn item_count(&self) -> usize;

    /// Item at `index`, or `Void` when out of range.
    fn get_item(&self, index: usize) -> Variant;

    fn set_item(&self, _index: usize, _value: Variant) -> bool {
        false
    }
}

/// One entry of the member table.
#[derive(Clone)]
pub enum Member {
    Constant(Variant),
    /// A missing getter makes the property write-only, a missing setter
    /// read-only.
    Property {
        prototype: Variant,
        getter: Option<SlotRef>,
        setter: Option<SlotRef>,
    },
    Method(SlotRef),
    Signal(Signal),
    /// A name previously resolved through the dynamic handler.
    Dynamic(String),
}

/// Ordered member table plus lifetime bookkeeping.
///
/// Registered members and dynamically resolved names share one id space:
/// the entry at position `i` has id `-(i + 1)`, constants report id `0`.
pub struct ScriptableHelper {
    members: RefCell<Vec<(String, Member)>>,
    index: RefCell<HashMap<String, usize>>,
    dynamic_handler: RefCell<Option<Weak<dyn DynamicPropertyHandler>>>,
    array_handler: RefCell<Option<Weak<dyn ArrayHandler>>>,
    ref_count: Cell<usize>,
    deleted: Cell<bool>,
    on_delete: Signal,
}

impl Default for ScriptableHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptableHelper {
    pub fn new() -> Self {
        Self {
            members: RefCell::new(Vec::new()),
            index: RefCell::new(HashMap::new()),
            dynamic_handler: RefCell::new(None),
            array_handler: RefCell::new(None),
            ref_count: Cell::new(0),
            deleted: Cell::new(false),
            on_delete: Signal::new(vec![]),
        }
    }

    fn insert(&self, name: &str, member: Member) {
        let mut index = self.index.borrow_mut();
        let mut members = self.members.borrow_mut();
        match index.get(name) {
            Some(&pos) => members[pos].1 = member,
            None => {
                index.insert(name.to_string(), members.len());
                members.push((name.to_string(), member));
            }
        }
    }

    pub fn register_constant(&self, name: &str, value: impl Into<Variant>) {
        self.insert(name, Member::Constant(value.into()));
    }

    /// Registers a property. The prototype is taken from the getter's return
    /// type, or the setter's first argument type for write-only properties.
    pub fn register_property(&self, name: &str, getter: Option<SlotRef>, setter: Option<SlotRef>) {
        let kind = getter
            .as_ref()
            .map(|g| g.return_type())
            .or_else(|| {
                setter
                    .as_ref()
                    .and_then(|s| s.arg_types().and_then(|t| t.first().copied()))
            })
            .unwrap_or(VariantType::Variant);
        self.insert(
            name,
            Member::Property {
                prototype: Variant::prototype(kind),
                getter,
                setter,
            },
        );
    }

    pub fn register_readonly_property(&self, name: &str, getter: SlotRef) {
        self.register_property(name, Some(getter), None);
    }

    pub fn register_method(&self, name: &str, slot: SlotRef) {
        self.insert(name, Member::Method(slot));
    }

    pub fn register_signal(&self, name: &str, signal: &Signal) {
        self.insert(name, Member::Signal(signal.clone()));
    }

    pub fn set_dynamic_property_handler(&self, handler: Weak<dyn DynamicPropertyHandler>) {
        *self.dynamic_handler.borrow_mut() = Some(handler);
    }

    pub fn set_array_handler(&self, handler: Weak<dyn ArrayHandler>) {
        *self.array_handler.borrow_mut() = Some(handler);
    }

    /// Names of the registered members, in registration order.
    pub fn member_names(&self) -> Vec<String> {
        self.members
            .borrow()
            .iter()
            .filter(|(_, m)| !matches!(m, Member::Dynamic(_)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn attach(&self) {
        self.ref_count.set(self.ref_count.get() + 1);
    }

    pub fn detach(&self) {
        self.ref_count.set(self.ref_count.get().saturating_sub(1));
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count.get()
    }

    pub fn connect_on_delete(&self, slot: SlotRef) -> Connection {
        self.on_delete.connect(Some(slot))
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.get()
    }

    /// Marks the object deleted on the native side and fires the deletion
    /// signal. Only the first call has an effect.
    pub fn notify_deleted(&self) {
        if self.deleted.replace(true) {
            return;
        }
        trace!("Scriptable object deleted, {} listener(s)", self.on_delete.connection_count());
        self.on_delete.emit(&[]);
    }

    fn dynamic_handler(&self) -> Option<std::rc::Rc<dyn DynamicPropertyHandler>> {
        self.dynamic_handler.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn array_handler(&self) -> Option<std::rc::Rc<dyn ArrayHandler>> {
        self.array_handler.borrow().as_ref().and_then(Weak::upgrade)
    }

    fn dynamic_info(&self, name: &str) -> Option<Variant> {
        let handler = self.dynamic_handler()?;
        match handler.dynamic_get(name, true) {
            Ok(Variant::Void) => None,
            Ok(prototype) => Some(prototype),
            Err(e) => {
                debug!("Dynamic lookup of '{}' failed: {}", name, e);
                None
            }
        }
    }

    fn info_of(&self, id: PropertyId, member: &Member) -> Option<PropertyInfo> {
        let info = match member {
            Member::Constant(value) => PropertyInfo {
                id: 0,
                prototype: value.clone(),
                is_method: false,
            },
            Member::Property { prototype, .. } => PropertyInfo {
                id,
                prototype: prototype.clone(),
                is_method: false,
            },
            Member::Method(slot) => PropertyInfo {
                id,
                prototype: Variant::Slot(Some(slot.clone())),
                is_method: true,
            },
            Member::Signal(signal) => PropertyInfo {
                id,
                prototype: Variant::Slot(Some(signal.prototype_slot())),
                is_method: false,
            },
            Member::Dynamic(name) => PropertyInfo {
                id,
                prototype: self.dynamic_info(name)?,
                is_method: false,
            },
        };
        Some(info)
    }

    fn member_at(&self, id: PropertyId) -> Option<Member> {
        if id >= 0 {
            return None;
        }
        let pos = usize::try_from(-(id as i64) - 1).ok()?;
        self.members.borrow().get(pos).map(|(_, m)| m.clone())
    }

    pub fn property_info_by_name(&self, name: &str) -> Option<PropertyInfo> {
        let existing = self.index.borrow().get(name).copied();
        if let Some(pos) = existing {
            let member = self.members.borrow()[pos].1.clone();
            return self.info_of(-(pos as PropertyId) - 1, &member);
        }

        let prototype = self.dynamic_info(name)?;
        let pos = {
            let mut members = self.members.borrow_mut();
            members.push((name.to_string(), Member::Dynamic(name.to_string())));
            members.len() - 1
        };
        self.index.borrow_mut().insert(name.to_string(), pos);
        Some(PropertyInfo {
            id: -(pos as PropertyId) - 1,
            prototype,
            is_method: false,
        })
    }

    pub fn property_info_by_id(&self, id: PropertyId) -> Option<PropertyInfo> {
        if id >= 0 {
            let handler = self.array_handler()?;
            let index = usize::try_from(id).ok()?;
            return (index < handler.item_count()).then(|| PropertyInfo {
                id,
                prototype: Variant::Any,
                is_method: false,
            });
        }
        let member = self.member_at(id)?;
        self.info_of(id, &member)
    }

    pub fn get_property(&self, id: PropertyId) -> BridgeResult<Variant> {
        if id >= 0 {
            let value = match (self.array_handler(), usize::try_from(id)) {
                (Some(handler), Ok(index)) => handler.get_item(index),
                _ => Variant::Void,
            };
            return Ok(value);
        }
        match self.member_at(id) {
            Some(Member::Constant(value)) => Ok(value),
            Some(Member::Property { getter: Some(getter), .. }) => getter.call(&[]),
            Some(Member::Property { getter: None, .. }) => Ok(Variant::Void),
            Some(Member::Method(slot)) => Ok(Variant::Slot(Some(slot))),
            Some(Member::Signal(signal)) => Ok(Variant::Slot(signal.default_connected_slot())),
            Some(Member::Dynamic(name)) => match self.dynamic_handler() {
                Some(handler) => handler.dynamic_get(&name, false),
                None => Ok(Variant::Void),
            },
            None => Ok(Variant::Void),
        }
    }

    pub fn set_property(&self, id: PropertyId, value: Variant) -> bool {
        if id >= 0 {
            return match (self.array_handler(), usize::try_from(id)) {
                (Some(handler), Ok(index)) => handler.set_item(index, value),
                _ => false,
            };
        }
        match self.member_at(id) {
            Some(Member::Property { setter: Some(setter), .. }) => match setter.call(&[value]) {
                Ok(_) => true,
                Err(e) => {
                    debug!("Property setter failed: {}", e);
                    false
                }
            },
            Some(Member::Signal(signal)) => match value {
                Variant::Slot(slot) => signal.set_default_connected_slot(slot),
                _ => false,
            },
            Some(Member::Dynamic(name)) => self
                .dynamic_handler()
                .is_some_and(|handler| handler.dynamic_set(&name, value)),
            _ => false,
        }
    }
}
