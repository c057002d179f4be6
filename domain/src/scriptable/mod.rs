//! Object capability model
//!
//! Any native object reachable from scripts implements [`ScriptableObject`].
//! Most objects keep their member table in a [`ScriptableHelper`] and only
//! override the methods whose behavior differs.
//!
//! Property ids follow one convention across the bridge:
//! - `0`: the member is a constant and its prototype is its value
//! - negative: a handle issued by [`ScriptableObject::property_info_by_name`]
//! - non-negative (other than constants): positional/array items

mod array;
mod binary_data;
mod function;
mod helper;

pub use array::ScriptableArray;
pub use binary_data::ScriptableBinaryData;
pub use function::ScriptableFunction;
pub use helper::{ArrayHandler, DynamicPropertyHandler, Member, ScriptableHelper};

use crate::error::BridgeResult;
use crate::signal::Connection;
use crate::slot::SlotRef;
use crate::variant::Variant;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Unique identity of a scriptable class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u64);

impl ClassId {
    /// Every scriptable object is an instance of this class.
    pub const SCRIPTABLE: ClassId = ClassId(0);
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

pub type PropertyId = i32;

/// Result of a property lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyInfo {
    pub id: PropertyId,
    /// Value whose kind describes the property. For constants this is the
    /// value itself.
    pub prototype: Variant,
    /// Distinguishes methods from signal properties, which both have
    /// slot prototypes.
    pub is_method: bool,
}

impl PropertyInfo {
    pub fn is_constant(&self) -> bool {
        self.id == 0
    }
}

/// Shared handle to a scriptable object.
pub type ScriptableRef = Rc<dyn ScriptableObject>;

/// Contract between native objects and the script bridge.
pub trait ScriptableObject: Any {
    fn class_id(&self) -> ClassId;

    /// Member table backing the default implementations below.
    fn helper(&self) -> &ScriptableHelper;

    fn as_any(&self) -> &dyn Any;

    fn is_instance_of(&self, class_id: ClassId) -> bool {
        class_id == self.class_id() || class_id == ClassId::SCRIPTABLE
    }

    /// Script side takes an interest in this object.
    fn attach(&self) {
        self.helper().attach();
    }

    /// Script side releases its interest.
    fn detach(&self) {
        self.helper().detach();
    }

    fn ref_count(&self) -> usize {
        self.helper().ref_count()
    }

    /// Connects a slot called when the native side deletes this object.
    fn connect_on_delete(&self, slot: SlotRef) -> Connection {
        self.helper().connect_on_delete(slot)
    }

    fn is_deleted(&self) -> bool {
        self.helper().is_deleted()
    }

    fn property_info_by_name(&self, name: &str) -> Option<PropertyInfo> {
        self.helper().property_info_by_name(name)
    }

    fn property_info_by_id(&self, id: PropertyId) -> Option<PropertyInfo> {
        self.helper().property_info_by_id(id)
    }

    /// Reads a property; unsupported ids yield `Void`.
    fn get_property(&self, id: PropertyId) -> BridgeResult<Variant> {
        self.helper().get_property(id)
    }

    /// Writes a property, returning whether the write was accepted.
    fn set_property(&self, id: PropertyId, value: Variant) -> bool {
        self.helper().set_property(id, value)
    }
}

/// Address of the object allocation, used as its identity key.
pub fn object_key(object: &ScriptableRef) -> usize {
    Rc::as_ptr(object) as *const () as usize
}

/// Identity comparison of two optional object references.
pub fn same_object(a: &Option<ScriptableRef>, b: &Option<ScriptableRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => object_key(a) == object_key(b),
        (None, None) => true,
        _ => false,
    }
}

/// Downcasts a scriptable reference to a concrete type.
pub fn downcast<T: ScriptableObject>(object: &ScriptableRef) -> Option<&T> {
    object.as_any().downcast_ref::<T>()
}
