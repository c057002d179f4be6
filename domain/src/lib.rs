//! Domain layer for script-bridge
//!
//! This crate contains the value model and the object contracts shared by
//! every other layer. It knows nothing about the script engine.
//!
//! # Core Concepts
//!
//! ## Variant
//!
//! [`Variant`] is the tagged union exchanged between native code and
//! scripts. Its kind alone decides which payload is valid.
//!
//! ## Scriptable objects
//!
//! [`ScriptableObject`] is the capability contract of every native object
//! reachable from scripts: property lookup by name or id, get/set, an
//! attach/detach handshake and a deletion signal. [`ScriptableHelper`]
//! provides the member table most objects are built on.
//!
//! ## Slots and signals
//!
//! A [`Slot`] is an invocable with optional signature metadata. A [`Signal`]
//! fans out to connected slots and exposes one default connection that
//! script assignment reconnects.

pub mod config;
pub mod error;
pub mod scriptable;
pub mod signal;
pub mod slot;
pub mod variant;

pub use config::OutputFormat;
pub use error::{BridgeError, BridgeResult};
pub use scriptable::{
    ArrayHandler, ClassId, DynamicPropertyHandler, Member, PropertyId, PropertyInfo,
    ScriptableArray, ScriptableBinaryData, ScriptableFunction, ScriptableHelper, ScriptableObject,
    ScriptableRef, downcast, object_key, same_object,
};
pub use signal::{Connection, Signal};
pub use slot::{MethodSlot, NativeSlot, Signature, Slot, SlotRef, slot_key};
pub use variant::{Date, JsonString, Variant, VariantType};
