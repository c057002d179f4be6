//! Slots: invocable callbacks with optional signature metadata

use crate::error::{BridgeError, BridgeResult};
use crate::variant::{Variant, VariantType};
use std::any::Any;
use std::fmt;
use std::rc::{Rc, Weak};

/// Call signature of a slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    /// Declared argument kinds; `None` means untyped.
    pub arg_types: Option<Vec<VariantType>>,
    /// Declared argument count; `None` means unbounded (variadic).
    pub arg_count: Option<usize>,
    pub return_type: VariantType,
    /// Defaults aligned with the trailing arguments. A `Void` entry means
    /// "no default" at that position.
    pub default_args: Option<Vec<Variant>>,
    /// Per-argument prototypes overriding the plain kind, e.g. a slot
    /// carrying the signature a callback argument must be adapted to. A
    /// `Void` entry means "use the declared kind".
    pub arg_prototypes: Option<Vec<Variant>>,
}

impl Signature {
    pub fn new(arg_types: Vec<VariantType>, return_type: VariantType) -> Self {
        Self {
            arg_count: Some(arg_types.len()),
            arg_types: Some(arg_types),
            return_type,
            default_args: None,
            arg_prototypes: None,
        }
    }

    /// Untyped, unbounded arguments.
    pub fn variadic(return_type: VariantType) -> Self {
        Self {
            arg_types: None,
            arg_count: None,
            return_type,
            default_args: None,
            arg_prototypes: None,
        }
    }

    pub fn with_defaults(mut self, defaults: Vec<Variant>) -> Self {
        self.default_args = Some(defaults);
        self
    }

    /// Sets the prototype of argument `index`.
    pub fn with_arg_prototype(mut self, index: usize, prototype: Variant) -> Self {
        let prototypes = self.arg_prototypes.get_or_insert_with(Vec::new);
        if prototypes.len() <= index {
            prototypes.resize(index + 1, Variant::Void);
        }
        prototypes[index] = prototype;
        self
    }

    /// Prototype declared for argument `index`, if any.
    pub fn arg_prototype(&self, index: usize) -> Option<&Variant> {
        self.arg_prototypes
            .as_ref()?
            .get(index)
            .filter(|p| !p.is_void())
    }

    /// Minimum number of arguments a caller must pass.
    ///
    /// Defaults are aligned to the end of the argument list; only the
    /// contiguous trailing run of non-`Void` defaults lowers the minimum.
    pub fn min_arg_count(&self) -> usize {
        let Some(count) = self.arg_count else {
            return 0;
        };
        let Some(defaults) = &self.default_args else {
            return count;
        };
        let trailing = defaults.iter().rev().take_while(|d| !d.is_void()).count();
        count.saturating_sub(trailing.min(count))
    }

    /// Default value for argument `index`, if one is declared.
    pub fn default_for(&self, index: usize) -> Option<&Variant> {
        let count = self.arg_count?;
        let defaults = self.default_args.as_ref()?;
        let offset = count.checked_sub(defaults.len())?;
        let pos = index.checked_sub(offset)?;
        defaults.get(pos).filter(|d| !d.is_void())
    }

    /// Validate a given argument count against this signature.
    pub fn check_arity(&self, given: usize) -> BridgeResult<()> {
        let Some(expected) = self.arg_count else {
            return Ok(());
        };
        let min = self.min_arg_count();
        if given < min || given > expected {
            return Err(BridgeError::Arity {
                given,
                expected,
                min,
            });
        }
        Ok(())
    }
}

/// An invocable callback.
pub trait Slot: Any {
    fn call(&self, args: &[Variant]) -> BridgeResult<Variant>;

    /// Signature metadata, if the slot declares any.
    fn signature(&self) -> Option<&Signature> {
        None
    }

    /// Identity comparison used for connection bookkeeping.
    fn same_as(&self, other: &dyn Slot) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn has_metadata(&self) -> bool {
        self.signature().is_some()
    }

    fn return_type(&self) -> VariantType {
        self.signature()
            .map(|s| s.return_type)
            .unwrap_or(VariantType::Variant)
    }

    fn arg_count(&self) -> Option<usize> {
        self.signature().and_then(|s| s.arg_count)
    }

    fn arg_types(&self) -> Option<&[VariantType]> {
        self.signature().and_then(|s| s.arg_types.as_deref())
    }

    fn default_args(&self) -> Option<&[Variant]> {
        self.signature().and_then(|s| s.default_args.as_deref())
    }
}

pub type SlotRef = Rc<dyn Slot>;

/// Address of the slot allocation, usable as an identity key.
pub fn slot_key(slot: &SlotRef) -> usize {
    Rc::as_ptr(slot) as *const () as usize
}

type NativeFn = dyn Fn(&[Variant]) -> BridgeResult<Variant>;

/// Slot backed by a native closure. Equality is allocation identity.
pub struct NativeSlot {
    func: Box<NativeFn>,
    signature: Option<Signature>,
}

impl NativeSlot {
    pub fn new<F>(signature: Signature, func: F) -> Self
    where
        F: Fn(&[Variant]) -> BridgeResult<Variant> + 'static,
    {
        Self {
            func: Box::new(func),
            signature: Some(signature),
        }
    }

    /// Slot without metadata.
    pub fn untyped<F>(func: F) -> Self
    where
        F: Fn(&[Variant]) -> BridgeResult<Variant> + 'static,
    {
        Self {
            func: Box::new(func),
            signature: None,
        }
    }

    pub fn into_ref(self) -> SlotRef {
        Rc::new(self)
    }
}

impl Slot for NativeSlot {
    fn call(&self, args: &[Variant]) -> BridgeResult<Variant> {
        (self.func)(args)
    }

    fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    fn same_as(&self, other: &dyn Slot) -> bool {
        std::ptr::addr_eq(self as *const Self, other as *const dyn Slot)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for NativeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeSlot")
            .field("signature", &self.signature)
            .finish()
    }
}

type MethodFn<T> = fn(&T, &[Variant]) -> BridgeResult<Variant>;

/// Slot bound to a method of a reference-counted target.
///
/// The target is held weakly so that registering methods on an object does
/// not keep the object alive. Two method slots are equal when they bind the
/// same target and method name.
pub struct MethodSlot<T: 'static> {
    target: Weak<T>,
    name: String,
    method: MethodFn<T>,
    signature: Signature,
}

impl<T: 'static> MethodSlot<T> {
    pub fn new(target: Weak<T>, name: impl Into<String>, signature: Signature, method: MethodFn<T>) -> Self {
        Self {
            target,
            name: name.into(),
            method,
            signature,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: 'static> Slot for MethodSlot<T> {
    fn call(&self, args: &[Variant]) -> BridgeResult<Variant> {
        let target = self.target.upgrade().ok_or(BridgeError::ObjectDeleted)?;
        (self.method)(&target, args)
    }

    fn signature(&self) -> Option<&Signature> {
        Some(&self.signature)
    }

    fn same_as(&self, other: &dyn Slot) -> bool {
        other
            .as_any()
            .downcast_ref::<MethodSlot<T>>()
            .is_some_and(|o| Weak::ptr_eq(&o.target, &self.target) && o.name == self.name)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
