//! Resolution chain for dynamically described members.
//!
//! Getter order, first match wins:
//! 1. a signal already in the cache
//! 2. a method
//! 3. a signal (materialised into the cache)
//! 4. a property
//! 5. a best-effort callable without metadata
//!
//! Methods come before signals and properties because introspection may
//! report overlapping names. Setters follow the same order without the
//! method and fallback steps, and fail for unresolved names.

use super::SignalCache;
use crate::ports::bus_proxy::{MethodInfo, PropertyAccess};
use bridge_domain::{BridgeResult, Signal, Variant, VariantType};
use tracing::debug;

/// Introspection capability of an object with dynamic members.
pub trait MemberIntrospection {
    fn method_info(&self, name: &str) -> Option<MethodInfo>;

    fn signal_info(&self, name: &str) -> Option<Vec<VariantType>>;

    fn property_info(&self, name: &str) -> Option<(PropertyAccess, VariantType)>;

    /// Callable value bound to method `name`. Without `info` the callable
    /// carries no metadata and accepts any arguments.
    fn bind_method(&self, name: &str, info: Option<MethodInfo>) -> Variant;

    fn read_property(&self, name: &str) -> BridgeResult<Variant>;

    fn write_property(&self, name: &str, value: Variant) -> bool;
}

fn signal_value(signal: &Signal, want_info: bool) -> Variant {
    if want_info {
        Variant::Slot(Some(signal.prototype_slot()))
    } else {
        Variant::Slot(signal.default_connected_slot())
    }
}

fn connect_signal(name: &str, signal: &Signal, value: Variant) -> bool {
    match value {
        Variant::Slot(slot) => signal.set_default_connected_slot(slot),
        _ => {
            debug!("Signal property '{}' expects a slot", name);
            false
        }
    }
}

/// Resolves a read of `name`. With `want_info` the result is a prototype
/// describing the member instead of its value.
pub fn resolve_get(
    signals: &SignalCache,
    members: &dyn MemberIntrospection,
    name: &str,
    want_info: bool,
) -> BridgeResult<Variant> {
    debug!("Dynamic get of '{}' (info: {})", name, want_info);

    if let Some(signal) = signals.get(name) {
        return Ok(signal_value(&signal, want_info));
    }

    if let Some(info) = members.method_info(name) {
        return Ok(members.bind_method(name, Some(info)));
    }

    if let Some(arg_types) = members.signal_info(name) {
        let signal = signals.materialize(name, arg_types);
        return Ok(signal_value(&signal, want_info));
    }

    if let Some((access, kind)) = members.property_info(name) {
        if want_info {
            return Ok(Variant::prototype(kind));
        }
        if access.contains(PropertyAccess::READ) {
            return members.read_property(name);
        }
        debug!("Property '{}' is write only", name);
        return Ok(Variant::Void);
    }

    debug!(
        "Can't resolve '{}', treating it as a method without metadata",
        name
    );
    Ok(members.bind_method(name, None))
}

/// Resolves a write of `value` to `name`.
pub fn resolve_set(
    signals: &SignalCache,
    members: &dyn MemberIntrospection,
    name: &str,
    value: Variant,
) -> bool {
    debug!("Dynamic set of '{}'", name);

    if let Some(signal) = signals.get(name) {
        return connect_signal(name, &signal, value);
    }

    if let Some(arg_types) = members.signal_info(name) {
        let signal = signals.materialize(name, arg_types);
        return connect_signal(name, &signal, value);
    }

    match members.property_info(name) {
        Some((access, _)) if access.contains(PropertyAccess::WRITE) => {
            members.write_property(name, value)
        }
        Some(_) => {
            debug!("Property '{}' is read only", name);
            false
        }
        None => {
            debug!("Can't resolve '{}'", name);
            false
        }
    }
}
