//! Bus proxy port: the backing protocol of bus objects.
//!
//! A proxy fronts one remote object (service name + object path + interface)
//! whose methods, signals and properties are only known through
//! introspection. The infrastructure layer provides implementations; the
//! [`ScriptableBusObject`](crate::bus_object::ScriptableBusObject) exposes
//! a proxy to scripts.

use bitflags::bitflags;
use bridge_domain::{Variant, VariantType};
use std::rc::Rc;
use thiserror::Error;

bitflags! {
    /// Access rights of a bus property.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PropertyAccess: u8 {
        const READ = 0b01;
        const WRITE = 0b10;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Introspected signature of a bus method.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MethodInfo {
    pub arg_types: Vec<VariantType>,
    pub return_types: Vec<VariantType>,
}

impl MethodInfo {
    pub fn new(arg_types: Vec<VariantType>, return_types: Vec<VariantType>) -> Self {
        Self {
            arg_types,
            return_types,
        }
    }

    /// Single kind a native caller sees: void, the one return kind, or an
    /// array object for several return values.
    pub fn return_type(&self) -> VariantType {
        match self.return_types.as_slice() {
            [] => VariantType::Void,
            [single] => *single,
            _ => VariantType::Scriptable,
        }
    }
}

/// Identifier of an issued method call. Always positive.
pub type CallId = i32;

/// Receives the values returned by a method call.
///
/// Called with `(index, value)` for each return value; returning `false`
/// stops delivery. A failed asynchronous call is reported once with index
/// `-1` and the error message as value.
pub type ResultCallback = Box<dyn FnMut(i32, &Variant) -> bool>;

/// Receives `(signal name, arguments)` for every signal the proxy observes.
pub type SignalHandler = Rc<dyn Fn(&str, &[Variant])>;

/// Errors reported by a bus proxy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusError {
    #[error("Method call '{0}' timed out")]
    Timeout(String),

    #[error("Unknown method '{0}'")]
    UnknownMethod(String),

    #[error("Unknown property '{0}'")]
    UnknownProperty(String),

    #[error("Property '{0}' is not {1}")]
    AccessDenied(String, &'static str),

    #[error("Invalid arguments for '{method}': {message}")]
    InvalidArguments { method: String, message: String },

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("Method call {0} was cancelled")]
    Cancelled(CallId),
}

/// Port for a proxy to one remote bus object.
pub trait BusProxy {
    fn name(&self) -> String;

    fn path(&self) -> String;

    fn interface(&self) -> String;

    fn method_info(&self, method: &str) -> Option<MethodInfo>;

    /// Argument kinds of a signal, if the interface declares it.
    fn signal_info(&self, signal: &str) -> Option<Vec<VariantType>>;

    /// Access rights and kind of a property; `None` if unknown.
    fn property_info(&self, property: &str) -> Option<(PropertyAccess, VariantType)>;

    /// Issues a method call.
    ///
    /// Synchronous calls block until the reply (or the timeout) and deliver
    /// return values to `callback` before returning. Asynchronous calls
    /// return immediately; the callback runs when the reply arrives.
    /// `timeout_ms` of `-1` selects the proxy default.
    fn call_method(
        &self,
        method: &str,
        sync: bool,
        timeout_ms: i32,
        callback: Option<ResultCallback>,
        args: &[Variant],
    ) -> Result<CallId, BusError>;

    /// Cancels a pending asynchronous call.
    fn cancel_method_call(&self, call_id: CallId) -> bool;

    fn is_method_call_pending(&self, call_id: CallId) -> bool;

    fn get_property(&self, property: &str) -> Result<Variant, BusError>;

    fn set_property(&self, property: &str, value: &Variant) -> Result<(), BusError>;

    fn enumerate_methods(&self) -> Vec<String>;

    fn enumerate_signals(&self) -> Vec<String>;

    fn enumerate_properties(&self) -> Vec<String>;

    fn enumerate_children(&self) -> Vec<String>;

    fn enumerate_interfaces(&self) -> Vec<String>;

    /// Proxy to the child object `name` (relative path) on `interface`.
    fn new_child_proxy(&self, name: &str, interface: &str) -> Option<Rc<dyn BusProxy>>;

    /// Proxy to the same object on another interface.
    fn new_interface_proxy(&self, interface: &str) -> Option<Rc<dyn BusProxy>>;

    /// Registers a signal handler and returns its connection id.
    fn connect_on_signal_emit(&self, handler: SignalHandler) -> u64;

    fn disconnect_on_signal_emit(&self, connection_id: u64);
}
