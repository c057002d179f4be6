//! In-process bus implementing the `BusProxy` port.
//!
//! Services own object paths, paths carry interfaces, and interfaces declare
//! methods, signals and properties. Asynchronous calls are queued and only
//! delivered by [`MemoryBus::dispatch_pending`], which stands in for an
//! event loop. Method latency is simulated: it is compared against the call
//! timeout but never slept.

use bridge_application::{
    BusError, BusProxy, CallId, MethodInfo, PropertyAccess, ResultCallback, SignalHandler,
};
use bridge_domain::{Variant, VariantType};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::rc::Rc;
use tracing::{debug, warn};

/// Handler of a bus method. Returns every reply value in order.
pub type MethodHandler = Rc<dyn Fn(&[Variant]) -> Result<Vec<Variant>, BusError>>;

#[derive(Clone)]
struct MethodDef {
    info: MethodInfo,
    latency_ms: u32,
    handler: MethodHandler,
}

#[derive(Debug, Clone)]
struct PropertyDef {
    access: PropertyAccess,
    kind: VariantType,
    value: Variant,
}

/// Declaration of one interface of a bus object.
#[derive(Clone, Default)]
pub struct InterfaceDef {
    name: String,
    methods: BTreeMap<String, MethodDef>,
    signals: BTreeMap<String, Vec<VariantType>>,
    properties: BTreeMap<String, PropertyDef>,
}

impl InterfaceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ==================== Builder Methods ====================

    pub fn method<F>(self, name: &str, info: MethodInfo, handler: F) -> Self
    where
        F: Fn(&[Variant]) -> Result<Vec<Variant>, BusError> + 'static,
    {
        self.method_with_latency(name, info, 0, handler)
    }

    /// A method whose reply takes `latency_ms` to arrive.
    pub fn method_with_latency<F>(mut self, name: &str, info: MethodInfo, latency_ms: u32, handler: F) -> Self
    where
        F: Fn(&[Variant]) -> Result<Vec<Variant>, BusError> + 'static,
    {
        self.methods.insert(
            name.to_string(),
            MethodDef {
                info,
                latency_ms,
                handler: Rc::new(handler),
            },
        );
        self
    }

    pub fn signal(mut self, name: &str, arg_types: Vec<VariantType>) -> Self {
        self.signals.insert(name.to_string(), arg_types);
        self
    }

    pub fn property(mut self, name: &str, access: PropertyAccess, kind: VariantType, value: Variant) -> Self {
        self.properties.insert(
            name.to_string(),
            PropertyDef {
                access,
                kind,
                value,
            },
        );
        self
    }
}

/// Coerces `value` to `kind` the way the bus marshals arguments.
fn coerce(value: &Variant, kind: VariantType) -> Option<Variant> {
    if value.variant_type() == kind || kind == VariantType::Variant {
        return Some(value.clone());
    }
    match kind {
        VariantType::Bool => value.convert_to_bool().map(Variant::Bool),
        VariantType::Int64 => value.convert_to_int().map(Variant::Int64),
        VariantType::Double => value.convert_to_double().map(Variant::Double),
        VariantType::String => value.convert_to_string().map(Variant::string),
        VariantType::Utf16String => value.convert_to_string().map(|s| Variant::utf16(&s)),
        _ => None,
    }
}

fn coerce_args(method: &str, info: &MethodInfo, args: &[Variant]) -> Result<Vec<Variant>, BusError> {
    if args.len() != info.arg_types.len() {
        return Err(BusError::InvalidArguments {
            method: method.to_string(),
            message: format!("expected {} arguments, got {}", info.arg_types.len(), args.len()),
        });
    }
    args.iter()
        .zip(&info.arg_types)
        .enumerate()
        .map(|(index, (arg, kind))| {
            coerce(arg, *kind).ok_or_else(|| BusError::InvalidArguments {
                method: method.to_string(),
                message: format!("argument {} is not {}", index, kind),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ObjectAddress {
    service: String,
    path: String,
}

struct PendingCall {
    id: CallId,
    method: String,
    outcome: Result<MethodDef, BusError>,
    args: Vec<Variant>,
    callback: Option<ResultCallback>,
}

struct HandlerEntry {
    id: u64,
    address: ObjectAddress,
    interface: String,
    handler: SignalHandler,
}

struct BusInner {
    objects: RefCell<BTreeMap<ObjectAddress, BTreeMap<String, InterfaceDef>>>,
    pending: RefCell<VecDeque<PendingCall>>,
    handlers: RefCell<Vec<HandlerEntry>>,
    next_call: Cell<CallId>,
    next_handler: Cell<u64>,
    default_timeout_ms: Cell<i32>,
}

impl BusInner {
    fn with_interface<R>(&self, address: &ObjectAddress, interface: &str, f: impl FnOnce(&InterfaceDef) -> R) -> Option<R> {
        let objects = self.objects.borrow();
        objects.get(address)?.get(interface).map(f)
    }

    fn method(&self, address: &ObjectAddress, interface: &str, method: &str) -> Option<MethodDef> {
        self.with_interface(address, interface, |i| i.methods.get(method).cloned())
            .flatten()
    }

    fn issue_call_id(&self) -> CallId {
        let id = self.next_call.get();
        self.next_call
            .set(if id == CallId::MAX { 1 } else { id + 1 });
        id
    }

    fn effective_timeout(&self, timeout_ms: i32) -> i32 {
        if timeout_ms >= 0 {
            timeout_ms
        } else {
            self.default_timeout_ms.get()
        }
    }
}

/// Runs a method and delivers its reply values to `callback`.
fn deliver(method: &str, def: &MethodDef, args: &[Variant], callback: Option<&mut ResultCallback>) -> Result<(), BusError> {
    let args = coerce_args(method, &def.info, args)?;
    let values = (def.handler)(&args)?;
    if let Some(callback) = callback {
        for (index, value) in values.iter().enumerate() {
            if !callback(index as i32, value) {
                debug!("Reply delivery of '{}' stopped at value {}", method, index);
                break;
            }
        }
    }
    Ok(())
}

/// An in-process message bus.
#[derive(Clone)]
pub struct MemoryBus {
    inner: Rc<BusInner>,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(BusInner {
                objects: RefCell::new(BTreeMap::new()),
                pending: RefCell::new(VecDeque::new()),
                handlers: RefCell::new(Vec::new()),
                next_call: Cell::new(1),
                next_handler: Cell::new(1),
                default_timeout_ms: Cell::new(-1),
            }),
        }
    }

    /// Timeout applied to calls that pass `-1`; `-1` waits forever.
    pub fn set_default_timeout(&self, timeout_ms: i32) {
        self.inner
            .default_timeout_ms
            .set(if timeout_ms >= 0 { timeout_ms } else { -1 });
    }

    /// Publishes `interface` on the object `path` of `service`.
    pub fn register_object(&self, service: &str, path: &str, interface: InterfaceDef) {
        let address = ObjectAddress {
            service: service.to_string(),
            path: path.to_string(),
        };
        debug!("Registered {} at {}{}", interface.name, service, path);
        self.inner
            .objects
            .borrow_mut()
            .entry(address)
            .or_default()
            .insert(interface.name.clone(), interface);
    }

    /// Proxy to `interface` of the object `path`, if it is published.
    pub fn proxy(&self, service: &str, path: &str, interface: &str) -> Option<Rc<MemoryBusProxy>> {
        let address = ObjectAddress {
            service: service.to_string(),
            path: path.to_string(),
        };
        self.inner.with_interface(&address, interface, |_| ())?;
        Some(Rc::new(MemoryBusProxy {
            bus: self.clone(),
            address,
            interface: interface.to_string(),
            handler_ids: RefCell::new(Vec::new()),
        }))
    }

    /// Emits `signal` to every proxy of that object and interface, in
    /// connection order. Returns the number of handlers reached.
    pub fn emit_signal(&self, service: &str, path: &str, interface: &str, signal: &str, args: &[Variant]) -> usize {
        let handlers: Vec<SignalHandler> = self
            .inner
            .handlers
            .borrow()
            .iter()
            .filter(|h| h.address.service == service && h.address.path == path && h.interface == interface)
            .map(|h| h.handler.clone())
            .collect();
        for handler in &handlers {
            handler(signal, args);
        }
        handlers.len()
    }

    /// Delivers every queued asynchronous reply. Returns the number of calls
    /// completed.
    pub fn dispatch_pending(&self) -> usize {
        let mut completed = 0;
        loop {
            let next = self.inner.pending.borrow_mut().pop_front();
            let Some(mut call) = next else {
                break;
            };
            let result = match &call.outcome {
                Ok(def) => deliver(&call.method, def, &call.args, call.callback.as_mut()),
                Err(e) => Err(e.clone()),
            };
            if let Err(e) = result {
                warn!("Asynchronous call {} to '{}' failed: {}", call.id, call.method, e);
                if let Some(callback) = call.callback.as_mut() {
                    callback(-1, &Variant::string(e.to_string()));
                }
            }
            completed += 1;
        }
        completed
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.borrow().len()
    }
}

/// Proxy to one interface of one object on a [`MemoryBus`].
pub struct MemoryBusProxy {
    bus: MemoryBus,
    address: ObjectAddress,
    interface: String,
    handler_ids: RefCell<Vec<u64>>,
}

impl MemoryBusProxy {
    fn inner(&self) -> &BusInner {
        &self.bus.inner
    }

    fn with_interface<R>(&self, f: impl FnOnce(&InterfaceDef) -> R) -> Option<R> {
        self.inner().with_interface(&self.address, &self.interface, f)
    }

    fn property_def(&self, property: &str) -> Result<PropertyDef, BusError> {
        self.with_interface(|i| i.properties.get(property).cloned())
            .flatten()
            .ok_or_else(|| BusError::UnknownProperty(property.to_string()))
    }

    fn child_path(&self, name: &str) -> String {
        if name.starts_with('/') {
            name.to_string()
        } else if self.address.path == "/" {
            format!("/{}", name)
        } else {
            format!("{}/{}", self.address.path, name)
        }
    }

    fn names<F>(&self, f: F) -> Vec<String>
    where
        F: FnOnce(&InterfaceDef) -> Vec<String>,
    {
        self.with_interface(f).unwrap_or_default()
    }
}

impl BusProxy for MemoryBusProxy {
    fn name(&self) -> String {
        self.address.service.clone()
    }

    fn path(&self) -> String {
        self.address.path.clone()
    }

    fn interface(&self) -> String {
        self.interface.clone()
    }

    fn method_info(&self, method: &str) -> Option<MethodInfo> {
        self.with_interface(|i| i.methods.get(method).map(|m| m.info.clone()))
            .flatten()
    }

    fn signal_info(&self, signal: &str) -> Option<Vec<VariantType>> {
        self.with_interface(|i| i.signals.get(signal).cloned())
            .flatten()
    }

    fn property_info(&self, property: &str) -> Option<(PropertyAccess, VariantType)> {
        self.property_def(property).ok().map(|p| (p.access, p.kind))
    }

    fn call_method(
        &self,
        method: &str,
        sync: bool,
        timeout_ms: i32,
        mut callback: Option<ResultCallback>,
        args: &[Variant],
    ) -> Result<CallId, BusError> {
        let def = self
            .inner()
            .method(&self.address, &self.interface, method)
            .ok_or_else(|| BusError::UnknownMethod(method.to_string()))?;
        let timeout = self.inner().effective_timeout(timeout_ms);
        let timed_out = timeout >= 0 && i64::from(def.latency_ms) > i64::from(timeout);
        let id = self.inner().issue_call_id();

        if sync {
            if timed_out {
                return Err(BusError::Timeout(method.to_string()));
            }
            deliver(method, &def, args, callback.as_mut())?;
            return Ok(id);
        }

        let outcome = if timed_out {
            Err(BusError::Timeout(method.to_string()))
        } else {
            Ok(def)
        };
        self.inner().pending.borrow_mut().push_back(PendingCall {
            id,
            method: method.to_string(),
            outcome,
            args: args.to_vec(),
            callback,
        });
        debug!("Queued asynchronous call {} to '{}'", id, method);
        Ok(id)
    }

    fn cancel_method_call(&self, call_id: CallId) -> bool {
        let mut pending = self.inner().pending.borrow_mut();
        match pending.iter().position(|call| call.id == call_id) {
            Some(pos) => {
                pending.remove(pos);
                debug!("Cancelled call {}", call_id);
                true
            }
            None => false,
        }
    }

    fn is_method_call_pending(&self, call_id: CallId) -> bool {
        self.inner()
            .pending
            .borrow()
            .iter()
            .any(|call| call.id == call_id)
    }

    fn get_property(&self, property: &str) -> Result<Variant, BusError> {
        let def = self.property_def(property)?;
        if !def.access.contains(PropertyAccess::READ) {
            return Err(BusError::AccessDenied(property.to_string(), "readable"));
        }
        Ok(def.value)
    }

    fn set_property(&self, property: &str, value: &Variant) -> Result<(), BusError> {
        let def = self.property_def(property)?;
        if !def.access.contains(PropertyAccess::WRITE) {
            return Err(BusError::AccessDenied(property.to_string(), "writable"));
        }
        let value = coerce(value, def.kind).ok_or_else(|| BusError::InvalidArguments {
            method: property.to_string(),
            message: format!("value is not {}", def.kind),
        })?;

        let mut objects = self.inner().objects.borrow_mut();
        let slot = objects
            .get_mut(&self.address)
            .and_then(|interfaces| interfaces.get_mut(&self.interface))
            .and_then(|interface| interface.properties.get_mut(property))
            .ok_or_else(|| BusError::UnknownProperty(property.to_string()))?;
        slot.value = value;
        Ok(())
    }

    fn enumerate_methods(&self) -> Vec<String> {
        self.names(|i| i.methods.keys().cloned().collect())
    }

    fn enumerate_signals(&self) -> Vec<String> {
        self.names(|i| i.signals.keys().cloned().collect())
    }

    fn enumerate_properties(&self) -> Vec<String> {
        self.names(|i| i.properties.keys().cloned().collect())
    }

    fn enumerate_children(&self) -> Vec<String> {
        let prefix = if self.address.path == "/" {
            "/".to_string()
        } else {
            format!("{}/", self.address.path)
        };
        let children: BTreeSet<String> = self
            .inner()
            .objects
            .borrow()
            .keys()
            .filter(|a| a.service == self.address.service)
            .filter_map(|a| a.path.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .filter(|child| !child.is_empty())
            .map(str::to_string)
            .collect();
        children.into_iter().collect()
    }

    fn enumerate_interfaces(&self) -> Vec<String> {
        self.inner()
            .objects
            .borrow()
            .get(&self.address)
            .map(|interfaces| interfaces.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn new_child_proxy(&self, name: &str, interface: &str) -> Option<Rc<dyn BusProxy>> {
        let path = self.child_path(name);
        let proxy: Rc<dyn BusProxy> = self.bus.proxy(&self.address.service, &path, interface)?;
        Some(proxy)
    }

    fn new_interface_proxy(&self, interface: &str) -> Option<Rc<dyn BusProxy>> {
        let proxy: Rc<dyn BusProxy> = self
            .bus
            .proxy(&self.address.service, &self.address.path, interface)?;
        Some(proxy)
    }

    fn connect_on_signal_emit(&self, handler: SignalHandler) -> u64 {
        let id = self.inner().next_handler.get();
        self.inner().next_handler.set(id + 1);
        self.inner().handlers.borrow_mut().push(HandlerEntry {
            id,
            address: self.address.clone(),
            interface: self.interface.clone(),
            handler,
        });
        self.handler_ids.borrow_mut().push(id);
        id
    }

    fn disconnect_on_signal_emit(&self, id: u64) {
        self.inner().handlers.borrow_mut().retain(|h| h.id != id);
        self.handler_ids.borrow_mut().retain(|&own| own != id);
    }
}

impl Drop for MemoryBusProxy {
    fn drop(&mut self) {
        let ids = std::mem::take(&mut *self.handler_ids.borrow_mut());
        if let Ok(mut handlers) = self.bus.inner.handlers.try_borrow_mut() {
            handlers.retain(|h| !ids.contains(&h.id));
        }
    }
}
