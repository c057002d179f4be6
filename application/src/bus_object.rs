//! Scriptable bus object
//!
//! [`ScriptableBusObject`] exposes a [`BusProxy`] to scripts. Remote
//! members are resolved per lookup through the dynamic resolution chain;
//! control-plane operations are registered statically under `$`-prefixed
//! names so they cannot collide with introspected names.

use crate::dynamic::{MemberIntrospection, SignalCache, resolve_get, resolve_set};
use crate::ports::bus_proxy::{BusProxy, MethodInfo, PropertyAccess, ResultCallback};
use bridge_domain::{
    BridgeResult, ClassId, DynamicPropertyHandler, MethodSlot, NativeSlot, ScriptableArray,
    ScriptableFunction, ScriptableHelper, ScriptableObject, ScriptableRef, Signature, Slot, SlotRef,
    Variant, VariantType,
};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

/// Synchronous call of one bus method.
///
/// Zero return values yield `Void`, one yields the value itself and more
/// yield a [`ScriptableArray`]. Failures and timeouts yield `Void`.
pub struct BusMethodSlot {
    proxy: Rc<dyn BusProxy>,
    method: String,
    timeout_ms: i32,
    signature: Option<Signature>,
}

impl BusMethodSlot {
    pub fn new(proxy: Rc<dyn BusProxy>, method: &str, timeout_ms: i32, info: Option<MethodInfo>) -> Self {
        let signature = info.map(|info| Signature::new(info.arg_types.clone(), info.return_type()));
        Self {
            proxy,
            method: method.to_string(),
            timeout_ms,
            signature,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

impl Slot for BusMethodSlot {
    fn call(&self, args: &[Variant]) -> BridgeResult<Variant> {
        let results = Rc::new(RefCell::new(Vec::new()));
        let sink = results.clone();
        let callback: ResultCallback = Box::new(move |index, value| {
            if index >= 0 {
                sink.borrow_mut().push(value.clone());
                return true;
            }
            false
        });

        if let Err(e) = self
            .proxy
            .call_method(&self.method, true, self.timeout_ms, Some(callback), args)
        {
            warn!("Bus method '{}' failed: {}", self.method, e);
            return Ok(Variant::Void);
        }

        let mut values = results.take();
        Ok(match values.len() {
            0 => Variant::Void,
            1 => values.remove(0),
            _ => Variant::Scriptable(Some(ScriptableArray::new(values))),
        })
    }

    fn signature(&self) -> Option<&Signature> {
        self.signature.as_ref()
    }

    fn same_as(&self, other: &dyn Slot) -> bool {
        other.as_any().downcast_ref::<BusMethodSlot>().is_some_and(|o| {
            std::ptr::addr_eq(Rc::as_ptr(&o.proxy), Rc::as_ptr(&self.proxy)) && o.method == self.method
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Scriptable front of a bus proxy.
pub struct ScriptableBusObject {
    helper: ScriptableHelper,
    proxy: Rc<dyn BusProxy>,
    timeout_ms: Cell<i32>,
    signals: SignalCache,
    this: Weak<ScriptableBusObject>,
    emit_connection: u64,
}

fn string_arg(args: &[Variant], index: usize) -> String {
    args.get(index)
        .and_then(Variant::convert_to_string)
        .unwrap_or_default()
}

fn int_arg(args: &[Variant], index: usize) -> i64 {
    args.get(index).and_then(Variant::convert_to_int).unwrap_or(0)
}

impl ScriptableBusObject {
    pub const CLASS_ID: ClassId = ClassId(0x7c2a_9e41_d35b_4f08);

    pub fn new(proxy: Rc<dyn BusProxy>) -> Rc<Self> {
        Self::with_timeout(proxy, -1)
    }

    /// Creates the object with an initial method call timeout in
    /// milliseconds (`-1` for the proxy default).
    pub fn with_timeout(proxy: Rc<dyn BusProxy>, timeout_ms: i32) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<Self>| {
            let helper = ScriptableHelper::new();
            Self::register_members(&helper, this);
            helper.set_dynamic_property_handler(this.clone());

            let owner = this.clone();
            let emit_connection = proxy.connect_on_signal_emit(Rc::new(move |name: &str, args: &[Variant]| {
                // Keeps the object alive while handlers run.
                if let Some(owner) = owner.upgrade() {
                    owner.helper.attach();
                    owner.emit_signal(name, args);
                    owner.helper.detach();
                }
            }));

            Self {
                helper,
                proxy,
                timeout_ms: Cell::new(if timeout_ms >= 0 { timeout_ms } else { -1 }),
                signals: SignalCache::new(),
                this: this.clone(),
                emit_connection,
            }
        })
    }

    fn register_members(helper: &ScriptableHelper, this: &Weak<Self>) {
        let method = |name: &str, signature: Signature, f: fn(&Self, &[Variant]) -> BridgeResult<Variant>| -> SlotRef {
            Rc::new(MethodSlot::new(this.clone(), name, signature, f))
        };
        let getter = |name: &str, kind: VariantType, f: fn(&Self, &[Variant]) -> BridgeResult<Variant>| {
            method(name, Signature::new(vec![], kind), f)
        };

        helper.register_readonly_property("$name", getter("$name", VariantType::String, |o, _| {
            Ok(Variant::string(o.proxy.name()))
        }));
        helper.register_readonly_property("$path", getter("$path", VariantType::String, |o, _| {
            Ok(Variant::string(o.proxy.path()))
        }));
        helper.register_readonly_property(
            "$interface",
            getter("$interface", VariantType::String, |o, _| {
                Ok(Variant::string(o.proxy.interface()))
            }),
        );
        helper.register_property(
            "$timeout",
            Some(getter("$timeout", VariantType::Int64, |o, _| {
                Ok(Variant::Int64(i64::from(o.timeout())))
            })),
            Some(method(
                "$timeout=",
                Signature::new(vec![VariantType::Int64], VariantType::Void),
                |o, args| {
                    let timeout = int_arg(args, 0).clamp(-1, i64::from(i32::MAX));
                    o.set_timeout(timeout as i32);
                    Ok(Variant::Void)
                },
            )),
        );

        let listings: [(&str, fn(&Self, &[Variant]) -> BridgeResult<Variant>); 5] = [
            ("$methods", |o, _| Ok(o.list(o.proxy.enumerate_methods()))),
            ("$signals", |o, _| Ok(o.list(o.proxy.enumerate_signals()))),
            ("$properties", |o, _| Ok(o.list(o.proxy.enumerate_properties()))),
            ("$children", |o, _| Ok(o.list(o.proxy.enumerate_children()))),
            ("$interfaces", |o, _| Ok(o.list(o.proxy.enumerate_interfaces()))),
        ];
        for (name, f) in listings {
            helper.register_readonly_property(name, getter(name, VariantType::Scriptable, f));
        }

        // Script callbacks are adapted to `(index, value) -> bool`.
        let result_callback = NativeSlot::new(
            Signature::new(vec![VariantType::Int64, VariantType::Variant], VariantType::Bool),
            |_| Ok(Variant::Bool(true)),
        )
        .into_ref();
        helper.register_method(
            "$callMethod",
            method(
                "$callMethod",
                Signature {
                    arg_types: Some(vec![
                        VariantType::String,
                        VariantType::Bool,
                        VariantType::Int64,
                        VariantType::Slot,
                    ]),
                    arg_count: None,
                    return_type: VariantType::Int64,
                    default_args: None,
                    arg_prototypes: None,
                }
                .with_arg_prototype(3, Variant::slot(result_callback)),
                Self::call_method,
            ),
        );
        helper.register_method(
            "$cancelMethodCall",
            method(
                "$cancelMethodCall",
                Signature::new(vec![VariantType::Int64], VariantType::Bool),
                |o, args| Ok(Variant::Bool(o.proxy.cancel_method_call(int_arg(args, 0) as i32))),
            ),
        );
        helper.register_method(
            "$isMethodCallPending",
            method(
                "$isMethodCallPending",
                Signature::new(vec![VariantType::Int64], VariantType::Bool),
                |o, args| {
                    Ok(Variant::Bool(
                        o.proxy.is_method_call_pending(int_arg(args, 0) as i32),
                    ))
                },
            ),
        );
        helper.register_method(
            "$getProperty",
            method(
                "$getProperty",
                Signature::new(vec![VariantType::String], VariantType::Variant),
                |o, args| {
                    let name = string_arg(args, 0);
                    Ok(o.proxy.get_property(&name).unwrap_or_else(|e| {
                        debug!("$getProperty({}) failed: {}", name, e);
                        Variant::Void
                    }))
                },
            ),
        );
        helper.register_method(
            "$setProperty",
            method(
                "$setProperty",
                Signature::new(vec![VariantType::String, VariantType::Variant], VariantType::Bool),
                |o, args| {
                    let name = string_arg(args, 0);
                    let value = args.get(1).cloned().unwrap_or_default();
                    Ok(Variant::Bool(match o.proxy.set_property(&name, &value) {
                        Ok(()) => true,
                        Err(e) => {
                            debug!("$setProperty({}) failed: {}", name, e);
                            false
                        }
                    }))
                },
            ),
        );
        helper.register_method(
            "$getChild",
            method(
                "$getChild",
                Signature::new(vec![VariantType::String, VariantType::String], VariantType::Scriptable),
                |o, args| Ok(o.child(&string_arg(args, 0), &string_arg(args, 1))),
            ),
        );
        helper.register_method(
            "$getInterface",
            method(
                "$getInterface",
                Signature::new(vec![VariantType::String], VariantType::Scriptable),
                |o, args| Ok(o.interface_object(&string_arg(args, 0))),
            ),
        );
    }

    pub fn proxy(&self) -> &Rc<dyn BusProxy> {
        &self.proxy
    }

    pub fn timeout(&self) -> i32 {
        self.timeout_ms.get()
    }

    /// Sets the method call timeout; negative values select the default.
    pub fn set_timeout(&self, timeout_ms: i32) {
        self.timeout_ms.set(if timeout_ms >= 0 { timeout_ms } else { -1 });
    }

    fn list(&self, names: Vec<String>) -> Variant {
        let names = names.into_iter().filter(|n| !n.is_empty());
        Variant::Scriptable(Some(ScriptableArray::from_strings(names)))
    }

    fn child(&self, name: &str, interface: &str) -> Variant {
        if name.is_empty() || interface.is_empty() {
            return Variant::Scriptable(None);
        }
        let child = self
            .proxy
            .new_child_proxy(name, interface)
            .map(|proxy| ScriptableBusObject::new(proxy) as ScriptableRef);
        Variant::Scriptable(child)
    }

    fn interface_object(&self, interface: &str) -> Variant {
        if interface.is_empty() {
            return Variant::Scriptable(None);
        }
        let object = self
            .proxy
            .new_interface_proxy(interface)
            .map(|proxy| ScriptableBusObject::new(proxy) as ScriptableRef);
        Variant::Scriptable(object)
    }

    /// `$callMethod(name, sync, timeout, callback, ...args)`.
    ///
    /// The callback receives `(index, value)` per returned value and keeps
    /// receiving until it returns a false value; a script callback returning
    /// nothing stops after the first value. Returns the call id, or 0 when
    /// the leading arguments have the wrong kinds or the call fails.
    fn call_method(&self, args: &[Variant]) -> BridgeResult<Variant> {
        let (method, sync, timeout, callback) = match args {
            [
                Variant::String(Some(method)),
                Variant::Bool(sync),
                Variant::Int64(timeout),
                Variant::Slot(callback),
                ..,
            ] => (method, *sync, *timeout, callback.clone()),
            _ => {
                debug!("Argument type mismatch when calling $callMethod");
                return Ok(Variant::Int64(0));
            }
        };

        let callback: Option<ResultCallback> = callback.map(|slot| {
            Box::new(move |index: i32, value: &Variant| {
                match slot.call(&[Variant::Int64(i64::from(index)), value.clone()]) {
                    Ok(Variant::Void) => true,
                    Ok(result) => result.convert_to_bool().unwrap_or(true),
                    Err(e) => {
                        warn!("$callMethod callback failed: {}", e);
                        false
                    }
                }
            }) as ResultCallback
        });

        let timeout = timeout.clamp(-1, i64::from(i32::MAX)) as i32;
        match self.proxy.call_method(method, sync, timeout, callback, &args[4..]) {
            Ok(id) => Ok(Variant::Int64(i64::from(id))),
            Err(e) => {
                warn!("$callMethod({}) failed: {}", method, e);
                Ok(Variant::Int64(0))
            }
        }
    }

    /// Delivers a signal observed on the proxy to the cached signal of the
    /// same name. Signals nobody looked up are dropped.
    fn emit_signal(&self, name: &str, args: &[Variant]) {
        if !self.signals.emit(name, args) {
            debug!("Signal '{}' has no listeners on {}", name, self.proxy.path());
        }
    }
}

impl Drop for ScriptableBusObject {
    fn drop(&mut self) {
        self.proxy.disconnect_on_signal_emit(self.emit_connection);
    }
}

impl MemberIntrospection for ScriptableBusObject {
    fn method_info(&self, name: &str) -> Option<MethodInfo> {
        self.proxy.method_info(name)
    }

    fn signal_info(&self, name: &str) -> Option<Vec<VariantType>> {
        self.proxy.signal_info(name)
    }

    fn property_info(&self, name: &str) -> Option<(PropertyAccess, VariantType)> {
        self.proxy.property_info(name)
    }

    fn bind_method(&self, name: &str, info: Option<MethodInfo>) -> Variant {
        let slot: SlotRef = Rc::new(BusMethodSlot::new(
            self.proxy.clone(),
            name,
            self.timeout(),
            info,
        ));
        let owner: Weak<dyn ScriptableObject> = self.this.clone();
        Variant::Scriptable(Some(ScriptableFunction::with_owner(slot, owner)))
    }

    fn read_property(&self, name: &str) -> BridgeResult<Variant> {
        Ok(self.proxy.get_property(name).unwrap_or_else(|e| {
            debug!("Reading property '{}' failed: {}", name, e);
            Variant::Void
        }))
    }

    fn write_property(&self, name: &str, value: Variant) -> bool {
        match self.proxy.set_property(name, &value) {
            Ok(()) => true,
            Err(e) => {
                debug!("Writing property '{}' failed: {}", name, e);
                false
            }
        }
    }
}

impl DynamicPropertyHandler for ScriptableBusObject {
    fn dynamic_get(&self, name: &str, want_info: bool) -> BridgeResult<Variant> {
        resolve_get(&self.signals, self, name, want_info)
    }

    fn dynamic_set(&self, name: &str, value: Variant) -> bool {
        resolve_set(&self.signals, self, name, value)
    }
}

impl ScriptableObject for ScriptableBusObject {
    fn class_id(&self) -> ClassId {
        Self::CLASS_ID
    }

    fn helper(&self) -> &ScriptableHelper {
        &self.helper
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::bus_proxy::{BusError, CallId, SignalHandler};
    use bridge_domain::downcast;

    /// Proxy with `Ping() -> bool`, `Pair() -> (int64, string)`, a
    /// `Ping` property that must never win, a `Changed(int64)` signal and
    /// a write-only `Secret` property.
    #[derive(Default)]
    struct FakeProxy {
        handlers: RefCell<Vec<(u64, SignalHandler)>>,
        secret: RefCell<Option<Variant>>,
    }

    impl FakeProxy {
        fn fire(&self, name: &str, args: &[Variant]) {
            let handlers: Vec<SignalHandler> = self.handlers.borrow().iter().map(|(_, h)| h.clone()).collect();
            for handler in handlers {
                handler(name, args);
            }
        }
    }

    impl BusProxy for FakeProxy {
        fn name(&self) -> String {
            "org.example.Fake".into()
        }

        fn path(&self) -> String {
            "/org/example/Fake".into()
        }

        fn interface(&self) -> String {
            "org.example.Fake".into()
        }

        fn method_info(&self, method: &str) -> Option<MethodInfo> {
            match method {
                "Ping" => Some(MethodInfo::new(vec![], vec![VariantType::Bool])),
                "Pair" => Some(MethodInfo::new(vec![], vec![VariantType::Int64, VariantType::String])),
                _ => None,
            }
        }

        fn signal_info(&self, signal: &str) -> Option<Vec<VariantType>> {
            (signal == "Changed").then(|| vec![VariantType::Int64])
        }

        fn property_info(&self, property: &str) -> Option<(PropertyAccess, VariantType)> {
            match property {
                "Ping" => Some((PropertyAccess::READ, VariantType::String)),
                "Secret" => Some((PropertyAccess::WRITE, VariantType::String)),
                _ => None,
            }
        }

        fn call_method(
            &self,
            method: &str,
            _sync: bool,
            _timeout_ms: i32,
            callback: Option<ResultCallback>,
            _args: &[Variant],
        ) -> Result<CallId, BusError> {
            let values = match method {
                "Ping" => vec![Variant::Bool(true)],
                "Pair" => vec![Variant::Int64(1), Variant::string("one")],
                other => return Err(BusError::UnknownMethod(other.to_string())),
            };
            if let Some(mut callback) = callback {
                for (i, value) in values.iter().enumerate() {
                    if !callback(i as i32, value) {
                        break;
                    }
                }
            }
            Ok(1)
        }

        fn cancel_method_call(&self, _call_id: CallId) -> bool {
            false
        }

        fn is_method_call_pending(&self, _call_id: CallId) -> bool {
            false
        }

        fn get_property(&self, property: &str) -> Result<Variant, BusError> {
            match property {
                "Ping" => Ok(Variant::string("property")),
                other => Err(BusError::UnknownProperty(other.to_string())),
            }
        }

        fn set_property(&self, property: &str, value: &Variant) -> Result<(), BusError> {
            match property {
                "Secret" => {
                    *self.secret.borrow_mut() = Some(value.clone());
                    Ok(())
                }
                other => Err(BusError::AccessDenied(other.to_string(), "writable")),
            }
        }

        fn enumerate_methods(&self) -> Vec<String> {
            vec!["Ping".into(), "Pair".into(), String::new()]
        }

        fn enumerate_signals(&self) -> Vec<String> {
            vec!["Changed".into()]
        }

        fn enumerate_properties(&self) -> Vec<String> {
            vec!["Ping".into(), "Secret".into()]
        }

        fn enumerate_children(&self) -> Vec<String> {
            Vec::new()
        }

        fn enumerate_interfaces(&self) -> Vec<String> {
            vec!["org.example.Fake".into()]
        }

        fn new_child_proxy(&self, _name: &str, _interface: &str) -> Option<Rc<dyn BusProxy>> {
            None
        }

        fn new_interface_proxy(&self, _interface: &str) -> Option<Rc<dyn BusProxy>> {
            Some(Rc::new(FakeProxy::default()))
        }

        fn connect_on_signal_emit(&self, handler: SignalHandler) -> u64 {
            let mut handlers = self.handlers.borrow_mut();
            let id = handlers.len() as u64 + 1;
            handlers.push((id, handler));
            id
        }

        fn disconnect_on_signal_emit(&self, connection_id: u64) {
            self.handlers.borrow_mut().retain(|(id, _)| *id != connection_id);
        }
    }

    fn object() -> (Rc<FakeProxy>, Rc<ScriptableBusObject>) {
        let proxy = Rc::new(FakeProxy::default());
        let object = ScriptableBusObject::new(proxy.clone());
        (proxy, object)
    }

    fn get(object: &ScriptableBusObject, name: &str) -> Variant {
        let info = object.property_info_by_name(name).unwrap();
        object.get_property(info.id).unwrap()
    }

    #[test]
    fn test_ping_resolves_to_method() {
        let (_proxy, object) = object();
        let value = get(&object, "Ping");
        let function = value.as_object().unwrap();
        let function = downcast::<ScriptableFunction>(function).unwrap();
        assert_eq!(function.slot().arg_count(), Some(0));
        assert_eq!(function.call(&[]).unwrap(), Variant::Bool(true));
    }

    #[test]
    fn test_multiple_results_become_array() {
        let (_proxy, object) = object();
        let value = get(&object, "Pair");
        let function = downcast::<ScriptableFunction>(value.as_object().unwrap()).unwrap();
        let result = function.call(&[]).unwrap();
        let array = downcast::<ScriptableArray>(result.as_object().unwrap()).unwrap();
        assert_eq!(array.items(), &[Variant::Int64(1), Variant::string("one")]);
    }

    #[test]
    fn test_unknown_method_yields_void() {
        let (_proxy, object) = object();
        let value = get(&object, "Missing");
        let function = downcast::<ScriptableFunction>(value.as_object().unwrap()).unwrap();
        assert!(!function.slot().has_metadata());
        assert_eq!(function.call(&[Variant::Int64(1)]).unwrap(), Variant::Void);
    }

    #[test]
    fn test_signal_emission_reaches_default_connection() {
        let (proxy, object) = object();
        let info = object.property_info_by_name("Changed").unwrap();
        let seen = Rc::new(Cell::new(0));
        let sink = seen.clone();
        let callback = NativeSlot::untyped(move |args| {
            sink.set(args[0].as_i64().unwrap_or(-1));
            Ok(Variant::Void)
        })
        .into_ref();
        assert!(object.set_property(info.id, Variant::Slot(Some(callback))));
        proxy.fire("Changed", &[Variant::Int64(4)]);
        assert_eq!(seen.get(), 4);
        assert_eq!(object.ref_count(), 0);
    }

    #[test]
    fn test_signal_emission_holds_reference() {
        let (proxy, object) = object();
        let info = object.property_info_by_name("Changed").unwrap();
        let during = Rc::new(Cell::new(usize::MAX));
        let sink = during.clone();
        let weak = Rc::downgrade(&object);
        let callback = NativeSlot::untyped(move |_| {
            if let Some(object) = weak.upgrade() {
                sink.set(object.ref_count());
            }
            Ok(Variant::Void)
        })
        .into_ref();
        assert!(object.set_property(info.id, Variant::Slot(Some(callback))));
        proxy.fire("Changed", &[Variant::Int64(1)]);
        assert_eq!(during.get(), 1);
        assert_eq!(object.ref_count(), 0);
    }

    #[test]
    fn test_call_method_callback_prototype() {
        let (_proxy, object) = object();
        let call = get(&object, "$callMethod");
        let signature = call.as_slot().unwrap().signature().unwrap().clone();
        let prototype = signature.arg_prototype(3).and_then(Variant::as_slot).unwrap();
        assert_eq!(prototype.arg_types(), Some(&[VariantType::Int64, VariantType::Variant][..]));
        assert_eq!(prototype.return_type(), VariantType::Bool);
        assert!(signature.arg_prototype(0).is_none());
    }

    #[test]
    fn test_call_method_callback_stops_delivery() {
        let (_proxy, object) = object();
        let call = get(&object, "$callMethod");
        let count = Rc::new(Cell::new(0));
        let sink = count.clone();
        let callback = NativeSlot::untyped(move |_| {
            sink.set(sink.get() + 1);
            Ok(Variant::Bool(false))
        })
        .into_ref();
        call.as_slot()
            .unwrap()
            .call(&[
                Variant::string("Pair"),
                Variant::Bool(true),
                Variant::Int64(-1),
                Variant::Slot(Some(callback)),
            ])
            .unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_write_only_property() {
        let (proxy, object) = object();
        let info = object.property_info_by_name("Secret").unwrap();
        assert_eq!(info.prototype.variant_type(), VariantType::String);
        assert_eq!(object.get_property(info.id).unwrap(), Variant::Void);
        assert!(object.set_property(info.id, Variant::string("s3")));
        assert_eq!(*proxy.secret.borrow(), Some(Variant::string("s3")));
    }

    #[test]
    fn test_control_plane_members() {
        let (_proxy, object) = object();
        assert_eq!(get(&object, "$path"), Variant::string("/org/example/Fake"));
        let methods = get(&object, "$methods");
        let methods = downcast::<ScriptableArray>(methods.as_object().unwrap()).unwrap();
        assert_eq!(methods.count(), 2);

        let timeout = object.property_info_by_name("$timeout").unwrap();
        assert!(object.set_property(timeout.id, Variant::Int64(-20)));
        assert_eq!(object.timeout(), -1);
        assert!(object.set_property(timeout.id, Variant::Int64(250)));
        assert_eq!(get(&object, "$timeout"), Variant::Int64(250));
    }

    #[test]
    fn test_call_method_validates_leading_arguments() {
        let (_proxy, object) = object();
        let call = get(&object, "$callMethod");
        let slot = call.as_slot().unwrap();
        assert_eq!(slot.call(&[Variant::string("Ping")]).unwrap(), Variant::Int64(0));

        let got = Rc::new(RefCell::new(Vec::new()));
        let sink = got.clone();
        let callback = NativeSlot::untyped(move |args| {
            sink.borrow_mut().push(args[1].clone());
            Ok(Variant::Bool(true))
        })
        .into_ref();
        let id = slot
            .call(&[
                Variant::string("Pair"),
                Variant::Bool(false),
                Variant::Int64(-1),
                Variant::Slot(Some(callback)),
            ])
            .unwrap();
        assert_eq!(id, Variant::Int64(1));
        assert_eq!(got.borrow().len(), 2);
    }

    #[test]
    fn test_drop_disconnects_signal_handler() {
        let (proxy, object) = object();
        assert_eq!(proxy.handlers.borrow().len(), 1);
        drop(object);
        assert!(proxy.handlers.borrow().is_empty());
    }
}
