//! Signals: typed event connection points
//!
//! A [`Signal`] fans an emission out to every connected slot in connection
//! order. Besides ordinary connections it exposes one lazily created
//! "default connection", which is what script assignment to a signal-named
//! property reconnects.

use crate::error::BridgeResult;
use crate::slot::{Signature, Slot, SlotRef};
use crate::variant::{Variant, VariantType};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::warn;

struct Entry {
    id: u64,
    slot: Option<SlotRef>,
}

struct SignalInner {
    signature: Signature,
    entries: RefCell<Vec<Entry>>,
    next_id: Cell<u64>,
    default_connection: RefCell<Option<Connection>>,
}

/// A typed event source with any number of connected slots.
#[derive(Clone)]
pub struct Signal {
    inner: Rc<SignalInner>,
}

impl Signal {
    /// Creates a signal with the given argument kinds. Signals always
    /// return void.
    pub fn new(arg_types: Vec<VariantType>) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                signature: Signature::new(arg_types, VariantType::Void),
                entries: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
                default_connection: RefCell::new(None),
            }),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.inner.signature
    }

    /// Connects `slot`; a `None` slot creates a blocked connection that can
    /// be filled in later through [`Connection::reconnect`].
    pub fn connect(&self, slot: Option<SlotRef>) -> Connection {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.entries.borrow_mut().push(Entry { id, slot });
        Connection {
            id,
            signal: Rc::downgrade(&self.inner),
        }
    }

    pub fn connection_count(&self) -> usize {
        self.inner
            .entries
            .borrow()
            .iter()
            .filter(|e| e.slot.is_some())
            .count()
    }

    pub fn has_active_connections(&self) -> bool {
        self.connection_count() > 0
    }

    /// Calls every connected slot with `args` and returns the last result.
    ///
    /// Slots connected or disconnected during the emission take effect on the
    /// next one. A failing slot is logged and does not stop the emission.
    pub fn emit(&self, args: &[Variant]) -> Variant {
        let slots: Vec<SlotRef> = self
            .inner
            .entries
            .borrow()
            .iter()
            .filter_map(|e| e.slot.clone())
            .collect();

        let mut result = Variant::Void;
        for slot in slots {
            match slot.call(args) {
                Ok(value) => result = value,
                Err(e) => warn!("Signal handler failed: {}", e),
            }
        }
        result
    }

    fn default_connection(&self) -> Connection {
        let mut default = self.inner.default_connection.borrow_mut();
        match default.as_ref() {
            Some(connection) => connection.clone(),
            None => {
                let connection = self.connect(None);
                *default = Some(connection.clone());
                connection
            }
        }
    }

    /// Slot currently held by the default connection.
    pub fn default_connected_slot(&self) -> Option<SlotRef> {
        self.default_connection().slot()
    }

    /// Replaces the slot of the default connection; `None` blocks it.
    pub fn set_default_connected_slot(&self, slot: Option<SlotRef>) -> bool {
        self.default_connection().reconnect(slot)
    }

    /// A slot that emits this signal when called and carries its signature.
    pub fn prototype_slot(&self) -> SlotRef {
        Rc::new(SignalSlot {
            signal: Rc::downgrade(&self.inner),
            signature: self.inner.signature.clone(),
        })
    }

    pub fn ptr_eq(&self, other: &Signal) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("signature", &self.inner.signature)
            .field("connections", &self.connection_count())
            .finish()
    }
}

/// Handle to one connection of a [`Signal`].
///
/// Holding a connection does not keep the signal alive.
#[derive(Clone)]
pub struct Connection {
    id: u64,
    signal: Weak<SignalInner>,
}

impl Connection {
    fn with_entry<R>(&self, f: impl FnOnce(&mut Entry) -> R) -> Option<R> {
        let inner = self.signal.upgrade()?;
        let mut entries = inner.entries.borrow_mut();
        entries.iter_mut().find(|e| e.id == self.id).map(f)
    }

    /// Removes the connection. Later `reconnect` calls fail.
    pub fn disconnect(&self) {
        if let Some(inner) = self.signal.upgrade() {
            inner.entries.borrow_mut().retain(|e| e.id != self.id);
        }
    }

    /// Swaps in a new slot, dropping the previous one.
    pub fn reconnect(&self, slot: Option<SlotRef>) -> bool {
        self.with_entry(|e| e.slot = slot).is_some()
    }

    pub fn slot(&self) -> Option<SlotRef> {
        self.with_entry(|e| e.slot.clone()).flatten()
    }

    pub fn is_connected(&self) -> bool {
        self.with_entry(|e| e.slot.is_some()).unwrap_or(false)
    }
}

/// Slot view of a signal; calling it emits the signal.
struct SignalSlot {
    signal: Weak<SignalInner>,
    signature: Signature,
}

impl Slot for SignalSlot {
    fn call(&self, args: &[Variant]) -> BridgeResult<Variant> {
        match self.signal.upgrade() {
            Some(inner) => Ok(Signal { inner }.emit(args)),
            None => Ok(Variant::Void),
        }
    }

    fn signature(&self) -> Option<&Signature> {
        Some(&self.signature)
    }

    fn same_as(&self, other: &dyn Slot) -> bool {
        other
            .as_any()
            .downcast_ref::<SignalSlot>()
            .is_some_and(|o| Weak::ptr_eq(&o.signal, &self.signal))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::slot::NativeSlot;

    fn recorder(log: &Rc<RefCell<Vec<String>>>, tag: &'static str) -> SlotRef {
        let log = log.clone();
        NativeSlot::untyped(move |args| {
            log.borrow_mut().push(format!("{}:{}", tag, args.len()));
            Ok(Variant::Void)
        })
        .into_ref()
    }

    #[test]
    fn test_emit_in_connection_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let signal = Signal::new(vec![VariantType::Int64]);
        signal.connect(Some(recorder(&log, "a")));
        signal.connect(Some(recorder(&log, "b")));
        signal.emit(&[Variant::Int64(1)]);
        assert_eq!(*log.borrow(), vec!["a:1", "b:1"]);
    }

    #[test]
    fn test_disconnect_and_reconnect() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let signal = Signal::new(vec![]);
        let connection = signal.connect(Some(recorder(&log, "a")));
        assert!(connection.is_connected());
        assert!(connection.reconnect(Some(recorder(&log, "b"))));
        signal.emit(&[]);
        connection.disconnect();
        signal.emit(&[]);
        assert_eq!(*log.borrow(), vec!["b:0"]);
        assert!(!connection.reconnect(None));
    }

    #[test]
    fn test_default_connection_is_reused() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let signal = Signal::new(vec![]);
        assert!(signal.default_connected_slot().is_none());
        assert!(signal.set_default_connected_slot(Some(recorder(&log, "first"))));
        assert!(signal.set_default_connected_slot(Some(recorder(&log, "second"))));
        assert_eq!(signal.connection_count(), 1);
        signal.emit(&[]);
        assert_eq!(*log.borrow(), vec!["second:0"]);
    }

    #[test]
    fn test_failing_handler_does_not_stop_emission() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let signal = Signal::new(vec![]);
        signal.connect(Some(
            NativeSlot::untyped(|_| Err(BridgeError::Native("boom".into()))).into_ref(),
        ));
        signal.connect(Some(recorder(&log, "after")));
        signal.emit(&[]);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_prototype_slot_carries_signature_and_emits() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let signal = Signal::new(vec![VariantType::String, VariantType::Bool]);
        signal.connect(Some(recorder(&log, "x")));
        let proto = signal.prototype_slot();
        assert_eq!(proto.return_type(), VariantType::Void);
        assert_eq!(proto.arg_count(), Some(2));
        assert!(proto.same_as(signal.prototype_slot().as_ref()));
        proto.call(&[Variant::string("a"), Variant::Bool(true)]).unwrap();
        assert_eq!(*log.borrow(), vec!["x:2"]);
    }
}
