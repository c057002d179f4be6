//! Per-object cache of materialised dynamic signals

use bridge_domain::{Signal, Variant, VariantType};
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::trace;

/// Signals discovered through dynamic lookups, keyed by name.
///
/// A signal is created on the first lookup of its name and then lives as
/// long as the cache, so repeated lookups observe the same instance.
#[derive(Default)]
pub struct SignalCache {
    signals: RefCell<BTreeMap<String, Signal>>,
}

impl SignalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Signal> {
        self.signals.borrow().get(name).cloned()
    }

    /// Returns the cached signal for `name`, creating it with `arg_types`
    /// if absent.
    pub fn materialize(&self, name: &str, arg_types: Vec<VariantType>) -> Signal {
        self.signals
            .borrow_mut()
            .entry(name.to_string())
            .or_insert_with(|| {
                trace!("Materialised dynamic signal '{}'", name);
                Signal::new(arg_types)
            })
            .clone()
    }

    /// Emits a cached signal. Unknown names are ignored.
    pub fn emit(&self, name: &str, args: &[Variant]) -> bool {
        let Some(signal) = self.get(name) else {
            return false;
        };
        signal.emit(args);
        true
    }

    pub fn len(&self) -> usize {
        self.signals.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_domain::NativeSlot;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_materialize_returns_same_instance() {
        let cache = SignalCache::new();
        let a = cache.materialize("Changed", vec![VariantType::String]);
        let b = cache.materialize("Changed", vec![]);
        assert!(a.ptr_eq(&b));
        assert_eq!(b.signature().arg_count, Some(1));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_emit_only_cached_signals() {
        let cache = SignalCache::new();
        assert!(!cache.emit("Changed", &[]));

        let hits = Rc::new(Cell::new(0));
        let seen = hits.clone();
        let signal = cache.materialize("Changed", vec![]);
        signal.set_default_connected_slot(Some(
            NativeSlot::untyped(move |_| {
                seen.set(seen.get() + 1);
                Ok(Variant::Void)
            })
            .into_ref(),
        ));
        assert!(cache.emit("Changed", &[]));
        assert_eq!(hits.get(), 1);
    }
}
