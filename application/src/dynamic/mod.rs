//! Dynamic member resolution
//!
//! Objects whose members are only known at runtime (bus proxies) resolve
//! names through [`resolve_get`] and [`resolve_set`], backed by a
//! [`MemberIntrospection`] implementation and a [`SignalCache`].

mod resolver;
mod signal_cache;

pub use resolver::{MemberIntrospection, resolve_get, resolve_set};
pub use signal_cache::SignalCache;
