//! Bus backends implementing the `BusProxy` port.

mod demo;
mod memory;

pub use demo::{DEMO_INTERFACE, DEMO_PATH, DEMO_SERVICE, demo_bus};
pub use memory::{InterfaceDef, MemoryBus, MemoryBusProxy, MethodHandler};
