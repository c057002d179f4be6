//! Built-in demo service
//!
//! A small service on a [`MemoryBus`] that the CLI exposes to scripts as the
//! global `bus`. It covers every member kind a bus object can resolve:
//! typed methods (one with several return values, one slow enough to time
//! out), signals, properties with each access mode, a method and a property
//! sharing one name, a child object and a second interface.

use super::memory::{InterfaceDef, MemoryBus};
use bridge_application::{BusError, MethodInfo, PropertyAccess};
use bridge_domain::{Variant, VariantType};

pub const DEMO_SERVICE: &str = "org.example.Demo";
pub const DEMO_PATH: &str = "/org/example/Demo";
pub const DEMO_INTERFACE: &str = "org.example.Demo";

const SETTINGS_INTERFACE: &str = "org.example.Settings";
const DEBUG_INTERFACE: &str = "org.example.Demo.Debug";

/// Reply latency of `Slow` in milliseconds.
const SLOW_LATENCY_MS: u32 = 250;

fn int(args: &[Variant], index: usize) -> i64 {
    args.get(index).and_then(Variant::as_i64).unwrap_or(0)
}

fn demo_interface() -> InterfaceDef {
    use VariantType::{Bool, Double, Int64, String};

    InterfaceDef::new(DEMO_INTERFACE)
        .method("Ping", MethodInfo::new(vec![], vec![Bool]), |_| {
            Ok(vec![Variant::Bool(true)])
        })
        .method(
            "Echo",
            MethodInfo::new(vec![VariantType::Variant], vec![VariantType::Variant]),
            |args| Ok(args.to_vec()),
        )
        .method("Add", MethodInfo::new(vec![Int64, Int64], vec![Int64]), |args| {
            Ok(vec![Variant::Int64(int(args, 0).wrapping_add(int(args, 1)))])
        })
        .method(
            "DivMod",
            MethodInfo::new(vec![Int64, Int64], vec![Int64, Int64]),
            |args| {
                let (a, b) = (int(args, 0), int(args, 1));
                if b == 0 {
                    return Err(BusError::Remote("division by zero".to_string()));
                }
                Ok(vec![Variant::Int64(a.div_euclid(b)), Variant::Int64(a.rem_euclid(b))])
            },
        )
        .method_with_latency(
            "Slow",
            MethodInfo::new(vec![], vec![String]),
            SLOW_LATENCY_MS,
            |_| Ok(vec![Variant::string("done")]),
        )
        .method("Status", MethodInfo::new(vec![], vec![String]), |_| {
            Ok(vec![Variant::string("method")])
        })
        .signal("Tick", vec![Int64])
        .signal("Renamed", vec![String, String])
        .property("Name", PropertyAccess::READ, String, Variant::string("demo"))
        .property("Status", PropertyAccess::READ, String, Variant::string("property"))
        .property("Secret", PropertyAccess::WRITE, Int64, Variant::Int64(0))
        .property("Level", PropertyAccess::READ_WRITE, Double, Variant::Double(0.5))
}

fn settings_interface() -> InterfaceDef {
    InterfaceDef::new(SETTINGS_INTERFACE)
        .property(
            "Theme",
            PropertyAccess::READ_WRITE,
            VariantType::String,
            Variant::string("dark"),
        )
        .property("Verbose", PropertyAccess::READ_WRITE, VariantType::Bool, Variant::Bool(false))
}

fn debug_interface() -> InterfaceDef {
    InterfaceDef::new(DEBUG_INTERFACE).method(
        "Version",
        MethodInfo::new(vec![], vec![VariantType::String]),
        |_| Ok(vec![Variant::string(env!("CARGO_PKG_VERSION"))]),
    )
}

/// Creates a bus hosting the demo service.
pub fn demo_bus() -> MemoryBus {
    let bus = MemoryBus::new();
    bus.register_object(DEMO_SERVICE, DEMO_PATH, demo_interface());
    bus.register_object(DEMO_SERVICE, DEMO_PATH, debug_interface());
    bus.register_object(
        DEMO_SERVICE,
        &format!("{}/Settings", DEMO_PATH),
        settings_interface(),
    );
    bus
}
