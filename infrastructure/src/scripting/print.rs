//! Rendering of Lua values for diagnostics.

use mlua::{DeserializeOptions, LuaSerdeExt, prelude::*};

/// Whether `value` is the `null` sentinel.
pub fn is_null(value: &LuaValue) -> bool {
    matches!(value, LuaValue::LightUserData(ud) if ud.0.is_null())
}

/// Result of the engine's own `tostring`.
pub fn lua_tostring(lua: &Lua, value: &LuaValue) -> String {
    lua.globals()
        .get::<LuaFunction>("tostring")
        .and_then(|tostring| tostring.call::<String>(value.clone()))
        .unwrap_or_else(|_| format!("[{}]", value.type_name()))
}

/// Human-readable form of `value`: strings raw, tables as JSON, everything
/// else through `tostring`.
pub fn describe_value(lua: &Lua, value: &LuaValue) -> String {
    match value {
        LuaValue::String(s) => s.to_string_lossy().to_string(),
        LuaValue::Table(_) => {
            let options = DeserializeOptions::new().deny_unsupported_types(false);
            lua.from_value_with::<serde_json::Value>(value.clone(), options)
                .map(|json| json.to_string())
                .unwrap_or_else(|_| lua_tostring(lua, value))
        }
        v if is_null(v) => "null".to_string(),
        _ => lua_tostring(lua, value),
    }
}
