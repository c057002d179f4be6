//! Value conversion between Lua values and variants.
//!
//! Untyped conversion picks the variant kind from the Lua type. Typed
//! conversion coerces towards a declared kind and fails when the value
//! has no sensible reading of that kind.

use super::date::ScriptDate;
use super::function_slot::LuaFunctionSlot;
use super::native_wrapper::NativeWrapper;
use super::object_adapter::LuaObjectAdapter;
use super::print::{describe_value, is_null, lua_tostring};
use super::script_context::ContextShared;
use bridge_domain::{
    BridgeError, BridgeResult, Date, JsonString, ScriptableArray, ScriptableBinaryData,
    ScriptableFunction, ScriptableRef, Slot, SlotRef, Variant, VariantType, downcast,
};
use mlua::{DeserializeOptions, LuaSerdeExt, prelude::*};
use tracing::{debug, warn};

pub(crate) fn lua_error(error: LuaError) -> BridgeError {
    BridgeError::Script(error.to_string())
}

fn is_nullish(value: &LuaValue) -> bool {
    value.is_nil() || is_null(value)
}

/// `nil`, `null` and integer 0 all mean "no object".
fn is_null_reference(value: &LuaValue) -> bool {
    is_nullish(value) || matches!(value, LuaValue::Integer(0))
}

fn conversion_error(ctx: &ContextShared, value: &LuaValue, target: VariantType) -> BridgeError {
    BridgeError::conversion(describe_value(&ctx.lua, value), target)
}

fn wrapped_object(ud: &LuaAnyUserData) -> Option<ScriptableRef> {
    ud.borrow::<NativeWrapper>().ok()?.object()
}

// ==================== Script -> Native ====================

/// Converts a Lua value choosing the kind from its Lua type.
pub(crate) fn to_native(ctx: &ContextShared, value: &LuaValue) -> BridgeResult<Variant> {
    match value {
        v if is_nullish(v) => Ok(Variant::Void),
        LuaValue::Boolean(b) => Ok(Variant::Bool(*b)),
        LuaValue::Integer(n) => Ok(Variant::Int64(*n)),
        LuaValue::Number(n) => Ok(Variant::Double(*n)),
        LuaValue::String(s) => Ok(Variant::string(s.to_string_lossy())),
        LuaValue::Function(_) | LuaValue::Table(_) => {
            to_object(ctx, value, VariantType::Scriptable).map(Variant::Scriptable)
        }
        LuaValue::UserData(ud) => {
            if let Ok(date) = ud.borrow::<ScriptDate>() {
                return Ok(Variant::Date(date.0));
            }
            if ud.is::<NativeWrapper>() {
                return wrapped_object(ud)
                    .map(|object| Variant::Scriptable(Some(object)))
                    .ok_or(BridgeError::ObjectDeleted);
            }
            Err(conversion_error(ctx, value, VariantType::Variant))
        }
        _ => Err(conversion_error(ctx, value, VariantType::Variant)),
    }
}

/// Converts a Lua value towards the kind of `prototype`.
pub(crate) fn to_native_typed(ctx: &ContextShared, value: &LuaValue, prototype: &Variant) -> BridgeResult<Variant> {
    to_native_as(ctx, value, prototype.variant_type(), prototype.as_slot())
}

/// Converts a Lua value towards `kind`. `prototype_slot` supplies the
/// metadata of a slot-kind target.
pub(crate) fn to_native_as(
    ctx: &ContextShared,
    value: &LuaValue,
    kind: VariantType,
    prototype_slot: Option<&SlotRef>,
) -> BridgeResult<Variant> {
    match kind {
        VariantType::Void => Ok(Variant::Void),
        VariantType::Bool => Ok(to_bool(value)),
        VariantType::Int64 => to_int(ctx, value),
        VariantType::Double => to_double(ctx, value),
        VariantType::String => to_string(ctx, value),
        VariantType::Utf16String => to_utf16(ctx, value),
        VariantType::Json => Ok(to_json(ctx, value)),
        VariantType::Date => to_date(ctx, value),
        VariantType::Slot => to_slot(ctx, value, prototype_slot).map(Variant::Slot),
        VariantType::Scriptable => to_object(ctx, value, kind).map(Variant::Scriptable),
        VariantType::ConstScriptable => to_object(ctx, value, kind).map(Variant::ConstScriptable),
        VariantType::Variant => to_native(ctx, value),
    }
}

fn to_bool(value: &LuaValue) -> Variant {
    let truthy = match value {
        LuaValue::String(s) => {
            let s = s.to_string_lossy();
            !s.is_empty() && !s.eq_ignore_ascii_case("false")
        }
        LuaValue::Nil | LuaValue::Boolean(false) => false,
        v if is_null(v) => false,
        _ => true,
    };
    Variant::Bool(truthy)
}

fn number_of(ctx: &ContextShared, value: &LuaValue) -> Option<f64> {
    match value {
        LuaValue::Integer(n) => Some(*n as f64),
        LuaValue::Number(n) => Some(*n),
        LuaValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        LuaValue::String(_) => ctx.lua.coerce_number(value.clone()).ok().flatten(),
        _ => None,
    }
}

fn to_int(ctx: &ContextShared, value: &LuaValue) -> BridgeResult<Variant> {
    match value {
        v if is_nullish(v) => Ok(Variant::Int64(0)),
        LuaValue::Integer(n) => Ok(Variant::Int64(*n)),
        _ => match number_of(ctx, value) {
            Some(n) if n.is_finite() => Ok(Variant::Int64(n.round() as i64)),
            _ => Err(conversion_error(ctx, value, VariantType::Int64)),
        },
    }
}

fn to_double(ctx: &ContextShared, value: &LuaValue) -> BridgeResult<Variant> {
    match value {
        v if is_nullish(v) => Ok(Variant::Double(0.0)),
        // A genuine float keeps NaN.
        LuaValue::Number(n) => Ok(Variant::Double(*n)),
        _ => match number_of(ctx, value) {
            Some(n) if !n.is_nan() => Ok(Variant::Double(n)),
            _ => Err(conversion_error(ctx, value, VariantType::Double)),
        },
    }
}

/// Text form of strings, booleans, numbers, sequences and binary data.
fn script_text(ctx: &ContextShared, value: &LuaValue) -> Option<String> {
    match value {
        LuaValue::String(s) => Some(s.to_string_lossy().to_string()),
        LuaValue::Boolean(_) | LuaValue::Integer(_) | LuaValue::Number(_) => {
            Some(lua_tostring(&ctx.lua, value))
        }
        LuaValue::Table(table) => sequence_text(ctx, table),
        LuaValue::UserData(ud) => {
            let object = wrapped_object(ud)?;
            let data = downcast::<ScriptableBinaryData>(&object)?;
            Some(String::from_utf8_lossy(data.until_nul()).into_owned())
        }
        _ => None,
    }
}

fn sequence_text(ctx: &ContextShared, table: &LuaTable) -> Option<String> {
    let len = table.raw_len();
    if table.clone().pairs::<LuaValue, LuaValue>().count() != len {
        return None;
    }
    let mut parts = Vec::with_capacity(len);
    for item in table.clone().sequence_values::<LuaValue>() {
        let item = item.ok()?;
        if is_nullish(&item) {
            parts.push(String::new());
        } else {
            parts.push(script_text(ctx, &item)?);
        }
    }
    Some(parts.join(","))
}

fn to_string(ctx: &ContextShared, value: &LuaValue) -> BridgeResult<Variant> {
    if is_null(value) {
        return Ok(Variant::null_string());
    }
    if value.is_nil() {
        return Ok(Variant::string(""));
    }
    script_text(ctx, value)
        .map(Variant::string)
        .ok_or_else(|| conversion_error(ctx, value, VariantType::String))
}

fn to_utf16(ctx: &ContextShared, value: &LuaValue) -> BridgeResult<Variant> {
    match value {
        v if is_null(v) => Ok(Variant::Utf16String(None)),
        LuaValue::Nil => Ok(Variant::Utf16String(Some(Vec::new()))),
        LuaValue::String(_) | LuaValue::Boolean(_) | LuaValue::Integer(_) | LuaValue::Number(_) => {
            script_text(ctx, value)
                .map(|text| Variant::utf16(&text))
                .ok_or_else(|| conversion_error(ctx, value, VariantType::Utf16String))
        }
        _ => Err(conversion_error(ctx, value, VariantType::Utf16String)),
    }
}

fn to_json(ctx: &ContextShared, value: &LuaValue) -> Variant {
    let options = DeserializeOptions::new().deny_unsupported_types(false);
    match ctx.lua.from_value_with::<serde_json::Value>(value.clone(), options) {
        Ok(json) => Variant::Json(JsonString::from_value(&json)),
        Err(e) => {
            warn!("Value can't be encoded as JSON, using null: {}", e);
            Variant::Json(JsonString::new("null"))
        }
    }
}

fn to_date(ctx: &ContextShared, value: &LuaValue) -> BridgeResult<Variant> {
    match value {
        LuaValue::Nil => Ok(Variant::Date(Date::from_millis(0))),
        LuaValue::UserData(ud) => ud
            .borrow::<ScriptDate>()
            .map(|date| Variant::Date(date.0))
            .map_err(|_| conversion_error(ctx, value, VariantType::Date)),
        _ => Err(conversion_error(ctx, value, VariantType::Date)),
    }
}

fn to_slot(ctx: &ContextShared, value: &LuaValue, prototype: Option<&SlotRef>) -> BridgeResult<Option<SlotRef>> {
    let function = match value {
        v if is_null_reference(v) => return Ok(None),
        LuaValue::Function(function) => function.clone(),
        LuaValue::String(source) => ctx
            .lua
            .load(source.to_string_lossy().to_string())
            .set_name(ctx.options.chunk_name.clone())
            .into_function()
            .map_err(lua_error)?,
        _ => return Err(conversion_error(ctx, value, VariantType::Slot)),
    };
    ctx.registry
        .function_slot(ctx, function, prototype)
        .map(Some)
        .map_err(lua_error)
}

fn to_object(ctx: &ContextShared, value: &LuaValue, kind: VariantType) -> BridgeResult<Option<ScriptableRef>> {
    match value {
        v if is_null_reference(v) => Ok(None),
        LuaValue::UserData(ud) if ud.is::<NativeWrapper>() => {
            wrapped_object(ud).map(Some).ok_or(BridgeError::ObjectDeleted)
        }
        LuaValue::Table(table) => {
            let adapter: ScriptableRef = ctx
                .registry
                .table_adapter(ctx, table.clone())
                .map_err(lua_error)?;
            Ok(Some(adapter))
        }
        LuaValue::Function(function) => {
            let slot = ctx
                .registry
                .function_slot(ctx, function.clone(), None)
                .map_err(lua_error)?;
            let function: ScriptableRef = ScriptableFunction::new(slot);
            Ok(Some(function))
        }
        _ => Err(conversion_error(ctx, value, kind)),
    }
}

/// Converts a Lua argument list against the metadata of `slot`.
///
/// The count is checked before anything is converted. Missing trailing
/// arguments, and `nil` where a default exists, take the declared default.
/// A declared argument prototype takes precedence over the plain kind.
/// Arguments past the declared types convert untyped. On failure every
/// converted value is dropped with the partial list.
pub(crate) fn convert_args(ctx: &ContextShared, slot: &dyn Slot, args: &[LuaValue]) -> BridgeResult<Vec<Variant>> {
    let signature = slot.signature();
    if let Some(signature) = signature {
        signature.check_arity(args.len())?;
    }

    let arg_types = slot.arg_types().unwrap_or(&[]);
    let count = slot.arg_count().unwrap_or(args.len()).max(args.len());
    let mut converted = Vec::with_capacity(count);

    for index in 0..count {
        let default = signature.and_then(|s| s.default_for(index));
        let value = match (args.get(index), default) {
            (None, Some(default)) | (Some(LuaValue::Nil), Some(default)) => default.clone(),
            (None, None) => Variant::Void,
            (Some(arg), _) => {
                let prototype = signature.and_then(|s| s.arg_prototype(index));
                let result = match (prototype, arg_types.get(index)) {
                    (Some(prototype), _) => to_native_typed(ctx, arg, prototype),
                    (None, Some(kind)) => to_native_as(ctx, arg, *kind, None),
                    (None, None) => to_native(ctx, arg),
                };
                result.map_err(|e| {
                    debug!("Argument {} rejected: {}", index, e);
                    BridgeError::ArgumentConversion {
                        index,
                        value: describe_value(&ctx.lua, arg),
                    }
                })?
            }
        };
        converted.push(value);
    }
    Ok(converted)
}

// ==================== Native -> Script ====================

/// Converts a variant into a Lua value.
pub(crate) fn to_script(ctx: &ContextShared, value: &Variant) -> BridgeResult<LuaValue> {
    let lua = &ctx.lua;
    match value {
        Variant::Void | Variant::Any => Ok(LuaValue::Nil),
        Variant::Bool(b) => Ok(LuaValue::Boolean(*b)),
        Variant::Int64(n) => Ok(LuaValue::Integer(*n)),
        Variant::Double(n) => Ok(LuaValue::Number(*n)),
        Variant::String(None) | Variant::Utf16String(None) => Ok(LuaValue::NULL),
        Variant::String(Some(s)) => lua.create_string(s).map(LuaValue::String).map_err(lua_error),
        Variant::Utf16String(Some(units)) => lua
            .create_string(String::from_utf16_lossy(units))
            .map(LuaValue::String)
            .map_err(lua_error),
        Variant::Json(json) => {
            let parsed = json
                .parse()
                .map_err(|_| BridgeError::conversion(json.as_str(), VariantType::Json))?;
            lua.to_value(&parsed).map_err(lua_error)
        }
        Variant::Date(date) => lua
            .load(format!("Date({})", date.millis()))
            .set_name("date")
            .eval::<LuaValue>()
            .map_err(lua_error),
        Variant::Slot(slot) => slot_to_script(ctx, slot.as_ref()),
        Variant::Scriptable(None) => Ok(LuaValue::NULL),
        Variant::Scriptable(Some(object)) => object_to_script(ctx, object),
        Variant::ConstScriptable(_) => Err(BridgeError::ConstScriptable),
    }
}

/// Native callables stay native; only script functions come back.
fn slot_to_script(ctx: &ContextShared, slot: Option<&SlotRef>) -> BridgeResult<LuaValue> {
    let script_slot = slot
        .and_then(|slot| slot.as_any().downcast_ref::<LuaFunctionSlot>())
        .filter(|slot| slot.belongs_to(ctx));
    match script_slot {
        Some(slot) => slot.function(ctx).map(LuaValue::Function).map_err(lua_error),
        None => Ok(LuaValue::Nil),
    }
}

fn object_to_script(ctx: &ContextShared, object: &ScriptableRef) -> BridgeResult<LuaValue> {
    if let Some(array) = downcast::<ScriptableArray>(object) {
        object.attach();
        let table = array_to_table(ctx, array);
        object.detach();
        return table.map(LuaValue::Table);
    }

    if let Some(adapter) = downcast::<LuaObjectAdapter>(object) {
        if adapter.belongs_to(ctx) {
            return adapter.table(ctx).map(LuaValue::Table).map_err(lua_error);
        }
    }

    if let Some(function) = downcast::<ScriptableFunction>(object) {
        let script_slot = function
            .slot()
            .as_any()
            .downcast_ref::<LuaFunctionSlot>()
            .filter(|slot| slot.belongs_to(ctx));
        if let Some(slot) = script_slot {
            return slot.function(ctx).map(LuaValue::Function).map_err(lua_error);
        }
    }

    ctx.registry
        .wrapper_for(ctx, object)
        .map(LuaValue::UserData)
        .map_err(lua_error)
}

fn array_to_table(ctx: &ContextShared, array: &ScriptableArray) -> BridgeResult<LuaTable> {
    let table = ctx.lua.create_table().map_err(lua_error)?;
    for (index, item) in array.items().iter().enumerate() {
        table
            .raw_set(index + 1, to_script(ctx, item)?)
            .map_err(lua_error)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripting::script_context::LuaScriptContext;
    use bridge_application::ContextOptions;
    use bridge_domain::{NativeSlot, ScriptableObject, Signature, object_key};
    use std::rc::Rc;

    fn context() -> LuaScriptContext {
        LuaScriptContext::new(&ContextOptions::default()).unwrap()
    }

    fn eval(ctx: &ContextShared, source: &str) -> LuaValue {
        ctx.lua.load(source).eval().unwrap()
    }

    fn typed(ctx: &ContextShared, source: &str, kind: VariantType) -> BridgeResult<Variant> {
        let value = eval(ctx, source);
        to_native_as(ctx, &value, kind, None)
    }

    #[test]
    fn test_untyped_kinds() {
        let context = context();
        let ctx = context.shared();
        assert_eq!(to_native(ctx, &eval(ctx, "nil")).unwrap(), Variant::Void);
        assert_eq!(to_native(ctx, &eval(ctx, "null")).unwrap(), Variant::Void);
        assert_eq!(to_native(ctx, &eval(ctx, "true")).unwrap(), Variant::Bool(true));
        assert_eq!(to_native(ctx, &eval(ctx, "7")).unwrap(), Variant::Int64(7));
        assert_eq!(to_native(ctx, &eval(ctx, "7.5")).unwrap(), Variant::Double(7.5));
        assert_eq!(to_native(ctx, &eval(ctx, "'hi'")).unwrap(), Variant::string("hi"));
        assert_eq!(
            to_native(ctx, &eval(ctx, "Date(12)")).unwrap(),
            Variant::Date(Date::from_millis(12))
        );

        let function = to_native(ctx, &eval(ctx, "function() end")).unwrap();
        let function = downcast::<ScriptableFunction>(function.as_object().unwrap()).unwrap();
        assert!(!function.slot().has_metadata());
        let table = to_native(ctx, &eval(ctx, "{a = 1}")).unwrap();
        assert!(table.as_object().unwrap().is_instance_of(LuaObjectAdapter::CLASS_ID));
        assert!(to_native(ctx, &eval(ctx, "coroutine.create(function() end)")).is_err());
    }

    #[test]
    fn test_bool_strings() {
        let context = context();
        let ctx = context.shared();
        assert_eq!(typed(ctx, "'false'", VariantType::Bool).unwrap(), Variant::Bool(false));
        assert_eq!(typed(ctx, "'FALSE'", VariantType::Bool).unwrap(), Variant::Bool(false));
        assert_eq!(typed(ctx, "''", VariantType::Bool).unwrap(), Variant::Bool(false));
        assert_eq!(typed(ctx, "'0'", VariantType::Bool).unwrap(), Variant::Bool(true));
        assert_eq!(typed(ctx, "false", VariantType::Bool).unwrap(), Variant::Bool(false));
        assert_eq!(typed(ctx, "nil", VariantType::Bool).unwrap(), Variant::Bool(false));
        assert_eq!(typed(ctx, "null", VariantType::Bool).unwrap(), Variant::Bool(false));
        assert_eq!(typed(ctx, "{}", VariantType::Bool).unwrap(), Variant::Bool(true));
    }

    #[test]
    fn test_int_rounding_and_failures() {
        let context = context();
        let ctx = context.shared();
        assert_eq!(typed(ctx, "nil", VariantType::Int64).unwrap(), Variant::Int64(0));
        assert_eq!(typed(ctx, "2.5", VariantType::Int64).unwrap(), Variant::Int64(3));
        assert_eq!(typed(ctx, "-2.5", VariantType::Int64).unwrap(), Variant::Int64(-3));
        assert_eq!(typed(ctx, "' 42 '", VariantType::Int64).unwrap(), Variant::Int64(42));
        assert_eq!(typed(ctx, "true", VariantType::Int64).unwrap(), Variant::Int64(1));
        assert!(typed(ctx, "0/0", VariantType::Int64).is_err());
        assert!(typed(ctx, "'abc'", VariantType::Int64).is_err());
        assert!(typed(ctx, "{}", VariantType::Int64).is_err());
    }

    #[test]
    fn test_double_nan_only_from_floats() {
        let context = context();
        let ctx = context.shared();
        let nan = typed(ctx, "0/0", VariantType::Double).unwrap();
        assert!(nan.as_f64().unwrap().is_nan());
        assert_eq!(typed(ctx, "null", VariantType::Double).unwrap(), Variant::Double(0.0));
        assert_eq!(typed(ctx, "'1.5'", VariantType::Double).unwrap(), Variant::Double(1.5));
        assert!(typed(ctx, "'nan'", VariantType::Double).is_err());
    }

    #[test]
    fn test_string_conversions() {
        let context = context();
        let ctx = context.shared();
        assert_eq!(typed(ctx, "nil", VariantType::String).unwrap(), Variant::string(""));
        assert_eq!(typed(ctx, "null", VariantType::String).unwrap(), Variant::null_string());
        assert_eq!(typed(ctx, "12", VariantType::String).unwrap(), Variant::string("12"));
        assert_eq!(typed(ctx, "true", VariantType::String).unwrap(), Variant::string("true"));
        assert_eq!(typed(ctx, "{'only'}", VariantType::String).unwrap(), Variant::string("only"));
        assert_eq!(typed(ctx, "{1, 'b', 3}", VariantType::String).unwrap(), Variant::string("1,b,3"));
        assert!(typed(ctx, "{a = 1}", VariantType::String).is_err());
        assert!(typed(ctx, "function() end", VariantType::String).is_err());
    }

    #[test]
    fn test_binary_data_truncates_at_nul() {
        let context = context();
        let ctx = context.shared();
        let data: ScriptableRef = ScriptableBinaryData::new(b"abc\0def".to_vec());
        let value = to_script(ctx, &Variant::object(data)).unwrap();
        assert_eq!(
            to_native_as(ctx, &value, VariantType::String, None).unwrap(),
            Variant::string("abc")
        );
    }

    #[test]
    fn test_utf16_conversions() {
        let context = context();
        let ctx = context.shared();
        assert_eq!(typed(ctx, "null", VariantType::Utf16String).unwrap(), Variant::Utf16String(None));
        assert_eq!(
            typed(ctx, "nil", VariantType::Utf16String).unwrap(),
            Variant::Utf16String(Some(Vec::new()))
        );
        assert_eq!(typed(ctx, "'hé'", VariantType::Utf16String).unwrap(), Variant::utf16("hé"));
    }

    #[test]
    fn test_json_encoding() {
        let context = context();
        let ctx = context.shared();
        let json = typed(ctx, "{a = {1, 2}}", VariantType::Json).unwrap();
        let Variant::Json(json) = json else {
            panic!("expected json");
        };
        assert_eq!(json.parse().unwrap(), serde_json::json!({"a": [1, 2]}));

        let json = typed(ctx, "{f = function() end, b = true}", VariantType::Json).unwrap();
        let Variant::Json(json) = json else {
            panic!("expected json");
        };
        assert_eq!(json.parse().unwrap(), serde_json::json!({"b": true}));
    }

    #[test]
    fn test_json_to_script() {
        let context = context();
        let ctx = context.shared();
        let value = to_script(ctx, &Variant::Json(JsonString::new(r#"{"n": null, "x": [1]}"#))).unwrap();
        ctx.lua.globals().set("decoded", value).unwrap();
        let (is_null, first): (bool, i64) = ctx
            .lua
            .load("return decoded.n == null, decoded.x[1]")
            .eval()
            .unwrap();
        assert!(is_null);
        assert_eq!(first, 1);
    }

    #[test]
    fn test_date_conversions() {
        let context = context();
        let ctx = context.shared();
        assert_eq!(typed(ctx, "nil", VariantType::Date).unwrap(), Variant::Date(Date::from_millis(0)));
        assert!(typed(ctx, "5", VariantType::Date).is_err());
        let value = to_script(ctx, &Variant::Date(Date::from_millis(99))).unwrap();
        assert_eq!(to_native(ctx, &value).unwrap(), Variant::Date(Date::from_millis(99)));
    }

    #[test]
    fn test_object_targets() {
        let context = context();
        let ctx = context.shared();
        assert_eq!(typed(ctx, "0", VariantType::Scriptable).unwrap(), Variant::Scriptable(None));
        assert_eq!(typed(ctx, "null", VariantType::Scriptable).unwrap(), Variant::Scriptable(None));
        assert!(typed(ctx, "'x'", VariantType::Scriptable).is_err());

        let function = typed(ctx, "function() return 1 end", VariantType::Scriptable).unwrap();
        let function = function.as_object().unwrap();
        assert!(function.is_instance_of(ScriptableFunction::CLASS_ID));
        let back = to_script(ctx, &Variant::object(function.clone())).unwrap();
        assert!(matches!(back, LuaValue::Function(_)));
    }

    #[test]
    fn test_slot_from_string_source() {
        let context = context();
        let ctx = context.shared();
        let slot = typed(ctx, "'counter = (counter or 0) + 1'", VariantType::Slot).unwrap();
        let slot = slot.as_slot().unwrap();
        slot.call(&[]).unwrap();
        slot.call(&[]).unwrap();
        let counter: i64 = ctx.lua.globals().get("counter").unwrap();
        assert_eq!(counter, 2);
        assert_eq!(typed(ctx, "0", VariantType::Slot).unwrap(), Variant::Slot(None));
    }

    #[test]
    fn test_slot_carries_prototype_metadata() {
        let context = context();
        let ctx = context.shared();
        let prototype = NativeSlot::new(Signature::new(vec![VariantType::Int64], VariantType::Int64), |_| {
            Ok(Variant::Void)
        })
        .into_ref();
        let value = eval(ctx, "function(n) return n * 2 end");
        let slot = to_native_as(ctx, &value, VariantType::Slot, Some(&prototype)).unwrap();
        let slot = slot.as_slot().unwrap();
        assert!(slot.has_metadata());
        assert_eq!(slot.call(&[Variant::Int64(21)]).unwrap(), Variant::Int64(42));
    }

    #[test]
    fn test_same_function_reuses_adapter() {
        let context = context();
        let ctx = context.shared();
        let value = eval(ctx, "function() end");
        let first = to_native_as(ctx, &value, VariantType::Slot, None).unwrap();
        let second = to_native_as(ctx, &value, VariantType::Slot, None).unwrap();
        assert!(Rc::ptr_eq(first.as_slot().unwrap(), second.as_slot().unwrap()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_round_trips() {
        let context = context();
        let ctx = context.shared();
        let values = [
            Variant::Void,
            Variant::Bool(false),
            Variant::Int64(i64::MAX),
            Variant::Int64(-9_007_199_254_740_993),
            Variant::Double(0.25),
            Variant::string("text"),
            Variant::null_string(),
            Variant::Date(Date::from_millis(1_700_000_000_000)),
        ];
        for value in values {
            let script = to_script(ctx, &value).unwrap();
            let back = to_native_as(ctx, &script, value.variant_type(), None).unwrap();
            assert_eq!(back, value);
        }

        let units = Variant::utf16("wide");
        let script = to_script(ctx, &units).unwrap();
        assert_eq!(to_native_as(ctx, &script, VariantType::Utf16String, None).unwrap(), units);

        let nan = to_script(ctx, &Variant::Double(f64::NAN)).unwrap();
        let back = to_native_as(ctx, &nan, VariantType::Double, None).unwrap();
        assert!(back.as_f64().unwrap().is_nan());
    }

    #[test]
    fn test_script_values_keep_identity() {
        let context = context();
        let ctx = context.shared();
        let table = eval(ctx, "{}");
        let native = to_native(ctx, &table).unwrap();
        let back = to_script(ctx, &native).unwrap();
        assert_eq!(back, table);

        let function = eval(ctx, "function() end");
        let native = to_native(ctx, &function).unwrap();
        assert_eq!(to_script(ctx, &native).unwrap(), function);

        let object: ScriptableRef = ScriptableBinaryData::new(vec![1]);
        let script = to_script(ctx, &Variant::object(object.clone())).unwrap();
        let back = to_native(ctx, &script).unwrap();
        assert_eq!(object_key(back.as_object().unwrap()), object_key(&object));
    }

    #[test]
    fn test_native_slots_stay_native() {
        let context = context();
        let ctx = context.shared();
        let native = NativeSlot::untyped(|_| Ok(Variant::Void)).into_ref();
        assert_eq!(to_script(ctx, &Variant::slot(native)).unwrap(), LuaValue::Nil);
        assert_eq!(to_script(ctx, &Variant::Slot(None)).unwrap(), LuaValue::Nil);
    }

    #[test]
    fn test_const_object_is_rejected() {
        let context = context();
        let ctx = context.shared();
        let object: ScriptableRef = ScriptableArray::new(vec![]);
        let error = to_script(ctx, &Variant::ConstScriptable(Some(object))).unwrap_err();
        assert_eq!(error, BridgeError::ConstScriptable);
    }

    #[test]
    fn test_array_becomes_sequence() {
        let context = context();
        let ctx = context.shared();
        let array = ScriptableArray::new(vec![Variant::Int64(1), Variant::string("two")]);
        let object: ScriptableRef = array.clone();
        let value = to_script(ctx, &Variant::object(object)).unwrap();
        ctx.lua.globals().set("items", value).unwrap();
        let (len, second): (i64, String) = ctx.lua.load("return #items, items[2]").eval().unwrap();
        assert_eq!((len, second.as_str()), (2, "two"));
        assert_eq!(array.ref_count(), 0);
    }

    #[test]
    fn test_convert_args_with_defaults() {
        let context = context();
        let ctx = context.shared();
        let signature = Signature::new(
            vec![VariantType::Int64, VariantType::String, VariantType::Bool],
            VariantType::Void,
        )
        .with_defaults(vec![Variant::string("b"), Variant::Bool(true)]);
        let slot = NativeSlot::new(signature, |_| Ok(Variant::Void));

        let one = convert_args(ctx, &slot, &[LuaValue::Integer(1)]).unwrap();
        assert_eq!(one, vec![Variant::Int64(1), Variant::string("b"), Variant::Bool(true)]);

        let nil_middle = convert_args(ctx, &slot, &[LuaValue::Integer(1), LuaValue::Nil]).unwrap();
        assert_eq!(nil_middle[1], Variant::string("b"));

        let three = convert_args(
            ctx,
            &slot,
            &[LuaValue::Integer(1), LuaValue::Integer(2), LuaValue::Boolean(false)],
        )
        .unwrap();
        assert_eq!(three, vec![Variant::Int64(1), Variant::string("2"), Variant::Bool(false)]);

        assert!(convert_args(ctx, &slot, &[]).unwrap_err().is_arity());
        let four = vec![LuaValue::Integer(1); 4];
        assert!(convert_args(ctx, &slot, &four).unwrap_err().is_arity());
    }

    #[test]
    fn test_convert_args_reports_position() {
        let context = context();
        let ctx = context.shared();
        let slot = NativeSlot::new(
            Signature::new(vec![VariantType::Slot, VariantType::Int64], VariantType::Void),
            |_| Ok(Variant::Void),
        );
        let callback = eval(ctx, "function() end");
        let converted = convert_args(ctx, &slot, &[callback, LuaValue::Boolean(true)]).unwrap();
        assert_eq!(converted[1], Variant::Int64(1));

        let callback = eval(ctx, "function() end");
        let bad = eval(ctx, "{}");
        let error = convert_args(ctx, &slot, &[callback, bad]).unwrap_err();
        assert!(matches!(error, BridgeError::ArgumentConversion { index: 1, .. }));
    }

    #[test]
    fn test_convert_args_releases_converted_values_on_failure() {
        let context = context();
        let ctx = context.shared();
        let slot = NativeSlot::new(
            Signature::new(vec![VariantType::Slot, VariantType::Int64], VariantType::Void),
            |_| Ok(Variant::Void),
        );
        let callback = eval(ctx, "function() end");

        let converted = convert_args(ctx, &slot, &[callback.clone(), LuaValue::Integer(1)]).unwrap();
        assert_eq!(ctx.registry.function_count(), 1);
        drop(converted);
        assert_eq!(ctx.registry.function_count(), 0);

        let bad = eval(ctx, "{}");
        assert!(convert_args(ctx, &slot, &[callback, bad]).is_err());
        assert_eq!(ctx.registry.function_count(), 0);
    }

    #[test]
    fn test_untyped_slot_accepts_anything() {
        let context = context();
        let ctx = context.shared();
        let slot = NativeSlot::untyped(|_| Ok(Variant::Void));
        let args = convert_args(ctx, &slot, &[LuaValue::Integer(1), LuaValue::Nil]).unwrap();
        assert_eq!(args, vec![Variant::Int64(1), Variant::Void]);
    }
}
