//! JSON output formatter for script results

use crate::output::formatter::OutputFormatter;
use bridge_domain::{
    ScriptableArray, ScriptableBinaryData, ScriptableObject, ScriptableRef, Variant, downcast,
};
use serde_json::{Value, json};

/// Formats values as pretty-printed JSON
pub struct JsonFormatter;

impl JsonFormatter {
    /// JSON form of a value. Callables and opaque objects become
    /// descriptive strings.
    pub fn to_json(value: &Variant) -> Value {
        match value {
            Variant::Void
            | Variant::Any
            | Variant::String(None)
            | Variant::Utf16String(None)
            | Variant::Slot(None)
            | Variant::Scriptable(None)
            | Variant::ConstScriptable(None) => Value::Null,
            Variant::Bool(b) => Value::Bool(*b),
            Variant::Int64(n) => json!(n),
            Variant::Double(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Variant::String(Some(s)) => Value::String(s.clone()),
            Variant::Utf16String(Some(units)) => Value::String(String::from_utf16_lossy(units)),
            Variant::Json(text) => text
                .parse()
                .unwrap_or_else(|_| Value::String(text.as_str().to_string())),
            Variant::Date(date) => Value::String(date.to_string()),
            Variant::Slot(Some(_)) => Value::String("<function>".to_string()),
            Variant::Scriptable(Some(object)) | Variant::ConstScriptable(Some(object)) => Self::object(object),
        }
    }

    fn object(object: &ScriptableRef) -> Value {
        if let Some(array) = downcast::<ScriptableArray>(object) {
            return Value::Array(array.items().iter().map(Self::to_json).collect());
        }
        if let Some(data) = downcast::<ScriptableBinaryData>(object) {
            return Value::Array(data.data().iter().map(|b| json!(b)).collect());
        }
        Value::String(format!("<object {}>", object.class_id()))
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, value: &Variant) -> String {
        serde_json::to_string_pretty(&Self::to_json(value)).unwrap_or_else(|_| "null".to_string())
    }

    fn format_error(&self, message: &str) -> String {
        serde_json::to_string_pretty(&json!({ "error": message }))
            .unwrap_or_else(|_| "{}".to_string())
    }
}
