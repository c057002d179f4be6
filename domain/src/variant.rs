//! Variant value model
//!
//! [`Variant`] is the tagged union exchanged across the native/script
//! boundary. Payload validity is determined solely by the kind reported by
//! [`Variant::variant_type`].
//!
//! Strings carry an `Option` so that the "no string" value (script `null`)
//! stays distinguishable from the empty string.

use crate::scriptable::{ScriptableRef, same_object};
use crate::slot::SlotRef;
use chrono::{DateTime, Utc};
use std::fmt;

/// Kind tag of a [`Variant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VariantType {
    #[default]
    Void,
    Bool,
    Int64,
    Double,
    String,
    Utf16String,
    Json,
    Date,
    Slot,
    Scriptable,
    ConstScriptable,
    /// Accept any value and decide dynamically.
    Variant,
}

impl VariantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::Int64 => "int64",
            Self::Double => "double",
            Self::String => "string",
            Self::Utf16String => "utf16string",
            Self::Json => "json",
            Self::Date => "date",
            Self::Slot => "slot",
            Self::Scriptable => "scriptable",
            Self::ConstScriptable => "const_scriptable",
            Self::Variant => "variant",
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Date(pub i64);

impl Date {
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    pub fn millis(&self) -> i64 {
        self.0
    }

    /// Calendar form, if the timestamp is representable.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.to_rfc3339()),
            None => write!(f, "Date({})", self.0),
        }
    }
}

/// Opaque JSON text payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JsonString(pub String);

impl JsonString {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_value(value: &serde_json::Value) -> Self {
        Self(value.to_string())
    }

    pub fn parse(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.0)
    }
}

/// A value crossing the native/script boundary.
#[derive(Clone, Default)]
pub enum Variant {
    #[default]
    Void,
    Bool(bool),
    Int64(i64),
    Double(f64),
    /// `None` is the "no string" value.
    String(Option<String>),
    /// UTF-16 code units; `None` is the null wide string.
    Utf16String(Option<Vec<u16>>),
    Json(JsonString),
    Date(Date),
    Slot(Option<SlotRef>),
    Scriptable(Option<ScriptableRef>),
    ConstScriptable(Option<ScriptableRef>),
    /// Value of kind [`VariantType::Variant`], only meaningful as a prototype.
    Any,
}

impl Variant {
    /// Default value of the given kind, used as a type prototype.
    pub fn prototype(ty: VariantType) -> Self {
        match ty {
            VariantType::Void => Variant::Void,
            VariantType::Bool => Variant::Bool(false),
            VariantType::Int64 => Variant::Int64(0),
            VariantType::Double => Variant::Double(0.0),
            VariantType::String => Variant::String(None),
            VariantType::Utf16String => Variant::Utf16String(None),
            VariantType::Json => Variant::Json(JsonString::default()),
            VariantType::Date => Variant::Date(Date::default()),
            VariantType::Slot => Variant::Slot(None),
            VariantType::Scriptable => Variant::Scriptable(None),
            VariantType::ConstScriptable => Variant::ConstScriptable(None),
            VariantType::Variant => Variant::Any,
        }
    }

    pub fn variant_type(&self) -> VariantType {
        match self {
            Variant::Void => VariantType::Void,
            Variant::Bool(_) => VariantType::Bool,
            Variant::Int64(_) => VariantType::Int64,
            Variant::Double(_) => VariantType::Double,
            Variant::String(_) => VariantType::String,
            Variant::Utf16String(_) => VariantType::Utf16String,
            Variant::Json(_) => VariantType::Json,
            Variant::Date(_) => VariantType::Date,
            Variant::Slot(_) => VariantType::Slot,
            Variant::Scriptable(_) => VariantType::Scriptable,
            Variant::ConstScriptable(_) => VariantType::ConstScriptable,
            Variant::Any => VariantType::Variant,
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Variant::String(Some(value.into()))
    }

    pub fn null_string() -> Self {
        Variant::String(None)
    }

    pub fn utf16(value: &str) -> Self {
        Variant::Utf16String(Some(value.encode_utf16().collect()))
    }

    pub fn object(object: ScriptableRef) -> Self {
        Variant::Scriptable(Some(object))
    }

    pub fn slot(slot: SlotRef) -> Self {
        Variant::Slot(Some(slot))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Variant::Void)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Variant::Int64(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Variant::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Variant::String(Some(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_slot(&self) -> Option<&SlotRef> {
        match self {
            Variant::Slot(Some(slot)) => Some(slot),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ScriptableRef> {
        match self {
            Variant::Scriptable(Some(obj)) | Variant::ConstScriptable(Some(obj)) => Some(obj),
            _ => None,
        }
    }

    /// Native-side boolean coercion.
    pub fn convert_to_bool(&self) -> Option<bool> {
        match self {
            Variant::Void => Some(false),
            Variant::Bool(b) => Some(*b),
            Variant::Int64(n) => Some(*n != 0),
            Variant::Double(n) => Some(*n != 0.0 && !n.is_nan()),
            Variant::String(None) | Variant::Utf16String(None) => Some(false),
            Variant::String(Some(s)) => Some(!s.is_empty() && !s.eq_ignore_ascii_case("false")),
            Variant::Utf16String(Some(units)) => {
                let s = String::from_utf16_lossy(units);
                Some(!s.is_empty() && !s.eq_ignore_ascii_case("false"))
            }
            Variant::Slot(slot) => Some(slot.is_some()),
            Variant::Scriptable(obj) | Variant::ConstScriptable(obj) => Some(obj.is_some()),
            Variant::Json(_) | Variant::Date(_) | Variant::Any => None,
        }
    }

    /// Native-side integer coercion; doubles round half away from zero.
    pub fn convert_to_int(&self) -> Option<i64> {
        match self {
            Variant::Bool(b) => Some(i64::from(*b)),
            Variant::Int64(n) => Some(*n),
            Variant::Double(n) if n.is_finite() => Some(n.round() as i64),
            Variant::Date(d) => Some(d.millis()),
            Variant::String(Some(s)) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| trimmed.parse::<f64>().ok().filter(|n| n.is_finite()).map(|n| n.round() as i64))
            }
            _ => None,
        }
    }

    pub fn convert_to_double(&self) -> Option<f64> {
        match self {
            Variant::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Variant::Int64(n) => Some(*n as f64),
            Variant::Double(n) => Some(*n),
            Variant::String(Some(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn convert_to_string(&self) -> Option<String> {
        match self {
            Variant::Void | Variant::String(None) | Variant::Utf16String(None) => Some(String::new()),
            Variant::Bool(b) => Some(b.to_string()),
            Variant::Int64(n) => Some(n.to_string()),
            Variant::Double(n) => Some(n.to_string()),
            Variant::String(Some(s)) => Some(s.clone()),
            Variant::Utf16String(Some(units)) => Some(String::from_utf16_lossy(units)),
            Variant::Json(json) => Some(json.0.clone()),
            Variant::Date(d) => Some(d.millis().to_string()),
            Variant::Slot(_) | Variant::Scriptable(_) | Variant::ConstScriptable(_) | Variant::Any => {
                None
            }
        }
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Variant::Void, Variant::Void) | (Variant::Any, Variant::Any) => true,
            (Variant::Bool(a), Variant::Bool(b)) => a == b,
            (Variant::Int64(a), Variant::Int64(b)) => a == b,
            (Variant::Double(a), Variant::Double(b)) => a == b,
            (Variant::String(a), Variant::String(b)) => a == b,
            (Variant::Utf16String(a), Variant::Utf16String(b)) => a == b,
            (Variant::Json(a), Variant::Json(b)) => a == b,
            (Variant::Date(a), Variant::Date(b)) => a == b,
            (Variant::Slot(a), Variant::Slot(b)) => match (a, b) {
                (Some(a), Some(b)) => a.same_as(b.as_ref()),
                (None, None) => true,
                _ => false,
            },
            (Variant::Scriptable(a), Variant::Scriptable(b))
            | (Variant::ConstScriptable(a), Variant::ConstScriptable(b)) => same_object(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Void => write!(f, "Void"),
            Variant::Bool(b) => write!(f, "Bool({})", b),
            Variant::Int64(n) => write!(f, "Int64({})", n),
            Variant::Double(n) => write!(f, "Double({})", n),
            Variant::String(s) => write!(f, "String({:?})", s),
            Variant::Utf16String(Some(units)) => {
                write!(f, "Utf16String({:?})", String::from_utf16_lossy(units))
            }
            Variant::Utf16String(None) => write!(f, "Utf16String(None)"),
            Variant::Json(json) => write!(f, "Json({})", json.0),
            Variant::Date(d) => write!(f, "Date({})", d.0),
            Variant::Slot(slot) => write!(f, "Slot({})", if slot.is_some() { "..." } else { "null" }),
            Variant::Scriptable(obj) => match obj {
                Some(obj) => write!(f, "Scriptable({:#x})", obj.class_id().0),
                None => write!(f, "Scriptable(null)"),
            },
            Variant::ConstScriptable(obj) => match obj {
                Some(obj) => write!(f, "ConstScriptable({:#x})", obj.class_id().0),
                None => write!(f, "ConstScriptable(null)"),
            },
            Variant::Any => write!(f, "Any"),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.convert_to_string() {
            Some(s) => write!(f, "{}", s),
            None => write!(f, "[{}]", self.variant_type()),
        }
    }
}

impl From<bool> for Variant {
    fn from(value: bool) -> Self {
        Variant::Bool(value)
    }
}

impl From<i64> for Variant {
    fn from(value: i64) -> Self {
        Variant::Int64(value)
    }
}

impl From<i32> for Variant {
    fn from(value: i32) -> Self {
        Variant::Int64(i64::from(value))
    }
}

impl From<u32> for Variant {
    fn from(value: u32) -> Self {
        Variant::Int64(i64::from(value))
    }
}

impl From<f64> for Variant {
    fn from(value: f64) -> Self {
        Variant::Double(value)
    }
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Variant::String(Some(value.to_string()))
    }
}

impl From<String> for Variant {
    fn from(value: String) -> Self {
        Variant::String(Some(value))
    }
}

impl From<Date> for Variant {
    fn from(value: Date) -> Self {
        Variant::Date(value)
    }
}

impl From<JsonString> for Variant {
    fn from(value: JsonString) -> Self {
        Variant::Json(value)
    }
}

impl From<SlotRef> for Variant {
    fn from(value: SlotRef) -> Self {
        Variant::Slot(Some(value))
    }
}

impl From<ScriptableRef> for Variant {
    fn from(value: ScriptableRef) -> Self {
        Variant::Scriptable(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prototype_matches_kind() {
        let kinds = [
            VariantType::Void,
            VariantType::Bool,
            VariantType::Int64,
            VariantType::Double,
            VariantType::String,
            VariantType::Utf16String,
            VariantType::Json,
            VariantType::Date,
            VariantType::Slot,
            VariantType::Scriptable,
            VariantType::ConstScriptable,
            VariantType::Variant,
        ];
        for kind in kinds {
            assert_eq!(Variant::prototype(kind).variant_type(), kind);
        }
    }

    #[test]
    fn test_null_string_differs_from_empty() {
        assert_ne!(Variant::null_string(), Variant::string(""));
        assert_eq!(Variant::null_string().as_str(), None);
        assert_eq!(Variant::string("").as_str(), Some(""));
    }

    #[test]
    fn test_bool_coercion_of_strings() {
        assert_eq!(Variant::string("FALSE").convert_to_bool(), Some(false));
        assert_eq!(Variant::string("").convert_to_bool(), Some(false));
        assert_eq!(Variant::string("0").convert_to_bool(), Some(true));
        assert_eq!(Variant::Double(f64::NAN).convert_to_bool(), Some(false));
    }

    #[test]
    fn test_int_coercion_rounds_half_away_from_zero() {
        assert_eq!(Variant::Double(2.5).convert_to_int(), Some(3));
        assert_eq!(Variant::Double(-2.5).convert_to_int(), Some(-3));
        assert_eq!(Variant::string(" 42 ").convert_to_int(), Some(42));
        assert_eq!(Variant::string("abc").convert_to_int(), None);
        assert_eq!(Variant::Double(f64::NAN).convert_to_int(), None);
    }

    #[test]
    fn test_nan_doubles_are_not_equal() {
        assert_ne!(Variant::Double(f64::NAN), Variant::Double(f64::NAN));
        assert_eq!(Variant::Double(1.5), Variant::Double(1.5));
    }

    #[test]
    fn test_date_display_uses_rfc3339() {
        let date = Date::from_millis(0);
        assert_eq!(date.to_string(), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_json_payload_parses() {
        let json = JsonString::new(r#"{"a":[1,2]}"#);
        let value = json.parse().unwrap();
        assert_eq!(value["a"][1], 2);
        assert_eq!(JsonString::from_value(&value), json);
    }

    #[test]
    fn test_display_of_reference_kinds() {
        assert_eq!(Variant::Slot(None).to_string(), "[slot]");
        assert_eq!(Variant::Int64(7).to_string(), "7");
        assert_eq!(Variant::utf16("hi").to_string(), "hi");
    }
}
