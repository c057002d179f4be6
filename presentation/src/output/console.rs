//! Console output formatter for script results

use crate::output::formatter::OutputFormatter;
use bridge_domain::{
    ScriptableArray, ScriptableBinaryData, ScriptableFunction, ScriptableObject, ScriptableRef,
    Variant, downcast,
};
use colored::{ColoredString, Colorize};

/// Formats values for console display
pub struct ConsoleFormatter {
    color: bool,
}

impl ConsoleFormatter {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn null(&self) -> String {
        self.paint("null", |s| s.dimmed())
    }

    /// Nested values quote their strings; the top-level value does not.
    fn render(&self, value: &Variant, nested: bool) -> String {
        match value {
            Variant::Void | Variant::Any => String::new(),
            Variant::Bool(b) => self.paint(&b.to_string(), |s| s.cyan()),
            Variant::Int64(n) => self.paint(&n.to_string(), |s| s.yellow()),
            Variant::Double(n) => self.paint(&format!("{:?}", n), |s| s.yellow()),
            Variant::String(Some(s)) => self.text(s, nested),
            Variant::Utf16String(Some(units)) => self.text(&String::from_utf16_lossy(units), nested),
            Variant::String(None)
            | Variant::Utf16String(None)
            | Variant::Slot(None)
            | Variant::Scriptable(None)
            | Variant::ConstScriptable(None) => self.null(),
            Variant::Json(json) => match json.parse() {
                Ok(parsed) => serde_json::to_string_pretty(&parsed).unwrap_or_else(|_| json.as_str().to_string()),
                Err(_) => json.as_str().to_string(),
            },
            Variant::Date(date) => self.paint(&date.to_string(), |s| s.magenta()),
            Variant::Slot(Some(_)) => self.paint("<function>", |s| s.blue()),
            Variant::Scriptable(Some(object)) | Variant::ConstScriptable(Some(object)) => self.object(object),
        }
    }

    fn text(&self, text: &str, nested: bool) -> String {
        if nested {
            self.paint(&format!("{:?}", text), |s| s.green())
        } else {
            text.to_string()
        }
    }

    fn object(&self, object: &ScriptableRef) -> String {
        if let Some(array) = downcast::<ScriptableArray>(object) {
            let items: Vec<String> = array
                .items()
                .iter()
                .map(|item| match item {
                    Variant::Void => self.null(),
                    other => self.render(other, true),
                })
                .collect();
            return format!("[{}]", items.join(", "));
        }
        if let Some(data) = downcast::<ScriptableBinaryData>(object) {
            return self.paint(&format!("<binary data, {} bytes>", data.len()), |s| s.blue());
        }
        if downcast::<ScriptableFunction>(object).is_some() {
            return self.paint("<function>", |s| s.blue());
        }
        self.paint(&format!("<object {}>", object.class_id()), |s| s.blue())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, value: &Variant) -> String {
        self.render(value, false)
    }

    fn format_error(&self, message: &str) -> String {
        format!("{} {}", self.paint("Error:", |s| s.red().bold()), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_domain::{Date, JsonString, NativeSlot};

    fn plain() -> ConsoleFormatter {
        ConsoleFormatter::new(false)
    }

    #[test]
    fn test_scalars() {
        let f = plain();
        assert_eq!(f.format(&Variant::Void), "");
        assert_eq!(f.format(&Variant::Bool(true)), "true");
        assert_eq!(f.format(&Variant::Int64(-3)), "-3");
        assert_eq!(f.format(&Variant::Double(2.0)), "2.0");
        assert_eq!(f.format(&Variant::string("hi")), "hi");
        assert_eq!(f.format(&Variant::null_string()), "null");
    }

    #[test]
    fn test_date_and_json() {
        let f = plain();
        assert_eq!(
            f.format(&Variant::Date(Date::from_millis(0))),
            "1970-01-01T00:00:00+00:00"
        );
        assert_eq!(
            f.format(&Variant::Json(JsonString::new("[1,2]"))),
            "[\n  1,\n  2\n]"
        );
    }

    #[test]
    fn test_array_quotes_nested_strings() {
        let f = plain();
        let array = ScriptableArray::new(vec![
            Variant::Int64(1),
            Variant::string("a"),
            Variant::Void,
        ]);
        assert_eq!(f.format(&Variant::object(array)), "[1, \"a\", null]");
    }

    #[test]
    fn test_objects_and_slots() {
        let f = plain();
        let slot = NativeSlot::untyped(|_| Ok(Variant::Void)).into_ref();
        assert_eq!(f.format(&Variant::slot(slot)), "<function>");
        let data = ScriptableBinaryData::new(vec![1u8, 2, 3]);
        assert_eq!(f.format(&Variant::object(data)), "<binary data, 3 bytes>");
    }

    #[test]
    fn test_error() {
        assert_eq!(plain().format_error("boom"), "Error: boom");
    }
}
