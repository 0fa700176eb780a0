//! Widget registry.
//!
//! A widget turns incoming values into the canonical value of its type and
//! gives the readable text used by patterns, disable conditions and repeater
//! headers. The registry maps a type tag (or a named widget) to a factory
//! and is resolved once per field while the schema is interpreted.

#![allow(missing_docs)]

use std::fmt;

use formpanel_schema::condition::scalar_text;
use formpanel_schema::{FieldDecl, Value};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::FormError;

/// Type-specific behavior of a field.
pub trait Widget: fmt::Debug {
    /// Tag the widget was registered under.
    fn type_tag(&self) -> &str;

    /// Converts one incoming value; `Err` carries the user-facing reason.
    fn coerce(&self, value: &Value) -> Result<Value, String>;

    /// Text form of a value.
    fn readable(&self, value: &Value) -> String {
        scalar_text(value)
    }

    /// `true` when the value counts as "nothing entered".
    fn is_empty(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(text) => text.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }
}

/// Builds a widget for one field declaration.
pub type WidgetFactory = Box<dyn Fn(&FieldDecl) -> Box<dyn Widget> + Send + Sync>;

/// Type tag to factory table.
pub struct WidgetRegistry {
    factories: FxHashMap<SmolStr, WidgetFactory>,
}

impl fmt::Debug for WidgetRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.factories.keys().collect();
        tags.sort();
        f.debug_struct("WidgetRegistry").field("tags", &tags).finish()
    }
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for tag in ["string", "password", "rich-text", "text"] {
            registry.register(tag, move |_| Box::new(TextWidget { tag }));
        }
        registry.register("long", |_| Box::new(LongWidget));
        registry.register("double", |_| Box::new(DoubleWidget));
        registry.register("boolean", |_| Box::new(BooleanWidget));
        registry.register("date", |_| Box::new(DateWidget));
        registry.register("datetime", |_| Box::new(DateTimeWidget));
        registry
    }
}

impl WidgetRegistry {
    /// Registry without any factory.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// Registers or replaces the factory of `tag`.
    pub fn register<F>(&mut self, tag: &str, factory: F)
    where
        F: Fn(&FieldDecl) -> Box<dyn Widget> + Send + Sync + 'static,
    {
        self.factories
            .insert(SmolStr::new(tag.to_ascii_lowercase()), Box::new(factory));
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag.to_ascii_lowercase().as_str())
    }

    /// Creates the widget of a field; a named widget wins over the type.
    pub fn create(&self, decl: &FieldDecl) -> Result<Box<dyn Widget>, FormError> {
        let tag = decl
            .widget
            .as_ref()
            .filter(|widget| self.contains(widget))
            .unwrap_or(&decl.ty)
            .to_ascii_lowercase();
        let factory = self
            .factories
            .get(tag.as_str())
            .ok_or_else(|| FormError::UnknownWidget(SmolStr::new(&tag)))?;
        Ok(factory(decl))
    }
}

#[derive(Debug)]
struct TextWidget {
    tag: &'static str,
}

impl Widget for TextWidget {
    fn type_tag(&self) -> &str {
        self.tag
    }

    fn coerce(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::Null | Value::String(_) => Ok(value.clone()),
            Value::Bool(_) | Value::Number(_) => Ok(Value::String(scalar_text(value))),
            _ => Err("A text value is expected".to_string()),
        }
    }
}

#[derive(Debug)]
struct LongWidget;

impl Widget for LongWidget {
    fn type_tag(&self) -> &str {
        "long"
    }

    fn coerce(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Number(number) if number.is_i64() => Ok(value.clone()),
            Value::String(text) if text.trim().is_empty() => Ok(Value::Null),
            Value::String(text) => text
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("'{text}' is not a valid integer")),
            other => Err(format!("'{}' is not a valid integer", scalar_text(other))),
        }
    }
}

#[derive(Debug)]
struct DoubleWidget;

impl Widget for DoubleWidget {
    fn type_tag(&self) -> &str {
        "double"
    }

    fn coerce(&self, value: &Value) -> Result<Value, String> {
        let parsed = match value {
            Value::Null => return Ok(Value::Null),
            Value::Number(number) => number.as_f64(),
            Value::String(text) if text.trim().is_empty() => return Ok(Value::Null),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("'{}' is not a valid number", scalar_text(value)))
    }
}

#[derive(Debug)]
struct BooleanWidget;

impl Widget for BooleanWidget {
    fn type_tag(&self) -> &str {
        "boolean"
    }

    fn coerce(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::Null | Value::Bool(_) => Ok(value.clone()),
            Value::String(text) => match text.trim() {
                "" => Ok(Value::Null),
                "true" | "on" => Ok(Value::Bool(true)),
                "false" | "off" => Ok(Value::Bool(false)),
                other => Err(format!("'{other}' is not a boolean")),
            },
            other => Err(format!("'{}' is not a boolean", scalar_text(other))),
        }
    }
}

#[derive(Debug)]
struct DateWidget;

impl Widget for DateWidget {
    fn type_tag(&self) -> &str {
        "date"
    }

    fn coerce(&self, value: &Value) -> Result<Value, String> {
        let format = format_description!("[year]-[month]-[day]");
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(text) if text.trim().is_empty() => Ok(Value::Null),
            Value::String(text) => Date::parse(text.trim(), format)
                .map(|_| Value::String(text.trim().to_string()))
                .map_err(|_| format!("'{text}' is not a valid date (YYYY-MM-DD)")),
            other => Err(format!("'{}' is not a valid date", scalar_text(other))),
        }
    }
}

#[derive(Debug)]
struct DateTimeWidget;

impl Widget for DateTimeWidget {
    fn type_tag(&self) -> &str {
        "datetime"
    }

    fn coerce(&self, value: &Value) -> Result<Value, String> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(text) if text.trim().is_empty() => Ok(Value::Null),
            Value::String(text) => OffsetDateTime::parse(text.trim(), &Rfc3339)
                .map(|_| Value::String(text.trim().to_string()))
                .map_err(|_| format!("'{text}' is not a valid date and time")),
            other => Err(format!("'{}' is not a valid date and time", scalar_text(other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn widget(ty: &str) -> Box<dyn Widget> {
        WidgetRegistry::default()
            .create(&FieldDecl::new("f", ty))
            .unwrap()
    }

    #[test]
    fn unknown_type_is_an_error() {
        let err = WidgetRegistry::default()
            .create(&FieldDecl::new("f", "geo"))
            .unwrap_err();
        assert_eq!(err, FormError::UnknownWidget("geo".into()));
    }

    #[test]
    fn named_widget_overrides_type_when_registered() {
        let mut registry = WidgetRegistry::default();
        registry.register("edition.textarea", |_| Box::new(TextWidget { tag: "textarea" }));
        let mut decl = FieldDecl::new("f", "string");
        decl.widget = Some("edition.textarea".into());
        assert_eq!(registry.create(&decl).unwrap().type_tag(), "textarea");
        decl.widget = Some("missing".into());
        assert_eq!(registry.create(&decl).unwrap().type_tag(), "string");
    }

    #[test]
    fn numbers_are_parsed_from_text() {
        assert_eq!(widget("long").coerce(&json!(" 42 ")), Ok(json!(42)));
        assert!(widget("long").coerce(&json!("4.2")).is_err());
        assert_eq!(widget("double").coerce(&json!("4.5")), Ok(json!(4.5)));
        assert_eq!(widget("long").coerce(&json!("")), Ok(Value::Null));
    }

    #[test]
    fn dates_are_checked() {
        assert_eq!(
            widget("date").coerce(&json!("2024-02-29")),
            Ok(json!("2024-02-29"))
        );
        assert!(widget("date").coerce(&json!("2023-02-29")).is_err());
        assert!(widget("datetime")
            .coerce(&json!("2024-05-01T10:00:00Z"))
            .is_ok());
    }

    #[test]
    fn booleans_accept_text() {
        assert_eq!(widget("boolean").coerce(&json!("true")), Ok(json!(true)));
        assert!(widget("boolean").coerce(&json!("yes")).is_err());
    }
}
