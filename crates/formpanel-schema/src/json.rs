//! JSON schema reader.
//!
//! A JSON schema is an object mapping element names to declarations, in
//! declaration order. Two keys are reserved at every level: `fieldsets`
//! (an array of fieldset/tab groups) and `field-checker` (checkers located
//! on the container owning the level).

use serde_json::Map;
use smol_str::SmolStr;

use crate::condition::{scalar_text, ConditionGroup};
use crate::error::SchemaError;
use crate::model::{
    Body, CheckerDecl, CompositeDecl, EnumEntry, FieldDecl, GroupDecl, GroupRole, RepeaterDecl,
    Schema, SchemaElement, Validation,
};
use crate::Value;

/// Reserved key holding fieldset and tab groups.
pub const FIELDSETS_KEY: &str = "fieldsets";
/// Reserved key holding checker declarations.
pub const CHECKER_KEY: &str = "field-checker";
/// Type tag of composites and repeaters.
pub const COMPOSITE_TYPE: &str = "composite";

/// Parses a JSON schema document.
pub fn parse_schema(text: &str) -> Result<Schema, SchemaError> {
    let value: Value = serde_json::from_str(text)?;
    schema_from_value(&value)
}

/// Reads a schema from an already decoded JSON value.
pub fn schema_from_value(value: &Value) -> Result<Schema, SchemaError> {
    let map = as_object(value, "")?;
    Ok(Schema {
        body: read_body(map, "")?,
    })
}

fn read_body(map: &Map<String, Value>, path: &str) -> Result<Body, SchemaError> {
    let mut body = Body::default();
    for (key, node) in map {
        match key.as_str() {
            FIELDSETS_KEY => {
                let groups = node
                    .as_array()
                    .ok_or_else(|| SchemaError::invalid(path, "'fieldsets' must be an array"))?;
                for group in groups {
                    body.elements
                        .push(SchemaElement::Group(read_group(group, path)?));
                }
            }
            CHECKER_KEY => body.checkers.extend(read_checkers(node, path)?),
            _ => {
                // Labels and other scalar children are not elements.
                if !node.is_object() {
                    continue;
                }
                body.elements.push(read_element(key, node, path)?);
            }
        }
    }
    Ok(body)
}

fn read_group(node: &Value, path: &str) -> Result<GroupDecl, SchemaError> {
    let map = as_object(node, path)?;
    let role = GroupRole::parse(map.get("role").and_then(Value::as_str))?;
    let mut body = match map.get("elements") {
        Some(elements) => read_body(as_object(elements, path)?, path)?,
        None => Body::default(),
    };
    if let Some(checkers) = map.get(CHECKER_KEY) {
        body.checkers.extend(read_checkers(checkers, path)?);
    }
    Ok(GroupDecl {
        role,
        label: text(map, "label").unwrap_or_default(),
        switcher: text(map, "switcher").map(SmolStr::new),
        body,
    })
}

fn read_element(name: &str, node: &Value, parent: &str) -> Result<SchemaElement, SchemaError> {
    let path = join(parent, name);
    let map = as_object(node, &path)?;
    let ty = text(map, "type").ok_or_else(|| SchemaError::MissingType(path.clone().into()))?;
    if !ty.eq_ignore_ascii_case(COMPOSITE_TYPE) {
        return read_field(name, ty, map, &path).map(SchemaElement::Field);
    }
    if let Some(repeater) = map.get("repeater") {
        return read_repeater(name, map, as_object(repeater, &path)?, &path)
            .map(SchemaElement::Repeater);
    }
    let mut body = match map.get("composition") {
        Some(composition) => read_body(as_object(composition, &path)?, &path)?,
        None => Body::default(),
    };
    if let Some(checkers) = map.get(CHECKER_KEY) {
        body.checkers.extend(read_checkers(checkers, &path)?);
    }
    Ok(SchemaElement::Composite(CompositeDecl {
        name: name.into(),
        label: text(map, "label").unwrap_or_else(|| name.to_string()),
        description: text(map, "description").unwrap_or_default(),
        switcher: text(map, "switcher").map(SmolStr::new),
        body,
    }))
}

fn read_field(
    name: &str,
    ty: String,
    map: &Map<String, Value>,
    path: &str,
) -> Result<FieldDecl, SchemaError> {
    let mut field = FieldDecl::new(name, ty);
    field.label = text(map, "label").unwrap_or_else(|| name.to_string());
    field.description = text(map, "description").unwrap_or_default();
    if let Some(Value::Object(validation)) = map.get("validation") {
        field.validation = Validation {
            mandatory: flag(validation, "mandatory"),
            regexp: text(validation, "regexp").filter(|re| !re.is_empty()),
            invalid_text: text(validation, "invalidText"),
            regex_text: text(validation, "regexText"),
        };
    }
    field.default_value = map.get("default-value").filter(|v| !v.is_null()).cloned();
    field.multiple = flag(map, "multiple");
    field.widget = text(map, "widget").filter(|w| !w.is_empty()).map(SmolStr::new);
    if let Some(Value::Object(params)) = map.get("widget-params") {
        field.widget_params = params
            .iter()
            .map(|(key, value)| (SmolStr::new(key), scalar_text(value)))
            .collect();
    }
    field.hidden = flag(map, "hidden");
    field.read_only = flag(map, "can-not-write");
    field.enumeration = read_enumeration(map.get("enumeration"), path)?;
    field.disable_condition = match map.get("disableCondition").or(map.get("disable-conditions")) {
        Some(Value::String(raw)) if !raw.trim().is_empty() => {
            Some(ConditionGroup::from_json_str(raw)?)
        }
        Some(value @ Value::Object(_)) => Some(ConditionGroup::from_json(value)?),
        _ => None,
    };
    if let Some(checkers) = map.get(CHECKER_KEY) {
        field.checkers = read_checkers(checkers, path)?;
    }
    Ok(field)
}

fn read_repeater(
    name: &str,
    outer: &Map<String, Value>,
    map: &Map<String, Value>,
    path: &str,
) -> Result<RepeaterDecl, SchemaError> {
    let min_size = size(map, "min-size", path)?.unwrap_or(0);
    let max_size = size(map, "max-size", path)?;
    if let Some(max) = max_size {
        if min_size > max {
            return Err(SchemaError::InvalidRepeaterBounds {
                name: name.into(),
                min: min_size,
                max,
            });
        }
    }
    let mut body = match map.get("composition") {
        Some(composition) => read_body(as_object(composition, path)?, path)?,
        None => Body::default(),
    };
    if let Some(checkers) = map.get(CHECKER_KEY) {
        body.checkers.extend(read_checkers(checkers, path)?);
    }
    Ok(RepeaterDecl {
        name: name.into(),
        label: text(outer, "label")
            .or_else(|| text(map, "label"))
            .unwrap_or_else(|| name.to_string()),
        description: text(outer, "description").unwrap_or_default(),
        min_size,
        max_size,
        initial_size: size(map, "initial-size", path)?.unwrap_or(0),
        add_label: text(map, "add-label").unwrap_or_default(),
        del_label: text(map, "del-label").unwrap_or_default(),
        header_label: text(map, "header-label").filter(|h| !h.is_empty()),
        body,
    })
}

fn read_enumeration(node: Option<&Value>, path: &str) -> Result<Vec<EnumEntry>, SchemaError> {
    match node {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| {
                let map = as_object(entry, path)?;
                let value = map.get("value").cloned().unwrap_or(Value::Null);
                let label = text(map, "label").unwrap_or_else(|| scalar_text(&value));
                Ok(EnumEntry { value, label })
            })
            .collect(),
        Some(Value::Object(entries)) => Ok(entries
            .iter()
            .map(|(value, label)| EnumEntry {
                value: Value::String(value.clone()),
                label: scalar_text(label),
            })
            .collect()),
        Some(_) => Err(SchemaError::invalid(path, "'enumeration' must be an array")),
    }
}

/// Reads one checker object or an array of them.
pub fn read_checkers(node: &Value, path: &str) -> Result<Vec<CheckerDecl>, SchemaError> {
    match node {
        Value::Array(items) => items.iter().map(|item| read_checker(item, path)).collect(),
        Value::Object(_) => Ok(vec![read_checker(node, path)?]),
        Value::Null => Ok(Vec::new()),
        _ => Err(SchemaError::invalid(path, "'field-checker' must be an object")),
    }
}

fn read_checker(node: &Value, path: &str) -> Result<CheckerDecl, SchemaError> {
    let map = as_object(node, path)?;
    let id = text(map, "id")
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SchemaError::MissingCheckerId(path.into()))?;
    Ok(CheckerDecl {
        id: id.into(),
        label: text(map, "label").unwrap_or_default(),
        description: text(map, "description").unwrap_or_default(),
        linked_fields: linked_fields(map.get("linked-fields"), path)?,
        order: number(map, "order"),
        icon_glyph: text(map, "icon-glyph"),
        icon_decorator: text(map, "icon-decorator"),
        small_icon_path: text(map, "small-icon-path"),
        medium_icon_path: text(map, "medium-icon-path"),
        large_icon_path: text(map, "large-icon-path"),
    })
}

/// Linked fields are an array, or JSON text encoding one.
pub(crate) fn linked_fields(node: Option<&Value>, path: &str) -> Result<Vec<SmolStr>, SchemaError> {
    let decoded;
    let items = match node {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::String(raw)) if raw.trim().is_empty() => return Ok(Vec::new()),
        Some(Value::String(raw)) => {
            decoded = serde_json::from_str::<Value>(raw)?;
            &decoded
        }
        Some(value) => value,
    };
    let items = items
        .as_array()
        .ok_or_else(|| SchemaError::invalid(path, "'linked-fields' must be an array"))?;
    Ok(items
        .iter()
        .map(|item| SmolStr::new(scalar_text(item)))
        .collect())
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| SchemaError::invalid(path, "expected an object"))
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn text(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::Null => None,
        value => Some(scalar_text(value)),
    }
}

fn flag(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(text)) => text.trim() == "true",
        _ => false,
    }
}

fn number(map: &Map<String, Value>, key: &str) -> Option<i64> {
    match map.get(key)? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn size(map: &Map<String, Value>, key: &str, path: &str) -> Result<Option<usize>, SchemaError> {
    match number(map, key) {
        None => Ok(None),
        Some(value) if value < 0 => Ok(None),
        Some(value) => usize::try_from(value)
            .map(Some)
            .map_err(|_| SchemaError::invalid(path, format!("'{key}' out of range"))),
    }
}
