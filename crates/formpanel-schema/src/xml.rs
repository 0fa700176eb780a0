//! XML schema reader.
//!
//! The XML shape mirrors the JSON one: the root element holds one child per
//! declared element, named after it, whose own children (`<type>`,
//! `<label>`, `<validation>`, ...) carry the declaration. Groups use the
//! reserved `<fieldsets role="tab|fieldset">` tag and repeaters wrap their
//! composition in `<repeater min-size=".." max-size=".." initial-size="..">`.

use roxmltree::Node;
use smol_str::SmolStr;

use crate::condition::ConditionGroup;
use crate::error::SchemaError;
use crate::json::{linked_fields, CHECKER_KEY, COMPOSITE_TYPE, FIELDSETS_KEY};
use crate::model::{
    Body, CheckerDecl, CompositeDecl, EnumEntry, FieldDecl, GroupDecl, GroupRole, RepeaterDecl,
    Schema, SchemaElement, Validation,
};
use crate::Value;

/// Parses an XML schema document.
pub fn parse_schema(text: &str) -> Result<Schema, SchemaError> {
    let document = roxmltree::Document::parse(text)?;
    Ok(Schema {
        body: read_body(document.root_element(), "")?,
    })
}

fn read_body(container: Node<'_, '_>, path: &str) -> Result<Body, SchemaError> {
    let mut body = Body::default();
    for node in container.children().filter(Node::is_element) {
        let name = node.tag_name().name();
        if name == CHECKER_KEY {
            body.checkers.push(read_checker(node, path)?);
            continue;
        }
        if is_text_only(node) {
            continue;
        }
        let ty = child_text(node, "type").unwrap_or_default().to_ascii_lowercase();
        if ty.is_empty() {
            if name == FIELDSETS_KEY {
                body.elements.push(SchemaElement::Group(read_group(node, path)?));
            }
            continue;
        }
        let element_path = join(path, name);
        let element = if ty == COMPOSITE_TYPE {
            match child(node, "repeater") {
                Some(repeater) => {
                    SchemaElement::Repeater(read_repeater(node, repeater, &element_path)?)
                }
                None => SchemaElement::Composite(read_composite(node, &element_path)?),
            }
        } else {
            SchemaElement::Field(read_field(node, ty, &element_path)?)
        };
        body.elements.push(element);
    }
    Ok(body)
}

fn read_group(node: Node<'_, '_>, path: &str) -> Result<GroupDecl, SchemaError> {
    Ok(GroupDecl {
        role: GroupRole::parse(node.attribute("role"))?,
        label: child_text(node, "label").unwrap_or_default(),
        switcher: switcher(node),
        body: read_body(node, path)?,
    })
}

fn read_composite(node: Node<'_, '_>, path: &str) -> Result<CompositeDecl, SchemaError> {
    let name = node.tag_name().name();
    let mut body = match child(node, "composition") {
        Some(composition) => read_body(composition, path)?,
        None => Body::default(),
    };
    body.checkers.extend(read_checkers(node, path)?);
    Ok(CompositeDecl {
        name: name.into(),
        label: child_text(node, "label").unwrap_or_else(|| name.to_string()),
        description: child_text(node, "description").unwrap_or_default(),
        switcher: switcher(node),
        body,
    })
}

fn read_repeater(
    node: Node<'_, '_>,
    repeater: Node<'_, '_>,
    path: &str,
) -> Result<RepeaterDecl, SchemaError> {
    let name = node.tag_name().name();
    let min_size = size_attribute(repeater, "min-size", path)?.unwrap_or(0);
    let max_size = size_attribute(repeater, "max-size", path)?;
    if let Some(max) = max_size {
        if min_size > max {
            return Err(SchemaError::InvalidRepeaterBounds {
                name: name.into(),
                min: min_size,
                max,
            });
        }
    }
    let mut body = match child(repeater, "composition") {
        Some(composition) => read_body(composition, path)?,
        None => Body::default(),
    };
    body.checkers.extend(read_checkers(repeater, path)?);
    Ok(RepeaterDecl {
        name: name.into(),
        label: child_text(node, "label").unwrap_or_else(|| name.to_string()),
        description: child_text(node, "description").unwrap_or_default(),
        min_size,
        max_size,
        initial_size: size_attribute(repeater, "initial-size", path)?.unwrap_or(0),
        add_label: child_text(repeater, "add-label").unwrap_or_default(),
        del_label: child_text(repeater, "del-label").unwrap_or_default(),
        header_label: child_text(repeater, "header-label"),
        body,
    })
}

fn read_field(node: Node<'_, '_>, ty: String, path: &str) -> Result<FieldDecl, SchemaError> {
    let name = node.tag_name().name();
    let mut field = FieldDecl::new(name, ty);
    field.label = child_text(node, "label").unwrap_or_else(|| name.to_string());
    field.description = child_text(node, "description").unwrap_or_default();
    if let Some(validation) = child(node, "validation") {
        field.validation = Validation {
            mandatory: child_flag(validation, "mandatory"),
            regexp: child_text(validation, "regexp"),
            invalid_text: child_text(validation, "invalidText"),
            regex_text: child_text(validation, "regexText"),
        };
    }
    field.default_value = child_text(node, "default-value").map(Value::String);
    field.multiple = child_flag(node, "multiple");
    field.widget = child_text(node, "widget").map(SmolStr::new);
    if let Some(params) = child(node, "widget-params") {
        field.widget_params = params
            .children()
            .filter(Node::is_element)
            .map(|param| {
                (
                    SmolStr::new(param.tag_name().name()),
                    extract_text_content(param).unwrap_or_default(),
                )
            })
            .collect();
    }
    field.hidden = child_flag(node, "hidden");
    field.read_only = child_flag(node, "can-not-write");
    if let Some(enumeration) = child(node, "enumeration") {
        field.enumeration = enumeration
            .children()
            .filter(Node::is_element)
            .map(|entry| {
                let label = extract_text_content(entry).unwrap_or_default();
                let value = entry
                    .attribute("value")
                    .map_or_else(|| label.clone(), str::to_string);
                EnumEntry {
                    value: Value::String(value),
                    label,
                }
            })
            .collect();
    }
    field.disable_condition = child_text(node, "disable-conditions")
        .map(|raw| ConditionGroup::from_json_str(&raw))
        .transpose()?;
    field.checkers = read_checkers(node, path)?;
    Ok(field)
}

fn read_checkers(node: Node<'_, '_>, path: &str) -> Result<Vec<CheckerDecl>, SchemaError> {
    node.children()
        .filter(|entry| is_element_named(*entry, CHECKER_KEY))
        .map(|entry| read_checker(entry, path))
        .collect()
}

fn read_checker(node: Node<'_, '_>, path: &str) -> Result<CheckerDecl, SchemaError> {
    let id = child_text(node, "id")
        .or_else(|| node.attribute("id").map(str::to_string))
        .ok_or_else(|| SchemaError::MissingCheckerId(path.into()))?;
    let linked = child_text(node, "linked-fields").map(Value::String);
    Ok(CheckerDecl {
        id: id.into(),
        label: child_text(node, "label").unwrap_or_default(),
        description: child_text(node, "description").unwrap_or_default(),
        linked_fields: linked_fields(linked.as_ref(), path)?,
        order: child_text(node, "order").and_then(|order| order.parse().ok()),
        icon_glyph: child_text(node, "icon-glyph"),
        icon_decorator: child_text(node, "icon-decorator"),
        small_icon_path: child_text(node, "small-icon-path"),
        medium_icon_path: child_text(node, "medium-icon-path"),
        large_icon_path: child_text(node, "large-icon-path"),
    })
}

fn switcher(node: Node<'_, '_>) -> Option<SmolStr> {
    node.attribute("switcher")
        .map(str::to_string)
        .or_else(|| child_text(node, "switcher"))
        .map(SmolStr::new)
}

fn size_attribute(node: Node<'_, '_>, name: &str, path: &str) -> Result<Option<usize>, SchemaError> {
    let Some(raw) = node.attribute(name) else {
        return Ok(None);
    };
    match raw.trim().parse::<i64>() {
        Ok(value) if value < 0 => Ok(None),
        Ok(value) => usize::try_from(value)
            .map(Some)
            .map_err(|_| SchemaError::invalid(path, format!("'{name}' out of range"))),
        Err(_) => Err(SchemaError::invalid(
            path,
            format!("'{name}' is not a number: '{raw}'"),
        )),
    }
}

/// A node whose single child is text, such as a group `<label>`.
fn is_text_only(node: Node<'_, '_>) -> bool {
    let mut children = node.children();
    matches!((children.next(), children.next()), (Some(only), None) if !only.is_element())
}

pub(crate) fn is_element_named(node: Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|entry| is_element_named(*entry, name))
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    child(node, name).and_then(extract_text_content)
}

fn child_flag(node: Node<'_, '_>, name: &str) -> bool {
    child_text(node, name).is_some_and(|text| text == "true")
}

pub(crate) fn extract_text_content(node: Node<'_, '_>) -> Option<String> {
    let text = node
        .descendants()
        .filter(|entry| entry.is_text())
        .filter_map(|entry| entry.text())
        .collect::<String>();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}
