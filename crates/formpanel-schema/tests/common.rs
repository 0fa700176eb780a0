//! Shared helpers for schema tests.
#![allow(dead_code, unused_imports)]

pub use formpanel_schema::{
    json, xml, Body, CheckerDecl, GroupRole, Schema, SchemaElement, SchemaError, Value,
    ValuesPayload,
};

/// Parses a JSON schema that is expected to be valid.
pub fn json_schema(source: &str) -> Schema {
    match json::parse_schema(source) {
        Ok(schema) => schema,
        Err(err) => panic!("unexpected schema error: {err}"),
    }
}

/// Parses an XML schema that is expected to be valid.
pub fn xml_schema(source: &str) -> Schema {
    match xml::parse_schema(source) {
        Ok(schema) => schema,
        Err(err) => panic!("unexpected schema error: {err}"),
    }
}

/// Renders the element tree as one indented line per element.
pub fn outline(body: &Body) -> String {
    let mut out = String::new();
    write_outline(body, 0, &mut out);
    out
}

fn write_outline(body: &Body, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for checker in &body.checkers {
        out.push_str(&format!(
            "{indent}checker {} -> {:?}\n",
            checker.id, checker.linked_fields
        ));
    }
    for element in &body.elements {
        match element {
            SchemaElement::Field(field) => {
                let marker = if field.validation.mandatory { " *" } else { "" };
                out.push_str(&format!("{indent}field {}: {}{marker}\n", field.name, field.ty));
                for checker in &field.checkers {
                    out.push_str(&format!(
                        "{indent}  checker {} -> {:?}\n",
                        checker.id, checker.linked_fields
                    ));
                }
            }
            SchemaElement::Composite(composite) => {
                out.push_str(&format!("{indent}composite {}\n", composite.name));
                write_outline(&composite.body, depth + 1, out);
            }
            SchemaElement::Repeater(repeater) => {
                out.push_str(&format!(
                    "{indent}repeater {} [{}..{:?}] initial {}\n",
                    repeater.name, repeater.min_size, repeater.max_size, repeater.initial_size
                ));
                write_outline(&repeater.body, depth + 1, out);
            }
            SchemaElement::Group(group) => {
                let role = match group.role {
                    GroupRole::Fieldset => "fieldset",
                    GroupRole::Tab => "tab",
                };
                out.push_str(&format!("{indent}{role} '{}'\n", group.label));
                write_outline(&group.body, depth + 1, out);
            }
        }
    }
}
