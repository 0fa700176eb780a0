//! Values and comments payload applied to a built form.
//!
//! Both shapes produce the same [`ValuesPayload`]: flat field names
//! (relative to the form root), repeater sizes, raw values that are known to
//! be invalid, and per-field comments.

#![allow(missing_docs)]

use indexmap::IndexMap;
use roxmltree::Node;
use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::SchemaError;
use crate::xml::{child, extract_text_content, is_element_named};
use crate::Value;

/// Size of one repeater instance, addressed by its flat name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeaterSize {
    pub path: SmolStr,
    pub count: usize,
}

/// One comment attached to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommentEntry {
    #[serde(default)]
    pub id: Option<SmolStr>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub date: String,
}

/// Decoded values payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValuesPayload {
    pub values: IndexMap<SmolStr, Value>,
    /// Raw input the server rejected; applied and then validated.
    pub invalid: IndexMap<SmolStr, String>,
    /// Sizes in document order; outer repeaters come first.
    pub repeaters: Vec<RepeaterSize>,
    pub comments: IndexMap<SmolStr, Vec<CommentEntry>>,
}

#[derive(Debug, Deserialize)]
struct PayloadJson {
    #[serde(default)]
    values: IndexMap<String, Value>,
    #[serde(default)]
    invalid: IndexMap<String, Value>,
    #[serde(default)]
    repeaters: Vec<RepeaterJson>,
    #[serde(default)]
    comments: IndexMap<String, Vec<CommentEntry>>,
}

#[derive(Debug, Deserialize)]
struct RepeaterJson {
    name: String,
    #[serde(default)]
    prefix: String,
    count: usize,
}

impl ValuesPayload {
    /// Parses the JSON payload shape.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let raw: PayloadJson = serde_json::from_str(text)?;
        Ok(Self {
            values: raw
                .values
                .into_iter()
                .map(|(name, value)| (SmolStr::new(name), decode_value(value)))
                .collect(),
            invalid: raw
                .invalid
                .into_iter()
                .map(|(name, value)| (SmolStr::new(name), crate::condition::scalar_text(&value)))
                .collect(),
            repeaters: raw
                .repeaters
                .into_iter()
                .map(|rep| RepeaterSize {
                    path: SmolStr::new(format!("{}{}", rep.prefix, rep.name)),
                    count: rep.count,
                })
                .collect(),
            comments: raw
                .comments
                .into_iter()
                .map(|(name, comments)| (SmolStr::new(name), comments))
                .collect(),
        })
    }

    /// Parses the XML payload shape; `separator` builds flat names.
    pub fn from_xml(text: &str, separator: &str) -> Result<Self, SchemaError> {
        let document = roxmltree::Document::parse(text)?;
        let root = document.root_element();
        let mut payload = Self::default();
        let metadata = child(root, "metadata").unwrap_or(root);
        read_level(metadata, "", separator, &mut payload)?;
        if let Some(comments) = child(root, "comments") {
            read_comments(comments, separator, &mut payload);
        }
        Ok(payload)
    }

    /// Returns `true` when the payload carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
            && self.invalid.is_empty()
            && self.repeaters.is_empty()
            && self.comments.is_empty()
    }
}

/// Strings holding a JSON array or object are decoded; anything else is kept.
#[must_use]
pub fn decode_value(value: Value) -> Value {
    if let Value::String(text) = &value {
        let trimmed = text.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            if let Ok(decoded @ (Value::Array(_) | Value::Object(_))) =
                serde_json::from_str::<Value>(text)
            {
                return decoded;
            }
        }
    }
    value
}

fn read_level(
    node: Node<'_, '_>,
    prefix: &str,
    separator: &str,
    payload: &mut ValuesPayload,
) -> Result<(), SchemaError> {
    let mut leaves: IndexMap<SmolStr, Vec<Value>> = IndexMap::new();
    for entry in node.children().filter(Node::is_element) {
        let name = entry.tag_name().name();
        if let Some(count) = entry.attribute("entryCount") {
            let path = format!("{prefix}{name}");
            let count = count.trim().parse().map_err(|_| {
                SchemaError::invalid(path.as_str(), format!("invalid entryCount '{count}'"))
            })?;
            payload.repeaters.push(RepeaterSize {
                path: SmolStr::new(&path),
                count,
            });
            for item in entry.children().filter(|item| is_element_named(*item, "entry")) {
                let Some(position) = item.attribute("name") else {
                    continue;
                };
                let entry_prefix = format!("{path}{separator}{}{separator}", position.trim());
                read_level(item, &entry_prefix, separator, payload)?;
            }
        } else if entry.children().any(|sub| sub.is_element()) {
            read_level(entry, &format!("{prefix}{name}{separator}"), separator, payload)?;
        } else {
            leaves
                .entry(SmolStr::new(format!("{prefix}{name}")))
                .or_default()
                .push(leaf_value(entry));
        }
    }
    for (name, mut values) in leaves {
        let value = if values.len() == 1 {
            values.pop().unwrap_or(Value::Null)
        } else {
            Value::Array(values)
        };
        payload.values.insert(name, value);
    }
    Ok(())
}

fn leaf_value(node: Node<'_, '_>) -> Value {
    let text = node
        .attribute("value")
        .map(str::to_string)
        .or_else(|| extract_text_content(node))
        .unwrap_or_default();
    if node.attribute("json") == Some("true") {
        return serde_json::from_str(&text).unwrap_or(Value::String(text));
    }
    Value::String(text)
}

fn read_comments(node: Node<'_, '_>, separator: &str, payload: &mut ValuesPayload) {
    for metadata in node.children().filter(|n| is_element_named(*n, "metadata")) {
        let Some(path) = metadata.attribute("path") else {
            continue;
        };
        let name = path
            .split('/')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(separator);
        let comments = metadata
            .children()
            .filter(|n| is_element_named(*n, "comment"))
            .map(|comment| CommentEntry {
                id: comment.attribute("id").map(SmolStr::new),
                text: extract_text_content(comment).unwrap_or_default(),
                author: comment.attribute("author").unwrap_or_default().to_string(),
                date: comment.attribute("date").unwrap_or_default().to_string(),
            })
            .collect::<Vec<_>>();
        payload
            .comments
            .entry(SmolStr::new(name))
            .or_default()
            .extend(comments);
    }
}
