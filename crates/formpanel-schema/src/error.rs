//! Errors raised while reading schemas and payloads.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Schema and payload errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Input is not well-formed JSON.
    #[error("invalid JSON: {0}")]
    Json(SmolStr),

    /// Input is not well-formed XML.
    #[error("invalid XML: {0}")]
    Xml(SmolStr),

    /// A node has the wrong shape for its position.
    #[error("invalid schema at '{path}': {message}")]
    InvalidNode { path: SmolStr, message: SmolStr },

    /// A field declares no `type`.
    #[error("field '{0}' has no type")]
    MissingType(SmolStr),

    /// A repeater declares `min-size` above `max-size`.
    #[error("repeater '{name}' has min-size {min} above max-size {max}")]
    InvalidRepeaterBounds { name: SmolStr, min: usize, max: usize },

    /// Unknown comparison operator in a disable condition.
    #[error("unknown disable-condition operator '{0}'")]
    UnknownOperator(SmolStr),

    /// Unknown group type in a disable condition.
    #[error("unknown disable-condition type '{0}'")]
    UnknownConditionType(SmolStr),

    /// Unknown group role in a `fieldsets` declaration.
    #[error("unknown fieldset role '{0}'")]
    UnknownRole(SmolStr),

    /// A field checker declares no id.
    #[error("field checker without id at '{0}'")]
    MissingCheckerId(SmolStr),
}

impl SchemaError {
    pub(crate) fn invalid(path: impl Into<SmolStr>, message: impl Into<SmolStr>) -> Self {
        Self::InvalidNode {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string().into())
    }
}

impl From<roxmltree::Error> for SchemaError {
    fn from(err: roxmltree::Error) -> Self {
        Self::Xml(err.to_string().into())
    }
}
