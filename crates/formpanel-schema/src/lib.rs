//! `formpanel-schema` - Declarative model for dynamic CMS forms.
//!
//! This crate holds everything about a form that is pure data:
//!
//! - **Schema**: fields, composites, repeaters, fieldset/tab groups and
//!   field-checker declarations, read from JSON or XML
//! - **Values payload**: values, invalid raw values, repeater sizes and
//!   comments applied after a form is built
//! - **Disable conditions**: boolean trees over other field values
//! - **Paths**: resolution of relative (`../sibling`) and absolute
//!   (`/field`) references into flat field names
//!
//! # Example
//!
//! ```ignore
//! use formpanel_schema::{json, Schema};
//!
//! let schema: Schema = json::parse_schema(r#"{"title": {"type": "string", "label": "Title"}}"#)?;
//! assert_eq!(schema.body.elements.len(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

pub mod condition;
pub mod error;
pub mod json;
pub mod model;
pub mod path;
pub mod values;
pub mod xml;

pub use condition::{Condition, ConditionGroup, GroupKind, Operator};
pub use error::SchemaError;
pub use model::{
    Body, CheckerDecl, CompositeDecl, EnumEntry, FieldDecl, GroupDecl, GroupRole, RepeaterDecl,
    Schema, SchemaElement, Validation,
};
pub use path::PathResolver;
pub use serde_json::Value;
pub use values::{CommentEntry, RepeaterSize, ValuesPayload};
