//! Schema tree shared by the JSON and XML readers.
//!
//! A [`Schema`] is a tree of [`SchemaElement`]s in declaration order. Field
//! checkers are attached to the [`Body`] that declared them (the schema root,
//! a group, a composite or a repeater entry template) or to a single field.

#![allow(missing_docs)]

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::condition::ConditionGroup;
use crate::Value;

/// A complete form schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    /// Top-level elements and root-located checkers.
    pub body: Body,
}

/// An ordered list of elements plus the checkers declared at that level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    /// Child elements in declaration order.
    pub elements: Vec<SchemaElement>,
    /// Checkers decorating the container owning this body.
    pub checkers: Vec<CheckerDecl>,
}

impl Body {
    /// Returns `true` when nothing was declared at this level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.checkers.is_empty()
    }
}

/// One declared schema element.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaElement {
    /// Leaf input.
    Field(FieldDecl),
    /// Named group of fields whose names get the composite name as prefix.
    Composite(CompositeDecl),
    /// Composite repeated 0..N times.
    Repeater(RepeaterDecl),
    /// Anonymous fieldset or tab (the reserved `fieldsets` key).
    Group(GroupDecl),
}

impl SchemaElement {
    /// Declared name, if the element is named.
    #[must_use]
    pub fn name(&self) -> Option<&SmolStr> {
        match self {
            Self::Field(field) => Some(&field.name),
            Self::Composite(composite) => Some(&composite.name),
            Self::Repeater(repeater) => Some(&repeater.name),
            Self::Group(_) => None,
        }
    }
}

/// Validation rules of a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub mandatory: bool,
    pub regexp: Option<String>,
    /// Message replacing the default "invalid value" text.
    pub invalid_text: Option<String>,
    /// Message replacing the default regexp mismatch text.
    pub regex_text: Option<String>,
}

/// Allowed value of an enumerated field.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumEntry {
    pub value: Value,
    pub label: String,
}

/// A leaf field declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: SmolStr,
    /// Primitive type tag resolved through the widget registry.
    pub ty: SmolStr,
    pub label: String,
    pub description: String,
    pub validation: Validation,
    pub default_value: Option<Value>,
    pub multiple: bool,
    /// Named widget overriding the type lookup.
    pub widget: Option<SmolStr>,
    pub widget_params: IndexMap<SmolStr, String>,
    pub hidden: bool,
    /// `can-not-write`: the field starts disabled and stays so.
    pub read_only: bool,
    pub enumeration: Vec<EnumEntry>,
    pub disable_condition: Option<ConditionGroup>,
    pub checkers: Vec<CheckerDecl>,
}

impl FieldDecl {
    /// Minimal declaration used by the readers before optional keys are set.
    #[must_use]
    pub fn new(name: impl Into<SmolStr>, ty: impl Into<SmolStr>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            label: String::new(),
            description: String::new(),
            validation: Validation::default(),
            default_value: None,
            multiple: false,
            widget: None,
            widget_params: IndexMap::new(),
            hidden: false,
            read_only: false,
            enumeration: Vec::new(),
            disable_condition: None,
            checkers: Vec::new(),
        }
    }
}

/// A composite declaration without repetition.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeDecl {
    pub name: SmolStr,
    pub label: String,
    pub description: String,
    /// Name of a boolean child field gating the visibility of its siblings.
    pub switcher: Option<SmolStr>,
    pub body: Body,
}

/// A repeated composite.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeaterDecl {
    pub name: SmolStr,
    pub label: String,
    pub description: String,
    pub min_size: usize,
    /// `None` means unbounded.
    pub max_size: Option<usize>,
    pub initial_size: usize,
    pub add_label: String,
    pub del_label: String,
    pub header_label: Option<String>,
    /// Composition and checkers instantiated once per entry.
    pub body: Body,
}

impl RepeaterDecl {
    /// Number of entries materialized when the form is first built.
    #[must_use]
    pub fn initial_entries(&self) -> usize {
        let count = self.min_size.max(self.initial_size);
        match self.max_size {
            Some(max) => count.min(max),
            None => count,
        }
    }
}

/// Role of an anonymous group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupRole {
    Fieldset,
    Tab,
}

impl GroupRole {
    /// Parses a `role` attribute; a missing role means fieldset.
    pub fn parse(text: Option<&str>) -> Result<Self, crate::SchemaError> {
        match text.map(str::trim) {
            None | Some("" | "fieldset") => Ok(Self::Fieldset),
            Some("tab") => Ok(Self::Tab),
            Some(other) => Err(crate::SchemaError::UnknownRole(other.into())),
        }
    }
}

/// An entry of the reserved `fieldsets` key.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDecl {
    pub role: GroupRole,
    pub label: String,
    pub switcher: Option<SmolStr>,
    pub body: Body,
}

/// A server-verified check bound to one or more fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckerDecl {
    pub id: SmolStr,
    pub label: String,
    pub description: String,
    /// Relative (`../a`, `b`) or absolute (`/a/b`) references to fields.
    pub linked_fields: Vec<SmolStr>,
    pub order: Option<i64>,
    pub icon_glyph: Option<String>,
    pub icon_decorator: Option<String>,
    pub small_icon_path: Option<String>,
    pub medium_icon_path: Option<String>,
    pub large_icon_path: Option<String>,
}
