//! Leaf fields and their state objects.
//!
//! A [`Field`] owns its widget, its validation rules and two value objects:
//! [`ValidityState`] (errors plus warnings, with checker-contributed
//! warnings keyed by checker) and [`CommentState`].

#![allow(missing_docs)]

use formpanel_schema::condition::scalar_text;
use formpanel_schema::{CommentEntry, ConditionGroup, EnumEntry, FieldDecl, Value};
use indexmap::IndexMap;
use regex::Regex;
use smol_str::SmolStr;
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::checker::CheckerId;
use crate::error::FormError;
use crate::widget::{Widget, WidgetRegistry};

/// Message of an empty mandatory field.
pub const MANDATORY_TEXT: &str = "This field is mandatory";
/// Default message of a pattern mismatch.
pub const REGEX_TEXT: &str = "The value does not match the expected format";
/// Default message of a value outside the enumeration.
pub const ENUMERATION_TEXT: &str = "The value is not one of the allowed values";

/// Errors and warnings of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidityState {
    active_errors: Vec<String>,
    warnings: Vec<String>,
    checker_warnings: IndexMap<CheckerId, String>,
}

impl ValidityState {
    #[must_use]
    pub fn active_errors(&self) -> &[String] {
        &self.active_errors
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.active_errors.is_empty()
    }

    /// Replaces the errors; returns `true` when they changed.
    pub fn mark_invalid(&mut self, errors: Vec<String>) -> bool {
        if self.active_errors == errors {
            return false;
        }
        self.active_errors = errors;
        true
    }

    pub fn clear(&mut self) -> bool {
        self.mark_invalid(Vec::new())
    }

    /// Adds a free warning unless it is already active.
    pub fn mark_warning(&mut self, warning: impl Into<String>) -> bool {
        let warning = warning.into();
        if self.warnings.contains(&warning) {
            return false;
        }
        self.warnings.push(warning);
        true
    }

    pub fn remove_warning(&mut self, warning: &str) -> bool {
        let before = self.warnings.len();
        self.warnings.retain(|current| current != warning);
        before != self.warnings.len()
    }

    /// Records the warning contributed by one checker; at most one per checker.
    pub fn add_checker_warning(&mut self, checker: CheckerId, warning: String) -> bool {
        if self.checker_warnings.contains_key(&checker) {
            return false;
        }
        self.checker_warnings.insert(checker, warning);
        true
    }

    /// Retracts exactly the warning of `checker`.
    pub fn remove_checker_warning(&mut self, checker: CheckerId) -> bool {
        self.checker_warnings.shift_remove(&checker).is_some()
    }

    /// Free warnings first, then checker warnings in contribution order.
    #[must_use]
    pub fn active_warnings(&self) -> Vec<String> {
        self.warnings
            .iter()
            .chain(self.checker_warnings.values())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty() || !self.checker_warnings.is_empty()
    }
}

/// One comment attached to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: Option<SmolStr>,
    pub text: String,
    pub author: String,
    /// Date as received.
    pub date: String,
    /// `date` when it is a well-formed ISO-8601 timestamp.
    pub parsed: Option<OffsetDateTime>,
}

impl Comment {
    #[must_use]
    pub fn from_entry(entry: &CommentEntry) -> Self {
        let date = entry.date.trim();
        let parsed = OffsetDateTime::parse(date, &Rfc3339)
            .or_else(|_| OffsetDateTime::parse(date, &Iso8601::DEFAULT))
            .ok();
        Self {
            id: entry.id.clone(),
            text: entry.text.clone(),
            author: entry.author.clone(),
            date: entry.date.clone(),
            parsed,
        }
    }

    /// `text (author, date)`; parsed dates are shown to the minute.
    #[must_use]
    pub fn display(&self) -> String {
        let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
        let date = self
            .parsed
            .and_then(|parsed| parsed.format(format).ok())
            .unwrap_or_else(|| self.date.clone());
        format!("{} ({}, {date})", self.text, self.author)
    }
}

/// Comments of one field, in the order they were received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentState {
    comments: Vec<Comment>,
}

impl CommentState {
    #[must_use]
    pub fn has_comments(&self) -> bool {
        !self.comments.is_empty()
    }

    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    #[must_use]
    pub fn first(&self) -> Option<&Comment> {
        self.comments.first()
    }

    pub fn set(&mut self, entries: &[CommentEntry]) {
        self.comments = entries.iter().map(Comment::from_entry).collect();
    }

    pub fn entries(&self) -> Vec<CommentEntry> {
        self.comments
            .iter()
            .map(|comment| CommentEntry {
                id: comment.id.clone(),
                text: comment.text.clone(),
                author: comment.author.clone(),
                date: comment.date.clone(),
            })
            .collect()
    }
}

/// A mounted leaf field.
#[derive(Debug)]
pub struct Field {
    /// Full flat name, including the form-wide prefix.
    pub name: SmolStr,
    /// Name as declared in the schema.
    pub short_name: SmolStr,
    /// Rendered label; mandatory fields carry a leading `*`.
    pub label: String,
    pub description: String,
    pub widget: Box<dyn Widget>,
    pub mandatory: bool,
    pub pattern: Option<Regex>,
    pub invalid_text: Option<String>,
    pub regex_text: Option<String>,
    pub multiple: bool,
    pub enumeration: Vec<EnumEntry>,
    pub value: Value,
    /// Reason the last incoming value was rejected by the widget.
    pub parse_error: Option<String>,
    pub declared_hidden: bool,
    pub read_only: bool,
    pub disabled: bool,
    pub disable_condition: Option<ConditionGroup>,
    pub validity: ValidityState,
    pub comments: CommentState,
}

impl Field {
    /// Creates the field for `decl` under the flat name `name`.
    pub fn from_decl(
        decl: &FieldDecl,
        name: SmolStr,
        registry: &WidgetRegistry,
    ) -> Result<Self, FormError> {
        let widget = registry.create(decl)?;
        let pattern = decl
            .validation
            .regexp
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|err| FormError::InvalidPattern {
                field: name.clone(),
                message: err.to_string().into(),
            })?;
        let mandatory = decl.validation.mandatory;
        let label = if mandatory {
            format!("* {}", decl.label)
        } else {
            decl.label.clone()
        };
        let mut field = Self {
            name,
            short_name: decl.name.clone(),
            label,
            description: decl.description.clone(),
            widget,
            mandatory,
            pattern,
            invalid_text: decl.validation.invalid_text.clone(),
            regex_text: decl.validation.regex_text.clone(),
            multiple: decl.multiple,
            enumeration: decl.enumeration.clone(),
            value: Value::Null,
            parse_error: None,
            declared_hidden: decl.hidden,
            read_only: decl.read_only,
            disabled: decl.read_only,
            disable_condition: decl.disable_condition.clone(),
            validity: ValidityState::default(),
            comments: CommentState::default(),
        };
        if let Some(default) = &decl.default_value {
            field.set_value(default);
        }
        Ok(field)
    }

    /// Label without the mandatory marker.
    #[must_use]
    pub fn plain_label(&self) -> &str {
        let label = self.label.trim();
        label
            .strip_prefix('*')
            .or_else(|| label.strip_suffix('*'))
            .unwrap_or(label)
            .trim()
    }

    /// Converts and stores `value`; a rejected value is kept as raw text.
    pub fn set_value(&mut self, value: &Value) {
        let coerced = if self.multiple {
            let items = match value {
                Value::Array(items) => items.clone(),
                Value::Null => Vec::new(),
                other => vec![other.clone()],
            };
            items
                .iter()
                .map(|item| self.widget.coerce(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        } else {
            self.widget.coerce(value)
        };
        match coerced {
            Ok(value) => {
                self.value = value;
                self.parse_error = None;
            }
            Err(reason) => {
                self.value = Value::String(scalar_text(value));
                self.parse_error = Some(reason);
            }
        }
    }

    pub fn set_raw_value(&mut self, raw: &str) {
        self.set_value(&Value::String(raw.to_string()));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widget.is_empty(&self.value)
    }

    /// Text form of the value; multiple values are joined with `,`.
    #[must_use]
    pub fn readable_value(&self) -> String {
        match &self.value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.widget.readable(item))
                .collect::<Vec<_>>()
                .join(","),
            value => self.widget.readable(value),
        }
    }

    /// Value as seen by disable conditions; `None` when nothing is set.
    #[must_use]
    pub fn condition_value(&self) -> Option<String> {
        if self.value.is_null() {
            None
        } else {
            Some(self.readable_value())
        }
    }

    /// Errors for the current value, ignoring visibility.
    #[must_use]
    pub fn compute_errors(&self) -> Vec<String> {
        if let Some(reason) = &self.parse_error {
            return vec![self.invalid_text.clone().unwrap_or_else(|| reason.clone())];
        }
        if self.is_empty() {
            return if self.mandatory {
                vec![MANDATORY_TEXT.to_string()]
            } else {
                Vec::new()
            };
        }
        let values = match &self.value {
            Value::Array(items) => items.iter().collect::<Vec<_>>(),
            value => vec![value],
        };
        let mut errors = Vec::new();
        for value in values {
            let text = self.widget.readable(value);
            if let Err(reason) = self.widget.coerce(value) {
                errors.push(self.invalid_text.clone().unwrap_or(reason));
                continue;
            }
            if let Some(pattern) = &self.pattern {
                if !pattern.is_match(&text) {
                    errors.push(
                        self.regex_text
                            .clone()
                            .unwrap_or_else(|| REGEX_TEXT.to_string()),
                    );
                    continue;
                }
            }
            if !self.enumeration.is_empty()
                && !self
                    .enumeration
                    .iter()
                    .any(|entry| scalar_text(&entry.value) == text)
            {
                errors.push(ENUMERATION_TEXT.to_string());
            }
        }
        errors.dedup();
        errors
    }

    /// Recomputes the active errors; hidden or disabled fields are valid.
    /// Returns `true` when the errors changed.
    pub fn validate(&mut self, hidden: bool) -> bool {
        let errors = if hidden || self.disabled {
            Vec::new()
        } else {
            self.compute_errors()
        };
        self.validity.mark_invalid(errors)
    }
}
