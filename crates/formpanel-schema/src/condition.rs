//! Disable conditions.
//!
//! A condition group is a boolean tree: each group combines its nested
//! groups and its leaf comparisons with `and` or `or`. Leaf comparisons read
//! the current value of another field through a caller-supplied lookup, so
//! this module never touches live form state.

use serde::Deserialize;
use smol_str::SmolStr;

use crate::error::SchemaError;
use crate::Value;

/// How a group combines its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Every member must hold.
    And,
    /// At least one member must hold.
    Or,
}

/// Comparison operator of a leaf condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Equal.
    Eq,
    /// Not equal.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Geq,
    /// Less than.
    Lt,
    /// Less than or equal.
    Leq,
}

impl Operator {
    /// Parses an operator keyword.
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        match text.trim() {
            "eq" => Ok(Self::Eq),
            "neq" => Ok(Self::Neq),
            "gt" => Ok(Self::Gt),
            "geq" => Ok(Self::Geq),
            "lt" => Ok(Self::Lt),
            "leq" => Ok(Self::Leq),
            other => Err(SchemaError::UnknownOperator(other.into())),
        }
    }

    fn accepts(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Eq => ordering == Equal,
            Self::Neq => ordering != Equal,
            Self::Gt => ordering == Greater,
            Self::Geq => ordering != Less,
            Self::Lt => ordering == Less,
            Self::Leq => ordering != Greater,
        }
    }
}

/// Leaf comparison against another field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Field reference, relative to the owning field's prefix or absolute.
    pub id: SmolStr,
    /// Comparison operator.
    pub operator: Operator,
    /// Expected value, compared numerically when both sides are numbers.
    pub value: String,
}

impl Condition {
    /// Evaluates this comparison; an undefined field value never matches.
    pub fn evaluate(&self, lookup: &dyn Fn(&str) -> Option<String>) -> bool {
        let Some(actual) = lookup(&self.id) else {
            return false;
        };
        let ordering = match (actual.trim().parse::<f64>(), self.value.trim().parse::<f64>()) {
            (Ok(left), Ok(right)) => match left.partial_cmp(&right) {
                Some(ordering) => ordering,
                None => return false,
            },
            _ => actual.as_str().cmp(self.value.as_str()),
        };
        self.operator.accepts(ordering)
    }
}

/// A boolean group of conditions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionGroup {
    /// Combination mode.
    pub kind: GroupKind,
    /// Nested groups.
    pub groups: Vec<ConditionGroup>,
    /// Leaf comparisons.
    pub conditions: Vec<Condition>,
}

impl ConditionGroup {
    /// Returns `true` when the group declares nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.conditions.is_empty()
    }

    /// Evaluates the tree. An empty group is `false`.
    pub fn evaluate(&self, lookup: &dyn Fn(&str) -> Option<String>) -> bool {
        if self.is_empty() {
            return false;
        }
        let mut members = self
            .groups
            .iter()
            .map(|group| group.evaluate(lookup))
            .chain(self.conditions.iter().map(|cond| cond.evaluate(lookup)));
        match self.kind {
            GroupKind::And => members.all(|held| held),
            GroupKind::Or => members.any(|held| held),
        }
    }

    /// Every field reference in the tree, depth first.
    #[must_use]
    pub fn references(&self) -> Vec<SmolStr> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<SmolStr>) {
        for group in &self.groups {
            group.collect_references(out);
        }
        for cond in &self.conditions {
            if !out.contains(&cond.id) {
                out.push(cond.id.clone());
            }
        }
    }

    /// Reads a condition tree from its JSON object form.
    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        let raw: ConditionGroupJson = serde_json::from_value(value.clone())?;
        raw.into_group()
    }

    /// Reads a condition tree from JSON text, as embedded in XML schemas.
    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        let raw: ConditionGroupJson = serde_json::from_str(text)?;
        raw.into_group()
    }
}

#[derive(Debug, Deserialize)]
struct ConditionGroupJson {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    conditions: Vec<ConditionGroupJson>,
    #[serde(default)]
    condition: Vec<ConditionJson>,
}

#[derive(Debug, Deserialize)]
struct ConditionJson {
    id: String,
    operator: String,
    #[serde(default)]
    value: Value,
}

impl ConditionGroupJson {
    fn into_group(self) -> Result<ConditionGroup, SchemaError> {
        let kind = match self.kind.as_deref().map(str::trim) {
            None | Some("and") => GroupKind::And,
            Some("or") => GroupKind::Or,
            Some(other) => return Err(SchemaError::UnknownConditionType(other.into())),
        };
        let groups = self
            .conditions
            .into_iter()
            .map(ConditionGroupJson::into_group)
            .collect::<Result<Vec<_>, _>>()?;
        let conditions = self
            .condition
            .into_iter()
            .map(|cond| {
                Ok(Condition {
                    id: SmolStr::new(cond.id),
                    operator: Operator::parse(&cond.operator)?,
                    value: scalar_text(&cond.value),
                })
            })
            .collect::<Result<Vec<_>, SchemaError>>()?;
        Ok(ConditionGroup {
            kind,
            groups,
            conditions,
        })
    }
}

/// Text form of a scalar JSON value; `null` is empty.
#[must_use]
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "port" => Some("8080".into()),
            "mode" => Some("ldap".into()),
            _ => None,
        }
    }

    #[test]
    fn numeric_comparison_wins_when_both_sides_parse() {
        let cond = Condition {
            id: "port".into(),
            operator: Operator::Gt,
            value: "900".into(),
        };
        assert!(cond.evaluate(&lookup));
    }

    #[test]
    fn string_comparison_is_lexical() {
        let cond = Condition {
            id: "mode".into(),
            operator: Operator::Lt,
            value: "sql".into(),
        };
        assert!(cond.evaluate(&lookup));
    }

    #[test]
    fn undefined_reference_is_false_for_every_operator() {
        for op in ["eq", "neq", "gt", "geq", "lt", "leq"] {
            let cond = Condition {
                id: "missing".into(),
                operator: Operator::parse(op).unwrap(),
                value: String::new(),
            };
            assert!(!cond.evaluate(&lookup), "{op}");
        }
    }

    #[test]
    fn empty_group_is_false() {
        let group = ConditionGroup {
            kind: GroupKind::And,
            groups: Vec::new(),
            conditions: Vec::new(),
        };
        assert!(!group.evaluate(&lookup));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        assert_eq!(
            Operator::parse("like"),
            Err(SchemaError::UnknownOperator("like".into()))
        );
    }
}
