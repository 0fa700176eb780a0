//! Schema interpretation.
//!
//! [`Builder`] walks a schema [`Body`] in declaration order and mounts nodes
//! into the [`Tree`]. Tab groups declared at one level are deferred and
//! mounted after every other sibling, either inside one tab container or
//! stacked directly under the parent in linear mode. Checker declarations
//! are not mounted; they are collected as [`PendingCheckers`] with the
//! location and name prefix they were declared at.

use formpanel_schema::{
    Body, CheckerDecl, CompositeDecl, FieldDecl, GroupDecl, GroupRole, PathResolver, RepeaterDecl,
    SchemaElement,
};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::trace;

use crate::config::TabPolicy;
use crate::error::FormError;
use crate::field::Field;
use crate::repeater::{Entry, HeaderTemplate, Repeater};
use crate::tree::{NodeId, NodeKind, Offsets, Tree};
use crate::widget::WidgetRegistry;

/// Inner padding of a fieldset, in pixels.
pub const PADDING_FIELDSET: u32 = 5;
/// Left offset of a nested fieldset.
pub const OFFSET_FIELDSET: u32 = 20;
/// Inner padding of a tab.
pub const PADDING_TAB: u32 = 5;
/// Width reserved for field labels.
pub const LABEL_WIDTH: u32 = 200;
/// Minimum width of a field input.
pub const FIELD_MINWIDTH: u32 = 150;
/// Inner padding of a repeater entry.
pub const REPEATER_PADDING: u32 = 5;
/// Left offset of a nested repeater.
pub const NESTED_OFFSET: u32 = 20;

/// Title of a tab declared without a label.
pub const UNTITLED_TAB: &str = "Untitled";

/// Width of the control launching a checker mounted at `offsets`.
#[must_use]
pub fn checker_control_width(offsets: Offsets) -> u32 {
    (LABEL_WIDTH + FIELD_MINWIDTH).saturating_sub(offsets.left)
}

/// Right margin aligning checker controls across nesting levels.
#[must_use]
pub fn checker_right_margin(max_nesting: u32, offsets: Offsets) -> u32 {
    (max_nesting * OFFSET_FIELDSET).saturating_sub(offsets.right)
}

/// Checkers declared at one location, registered once the tree is built.
#[derive(Debug, Clone)]
pub(crate) struct PendingCheckers {
    pub location: NodeId,
    pub prefix: SmolStr,
    pub field: Option<NodeId>,
    pub decls: Vec<CheckerDecl>,
}

pub(crate) struct Builder<'a> {
    pub tree: &'a mut Tree,
    pub registry: &'a WidgetRegistry,
    pub paths: &'a PathResolver,
    pub policy: TabPolicy,
    pub names: &'a mut FxHashMap<SmolStr, NodeId>,
    pub checkers: Vec<PendingCheckers>,
}

impl Builder<'_> {
    /// Mounts `body` under `parent`.
    pub fn build_body(&mut self, parent: NodeId, body: &Body) -> Result<(), FormError> {
        let mut tabs = Vec::new();
        for element in &body.elements {
            match element {
                SchemaElement::Group(group) if group.role == GroupRole::Tab => tabs.push(group),
                SchemaElement::Group(group) => self.build_fieldset(parent, group)?,
                SchemaElement::Composite(composite) => self.build_composite(parent, composite)?,
                SchemaElement::Repeater(repeater) => self.build_repeater(parent, repeater)?,
                SchemaElement::Field(field) => {
                    self.build_field(parent, field)?;
                }
            }
        }
        if !tabs.is_empty() {
            self.build_tabs(parent, &tabs)?;
        }
        if !body.checkers.is_empty() {
            let prefix = self.prefix(parent);
            self.checkers.push(PendingCheckers {
                location: parent,
                prefix,
                field: None,
                decls: body.checkers.clone(),
            });
        }
        Ok(())
    }

    /// Mounts entry `position` of `repeater` at child `index`.
    pub fn build_entry(
        &mut self,
        repeater: NodeId,
        index: usize,
        position: usize,
        collapsed: bool,
        previous_position: Option<usize>,
    ) -> Result<NodeId, FormError> {
        let node = self
            .tree
            .get(repeater)
            .ok_or_else(|| FormError::UnknownRepeater(format!("#{}", repeater.0).into()))?;
        let decl = node
            .as_repeater()
            .ok_or_else(|| FormError::UnknownRepeater(node.prefix.clone()))?;
        let title = decl.entry_title(position);
        let prefix = decl.entry_prefix(self.paths.separator(), position);
        let template = decl.template.clone();
        let offsets = nested_offsets(
            node.offsets,
            node.nesting_level + 1,
            REPEATER_PADDING,
            NESTED_OFFSET,
        );
        let entry = self.tree.insert(
            repeater,
            Some(index),
            NodeKind::Entry(Entry {
                position,
                collapsed,
                previous_position,
            }),
            Some(title),
            offsets,
        );
        self.set_prefix(entry, prefix);
        self.build_body(entry, &template)?;
        Ok(entry)
    }

    fn build_fieldset(&mut self, parent: NodeId, group: &GroupDecl) -> Result<(), FormError> {
        let offsets = self.container_offsets(parent);
        let title = (!group.label.is_empty()).then(|| group.label.clone());
        let node = self
            .tree
            .insert(parent, None, NodeKind::Fieldset, title, offsets);
        self.build_body(node, &group.body)?;
        self.attach_switcher(node, group.switcher.as_ref(), &group.label)
    }

    fn build_composite(&mut self, parent: NodeId, decl: &CompositeDecl) -> Result<(), FormError> {
        let offsets = self.container_offsets(parent);
        let node = self.tree.insert(
            parent,
            None,
            NodeKind::Composite {
                name: decl.name.clone(),
            },
            Some(decl.label.clone()),
            offsets,
        );
        let prefix = self.paths.child_prefix(&self.prefix(parent), &decl.name);
        self.set_prefix(node, prefix);
        self.build_body(node, &decl.body)?;
        self.attach_switcher(node, decl.switcher.as_ref(), &decl.name)
    }

    fn build_tabs(&mut self, parent: NodeId, tabs: &[&GroupDecl]) -> Result<(), FormError> {
        let holder = match self.policy {
            TabPolicy::Tabs => {
                let offsets = self.tree.get(parent).map(|node| node.offsets).unwrap_or_default();
                self.tree
                    .insert(parent, None, NodeKind::TabContainer, None, offsets)
            }
            TabPolicy::Linear => parent,
        };
        for group in tabs {
            let base = self.tree.get(parent).map(|node| node.offsets).unwrap_or_default();
            let offsets = Offsets {
                left: base.left + PADDING_TAB + 1,
                right: base.right + PADDING_TAB + 1,
            };
            let title = if group.label.is_empty() {
                UNTITLED_TAB.to_string()
            } else {
                group.label.clone()
            };
            let tab = self
                .tree
                .insert(holder, None, NodeKind::Tab, Some(title), offsets);
            self.build_body(tab, &group.body)?;
            self.attach_switcher(tab, group.switcher.as_ref(), &group.label)?;
        }
        Ok(())
    }

    fn build_repeater(&mut self, parent: NodeId, decl: &RepeaterDecl) -> Result<(), FormError> {
        let name = SmolStr::new(format!("{}{}", self.prefix(parent), decl.name));
        let offsets = self.tree.get(parent).map(|node| node.offsets).unwrap_or_default();
        let repeater = Repeater {
            name: name.clone(),
            short_name: decl.name.clone(),
            label: decl.label.clone(),
            description: decl.description.clone(),
            min_size: decl.min_size,
            max_size: decl.max_size,
            add_label: decl.add_label.clone(),
            del_label: decl.del_label.clone(),
            header: decl.header_label.as_deref().map(HeaderTemplate::parse),
            template: decl.body.clone(),
            active_errors: Vec::new(),
        };
        let node = self
            .tree
            .insert(parent, None, NodeKind::Repeater(repeater), None, offsets);
        self.register(name, node)?;
        let count = decl.initial_entries();
        for position in 1..=count {
            self.build_entry(node, position - 1, position, position != count, None)?;
        }
        Ok(())
    }

    fn build_field(&mut self, parent: NodeId, decl: &FieldDecl) -> Result<NodeId, FormError> {
        let prefix = self.prefix(parent);
        let name = SmolStr::new(format!("{prefix}{}", decl.name));
        let field = Field::from_decl(decl, name.clone(), self.registry)?;
        trace!(field = %name, widget = field.widget.type_tag(), "mounting field");
        let offsets = self.tree.get(parent).map(|node| node.offsets).unwrap_or_default();
        let node = self.tree.insert(
            parent,
            None,
            NodeKind::Field(Box::new(field)),
            None,
            offsets,
        );
        self.register(name, node)?;
        if !decl.checkers.is_empty() {
            self.checkers.push(PendingCheckers {
                location: node,
                prefix,
                field: Some(node),
                decls: decl.checkers.clone(),
            });
        }
        Ok(node)
    }

    /// Checks that the switcher names a boolean child field, then records it.
    fn attach_switcher(
        &mut self,
        group: NodeId,
        switcher: Option<&SmolStr>,
        group_name: &str,
    ) -> Result<(), FormError> {
        let Some(switcher) = switcher else {
            return Ok(());
        };
        let name = format!("{}{switcher}", self.prefix(group));
        let valid = self.names.get(name.as_str()).is_some_and(|id| {
            self.tree.get(*id).is_some_and(|node| {
                node.parent == Some(group)
                    && node
                        .as_field()
                        .is_some_and(|field| field.widget.type_tag() == "boolean")
            })
        });
        if !valid {
            return Err(FormError::InvalidSwitcher {
                group: group_name.into(),
                switcher: switcher.clone(),
            });
        }
        if let Some(node) = self.tree.get_mut(group) {
            node.switcher = Some(switcher.clone());
        }
        Ok(())
    }

    fn register(&mut self, name: SmolStr, node: NodeId) -> Result<(), FormError> {
        if self.names.contains_key(&name) {
            return Err(FormError::DuplicateName(name));
        }
        self.names.insert(name, node);
        Ok(())
    }

    fn prefix(&self, node: NodeId) -> SmolStr {
        self.tree
            .get(node)
            .map(|node| node.prefix.clone())
            .unwrap_or_default()
    }

    fn set_prefix(&mut self, node: NodeId, prefix: SmolStr) {
        if let Some(node) = self.tree.get_mut(node) {
            node.prefix = prefix;
        }
    }

    fn container_offsets(&self, parent: NodeId) -> Offsets {
        self.tree
            .get(parent)
            .map(|node| {
                nested_offsets(
                    node.offsets,
                    node.nesting_level + 1,
                    PADDING_FIELDSET,
                    OFFSET_FIELDSET,
                )
            })
            .unwrap_or_default()
    }
}

/// Offsets of a container at `nesting_level` inside one at `base`.
fn nested_offsets(base: Offsets, nesting_level: u32, padding: u32, nested: u32) -> Offsets {
    let shift = if nesting_level > 1 { nested } else { 0 };
    Offsets {
        left: base.left + padding + shift + 1,
        right: base.right + padding + 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_containers_shift_left() {
        let top = nested_offsets(Offsets::default(), 1, PADDING_FIELDSET, OFFSET_FIELDSET);
        assert_eq!(top, Offsets { left: 6, right: 6 });
        let inner = nested_offsets(top, 2, PADDING_FIELDSET, OFFSET_FIELDSET);
        assert_eq!(inner, Offsets { left: 32, right: 12 });
    }

    #[test]
    fn checker_margin_never_goes_negative() {
        assert_eq!(checker_right_margin(1, Offsets { left: 0, right: 40 }), 0);
        assert_eq!(checker_right_margin(3, Offsets { left: 0, right: 12 }), 48);
        assert_eq!(checker_control_width(Offsets { left: 32, right: 0 }), 318);
    }
}
