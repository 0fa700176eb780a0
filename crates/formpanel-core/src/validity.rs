//! Validity tracking.
//!
//! Edits revalidate the edited field first, then re-derive disable
//! conditions and switchers, then notify linked checkers, and only then
//! refresh the owning panels. Panels stay in first edition, showing nothing,
//! until focus leaves them once or a validation is forced.

#![allow(missing_docs)]

use formpanel_schema::Value;
use tracing::trace;

use crate::checker::CheckerStatus;
use crate::chrome::Chrome;
use crate::error::FormError;
use crate::form::Form;
use crate::tree::{NodeId, NodeKind, PanelKey};

impl<C: Chrome> Form<C> {
    /// Sets a field value as typed by the user.
    pub fn set_value(&mut self, name: &str, value: Value) -> Result<(), FormError> {
        let id = self.field_id(name)?;
        if let Some(field) = self.tree.field_mut(id) {
            field.set_value(&value);
        }
        self.on_field_change(id);
        Ok(())
    }

    /// Sets a field from raw text, bypassing conversion when it fails.
    pub fn set_raw_value(&mut self, name: &str, raw: &str) -> Result<(), FormError> {
        let id = self.field_id(name)?;
        if let Some(field) = self.tree.field_mut(id) {
            field.set_raw_value(raw);
        }
        self.on_field_change(id);
        Ok(())
    }

    /// Enables or disables a field explicitly.
    pub fn set_disabled(&mut self, name: &str, disabled: bool) -> Result<(), FormError> {
        let id = self.field_id(name)?;
        let changed = match self.tree.field_mut(id) {
            Some(field) if field.disabled != disabled => {
                field.disabled = disabled;
                true
            }
            _ => false,
        };
        if changed {
            self.on_field_change(id);
        }
        Ok(())
    }

    pub fn add_warning(&mut self, name: &str, warning: &str) -> Result<(), FormError> {
        let id = self.field_id(name)?;
        let changed = self
            .tree
            .field_mut(id)
            .is_some_and(|field| field.validity.mark_warning(warning));
        if changed {
            self.update_panels(vec![self.panel_of(id)]);
        }
        Ok(())
    }

    pub fn remove_warning(&mut self, name: &str, warning: &str) -> Result<(), FormError> {
        let id = self.field_id(name)?;
        let changed = self
            .tree
            .field_mut(id)
            .is_some_and(|field| field.validity.remove_warning(warning));
        if changed {
            self.update_panels(vec![self.panel_of(id)]);
        }
        Ok(())
    }

    pub fn field_errors(&self, name: &str) -> Result<&[String], FormError> {
        let id = self.field_id(name)?;
        Ok(self
            .tree
            .field(id)
            .map(|field| field.validity.active_errors())
            .unwrap_or_default())
    }

    pub fn field_warnings(&self, name: &str) -> Result<Vec<String>, FormError> {
        let id = self.field_id(name)?;
        Ok(self
            .tree
            .field(id)
            .map(|field| field.validity.active_warnings())
            .unwrap_or_default())
    }

    /// Moves focus to a field. Leaving a panel ends its first edition and
    /// validates it.
    pub fn focus(&mut self, name: &str) -> Result<(), FormError> {
        let id = self.field_id(name)?;
        self.focus_panel(self.panel_of(id));
        Ok(())
    }

    pub fn focus_panel(&mut self, panel: PanelKey) {
        let previous = self.focused.replace(panel);
        match previous {
            Some(previous) if previous != panel => {
                self.seen_panels.insert(previous);
                self.validate_group(previous);
            }
            _ => {}
        }
    }

    /// Revalidates every field and repeater of a panel, then refreshes it.
    pub fn validate_group(&mut self, panel: PanelKey) {
        for id in self.panel_members(panel) {
            self.validate_node(id);
        }
        self.update_panel(panel, false);
    }

    /// Forces validation of the whole form and shows every panel status.
    /// Returns `true` when no field nor repeater has errors.
    pub fn is_valid(&mut self) -> bool {
        let nodes: Vec<_> = self.tree.all();
        for &id in &nodes {
            self.validate_node(id);
        }
        self.update_all_panels(true);
        nodes.iter().all(|id| match self.tree.get(*id).map(|node| &node.kind) {
            Some(NodeKind::Field(field)) => !field.validity.has_errors(),
            Some(NodeKind::Repeater(repeater)) => repeater.active_errors.is_empty(),
            _ => true,
        })
    }

    /// `true` until focus has left the panel or a forced validation found
    /// something in it.
    #[must_use]
    pub fn is_first_edition(&self, panel: PanelKey) -> bool {
        !self.seen_panels.contains(&panel)
    }

    /// Re-evaluates disable conditions; returns the fields whose disabled
    /// state changed. Read-only fields stay disabled.
    pub(crate) fn refresh_conditions(&mut self) -> Vec<NodeId> {
        let mut changes = Vec::new();
        for id in self.tree.all() {
            let Some(field) = self.tree.field(id) else {
                continue;
            };
            let Some(condition) = &field.disable_condition else {
                continue;
            };
            let base = self
                .tree
                .get(id)
                .and_then(|node| node.parent)
                .and_then(|parent| self.tree.get(parent))
                .map(|parent| parent.prefix.clone())
                .unwrap_or_default();
            let lookup = |reference: &str| {
                let name = self.paths.resolve(&base, reference);
                self.names
                    .get(name.as_str())
                    .and_then(|id| self.tree.field(*id))
                    .and_then(|field| field.condition_value())
            };
            let disabled = field.read_only || condition.evaluate(&lookup);
            if disabled != field.disabled {
                changes.push((id, disabled));
            }
        }
        let mut changed = Vec::new();
        for (id, disabled) in changes {
            if let Some(field) = self.tree.field_mut(id) {
                trace!(field = %field.name, disabled, "disable condition flipped");
                field.disabled = disabled;
                changed.push(id);
            }
        }
        changed
    }

    /// Re-applies every switcher: siblings of an off switcher are hidden and
    /// the checkers of its group become hidden, remembering their status.
    /// Returns the panels that changed.
    pub(crate) fn apply_switchers(&mut self) -> Vec<PanelKey> {
        let mut panels = Vec::new();
        let groups: Vec<_> = self
            .tree
            .all()
            .into_iter()
            .filter(|id| self.tree.get(*id).is_some_and(|node| node.switcher.is_some()))
            .collect();
        for group in groups {
            let off = self.is_switcher_off(group);
            let switcher = self.switcher_field(group);
            let children = self
                .tree
                .get(group)
                .map(|node| node.children.clone())
                .unwrap_or_default();
            for child in children {
                if Some(child) == switcher {
                    continue;
                }
                if let Some(node) = self.tree.get_mut(child) {
                    if node.switched_off != off {
                        node.switched_off = off;
                        panels.push(node.panel);
                    }
                }
            }
        }
        if !panels.is_empty() {
            for id in self.tree.all() {
                self.validate_node(id);
            }
        }

        let mut checkers_changed = false;
        for id in self.checkers.ids() {
            let hidden = self.is_checker_hidden(id);
            let Some(checker) = self.checkers.get(id) else {
                continue;
            };
            let (status, location) = (checker.status, checker.location);
            let next = match (hidden, status == CheckerStatus::Hidden) {
                (true, false) => CheckerStatus::Hidden,
                (false, true) => checker.saved_status.unwrap_or(CheckerStatus::NotTested),
                _ => continue,
            };
            let control = self.control_of(id, next);
            if let Some(checker) = self.checkers.get_mut(id) {
                checker.saved_status = (next == CheckerStatus::Hidden).then_some(status);
                checker.status = next;
                checker.control = control;
            }
            if self.ready {
                self.chrome.set_checker_control(id, control, next);
            }
            panels.push(self.panel_of(location));
            checkers_changed = true;
        }
        if checkers_changed && self.ready {
            self.update_test_results();
        }
        panels
    }

    /// `true` when `group` has a switcher whose value is not `true`.
    pub(crate) fn is_switcher_off(&self, group: NodeId) -> bool {
        self.switcher_field(group)
            .and_then(|id| self.tree.field(id))
            .is_some_and(|field| field.value != Value::Bool(true))
    }

    fn switcher_field(&self, group: NodeId) -> Option<NodeId> {
        let node = self.tree.get(group)?;
        let switcher = node.switcher.as_ref()?;
        self.names
            .get(format!("{}{switcher}", node.prefix).as_str())
            .copied()
    }

    fn validate_node(&mut self, id: NodeId) -> bool {
        match self.tree.get(id).map(|node| &node.kind) {
            Some(NodeKind::Field(_)) => self.validate_field(id),
            Some(NodeKind::Repeater(_)) => self.validate_repeater(id),
            _ => false,
        }
    }

    /// Everything that follows an edit of field `id`, in order.
    fn on_field_change(&mut self, id: NodeId) {
        self.suspend();
        self.validate_field(id);
        let flipped = self.refresh_conditions();
        for &field in &flipped {
            self.validate_field(field);
        }
        let mut panels = self.apply_switchers();
        if let Some(repeater) = self.header_repeater_of(id) {
            self.refresh_titles(repeater);
        }
        for field in std::iter::once(id).chain(flipped.iter().copied()) {
            panels.push(self.panel_of(field));
            panels.extend(self.on_linked_field_event(field));
        }
        self.update_panels(panels);
        self.resume();
    }
}
