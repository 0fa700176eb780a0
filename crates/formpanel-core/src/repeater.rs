//! Repeaters: bounded, ordered lists of composite entries.
//!
//! Entries are numbered from 1 without gaps. Inserting, removing or moving
//! an entry renames every field below the entries that shift, so a lookup by
//! flat name right after the operation finds the field at its new position.

#![allow(missing_docs)]

use formpanel_schema::Body;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::builder::Builder;
use crate::chrome::Chrome;
use crate::error::FormError;
use crate::form::Form;
use crate::tree::{NodeId, NodeKind};

/// `{field}` template of entry headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTemplate {
    source: String,
    fields: Vec<SmolStr>,
}

impl HeaderTemplate {
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let mut fields = Vec::new();
        let mut rest = source;
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else {
                break;
            };
            if end > 0 {
                fields.push(SmolStr::new(&after[..end]));
            }
            rest = &after[end + 1..];
        }
        Self {
            source: source.to_string(),
            fields,
        }
    }

    /// Short names of the fields the template reads.
    #[must_use]
    pub fn fields(&self) -> &[SmolStr] {
        &self.fields
    }

    /// Fills the placeholders; missing values render as nothing.
    #[must_use]
    pub fn render(&self, value: impl Fn(&str) -> Option<String>) -> String {
        let mut out = self.source.clone();
        for field in &self.fields {
            out = out.replace(&format!("{{{field}}}"), &value(field).unwrap_or_default());
        }
        out
    }
}

/// A mounted repeater; its entries are the child nodes.
#[derive(Debug, Clone)]
pub struct Repeater {
    /// Full flat name.
    pub name: SmolStr,
    pub short_name: SmolStr,
    pub label: String,
    pub description: String,
    pub min_size: usize,
    pub max_size: Option<usize>,
    pub add_label: String,
    pub del_label: String,
    pub header: Option<HeaderTemplate>,
    /// Body instantiated for each entry.
    pub template: Body,
    pub active_errors: Vec<String>,
}

impl Repeater {
    /// Prefix of the fields of entry `position`.
    #[must_use]
    pub fn entry_prefix(&self, separator: &str, position: usize) -> SmolStr {
        SmolStr::new(format!("{}{separator}{position}{separator}", self.name))
    }

    #[must_use]
    pub fn entry_title(&self, position: usize) -> String {
        format!("{} ({position})", self.label)
    }

    /// Bound violations for `count` entries.
    #[must_use]
    pub fn errors(&self, count: usize) -> Vec<String> {
        let mut errors = Vec::new();
        if count < self.min_size {
            errors.push(format!("Too few entries: {count}/{}", self.min_size));
        }
        if let Some(max) = self.max_size {
            if count > max {
                errors.push(format!("Too many entries: {count}/{max}"));
            }
        }
        errors
    }

    #[must_use]
    pub fn is_full(&self, count: usize) -> bool {
        self.max_size.is_some_and(|max| count >= max)
    }
}

/// One entry of a repeater.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    /// 1-based position.
    pub position: usize,
    pub collapsed: bool,
    /// Position the entry was loaded at; `None` for entries added since.
    pub previous_position: Option<usize>,
}

/// Direction of [`Form::move_repeater_item`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl<C: Chrome> Form<C> {
    /// Number of entries of a repeater.
    pub fn repeater_count(&self, name: &str) -> Result<usize, FormError> {
        let id = self.repeater_id(name)?;
        Ok(self.entries(id).len())
    }

    /// Current bound violations of a repeater.
    pub fn repeater_errors(&self, name: &str) -> Result<&[String], FormError> {
        let id = self.repeater_id(name)?;
        self.tree
            .get(id)
            .and_then(|node| node.as_repeater())
            .map(|repeater| repeater.active_errors.as_slice())
            .ok_or_else(|| FormError::UnknownRepeater(name.into()))
    }

    /// Title of entry `position`.
    pub fn entry_title(&self, name: &str, position: usize) -> Result<&str, FormError> {
        let entry = self.entry_at(self.repeater_id(name)?, position)?;
        Ok(self
            .tree
            .get(entry)
            .and_then(|node| node.title.as_deref())
            .unwrap_or_default())
    }

    /// Inserts an entry at `position` (1-based; appended when `None`) and
    /// returns its position.
    pub fn add_repeater_item(
        &mut self,
        name: &str,
        position: Option<usize>,
    ) -> Result<usize, FormError> {
        let id = self.repeater_id(name)?;
        let entries = self.entries(id);
        let count = entries.len();
        let repeater = self.repeater(id)?;
        if repeater.is_full(count) {
            return Err(FormError::RepeaterFull {
                name: repeater.name.clone(),
                max: repeater.max_size.unwrap_or(count),
            });
        }
        let position = position.unwrap_or(count + 1);
        if position == 0 || position > count + 1 {
            return Err(FormError::EntryOutOfRange {
                name: repeater.name.clone(),
                position,
                count,
            });
        }
        self.suspend();
        for (index, entry) in entries.iter().enumerate().skip(position - 1).rev() {
            self.renumber(&[(*entry, index + 2)]);
        }
        let result = self.insert_entry(id, position, false, None);
        if result.is_err() {
            // Shift the following entries back so positions stay gapless.
            for (index, entry) in entries.iter().enumerate().skip(position - 1) {
                self.renumber(&[(*entry, index + 1)]);
            }
        }
        self.after_resize(id);
        self.resume();
        result?;
        debug!(repeater = name, position, "repeater entry added");
        Ok(position)
    }

    /// Removes entry `position` and renumbers the following ones.
    pub fn remove_repeater_item(&mut self, name: &str, position: usize) -> Result<(), FormError> {
        let id = self.repeater_id(name)?;
        let count = self.entries(id).len();
        let repeater = self.repeater(id)?;
        if count <= repeater.min_size {
            return Err(FormError::RepeaterAtMinimum {
                name: repeater.name.clone(),
                min: repeater.min_size,
            });
        }
        let entry = self.entry_at(id, position)?;
        self.suspend();
        self.drop_entry(entry);
        let shifted: Vec<_> = self
            .entries(id)
            .into_iter()
            .enumerate()
            .skip(position - 1)
            .map(|(index, entry)| (entry, index + 1))
            .collect();
        for pair in shifted {
            self.renumber(&[pair]);
        }
        self.after_resize(id);
        self.resume();
        debug!(repeater = name, position, "repeater entry removed");
        Ok(())
    }

    /// Swaps entry `position` with its neighbour.
    pub fn move_repeater_item(
        &mut self,
        name: &str,
        position: usize,
        direction: MoveDirection,
    ) -> Result<usize, FormError> {
        let id = self.repeater_id(name)?;
        let entries = self.entries(id);
        let count = entries.len();
        let target = match direction {
            MoveDirection::Up => position.checked_sub(1).filter(|target| *target >= 1),
            MoveDirection::Down => Some(position + 1).filter(|target| *target <= count),
        };
        let entry = self.entry_at(id, position)?;
        let Some(target) = target else {
            // Moving the first entry up or the last one down does nothing.
            return Ok(position);
        };
        let other = entries[target - 1];
        self.suspend();
        if let Some(node) = self.tree.get_mut(id) {
            node.children.swap(position - 1, target - 1);
        }
        self.renumber(&[(entry, target), (other, position)]);
        self.refresh_titles(id);
        self.update_panels(vec![self.panel_of(id)]);
        self.resume();
        Ok(target)
    }

    pub fn move_up(&mut self, name: &str, position: usize) -> Result<usize, FormError> {
        self.move_repeater_item(name, position, MoveDirection::Up)
    }

    pub fn move_down(&mut self, name: &str, position: usize) -> Result<usize, FormError> {
        self.move_repeater_item(name, position, MoveDirection::Down)
    }

    pub fn set_entry_collapsed(
        &mut self,
        name: &str,
        position: usize,
        collapsed: bool,
    ) -> Result<(), FormError> {
        let entry = self.entry_at(self.repeater_id(name)?, position)?;
        if let Some(NodeKind::Entry(entry)) = self.tree.get_mut(entry).map(|node| &mut node.kind) {
            entry.collapsed = collapsed;
        }
        Ok(())
    }

    #[must_use]
    pub fn is_entry_collapsed(&self, name: &str, position: usize) -> bool {
        self.repeater_id(name)
            .and_then(|id| self.entry_at(id, position))
            .ok()
            .and_then(|entry| self.tree.get(entry))
            .and_then(|node| node.as_entry())
            .is_some_and(|entry| entry.collapsed)
    }

    /// Resizes a repeater from a values payload. Counts above the maximum
    /// are clamped; counts below the minimum are kept and reported.
    pub(crate) fn load_repeater(&mut self, id: NodeId, count: usize) -> Result<(), FormError> {
        let repeater = self.repeater(id)?;
        let mut target = count;
        if let Some(max) = repeater.max_size {
            if count > max {
                warn!(repeater = %repeater.name, count, max, "repeater count clamped to its maximum");
                target = max;
            }
        }
        let mut entries = self.entries(id);
        while entries.len() > target {
            if let Some(last) = entries.pop() {
                self.drop_entry(last);
            }
        }
        for position in entries.len() + 1..=target {
            self.insert_entry(id, position, true, Some(position))?;
        }
        for (index, entry) in self.entries(id).into_iter().enumerate() {
            if let Some(NodeKind::Entry(entry)) = self.tree.get_mut(entry).map(|node| &mut node.kind) {
                entry.previous_position = Some(index + 1);
                entry.collapsed = index + 1 != target;
            }
        }
        self.validate_repeater(id);
        Ok(())
    }

    /// Recomputes the bound errors; returns `true` when they changed.
    pub(crate) fn validate_repeater(&mut self, id: NodeId) -> bool {
        let count = self.entries(id).len();
        let hidden = self.tree.is_switched_off(id);
        let Some(repeater) = self.tree.get_mut(id).and_then(|node| node.as_repeater_mut()) else {
            return false;
        };
        let errors = if hidden { Vec::new() } else { repeater.errors(count) };
        if repeater.active_errors == errors {
            return false;
        }
        repeater.active_errors = errors;
        true
    }

    pub(crate) fn refresh_all_titles(&mut self) {
        let repeaters: Vec<_> = self
            .tree
            .all()
            .into_iter()
            .filter(|id| self.tree.get(*id).and_then(|node| node.as_repeater()).is_some())
            .collect();
        for id in repeaters {
            self.refresh_titles(id);
        }
    }

    /// Recomputes the entry titles of one repeater from its header template.
    pub(crate) fn refresh_titles(&mut self, id: NodeId) {
        let Ok(repeater) = self.repeater(id) else {
            return;
        };
        let header = repeater.header.clone();
        let label = repeater.label.clone();
        for entry in self.entries(id) {
            let Some(node) = self.tree.get(entry) else {
                continue;
            };
            let position = node.as_entry().map_or(0, |entry| entry.position);
            let mut title = format!("{label} ({position})");
            if let Some(header) = &header {
                let prefix = node.prefix.clone();
                let lookup = |short: &str| {
                    self.names
                        .get(format!("{prefix}{short}").as_str())
                        .and_then(|id| self.tree.field(*id))
                        .map(|field| field.readable_value())
                };
                let any_value = header
                    .fields()
                    .iter()
                    .any(|short| lookup(short).is_some_and(|value| !value.is_empty()));
                let rendered = header.render(lookup);
                if any_value && !rendered.is_empty() {
                    title = format!("{title} - {rendered}");
                }
            }
            if let Some(node) = self.tree.get_mut(entry) {
                node.title = Some(title);
            }
        }
    }

    /// Repeater whose entry directly holds field `id`, when the field feeds
    /// that repeater's header template.
    pub(crate) fn header_repeater_of(&self, id: NodeId) -> Option<NodeId> {
        let field = self.tree.field(id)?;
        let entry = self.tree.get(id)?.parent?;
        let entry_node = self.tree.get(entry)?;
        entry_node.as_entry()?;
        let repeater_id = entry_node.parent?;
        let repeater = self.tree.get(repeater_id)?.as_repeater()?;
        let header = repeater.header.as_ref()?;
        header
            .fields()
            .contains(&field.short_name)
            .then_some(repeater_id)
    }

    pub(crate) fn entries(&self, repeater: NodeId) -> Vec<NodeId> {
        self.tree
            .get(repeater)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    fn repeater(&self, id: NodeId) -> Result<&Repeater, FormError> {
        self.tree
            .get(id)
            .and_then(|node| node.as_repeater())
            .ok_or_else(|| FormError::UnknownRepeater(format!("#{}", id.0).into()))
    }

    fn entry_at(&self, repeater: NodeId, position: usize) -> Result<NodeId, FormError> {
        let entries = self.entries(repeater);
        position
            .checked_sub(1)
            .and_then(|index| entries.get(index).copied())
            .ok_or_else(|| FormError::EntryOutOfRange {
                name: self
                    .repeater(repeater)
                    .map(|r| r.name.clone())
                    .unwrap_or_default(),
                position,
                count: entries.len(),
            })
    }

    /// Mounts a new entry and registers its checkers. On error, whatever was
    /// mounted is unmounted again.
    fn insert_entry(
        &mut self,
        repeater: NodeId,
        position: usize,
        collapsed: bool,
        previous_position: Option<usize>,
    ) -> Result<NodeId, FormError> {
        let before = self.entries(repeater);
        let mounted = self.mount_entry(repeater, position, collapsed, previous_position);
        if mounted.is_err() {
            let partial: Vec<_> = self
                .entries(repeater)
                .into_iter()
                .filter(|entry| !before.contains(entry))
                .collect();
            for entry in partial {
                self.drop_entry(entry);
            }
        }
        mounted
    }

    fn mount_entry(
        &mut self,
        repeater: NodeId,
        position: usize,
        collapsed: bool,
        previous_position: Option<usize>,
    ) -> Result<NodeId, FormError> {
        let mut builder = Builder {
            tree: &mut self.tree,
            registry: &self.registry,
            paths: &self.paths,
            policy: self.options.tab_policy,
            names: &mut self.names,
            checkers: Vec::new(),
        };
        let entry = builder.build_entry(repeater, position - 1, position, collapsed, previous_position)?;
        let pending = builder.checkers;
        self.register_checkers(pending)?;
        self.refresh_conditions();
        self.apply_switchers();
        for id in self.tree.descendants(entry) {
            self.validate_field(id);
        }
        Ok(entry)
    }

    /// Unmounts an entry, dropping its checkers and their field warnings.
    fn drop_entry(&mut self, entry: NodeId) {
        let doomed: Vec<_> = self
            .checkers
            .iter()
            .filter(|(_, checker)| self.tree.is_within(checker.location, entry))
            .map(|(id, _)| id)
            .collect();
        for id in doomed {
            if let Some(checker) = self.checkers.remove(id) {
                for field in checker.linked {
                    if let Some(field) = self.tree.field_mut(field) {
                        field.validity.remove_checker_warning(id);
                    }
                }
            }
        }
        self.unregister_names(entry);
        self.tree.remove(entry);
        let tree = &self.tree;
        for id in self.checkers.ids() {
            if let Some(checker) = self.checkers.get_mut(id) {
                checker.linked.retain(|field| tree.get(*field).is_some());
            }
        }
    }

    /// Moves entries to new positions, renaming everything below them.
    fn renumber(&mut self, moves: &[(NodeId, usize)]) {
        for (entry, _) in moves {
            self.unregister_names(*entry);
        }
        let separator = self.paths.separator().to_string();
        for &(entry, position) in moves {
            let Some(node) = self.tree.get(entry) else {
                continue;
            };
            let old = node.prefix.clone();
            let Some(new) = node
                .parent
                .and_then(|parent| self.tree.get(parent))
                .and_then(|parent| parent.as_repeater())
                .map(|repeater| repeater.entry_prefix(&separator, position))
            else {
                continue;
            };
            if let Some(NodeKind::Entry(state)) = self.tree.get_mut(entry).map(|node| &mut node.kind) {
                state.position = position;
            }
            for id in self.tree.descendants(entry) {
                let Some(node) = self.tree.get_mut(id) else {
                    continue;
                };
                node.prefix = replace_prefix(&node.prefix, &old, &new);
                match &mut node.kind {
                    NodeKind::Field(field) => field.name = replace_prefix(&field.name, &old, &new),
                    NodeKind::Repeater(repeater) => {
                        repeater.name = replace_prefix(&repeater.name, &old, &new);
                    }
                    _ => {}
                }
            }
            for id in self.checkers.ids() {
                let within = self
                    .checkers
                    .get(id)
                    .is_some_and(|checker| self.tree.is_within(checker.location, entry));
                if within {
                    if let Some(checker) = self.checkers.get_mut(id) {
                        checker.prefix = replace_prefix(&checker.prefix, &old, &new);
                    }
                }
            }
        }
        for (entry, _) in moves {
            self.register_names(*entry);
        }
    }

    /// Forgets the names held by nodes under `entry`; a name owned by
    /// another node stays.
    fn unregister_names(&mut self, entry: NodeId) {
        for id in self.tree.descendants(entry) {
            if let Some(name) = self.node_name(id) {
                if self.names.get(&name) == Some(&id) {
                    self.names.remove(&name);
                }
            }
        }
    }

    fn register_names(&mut self, entry: NodeId) {
        for id in self.tree.descendants(entry) {
            if let Some(name) = self.node_name(id) {
                self.names.insert(name, id);
            }
        }
    }

    fn node_name(&self, id: NodeId) -> Option<SmolStr> {
        match &self.tree.get(id)?.kind {
            NodeKind::Field(field) => Some(field.name.clone()),
            NodeKind::Repeater(repeater) => Some(repeater.name.clone()),
            _ => None,
        }
    }

    /// Shared tail of add and remove.
    fn after_resize(&mut self, id: NodeId) {
        self.refresh_titles(id);
        self.validate_repeater(id);
        self.update_test_results();
        let mut panels = vec![self.panel_of(id)];
        panels.extend(
            self.checkers
                .iter()
                .map(|(_, checker)| self.panel_of(checker.location)),
        );
        self.update_panels(panels);
    }
}

fn replace_prefix(name: &str, old: &str, new: &str) -> SmolStr {
    match name.strip_prefix(old) {
        Some(rest) => SmolStr::new(format!("{new}{rest}")),
        None => SmolStr::new(name),
    }
}
