//! Node arena of a built form.
//!
//! Nodes are addressed by [`NodeId`] and hold an explicit parent pointer plus
//! the [`PanelKey`] of the top-level panel that owns them, both fixed when the
//! node is inserted. Removing a subtree leaves tombstones so ids held by
//! checkers and pending checks never alias a newer node.

#![allow(missing_docs)]

use smol_str::SmolStr;

use crate::field::Field;
use crate::repeater::{Entry, Repeater};

/// Index of a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Root of every form.
    pub const ROOT: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Owning top-level panel of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PanelKey {
    /// Synthetic group of everything declared outside any tab.
    OutOfTabs,
    /// A tab item, or a stacked top-level fieldset in linear mode.
    Panel(NodeId),
}

/// Kind-specific payload of a node.
#[derive(Debug)]
pub enum NodeKind {
    Root,
    /// Anonymous fieldset group.
    Fieldset,
    /// Named composite; its children are prefixed with its name.
    Composite { name: SmolStr },
    /// Holder of the tab items declared at one level.
    TabContainer,
    /// Top-level panel created from a `role=tab` group.
    Tab,
    Repeater(Repeater),
    Entry(Entry),
    Field(Box<Field>),
}

/// Visual offsets accumulated from the enclosing containers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Offsets {
    /// Left offset in pixels.
    pub left: u32,
    /// Right offset in pixels.
    pub right: u32,
}

/// One node of the form tree.
#[derive(Debug)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Depth; always the parent's level plus one.
    pub nesting_level: u32,
    pub title: Option<String>,
    pub panel: PanelKey,
    pub offsets: Offsets,
    /// Name of the boolean child gating the other children.
    pub switcher: Option<SmolStr>,
    /// Hidden because a switcher of an ancestor group is off.
    pub switched_off: bool,
    /// Prefix of the flat names of fields declared in this container.
    pub prefix: SmolStr,
    pub kind: NodeKind,
}

impl Node {
    /// Field payload, when this node is a field.
    #[must_use]
    pub fn as_field(&self) -> Option<&Field> {
        match &self.kind {
            NodeKind::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_field_mut(&mut self) -> Option<&mut Field> {
        match &mut self.kind {
            NodeKind::Field(field) => Some(field),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_repeater(&self) -> Option<&Repeater> {
        match &self.kind {
            NodeKind::Repeater(repeater) => Some(repeater),
            _ => None,
        }
    }

    pub fn as_repeater_mut(&mut self) -> Option<&mut Repeater> {
        match &mut self.kind {
            NodeKind::Repeater(repeater) => Some(repeater),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_entry(&self) -> Option<&Entry> {
        match &self.kind {
            NodeKind::Entry(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Arena of nodes; slot 0 is the root.
#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    #[must_use]
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            nesting_level: 0,
            title: None,
            panel: PanelKey::OutOfTabs,
            offsets: Offsets::default(),
            switcher: None,
            switched_off: false,
            prefix: SmolStr::default(),
            kind: NodeKind::Root,
        };
        Self {
            nodes: vec![Some(root)],
        }
    }

    /// Resets the arena to a lone root with the given prefix.
    pub fn reset(&mut self, prefix: SmolStr) {
        *self = Self::new();
        if let Some(root) = self.get_mut(NodeId::ROOT) {
            root.prefix = prefix;
        }
    }

    /// Live node, or `None` for tombstones and unknown ids.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    #[must_use]
    pub fn field(&self, id: NodeId) -> Option<&Field> {
        self.get(id).and_then(Node::as_field)
    }

    pub fn field_mut(&mut self, id: NodeId) -> Option<&mut Field> {
        self.get_mut(id).and_then(Node::as_field_mut)
    }

    /// Inserts `kind` under `parent`, at `position` among its children or
    /// last. The panel is inherited, except for tabs which own themselves.
    pub fn insert(
        &mut self,
        parent: NodeId,
        position: Option<usize>,
        kind: NodeKind,
        title: Option<String>,
        offsets: Offsets,
    ) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        let (nesting_level, inherited_panel, prefix) = match self.get(parent) {
            Some(node) => (node.nesting_level + 1, node.panel, node.prefix.clone()),
            None => (1, PanelKey::OutOfTabs, SmolStr::default()),
        };
        let panel = if matches!(kind, NodeKind::Tab) {
            PanelKey::Panel(id)
        } else {
            inherited_panel
        };
        self.nodes.push(Some(Node {
            parent: Some(parent),
            children: Vec::new(),
            nesting_level,
            title,
            panel,
            offsets,
            switcher: None,
            switched_off: false,
            prefix,
            kind,
        }));
        if let Some(node) = self.get_mut(parent) {
            match position {
                Some(index) if index <= node.children.len() => node.children.insert(index, id),
                _ => node.children.push(id),
            }
        }
        id
    }

    /// Removes `id` and its subtree; returns the removed ids, depth first.
    pub fn remove(&mut self, id: NodeId) -> Vec<NodeId> {
        let removed = self.descendants(id);
        if let Some(parent) = self.get(id).and_then(|node| node.parent) {
            if let Some(parent) = self.get_mut(parent) {
                parent.children.retain(|child| *child != id);
            }
        }
        for node in &removed {
            if let Some(slot) = self.nodes.get_mut(node.index()) {
                *slot = None;
            }
        }
        removed
    }

    /// `id` and everything below it, in document order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Strict ancestors of `id`, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(|node| node.parent);
        while let Some(parent) = current {
            out.push(parent);
            current = self.get(parent).and_then(|node| node.parent);
        }
        out
    }

    /// `true` when `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_within(&self, id: NodeId, ancestor: NodeId) -> bool {
        id == ancestor || self.ancestors(id).contains(&ancestor)
    }

    /// Hidden by a switcher on the node itself or any ancestor.
    #[must_use]
    pub fn is_switched_off(&self, id: NodeId) -> bool {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .filter_map(|node| self.get(node))
            .any(|node| node.switched_off)
    }

    /// Every live node id in document order.
    #[must_use]
    pub fn all(&self) -> Vec<NodeId> {
        self.descendants(NodeId::ROOT)
    }

    /// Top-level panels in document order.
    #[must_use]
    pub fn panels(&self) -> Vec<PanelKey> {
        let mut panels = Vec::new();
        let mut has_out_of_tabs = false;
        for id in self.all() {
            let Some(node) = self.get(id) else {
                continue;
            };
            match node.kind {
                NodeKind::Tab => panels.push(PanelKey::Panel(id)),
                NodeKind::Field(_) | NodeKind::Repeater(_)
                    if node.panel == PanelKey::OutOfTabs =>
                {
                    has_out_of_tabs = true;
                }
                _ => {}
            }
        }
        if has_out_of_tabs {
            panels.insert(0, PanelKey::OutOfTabs);
        }
        panels
    }

    /// Title of a panel; the synthetic panel has none.
    #[must_use]
    pub fn panel_title(&self, panel: PanelKey) -> Option<&str> {
        match panel {
            PanelKey::OutOfTabs => None,
            PanelKey::Panel(id) => self.get(id).and_then(|node| node.title.as_deref()),
        }
    }

    /// Deepest nesting level of any live node.
    #[must_use]
    pub fn max_nesting(&self) -> u32 {
        self.nodes
            .iter()
            .flatten()
            .map(|node| node.nesting_level)
            .max()
            .unwrap_or(0)
    }
}
