//! The form facade.
//!
//! A [`Form`] owns the node arena built from a schema, the checkers declared
//! in it and the per-panel status bookkeeping. The engine modules extend it
//! with their own `impl` blocks: validity tracking, checker runs, status
//! propagation, repeaters, the table of contents and tab-policy changes.

#![allow(missing_docs)]

use formpanel_schema::{PathResolver, Schema, Value, ValuesPayload};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::builder::{checker_control_width, checker_right_margin, Builder, PendingCheckers};
use crate::checker::{CheckerSet, TestResults};
use crate::checks::PendingCheck;
use crate::chrome::{Chrome, NullChrome};
use crate::config::{FormOptions, TabPolicy};
use crate::error::FormError;
use crate::field::Field;
use crate::prefs::Subscription;
use crate::status::PanelState;
use crate::toc::TableOfContents;
use crate::tree::{NodeId, NodeKind, PanelKey, Tree};
use crate::widget::WidgetRegistry;

/// A built form and its live state.
pub struct Form<C: Chrome = NullChrome> {
    pub(crate) schema: Schema,
    pub(crate) options: FormOptions,
    pub(crate) paths: PathResolver,
    pub(crate) registry: WidgetRegistry,
    pub(crate) tree: Tree,
    /// Flat name of every mounted field and repeater.
    pub(crate) names: FxHashMap<SmolStr, NodeId>,
    pub(crate) checkers: CheckerSet,
    pub(crate) chrome: C,
    /// Set once values are loaded; events before that are ignored.
    pub(crate) ready: bool,
    suspended: u32,
    /// Panel of the last focused field.
    pub(crate) focused: Option<PanelKey>,
    /// Panels no longer in first edition.
    pub(crate) seen_panels: FxHashSet<PanelKey>,
    pub(crate) panel_states: FxHashMap<PanelKey, PanelState>,
    pub(crate) test_results: TestResults,
    pub(crate) pending: FxHashMap<u64, PendingCheck>,
    pub(crate) next_ticket: u64,
    pub(crate) toc: Option<TableOfContents>,
    pub(crate) preferences: Option<Subscription>,
}

impl<C: Chrome> std::fmt::Debug for Form<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Form")
            .field("options", &self.options)
            .field("fields", &self.names.len())
            .field("checkers", &self.checkers.len())
            .field("ready", &self.ready)
            .finish_non_exhaustive()
    }
}

impl Form<NullChrome> {
    /// Builds a headless form with the built-in widgets.
    pub fn build(schema: Schema, options: FormOptions) -> Result<Self, FormError> {
        Self::new(schema, options, NullChrome)
    }
}

impl<C: Chrome> Form<C> {
    pub fn new(schema: Schema, options: FormOptions, chrome: C) -> Result<Self, FormError> {
        Self::with_registry(schema, options, WidgetRegistry::default(), chrome)
    }

    /// Builds a form whose field types resolve through `registry`.
    pub fn with_registry(
        schema: Schema,
        options: FormOptions,
        registry: WidgetRegistry,
        chrome: C,
    ) -> Result<Self, FormError> {
        let paths = PathResolver::new(
            options.separator.clone(),
            options.field_name_prefix.clone(),
        );
        let mut form = Self {
            schema,
            options,
            paths,
            registry,
            tree: Tree::new(),
            names: FxHashMap::default(),
            checkers: CheckerSet::default(),
            chrome,
            ready: false,
            suspended: 0,
            focused: None,
            seen_panels: FxHashSet::default(),
            panel_states: FxHashMap::default(),
            test_results: TestResults::default(),
            pending: FxHashMap::default(),
            next_ticket: 1,
            toc: None,
            preferences: None,
        };
        form.layout()?;
        Ok(form)
    }

    /// Mounts the schema into a fresh tree and registers its checkers.
    pub(crate) fn layout(&mut self) -> Result<(), FormError> {
        self.tree.reset(self.options.field_name_prefix.clone());
        self.names.clear();
        self.checkers.clear();
        self.pending.clear();
        self.panel_states.clear();
        self.seen_panels.clear();
        self.focused = None;
        self.toc = None;
        let mut builder = Builder {
            tree: &mut self.tree,
            registry: &self.registry,
            paths: &self.paths,
            policy: self.options.tab_policy,
            names: &mut self.names,
            checkers: Vec::new(),
        };
        builder.build_body(NodeId::ROOT, &self.schema.body)?;
        let pending = builder.checkers;
        self.register_checkers(pending)?;
        self.refresh_structure();
        debug!(
            fields = self.names.len(),
            checkers = self.checkers.len(),
            policy = self.options.tab_policy.as_str(),
            "form laid out"
        );
        Ok(())
    }

    pub(crate) fn register_checkers(&mut self, pending: Vec<PendingCheckers>) -> Result<(), FormError> {
        for location in pending {
            self.add_checkers(location)?;
        }
        Ok(())
    }

    /// Re-derives everything that depends on values: disable conditions,
    /// switchers, entry titles and field validity.
    pub(crate) fn refresh_structure(&mut self) {
        self.refresh_conditions();
        self.apply_switchers();
        self.refresh_all_titles();
    }

    /// Applies a values payload, then marks the form ready.
    ///
    /// Repeater sizes are applied first so the values of their entries find
    /// their fields. Unknown paths are logged and skipped.
    pub fn set_values(&mut self, payload: &ValuesPayload) -> Result<(), FormError> {
        self.ready = false;
        self.suspend();
        let applied = self.apply_payload(payload);
        self.resume();
        applied?;
        self.mark_ready();
        Ok(())
    }

    fn apply_payload(&mut self, payload: &ValuesPayload) -> Result<(), FormError> {
        for size in &payload.repeaters {
            let name = self.paths.absolute(&size.path);
            match self.names.get(name.as_str()).copied() {
                Some(id) if self.tree.get(id).and_then(|n| n.as_repeater()).is_some() => {
                    self.load_repeater(id, size.count)?;
                }
                _ => warn!(repeater = %size.path, "values payload names an unknown repeater"),
            }
        }
        let mut touched = Vec::new();
        for (path, value) in &payload.values {
            match self.lookup_field(path) {
                Some(id) => {
                    if let Some(field) = self.tree.field_mut(id) {
                        field.set_value(value);
                    }
                    touched.push(id);
                }
                None => warn!(field = %path, "values payload names an unknown field"),
            }
        }
        for (path, raw) in &payload.invalid {
            match self.lookup_field(path) {
                Some(id) => {
                    if let Some(field) = self.tree.field_mut(id) {
                        field.set_raw_value(raw);
                    }
                    touched.push(id);
                }
                None => warn!(field = %path, "values payload names an unknown field"),
            }
        }
        for (path, comments) in &payload.comments {
            match self.lookup_field(path) {
                Some(id) => {
                    if let Some(field) = self.tree.field_mut(id) {
                        field.comments.set(comments);
                    }
                }
                None => warn!(field = %path, "comments payload names an unknown field"),
            }
        }
        self.refresh_structure();
        for id in touched {
            self.validate_field(id);
        }
        Ok(())
    }

    /// Starts listening to field events and shows the initial status.
    pub fn mark_ready(&mut self) {
        self.ready = true;
        for id in self.checkers.ids() {
            self.initialize_checker(id);
        }
        self.update_test_results();
        if self.options.tab_policy == TabPolicy::Linear {
            self.toc = Some(TableOfContents::build(self));
        }
        self.update_all_panels(true);
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Current value of a field, by flat name (with or without the form prefix).
    pub fn get_value(&self, name: &str) -> Result<&Value, FormError> {
        let id = self.field_id(name)?;
        self.tree
            .field(id)
            .map(|field| &field.value)
            .ok_or_else(|| FormError::UnknownField(name.into()))
    }

    /// Every value to submit, in document order: field values plus the
    /// repeater bookkeeping entries.
    #[must_use]
    pub fn values(&self) -> IndexMap<SmolStr, Value> {
        let sep = self.paths.separator();
        let mut out = IndexMap::new();
        for id in self.tree.all() {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            match &node.kind {
                NodeKind::Field(field) => {
                    out.insert(field.name.clone(), field.value.clone());
                }
                NodeKind::Repeater(repeater) => {
                    out.insert(
                        SmolStr::new(format!("_{}{sep}size", repeater.name)),
                        Value::from(node.children.len()),
                    );
                }
                NodeKind::Entry(entry) => {
                    let previous = entry
                        .previous_position
                        .and_then(|position| i64::try_from(position).ok())
                        .unwrap_or(-1);
                    let repeater = node
                        .parent
                        .and_then(|parent| self.tree.get(parent))
                        .and_then(|parent| parent.as_repeater());
                    if let Some(repeater) = repeater {
                        out.insert(
                            SmolStr::new(format!(
                                "_{}{sep}{}{sep}previous-position",
                                repeater.name, entry.position
                            )),
                            Value::from(previous),
                        );
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Flat names of every mounted field, in document order.
    #[must_use]
    pub fn field_names(&self) -> Vec<SmolStr> {
        self.tree
            .all()
            .into_iter()
            .filter_map(|id| self.tree.field(id))
            .map(|field| field.name.clone())
            .collect()
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.lookup_field(name).and_then(|id| self.tree.field(id))
    }

    #[must_use]
    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    #[must_use]
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    #[must_use]
    pub fn chrome(&self) -> &C {
        &self.chrome
    }

    pub fn chrome_mut(&mut self) -> &mut C {
        &mut self.chrome
    }

    #[must_use]
    pub fn test_results(&self) -> TestResults {
        self.test_results
    }

    /// Top-level panels in display order.
    #[must_use]
    pub fn panels(&self) -> Vec<PanelKey> {
        let mut panels = self.tree.panels();
        let root_checkers = self
            .checkers
            .iter()
            .any(|(_, checker)| self.panel_of(checker.location) == PanelKey::OutOfTabs);
        if root_checkers && !panels.contains(&PanelKey::OutOfTabs) {
            panels.insert(0, PanelKey::OutOfTabs);
        }
        panels
    }

    /// Width and right margin of the control of the checker at `location`.
    #[must_use]
    pub fn checker_control_layout(&self, location: NodeId) -> (u32, u32) {
        let offsets = self
            .tree
            .get(location)
            .map(|node| node.offsets)
            .unwrap_or_default();
        (
            checker_control_width(offsets),
            checker_right_margin(self.tree.max_nesting(), offsets),
        )
    }

    pub(crate) fn panel_of(&self, id: NodeId) -> PanelKey {
        self.tree
            .get(id)
            .map_or(PanelKey::OutOfTabs, |node| node.panel)
    }

    /// Field node for a flat name, with or without the form prefix.
    pub(crate) fn lookup_field(&self, name: &str) -> Option<NodeId> {
        let id = self
            .names
            .get(name)
            .or_else(|| self.names.get(self.paths.absolute(name).as_str()))
            .copied()?;
        self.tree.field(id).map(|_| id)
    }

    pub(crate) fn field_id(&self, name: &str) -> Result<NodeId, FormError> {
        self.lookup_field(name)
            .ok_or_else(|| FormError::UnknownField(name.into()))
    }

    pub(crate) fn repeater_id(&self, name: &str) -> Result<NodeId, FormError> {
        self.names
            .get(name)
            .or_else(|| self.names.get(self.paths.absolute(name).as_str()))
            .copied()
            .filter(|id| self.tree.get(*id).and_then(|node| node.as_repeater()).is_some())
            .ok_or_else(|| FormError::UnknownRepeater(name.into()))
    }

    /// Hidden by declaration or by a switcher.
    pub(crate) fn is_hidden(&self, id: NodeId) -> bool {
        self.tree
            .field(id)
            .is_some_and(|field| field.declared_hidden)
            || self.tree.is_switched_off(id)
    }

    /// Revalidates one field without emitting anything; returns `true` when
    /// its errors changed.
    pub(crate) fn validate_field(&mut self, id: NodeId) -> bool {
        let hidden = self.is_hidden(id);
        let Some(field) = self.tree.field_mut(id) else {
            return false;
        };
        let changed = field.validate(hidden);
        tracing::trace!(field = %field.name, errors = field.validity.active_errors().len(), changed, "field revalidated");
        changed
    }

    /// Fields and repeaters owned by `panel`.
    pub(crate) fn panel_members(&self, panel: PanelKey) -> Vec<NodeId> {
        self.tree
            .all()
            .into_iter()
            .filter(|id| {
                self.tree.get(*id).is_some_and(|node| {
                    node.panel == panel
                        && matches!(node.kind, NodeKind::Field(_) | NodeKind::Repeater(_))
                })
            })
            .collect()
    }

    pub(crate) fn suspend(&mut self) {
        if self.suspended == 0 {
            self.chrome.suspend_layouts();
        }
        self.suspended += 1;
    }

    pub(crate) fn resume(&mut self) {
        match self.suspended {
            0 => {}
            1 => {
                self.suspended = 0;
                self.chrome.resume_layouts();
            }
            _ => self.suspended -= 1,
        }
    }
}
