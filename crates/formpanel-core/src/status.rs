//! Status propagation to top-level panels.
//!
//! A panel's status is recomputed from scratch out of the fields, repeaters
//! and checkers it owns. The chrome is only touched when the class or the
//! tooltip actually differ from what it shows, and then inside one
//! suspend/resume bracket.

#![allow(missing_docs)]

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::checker::CheckerStatus;
use crate::chrome::Chrome;
use crate::form::Form;
use crate::tree::{NodeId, NodeKind, PanelKey};

/// Tooltip line of a checker whose result is stale.
pub const STALE_CHECKER_TEXT: &str = "the linked fields changed since the last test";

/// Badge class of a panel, by precedence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusClass {
    #[default]
    Empty,
    Comment,
    Warning,
    Error,
}

impl StatusClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "",
            Self::Comment => "comment",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// Tooltip registered on a panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelTooltip {
    pub title: String,
    pub text: String,
}

/// What the chrome currently shows for a panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub class: StatusClass,
    pub tooltip: Option<PanelTooltip>,
}

/// Messages collected for one panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelStatus {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub comments: Vec<String>,
}

impl PanelStatus {
    /// Error beats warning, warning beats comment.
    #[must_use]
    pub fn class(&self) -> StatusClass {
        if !self.errors.is_empty() {
            StatusClass::Error
        } else if !self.warnings.is_empty() {
            StatusClass::Warning
        } else if !self.comments.is_empty() {
            StatusClass::Comment
        } else {
            StatusClass::Empty
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.class() == StatusClass::Empty
    }

    /// Tooltip body: one counted header per non-empty section.
    #[must_use]
    pub fn tooltip_text(&self) -> String {
        let mut lines = Vec::new();
        for (messages, singular, plural) in [
            (&self.errors, "error", "errors"),
            (&self.warnings, "warning", "warnings"),
            (&self.comments, "comment", "comments"),
        ] {
            if messages.is_empty() {
                continue;
            }
            let word = if messages.len() == 1 { singular } else { plural };
            lines.push(format!("{} {word}", messages.len()));
            lines.extend(messages.iter().map(|message| format!("- {message}")));
        }
        lines.join("\n")
    }
}

impl<C: Chrome> Form<C> {
    /// Collects the messages of everything `panel` owns.
    #[must_use]
    pub fn panel_status(&self, panel: PanelKey) -> PanelStatus {
        let mut status = PanelStatus::default();
        for id in self.panel_members(panel) {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            match &node.kind {
                NodeKind::Field(field) if !self.is_hidden(id) => {
                    let label = self.qualified_label(id, panel);
                    status.errors.extend(
                        field
                            .validity
                            .active_errors()
                            .iter()
                            .map(|error| format!("Field '{label}': {error}")),
                    );
                    status.warnings.extend(
                        field
                            .validity
                            .active_warnings()
                            .iter()
                            .map(|warning| format!("Field '{label}': {warning}")),
                    );
                    if self.options.show_comments {
                        if let Some(comment) = field.comments.first() {
                            status.comments.push(format!("{label} : {}", comment.display()));
                        }
                    }
                }
                NodeKind::Repeater(repeater) if !self.tree.is_switched_off(id) => {
                    let label = self.qualified_label(id, panel);
                    status.errors.extend(
                        repeater
                            .active_errors
                            .iter()
                            .map(|error| format!("Field '{label}': {error}")),
                    );
                }
                _ => {}
            }
        }
        for (_, checker) in self.checkers.iter() {
            if self.panel_of(checker.location) != panel {
                continue;
            }
            match checker.status {
                CheckerStatus::Failure => status.errors.push(format!(
                    "Field checker '{}': {}",
                    checker.label,
                    checker.error_msg.as_deref().unwrap_or_default()
                )),
                CheckerStatus::Warning => status.warnings.push(format!(
                    "Field checker '{}': {STALE_CHECKER_TEXT}",
                    checker.label
                )),
                _ => {}
            }
        }
        status
    }

    /// Class the chrome currently shows for a panel.
    #[must_use]
    pub fn panel_class(&self, panel: PanelKey) -> StatusClass {
        self.panel_states
            .get(&panel)
            .map(|state| state.class)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn panel_tooltip(&self, panel: PanelKey) -> Option<&PanelTooltip> {
        self.panel_states
            .get(&panel)
            .and_then(|state| state.tooltip.as_ref())
    }

    /// Display title of a panel.
    #[must_use]
    pub fn panel_title(&self, panel: PanelKey) -> String {
        self.tree
            .panel_title(panel)
            .unwrap_or("General")
            .to_string()
    }

    /// Refreshes the badge of one panel.
    ///
    /// Panels in first edition are left alone unless `force`; a forced
    /// update that finds anything ends the first edition.
    pub fn update_panel(&mut self, panel: PanelKey, force: bool) {
        if !self.ready || (!force && self.is_first_edition(panel)) {
            return;
        }
        let status = self.panel_status(panel);
        if force && !status.is_empty() {
            self.seen_panels.insert(panel);
        }
        let class = status.class();
        let tooltip = (!status.is_empty()).then(|| PanelTooltip {
            title: self.panel_title(panel),
            text: status.tooltip_text(),
        });
        let previous = self.panel_states.get(&panel).cloned().unwrap_or_default();
        let class_changed = previous.class != class;
        let tooltip_changed = previous.tooltip != tooltip;
        if !class_changed && !tooltip_changed {
            return;
        }

        self.suspend();
        if class_changed {
            self.chrome.set_panel_class(panel, class);
            let item = self.toc.as_mut().and_then(|toc| toc.set_class(panel, class));
            if let Some(item) = item {
                self.chrome.set_toc_class(item, class);
            }
        }
        if tooltip_changed {
            match &tooltip {
                Some(tooltip) => self.chrome.register_tooltip(panel, tooltip),
                None => self.chrome.unregister_tooltip(panel),
            }
        }
        self.resume();
        debug!(?panel, class = class.as_str(), "panel status updated");
        self.panel_states.insert(panel, PanelState { class, tooltip });
    }

    /// Refreshes every panel.
    pub fn update_all_panels(&mut self, force: bool) {
        self.suspend();
        for panel in self.panels() {
            self.update_panel(panel, force);
        }
        self.resume();
    }

    /// Refreshes each listed panel once.
    pub(crate) fn update_panels(&mut self, panels: Vec<PanelKey>) {
        let mut seen = FxHashSet::default();
        let panels: Vec<_> = panels.into_iter().filter(|panel| seen.insert(*panel)).collect();
        if panels.is_empty() {
            return;
        }
        self.suspend();
        for panel in panels {
            self.update_panel(panel, false);
        }
        self.resume();
    }

    /// Titled containers between `panel` and `id`, then the node's own label.
    pub(crate) fn qualified_label(&self, id: NodeId, panel: PanelKey) -> String {
        let stop = match panel {
            PanelKey::Panel(node) => Some(node),
            PanelKey::OutOfTabs => None,
        };
        let mut parts: Vec<String> = self
            .tree
            .ancestors(id)
            .into_iter()
            .take_while(|ancestor| Some(*ancestor) != stop)
            .filter_map(|ancestor| self.tree.get(ancestor))
            .filter(|node| !matches!(node.kind, NodeKind::Tab))
            .filter_map(|node| node.title.clone())
            .filter(|title| !title.is_empty())
            .collect();
        parts.reverse();
        parts.push(self.own_label(id));
        parts.join(" > ")
    }

    /// Every titled container above `id`, panel included, then its label.
    pub(crate) fn full_label(&self, id: NodeId) -> String {
        let mut parts: Vec<String> = self
            .tree
            .ancestors(id)
            .into_iter()
            .filter_map(|ancestor| self.tree.get(ancestor))
            .filter_map(|node| node.title.clone())
            .filter(|title| !title.is_empty())
            .collect();
        parts.reverse();
        parts.push(self.own_label(id));
        parts.join(" > ")
    }

    fn own_label(&self, id: NodeId) -> String {
        match self.tree.get(id).map(|node| (&node.kind, &node.title)) {
            Some((NodeKind::Field(field), _)) => field.plain_label().to_string(),
            Some((NodeKind::Repeater(repeater), _)) => repeater.label.clone(),
            Some((_, Some(title))) => title.clone(),
            _ => String::new(),
        }
    }
}
