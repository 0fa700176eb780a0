//! Seam between the engine and the surrounding UI.
//!
//! The engine never renders. It tells a [`Chrome`] implementation which
//! panel classes, tooltips and checker controls changed, always between a
//! `suspend_layouts`/`resume_layouts` pair when several mutations belong to
//! one update.

#![allow(missing_docs)]

use crate::checker::{CheckerId, CheckerStatus, ControlState, TestResults};
use crate::config::TabPolicy;
use crate::status::{PanelTooltip, StatusClass};
use crate::tree::PanelKey;

/// Modal error report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDialog {
    pub title: String,
    pub text: String,
    /// One entry per failing checker.
    pub details: Vec<String>,
}

/// UI collaborator notified of every visible state change.
///
/// Every method defaults to a no-op so hosts implement only what they show.
#[allow(unused_variables)]
pub trait Chrome {
    fn suspend_layouts(&mut self) {}

    fn resume_layouts(&mut self) {}

    /// Status class of a top-level panel changed.
    fn set_panel_class(&mut self, panel: PanelKey, class: StatusClass) {}

    fn register_tooltip(&mut self, panel: PanelKey, tooltip: &PanelTooltip) {}

    fn unregister_tooltip(&mut self, panel: PanelKey) {}

    /// Status class of a table of contents item changed.
    fn set_toc_class(&mut self, item: usize, class: StatusClass) {}

    fn set_checker_control(&mut self, checker: CheckerId, control: ControlState, status: CheckerStatus) {}

    fn test_results_changed(&mut self, results: TestResults) {}

    fn show_error(&mut self, dialog: &ErrorDialog) {}

    /// The node tree was rebuilt under a new tab policy.
    fn layout_rebuilt(&mut self, policy: TabPolicy) {}
}

/// Chrome that shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullChrome;

impl Chrome for NullChrome {}

/// One recorded chrome call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChromeEvent {
    Suspend,
    Resume,
    PanelClass(PanelKey, StatusClass),
    RegisterTooltip(PanelKey, PanelTooltip),
    UnregisterTooltip(PanelKey),
    TocClass(usize, StatusClass),
    CheckerControl(CheckerId, ControlState, CheckerStatus),
    TestResults(TestResults),
    Error(ErrorDialog),
    LayoutRebuilt(TabPolicy),
}

/// Chrome that records every call, for tests and headless reports.
#[derive(Debug, Clone, Default)]
pub struct RecordingChrome {
    pub events: Vec<ChromeEvent>,
}

impl RecordingChrome {
    /// Returns the recorded events and starts over.
    pub fn take(&mut self) -> Vec<ChromeEvent> {
        std::mem::take(&mut self.events)
    }

    /// Number of calls that changed something visible.
    #[must_use]
    pub fn mutations(&self) -> usize {
        self.events
            .iter()
            .filter(|event| !matches!(event, ChromeEvent::Suspend | ChromeEvent::Resume))
            .count()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&ErrorDialog> {
        self.events.iter().rev().find_map(|event| match event {
            ChromeEvent::Error(dialog) => Some(dialog),
            _ => None,
        })
    }

    #[must_use]
    pub fn test_results(&self) -> Vec<TestResults> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ChromeEvent::TestResults(results) => Some(*results),
                _ => None,
            })
            .collect()
    }
}

impl Chrome for RecordingChrome {
    fn suspend_layouts(&mut self) {
        self.events.push(ChromeEvent::Suspend);
    }

    fn resume_layouts(&mut self) {
        self.events.push(ChromeEvent::Resume);
    }

    fn set_panel_class(&mut self, panel: PanelKey, class: StatusClass) {
        self.events.push(ChromeEvent::PanelClass(panel, class));
    }

    fn register_tooltip(&mut self, panel: PanelKey, tooltip: &PanelTooltip) {
        self.events
            .push(ChromeEvent::RegisterTooltip(panel, tooltip.clone()));
    }

    fn unregister_tooltip(&mut self, panel: PanelKey) {
        self.events.push(ChromeEvent::UnregisterTooltip(panel));
    }

    fn set_toc_class(&mut self, item: usize, class: StatusClass) {
        self.events.push(ChromeEvent::TocClass(item, class));
    }

    fn set_checker_control(&mut self, checker: CheckerId, control: ControlState, status: CheckerStatus) {
        self.events
            .push(ChromeEvent::CheckerControl(checker, control, status));
    }

    fn test_results_changed(&mut self, results: TestResults) {
        self.events.push(ChromeEvent::TestResults(results));
    }

    fn show_error(&mut self, dialog: &ErrorDialog) {
        self.events.push(ChromeEvent::Error(dialog.clone()));
    }

    fn layout_rebuilt(&mut self, policy: TabPolicy) {
        self.events.push(ChromeEvent::LayoutRebuilt(policy));
    }
}
