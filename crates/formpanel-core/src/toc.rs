//! Table of contents of linear layouts.

#![allow(missing_docs)]

use crate::chrome::Chrome;
use crate::error::FormError;
use crate::form::Form;
use crate::status::StatusClass;
use crate::tree::PanelKey;

/// One navigable top-level panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocItem {
    pub panel: PanelKey,
    pub title: String,
    pub class: StatusClass,
}

/// Items mirror their panel's badge class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOfContents {
    items: Vec<TocItem>,
}

impl TableOfContents {
    /// One item per top-level panel, out-of-tabs content first.
    #[must_use]
    pub fn build<C: Chrome>(form: &Form<C>) -> Self {
        let items = form
            .panels()
            .into_iter()
            .map(|panel| TocItem {
                panel,
                title: form.panel_title(panel),
                class: form.panel_class(panel),
            })
            .collect();
        Self { items }
    }

    #[must_use]
    pub fn items(&self) -> &[TocItem] {
        &self.items
    }

    /// Mirrors a panel class; returns the index of the item that changed.
    pub(crate) fn set_class(&mut self, panel: PanelKey, class: StatusClass) -> Option<usize> {
        let index = self.items.iter().position(|item| item.panel == panel)?;
        let item = &mut self.items[index];
        if item.class == class {
            return None;
        }
        item.class = class;
        Some(index)
    }

    /// Numbered text rendering, one item per line.
    #[must_use]
    pub fn render(&self) -> String {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| match item.class {
                StatusClass::Empty => format!("{}. {}", index + 1, item.title),
                class => format!("{}. {} [{}]", index + 1, item.title, class.as_str()),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<C: Chrome> Form<C> {
    /// Table of contents; only linear layouts have one.
    #[must_use]
    pub fn toc(&self) -> Option<&TableOfContents> {
        self.toc.as_ref()
    }

    /// Focuses the panel of TOC item `index`.
    pub fn activate_toc_item(&mut self, index: usize) -> Result<(), FormError> {
        let panel = self
            .toc
            .as_ref()
            .and_then(|toc| toc.items.get(index))
            .map(|item| item.panel)
            .ok_or(FormError::UnknownTocItem(index))?;
        self.focus_panel(panel);
        Ok(())
    }
}
