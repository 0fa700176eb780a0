//! `formpanel-core` - Validity and status engine for dynamic CMS forms.
//!
//! A [`Form`] is built from a [`formpanel_schema::Schema`] and owns:
//!
//! - **Node tree**: fields, fieldsets, composites, tabs and repeater entries
//!   in an arena with explicit parent pointers and owning panels
//! - **Validity tracking**: per-field errors and warnings, first-edition
//!   state per top-level panel
//! - **Field checkers**: server-verified checks over groups of fields, run in
//!   batches through a [`CheckTransport`]
//! - **Status propagation**: panel badges and tooltips pushed to a
//!   [`Chrome`] only when they change
//!
//! # Example
//!
//! ```ignore
//! use formpanel_core::{Form, FormOptions};
//! use formpanel_schema::json;
//!
//! let schema = json::parse_schema(r#"{"title": {"type": "string", "validation": {"mandatory": true}}}"#)?;
//! let mut form = Form::build(schema, FormOptions::default())?;
//! form.set_values(&Default::default())?;
//! assert!(!form.is_valid());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

mod builder;
pub mod checker;
mod checks;
pub mod chrome;
pub mod config;
pub mod error;
pub mod field;
mod form;
pub mod prefs;
pub mod repeater;
pub mod status;
pub mod toc;
pub mod transport;
pub mod tree;
mod validity;
pub mod widget;

pub use builder::{
    checker_control_width, checker_right_margin, FIELD_MINWIDTH, LABEL_WIDTH, OFFSET_FIELDSET,
    PADDING_FIELDSET, PADDING_TAB,
};
pub use checker::{CheckerId, CheckerStatus, ControlState, FieldChecker, TestResults};
pub use checks::{CheckOutcome, CheckStart, CheckTicket, INVALID_LINKED_FIELD};
pub use chrome::{Chrome, ChromeEvent, ErrorDialog, NullChrome, RecordingChrome};
pub use config::{FormOptions, TabPolicy};
pub use error::FormError;
pub use field::{Comment, CommentState, Field, ValidityState};
pub use form::Form;
pub use prefs::{PreferenceHub, Subscription};
pub use repeater::MoveDirection;
pub use status::{PanelStatus, PanelTooltip, StatusClass};
pub use toc::{TableOfContents, TocItem};
pub use transport::{CheckRequest, CheckResponse, CheckTransport, CheckerInfo, TransportError};
pub use tree::{NodeId, PanelKey};
pub use widget::{Widget, WidgetRegistry};
