//! Engine errors.

#![allow(missing_docs)]

use formpanel_schema::SchemaError;
use smol_str::SmolStr;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised by the form engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    /// The schema could not be read.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// No widget factory is registered for a type tag.
    #[error("unknown widget type '{0}'")]
    UnknownWidget(SmolStr),

    /// No mounted field has this name.
    #[error("unknown field '{0}'")]
    UnknownField(SmolStr),

    /// No mounted repeater has this name.
    #[error("unknown repeater '{0}'")]
    UnknownRepeater(SmolStr),

    /// Two mounted nodes resolve to the same flat name.
    #[error("duplicate field name '{0}'")]
    DuplicateName(SmolStr),

    /// A switcher names a missing or non-boolean child.
    #[error("switcher '{switcher}' of '{group}' is not a boolean child field")]
    InvalidSwitcher { group: SmolStr, switcher: SmolStr },

    /// A validation pattern does not compile.
    #[error("invalid pattern for field '{field}': {message}")]
    InvalidPattern { field: SmolStr, message: SmolStr },

    /// Adding an entry would exceed the repeater's max size.
    #[error("repeater '{name}' already holds its maximum of {max} entries")]
    RepeaterFull { name: SmolStr, max: usize },

    /// Removing an entry would go below the repeater's min size.
    #[error("repeater '{name}' already holds its minimum of {min} entries")]
    RepeaterAtMinimum { name: SmolStr, min: usize },

    /// Entry position outside `1..=count`.
    #[error("repeater '{name}' has no entry {position} (count {count})")]
    EntryOutOfRange {
        name: SmolStr,
        position: usize,
        count: usize,
    },

    /// Checker status code outside the known range.
    #[error("unknown checker status {0}")]
    UnknownStatus(u8),

    /// No check is pending under this ticket.
    #[error("unknown check ticket {0}")]
    UnknownTicket(u64),

    /// A checker links to a field that does not exist.
    #[error("checker '{checker}' links to unknown field '{field}'")]
    UnknownLinkedField { checker: SmolStr, field: SmolStr },

    /// Table of contents item index out of range.
    #[error("no table of contents item {0}")]
    UnknownTocItem(usize),

    /// Invalid configuration value.
    #[error("invalid config: {0}")]
    InvalidConfig(SmolStr),

    /// The test endpoint could not be reached or answered badly.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The test endpoint answered with an unreadable body.
    #[error("invalid check response: {0}")]
    InvalidResponse(SmolStr),

    /// The check request could not be encoded.
    #[error("cannot encode check request: {0}")]
    Encode(SmolStr),
}
