//! Field checkers: status codes, registration order and the checker set.

#![allow(missing_docs)]

use std::cmp::Ordering;

use formpanel_schema::CheckerDecl;
use smol_str::SmolStr;

use crate::error::FormError;
use crate::tree::NodeId;

/// Index of a checker in its [`CheckerSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CheckerId(pub u32);

/// Status of a checker; the discriminants are the wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CheckerStatus {
    NotTested = 0,
    Success = 1,
    Failure = 2,
    Deactivated = 3,
    Warning = 4,
    Hidden = 5,
}

impl CheckerStatus {
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Statuses a check can be launched from.
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Deactivated | Self::Hidden)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotTested => "not tested",
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Deactivated => "deactivated",
            Self::Warning => "warning",
            Self::Hidden => "hidden",
        }
    }
}

impl TryFrom<u8> for CheckerStatus {
    type Error = FormError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::NotTested),
            1 => Ok(Self::Success),
            2 => Ok(Self::Failure),
            3 => Ok(Self::Deactivated),
            4 => Ok(Self::Warning),
            5 => Ok(Self::Hidden),
            other => Err(FormError::UnknownStatus(other)),
        }
    }
}

/// State of the control launching a checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlState {
    pub enabled: bool,
    /// Masked while a check is outstanding.
    pub masked: bool,
    pub visible: bool,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            enabled: true,
            masked: false,
            visible: true,
        }
    }
}

/// A registered checker.
#[derive(Debug, Clone)]
pub struct FieldChecker {
    pub id: SmolStr,
    pub label: String,
    pub description: String,
    pub order: Option<i64>,
    pub icon_glyph: Option<String>,
    pub small_icon_path: Option<String>,
    /// Linked field references as declared.
    pub references: Vec<SmolStr>,
    /// Prefix of the location; the wire key is this prefix plus the id.
    pub prefix: SmolStr,
    /// Node the checker decorates.
    pub location: NodeId,
    /// Field node the checker is attached to, when located on a field.
    pub field: Option<NodeId>,
    pub linked: Vec<NodeId>,
    pub status: CheckerStatus,
    pub error_msg: Option<String>,
    /// Status to restore when a switcher shows the checker again.
    pub saved_status: Option<CheckerStatus>,
    /// Ticket of the outstanding check, if any.
    pub in_flight: Option<u64>,
    pub control: ControlState,
}

impl FieldChecker {
    #[must_use]
    pub fn new(decl: &CheckerDecl, prefix: SmolStr, location: NodeId, field: Option<NodeId>) -> Self {
        Self {
            id: decl.id.clone(),
            label: decl.label.clone(),
            description: decl.description.clone(),
            order: decl.order,
            icon_glyph: decl.icon_glyph.clone(),
            small_icon_path: decl.small_icon_path.clone(),
            references: decl.linked_fields.clone(),
            prefix,
            location,
            field,
            linked: Vec::new(),
            status: CheckerStatus::NotTested,
            error_msg: None,
            saved_status: None,
            in_flight: None,
            control: ControlState::default(),
        }
    }

    /// Key identifying the checker in requests and responses.
    #[must_use]
    pub fn key(&self) -> SmolStr {
        SmolStr::new(format!("{}{}", self.prefix, self.id))
    }

    /// Warning attached to linked fields while the checker fails.
    #[must_use]
    pub fn warning_text(&self) -> String {
        format!(
            "Field checker '{}' failed: this field may be misconfigured",
            self.label
        )
    }
}

/// Counters over every registered checker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestResults {
    pub successes: usize,
    pub failures: usize,
    /// Not tested, warning and deactivated checkers.
    pub not_tested: usize,
}

impl TestResults {
    /// Hidden checkers are left out of every counter.
    pub fn collect(statuses: impl IntoIterator<Item = CheckerStatus>) -> Self {
        let mut results = Self::default();
        for status in statuses {
            match status {
                CheckerStatus::Success => results.successes += 1,
                CheckerStatus::Failure => results.failures += 1,
                CheckerStatus::NotTested | CheckerStatus::Warning | CheckerStatus::Deactivated => {
                    results.not_tested += 1;
                }
                CheckerStatus::Hidden => {}
            }
        }
        results
    }
}

/// Registration comparator. Missing, zero or equal orders never compare
/// equal, they compare as "after".
#[must_use]
pub fn compare_by_order(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if a != 0 && b != 0 && a != b => a.cmp(&b),
        _ => Ordering::Greater,
    }
}

/// Orders checkers sharing one location by binary insertion with
/// [`compare_by_order`]. The comparator is not a total order, so the
/// result depends on declaration order.
#[must_use]
pub fn sort_by_order(decls: &[CheckerDecl]) -> Vec<CheckerDecl> {
    if decls.len() <= 1 {
        return decls.to_vec();
    }
    let mut sorted: Vec<CheckerDecl> = Vec::with_capacity(decls.len());
    for decl in decls {
        let (mut low, mut high) = (0, sorted.len());
        while low < high {
            let mid = (low + high) / 2;
            if compare_by_order(decl.order, sorted[mid].order) == Ordering::Less {
                high = mid;
            } else {
                low = mid + 1;
            }
        }
        sorted.insert(low, decl.clone());
    }
    sorted
}

/// Slot storage of the checkers of one form; removed slots stay empty.
#[derive(Debug, Clone, Default)]
pub struct CheckerSet {
    slots: Vec<Option<FieldChecker>>,
}

impl CheckerSet {
    pub fn push(&mut self, checker: FieldChecker) -> CheckerId {
        let id = CheckerId(u32::try_from(self.slots.len()).unwrap_or(u32::MAX));
        self.slots.push(Some(checker));
        id
    }

    pub fn remove(&mut self, id: CheckerId) -> Option<FieldChecker> {
        self.slots.get_mut(id.0 as usize).and_then(Option::take)
    }

    #[must_use]
    pub fn get(&self, id: CheckerId) -> Option<&FieldChecker> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: CheckerId) -> Option<&mut FieldChecker> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    /// Live checkers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (CheckerId, &FieldChecker)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            let id = CheckerId(u32::try_from(index).unwrap_or(u32::MAX));
            slot.as_ref().map(|checker| (id, checker))
        })
    }

    #[must_use]
    pub fn ids(&self) -> Vec<CheckerId> {
        self.iter().map(|(id, _)| id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checker whose key is `key`.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<CheckerId> {
        self.iter()
            .find(|(_, checker)| checker.key() == key)
            .map(|(id, _)| id)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    #[must_use]
    pub fn test_results(&self) -> TestResults {
        TestResults::collect(self.iter().map(|(_, checker)| checker.status))
    }
}
