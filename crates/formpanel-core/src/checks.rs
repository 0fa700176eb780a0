//! Field-checker engine.
//!
//! Checks run in two phases so the engine never blocks on the network:
//! [`Form::begin_check`] freezes the controls of the eligible checkers and
//! hands back the request to send, [`Form::complete_check`] applies whatever
//! the transport produced. [`Form::check_with`] chains both for synchronous
//! transports.

#![allow(missing_docs)]

use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::builder::PendingCheckers;
use crate::checker::{sort_by_order, CheckerId, CheckerStatus, ControlState, FieldChecker};
use crate::chrome::{Chrome, ErrorDialog};
use crate::error::FormError;
use crate::form::Form;
use crate::transport::{CheckRequest, CheckResponse, CheckTransport, CheckerInfo, TransportError};
use crate::tree::{NodeId, PanelKey};

/// Message of a checker short-circuited by an invalid linked field.
pub const INVALID_LINKED_FIELD: &str = "invalid linked field";

/// Checkers of one outstanding batch, with the key each was sent under.
#[derive(Debug, Clone)]
pub(crate) struct PendingCheck {
    pub checkers: Vec<(CheckerId, SmolStr)>,
    pub short_circuited: Vec<CheckerId>,
    pub display_errors: bool,
}

/// Handle of an outstanding batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckTicket(pub u64);

/// Result of [`Form::begin_check`].
#[derive(Debug, Clone, PartialEq)]
pub enum CheckStart {
    /// Nothing needed the endpoint; the outcome is already applied.
    Immediate(CheckOutcome),
    /// `request` must be sent, then passed back via [`Form::complete_check`].
    Pending {
        ticket: CheckTicket,
        request: CheckRequest,
    },
}

/// Checkers a batch updated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Every checker that got a new status, short-circuited ones included.
    pub tested: Vec<CheckerId>,
    pub failures: Vec<CheckerId>,
}

impl CheckOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

impl<C: Chrome> Form<C> {
    /// Registers the checkers declared at one location, in `order` order.
    pub(crate) fn add_checkers(
        &mut self,
        pending: PendingCheckers,
    ) -> Result<Vec<CheckerId>, FormError> {
        let mut added = Vec::new();
        for decl in sort_by_order(&pending.decls) {
            let mut checker =
                FieldChecker::new(&decl, pending.prefix.clone(), pending.location, pending.field);
            for reference in &decl.linked_fields {
                let name = self.paths.resolve(&pending.prefix, reference);
                let field = self
                    .names
                    .get(name.as_str())
                    .copied()
                    .filter(|id| self.tree.field(*id).is_some())
                    .ok_or_else(|| FormError::UnknownLinkedField {
                        checker: checker.key(),
                        field: name.clone(),
                    })?;
                checker.linked.push(field);
            }
            debug!(checker = %checker.key(), linked = checker.linked.len(), "checker registered");
            let id = self.checkers.push(checker);
            if self.ready {
                self.initialize_checker(id);
            }
            added.push(id);
        }
        Ok(added)
    }

    /// Puts a checker in its initial status and shows its control.
    pub(crate) fn initialize_checker(&mut self, id: CheckerId) {
        let deactivated = self.all_linked_disabled(id);
        let hidden = self.is_checker_hidden(id);
        let control = self.control_for(if deactivated {
            CheckerStatus::Deactivated
        } else {
            CheckerStatus::NotTested
        });
        let Some(checker) = self.checkers.get_mut(id) else {
            return;
        };
        let status = if deactivated {
            CheckerStatus::Deactivated
        } else {
            CheckerStatus::NotTested
        };
        checker.error_msg = None;
        checker.in_flight = None;
        if hidden {
            checker.saved_status = Some(status);
            checker.status = CheckerStatus::Hidden;
            checker.control = ControlState {
                visible: false,
                ..control
            };
        } else {
            checker.saved_status = None;
            checker.status = status;
            checker.control = control;
        }
        let (control, status) = (checker.control, checker.status);
        self.chrome.set_checker_control(id, control, status);
    }

    /// Reacts to a linked field that changed or was enabled or disabled;
    /// returns the panels whose checkers changed status.
    ///
    /// A checker whose linked fields are all disabled is deactivated. An
    /// untested or deactivated one turns to warning. A tested one keeps its
    /// result until it is checked again.
    pub(crate) fn on_linked_field_event(&mut self, field: NodeId) -> Vec<PanelKey> {
        if !self.ready {
            return Vec::new();
        }
        let mut panels = Vec::new();
        let linked: Vec<_> = self
            .checkers
            .iter()
            .filter(|(_, checker)| checker.linked.contains(&field))
            .map(|(id, _)| id)
            .collect();
        for id in linked {
            let deactivated = self.all_linked_disabled(id);
            let Some(checker) = self.checkers.get(id) else {
                continue;
            };
            if checker.status == CheckerStatus::Hidden {
                let saved = checker.saved_status.unwrap_or(CheckerStatus::NotTested);
                let next = next_status(saved, deactivated);
                if let Some(checker) = self.checkers.get_mut(id) {
                    checker.saved_status = Some(next);
                }
                continue;
            }
            let next = next_status(checker.status, deactivated);
            if next == checker.status {
                continue;
            }
            let control = self.control_of(id, next);
            let location = checker.location;
            if let Some(checker) = self.checkers.get_mut(id) {
                checker.status = next;
                checker.control = control;
            }
            self.chrome.set_checker_control(id, control, next);
            panels.push(self.panel_of(location));
        }
        if !panels.is_empty() {
            self.update_test_results();
        }
        panels
    }

    /// Recomputes the test counters; the chrome hears about changes only.
    pub(crate) fn update_test_results(&mut self) {
        let results = self.checkers.test_results();
        if results != self.test_results {
            self.test_results = results;
            self.chrome.test_results_changed(results);
        }
    }

    /// Attaches or retracts the warning each checker contributes to its
    /// linked fields.
    pub(crate) fn update_warnings(&mut self, ids: &[CheckerId]) {
        for &id in ids {
            let Some(checker) = self.checkers.get(id) else {
                continue;
            };
            let status = checker.status;
            let text = checker.warning_text();
            let linked = checker.linked.clone();
            for field in linked {
                let Some(field) = self.tree.field_mut(field) else {
                    continue;
                };
                match status {
                    CheckerStatus::Failure => {
                        field.validity.add_checker_warning(id, text.clone());
                    }
                    CheckerStatus::Success | CheckerStatus::NotTested => {
                        field.validity.remove_checker_warning(id);
                    }
                    _ => {}
                }
            }
        }
    }

    /// Starts a batch over `selection` (every checker when `None`).
    ///
    /// Checkers already in flight, deactivated or hidden are skipped, and so
    /// are successful ones unless `force_test`. A checker with an invalid
    /// linked field fails on the spot with [`INVALID_LINKED_FIELD`].
    pub fn begin_check(
        &mut self,
        selection: Option<&[CheckerId]>,
        display_errors: bool,
        force_test: bool,
    ) -> Result<CheckStart, FormError> {
        let ids = match selection {
            Some(ids) => ids.to_vec(),
            None => self.checkers.ids(),
        };
        let mut eligible = Vec::new();
        let mut short_circuited = Vec::new();
        for id in ids {
            let Some(checker) = self.checkers.get(id) else {
                continue;
            };
            if checker.in_flight.is_some()
                || !checker.status.is_active()
                || (!force_test && checker.status == CheckerStatus::Success)
            {
                continue;
            }
            if self.has_invalid_linked_field(id) {
                short_circuited.push(id);
            } else {
                eligible.push(id);
            }
        }

        self.suspend();
        for &id in &short_circuited {
            self.set_checker_result(id, Some(INVALID_LINKED_FIELD.to_string()));
        }
        if !short_circuited.is_empty() {
            self.finish_batch(&short_circuited);
        }

        if eligible.is_empty() {
            self.resume();
            let outcome = CheckOutcome {
                failures: short_circuited.clone(),
                tested: short_circuited,
            };
            if display_errors {
                self.display_error_dialog();
            }
            return Ok(CheckStart::Immediate(outcome));
        }

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let mut request = CheckRequest {
            form_values: self.values(),
            ..CheckRequest::default()
        };
        let mut sent = Vec::with_capacity(eligible.len());
        for &id in &eligible {
            let Some(checker) = self.checkers.get_mut(id) else {
                continue;
            };
            checker.in_flight = Some(ticket);
            checker.control.enabled = false;
            checker.control.masked = true;
            let (key, control, status) = (checker.key(), checker.control, checker.status);
            let linked = checker.linked.clone();
            self.chrome.set_checker_control(id, control, status);
            let mut info = CheckerInfo::default();
            for field in linked.iter().filter_map(|field| self.tree.field(*field)) {
                info.raw_test_values.push(field.value.clone());
                info.test_params_names.push(field.name.clone());
            }
            request.checkers.insert(key.clone(), info);
            sent.push((id, key));
        }
        self.resume();
        debug!(ticket, checkers = eligible.len(), "check batch sent");
        self.pending.insert(
            ticket,
            PendingCheck {
                checkers: sent,
                short_circuited,
                display_errors,
            },
        );
        Ok(CheckStart::Pending {
            ticket: CheckTicket(ticket),
            request,
        })
    }

    /// Applies the transport result of a batch.
    ///
    /// On a transport error the controls are restored, the statuses are left
    /// as they were and an error dialog is shown.
    pub fn complete_check(
        &mut self,
        ticket: CheckTicket,
        result: Result<CheckResponse, TransportError>,
    ) -> Result<CheckOutcome, FormError> {
        let pending = self
            .pending
            .remove(&ticket.0)
            .ok_or(FormError::UnknownTicket(ticket.0))?;
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                warn!(ticket = ticket.0, error = %err, "check batch failed");
                self.suspend();
                for &(id, _) in &pending.checkers {
                    let Some(checker) = self.checkers.get(id) else {
                        continue;
                    };
                    let status = checker.status;
                    let control = self.control_for(status);
                    if let Some(checker) = self.checkers.get_mut(id) {
                        checker.in_flight = None;
                        checker.control = control;
                    }
                    self.chrome.set_checker_control(id, control, status);
                }
                self.resume();
                self.chrome.show_error(&ErrorDialog {
                    title: "Field checker error".to_string(),
                    text: "The field checkers could not be run".to_string(),
                    details: vec![err.to_string()],
                });
                return Err(FormError::Transport(err));
            }
        };

        self.suspend();
        let mut outcome = CheckOutcome {
            tested: pending.short_circuited.clone(),
            failures: pending.short_circuited.clone(),
        };
        // Entries renumbered while the batch was out keep the key they were
        // sent under.
        let mut applied = Vec::with_capacity(pending.checkers.len());
        for (id, key) in &pending.checkers {
            if self.checkers.get(*id).is_none() {
                continue;
            }
            let message = response.message(key).map(str::to_string);
            if self.set_checker_result(*id, message) == CheckerStatus::Failure {
                outcome.failures.push(*id);
            }
            outcome.tested.push(*id);
            applied.push(*id);
        }
        // Results are all applied before counters and panels move.
        self.finish_batch(&applied);
        self.resume();
        debug!(
            ticket = ticket.0,
            tested = outcome.tested.len(),
            failures = outcome.failures.len(),
            "check batch completed"
        );
        if pending.display_errors {
            self.display_error_dialog();
        }
        Ok(outcome)
    }

    /// Runs a batch through a synchronous transport.
    pub fn check_with<T: CheckTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        selection: Option<&[CheckerId]>,
        display_errors: bool,
        force_test: bool,
    ) -> Result<CheckOutcome, FormError> {
        match self.begin_check(selection, display_errors, force_test)? {
            CheckStart::Immediate(outcome) => Ok(outcome),
            CheckStart::Pending { ticket, request } => {
                let result = transport.send(&request);
                self.complete_check(ticket, result)
            }
        }
    }

    /// Puts every checker back to its initial status.
    pub fn reset_checkers(&mut self) {
        self.suspend();
        let ids = self.checkers.ids();
        for &id in &ids {
            self.initialize_checker(id);
            let linked = self
                .checkers
                .get(id)
                .map(|checker| checker.linked.clone())
                .unwrap_or_default();
            for field in linked {
                if let Some(field) = self.tree.field_mut(field) {
                    field.validity.remove_checker_warning(id);
                }
            }
        }
        self.update_test_results();
        self.update_all_panels(false);
        self.resume();
    }

    #[must_use]
    pub fn checker(&self, id: CheckerId) -> Option<&FieldChecker> {
        self.checkers.get(id)
    }

    /// Checker by wire key, e.g. `servers.2.ping`.
    #[must_use]
    pub fn checker_by_key(&self, key: &str) -> Option<CheckerId> {
        self.checkers
            .find(key)
            .or_else(|| self.checkers.find(&self.paths.absolute(key)))
    }

    pub fn checker_status(&self, key: &str) -> Result<CheckerStatus, FormError> {
        self.checker_by_key(key)
            .and_then(|id| self.checkers.get(id))
            .map(|checker| checker.status)
            .ok_or_else(|| FormError::UnknownField(key.into()))
    }

    /// Registered checkers, in registration order.
    #[must_use]
    pub fn checker_ids(&self) -> Vec<CheckerId> {
        self.checkers.ids()
    }

    /// Label of the node a checker decorates, for reports.
    #[must_use]
    pub fn checker_full_label(&self, id: CheckerId) -> String {
        match self.checkers.get(id) {
            Some(checker) if checker.location != NodeId::ROOT => self.full_label(checker.location),
            _ => "global".to_string(),
        }
    }

    /// Lists every visible failing checker in one error dialog.
    fn display_error_dialog(&mut self) {
        let details: Vec<String> = self
            .checkers
            .iter()
            .filter(|(_, checker)| {
                checker.status == CheckerStatus::Failure && checker.control.visible
            })
            .map(|(id, checker)| {
                format!(
                    "{}:\n\t{}",
                    self.checker_full_label(id),
                    checker.error_msg.as_deref().unwrap_or_default()
                )
            })
            .collect();
        if details.is_empty() {
            return;
        }
        let title = if details.len() == 1 {
            "1 error".to_string()
        } else {
            format!("{} errors", details.len())
        };
        self.chrome.show_error(&ErrorDialog {
            title,
            text: "Some field checkers failed".to_string(),
            details,
        });
    }

    /// Stores a checker's new result and returns the status it resolved to;
    /// hidden checkers keep it for later. A checker whose linked fields were
    /// all disabled meanwhile stays deactivated and only keeps the message.
    fn set_checker_result(&mut self, id: CheckerId, message: Option<String>) -> CheckerStatus {
        let status = if self.all_linked_disabled(id) {
            CheckerStatus::Deactivated
        } else if message.is_some() {
            CheckerStatus::Failure
        } else {
            CheckerStatus::Success
        };
        let Some(checker) = self.checkers.get(id) else {
            return status;
        };
        let hidden = checker.status == CheckerStatus::Hidden;
        let control = if hidden {
            checker.control
        } else {
            self.control_for(status)
        };
        let Some(checker) = self.checkers.get_mut(id) else {
            return status;
        };
        checker.in_flight = None;
        checker.error_msg = message;
        checker.control = control;
        if hidden {
            checker.saved_status = Some(status);
        } else {
            checker.status = status;
        }
        let shown = checker.status;
        self.chrome.set_checker_control(id, control, shown);
        status
    }

    fn finish_batch(&mut self, ids: &[CheckerId]) {
        self.update_warnings(ids);
        self.update_test_results();
        let mut panels = Vec::new();
        for &id in ids {
            let Some(checker) = self.checkers.get(id) else {
                continue;
            };
            panels.push(self.panel_of(checker.location));
            panels.extend(checker.linked.iter().map(|field| self.panel_of(*field)));
        }
        self.update_panels(panels);
    }

    /// `true` when every linked field is disabled, vacuously for none.
    pub(crate) fn all_linked_disabled(&self, id: CheckerId) -> bool {
        self.checkers.get(id).is_some_and(|checker| {
            checker
                .linked
                .iter()
                .all(|field| self.tree.field(*field).is_none_or(|field| field.disabled))
        })
    }

    fn has_invalid_linked_field(&self, id: CheckerId) -> bool {
        self.checkers.get(id).is_some_and(|checker| {
            checker.linked.iter().any(|field| {
                !self.is_hidden(*field)
                    && self
                        .tree
                        .field(*field)
                        .is_some_and(|field| !field.disabled && !field.compute_errors().is_empty())
            })
        })
    }

    /// Control state shown for a checker in `status`.
    pub(crate) fn control_for(&self, status: CheckerStatus) -> ControlState {
        match status {
            CheckerStatus::Deactivated => ControlState {
                enabled: false,
                masked: false,
                visible: !self.options.hide_disabled_buttons,
            },
            CheckerStatus::Hidden => ControlState {
                enabled: false,
                masked: false,
                visible: false,
            },
            _ => ControlState::default(),
        }
    }

    /// Control of checker `id` once in `status`. A checker waiting for the
    /// endpoint stays disabled and masked until its batch completes.
    pub(crate) fn control_of(&self, id: CheckerId, status: CheckerStatus) -> ControlState {
        let control = self.control_for(status);
        let in_flight = self
            .checkers
            .get(id)
            .is_some_and(|checker| checker.in_flight.is_some());
        if in_flight && status != CheckerStatus::Hidden {
            ControlState {
                enabled: false,
                masked: true,
                ..control
            }
        } else {
            control
        }
    }

    /// Hidden with its group, its field, or by the switcher of the group it
    /// decorates.
    pub(crate) fn is_checker_hidden(&self, id: CheckerId) -> bool {
        let Some(checker) = self.checkers.get(id) else {
            return false;
        };
        let location = checker.location;
        if checker.field.is_some_and(|field| self.is_hidden(field)) {
            return true;
        }
        self.tree.is_switched_off(location) || self.is_switcher_off(location)
    }
}

/// Status after a linked-field event, outside of any switcher.
fn next_status(current: CheckerStatus, deactivated: bool) -> CheckerStatus {
    if deactivated {
        return CheckerStatus::Deactivated;
    }
    match current {
        CheckerStatus::NotTested | CheckerStatus::Deactivated => CheckerStatus::Warning,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_results_turn_to_warning_once() {
        assert_eq!(next_status(CheckerStatus::NotTested, false), CheckerStatus::Warning);
        assert_eq!(next_status(CheckerStatus::Deactivated, false), CheckerStatus::Warning);
        assert_eq!(next_status(CheckerStatus::Success, false), CheckerStatus::Success);
        assert_eq!(next_status(CheckerStatus::Failure, false), CheckerStatus::Failure);
        assert_eq!(next_status(CheckerStatus::Warning, false), CheckerStatus::Warning);
    }

    #[test]
    fn deactivation_wins_over_any_status() {
        for status in [
            CheckerStatus::NotTested,
            CheckerStatus::Success,
            CheckerStatus::Failure,
            CheckerStatus::Warning,
        ] {
            assert_eq!(next_status(status, true), CheckerStatus::Deactivated);
        }
    }
}
