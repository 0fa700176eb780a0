//! Tab-policy preference subscription.
//!
//! A [`PreferenceHub`] publishes [`TabPolicy`] changes to explicit
//! subscribers. Forms drain their [`Subscription`] with
//! [`Form::poll_preferences`] and rebuild their layout, keeping values,
//! comments and checker results.

#![allow(missing_docs)]

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use formpanel_schema::{RepeaterSize, ValuesPayload};
use smol_str::SmolStr;
use tracing::debug;

use crate::checker::CheckerStatus;
use crate::chrome::Chrome;
use crate::config::TabPolicy;
use crate::error::FormError;
use crate::form::Form;
use crate::tree::NodeKind;

/// Publisher of tab-policy changes.
#[derive(Debug, Default)]
pub struct PreferenceHub {
    subscribers: Vec<Sender<TabPolicy>>,
}

impl PreferenceHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Subscription {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        Subscription { receiver }
    }

    /// Sends `policy` to every live subscriber; dropped ones are forgotten.
    pub fn publish(&mut self, policy: TabPolicy) {
        self.subscribers
            .retain(|subscriber| subscriber.send(policy).is_ok());
        debug!(policy = policy.as_str(), subscribers = self.subscribers.len(), "tab policy published");
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

/// Receiving end of a hub subscription.
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<TabPolicy>,
}

impl Subscription {
    /// Last policy published since the previous call.
    #[must_use]
    pub fn try_latest(&self) -> Option<TabPolicy> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(policy) => latest = Some(policy),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return latest,
            }
        }
    }

    /// Ends the subscription; the hub drops it on its next publish.
    pub fn unsubscribe(self) {
        drop(self.receiver);
    }
}

/// Checker results carried across a rebuild, by key.
struct CheckerSnapshot {
    key: SmolStr,
    status: CheckerStatus,
    error_msg: Option<String>,
}

impl<C: Chrome> Form<C> {
    /// Starts following tab-policy changes published on `hub`.
    pub fn subscribe_tab_policy(&mut self, hub: &mut PreferenceHub) {
        if let Some(previous) = self.preferences.replace(hub.subscribe()) {
            previous.unsubscribe();
        }
    }

    pub fn unsubscribe_preferences(&mut self) {
        if let Some(subscription) = self.preferences.take() {
            subscription.unsubscribe();
        }
    }

    /// Applies the latest published policy, if it differs from the current
    /// one. Returns `true` when the layout was rebuilt.
    pub fn poll_preferences(&mut self) -> Result<bool, FormError> {
        let Some(policy) = self
            .preferences
            .as_ref()
            .and_then(Subscription::try_latest)
        else {
            return Ok(false);
        };
        if policy == self.options.tab_policy {
            return Ok(false);
        }
        self.set_tab_policy(policy)?;
        Ok(true)
    }

    /// Rebuilds the layout under `policy`, keeping the current state.
    pub fn set_tab_policy(&mut self, policy: TabPolicy) -> Result<(), FormError> {
        let payload = self.snapshot_values();
        let checkers: Vec<_> = self
            .checkers
            .iter()
            .map(|(_, checker)| CheckerSnapshot {
                key: checker.key(),
                status: match checker.status {
                    CheckerStatus::Hidden => checker.saved_status.unwrap_or(CheckerStatus::NotTested),
                    status => status,
                },
                error_msg: checker.error_msg.clone(),
            })
            .collect();

        self.suspend();
        self.options.tab_policy = policy;
        self.layout()?;
        self.set_values(&payload)?;
        let mut restored = Vec::new();
        for snapshot in checkers {
            if !matches!(
                snapshot.status,
                CheckerStatus::Success | CheckerStatus::Failure | CheckerStatus::Warning
            ) {
                continue;
            }
            let Some(id) = self.checkers.find(&snapshot.key) else {
                continue;
            };
            let control = self.control_for(snapshot.status);
            let Some(checker) = self.checkers.get_mut(id) else {
                continue;
            };
            if checker.status == CheckerStatus::Deactivated {
                continue;
            }
            checker.error_msg = snapshot.error_msg;
            if checker.status == CheckerStatus::Hidden {
                checker.saved_status = Some(snapshot.status);
            } else {
                checker.status = snapshot.status;
                checker.control = control;
                self.chrome.set_checker_control(id, control, snapshot.status);
            }
            restored.push(id);
        }
        self.update_warnings(&restored);
        self.update_test_results();
        self.update_all_panels(true);
        self.resume();
        debug!(policy = policy.as_str(), restored = restored.len(), "layout rebuilt");
        self.chrome.layout_rebuilt(policy);
        Ok(())
    }

    /// Current values, invalid input, repeater sizes and comments, as a
    /// payload that rebuilds the same state.
    #[must_use]
    pub fn snapshot_values(&self) -> ValuesPayload {
        let mut payload = ValuesPayload::default();
        for id in self.tree.all() {
            let Some(node) = self.tree.get(id) else {
                continue;
            };
            match &node.kind {
                NodeKind::Repeater(repeater) => payload.repeaters.push(RepeaterSize {
                    path: SmolStr::new(self.paths.relative(&repeater.name)),
                    count: node.children.len(),
                }),
                NodeKind::Field(field) => {
                    let name = SmolStr::new(self.paths.relative(&field.name));
                    if field.parse_error.is_some() {
                        payload
                            .invalid
                            .insert(name.clone(), field.readable_value());
                    } else {
                        payload.values.insert(name.clone(), field.value.clone());
                    }
                    if field.comments.has_comments() {
                        payload.comments.insert(name, field.comments.entries());
                    }
                }
                _ => {}
            }
        }
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_publication_wins() {
        let mut hub = PreferenceHub::new();
        let subscription = hub.subscribe();
        hub.publish(TabPolicy::Linear);
        hub.publish(TabPolicy::Tabs);
        assert_eq!(subscription.try_latest(), Some(TabPolicy::Tabs));
        assert_eq!(subscription.try_latest(), None);
    }

    #[test]
    fn dropped_subscriptions_are_forgotten() {
        let mut hub = PreferenceHub::new();
        let kept = hub.subscribe();
        hub.subscribe().unsubscribe();
        assert_eq!(hub.subscriber_count(), 2);
        hub.publish(TabPolicy::Linear);
        assert_eq!(hub.subscriber_count(), 1);
        assert_eq!(kept.try_latest(), Some(TabPolicy::Linear));
    }
}
