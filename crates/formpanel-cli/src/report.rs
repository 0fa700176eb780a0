//! Status report of a checked form.

use formpanel_core::{Chrome, CheckerStatus, Form, StatusClass};
use serde::Serialize;

use crate::style;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub valid: bool,
    pub panels: Vec<PanelReport>,
    pub checkers: Vec<CheckerReport>,
    pub test_results: ResultsReport,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelReport {
    pub title: String,
    #[serde(skip)]
    pub class: StatusClass,
    #[serde(rename = "class")]
    pub class_name: &'static str,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub comments: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerReport {
    pub key: String,
    pub label: String,
    pub location: String,
    #[serde(skip)]
    pub status: CheckerStatus,
    #[serde(rename = "status")]
    pub status_name: &'static str,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsReport {
    pub successes: usize,
    pub failures: usize,
    pub not_tested: usize,
}

impl Report {
    /// Snapshot of every panel and checker of `form`.
    pub fn collect<C: Chrome>(form: &Form<C>, valid: bool) -> Self {
        let panels = form
            .panels()
            .into_iter()
            .map(|panel| {
                let status = form.panel_status(panel);
                let class = status.class();
                PanelReport {
                    title: form.panel_title(panel),
                    class,
                    class_name: if class == StatusClass::Empty { "ok" } else { class.as_str() },
                    errors: status.errors,
                    warnings: status.warnings,
                    comments: status.comments,
                }
            })
            .collect();
        let checkers = form
            .checker_ids()
            .into_iter()
            .filter_map(|id| form.checker(id).map(|checker| (id, checker)))
            .map(|(id, checker)| CheckerReport {
                key: checker.key().to_string(),
                label: checker.label.clone(),
                location: form.checker_full_label(id),
                status: checker.status,
                status_name: checker.status.as_str(),
                message: checker.error_msg.clone(),
            })
            .collect();
        let results = form.test_results();
        Self {
            valid,
            panels,
            checkers,
            test_results: ResultsReport {
                successes: results.successes,
                failures: results.failures,
                not_tested: results.not_tested,
            },
        }
    }

    /// `true` when a checker ended in failure.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.test_results.failures > 0
    }

    /// Human-readable report; `styled` colours the badges.
    #[must_use]
    pub fn render_text(&self, styled: bool) -> String {
        let mut lines = Vec::new();
        lines.push(if self.valid {
            "Form is valid".to_string()
        } else {
            "Form has errors".to_string()
        });
        for panel in &self.panels {
            let badge = if styled {
                style::class(panel.class)
            } else {
                panel.class_name.to_string()
            };
            lines.push(format!("{} [{badge}]", panel.title));
            for (messages, singular, plural) in [
                (&panel.errors, "error", "errors"),
                (&panel.warnings, "warning", "warnings"),
                (&panel.comments, "comment", "comments"),
            ] {
                if messages.is_empty() {
                    continue;
                }
                let word = if messages.len() == 1 { singular } else { plural };
                lines.push(format!("  {} {word}", messages.len()));
                lines.extend(messages.iter().map(|message| format!("  - {message}")));
            }
        }
        if !self.checkers.is_empty() {
            lines.push(format!(
                "Checkers: {} passed, {} failed, {} not tested",
                self.test_results.successes, self.test_results.failures, self.test_results.not_tested
            ));
            for checker in &self.checkers {
                let badge = if styled {
                    style::checker(checker.status)
                } else {
                    checker.status_name.to_string()
                };
                let mut line = format!("  {} ({}) [{badge}]", checker.label, checker.location);
                if let Some(message) = &checker.message {
                    line.push_str(": ");
                    line.push_str(message);
                }
                lines.push(line);
            }
        }
        lines.join("\n")
    }

    pub fn render_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
