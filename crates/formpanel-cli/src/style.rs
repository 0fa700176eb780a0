//! Shared styling helpers for CLI output.

use std::io::IsTerminal;

use formpanel_core::{CheckerStatus, StatusClass};
use owo_colors::OwoColorize;

fn should_color() -> bool {
    std::io::stdout().is_terminal()
}

pub fn success(text: impl AsRef<str>) -> String {
    let text = text.as_ref();
    if should_color() {
        format!("{}", text.green())
    } else {
        text.to_string()
    }
}

pub fn warning(text: impl AsRef<str>) -> String {
    let text = text.as_ref();
    if should_color() {
        format!("{}", text.yellow())
    } else {
        text.to_string()
    }
}

pub fn error(text: impl AsRef<str>) -> String {
    let text = text.as_ref();
    if std::io::stderr().is_terminal() {
        format!("{}", text.red())
    } else {
        text.to_string()
    }
}

pub fn accent(text: impl AsRef<str>) -> String {
    let text = text.as_ref();
    if should_color() {
        format!("{}", text.cyan())
    } else {
        text.to_string()
    }
}

/// Badge of a panel class.
pub fn class(class: StatusClass) -> String {
    match class {
        StatusClass::Empty => success("ok"),
        StatusClass::Comment => accent("comment"),
        StatusClass::Warning => warning("warning"),
        StatusClass::Error => error_out("error"),
    }
}

/// Badge of a checker status.
pub fn checker(status: CheckerStatus) -> String {
    match status {
        CheckerStatus::Success => success(status.as_str()),
        CheckerStatus::Failure => error_out(status.as_str()),
        CheckerStatus::Warning => warning(status.as_str()),
        _ => status.as_str().to_string(),
    }
}

/// Red text bound for stdout.
fn error_out(text: &str) -> String {
    if should_color() {
        format!("{}", text.red())
    } else {
        text.to_string()
    }
}
