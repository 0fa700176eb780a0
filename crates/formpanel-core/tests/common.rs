//! Shared helpers for form engine tests.
#![allow(dead_code, unused_imports)]

pub use formpanel_core::{
    ChromeEvent, CheckOutcome, CheckRequest, CheckResponse, CheckStart, CheckTicket,
    CheckerStatus, ControlState, Form, FormError, FormOptions, MoveDirection, PanelKey,
    PreferenceHub, RecordingChrome, StatusClass, TabPolicy, TestResults, TransportError,
    INVALID_LINKED_FIELD,
};
pub use formpanel_schema::{json, Value, ValuesPayload};
pub use serde_json::json;

/// Builds a form from a JSON schema and loads an empty payload.
pub fn form(schema: &str) -> Form<RecordingChrome> {
    form_with(schema, FormOptions::default(), "{}")
}

/// Builds a form and loads `payload`, a JSON values payload.
pub fn loaded(schema: &str, payload: &str) -> Form<RecordingChrome> {
    form_with(schema, FormOptions::default(), payload)
}

pub fn form_with(schema: &str, options: FormOptions, payload: &str) -> Form<RecordingChrome> {
    let schema = match json::parse_schema(schema) {
        Ok(schema) => schema,
        Err(err) => panic!("unexpected schema error: {err}"),
    };
    let mut form = match Form::new(schema, options, RecordingChrome::default()) {
        Ok(form) => form,
        Err(err) => panic!("unexpected build error: {err}"),
    };
    let payload = match ValuesPayload::from_json(payload) {
        Ok(payload) => payload,
        Err(err) => panic!("unexpected payload error: {err}"),
    };
    if let Err(err) = form.set_values(&payload) {
        panic!("unexpected load error: {err}");
    }
    form
}

/// Panel whose title is `title`.
pub fn panel(form: &Form<RecordingChrome>, title: &str) -> PanelKey {
    match form
        .panels()
        .into_iter()
        .find(|panel| form.panel_title(*panel) == title)
    {
        Some(panel) => panel,
        None => panic!("no panel titled '{title}'"),
    }
}

/// Transport answering every batch with the same failures.
pub fn responder(
    failures: &[(&str, &str)],
) -> impl FnMut(&CheckRequest) -> Result<CheckResponse, TransportError> {
    let failures: Vec<(String, String)> = failures
        .iter()
        .map(|(key, message)| (key.to_string(), message.to_string()))
        .collect();
    move |_request: &CheckRequest| Ok(CheckResponse::from_failures(failures.clone()))
}

/// Transport that must never be reached.
pub fn unreachable_transport() -> impl FnMut(&CheckRequest) -> Result<CheckResponse, TransportError>
{
    |request: &CheckRequest| panic!("unexpected check request: {:?}", request.checkers)
}

pub fn status(form: &Form<RecordingChrome>, key: &str) -> CheckerStatus {
    match form.checker_status(key) {
        Ok(status) => status,
        Err(err) => panic!("{err}"),
    }
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}
