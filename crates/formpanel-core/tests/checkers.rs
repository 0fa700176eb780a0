mod common;

use common::*;

const HOSTS: &str = r#"{
    "primary": {"type": "string", "label": "Primary"},
    "secondary": {"type": "string", "label": "Secondary"},
    "field-checker": {"id": "hosts", "label": "Hosts", "linked-fields": ["primary", "secondary"]}
}"#;

const PROXY: &str = r#"{
    "fieldsets": [
        {
            "role": "fieldset",
            "label": "Proxy",
            "switcher": "enabled",
            "elements": {
                "enabled": {"type": "boolean", "label": "Enabled"},
                "url": {"type": "string", "label": "URL", "validation": {"mandatory": true}}
            },
            "field-checker": {"id": "proxy", "label": "Test proxy", "linked-fields": ["url"]}
        }
    ]
}"#;

fn warning_of(label: &str) -> String {
    format!("Field checker '{label}' failed: this field may be misconfigured")
}

#[test]
fn invalid_linked_field_fails_without_a_request() {
    let mut form = form(
        r#"{
            "title": {
                "type": "string",
                "label": "Title",
                "validation": {"mandatory": true},
                "field-checker": {"id": "unique", "label": "Unique title", "linked-fields": ["title"]}
            }
        }"#,
    );
    form.set_value("title", json!("")).unwrap();
    assert!(!form.is_valid());

    let outcome = form
        .check_with(&mut unreachable_transport(), None, false, true)
        .unwrap();
    let id = form.checker_by_key("unique").unwrap();
    assert_eq!(outcome.failures, vec![id]);
    assert_eq!(status(&form, "unique"), CheckerStatus::Failure);
    assert_eq!(
        form.checker(id).unwrap().error_msg.as_deref(),
        Some(INVALID_LINKED_FIELD)
    );
}

#[test]
fn edits_mark_untested_checkers_stale() {
    let mut form = form(HOSTS);
    assert_eq!(status(&form, "hosts"), CheckerStatus::NotTested);

    form.set_value("primary", json!("a")).unwrap();
    assert_eq!(status(&form, "hosts"), CheckerStatus::Warning);

    form.check_with(&mut responder(&[]), None, false, false).unwrap();
    assert_eq!(status(&form, "hosts"), CheckerStatus::Success);

    form.set_value("primary", json!("b")).unwrap();
    assert_eq!(status(&form, "hosts"), CheckerStatus::Success);
}

#[test]
fn stale_checker_is_a_panel_warning() {
    let mut form = form(HOSTS);
    form.set_value("primary", json!("a")).unwrap();
    assert!(form.is_valid());

    assert_eq!(form.panel_class(PanelKey::OutOfTabs), StatusClass::Warning);
    let tooltip = form.panel_tooltip(PanelKey::OutOfTabs).unwrap();
    assert_eq!(tooltip.title, "General");
    assert_eq!(
        tooltip.text,
        "1 warning\n- Field checker 'Hosts': the linked fields changed since the last test"
    );
}

#[test]
fn failure_warns_every_linked_field_once() {
    let mut form = form(HOSTS);
    form.add_warning("primary", "unrelated").unwrap();
    form.set_value("primary", json!("db1")).unwrap();

    let mut requests = Vec::new();
    let mut transport = |request: &CheckRequest| {
        requests.push(request.clone());
        Ok::<_, TransportError>(CheckResponse::from_failures([("hosts", "bad host")]))
    };
    let outcome = form.check_with(&mut transport, None, false, false).unwrap();
    let id = form.checker_by_key("hosts").unwrap();
    assert_eq!(outcome.failures, vec![id]);
    assert_eq!(outcome.tested, vec![id]);

    assert_eq!(requests.len(), 1);
    let info = &requests[0].checkers["hosts"];
    assert_eq!(info.test_params_names, ["primary", "secondary"]);
    assert_eq!(info.raw_test_values, vec![json!("db1"), Value::Null]);
    assert_eq!(requests[0].form_values.get("primary"), Some(&json!("db1")));

    assert_eq!(
        form.field_warnings("primary").unwrap(),
        vec!["unrelated".to_string(), warning_of("Hosts")]
    );
    assert_eq!(form.field_warnings("secondary").unwrap(), vec![warning_of("Hosts")]);

    form.check_with(&mut responder(&[]), None, false, true).unwrap();
    assert_eq!(form.field_warnings("primary").unwrap(), strings(&["unrelated"]));
    assert!(form.field_warnings("secondary").unwrap().is_empty());
}

#[test]
fn successful_checkers_are_skipped_unless_forced() {
    let mut form = form(HOSTS);
    form.check_with(&mut responder(&[]), None, false, false).unwrap();

    let outcome = form
        .check_with(&mut unreachable_transport(), None, false, false)
        .unwrap();
    assert!(outcome.tested.is_empty());

    let outcome = form
        .check_with(&mut responder(&[("hosts", "gone")]), None, false, true)
        .unwrap();
    assert!(!outcome.is_success());
    assert_eq!(status(&form, "hosts"), CheckerStatus::Failure);
}

#[test]
fn test_results_are_emitted_on_change_only() {
    let mut form = form(HOSTS);
    form.check_with(&mut responder(&[]), None, false, true).unwrap();
    form.check_with(&mut responder(&[]), None, false, true).unwrap();

    assert_eq!(
        form.chrome().test_results(),
        vec![
            TestResults {
                successes: 0,
                failures: 0,
                not_tested: 1,
            },
            TestResults {
                successes: 1,
                failures: 0,
                not_tested: 0,
            },
        ]
    );
}

#[test]
fn disabling_every_linked_field_deactivates() {
    let mut form = form(HOSTS);
    form.check_with(&mut responder(&[]), None, false, false).unwrap();
    assert_eq!(status(&form, "hosts"), CheckerStatus::Success);

    form.set_disabled("primary", true).unwrap();
    assert_eq!(status(&form, "hosts"), CheckerStatus::Success);
    form.set_disabled("secondary", true).unwrap();
    assert_eq!(status(&form, "hosts"), CheckerStatus::Deactivated);

    let id = form.checker_by_key("hosts").unwrap();
    let control = form.checker(id).unwrap().control;
    assert!(!control.enabled);
    assert!(control.visible);

    let outcome = form
        .check_with(&mut unreachable_transport(), None, false, true)
        .unwrap();
    assert!(outcome.tested.is_empty());

    form.set_disabled("secondary", false).unwrap();
    assert_eq!(status(&form, "hosts"), CheckerStatus::Warning);
}

#[test]
fn deactivation_during_a_check_outlasts_its_result() {
    let mut form = form(HOSTS);
    let id = form.checker_by_key("hosts").unwrap();
    let CheckStart::Pending { ticket, .. } = form.begin_check(None, false, true).unwrap() else {
        panic!("expected a pending batch");
    };

    form.set_disabled("primary", true).unwrap();
    form.set_disabled("secondary", true).unwrap();
    assert_eq!(status(&form, "hosts"), CheckerStatus::Deactivated);

    // The control stays frozen while the batch is out.
    form.set_disabled("primary", false).unwrap();
    assert_eq!(status(&form, "hosts"), CheckerStatus::Warning);
    let control = form.checker(id).unwrap().control;
    assert!(!control.enabled);
    assert!(control.masked);

    form.set_disabled("primary", true).unwrap();
    let response = CheckResponse::from_failures([("hosts", "bad host")]);
    let outcome = form.complete_check(ticket, Ok(response)).unwrap();
    assert!(outcome.failures.is_empty());

    let checker = form.checker(id).unwrap();
    assert_eq!(checker.status, CheckerStatus::Deactivated);
    assert_eq!(checker.error_msg.as_deref(), Some("bad host"));
    assert!(checker.in_flight.is_none());
    assert!(!checker.control.enabled);
    assert!(!checker.control.masked);
    assert!(form.field_warnings("primary").unwrap().is_empty());
}

#[test]
fn checker_without_linked_fields_starts_deactivated() {
    let schema = r#"{
        "x": {"type": "string"},
        "field-checker": {"id": "lonely", "label": "Lonely"}
    }"#;
    let form = form(schema);
    assert_eq!(status(&form, "lonely"), CheckerStatus::Deactivated);
    assert_eq!(
        form.test_results(),
        TestResults {
            successes: 0,
            failures: 0,
            not_tested: 1,
        }
    );

    let options = FormOptions {
        hide_disabled_buttons: true,
        ..FormOptions::default()
    };
    let form = form_with(schema, options, "{}");
    let id = form.checker_by_key("lonely").unwrap();
    assert!(!form.checker(id).unwrap().control.visible);
}

#[test]
fn switched_off_group_hides_its_checker() {
    let mut form = form(PROXY);
    assert_eq!(status(&form, "proxy"), CheckerStatus::Hidden);
    assert!(form.is_valid());
    assert_eq!(form.test_results(), TestResults::default());

    form.set_value("enabled", json!(true)).unwrap();
    assert_eq!(status(&form, "proxy"), CheckerStatus::NotTested);
    assert!(!form.is_valid());

    form.set_value("url", json!("http://proxy:3128")).unwrap();
    form.check_with(&mut responder(&[("proxy", "unreachable")]), None, false, false)
        .unwrap();
    assert_eq!(status(&form, "proxy"), CheckerStatus::Failure);

    form.set_value("enabled", json!(false)).unwrap();
    assert_eq!(status(&form, "proxy"), CheckerStatus::Hidden);
    assert_eq!(form.test_results(), TestResults::default());
    let outcome = form
        .check_with(&mut unreachable_transport(), None, false, true)
        .unwrap();
    assert!(outcome.tested.is_empty());

    form.set_value("enabled", json!(true)).unwrap();
    assert_eq!(status(&form, "proxy"), CheckerStatus::Failure);
    let id = form.checker_by_key("proxy").unwrap();
    assert_eq!(form.checker(id).unwrap().error_msg.as_deref(), Some("unreachable"));
}

#[test]
fn transport_error_restores_the_controls() {
    let mut form = form(HOSTS);
    form.set_value("primary", json!("db1")).unwrap();

    let mut down = |_request: &CheckRequest| {
        Err::<CheckResponse, _>(TransportError::Network("connection refused".into()))
    };
    let err = form.check_with(&mut down, None, true, false).unwrap_err();
    assert_eq!(
        err,
        FormError::Transport(TransportError::Network("connection refused".into()))
    );

    let id = form.checker_by_key("hosts").unwrap();
    let checker = form.checker(id).unwrap();
    assert_eq!(checker.status, CheckerStatus::Warning);
    assert_eq!(checker.control, ControlState::default());
    assert!(checker.in_flight.is_none());

    let dialog = form.chrome().last_error().unwrap();
    assert_eq!(dialog.title, "Field checker error");
    assert_eq!(dialog.details, strings(&["test endpoint unreachable: connection refused"]));
}

#[test]
fn batches_run_in_two_phases() {
    let mut form = form(HOSTS);
    let id = form.checker_by_key("hosts").unwrap();

    let CheckStart::Pending { ticket, request } = form.begin_check(None, false, true).unwrap() else {
        panic!("expected a pending batch");
    };
    assert_eq!(request.keys().collect::<Vec<_>>(), ["hosts"]);
    let control = form.checker(id).unwrap().control;
    assert!(!control.enabled);
    assert!(control.masked);

    // In-flight checkers are never sent twice.
    assert_eq!(
        form.begin_check(None, false, true).unwrap(),
        CheckStart::Immediate(CheckOutcome::default())
    );
    assert_eq!(
        form.complete_check(CheckTicket(999), Ok(CheckResponse::default())),
        Err(FormError::UnknownTicket(999))
    );

    let outcome = form.complete_check(ticket, Ok(CheckResponse::default())).unwrap();
    assert_eq!(outcome.tested, vec![id]);
    assert_eq!(status(&form, "hosts"), CheckerStatus::Success);
    assert_eq!(form.checker(id).unwrap().control, ControlState::default());
}

#[test]
fn failures_are_listed_in_one_dialog() {
    let mut form = form(HOSTS);
    form.check_with(&mut responder(&[("hosts", "bad host")]), None, true, false)
        .unwrap();

    let dialog = form.chrome().last_error().unwrap();
    assert_eq!(dialog.title, "1 error");
    assert_eq!(dialog.text, "Some field checkers failed");
    assert_eq!(dialog.details, strings(&["global:\n\tbad host"]));
}

#[test]
fn reset_puts_checkers_back_to_untested() {
    let mut form = form(HOSTS);
    form.check_with(&mut responder(&[("hosts", "bad host")]), None, false, false)
        .unwrap();
    assert_eq!(form.field_warnings("primary").unwrap().len(), 1);

    form.reset_checkers();
    assert_eq!(status(&form, "hosts"), CheckerStatus::NotTested);
    assert!(form.field_warnings("primary").unwrap().is_empty());
}

#[test]
fn equal_orders_keep_declaration_order() {
    let schema = r#"{
        "host": {"type": "string"},
        "field-checker": [
            {"id": "first", "label": "First", "linked-fields": ["host"], "order": 5},
            {"id": "second", "label": "Second", "linked-fields": ["host"], "order": 5},
            {"id": "early", "label": "Early", "linked-fields": ["host"], "order": 1}
        ]
    }"#;
    let keys = |form: &Form<RecordingChrome>| -> Vec<String> {
        form.checker_ids()
            .into_iter()
            .filter_map(|id| form.checker(id))
            .map(|checker| checker.key().to_string())
            .collect()
    };
    let first = keys(&form(schema));
    assert_eq!(first, strings(&["early", "first", "second"]));
    assert_eq!(keys(&form(schema)), first);
}

#[test]
fn unknown_linked_field_is_a_build_error() {
    let schema = json::parse_schema(
        r#"{
            "host": {"type": "string"},
            "field-checker": {"id": "ping", "linked-fields": ["missing"]}
        }"#,
    )
    .unwrap();
    let err = Form::new(schema, FormOptions::default(), RecordingChrome::default()).unwrap_err();
    assert_eq!(
        err,
        FormError::UnknownLinkedField {
            checker: "ping".into(),
            field: "missing".into(),
        }
    );
}
