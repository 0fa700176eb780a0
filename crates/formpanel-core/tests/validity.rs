mod common;

use common::*;

const TWO_TABS: &str = r#"{
    "fieldsets": [
        {
            "role": "tab",
            "label": "General",
            "elements": {
                "a": {"type": "string", "label": "A *", "validation": {"mandatory": true}}
            }
        },
        {
            "role": "tab",
            "label": "Advanced",
            "elements": {
                "b": {"type": "string", "label": "B", "validation": {"mandatory": true}}
            }
        }
    ]
}"#;

#[test]
fn empty_mandatory_field_makes_the_form_invalid() {
    let mut form = form(r#"{"title": {"type": "string", "label": "Title", "validation": {"mandatory": true}}}"#);
    form.set_value("title", json!("")).unwrap();
    assert!(!form.is_valid());
    assert_eq!(form.field_errors("title").unwrap(), ["This field is mandatory"]);

    form.set_value("title", json!("Home")).unwrap();
    assert!(form.field_errors("title").unwrap().is_empty());
    assert!(form.is_valid());
}

#[test]
fn leaving_a_tab_ends_its_first_edition_only() {
    let mut form = form(TWO_TABS);
    let general = panel(&form, "General");
    let advanced = panel(&form, "Advanced");
    form.chrome_mut().take();

    form.focus("a").unwrap();
    form.focus("b").unwrap();

    assert!(!form.is_first_edition(general));
    assert!(form.is_first_edition(advanced));
    assert_eq!(form.panel_class(general), StatusClass::Error);
    assert_eq!(form.panel_class(advanced), StatusClass::Empty);
    let events = form.chrome_mut().take();
    assert!(events.contains(&ChromeEvent::PanelClass(general, StatusClass::Error)));
    assert!(!events
        .iter()
        .any(|event| matches!(event, ChromeEvent::PanelClass(panel, _) if *panel == advanced)));
    assert_eq!(events.first(), Some(&ChromeEvent::Suspend));
    assert_eq!(events.last(), Some(&ChromeEvent::Resume));
}

#[test]
fn panels_in_first_edition_ignore_edits() {
    let mut form = form(TWO_TABS);
    let general = panel(&form, "General");
    form.set_value("a", json!("x")).unwrap();
    form.set_value("a", json!("")).unwrap();

    assert_eq!(form.field_errors("a").unwrap(), ["This field is mandatory"]);
    assert_eq!(form.panel_class(general), StatusClass::Empty);
    assert!(form.panel_tooltip(general).is_none());
}

#[test]
fn unchanged_status_touches_nothing() {
    let mut form = form(TWO_TABS);
    assert!(!form.is_valid());
    form.chrome_mut().take();

    form.update_all_panels(true);
    form.update_all_panels(false);
    assert!(!form.is_valid());
    assert_eq!(form.chrome().mutations(), 0);
}

#[test]
fn hidden_fields_are_always_valid() {
    let mut form = form(
        r#"{
            "secret": {"type": "string", "label": "Secret", "hidden": true, "validation": {"mandatory": true}},
            "name": {"type": "string", "label": "Name"}
        }"#,
    );
    assert!(form.is_valid());
    assert!(form.field_errors("secret").unwrap().is_empty());
}

#[test]
fn disabled_fields_are_always_valid() {
    let mut form = form(r#"{"host": {"type": "string", "label": "Host", "validation": {"mandatory": true}}}"#);
    assert!(!form.is_valid());
    form.set_disabled("host", true).unwrap();
    assert!(form.field_errors("host").unwrap().is_empty());
    assert!(form.is_valid());
}

#[test]
fn disable_condition_follows_its_reference() {
    let mut form = form(
        r#"{
            "mode": {"type": "string", "label": "Mode"},
            "port": {
                "type": "long",
                "label": "Port",
                "validation": {"mandatory": true},
                "disableCondition": {"condition": [{"id": "mode", "operator": "eq", "value": "auto"}]}
            }
        }"#,
    );
    assert!(!form.field("port").unwrap().disabled);
    form.set_value("mode", json!("auto")).unwrap();
    assert!(form.field("port").unwrap().disabled);
    assert!(form.is_valid());

    form.set_value("mode", json!("manual")).unwrap();
    assert!(!form.field("port").unwrap().disabled);
    assert_eq!(form.field_errors("port").unwrap(), ["This field is mandatory"]);
}

#[test]
fn unparsable_input_is_kept_and_reported() {
    let mut form = form(
        r#"{"port": {"type": "long", "label": "Port", "validation": {"invalidText": "Not a port"}}}"#,
    );
    form.set_raw_value("port", "eighty").unwrap();
    assert_eq!(form.get_value("port").unwrap(), &json!("eighty"));
    assert_eq!(form.field_errors("port").unwrap(), ["Not a port"]);

    form.set_raw_value("port", "80").unwrap();
    assert_eq!(form.get_value("port").unwrap(), &json!(80));
    assert!(form.field_errors("port").unwrap().is_empty());
}

#[test]
fn pattern_mismatch_uses_the_declared_text() {
    let mut form = form(
        r#"{"code": {"type": "string", "label": "Code", "validation": {"regexp": "^[A-Z]{3}$", "regexText": "Three capitals"}}}"#,
    );
    form.set_value("code", json!("abc")).unwrap();
    assert_eq!(form.field_errors("code").unwrap(), ["Three capitals"]);
    form.set_value("code", json!("ABC")).unwrap();
    assert!(form.field_errors("code").unwrap().is_empty());
}

#[test]
fn warnings_are_kept_until_removed() {
    let mut form = form(r#"{"host": {"type": "string", "label": "Host"}}"#);
    form.add_warning("host", "slow resolver").unwrap();
    form.add_warning("host", "slow resolver").unwrap();
    assert_eq!(form.field_warnings("host").unwrap(), strings(&["slow resolver"]));
    assert!(form.is_valid());

    form.remove_warning("host", "slow resolver").unwrap();
    assert!(form.field_warnings("host").unwrap().is_empty());
}

#[test]
fn unknown_fields_are_reported() {
    let mut form = form(r#"{"host": {"type": "string"}}"#);
    assert_eq!(
        form.set_value("nope", json!(1)),
        Err(FormError::UnknownField("nope".into()))
    );
    assert!(matches!(form.focus("nope"), Err(FormError::UnknownField(_))));
}

#[test]
fn values_survive_a_round_trip() {
    let schema = r#"{
        "title": {"type": "string", "label": "Title"},
        "port": {"type": "long", "label": "Port"},
        "enabled": {"type": "boolean", "label": "Enabled"},
        "servers": {
            "type": "composite",
            "label": "Server",
            "repeater": {
                "min-size": 0,
                "composition": {"host": {"type": "string", "label": "Host"}}
            }
        }
    }"#;
    let payload = r#"{
        "values": {
            "title": "Home",
            "port": 389,
            "enabled": true,
            "servers.1.host": "a",
            "servers.2.host": "b"
        },
        "repeaters": [{"name": "servers", "count": 2}]
    }"#;
    let form = loaded(schema, payload);

    assert_eq!(form.get_value("title").unwrap(), &json!("Home"));
    assert_eq!(form.get_value("port").unwrap(), &json!(389));
    assert_eq!(form.get_value("enabled").unwrap(), &json!(true));
    assert_eq!(form.get_value("servers.2.host").unwrap(), &json!("b"));

    let snapshot = form.snapshot_values();
    assert_eq!(snapshot.values.get("servers.1.host"), Some(&json!("a")));
    assert_eq!(snapshot.repeaters.len(), 1);
    assert_eq!(snapshot.repeaters[0].count, 2);

    let values = form.values();
    assert_eq!(values.get("_servers.size"), Some(&json!(2)));
    assert_eq!(values.get("_servers.2.previous-position"), Some(&json!(2)));
}

#[test]
fn invalid_payload_entries_are_flagged_on_load() {
    let form = loaded(
        r#"{"port": {"type": "long", "label": "Port"}}"#,
        r#"{"invalid": {"port": "eighty"}}"#,
    );
    assert_eq!(form.get_value("port").unwrap(), &json!("eighty"));
    assert_eq!(form.field_errors("port").unwrap().len(), 1);
    assert_eq!(form.snapshot_values().invalid.get("port").map(String::as_str), Some("eighty"));
}
