mod common;

use common::*;
use expect_test::expect;

const SERVER_TAB: &str = r#"{
    "fieldsets": [
        {
            "role": "tab",
            "label": "Server",
            "elements": {
                "host": {"type": "string", "label": "Host", "validation": {"mandatory": true}},
                "port": {"type": "long", "label": "Port"},
                "notes": {"type": "string", "label": "Notes"}
            }
        }
    ]
}"#;

const REVIEWED: &str = r#"{
    "comments": {
        "notes": [{"text": "review", "author": "alice", "date": "2024-03-01T09:30:00Z"}]
    }
}"#;

#[test]
fn tooltip_lists_every_section() {
    let mut form = loaded(SERVER_TAB, REVIEWED);
    let server = panel(&form, "Server");
    form.add_warning("port", "check the firewall").unwrap();
    assert!(!form.is_valid());

    assert_eq!(form.panel_class(server), StatusClass::Error);
    let tooltip = form.panel_tooltip(server).unwrap();
    assert_eq!(tooltip.title, "Server");
    expect![[r#"
        1 error
        - Field 'Host': This field is mandatory
        1 warning
        - Field 'Port': check the firewall
        1 comment
        - Notes : review (alice, 2024-03-01 09:30)"#]]
    .assert_eq(&tooltip.text);
}

#[test]
fn class_drops_with_each_resolved_issue() {
    let mut form = loaded(SERVER_TAB, REVIEWED);
    let server = panel(&form, "Server");
    form.add_warning("port", "check the firewall").unwrap();
    assert!(!form.is_valid());

    form.set_value("host", json!("ldap1")).unwrap();
    assert_eq!(form.panel_class(server), StatusClass::Warning);
    form.remove_warning("port", "check the firewall").unwrap();
    assert_eq!(form.panel_class(server), StatusClass::Comment);
}

#[test]
fn comments_are_ignored_when_not_shown() {
    let options = FormOptions {
        show_comments: false,
        ..FormOptions::default()
    };
    let mut form = form_with(SERVER_TAB, options, REVIEWED);
    let server = panel(&form, "Server");
    form.set_value("host", json!("ldap1")).unwrap();
    assert!(form.is_valid());
    assert_eq!(form.panel_class(server), StatusClass::Empty);
    assert!(form.panel_tooltip(server).is_none());
}

#[test]
fn cleared_status_unregisters_the_tooltip() {
    let mut form = form(SERVER_TAB);
    let server = panel(&form, "Server");
    assert!(!form.is_valid());
    form.chrome_mut().take();

    form.set_value("host", json!("ldap1")).unwrap();
    let events = form.chrome_mut().take();
    assert!(events.contains(&ChromeEvent::PanelClass(server, StatusClass::Empty)));
    assert!(events.contains(&ChromeEvent::UnregisterTooltip(server)));
    assert!(form.panel_tooltip(server).is_none());
}

#[test]
fn labels_are_qualified_below_the_panel() {
    let mut form = form(
        r#"{
            "fieldsets": [
                {
                    "role": "tab",
                    "label": "Directory",
                    "elements": {
                        "fieldsets": [
                            {
                                "role": "fieldset",
                                "label": "Bind",
                                "elements": {
                                    "dn": {"type": "string", "label": "DN *", "validation": {"mandatory": true}}
                                }
                            }
                        ]
                    }
                }
            ]
        }"#,
    );
    assert!(!form.is_valid());
    let directory = panel(&form, "Directory");
    assert_eq!(
        form.panel_tooltip(directory).unwrap().text,
        "1 error\n- Field 'Bind > DN': This field is mandatory"
    );
}

#[test]
fn linear_layout_has_a_table_of_contents() {
    let schema = r#"{
        "title": {"type": "string", "label": "Title"},
        "fieldsets": [
            {
                "role": "tab",
                "label": "Connection",
                "elements": {
                    "host": {"type": "string", "label": "Host", "validation": {"mandatory": true}}
                }
            },
            {
                "role": "tab",
                "label": "Advanced",
                "elements": {"timeout": {"type": "long", "label": "Timeout"}}
            }
        ]
    }"#;
    let options = FormOptions {
        tab_policy: TabPolicy::Linear,
        ..FormOptions::default()
    };
    let mut form = form_with(schema, options, "{}");
    let toc = form.toc().unwrap();
    assert_eq!(toc.render(), "1. General\n2. Connection\n3. Advanced");

    assert!(!form.is_valid());
    assert_eq!(
        form.toc().unwrap().render(),
        "1. General\n2. Connection [error]\n3. Advanced"
    );
    assert!(form
        .chrome()
        .events
        .contains(&ChromeEvent::TocClass(1, StatusClass::Error)));

    form.activate_toc_item(2).unwrap();
    assert_eq!(form.activate_toc_item(9), Err(FormError::UnknownTocItem(9)));

    assert!(self::form(schema).toc().is_none());
}

#[test]
fn published_policy_rebuilds_the_layout() {
    let schema = r#"{
        "fieldsets": [
            {
                "role": "tab",
                "label": "Connection",
                "elements": {
                    "host": {"type": "string", "label": "Host"},
                    "field-checker": {"id": "ping", "label": "Ping", "linked-fields": ["host"]}
                }
            }
        ]
    }"#;
    let mut hub = PreferenceHub::new();
    let mut form = form(schema);
    form.subscribe_tab_policy(&mut hub);
    form.set_value("host", json!("ldap1")).unwrap();
    form.check_with(&mut responder(&[("ping", "timeout")]), None, false, false)
        .unwrap();
    assert_eq!(form.poll_preferences(), Ok(false));

    hub.publish(TabPolicy::Linear);
    assert_eq!(form.poll_preferences(), Ok(true));
    assert_eq!(form.options().tab_policy, TabPolicy::Linear);
    assert_eq!(form.get_value("host").unwrap(), &json!("ldap1"));
    assert_eq!(status(&form, "ping"), CheckerStatus::Failure);
    assert_eq!(form.field_warnings("host").unwrap().len(), 1);
    assert!(form.toc().is_some());
    assert_eq!(
        form.chrome().events.last(),
        Some(&ChromeEvent::LayoutRebuilt(TabPolicy::Linear))
    );

    hub.publish(TabPolicy::Linear);
    assert_eq!(form.poll_preferences(), Ok(false));

    form.unsubscribe_preferences();
    hub.publish(TabPolicy::Tabs);
    assert_eq!(hub.subscriber_count(), 0);
}
