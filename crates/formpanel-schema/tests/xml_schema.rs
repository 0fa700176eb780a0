//! XML schema reader tests.

mod common;
use common::*;
use expect_test::expect;

const MAIL_SCHEMA: &str = r#"<metadata>
    <fieldsets role="tab">
        <label>Mail</label>
        <smtp>
            <type>string</type>
            <label>SMTP host</label>
            <validation><mandatory>true</mandatory><regexp>^[a-z.]+$</regexp></validation>
        </smtp>
        <field-checker>
            <id>smtp-check</id>
            <label>Send test mail</label>
            <linked-fields>["smtp", "/admin/email"]</linked-fields>
            <order>3</order>
        </field-checker>
    </fieldsets>
    <admin>
        <type>composite</type>
        <composition>
            <email><type>string</type></email>
        </composition>
    </admin>
    <aliases>
        <type>composite</type>
        <label>Alias</label>
        <repeater min-size="0" max-size="5" initial-size="2">
            <add-label>Add</add-label>
            <header-label>{name}</header-label>
            <composition>
                <name><type>string</type></name>
            </composition>
        </repeater>
    </aliases>
</metadata>"#;

#[test]
fn xml_tree_matches_the_json_shape() {
    let schema = xml_schema(MAIL_SCHEMA);
    expect![[r#"
        tab 'Mail'
          checker smtp-check -> ["smtp", "/admin/email"]
          field smtp: string *
        composite admin
          field email: string
        repeater aliases [0..Some(5)] initial 2
          field name: string
    "#]]
    .assert_eq(&outline(&schema.body));
}

#[test]
fn validation_and_repeater_attributes_are_read() {
    let schema = xml_schema(MAIL_SCHEMA);
    let SchemaElement::Group(tab) = &schema.body.elements[0] else {
        panic!("expected a group");
    };
    let SchemaElement::Field(smtp) = &tab.body.elements[0] else {
        panic!("expected a field");
    };
    assert_eq!(smtp.validation.regexp.as_deref(), Some("^[a-z.]+$"));
    assert_eq!(tab.body.checkers[0].order, Some(3));

    let SchemaElement::Repeater(aliases) = &schema.body.elements[2] else {
        panic!("expected a repeater");
    };
    assert_eq!(aliases.header_label.as_deref(), Some("{name}"));
    assert_eq!(aliases.add_label, "Add");
    assert_eq!(aliases.initial_entries(), 2);
}

#[test]
fn malformed_xml_is_reported() {
    let err = xml::parse_schema("<metadata><a></metadata>").unwrap_err();
    assert!(matches!(err, SchemaError::Xml(_)));
}

#[test]
fn unknown_role_is_rejected() {
    let err = xml::parse_schema(
        r#"<metadata><fieldsets role="panel"><a><type>string</type></a></fieldsets></metadata>"#,
    )
    .unwrap_err();
    assert_eq!(err, SchemaError::UnknownRole("panel".into()));
}
