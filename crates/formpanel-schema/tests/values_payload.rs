//! Values payload reader tests.

mod common;
use common::*;
use serde_json::json;

#[test]
fn json_payload_reads_every_section() {
    let payload = ValuesPayload::from_json(
        r#"{
            "values": {"title": "Home", "tags": "[\"a\",\"b\"]", "servers.1.url": "ldap://x"},
            "invalid": {"port": "eighty"},
            "repeaters": [{"name": "servers", "prefix": "", "count": 2}],
            "comments": {"title": [{"text": "check spelling", "author": "jdoe", "date": "2024-05-01T10:00:00Z"}]}
        }"#,
    )
    .unwrap();
    assert_eq!(payload.values["title"], json!("Home"));
    assert_eq!(payload.values["tags"], json!(["a", "b"]));
    assert_eq!(payload.invalid["port"], "eighty");
    assert_eq!(payload.repeaters[0].path, "servers");
    assert_eq!(payload.repeaters[0].count, 2);
    assert_eq!(payload.comments["title"][0].author, "jdoe");
}

#[test]
fn xml_payload_infers_repeaters_and_multi_values() {
    let payload = ValuesPayload::from_xml(
        r#"<values>
            <metadata>
                <title>Home</title>
                <tag>a</tag>
                <tag>b</tag>
                <settings json="true">{"x": 1}</settings>
                <admin><email value="root@example.org"/></admin>
                <servers entryCount="2">
                    <entry name="1"><url>ldap://one</url></entry>
                    <entry name="2"><url>ldap://two</url></entry>
                </servers>
            </metadata>
            <comments>
                <metadata path="admin/email">
                    <comment id="1" author="ann" date="2024-01-02T03:04:05Z">Use a group mailbox</comment>
                </metadata>
            </comments>
        </values>"#,
        ".",
    )
    .unwrap();
    assert_eq!(payload.values["title"], json!("Home"));
    assert_eq!(payload.values["tag"], json!(["a", "b"]));
    assert_eq!(payload.values["settings"], json!({"x": 1}));
    assert_eq!(payload.values["admin.email"], json!("root@example.org"));
    assert_eq!(payload.values["servers.2.url"], json!("ldap://two"));
    assert_eq!(payload.repeaters.len(), 1);
    assert_eq!(payload.repeaters[0].count, 2);
    let comment = &payload.comments["admin.email"][0];
    assert_eq!(comment.text, "Use a group mailbox");
    assert_eq!(comment.id.as_deref(), Some("1"));
}

#[test]
fn empty_payload_is_empty() {
    assert!(ValuesPayload::from_json("{}").unwrap().is_empty());
}

#[test]
fn malformed_repeater_counts_are_rejected_in_both_shapes() {
    let err = ValuesPayload::from_xml(
        r#"<values><metadata><servers entryCount="two"/></metadata></values>"#,
        ".",
    )
    .unwrap_err();
    assert_eq!(
        err,
        SchemaError::InvalidNode {
            path: "servers".into(),
            message: "invalid entryCount 'two'".into(),
        }
    );

    let err = ValuesPayload::from_json(r#"{"repeaters": [{"name": "servers", "count": "two"}]}"#)
        .unwrap_err();
    assert!(matches!(err, SchemaError::Json(_)), "{err:?}");
}
