use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const SCHEMA: &str = r#"{
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

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "formpanel-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir)
        .unwrap_or_else(|err| panic!("create directory {}: {err}", dir.display()));
    dir
}

fn write(dir: &PathBuf, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap_or_else(|err| panic!("write {}: {err}", path.display()));
    path
}

fn formpanel(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_formpanel"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run formpanel")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn invalid_form_exits_with_failure() {
    let dir = unique_temp_dir("invalid");
    let schema = write(&dir, "schema.json", SCHEMA);
    let output = formpanel(&["check", "--schema", schema.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.starts_with("Form has errors"), "{text}");
    assert!(text.contains("Connection [error]"), "{text}");
    assert!(text.contains("- Field 'Host': This field is mandatory"), "{text}");
}

#[test]
fn valid_values_pass() {
    let dir = unique_temp_dir("valid");
    let schema = write(&dir, "schema.json", SCHEMA);
    let values = write(&dir, "values.json", r#"{"values": {"host": "ldap1"}}"#);
    let output = formpanel(&[
        "check",
        "--schema",
        schema.to_str().unwrap(),
        "--values",
        values.to_str().unwrap(),
        "--format",
        "json",
    ]);

    assert!(output.status.success(), "{}", stdout(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["valid"], true);
    assert_eq!(report["panels"][0]["title"], "Connection");
    assert_eq!(report["panels"][0]["class"], "ok");
}

#[test]
fn toc_lists_panels_in_order() {
    let dir = unique_temp_dir("toc");
    let schema = write(&dir, "schema.json", SCHEMA);
    let values = write(&dir, "values.json", r#"{"values": {"host": "ldap1"}}"#);
    let output = formpanel(&[
        "toc",
        "--schema",
        schema.to_str().unwrap(),
        "--values",
        values.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim_end(), "1. Connection\n2. Advanced");
}

#[test]
fn checkers_need_an_endpoint() {
    let dir = unique_temp_dir("endpoint");
    let schema = write(&dir, "schema.json", SCHEMA);
    let output = formpanel(&["check", "--schema", schema.to_str().unwrap(), "--run-checkers"]);

    assert_eq!(output.status.code(), Some(1));
    let errors = String::from_utf8_lossy(&output.stderr);
    assert!(errors.contains("Error: --run-checkers needs --endpoint"), "{errors}");
}
