//! Integration tests for the ziggy CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

/// Helper to get a ziggy command
fn ziggy() -> Command {
    Command::cargo_bin("ziggy").unwrap()
}

const RELATIONSHIPS: &str = r#"[
    {"parent": "ec", "child": "mother", "field": "wife", "kind": "one_to_one",
     "from": "ec.id", "to": "mother.ec_id"},
    {"parent": "mother", "child": "child", "field": "children", "kind": "one_to_many",
     "from": "mother.id", "to": "child.mother_id"}
]"#;

const EC_REGISTRATION: &str = r#"{
    "form": {
        "bind_type": "ec",
        "default_bind_path": "/model/instance/EC/",
        "fields": [
            {"name": "id", "shouldLoadValue": true},
            {"name": "wife_name", "shouldLoadValue": true},
            {"name": "wife_age", "source": "ec.mother.age", "shouldLoadValue": true}
        ],
        "sub_forms": [
            {"name": "child_registration", "bind_type": "child",
             "fields": [{"name": "name", "shouldLoadValue": true}]}
        ]
    }
}"#;

/// Helper to create a test project with the ec/mother/child forms
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    ziggy().current_dir(tmp.path()).arg("init").assert().success();

    let forms = tmp.path().join("forms");
    fs::write(forms.join("entity_relationship.json"), RELATIONSHIPS).unwrap();
    fs::create_dir_all(forms.join("ec_registration")).unwrap();
    fs::write(
        forms.join("ec_registration").join("form_definition.json"),
        EC_REGISTRATION,
    )
    .unwrap();
    tmp
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

/// Fetch the blank registration form, fill it and save it; returns the save outcome
fn register_family(tmp: &TempDir) -> Value {
    let output = ziggy()
        .current_dir(tmp.path())
        .args(["form", "get", "ec_registration"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let mut form = stdout_json(&output);
    form["form"]["fields"][1]["value"] = Value::from("Asha");
    form["form"]["fields"][2]["value"] = Value::from(24);
    form["form"]["sub_forms"][0]["instances"] = serde_json::json!([
        {"name": "Ravi"},
        {"name": "Sita"}
    ]);

    let output = ziggy()
        .current_dir(tmp.path())
        .args(["form", "save", "ec_registration", "--instance-id", "sub-1"])
        .write_stdin(form.to_string())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    stdout_json(&output)
}

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    ziggy()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Serves declarative forms"))
        .stdout(predicate::str::contains("form"));
}

#[test]
fn test_version_displays() {
    ziggy()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ziggy"));
}

#[test]
fn test_completions_bash() {
    ziggy()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ziggy"));
}

// ============================================================================
// Init Tests
// ============================================================================

#[test]
fn test_init_creates_project_structure() {
    let tmp = TempDir::new().unwrap();
    ziggy()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized ziggy project"));

    assert!(tmp.path().join(".ziggy/config.yaml").is_file());
    assert!(tmp.path().join("forms/entity_relationship.json").is_file());
}

#[test]
fn test_init_twice_warns() {
    let tmp = setup_test_project();
    ziggy()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_commands_outside_project_fail() {
    let tmp = TempDir::new().unwrap();
    ziggy()
        .current_dir(tmp.path())
        .args(["form", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a ziggy project"));
}

// ============================================================================
// Form Tests
// ============================================================================

#[test]
fn test_form_list() {
    let tmp = setup_test_project();
    ziggy()
        .current_dir(tmp.path())
        .args(["form", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ec_registration"));
}

#[test]
fn test_form_get_blank_template() {
    let tmp = setup_test_project();
    let output = ziggy()
        .current_dir(tmp.path())
        .args(["form", "get", "ec_registration"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let form = stdout_json(&output);
    assert_eq!(form["form"]["fields"][0]["source"], "ec.id");
    assert_eq!(form["form"]["fields"][2]["source"], "ec.mother.age");
    assert_eq!(form["form"]["default_bind_path"], "/model/instance/EC/");
    assert_eq!(form["form"]["sub_forms"][0]["instances"], serde_json::json!([]));
}

#[test]
fn test_form_get_unknown_form_fails() {
    let tmp = setup_test_project();
    ziggy()
        .current_dir(tmp.path())
        .args(["form", "get", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("form_definition.json"));
}

#[test]
fn test_form_save_and_reload_from_entities() {
    let tmp = setup_test_project();
    let outcome = register_family(&tmp);

    let entity_id = outcome["params"]["entityId"].as_str().unwrap().to_string();
    assert_eq!(outcome["params"]["id"], "sub-1");
    assert_eq!(outcome["report"]["persisted"].as_array().unwrap().len(), 4);

    let output = ziggy()
        .current_dir(tmp.path())
        .args(["form", "get", "ec_registration", "--entity-id", &entity_id])
        .output()
        .unwrap();
    assert!(output.status.success());

    let form = stdout_json(&output);
    assert_eq!(form["form"]["fields"][0]["value"], entity_id.as_str());
    assert_eq!(form["form"]["fields"][1]["value"], "Asha");
    assert_eq!(form["form"]["fields"][2]["value"], 24);

    let instances = form["form"]["sub_forms"][0]["instances"].as_array().unwrap();
    let names: Vec<&str> = instances.iter().filter_map(|i| i["name"].as_str()).collect();
    assert_eq!(names, vec!["Ravi", "Sita"]);
}

#[test]
fn test_form_get_resumes_saved_instance() {
    let tmp = setup_test_project();
    let outcome = register_family(&tmp);

    let output = ziggy()
        .current_dir(tmp.path())
        .args(["form", "get", "ec_registration", "--instance-id", "sub-1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output), outcome["form"]);
}

#[test]
fn test_form_get_applies_overrides() {
    let tmp = setup_test_project();
    let outcome = register_family(&tmp);
    let entity_id = outcome["params"]["entityId"].as_str().unwrap().to_string();

    // {"wife_age":30}, URL-encoded twice
    let overrides = "%257B%2522wife_age%2522%253A30%257D";
    let output = ziggy()
        .current_dir(tmp.path())
        .args([
            "form",
            "get",
            "ec_registration",
            "--entity-id",
            &entity_id,
            "--overrides",
            overrides,
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["form"]["fields"][2]["value"], 30);
}

#[test]
fn test_form_get_malformed_overrides_fail() {
    let tmp = setup_test_project();
    ziggy()
        .current_dir(tmp.path())
        .args([
            "form",
            "get",
            "ec_registration",
            "--entity-id",
            "ec-1",
            "--overrides",
            "not-json",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed field overrides"));
}

#[test]
fn test_form_save_from_file() {
    let tmp = setup_test_project();
    let form_path = tmp.path().join("filled.json");
    fs::write(
        &form_path,
        r#"{"form": {"bind_type": "ec", "fields": [{"name": "wife_name", "value": "Meena"}]}}"#,
    )
    .unwrap();

    let output = ziggy()
        .current_dir(tmp.path())
        .args(["--compact", "form", "save", "ec_registration", "--file"])
        .arg(&form_path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let outcome = stdout_json(&output);
    assert!(outcome["params"]["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(outcome["form"]["fields"][1]["source"], "ec.id");
}

#[test]
fn test_form_save_invalid_json_fails() {
    let tmp = setup_test_project();
    ziggy()
        .current_dir(tmp.path())
        .args(["form", "save", "ec_registration"])
        .write_stdin("{ nope")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

#[test]
fn test_form_delete() {
    let tmp = setup_test_project();
    register_family(&tmp);

    ziggy()
        .current_dir(tmp.path())
        .args(["form", "delete", "ec_registration", "--instance-id", "sub-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted"));

    ziggy()
        .current_dir(tmp.path())
        .args(["form", "delete", "ec_registration", "--instance-id", "sub-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no saved instance"));
}

// ============================================================================
// Entity Tests
// ============================================================================

#[test]
fn test_entity_show() {
    let tmp = setup_test_project();
    let outcome = register_family(&tmp);
    let entity_id = outcome["params"]["entityId"].as_str().unwrap().to_string();

    ziggy()
        .current_dir(tmp.path())
        .args(["entity", "show", "ec", &entity_id])
        .assert()
        .success()
        .stdout(predicate::str::contains("Asha"));
}

#[test]
fn test_entity_show_hierarchy() {
    let tmp = setup_test_project();
    let outcome = register_family(&tmp);
    let entity_id = outcome["params"]["entityId"].as_str().unwrap().to_string();

    let output = ziggy()
        .current_dir(tmp.path())
        .args(["entity", "show", "ec", &entity_id, "--hierarchy"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let tree = stdout_json(&output);
    assert_eq!(tree["ec"]["mother"]["age"], 24);
    assert_eq!(tree["ec"]["mother"]["child"].as_array().unwrap().len(), 2);
}

#[test]
fn test_entity_show_missing() {
    let tmp = setup_test_project();
    ziggy()
        .current_dir(tmp.path())
        .args(["entity", "show", "ec", "ec-404"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ec-404"));
}

#[test]
fn test_entity_path() {
    let tmp = setup_test_project();
    ziggy()
        .current_dir(tmp.path())
        .args(["entity", "path", "ec", "child"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ec.mother.child"));

    ziggy()
        .current_dir(tmp.path())
        .args(["entity", "path", "child", "ec"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no relation path"));
}

#[test]
fn test_entity_types() {
    let tmp = setup_test_project();
    ziggy()
        .current_dir(tmp.path())
        .args(["entity", "types"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mother"))
        .stdout(predicate::str::contains("as children"))
        .stdout(predicate::str::contains("one_to_many"));
}

// ============================================================================
// Status Tests
// ============================================================================

#[test]
fn test_status_counts_entities() {
    let tmp = setup_test_project();
    register_family(&tmp);

    ziggy()
        .current_dir(tmp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved instances: 1"))
        .stdout(predicate::str::contains("Total entities:  4"));
}
