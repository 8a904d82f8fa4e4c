use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to get the route-forge binary command, isolated from the caller's
/// environment.
#[allow(deprecated)]
fn route_forge() -> Command {
    let mut cmd = Command::cargo_bin("route-forge").unwrap();
    cmd.env_remove("ROUTE_FORGE_CONFIG")
        .env_remove("ROUTE_FORGE_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

const PERSON: &str = r#"
[[models]]
name = "person"

[models.attributes.name]
type = "string"
required = true

[models.attributes.age]
type = "integer"
min = 0
max = 150
"#;

const GUARDED: &str = r#"
[[models]]
name = "secret"
roles = { get = ["admin"] }

[models.attributes.title]
type = "string"

[[auth.tokens]]
token = "t0ken"
principal = "ops"
scopes = ["admin"]
"#;

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("route-forge.toml");
    fs::write(&path, contents).unwrap();
    path
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ---------------------------------------------------------------------------
// Help and version tests
// ---------------------------------------------------------------------------

#[test]
fn help_exits_zero() {
    route_forge()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("REST routes"));
}

#[test]
fn version_exits_zero() {
    route_forge()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("route-forge"));
}

#[test]
fn routes_help() {
    route_forge()
        .args(["routes", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Print the generated route table"));
}

#[test]
fn check_help() {
    route_forge()
        .args(["check", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--tasks"));
}

#[test]
fn serve_help() {
    route_forge()
        .args(["serve", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--bind"));
}

// ---------------------------------------------------------------------------
// Completions tests
// ---------------------------------------------------------------------------

#[test]
fn completions_bash() {
    route_forge()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("route-forge"));
}

#[test]
fn completions_zsh() {
    route_forge()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn completions_invalid_shell_rejected() {
    route_forge()
        .args(["completions", "tcsh"])
        .assert()
        .failure();
}

// ---------------------------------------------------------------------------
// Routes command tests
// ---------------------------------------------------------------------------

#[test]
fn routes_human_table() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, PERSON);

    route_forge()
        .args(["--config", path_arg(&config), "routes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("METHOD"))
        .stdout(predicate::str::contains("/person/{id?}"))
        .stdout(predicate::str::contains("DELETE"));
}

#[test]
fn routes_json_documents_every_verb() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, PERSON);

    let out = route_forge()
        .args(["--config", path_arg(&config), "--format", "json", "routes"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let docs: serde_json::Value = serde_json::from_slice(&out).unwrap();
    let docs = docs.as_array().unwrap();
    assert_eq!(docs.len(), 5);
    let post = docs.iter().find(|d| d["method"] == "POST").unwrap();
    assert!(post["responses"]["201"].is_object());
    assert!(post["validate"]["payload"].is_object());
}

#[test]
fn routes_found_via_local_config_file() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, PERSON);

    route_forge()
        .current_dir(dir.path())
        .args(["--format", "plain", "routes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("GET\t/person/{id?}\t-"));
}

#[test]
fn routes_csrf_route_listed_when_enabled() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        &dir,
        &format!("[server]\ncsrf = {{ enabled = true, secret = \"k\" }}\n{PERSON}"),
    );

    route_forge()
        .args(["--config", path_arg(&config), "--format", "plain", "routes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/csrf"));
}

#[test]
fn routes_unknown_model_filter_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, PERSON);

    route_forge()
        .args(["--config", path_arg(&config), "routes", "--model", "ghost"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("'ghost' not found"));
}

#[test]
fn routes_without_models_fails() {
    let dir = TempDir::new().unwrap();

    route_forge()
        .current_dir(dir.path())
        .arg("routes")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no models configured"));
}

#[test]
fn invalid_model_reports_parse_error() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[[models]]\nname = \"1 bad\"\n");

    route_forge()
        .args(["--no-color", "--config", path_arg(&config), "routes"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("invalid model name"));
}

#[test]
fn json_errors_are_structured() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, "[[models]]\nname = \"a\"\n[[models]]\nname = \"a\"\n");

    route_forge()
        .args(["--format", "json", "--config", path_arg(&config), "routes"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("\"server_error\""));
}

#[test]
fn missing_config_file_fails() {
    route_forge()
        .args(["--config", "/nonexistent/route-forge.toml", "routes"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("IO error"));
}

// ---------------------------------------------------------------------------
// Check command tests
// ---------------------------------------------------------------------------

#[test]
fn check_smoke_suite_passes() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, PERSON);

    let out = route_forge()
        .args(["--config", path_arg(&config), "--format", "json", "check"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["total"], 2);
    assert_eq!(report["failed"], 0);
    assert_eq!(report["tasks"][0]["task"], "POST person");
}

#[test]
fn check_tasks_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, PERSON);
    let tasks = dir.path().join("flows.toml");
    fs::write(
        &tasks,
        r#"
[[tasks]]
model = "person"
verb = "post"
payload = { name = "ada", age = 36 }
expect = { code = 201 }

[[tasks]]
model = "person"
verb = "get"
search = { name = "ada" }
expect = { code = "2xx" }

[[tasks]]
model = "person"
verb = "get"
search = { id = "missing" }
expect = { code = 404 }
"#,
    )
    .unwrap();

    route_forge()
        .args([
            "--config",
            path_arg(&config),
            "--format",
            "plain",
            "check",
            "--tasks",
            path_arg(&tasks),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok\tGET person/missing"));
}

#[test]
fn check_failing_task_exits_one() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, PERSON);
    let tasks = dir.path().join("flows.toml");
    fs::write(
        &tasks,
        "[[tasks]]\nmodel = \"person\"\nverb = \"post\"\npayload = { age = 9000 }\n",
    )
    .unwrap();

    route_forge()
        .args([
            "--config",
            path_arg(&config),
            "--format",
            "plain",
            "check",
            "--tasks",
            path_arg(&tasks),
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("fail\tPOST person"))
        .stderr(predicate::str::contains("1 of 1 flow tasks failed"));
}

#[test]
fn check_unknown_model_fails_per_validator() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, PERSON);
    let tasks = dir.path().join("flows.toml");
    fs::write(
        &tasks,
        "[[tasks]]\nmodel = \"i-dont-exist-in-your-world\"\nverb = \"get\"\n",
    )
    .unwrap();

    let out = route_forge()
        .args([
            "--config",
            path_arg(&config),
            "--format",
            "json",
            "check",
            "--tasks",
            path_arg(&tasks),
        ])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["tasks"][0]["failures"].as_array().unwrap().len(), 1);
}

#[test]
fn check_guarded_routes_need_token() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, GUARDED);

    route_forge()
        .args(["--config", path_arg(&config), "check"])
        .assert()
        .code(1);

    route_forge()
        .args(["--config", path_arg(&config), "check", "--token", "t0ken"])
        .assert()
        .success();
}

#[test]
fn check_with_csrf_enabled() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &format!("[server]\ncsrf = {{ enabled = true }}\n{PERSON}"));

    route_forge()
        .args(["--config", path_arg(&config), "check"])
        .assert()
        .success();
}

#[test]
fn check_loads_model_files() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("models")).unwrap();
    fs::write(
        dir.path().join("models/note.toml"),
        "name = \"note\"\n[attributes.body]\ntype = \"string\"\nrequired = true\n",
    )
    .unwrap();
    let config = write_config(&dir, "model_files = [\"models/*.toml\"]\n");

    let out = route_forge()
        .args(["--config", path_arg(&config), "--format", "json", "check"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(report["tasks"][1]["task"], "GET note");
}

#[test]
fn check_invalid_tasks_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, PERSON);
    let tasks = dir.path().join("flows.toml");
    fs::write(&tasks, "[[tasks]]\nmodel = \"person\"\nverb = \"head\"\n").unwrap();

    route_forge()
        .args([
            "--config",
            path_arg(&config),
            "check",
            "--tasks",
            path_arg(&tasks),
        ])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("flows.toml"));
}
