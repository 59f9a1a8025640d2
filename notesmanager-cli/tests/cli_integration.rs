use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::{tempdir, TempDir};

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "analytical1";

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        Self {
            dir: tempdir().unwrap(),
        }
    }

    fn database(&self) -> PathBuf {
        self.dir.path().join("notes.db")
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("settings.json")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("notesmanager"));
        cmd.arg("--database")
            .arg(self.database())
            .arg("--config")
            .arg(self.config())
            .env_remove("RUST_LOG");
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(["--format", "json", "--email", EMAIL, "--password", PASSWORD])
            .args(args)
            .output()
            .expect("notesmanager command executes");
        assert!(
            output.status.success(),
            "notesmanager {:?} failed:\nstdout:\n{}\nstderr:\n{}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("valid json stdout")
    }

    fn registered() -> Self {
        let env = Self::new();
        env.json(&["register", "--name", "Ada"]);
        env
    }
}

fn id_of(value: &Value) -> String {
    value["id"].as_i64().expect("numeric id").to_string()
}

#[test]
fn init_creates_database() {
    let env = Env::new();
    env.cmd()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database ready"));
    assert!(env.database().exists());
}

#[test]
fn init_refuses_foreign_file() {
    let env = Env::new();
    std::fs::write(env.database(), "definitely not sqlite").unwrap();
    env.cmd().arg("init").assert().failure();
}

#[test]
fn register_remembers_email_but_not_password() {
    let env = Env::registered();

    let settings = std::fs::read_to_string(env.config()).unwrap();
    assert!(settings.contains(EMAIL));
    assert!(!settings.contains(PASSWORD));

    env.cmd()
        .args(["--password", PASSWORD, "login"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as Ada"));
}

#[test]
fn duplicate_registration_fails_with_code() {
    let env = Env::registered();
    env.cmd()
        .args(["--format", "json", "--email", EMAIL, "--password", PASSWORD])
        .args(["register", "--name", "Ada again"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("email_taken"));
}

#[test]
fn wrong_password_is_rejected() {
    let env = Env::registered();
    env.cmd()
        .args(["--email", EMAIL, "--password", "nottheone1", "tree"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Wrong email or password"));
}

#[test]
fn build_and_show_tree() {
    let env = Env::registered();

    let binder = id_of(&env.json(&["binder", "add", "Work", "--color", "Blue"]));
    let tree = env.json(&["tree"]);
    let tab = tree["binders"][0]["tabs"][0]["id"].as_i64().unwrap().to_string();
    assert_eq!(tree["binders"][0]["tabs"][0]["name"], "New Tab");

    let note = id_of(&env.json(&["note", "add", &tab, "Plan"]));
    env.json(&["note", "edit", &note, "--content", "<p>ship it</p>"]);
    env.json(&["note", "label", &note, "Todo"]);
    env.json(&["tab", "rename", &tab, "Projects"]);
    env.json(&["binder", "rename", &binder, "Office"]);

    env.cmd()
        .args(["--email", EMAIL, "--password", PASSWORD, "tree"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Office (Blue)"))
        .stdout(predicate::str::contains("Projects"))
        .stdout(predicate::str::contains("Plan {Todo}"));

    let shown = env.json(&["note", "show", &note]);
    assert_eq!(shown["content"], "<p>ship it</p>");
    assert_eq!(shown["labels"][0]["name"], "Todo");
}

#[test]
fn label_filter_and_label_limit() {
    let env = Env::registered();
    env.json(&["binder", "add", "Work"]);
    let tree = env.json(&["tree"]);
    let tab = tree["binders"][0]["tabs"][0]["id"].as_i64().unwrap().to_string();

    let tagged = id_of(&env.json(&["note", "add", &tab, "Tagged"]));
    env.json(&["note", "add", &tab, "Plain"]);
    env.json(&["note", "label", &tagged, "Idea"]);
    env.json(&["note", "label", &tagged, "Important"]);

    let filtered = env.json(&["tree", "--label", "Idea"]);
    let notes = filtered["binders"][0]["tabs"][0]["notes"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["name"], "Tagged");

    env.cmd()
        .args(["--format", "json", "--email", EMAIL, "--password", PASSWORD])
        .args(["note", "label", &tagged, "Todo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("label_limit"));
}

#[test]
fn delete_binder_removes_everything() {
    let env = Env::registered();
    let binder = id_of(&env.json(&["binder", "add", "Scratch"]));
    env.json(&["binder", "delete", &binder]);

    let tree = env.json(&["tree"]);
    assert!(tree["binders"].as_array().unwrap().is_empty());

    env.cmd()
        .args(["--email", EMAIL, "--password", PASSWORD, "binder", "delete", &binder])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Binder no longer exists"));
}

#[test]
fn export_then_import_into_second_account() {
    let env = Env::registered();
    let binder = id_of(&env.json(&["binder", "add", "Travel"]));
    let tree = env.json(&["tree"]);
    let tab = tree["binders"][0]["tabs"][0]["id"].as_i64().unwrap().to_string();
    env.json(&["note", "add", &tab, "Packing list"]);
    assert!(!binder.is_empty());

    let export_path = env.dir.path().join("out").join("travel.json");
    let export_arg = export_path.to_string_lossy().to_string();
    let exported = env.json(&["export", &export_arg]);
    assert_eq!(exported["notes"], 1);

    let second = ["--format", "json", "--email", "bob@example.com", "--password", "builder42"];
    env.cmd()
        .args(second)
        .args(["register", "--name", "Bob"])
        .assert()
        .success();
    env.cmd()
        .args(second)
        .args(["import", &export_arg])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"notes\":1"));

    let output = env.cmd().args(second).arg("tree").output().unwrap();
    let tree: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tree["binders"][0]["name"], "Travel");
    assert_eq!(tree["binders"][0]["tabs"][0]["notes"][0]["name"], "Packing list");
}

#[test]
fn config_set_database() {
    let env = Env::new();
    let target = env.dir.path().join("elsewhere.db");
    Command::new(assert_cmd::cargo::cargo_bin!("notesmanager"))
        .arg("--config")
        .arg(env.config())
        .args(["config", "set-database"])
        .arg(&target)
        .assert()
        .success();

    let settings = std::fs::read_to_string(env.config()).unwrap();
    assert!(settings.contains(&*target.to_string_lossy()));
    assert!(Path::new(&env.config()).exists());
}

#[test]
fn numeric_label_name_wins_over_id() {
    let env = Env::registered();
    env.json(&["binder", "add", "Work"]);
    let tree = env.json(&["tree"]);
    let tab = tree["binders"][0]["tabs"][0]["id"].as_i64().unwrap().to_string();
    let note = id_of(&env.json(&["note", "add", &tab, "Budget"]));

    env.json(&["labels", "add", "2024"]);
    env.json(&["labels", "add", "1"]);
    env.json(&["note", "label", &note, "1"]);
    env.json(&["note", "label", &note, "2024"]);

    let shown = env.json(&["note", "show", &note]);
    let names: Vec<&str> = shown["labels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["1", "2024"]);

    // A plain id still works when no label has that name.
    env.json(&["note", "unlabel", &note, "1"]);
    let other = id_of(&env.json(&["note", "add", &tab, "Ideas"]));
    env.json(&["note", "label", &other, "3"]);
    let shown = env.json(&["note", "show", &other]);
    assert_eq!(shown["labels"][0]["name"], "Idea");
}

#[test]
fn label_filter_ignores_case_and_reports_unknown_labels() {
    let env = Env::registered();
    env.json(&["binder", "add", "Work"]);
    let tree = env.json(&["tree"]);
    let tab = tree["binders"][0]["tabs"][0]["id"].as_i64().unwrap().to_string();
    let note = id_of(&env.json(&["note", "add", &tab, "Spark"]));
    env.json(&["note", "label", &note, "Idea"]);

    let filtered = env.json(&["tree", "--label", "idea"]);
    assert_eq!(filtered["binders"][0]["tabs"][0]["notes"][0]["name"], "Spark");

    env.cmd()
        .args(["--format", "json", "--email", EMAIL, "--password", PASSWORD])
        .args(["tree", "--label", "Nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not_found"));
}
