//! End-to-end tests driving the `sf` binary.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

use sigform_core::form::{Bound, Form, Step, Track};

fn sf(db: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sf").unwrap();
    cmd.arg("--db").arg(db);
    cmd
}

/// The same recipe end to end: place the sine peak and trough, derive
/// the interval between them, and require it to be positive.
fn sample_form() -> Form {
    let mut form = Form::new("qt");
    let peak = form.add_point("Peak", "");
    let trough = form.add_point("Trough", "");
    let rr = form.add_parameter("rr", "", None);

    let max = form.new_object("GlobalMax");
    form.push_step(Step {
        target: peak,
        left: Bound::padding(0.0),
        right: Bound::padding(0.0),
        tracks: vec![Track {
            modifiers: vec![],
            selectors: vec![max],
        }],
    });
    let min = form.new_object("GlobalMin");
    form.push_step(Step {
        target: trough,
        left: Bound::anchor(peak),
        right: Bound::padding(0.0),
        tracks: vec![Track {
            modifiers: vec![],
            selectors: vec![min],
        }],
    });

    let interval = form
        .new_object("Interval")
        .with_input_point("from", peak)
        .with_input_point("to", trough)
        .with_output_param("interval", rr);
    form.add_calculator(interval);
    let positive = form.new_object("Positive").with_input_param("value", rr);
    form.add_condition(positive);
    form
}

fn write_form(dir: &Path, form: &Form) -> PathBuf {
    let path = dir.join(format!("{}.json", form.name));
    std::fs::write(&path, serde_json::to_string_pretty(form).unwrap()).unwrap();
    path
}

fn write_sine(dir: &Path, hz: u32) -> PathBuf {
    let path = dir.join("signal.csv");
    let mut csv = String::new();
    for i in 0..=hz {
        let t = 2.0 * std::f64::consts::PI * f64::from(i) / f64::from(hz);
        csv.push_str(&format!("{}\n", t.sin()));
    }
    std::fs::write(&path, csv).unwrap();
    path
}

#[test]
fn init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("forms.db");

    sf(&db)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized"));
    assert!(db.exists());

    sf(&db)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn commands_refuse_a_missing_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("missing.db");

    sf(&db)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("sf init"));
}

#[test]
fn import_list_export_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("forms.db");
    sf(&db).arg("init").assert().success();

    let form = sample_form();
    let path = write_form(dir.path(), &form);
    sf(&db)
        .arg("import")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported form \"qt\""));

    sf(&db)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("qt"));

    let output = sf(&db).args(["export", "qt"]).assert().success();
    let exported: Form =
        serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(exported.name, "qt");
    assert_eq!(exported.points.len(), 2);
    assert_eq!(exported.steps.len(), 2);
    assert_eq!(exported.calculators.len(), 1);
}

#[test]
fn import_warns_about_violations() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("forms.db");
    sf(&db).arg("init").assert().success();

    // A point with no step targeting it, and no parameters at all.
    let mut form = Form::new("draft");
    form.add_point("P", "");
    let path = write_form(dir.path(), &form);

    sf(&db)
        .arg("import")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("not runnable"));

    sf(&db)
        .args(["validate", "draft"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("is not runnable"));
}

#[test]
fn validate_accepts_a_runnable_form() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("forms.db");
    sf(&db).arg("init").assert().success();

    let path = write_form(dir.path(), &sample_form());
    sf(&db).arg("import").arg(&path).assert().success();

    sf(&db)
        .args(["validate", "qt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("runnable"));
}

#[test]
fn run_places_points_and_reports() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("forms.db");
    sf(&db).arg("init").assert().success();

    let form_path = write_form(dir.path(), &sample_form());
    sf(&db).arg("import").arg(&form_path).assert().success();
    let signal_path = write_sine(dir.path(), 500);

    sf(&db)
        .args(["run", "qt", "--signal"])
        .arg(&signal_path)
        .args(["--hz", "500"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Peak"))
        .stdout(predicate::str::contains("Outcome: ok"));

    let output = sf(&db)
        .arg("--json")
        .args(["run", "qt", "--signal"])
        .arg(&signal_path)
        .args(["--hz", "500"])
        .assert()
        .success();
    let report: serde_json::Value =
        serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(report["outcome"]["status"], "ok");
    let rr = report["parameters"]["rr"].as_f64().unwrap();
    assert!((rr - 0.5).abs() < 1e-9);
}

#[test]
fn run_of_unknown_form_fails() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("forms.db");
    sf(&db).arg("init").assert().success();
    let signal_path = write_sine(dir.path(), 100);

    sf(&db)
        .args(["run", "ghost", "--signal"])
        .arg(&signal_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn delete_removes_the_form() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("forms.db");
    sf(&db).arg("init").assert().success();

    let path = write_form(dir.path(), &sample_form());
    sf(&db).arg("import").arg(&path).assert().success();

    sf(&db)
        .args(["delete", "qt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Deleted"));

    sf(&db)
        .args(["delete", "qt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}
