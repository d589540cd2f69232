use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn shear() -> Command {
    Command::cargo_bin("shear").unwrap()
}

fn write_project(dir: &std::path::Path) {
    fs::write(
        dir.join("GodClass.java"),
        "\
public class GodClass {
    private int field1;

    public int method1() {
        return field1;
    }

    public int method2() {
        return 0;
    }
}
",
    )
    .unwrap();
    fs::write(
        dir.join("Client.java"),
        "\
class Client {
    void m() {
        GodClass obj = new GodClass();
        obj.method1();
    }
}
",
    )
    .unwrap();
}

#[test]
fn extract_subclass_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    shear()
        .args(["extract-subclass", "--source-class", "GodClass"])
        .args(["--field", "field1", "--method", "method1"])
        .arg("--file")
        .arg(dir.path().join("GodClass.java"))
        .arg("--project-root")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("constructors migrated: 0"))
        .stdout(predicate::str::contains("files changed: 2"));

    let subclass = fs::read_to_string(dir.path().join("GodClassextracted.java")).unwrap();
    assert!(subclass.contains("class GodClassextracted extends GodClass"));
    assert!(subclass.contains("public int method1()"));

    let client = fs::read_to_string(dir.path().join("Client.java")).unwrap();
    assert!(client.contains("GodClassextracted obj = new GodClassextracted();"));
}

#[test]
fn extract_subclass_reads_a_params_file() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    let params = serde_json::json!({
        "source_class": "GodClass",
        "new_class": "GodClassextracted",
        "moved_methods": ["method1"],
        "source_file": dir.path().join("GodClass.java"),
        "project_root": dir.path(),
        "output_dir": dir.path(),
    });
    let params_file = dir.path().join("params.json");
    fs::write(&params_file, serde_json::to_string_pretty(&params).unwrap()).unwrap();

    shear()
        .args(["extract-subclass", "--json", "--params"])
        .arg(&params_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"generated_file\""))
        .stdout(predicate::str::contains("GodClassextracted.java"));
}

#[test]
fn info_diagnostics_go_to_stderr() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());

    shear()
        .env("RUST_LOG", "info")
        .args(["extract-subclass", "--source-class", "GodClass"])
        .args(["--method", "method1"])
        .arg("--file")
        .arg(dir.path().join("GodClass.java"))
        .arg("--project-root")
        .arg(dir.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("running extract-subclass"));
}

#[test]
fn missing_source_class_flag_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    shear()
        .arg("extract-subclass")
        .arg("--file")
        .arg(dir.path().join("GodClass.java"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--source-class is required"));
}

#[test]
fn parse_reports_errors_with_nonzero_exit() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("Broken.java");
    fs::write(&file, "class Broken { void m( { } }").unwrap();

    shear().arg("parse").arg(&file).assert().code(1);

    let ok = dir.path().join("Fine.java");
    fs::write(&ok, "class Fine { }").unwrap();
    shear()
        .arg("parse")
        .arg(&ok)
        .assert()
        .success()
        .stdout(predicate::str::contains("no parse errors"));
}
