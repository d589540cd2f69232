//! End-to-end runs over a real on-disk project layout.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use shear_refactor::{run, ExtractSubclassParams, SignatureRetype};

const GOD_CLASS: &str = "\
public class GodClass {
    private int field1;
    int keep;

    public GodClass(int seed) {
        this.field1 = seed;
    }

    public int method1() {
        return field1;
    }

    public int method2() {
        return keep;
    }
}
";

const CLIENT: &str = "\
class Client {
    GodClass passthrough(GodClass input) {
        return input;
    }

    void uses() {
        GodClass obj = new GodClass();
        obj.method1();
    }

    void ignores() {
        GodClass other = new GodClass();
        other.method2();
    }
}
";

struct Project {
    _dir: tempfile::TempDir,
    params: ExtractSubclassParams,
}

fn set_up(fields: &[&str], methods: &[&str]) -> Project {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    fs::write(root.join("GodClass.java"), GOD_CLASS).unwrap();
    fs::write(root.join("Client.java"), CLIENT).unwrap();

    let params = ExtractSubclassParams {
        source_class: "GodClass".to_string(),
        new_class: ExtractSubclassParams::default_new_class("GodClass"),
        moved_fields: fields.iter().map(|s| s.to_string()).collect(),
        moved_methods: methods.iter().map(|s| s.to_string()).collect(),
        source_file: root.join("GodClass.java"),
        project_root: root.clone(),
        output_dir: root,
        signature_retype: SignatureRetype::default(),
    };
    Project { _dir: dir, params }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn full_run_moves_members_and_retargets_clients() {
    let project = set_up(&["field1"], &["method1"]);
    let report = run(&project.params).unwrap();

    // Source lost the moved members; the constructor migrated because it
    // assigns field1.
    let source = read(&project.params.source_file);
    assert!(!source.contains("field1"));
    assert!(!source.contains("method1"));
    assert!(!source.contains("GodClass(int seed)"));
    assert!(source.contains("int keep;"));
    assert!(source.contains("public int method2()"));
    assert_eq!(report.migrated_constructors, 1);

    // Generated subclass holds them all.
    let subclass = read(&report.generated_file);
    assert!(subclass.contains("class GodClassextracted extends GodClass"));
    assert!(subclass.contains("public GodClassextracted(){ }"));
    assert!(subclass.contains("\tprivate int field1;"));
    assert!(subclass.contains("public int method1()"));
    assert!(subclass.contains("this.field1 = seed;"));
    assert!(!subclass.contains("method2"));

    // The client that uses method1 is retyped and its creation retargeted;
    // the one that only uses method2 is not. Signatures retype regardless.
    let client = read(&project.params.project_root.join("Client.java"));
    assert!(client.contains("GodClassextracted passthrough(GodClassextracted input)"));
    assert!(client.contains("GodClassextracted obj = new GodClassextracted();"));
    assert!(client.contains("GodClass other = new GodClass();"));

    assert_eq!(report.dependents_scanned, 1);
    assert_eq!(
        report.files_changed,
        vec![
            project.params.source_file.clone(),
            project.params.project_root.join("Client.java"),
        ]
    );
    assert_eq!(report.skipped, vec![]);
}

#[test]
fn usage_gated_policy_spares_files_without_moved_usage() {
    let mut project = set_up(&[], &["method2"]);
    project.params.signature_retype = SignatureRetype::UsageGated;
    run(&project.params).unwrap();

    let client = read(&project.params.project_root.join("Client.java"));
    // `other` uses method2, so its declaration retypes, and the file's
    // signatures retype with it.
    assert!(client.contains("GodClassextracted other = new GodClassextracted();"));
    assert!(client.contains("GodClassextracted passthrough(GodClassextracted input)"));
    // `obj` only uses method1, which stayed behind.
    assert!(client.contains("GodClass obj = new GodClass();"));
}

#[test]
fn empty_move_set_leaves_every_source_untouched() {
    let project = set_up(&[], &[]);
    let report = run(&project.params).unwrap();

    assert_eq!(read(&project.params.source_file), GOD_CLASS);
    let client = read(&project.params.project_root.join("Client.java"));
    // Signature positions still retype under the default policy.
    assert!(client.contains("GodClassextracted passthrough(GodClassextracted input)"));
    // Declarations never do without a moved-member usage.
    assert!(client.contains("GodClass obj = new GodClass();"));

    // The subclass shell is still generated.
    let subclass = read(&report.generated_file);
    assert!(subclass.contains("class GodClassextracted extends GodClass"));
}

#[test]
fn rerun_over_refactored_sources_changes_nothing() {
    let project = set_up(&["field1"], &["method1"]);
    run(&project.params).unwrap();

    let source_after = read(&project.params.source_file);
    let client_after = read(&project.params.project_root.join("Client.java"));

    let report = run(&project.params).unwrap();
    assert_eq!(read(&project.params.source_file), source_after);
    assert_eq!(
        read(&project.params.project_root.join("Client.java")),
        client_after
    );
    assert_eq!(report.files_changed, Vec::<std::path::PathBuf>::new());
}

#[test]
fn signature_only_dependent_is_committed_by_discovery() {
    let project = set_up(&["field1"], &["method1"]);
    let factory = project.params.project_root.join("Factory.java");
    fs::write(
        &factory,
        "\
class Factory {
    GodClass supply(GodClass seed) {
        return seed;
    }
}
",
    )
    .unwrap();

    let report = run(&project.params).unwrap();

    // Discovery is the pass that rewrites this file (it has no declarations
    // for propagation to narrow); the retypes must land on disk and the file
    // must be counted exactly once.
    let text = read(&factory);
    assert!(text.contains("GodClassextracted supply(GodClassextracted seed)"));
    assert_eq!(
        report
            .files_changed
            .iter()
            .filter(|path| **path == factory)
            .count(),
        1
    );
    assert_eq!(report.skipped, vec![]);
}

#[test]
fn non_utf8_dependent_is_skipped_not_fatal() {
    let project = set_up(&[], &["method1"]);
    let bad = project.params.project_root.join("Legacy.java");
    fs::write(&bad, [0x63, 0x6c, 0x61, 0xff, 0xfe, 0x73, 0x73]).unwrap();

    let report = run(&project.params).unwrap();
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, bad);
    assert_eq!(report.skipped[0].reason, "not valid UTF-8");

    // The well-formed dependent was still processed.
    let client = read(&project.params.project_root.join("Client.java"));
    assert!(client.contains("GodClassextracted obj = new GodClassextracted();"));
}

#[test]
fn generated_file_is_not_treated_as_a_dependent() {
    let project = set_up(&[], &["method1"]);
    // Run twice: the second run must not discover usages inside the file the
    // first run generated.
    run(&project.params).unwrap();
    let report = run(&project.params).unwrap();
    assert_eq!(report.dependents_scanned, 1);
}
