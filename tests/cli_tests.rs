//! The `scan`, `tables` and `validate` commands against temporary snapshots.

use gitsql::cli::{cmd_scan, cmd_tables, cmd_validate};
use gitsql::output::OutputFormat;
use gitsql::{Config, RepositoryConfig};
use gitsql_core::object::{FileMode, ObjectHash, TreeEntry};
use gitsql_core::MemoryRepository;

struct Fixture {
    _dir: tempfile::TempDir,
    config: Config,
    root: ObjectHash,
    sub: ObjectHash,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();

    let mut b = MemoryRepository::builder();
    let sub = b.add_tree(vec![TreeEntry::file(
        "main.rs",
        FileMode::REGULAR,
        ObjectHash::digest(b"fn main() {}"),
    )]);
    let root = b.add_tree(vec![
        TreeEntry::file("README", FileMode::REGULAR, ObjectHash::digest(b"hi")),
        TreeEntry::tree("src", sub),
    ]);
    let json = serde_json::to_string(&b.build().to_snapshot()).unwrap();
    std::fs::write(dir.path().join("repo.json"), json).unwrap();

    let config = Config {
        repositories: vec![RepositoryConfig {
            id: "repo".to_string(),
            snapshot: "repo.json".into(),
        }],
        base_dir: dir.path().to_path_buf(),
        ..Config::default()
    };
    Fixture {
        _dir: dir,
        config,
        root,
        sub,
    }
}

fn scan(f: &Fixture, hashes: &[String], format: OutputFormat) -> String {
    let mut out = Vec::new();
    cmd_scan(&mut out, &f.config, "tree_entries", hashes, format).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn test_tables() {
    let f = fixture();
    let mut out = Vec::new();
    cmd_tables(&mut out, &f.config).unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("Table(tree_entries)"));
    assert_eq!(out.matches("Column(").count(), 5);
}

#[test]
fn test_scan_json() {
    let f = fixture();
    let out = scan(&f, &[], OutputFormat::Json);
    let rows: Vec<serde_json::Value> = out
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["tree_hash"], f.sub.to_string());
    assert_eq!(rows[2]["tree_entry_name"], "src/main.rs");
    assert_eq!(rows[2]["repository_id"], "repo");
}

#[test]
fn test_scan_tsv_by_tree_hash() {
    let f = fixture();
    let out = scan(&f, &[f.root.to_string()], OutputFormat::Tsv);
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(
        lines[0],
        "repository_id\ttree_hash\tblob_hash\ttree_entry_mode\ttree_entry_name"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[1].ends_with("\t100644\tREADME"));
    assert!(lines[2].ends_with("\t100644\tsrc/main.rs"));
}

#[test]
fn test_scan_unknown_hash() {
    let f = fixture();
    let out = scan(&f, &["0".repeat(40), "zz".to_string()], OutputFormat::Json);
    assert!(out.is_empty());
}

#[test]
fn test_scan_unknown_table() {
    let f = fixture();
    let mut out = Vec::new();
    assert!(cmd_scan(&mut out, &f.config, "commits", &[], OutputFormat::Json).is_err());
}

#[test]
fn test_validate() {
    let dir = tempfile::tempdir().unwrap();

    let good = dir.path().join("good.json");
    std::fs::write(
        &good,
        r#"{"node": "table", "name": "t", "schema": [
            {"name": "a", "type": "text", "nullable": false, "source": "t"}
        ]}"#,
    )
    .unwrap();
    let mut out = Vec::new();
    assert!(cmd_validate(&mut out, &good).unwrap());
    assert_eq!(String::from_utf8(out).unwrap(), "ok\n");

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, r#"{"node": "unresolved_table", "name": "t"}"#).unwrap();
    let mut out = Vec::new();
    assert!(!cmd_validate(&mut out, &bad).unwrap());
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "plan is not resolved because of node 'UnresolvedTable'\n"
    );

    let mut out = Vec::new();
    assert!(cmd_validate(&mut out, &dir.path().join("missing.json")).is_err());
}
