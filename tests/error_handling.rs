// tests/error_handling.rs

use std::fs;

use tempfile::tempdir;

use dagrun::config::load_and_validate;
use dagrun::errors::DagrunError;

fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Dagrun.toml");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn test_cycle_detection() {
    let (_dir, path) = write_config(
        r#"
[[node]]
name = "a"
after = ["b"]
sql = "SELECT 1"

[[node]]
name = "b"
after = ["a"]
sql = "SELECT 1"
"#,
    );

    match load_and_validate(&path) {
        Err(DagrunError::DagCycle(_)) => {}
        Err(e) => panic!("Expected DagCycle error, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_predecessor() {
    let (_dir, path) = write_config(
        r#"
[[node]]
name = "d"
after = ["z"]
sql = "SELECT 1"
"#,
    );

    match load_and_validate(&path) {
        Err(DagrunError::ConfigError(msg)) => {
            assert!(msg.contains("unknown predecessor"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_self_dependency() {
    let (_dir, path) = write_config(
        r#"
[[node]]
name = "a"
after = ["a"]
sql = "SELECT 1"
"#,
    );

    assert!(matches!(
        load_and_validate(&path),
        Err(DagrunError::ConfigError(_))
    ));
}

#[test]
fn test_duplicate_node_names() {
    let (_dir, path) = write_config(
        r#"
[[node]]
name = "a"
sql = "SELECT 1"

[[node]]
name = "a"
sql = "SELECT 2"
"#,
    );

    match load_and_validate(&path) {
        Err(DagrunError::ConfigError(msg)) => assert!(msg.contains("'a'")),
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_both_sql_and_sql_file() {
    let (_dir, path) = write_config(
        r#"
[[node]]
name = "a"
sql = "SELECT 1"
sql_file = "a.sql"
"#,
    );

    assert!(matches!(
        load_and_validate(&path),
        Err(DagrunError::ConfigError(_))
    ));
}

#[test]
fn test_unknown_node_key_is_a_toml_error() {
    let (_dir, path) = write_config(
        r#"
[[node]]
name = "a"
sql = "SELECT 1"
command = "echo hi"
"#,
    );

    assert!(matches!(
        load_and_validate(&path),
        Err(DagrunError::TomlError(_))
    ));
}

#[test]
fn test_missing_config_file() {
    let dir = tempdir().unwrap();
    let result = load_and_validate(dir.path().join("nope.toml"));
    assert!(result.is_err());
}

#[test]
fn test_base_dir_is_the_config_directory() {
    let (dir, path) = write_config(
        r#"
[[node]]
name = "a"
sql_file = "sql/a.sql"
"#,
    );

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.base_dir, dir.path());
}
