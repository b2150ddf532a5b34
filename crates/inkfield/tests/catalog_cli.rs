use std::process::Command;

use tempfile::TempDir;

#[test]
fn no_arguments_prints_help_and_fails() {
    let output = Command::new(env!("CARGO_BIN_EXE_inkfield"))
        .output()
        .expect("failed to run inkfield");
    assert!(!output.status.success());
    let help = String::from_utf8_lossy(&output.stderr);
    assert!(help.contains("IMAGE"), "help should mention IMAGE: {help}");
}

#[test]
fn missing_catalog_is_a_clean_error() {
    let root = TempDir::new().unwrap();
    let missing = root.path().join("nope.toml");
    let output = Command::new(env!("CARGO_BIN_EXE_inkfield"))
        .args(["--catalog", missing.to_str().unwrap()])
        .output()
        .expect("failed to run inkfield");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("catalog"),
        "error should mention the catalog: {stderr}"
    );
}

#[test]
fn malformed_catalog_is_a_clean_error() {
    let root = TempDir::new().unwrap();
    let manifest = root.path().join("catalog.toml");
    std::fs::write(&manifest, "image = \"not-a-table\"\n").unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_inkfield"))
        .args(["--catalog", manifest.to_str().unwrap()])
        .output()
        .expect("failed to run inkfield");
    assert!(!output.status.success());
}
