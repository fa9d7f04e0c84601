//! Integration tests for the slopefinder CLI

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const RESORTS: &str = r#"[
  {"id": "vail", "name": "Vail", "region": "Rocky", "fullDayTicket": "$209",
   "latitude": 39.6061, "longitude": -106.355,
   "difficulty": {"percent": {"blue": "40%"}}},
  {"id": "stowe", "name": "Stowe", "region": "East", "fullDayTicket": "$139",
   "latitude": "44.5303", "longitude": "-72.7814",
   "difficulty": {"percent": {"green": "42%"}}}
]"#;

fn run(dir: &Path, args: &[&str]) -> Output {
    let config = dir.join("config.toml");
    std::fs::write(
        &config,
        format!(
            "[geocoding]\ncache_location = \"{}\"\n",
            dir.join("cache").display()
        ),
    )
    .unwrap();
    let resorts = dir.join("resorts.json");
    std::fs::write(&resorts, RESORTS).unwrap();

    Command::new(env!("CARGO_BIN_EXE_slopefinder"))
        .arg(&resorts)
        .arg("--config")
        .arg(&config)
        .args(args)
        .env_remove("SLOPEFINDER_USER")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI describes itself with --help
#[test]
fn test_cli_help() {
    let output = Command::new(env!("CARGO_BIN_EXE_slopefinder"))
        .arg("--help")
        .output()
        .expect("Failed to execute command");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--difficulty"));
    assert!(stdout.contains("--near"));
}

#[test]
fn test_lists_all_resorts_without_filters() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &[]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2 resorts match"));
}

#[test]
fn test_difficulty_and_region_flags_narrow_results() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["--difficulty", "green", "--region", "east"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("1 resorts match"));
    assert!(stdout.contains("Stowe"));
    assert!(!stdout.contains("Vail"));
}

#[test]
fn test_favorites_only_without_favorites_shows_notice() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["--favorites-only"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No favorites yet"));
}

#[test]
fn test_unknown_difficulty_is_rejected() {
    let dir = TempDir::new().unwrap();
    let output = run(dir.path(), &["--difficulty", "purple"]);

    assert!(!output.status.success());
}
