use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const MODEL: &str = r#"
program: greet
about: Greets people.
options:
  - names: ["--help", "-h"]
    is_help: true
    description: Show this help
  - names: ["--name", "-n"]
    type: string
    default: world
    description: Who to greet
  - names: ["-l"]
    key: loud
    description: Shout
  - names: ["-s"]
    key: short
  - names: ["--secret"]
    hidden: true
commands:
  - names: ["repeat"]
    description: Repeat the greeting
    options:
      - names: ["--times"]
        type: number
        min_count: 1
"#;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("failed to write test file");
    path
}

fn optbind(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_optbind"))
        .args(args)
        .output()
        .expect("failed to run optbind")
}

fn model_arg(path: &Path) -> String {
    path.display().to_string()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "optbind failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is not JSON")
}

#[test]
fn test_parse_prints_bound_values() {
    let dir = TempDir::new().unwrap();
    let model = model_arg(&write_file(&dir, "model.yaml", MODEL));

    let output = optbind(&["parse", "--model", &model, "--", "--name", "you", "-l"]);
    let json = stdout_json(&output);
    assert_eq!(json["help_requested"], false);
    assert_eq!(json["command_path"], serde_json::json!([]));
    assert_eq!(json["values"]["name"], "you");
    assert_eq!(json["values"]["loud"], true);
    assert_eq!(json["values"]["short"], false);
}

#[test]
fn test_parse_with_command_nests_values() {
    let dir = TempDir::new().unwrap();
    let model = model_arg(&write_file(&dir, "model.yaml", MODEL));

    let output = optbind(&["parse", "--model", &model, "--", "repeat", "--times", "3"]);
    let json = stdout_json(&output);
    assert_eq!(json["command_path"], serde_json::json!(["repeat"]));
    assert_eq!(json["values"]["name"], "world");
    assert_eq!(json["values"]["repeat"]["times"], 3);
}

#[test]
fn test_parse_aggregated_short_options() {
    let dir = TempDir::new().unwrap();
    let model = model_arg(&write_file(&dir, "model.yaml", MODEL));

    let output = optbind(&["parse", "--model", &model, "--aggregate", "-", "--", "-ls"]);
    let json = stdout_json(&output);
    assert_eq!(json["values"]["loud"], true);
    assert_eq!(json["values"]["short"], true);

    let output = optbind(&["parse", "--model", &model, "--", "-ls"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: Unsupported option or parameter found: -ls"));
}

#[test]
fn test_parse_settings_file() {
    let dir = TempDir::new().unwrap();
    let model = model_arg(&write_file(&dir, "model.yaml", MODEL));
    let settings = write_file(
        &dir,
        "settings.yaml",
        "aggregate_short_options_prefix: \"-\"\n",
    );
    let settings = settings.display().to_string();

    let output = optbind(&["parse", "--model", &model, "--settings", &settings, "--", "-sl"]);
    let json = stdout_json(&output);
    assert_eq!(json["values"]["loud"], true);
}

#[test]
fn test_parse_argument_file() {
    let dir = TempDir::new().unwrap();
    let model = model_arg(&write_file(&dir, "model.yaml", MODEL));
    let args = write_file(&dir, "args.txt", "--name\nfrom a file\n");
    let token = format!("@{}", args.display());

    let output = optbind(&["parse", "--model", &model, "--", &token]);
    let json = stdout_json(&output);
    assert_eq!(json["values"]["name"], "from a file");
}

#[test]
fn test_parse_help_prints_usage() {
    let dir = TempDir::new().unwrap();
    let model = model_arg(&write_file(&dir, "model.yaml", MODEL));

    let output = optbind(&["parse", "--model", &model, "--", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Greets people.\n\nUsage: greet [options] [command] [command options]"));
    assert!(stdout.contains("  --name,-n VALUE  Who to greet"));
    assert!(stdout.contains("  repeat"));
    assert!(!stdout.contains("--secret"));
}

#[test]
fn test_parse_error_is_localized_and_fails() {
    let dir = TempDir::new().unwrap();
    let model = model_arg(&write_file(&dir, "model.yaml", MODEL));
    let catalog = write_file(
        &dir,
        "de.yaml",
        r#"locale: de
messages:
  "Unsupported option or parameter found: {0}": "Nicht unterstützte Option oder Parameter: {0}"
"#,
    );
    let catalog = catalog.display().to_string();

    let output = optbind(&["parse", "--model", &model, "--catalog", &catalog, "--", "--bogus"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: Nicht unterstützte Option oder Parameter: --bogus"));
}

#[test]
fn test_parse_command_cardinality_error() {
    let dir = TempDir::new().unwrap();
    let model = model_arg(&write_file(&dir, "model.yaml", MODEL));

    let output = optbind(&["parse", "--model", &model, "--", "repeat"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Option \"--times\" was given 0 times, but must be given exactly 1 times"));
}

#[test]
fn test_dry_run_reports_defaults() {
    let dir = TempDir::new().unwrap();
    let model = model_arg(&write_file(&dir, "model.yaml", MODEL));

    let output = optbind(&["parse", "--model", &model, "--dry-run", "--", "--name", "you"]);
    let json = stdout_json(&output);
    assert_eq!(json["values"]["name"], "world");
    assert_eq!(json["command_path"], serde_json::json!([]));
}

#[test]
fn test_usage_command() {
    let dir = TempDir::new().unwrap();
    let model = model_arg(&write_file(&dir, "model.yaml", MODEL));

    let output = optbind(&["usage", "--model", &model]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\nOptions:\n"));
    assert!(stdout.contains("\nCommands:\n  repeat  Repeat the greeting\n"));
    assert!(stdout.contains("\nOptions for command: repeat\n  --times VALUE\n"));
}

#[test]
fn test_validate_command() {
    let dir = TempDir::new().unwrap();
    let model = model_arg(&write_file(&dir, "model.yaml", MODEL));
    let output = optbind(&["validate", "--model", &model]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "Model is consistent.");

    let broken = write_file(
        &dir,
        "broken.json",
        r#"{"options": [{"names": ["-a"], "requires": ["-b"]}]}"#,
    );
    let output = optbind(&["validate", "--model", &model_arg(&broken)]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("The option \"-a\" requires the unknown/missing option \"-b\"."));
}

#[test]
fn test_missing_model_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.yaml");
    let output = optbind(&["usage", "--model", &model_arg(&missing)]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: failed to load model"));
}
