use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

#[test]
fn sweep_command_exports_a_result_record() {
    let temp = TempDir::new().expect("tempdir should be created");
    let config_path = temp.path().join("sweep.json");
    write_file(
        &config_path,
        r#"{ "frequency": 1000.0, "fieldStart": 1e-6, "fieldEnd": 3e-6, "numPoints": 4 }"#,
    );
    let output_dir = temp.path().join("results");
    let artifact_dir = temp.path().join("artifacts");

    let output = run_cli(
        temp.path(),
        &[
            "sweep",
            "--config",
            path_arg(&config_path),
            "--artifact-dir",
            path_arg(&artifact_dir),
            "--output",
            path_arg(&output_dir),
            "--workers",
            "2",
        ],
    );
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("4 points at 1000 Hz"), "stdout: {stdout}");
    assert!(stdout.contains("JSON result:"), "stdout: {stdout}");

    let results = json_files(&output_dir);
    assert_eq!(results.len(), 1);
    let record: Value = serde_json::from_str(
        &fs::read_to_string(&results[0]).expect("result should be readable"),
    )
    .expect("result JSON should parse");
    assert_eq!(record["name"], Value::from("default_1meter_diameter_aircoil"));
    assert_eq!(record["appliedField"].as_array().map(Vec::len), Some(4));
    assert_eq!(record["artifacts"]["core"].as_array().map(Vec::len), Some(4));
    let sensitivity = record["sensitivityStats"]["mean"]
        .as_f64()
        .expect("sensitivity mean should be a number");
    assert!((sensitivity - 4.9348).abs() / 4.9348 < 0.01, "{sensitivity}");
}

#[test]
fn cleanup_flag_leaves_no_solver_artifacts() {
    let temp = TempDir::new().expect("tempdir should be created");
    let artifact_dir = temp.path().join("artifacts");

    let output = run_cli(
        temp.path(),
        &[
            "sweep",
            "--points",
            "1",
            "--cleanup",
            "--artifact-dir",
            path_arg(&artifact_dir),
            "--output",
            path_arg(temp.path()),
        ],
    );
    assert_success(&output);
    let leftovers = fs::read_dir(&artifact_dir)
        .expect("artifact dir should exist")
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn mismatched_core_geometry_exits_with_a_validation_diagnostic() {
    let temp = TempDir::new().expect("tempdir should be created");
    let geometry_path = temp.path().join("coil.json");
    write_file(
        &geometry_path,
        r#"{ "name": "bad", "ls": 9.0, "ids": 0.125, "ods": 0.625, "odc": 0.25, "lc": 9.0 }"#,
    );
    let artifact_dir = temp.path().join("artifacts");

    let output = run_cli(
        temp.path(),
        &[
            "sweep",
            "--geometry",
            path_arg(&geometry_path),
            "--artifact-dir",
            path_arg(&artifact_dir),
        ],
    );
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("ERROR: [INPUT.GEOMETRY_CORE_DIAMETER]"),
        "stderr: {stderr}"
    );
    assert!(stderr.contains("FATAL EXIT CODE: 2"), "stderr: {stderr}");
    assert!(!artifact_dir.exists());
}

#[test]
fn turns_command_reports_the_layout_estimate() {
    let temp = TempDir::new().expect("tempdir should be created");
    let geometry_path = temp.path().join("coil.json");
    write_file(
        &geometry_path,
        r#"{
          "name": "microcoil",
          "ls": 9.0, "ids": 0.125, "ods": 0.625,
          "lc": 9.0, "idc": 0.0, "odc": 0.125,
          "odw": 0.0625, "odwc": 0.05, "pf": 0.75,
          "ma": "Hiperco-50", "turns": null
        }"#,
    );

    let output = run_cli(temp.path(), &["turns", "--geometry", path_arg(&geometry_path)]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("turns: 324"), "stdout: {stdout}");
    assert!(stdout.contains("108 turns per layer x 3 layers"), "stdout: {stdout}");
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(temp.path(), &["simulate"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR: [INPUT.CLI_USAGE]"));
}

#[test]
fn cleanup_command_removes_only_generated_artifacts() {
    let temp = TempDir::new().expect("tempdir should be created");
    let artifact_dir = temp.path().join("temp");
    write_file(&artifact_dir.join("coil_Air_sensor_1e-6_T_x.fem"), "fem");
    write_file(&artifact_dir.join("coil_Air_sensor_1e-6_T_x.ans"), "ans");
    write_file(&artifact_dir.join("notes.txt"), "keep");

    let output = run_cli(temp.path(), &["cleanup", path_arg(&artifact_dir)]);
    assert_success(&output);
    assert!(String::from_utf8_lossy(&output.stdout).contains("Removed 2 artifact(s)"));
    assert!(artifact_dir.join("notes.txt").exists());
}

fn run_cli(working_dir: &Path, args: &[&str]) -> Output {
    let binary_path = env!("CARGO_BIN_EXE_winding-rs");
    Command::new(binary_path)
        .current_dir(working_dir)
        .env("RUST_LOG", "warn")
        .args(args)
        .output()
        .expect("winding-rs should run")
}

fn assert_success(output: &Output) {
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

fn json_files(directory: &Path) -> Vec<PathBuf> {
    fs::read_dir(directory)
        .expect("directory should be readable")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|extension| extension == "json"))
        .collect()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths should be UTF-8")
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir should be created");
    }
    fs::write(path, content).expect("file should be written");
}
