//! Integration tests for the proofcore CLI.
//!
//! `bench` and the offline judge run anywhere. Subcommands that need the
//! symbolic pool skip themselves when `symbolic-worker` has not been built
//! next to the CLI (build the whole workspace to enable them).

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const CLI: &str = env!("CARGO_BIN_EXE_proofcore");

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(CLI)
        .args(args)
        .current_dir(dir)
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("OPENAI_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to launch proofcore")
}

fn worker_built() -> bool {
    let name = format!("symbolic-worker{}", std::env::consts::EXE_SUFFIX);
    Path::new(CLI)
        .parent()
        .map(|dir| dir.join(name).is_file())
        .unwrap_or(false)
}

#[test]
fn test_bench_writes_reports() {
    let tmp = TempDir::new().unwrap();
    let dataset = repo_root().join("data/sample_dataset.json");
    let out = tmp.path().join("reports");

    let output = run(
        tmp.path(),
        &[
            "bench",
            "--dataset",
            dataset.to_str().unwrap(),
            "--output-dir",
            out.to_str().unwrap(),
            "--name",
            "sample",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Passed: 3/6"), "{stdout}");
    assert!(stdout.contains("algebra: 2/3"), "{stdout}");

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.join("sample.json")).unwrap()).unwrap();
    assert_eq!(report["meta"]["n"], 6);
    assert_eq!(report["meta"]["accuracy"], 0.5);

    let csv = std::fs::read_to_string(out.join("sample.csv")).unwrap();
    assert!(csv.starts_with("id,domain,difficulty,expected_validity,"));
    assert_eq!(csv.lines().count(), 7);
}

#[test]
fn test_bench_missing_dataset_fails() {
    let tmp = TempDir::new().unwrap();
    let output = run(tmp.path(), &["bench", "--dataset", "absent.json"]);
    assert!(!output.status.success());
}

#[test]
fn test_invalid_config_rejected_at_startup() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("bad.toml");
    std::fs::write(&config, "[verification]\nstep_pass_threshold = 1.5\n").unwrap();
    let dataset = repo_root().join("data/sample_dataset.json");

    let output = run(
        tmp.path(),
        &[
            "--config",
            config.to_str().unwrap(),
            "bench",
            "--dataset",
            dataset.to_str().unwrap(),
        ],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("step_pass_threshold"));
}

#[test]
fn test_offline_judge() {
    let tmp = TempDir::new().unwrap();
    let output = run(
        tmp.path(),
        &["judge", "--claim", "The area equals one", "--offline"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["responses"][0]["score"], 75);
    assert_eq!(json["agreement"]["coherence"], 100.0);
    assert_eq!(json["total_cost"], 0.0);
}

#[test]
fn test_judge_without_credentials_fails() {
    let tmp = TempDir::new().unwrap();
    let output = run(tmp.path(), &["judge", "--claim", "x = x"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no provider available"));
}

#[test]
fn test_check_and_simplify() {
    if !worker_built() {
        eprintln!("symbolic-worker not built next to proofcore, skipping");
        return;
    }
    let tmp = TempDir::new().unwrap();

    let output = run(tmp.path(), &["check", "--lhs", "(a+b)*(a-b)", "--rhs", "a**2 - b**2"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "true");

    let output = run(tmp.path(), &["check", "--lhs", "x+1", "--rhs", "x+2"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "false");

    let output = run(tmp.path(), &["check", "--lhs", "((", "--rhs", "x"]);
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "false");

    let output = run(tmp.path(), &["simplify", "--expr", "(("]);
    assert!(!output.status.success());
}

#[test]
fn test_verify_example_proof() {
    if !worker_built() {
        eprintln!("symbolic-worker not built next to proofcore, skipping");
        return;
    }
    let tmp = TempDir::new().unwrap();
    let proof = repo_root().join("data/proofs/difference_of_squares.json");
    let output = run(
        tmp.path(),
        &["verify", "--proof", proof.to_str().unwrap(), "--num-workers", "2"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["valid"], true);
    assert_eq!(json["total_count"], 3);
    assert_eq!(json["steps"][0]["step_id"], "1");
    assert_eq!(json["metrics"]["steps_verified"], 3);
    assert_eq!(json["graph"]["depth"], 3);
    assert!(json.get("costs").is_none());
}

#[test]
fn test_verify_reports_circular_reasoning() {
    if !worker_built() {
        eprintln!("symbolic-worker not built next to proofcore, skipping");
        return;
    }
    let tmp = TempDir::new().unwrap();
    let proof = repo_root().join("data/proofs/circular_argument.json");
    let output = run(
        tmp.path(),
        &["verify", "--proof", proof.to_str().unwrap(), "--num-workers", "1"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["valid"], false);
    assert_eq!(json["valid_count"], 3);
    assert_eq!(json["graph"]["cycles"].as_array().map(Vec::len), Some(1));
}

#[test]
fn test_judge_all_requires_judge() {
    let tmp = TempDir::new().unwrap();
    let proof = repo_root().join("data/proofs/circular_argument.json");
    let output = run(
        tmp.path(),
        &["verify", "--proof", proof.to_str().unwrap(), "--judge-all"],
    );
    assert!(!output.status.success());
}
