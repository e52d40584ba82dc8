//! Integration tests for rpqstat.
//!
//! These run the built binary against the result files in
//! `tests/fixtures`. Outputs go to a temporary directory, which is also the
//! working directory so no stray `rpqstat.toml` is picked up.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn rpqstat(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_rpqstat"))
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("failed to execute rpqstat")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "rpqstat failed (exit={:?}):\nstdout:\n{}\nstderr:\n{}",
        output.status.code(),
        stdout(output),
        String::from_utf8_lossy(&output.stderr),
    );
}

fn path_arg(p: &Path) -> &str {
    p.to_str().expect("fixture path is not UTF-8")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn compare_writes_reports() {
    let tmp = tempfile::tempdir().unwrap();
    let cpu = fixture("cpu_all.txt");
    let gpu = fixture("gpu_result.txt");
    let reports = tmp.path().join("reports");
    let json = tmp.path().join("report.json");

    let output = rpqstat(
        tmp.path(),
        &[
            "compare",
            "--cpu",
            path_arg(&cpu),
            "--gpu",
            path_arg(&gpu),
            "--reports",
            path_arg(&reports),
            "--json",
            path_arg(&json),
        ],
    );
    assert_success(&output);

    let text = stdout(&output);
    assert!(text.contains("Eligible queries: 3"), "{text}");
    assert!(text.contains("Excluded queries: 1"), "{text}");
    assert!(text.contains("Answer mismatches: 1"), "{text}");

    for name in [
        "result_cpu.txt",
        "result_gpu.txt",
        "errors.txt",
        "rel_errors.txt",
        "bench_diff.txt",
        "bench_diff_big.txt",
        "speedups.txt",
    ] {
        assert!(reports.join(name).is_file(), "{name} was not written");
    }

    // Ascending speedup: 0.5, 2, 4.
    let speedups = std::fs::read_to_string(reports.join("speedups.txt")).unwrap();
    let order: Vec<&str> = speedups
        .lines()
        .filter_map(|l| l.split_whitespace().next())
        .collect();
    assert_eq!(order, vec!["3", "1", "4"]);

    // Query 2 has no GPU time and is left out of the diff.
    let diff = std::fs::read_to_string(reports.join("bench_diff.txt")).unwrap();
    assert!(!diff.lines().any(|l| l.starts_with("2 ")));

    let doc: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(doc["totals"]["eligible"], 3);
    assert_eq!(doc["totals"]["wins"], 2);
    assert_eq!(doc["excluded"][0]["query_id"], 2);
    assert_eq!(doc["excluded"][0]["reason"], "zero_gpu");
    assert_eq!(doc["anomalies"][0]["kind"], "answer_mismatch");
}

#[test]
fn quiet_still_reports_answer_mismatches() {
    let tmp = tempfile::tempdir().unwrap();
    let cpu = fixture("cpu_all.txt");
    let gpu = fixture("gpu_result.txt");

    let output = rpqstat(
        tmp.path(),
        &["-q", "compare", "--cpu", path_arg(&cpu), "--gpu", path_arg(&gpu)],
    );
    assert_success(&output);
    let text = stdout(&output);
    assert!(
        text.contains("query 3: answer mismatch (CPU 5, GPU 7)"),
        "{text}"
    );
    assert!(!text.contains("Speedup >="), "{text}");
}

#[test]
fn answer_mismatch_is_reported_once() {
    let tmp = tempfile::tempdir().unwrap();
    let cpu = fixture("cpu_all.txt");
    let gpu = fixture("gpu_result.txt");

    let output = rpqstat(
        tmp.path(),
        &["compare", "--cpu", path_arg(&cpu), "--gpu", path_arg(&gpu)],
    );
    assert_success(&output);
    let needle = "query 3: answer mismatch";
    assert_eq!(stdout(&output).matches(needle).count(), 1);
    assert!(!String::from_utf8_lossy(&output.stderr).contains(needle));
}

#[test]
fn collect_aggregates_runs() {
    let tmp = tempfile::tempdir().unwrap();
    let result = tmp.path().join("result.txt");
    let runs: Vec<PathBuf> = (1..=3)
        .map(|i| fixture(&format!("gpu_run{i}.txt")))
        .collect();

    let mut args = vec!["collect", "-o", path_arg(&result)];
    args.extend(runs.iter().map(|p| path_arg(p)));
    let output = rpqstat(tmp.path(), &args);
    assert_success(&output);

    let text = std::fs::read_to_string(&result).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "1 11.000000 1.000000 4");
    // The zero run is discarded; runs disagree on the answer count.
    assert!(lines[1].starts_with("2 0.600000 0.141421 1"), "{}", lines[1]);
}

#[test]
fn dataset_file_drives_types() {
    let tmp = tempfile::tempdir().unwrap();
    let config = fixture("rpqstat.toml");

    let output = rpqstat(tmp.path(), &["--config", path_arg(&config), "types"]);
    assert_success(&output);
    let text = stdout(&output);
    assert!(text.contains("1-2"), "{text}");
    assert!(text.contains("3-4"), "{text}");
    assert!(text.contains("Sum over types"), "{text}");
}

#[test]
fn oversized_type_layout_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let cpu = fixture("cpu_all.txt");
    let gpu = fixture("gpu_result.txt");

    let output = rpqstat(
        tmp.path(),
        &[
            "types",
            "--cpu",
            path_arg(&cpu),
            "--gpu",
            path_arg(&gpu),
            "--types",
            "70000",
            "--per-type",
            "70000",
        ],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("do not fit the query id range"));
}

#[test]
fn load_lists_suspicious_queries() {
    let tmp = tempfile::tempdir().unwrap();
    let runs: Vec<PathBuf> = (1..=3)
        .map(|i| fixture(&format!("gpu_run{i}.txt")))
        .collect();

    let mut args = vec!["load"];
    args.extend(runs.iter().map(|p| path_arg(p)));
    let output = rpqstat(tmp.path(), &args);
    assert_success(&output);
    let text = stdout(&output);
    assert!(text.contains("Queries:            2"), "{text}");
    assert!(text.contains("Load / execute >= 1: 1"), "{text}");
}

#[test]
fn load_reads_timings_from_query_logs() {
    let tmp = tempfile::tempdir().unwrap();
    let logs = fixture("timing_logs");

    let output = rpqstat(
        tmp.path(),
        &["load", "--logs", path_arg(&logs), "--universe", "4"],
    );
    assert_success(&output);
    let text = stdout(&output);
    assert!(text.contains("Queries:            2"), "{text}");
    assert!(text.contains("Load / execute >= 1: 1"), "{text}");
}

#[test]
fn profile_skips_queries_without_logs() {
    let tmp = tempfile::tempdir().unwrap();
    let config = fixture("rpqstat.toml");

    let output = rpqstat(tmp.path(), &["--config", path_arg(&config), "profile"]);
    assert_success(&output);
    let text = stdout(&output);
    assert!(text.contains("1 of 4 queries profiled"), "{text}");
    assert!(text.contains("Matrix dimensions: 100"), "{text}");
}

#[test]
fn validate_fails_on_answer_mismatch() {
    let tmp = tempfile::tempdir().unwrap();
    let cpu = fixture("cpu_all.txt");
    let gpu = fixture("gpu_result.txt");

    let output = rpqstat(
        tmp.path(),
        &[
            "validate",
            path_arg(&gpu),
            "--expected",
            path_arg(&cpu),
            "--expected-format",
            "comma_delimited",
        ],
    );
    assert!(!output.status.success());
    assert!(stdout(&output).contains("query 3: expected 5 answers, got 7"));
}

#[test]
fn missing_cpu_input_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    let gpu = fixture("gpu_result.txt");

    let output = rpqstat(tmp.path(), &["compare", "--gpu", path_arg(&gpu)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no CPU result files"));
}
