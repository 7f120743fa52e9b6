// SPDX-License-Identifier: Apache-2.0

use assert_cmd::Command;
use rusqlite::Connection;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wavescope_core::WaveformConfig;
use wavescope_store::{write_event_file, EventTable};

const SECOND: i64 = 1_000_000_000_000;
const EVENT_FILE: &str = "DataR_CH7@DT5730_20250908_120000-20250908_130000.parquet";

fn wavescope() -> Command {
    Command::new(env!("CARGO_BIN_EXE_wavescope"))
}

fn stdout_json(output: &std::process::Output) -> Value {
    let text = String::from_utf8(output.stdout.clone()).expect("utf8 stdout");
    serde_json::from_str(text.trim()).expect("json stdout")
}

fn index_fixture(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("index.sqlite");
    let conn = Connection::open(&path).expect("open index");
    conn.execute_batch(
        "CREATE TABLE root_files (time TEXT, computer TEXT, dir TEXT, file TEXT);
         INSERT INTO root_files VALUES
           ('2025-09-08 13:00:05', 'daq1', 'run1', 'DataR_CH7@DT5730_20250908_120000-20250908_130000.root'),
           ('2025-09-08 13:00:06', 'daq1', 'run1', 'DataR_CH3@DT5730_20250908_120000-20250908_130000.root'),
           ('2025-09-08 15:00:00', 'daq1', 'run1', 'DataR_CH7@DT5730_20250908_140000-20250908_150000.root');",
    )
    .expect("fixture");
    path
}

fn event_fixture(dir: &TempDir, with_energy: bool) -> PathBuf {
    let path = dir.path().join(EVENT_FILE);
    let cfg = WaveformConfig::default();
    let table = EventTable {
        tree: Some(cfg.tree_name.clone()),
        clock: (0..4).map(|i| 5 + i * SECOND).collect(),
        energy: with_energy.then(|| vec![1000.0, 1200.0, 800.0, 1500.0]),
        energy_short: with_energy.then(|| vec![800.0, 600.0, 720.0, 300.0]),
        samples: Some(vec![
            vec![1, 2, 3, 4],
            vec![5, 6, 7, 8],
            vec![9, 10],
            vec![11, 12, 13],
        ]),
    };
    write_event_file(&path, &cfg.branches, &table).expect("write event file");
    path
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}

#[test]
fn parse_filter_prints_filter_spec() {
    let output = wavescope()
        .args(["--json", "parse-filter", "CPS(>0.18, between 601 and 900)"])
        .output()
        .expect("run parse-filter");
    assert!(output.status.success());
    let spec = stdout_json(&output);
    assert_eq!(spec["kind"], "cps");
    assert_eq!(spec["psd_lo"], 0.18);
    assert!(spec["psd_hi"].is_null());
    assert_eq!(spec["e_lo"], 601.0);
    assert_eq!(spec["e_hi"], 900.0);
}

#[test]
fn unknown_flag_returns_usage_exit_code_with_machine_error() {
    let output = wavescope()
        .args(["--json", "--unknown-flag"])
        .output()
        .expect("run bad cli");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("usage_error"));
}

#[test]
fn missing_command_is_a_usage_error() {
    let output = wavescope().output().expect("run bare cli");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn candidates_lists_overlapping_channel_rows_with_expanded_sql() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = index_fixture(&dir);
    let output = wavescope()
        .args([
            "--json",
            "candidates",
            "--index-db",
            path_arg(&db),
            "--start",
            "2025-09-08T12:30:00",
            "--end",
            "2025-09-08T12:45:00",
            "--channel",
            "7",
        ])
        .output()
        .expect("run candidates");
    assert!(output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["candidate_count"], 1);
    assert_eq!(body["sql_params"]["pat"], "%CH7@%");
    assert_eq!(body["sql_params"]["t0"], "2025-09-08T12:30:00");
    assert!(body["expanded_sql"]
        .as_str()
        .is_some_and(|sql| sql.contains("'2025-09-08 12:30:00'")));
    assert_eq!(body["rows"][0]["computer"], "daq1");
    assert_eq!(body["rows"][0]["fname_start"], "2025-09-08T12:00:00");
}

#[test]
fn candidates_rejects_bad_table_and_reversed_window() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = index_fixture(&dir);
    let output = wavescope()
        .args([
            "candidates",
            "--index-db",
            path_arg(&db),
            "--start",
            "2025-09-08T12:00:00",
            "--end",
            "2025-09-08T13:00:00",
            "--table",
            "root_files;drop",
        ])
        .output()
        .expect("run candidates");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("Bad table name: root_files;drop"));

    let output = wavescope()
        .args([
            "candidates",
            "--index-db",
            path_arg(&db),
            "--start",
            "2025-09-08T13:00:00",
            "--end",
            "2025-09-08T12:00:00",
        ])
        .output()
        .expect("run candidates");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("end must be after start"));
}

#[test]
fn extract_reports_counters_and_strided_records() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = event_fixture(&dir, true);
    let output = wavescope()
        .args([
            "--json",
            "extract",
            "--file",
            path_arg(&file),
            "--start",
            "2025-09-08T11:00:00",
            "--end",
            "2025-09-08T13:00:00",
            "--filter",
            "cps(>0.3)",
            "--granularity",
            "2",
        ])
        .output()
        .expect("run extract");
    assert!(output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["file_start"], "2025-09-08T12:00:00");
    let counters = &body["counters"];
    assert_eq!(counters["scanned"], 4);
    assert_eq!(counters["time_match"], 4);
    assert_eq!(counters["psd_keep"], 2);
    assert_eq!(counters["final_keep"], 2);
    let records = body["records"].as_array().expect("records");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["time"], "2025-09-08T12:00:01");
    assert_eq!(records[0]["samples"], serde_json::json!([5, 7]));
    assert_eq!(records[1]["time"], "2025-09-08T12:00:03");
}

#[test]
fn extract_limit_caps_records_but_not_counters() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = event_fixture(&dir, true);
    let output = wavescope()
        .args([
            "--json",
            "extract",
            "--file",
            path_arg(&file),
            "--file-start",
            "2025-09-08 10:00:00",
            "--start",
            "2025-09-08T09:00:00",
            "--end",
            "2025-09-08T11:00:00",
            "--limit",
            "1",
        ])
        .output()
        .expect("run extract");
    assert!(output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["counters"]["final_keep"], 4);
    assert_eq!(body["records"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["records"][0]["time"], "2025-09-08T10:00:00");
}

#[test]
fn extract_missing_file_is_a_usage_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join(EVENT_FILE);
    let output = wavescope()
        .args([
            "extract",
            "--file",
            path_arg(&missing),
            "--start",
            "2025-09-08T11:00:00",
            "--end",
            "2025-09-08T13:00:00",
        ])
        .output()
        .expect("run extract");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn inspect_reports_entries_and_branch_presence() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = event_fixture(&dir, false);
    let output = wavescope()
        .args(["--json", "inspect", "--file", path_arg(&file)])
        .output()
        .expect("run inspect");
    assert!(output.status.success());
    let body = stdout_json(&output);
    assert_eq!(body["present"], true);
    assert_eq!(body["num_entries"], 4);
    assert_eq!(body["branches"]["Timestamp"], true);
    assert_eq!(body["branches"]["Samples"], true);
    assert_eq!(body["branches"]["Energy"], false);
    assert_eq!(body["branches"]["EnergyShort"], false);

    let output = wavescope()
        .args(["--json", "inspect", "--file", path_arg(&file), "--tree", "Other"])
        .output()
        .expect("run inspect");
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["present"], false);
}
