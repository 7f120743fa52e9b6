// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use proptest::prelude::*;
use std::path::Path;
use wavescope_core::{parse_naive_timestamp, WaveformConfig};
use wavescope_model::{FilterSpec, TimeWindow};
use wavescope_store::{
    extract_file, write_event_file, EventSource, EventTable, EventTree, ExtractRequest,
    FakeEventSource, FakeTree, ParquetEventSource,
};

const SECOND: i64 = 1_000_000_000_000;

fn ts(raw: &str) -> NaiveDateTime {
    parse_naive_timestamp(raw).expect("timestamp")
}

fn table(tree: Option<&str>) -> EventTable {
    EventTable {
        tree: tree.map(str::to_string),
        clock: (0..5).map(|i| 42 + i * SECOND).collect(),
        energy: Some(vec![1000.0, 1200.0, 800.0, 0.0, 1500.0]),
        energy_short: Some(vec![800.0, 900.0, 720.0, 10.0, 1400.0]),
        samples: Some(vec![
            vec![1, 2, 3, 4],
            vec![5, 6, 7, 8],
            vec![],
            vec![9],
            vec![10, 11, 12, 13, 14],
        ]),
    }
}

fn request<'a>(window: &'a TimeWindow, filter: &'a FilterSpec) -> ExtractRequest<'a> {
    ExtractRequest {
        file_start: ts("2025-09-08T12:00:00"),
        window,
        filter,
        stride: 2,
        limit: None,
        with_samples: true,
    }
}

#[test]
fn parquet_file_round_trips_through_extractor() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("DataR_CH7@DT5730_20250908_120000-20250908_130000.parquet");
    let cfg = WaveformConfig::default();
    write_event_file(&path, &cfg.branches, &table(Some("Data_R"))).expect("write");

    let window = TimeWindow::new(ts("2025-09-08T11:00:00"), ts("2025-09-08T13:00:00"))
        .expect("window");
    let filter = FilterSpec::default();
    let out = extract_file(&ParquetEventSource, &path, &cfg, &request(&window, &filter))
        .expect("extract");

    assert_eq!(out.diagnostics.scanned, 5);
    assert_eq!(out.diagnostics.final_keep, 5);
    let samples: Vec<Vec<i64>> = out.records.iter().map(|r| r.samples.clone()).collect();
    assert_eq!(
        samples,
        vec![vec![1, 3], vec![5, 7], vec![], vec![9], vec![10, 12, 14]]
    );
    assert_eq!(out.records[4].time, ts("2025-09-08T12:00:04"));
    assert_eq!(out.records[3].psd, None);
    let psd = out.records[0].psd.expect("psd");
    assert!((psd - 0.2).abs() < 1e-12);
}

#[test]
fn shape_and_energy_gates_apply_to_parquet_branches() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.parquet");
    let cfg = WaveformConfig::default();
    write_event_file(&path, &cfg.branches, &table(None)).expect("write");

    let window = TimeWindow::new(ts("2025-09-08T11:00:00"), ts("2025-09-08T13:00:00"))
        .expect("window");
    let filter = FilterSpec {
        shape_lo: Some(0.15),
        shape_hi: Some(0.3),
        e_lo: Some(900.0),
        ..FilterSpec::default()
    };
    let out = extract_file(&ParquetEventSource, &path, &cfg, &request(&window, &filter))
        .expect("extract");
    // psd: 0.2, 0.25, 0.1, -inf, 0.0666
    assert_eq!(out.diagnostics.shape_keep, 2);
    assert_eq!(out.diagnostics.energy_keep, 3);
    assert_eq!(out.diagnostics.final_keep, 2);
    let energies: Vec<Option<f64>> = out.records.iter().map(|r| r.energy).collect();
    assert_eq!(energies, vec![Some(1000.0), Some(1200.0)]);
}

#[test]
fn foreign_tree_name_reads_as_missing_tree() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.parquet");
    let cfg = WaveformConfig::default();
    write_event_file(&path, &cfg.branches, &table(Some("Calib"))).expect("write");
    assert!(ParquetEventSource
        .open_tree(&path, &cfg.tree_name)
        .expect("open")
        .is_none());

    let window = TimeWindow::new(ts("2025-09-08T11:00:00"), ts("2025-09-08T13:00:00"))
        .expect("window");
    let filter = FilterSpec::default();
    let out = extract_file(&ParquetEventSource, &path, &cfg, &request(&window, &filter))
        .expect("extract");
    assert_eq!(out.diagnostics.scanned, 0);
    assert!(out.records.is_empty());
}

#[test]
fn tree_reports_branches_and_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.parquet");
    let cfg = WaveformConfig::default();
    let mut t = table(None);
    t.energy_short = None;
    write_event_file(&path, &cfg.branches, &t).expect("write");
    let tree = ParquetEventSource
        .open_tree(&path, &cfg.tree_name)
        .expect("open")
        .expect("tree");
    assert_eq!(tree.num_entries(), 5);
    assert_eq!(tree.branches(), vec!["Timestamp", "Energy", "Samples"]);
    assert!(!tree.has_branch("EnergyShort"));
    assert_eq!(
        tree.read_clock("Timestamp").expect("clock")[1],
        i128::from(42 + SECOND)
    );
}

#[test]
fn signed_clock_starting_below_zero_is_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("events.parquet");
    let cfg = WaveformConfig::default();
    let t = EventTable {
        tree: Some(cfg.tree_name.clone()),
        clock: vec![-2 * SECOND, -SECOND, 0],
        energy: Some(vec![1000.0; 3]),
        energy_short: Some(vec![500.0; 3]),
        samples: Some(vec![vec![1], vec![2], vec![3]]),
    };
    write_event_file(&path, &cfg.branches, &t).expect("write");

    let tree = ParquetEventSource
        .open_tree(&path, &cfg.tree_name)
        .expect("open")
        .expect("tree");
    assert_eq!(
        tree.read_clock("Timestamp").expect("clock"),
        vec![-2_000_000_000_000, -1_000_000_000_000, 0]
    );

    let window = TimeWindow::new(ts("2025-09-08T11:00:00"), ts("2025-09-08T13:00:00"))
        .expect("window");
    let filter = FilterSpec::default();
    let out = extract_file(&ParquetEventSource, &path, &cfg, &request(&window, &filter))
        .expect("extract");
    assert_eq!(out.diagnostics.final_keep, 3);
    let times: Vec<NaiveDateTime> = out.records.iter().map(|r| r.time).collect();
    assert_eq!(
        times,
        vec![
            ts("2025-09-08T12:00:00"),
            ts("2025-09-08T12:00:01"),
            ts("2025-09-08T12:00:02"),
        ]
    );
}

#[test]
fn unreadable_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("garbage.parquet");
    std::fs::write(&path, b"not parquet").expect("write");
    let cfg = WaveformConfig::default();
    assert!(ParquetEventSource.open_tree(&path, &cfg.tree_name).is_err());
    assert!(ParquetEventSource
        .open_tree(Path::new("/nonexistent/x.parquet"), &cfg.tree_name)
        .is_err());
}

#[test]
fn mismatched_branch_lengths_are_refused_on_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = WaveformConfig::default();
    let mut t = table(None);
    t.energy = Some(vec![1.0]);
    assert!(write_event_file(&dir.path().join("bad.parquet"), &cfg.branches, &t).is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn extracted_times_stay_inside_open_window(
        offsets in prop::collection::vec(0i64..120, 1..40),
        lo in 0i64..60,
        width in 1i64..60,
    ) {
        let cfg = WaveformConfig::default();
        let mut clock: Vec<i64> = offsets.iter().map(|s| s * SECOND / 2).collect();
        clock.sort_unstable();
        let n = clock.len();
        let source = FakeEventSource::new().with_file(
            "/data/f.root",
            FakeTree::pulses(
                &cfg.branches,
                &cfg.tree_name,
                clock,
                vec![100.0; n],
                vec![50.0; n],
                vec![vec![0]; n],
            ),
        );
        let start = ts("2025-09-08T12:00:00") + chrono::TimeDelta::seconds(lo);
        let window = TimeWindow::new(start, start + chrono::TimeDelta::seconds(width))
            .expect("window");
        let filter = FilterSpec::default();
        let path = Path::new("/data/f.root");
        let out = extract_file(&source, path, &cfg, &request(&window, &filter)).expect("extract");
        prop_assert_eq!(out.records.len(), out.diagnostics.final_keep);
        for rec in &out.records {
            prop_assert!(rec.time > window.start() && rec.time < window.end());
        }
    }
}
