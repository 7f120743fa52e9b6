// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use std::path::Path;
use tracing::debug;
use wavescope_core::{offset_by_seconds, WaveformConfig};
use wavescope_model::{FileDiagnostics, FilterSpec, PulseRecord, TimeWindow};

use crate::{EventSource, EventTree, StoreError};

/// What to pull out of one event file.
#[derive(Debug, Clone, Copy)]
pub struct ExtractRequest<'a> {
    /// Absolute time of the file's first entry.
    pub file_start: NaiveDateTime,
    pub window: &'a TimeWindow,
    pub filter: &'a FilterSpec,
    /// Keep every `stride`-th sample; values below 1 count as 1.
    pub stride: usize,
    /// Materialize at most this many matching records.
    pub limit: Option<usize>,
    pub with_samples: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub records: Vec<PulseRecord>,
    pub diagnostics: FileDiagnostics,
}

impl Extraction {
    /// Matching records in the file, materialized or not.
    #[must_use]
    pub fn matched(&self) -> usize {
        self.diagnostics.final_keep
    }
}

/// Open `path` through `source` and extract its matching records.
pub fn extract_file(
    source: &dyn EventSource,
    path: &Path,
    cfg: &WaveformConfig,
    req: &ExtractRequest<'_>,
) -> Result<Extraction, StoreError> {
    let Some(tree) = source.open_tree(path, &cfg.tree_name)? else {
        debug!(path = %path.display(), tree = %cfg.tree_name, "event tree missing");
        return Ok(Extraction::default());
    };
    let out = extract_records(tree.as_ref(), cfg, req)?;
    debug!(
        path = %path.display(),
        scanned = out.diagnostics.scanned,
        time_match = out.diagnostics.time_match,
        final_keep = out.diagnostics.final_keep,
        materialized = out.records.len(),
        "extracted event file"
    );
    Ok(out)
}

/// Apply the open time window and the filter gates to one tree.
///
/// Entry times are `file_start + (ts[i] - ts[0]) / divisor`. Counters are
/// cumulative except `energy_keep`, which pairs the energy gate with the
/// time gate only.
pub fn extract_records(
    tree: &dyn EventTree,
    cfg: &WaveformConfig,
    req: &ExtractRequest<'_>,
) -> Result<Extraction, StoreError> {
    let branches = &cfg.branches;
    let clock = tree.read_clock(&branches.timestamp)?;
    let Some(&first) = clock.first() else {
        return Ok(Extraction::default());
    };

    let times: Vec<Option<NaiveDateTime>> = clock
        .iter()
        .map(|&ts| {
            let delta = (ts - first) as f64 / cfg.timestamp_divisor;
            offset_by_seconds(&req.file_start, delta)
        })
        .collect();
    let in_window: Vec<bool> = times
        .iter()
        .map(|t| t.map_or(false, |t| req.window.contains_open(&t)))
        .collect();

    let mut diagnostics = FileDiagnostics {
        scanned: clock.len(),
        time_match: count(&in_window),
        ..FileDiagnostics::default()
    };
    if diagnostics.time_match == 0 {
        return Ok(Extraction {
            records: Vec::new(),
            diagnostics,
        });
    }

    let energies = if tree.has_branch(&branches.energy) && tree.has_branch(&branches.energy_short)
    {
        let energy = tree.read_f64(&branches.energy)?;
        let energy_short = tree.read_f64(&branches.energy_short)?;
        if energy.len() != clock.len() || energy_short.len() != clock.len() {
            return Err(StoreError(format!(
                "energy branches hold {}/{} entries, clock holds {}",
                energy.len(),
                energy_short.len(),
                clock.len()
            )));
        }
        Some((energy, energy_short))
    } else {
        None
    };

    let mut keep = in_window.clone();
    diagnostics.shape_keep = diagnostics.time_match;
    diagnostics.energy_keep = diagnostics.time_match;
    if let Some((energy, energy_short)) = &energies {
        if req.filter.has_shape_bounds() {
            let pass: Vec<bool> = energy
                .iter()
                .zip(energy_short)
                .map(|(e, es)| req.filter.accepts_shape(1.0 - es / e))
                .collect();
            diagnostics.shape_keep = count_both(&in_window, &pass);
            and_assign(&mut keep, &pass);
        }
        diagnostics.energy_keep = diagnostics.shape_keep;
        if req.filter.has_energy_bounds() {
            let pass: Vec<bool> = energy
                .iter()
                .map(|&e| req.filter.accepts_energy(e))
                .collect();
            diagnostics.energy_keep = count_both(&in_window, &pass);
            and_assign(&mut keep, &pass);
        }
    }

    let matched: Vec<usize> = keep
        .iter()
        .enumerate()
        .filter_map(|(i, &k)| k.then_some(i))
        .collect();
    if matched.is_empty() {
        return Ok(Extraction {
            records: Vec::new(),
            diagnostics,
        });
    }
    diagnostics.final_keep = matched.len();

    let take = req.limit.map_or(matched.len(), |n| n.min(matched.len()));
    let rows = &matched[..take];
    // Read even when `rows` is empty: an unreadable sample branch fails the file.
    let samples = if req.with_samples {
        tree.read_samples(&branches.samples, rows)?
    } else {
        Vec::new()
    };
    let stride = req.stride.max(1);

    let mut records = Vec::with_capacity(rows.len());
    for (pos, &row) in rows.iter().enumerate() {
        let Some(time) = times[row] else {
            continue;
        };
        let (energy, energy_short, psd) = match &energies {
            Some((e, es)) => (
                finite(e[row]),
                finite(es[row]),
                PulseRecord::shape_ratio(e[row], es[row]),
            ),
            None => (None, None, None),
        };
        let samples = samples
            .get(pos)
            .map(|s| s.iter().step_by(stride).copied().collect())
            .unwrap_or_default();
        records.push(PulseRecord {
            time,
            samples,
            energy,
            energy_short,
            psd,
        });
    }

    Ok(Extraction {
        records,
        diagnostics,
    })
}

fn count(mask: &[bool]) -> usize {
    mask.iter().filter(|&&m| m).count()
}

fn count_both(a: &[bool], b: &[bool]) -> usize {
    a.iter().zip(b).filter(|(x, y)| **x && **y).count()
}

fn and_assign(mask: &mut [bool], other: &[bool]) {
    for (m, &o) in mask.iter_mut().zip(other) {
        *m = *m && o;
    }
}

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}
