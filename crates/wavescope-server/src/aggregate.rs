// SPDX-License-Identifier: Apache-2.0

//! Candidate files to response records.
//!
//! Files are visited sequentially in index order. The candidate-count guard
//! runs before any file is touched. A file that cannot be read is skipped;
//! a candidate path that escapes the data root fails the whole request.

use tracing::{debug, warn};
use wavescope_api::{ApiError, WaveformParams};
use wavescope_core::{resolve_under_base, WaveformConfig};
use wavescope_model::{
    CandidateFile, FileDebug, FileListing, FileUsage, IndexRecord, PulseRecord,
};
use wavescope_query::{find_candidates, CandidateQuery, CandidateResult, IndexPool};
use wavescope_store::{extract_file, EventSource, ExtractRequest};

/// Plot-mode result: at most `max_n` records, sorted by time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CappedOutcome {
    pub records: Vec<PulseRecord>,
    pub total_matching: usize,
    pub files: Vec<FileUsage>,
    pub per_file: Vec<FileDebug>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UncappedOutcome {
    pub records: Vec<PulseRecord>,
    pub total_matching: usize,
    pub files: Vec<FileUsage>,
    pub per_file: Vec<FileDebug>,
}

/// Run the index lookup for the request window.
pub fn lookup_candidates(
    pool: &IndexPool,
    cfg: &WaveformConfig,
    params: &WaveformParams,
) -> Result<CandidateResult, ApiError> {
    let query = CandidateQuery {
        table: params.table.clone(),
        window: params.window,
        channel: params.channel_opt().map(str::to_string),
    };
    let candidates = pool.with_connection(|conn| find_candidates(conn, cfg, &query))?;
    if params.debug {
        debug!(
            expanded_sql = %candidates.expanded_sql,
            candidates = candidates.rows.len(),
            "candidate query"
        );
    }
    Ok(candidates)
}

/// Reject the request before any file I/O when too many files match.
pub fn ensure_file_budget(
    cfg: &WaveformConfig,
    candidates: &CandidateResult,
) -> Result<(), ApiError> {
    let found = candidates.rows.len();
    if found > cfg.max_candidate_files {
        return Err(ApiError::too_many_files(found, cfg.max_candidate_files));
    }
    Ok(())
}

pub fn aggregate_capped(
    source: &dyn EventSource,
    cfg: &WaveformConfig,
    params: &WaveformParams,
    candidates: &CandidateResult,
) -> Result<CappedOutcome, ApiError> {
    ensure_file_budget(cfg, candidates)?;
    let mut out = CappedOutcome::default();

    for row in &candidates.rows {
        let Some(file) = resolve_candidate(source, cfg, params, row)? else {
            continue;
        };
        let remaining = params.max_n.saturating_sub(out.records.len());
        let req = ExtractRequest {
            file_start: file.file_start,
            window: &params.window,
            filter: &params.filter,
            stride: params.granularity,
            limit: Some(remaining),
            with_samples: true,
        };
        let extraction = match extract_file(source, &file.path, cfg, &req) {
            Ok(extraction) => extraction,
            Err(e) => {
                debug!(path = %file.path.display(), error = %e, "skipping unreadable event file");
                continue;
            }
        };
        let matched = extraction.matched();
        out.total_matching += matched;
        if matched > 0 {
            out.files.push(file.usage(extraction.records.len()));
        }
        out.per_file.push(file.debug(extraction.diagnostics));
        out.records.extend(extraction.records);
    }

    out.records.sort_by_key(|r| r.time);
    out.records.truncate(params.max_n);
    Ok(out)
}

/// Every matching record with full sample arrays, subject to the payload
/// ceiling unless `force` is set.
pub fn aggregate_uncapped(
    source: &dyn EventSource,
    cfg: &WaveformConfig,
    params: &WaveformParams,
    candidates: &CandidateResult,
) -> Result<UncappedOutcome, ApiError> {
    ensure_file_budget(cfg, candidates)?;
    let mut out = UncappedOutcome::default();

    for row in &candidates.rows {
        let Some(file) = resolve_candidate(source, cfg, params, row)? else {
            continue;
        };
        let req = ExtractRequest {
            file_start: file.file_start,
            window: &params.window,
            filter: &params.filter,
            stride: params.granularity,
            limit: None,
            with_samples: true,
        };
        let extraction = match extract_file(source, &file.path, cfg, &req) {
            Ok(extraction) => extraction,
            Err(e) => {
                debug!(path = %file.path.display(), error = %e, "skipping unreadable event file");
                continue;
            }
        };
        out.total_matching += extraction.matched();
        out.files.push(file.usage(extraction.matched()));
        out.per_file.push(file.debug(extraction.diagnostics));
        out.records.extend(extraction.records);
    }

    out.records.sort_by_key(|r| r.time);
    let returned = out.records.len();
    if !params.force && returned > cfg.uncapped_max_pulses {
        warn!(
            returned,
            max = cfg.uncapped_max_pulses,
            "uncapped payload over ceiling"
        );
        return Err(ApiError::too_many_pulses(
            returned,
            out.total_matching,
            cfg.uncapped_max_pulses,
        ));
    }
    Ok(out)
}

/// Existing, overlapping candidate files. No file contents are read.
pub fn list_files(
    source: &dyn EventSource,
    cfg: &WaveformConfig,
    params: &WaveformParams,
    candidates: &CandidateResult,
) -> Result<Vec<FileListing>, ApiError> {
    let found = candidates.rows.len();
    if found > cfg.max_candidate_files {
        return Err(ApiError::too_many_files_with_debug(
            found,
            cfg.max_candidate_files,
            &candidates.debug(None),
        ));
    }
    let mut files = Vec::new();
    for row in &candidates.rows {
        if let Some(file) = resolve_candidate(source, cfg, params, row)? {
            files.push(file.listing());
        }
    }
    Ok(files)
}

fn resolve_candidate(
    source: &dyn EventSource,
    cfg: &WaveformConfig,
    params: &WaveformParams,
    row: &IndexRecord,
) -> Result<Option<CandidateFile>, ApiError> {
    let path = match resolve_under_base(&cfg.base_dir, &row.path_segments()) {
        Ok(path) => path,
        Err(e) => {
            warn!(
                security = true,
                computer = %row.computer,
                dir = %row.dir,
                file = %row.file,
                reason = %e,
                "rejected index path"
            );
            return Err(e.into());
        }
    };
    if !source.exists(&path) {
        debug!(path = %path.display(), "skipping missing event file");
        return Ok(None);
    }
    if !params.window.overlaps_file(&row.fname_start, &row.fname_end) {
        debug!(path = %path.display(), "skipping file outside window");
        return Ok(None);
    }
    Ok(Some(CandidateFile {
        path,
        file_start: row.fname_start,
        file_end: row.fname_end,
    }))
}
