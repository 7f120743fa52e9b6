// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use regex::Regex;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use wavescope_core::{format_iso, parse_filename_token, parse_naive_timestamp, WaveformConfig};
use wavescope_model::TimeWindow;
use wavescope_query::{
    find_candidates, parse_filter_expr, CandidateQuery, IndexPool, IndexPoolConfig, QueryError,
    QueryErrorCode, FNAME_INTERVAL_PATTERN,
};
use wavescope_store::{extract_file, EventSource, EventTree, ExtractRequest, ParquetEventSource};

use crate::{emit_ok, CliError, OutputMode};

pub(crate) struct CandidatesArgs {
    pub(crate) index_db: PathBuf,
    pub(crate) start: String,
    pub(crate) end: String,
    pub(crate) table: Option<String>,
    pub(crate) channel: Option<String>,
}

pub(crate) struct ExtractArgs {
    pub(crate) file: PathBuf,
    pub(crate) file_start: Option<String>,
    pub(crate) start: String,
    pub(crate) end: String,
    pub(crate) filter: String,
    pub(crate) granularity: usize,
    pub(crate) limit: Option<usize>,
    pub(crate) tree: Option<String>,
}

pub(crate) fn parse_filter(expr: &str, output_mode: OutputMode) -> Result<(), CliError> {
    let spec = parse_filter_expr(expr.trim());
    let payload = serde_json::to_value(&spec).map_err(|e| CliError::internal(e.to_string()))?;
    emit_ok(output_mode, &payload)
}

pub(crate) fn candidates(args: CandidatesArgs, output_mode: OutputMode) -> Result<(), CliError> {
    let cfg = WaveformConfig::default();
    let window = parse_window(&args.start, &args.end)?;
    let table = args
        .table
        .map_or_else(|| cfg.default_table.clone(), |t| t.trim().to_string());
    let channel = args
        .channel
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if let Some(channel) = &channel {
        if !channel.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CliError::usage(format!("channel must be digits: {channel}")));
        }
    }
    if !args.index_db.is_file() {
        return Err(CliError::usage(format!(
            "index database not found: {}",
            args.index_db.display()
        )));
    }

    let pool = IndexPool::new(args.index_db.clone(), IndexPoolConfig::default());
    let query = CandidateQuery {
        table,
        window,
        channel,
    };
    let result = pool
        .with_connection(|conn| find_candidates(conn, &cfg, &query))
        .map_err(query_error)?;
    debug!(candidates = result.rows.len(), "candidate query finished");

    let payload = json!({
        "candidate_count": result.rows.len(),
        "sql": result.sql,
        "sql_params": result.sql_params_display(),
        "expanded_sql": result.expanded_sql,
        "rows": result.rows,
    });
    emit_ok(output_mode, &payload)
}

pub(crate) fn extract(args: ExtractArgs, output_mode: OutputMode) -> Result<(), CliError> {
    let mut cfg = WaveformConfig::default();
    if let Some(tree) = args.tree {
        cfg.tree_name = tree;
    }
    let window = parse_window(&args.start, &args.end)?;
    let file_start = match args.file_start.as_deref() {
        Some(raw) => parse_timestamp(raw)?,
        None => file_start_from_name(&args.file)?,
    };
    if !args.file.is_file() {
        return Err(CliError::usage(format!(
            "event file not found: {}",
            args.file.display()
        )));
    }
    let filter = parse_filter_expr(args.filter.trim());
    let req = ExtractRequest {
        file_start,
        window: &window,
        filter: &filter,
        stride: args.granularity.max(1),
        limit: args.limit,
        with_samples: true,
    };
    let out = extract_file(&ParquetEventSource, &args.file, &cfg, &req)
        .map_err(|e| CliError::internal(e.to_string()))?;

    let payload = json!({
        "path": args.file,
        "file_start": format_iso(&file_start),
        "filter_parsed": filter,
        "counters": out.diagnostics,
        "records": out.records,
    });
    emit_ok(output_mode, &payload)
}

pub(crate) fn inspect(
    file: &Path,
    tree: Option<String>,
    output_mode: OutputMode,
) -> Result<(), CliError> {
    let cfg = WaveformConfig::default();
    let tree_name = tree.unwrap_or_else(|| cfg.tree_name.clone());
    if !file.is_file() {
        return Err(CliError::usage(format!(
            "event file not found: {}",
            file.display()
        )));
    }
    let opened = ParquetEventSource
        .open_tree(file, &tree_name)
        .map_err(|e| CliError::internal(e.to_string()))?;
    let Some(opened) = opened else {
        return emit_ok(
            output_mode,
            &json!({ "path": file, "tree": tree_name, "present": false }),
        );
    };

    let opened: &dyn EventTree = opened.as_ref();
    let names = &cfg.branches;
    let expected: BTreeMap<&str, bool> = [
        &names.timestamp,
        &names.samples,
        &names.energy,
        &names.energy_short,
    ]
    .into_iter()
    .map(|name| (name.as_str(), opened.has_branch(name)))
    .collect();
    let payload = json!({
        "path": file,
        "tree": tree_name,
        "present": true,
        "num_entries": opened.num_entries(),
        "branches": expected,
        "columns": opened.branches(),
    });
    emit_ok(output_mode, &payload)
}

fn query_error(err: QueryError) -> CliError {
    match err.code {
        QueryErrorCode::InvalidIdentifier => CliError::usage(err.message),
        _ => CliError::internal(err.to_string()),
    }
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, CliError> {
    parse_naive_timestamp(raw).ok_or_else(|| {
        CliError::usage(format!(
            "Invalid timestamp: {}. Use ISO8601, e.g. 2025-09-08T12:00:00",
            raw.trim()
        ))
    })
}

fn parse_window(start: &str, end: &str) -> Result<TimeWindow, CliError> {
    TimeWindow::new(parse_timestamp(start)?, parse_timestamp(end)?)
        .map_err(|e| CliError::usage(e.0))
}

fn file_start_from_name(path: &Path) -> Result<NaiveDateTime, CliError> {
    let re = Regex::new(FNAME_INTERVAL_PATTERN).map_err(|e| CliError::internal(e.to_string()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    re.captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|token| parse_filename_token(token.as_str()))
        .ok_or_else(|| {
            CliError::usage(format!(
                "cannot decode file start from {name}; pass --file-start"
            ))
        })
}
