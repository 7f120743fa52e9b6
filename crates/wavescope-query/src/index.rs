// SPDX-License-Identifier: Apache-2.0

//! Candidate lookup over the externally populated file index.
//!
//! Each index row names one event file whose filename embeds its interval as
//! `YYYYMMDD_HHMMSS-YYYYMMDD_HHMMSS`. Rows are kept when that interval
//! overlaps the half-open window `[t0, t1)`. All comparisons use naive text
//! timestamps of identical shape, so ordering is lexical and timezone-free.

use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{ToSql, Value, ValueRef};
use rusqlite::Connection;
use std::collections::BTreeMap;
use tracing::debug;
use wavescope_core::config::IndexColumns;
use wavescope_core::{
    format_sql_timestamp, is_sql_identifier, parse_filename_token, parse_naive_timestamp,
    WaveformConfig,
};
use wavescope_model::{FileDebug, IndexRecord, QueryDebug, TimeWindow};

use crate::sql_text::{expand_sql, SqlParam};
use crate::{QueryError, QueryErrorCode};

pub const FNAME_INTERVAL_PATTERN: &str = r"([0-9]{8}_[0-9]{6})-([0-9]{8}_[0-9]{6})";
pub const FN_FNAME_START: &str = "fname_token_start";
pub const FN_FNAME_END: &str = "fname_token_end";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateQuery {
    pub table: String,
    pub window: TimeWindow,
    /// Digits only; `None` disables the channel restriction.
    pub channel: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateResult {
    pub rows: Vec<IndexRecord>,
    pub sql: String,
    pub params: BTreeMap<String, SqlParam>,
    pub expanded_sql: String,
}

impl CandidateResult {
    #[must_use]
    pub fn sql_params_display(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.display()))
            .collect()
    }

    #[must_use]
    pub fn debug(&self, per_file: Option<Vec<FileDebug>>) -> QueryDebug {
        QueryDebug {
            sql: self.sql.clone(),
            sql_params: self.sql_params_display(),
            expanded_sql: self.expanded_sql.clone(),
            candidate_count: self.rows.len(),
            per_file,
        }
    }
}

/// Register the filename-token decoders used by the candidate query.
pub fn register_index_functions(conn: &Connection) -> Result<(), QueryError> {
    let pattern = Regex::new(FNAME_INTERVAL_PATTERN)
        .map_err(|e| QueryError::new(QueryErrorCode::Sql, e.to_string()))?;
    for (name, group) in [(FN_FNAME_START, 1_usize), (FN_FNAME_END, 2_usize)] {
        let re = pattern.clone();
        conn.create_scalar_function(
            name,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            move |ctx| {
                let decoded = match ctx.get_raw(0) {
                    ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                        .ok()
                        .and_then(|file| decode_filename_token(&re, file, group)),
                    _ => None,
                };
                Ok(decoded)
            },
        )?;
    }
    Ok(())
}

fn decode_filename_token(re: &Regex, file: &str, group: usize) -> Option<String> {
    let caps = re.captures(file)?;
    let token = caps.get(group)?.as_str();
    parse_filename_token(token).map(|ts| format_sql_timestamp(&ts))
}

/// Validate an interpolated table name.
pub fn validate_table_name(table: &str) -> Result<(), QueryError> {
    if is_sql_identifier(table) {
        Ok(())
    } else {
        Err(QueryError::new(
            QueryErrorCode::InvalidIdentifier,
            format!("Bad table name: {table}"),
        ))
    }
}

/// Query text for the candidate lookup. Only validated identifiers are
/// interpolated; window bounds and the channel pattern stay bound.
pub fn build_candidate_sql(
    columns: &IndexColumns,
    table: &str,
    with_channel: bool,
    limit: usize,
) -> Result<String, QueryError> {
    validate_table_name(table)?;
    for column in [&columns.time, &columns.computer, &columns.dir, &columns.file] {
        if !is_sql_identifier(column) {
            return Err(QueryError::new(
                QueryErrorCode::InvalidIdentifier,
                format!("Bad column name: {column}"),
            ));
        }
    }
    let file_like = if with_channel {
        format!("{} LIKE :pat", columns.file)
    } else {
        "1".to_string()
    };
    Ok(format!(
        "WITH r AS (
  SELECT {time} AS time,
         {computer} AS computer,
         {dir} AS dir,
         {file} AS file,
         {fn_start}({file}) AS fname_start,
         {fn_end}({file}) AS fname_end
  FROM {table}
  WHERE {file_like}
)
SELECT time, computer, dir, file, fname_start, fname_end
FROM r
WHERE fname_start IS NOT NULL
  AND fname_end IS NOT NULL
  AND fname_start < :t1
  AND fname_end >= :t0
ORDER BY time ASC
LIMIT {limit}",
        time = columns.time,
        computer = columns.computer,
        dir = columns.dir,
        file = columns.file,
        fn_start = FN_FNAME_START,
        fn_end = FN_FNAME_END,
    ))
}

#[must_use]
pub fn channel_pattern(channel: &str) -> String {
    format!("%CH{channel}@%")
}

/// Run the candidate lookup on a connection that has the index functions
/// registered.
pub fn find_candidates(
    conn: &Connection,
    cfg: &WaveformConfig,
    req: &CandidateQuery,
) -> Result<CandidateResult, QueryError> {
    let channel = req.channel.as_deref().filter(|c| !c.is_empty());
    let sql = build_candidate_sql(
        &cfg.columns,
        &req.table,
        channel.is_some(),
        cfg.candidate_row_limit,
    )?;

    let mut params = BTreeMap::new();
    params.insert("t0".to_string(), SqlParam::Timestamp(req.window.start()));
    params.insert("t1".to_string(), SqlParam::Timestamp(req.window.end()));
    if let Some(channel) = channel {
        params.insert("pat".to_string(), SqlParam::Text(channel_pattern(channel)));
    }
    let expanded_sql = expand_sql(&sql, &params);

    let bound: Vec<(String, String)> = params
        .iter()
        .map(|(name, value)| (format!(":{name}"), value.bound_text()))
        .collect();
    let named: Vec<(&str, &dyn ToSql)> = bound
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
        .collect();

    let mut stmt = conn.prepare_cached(&sql)?;
    let mapped = stmt.query_map(named.as_slice(), |row| {
        Ok(RawRow {
            time: value_text(row.get::<_, Value>(0)?),
            computer: value_text(row.get::<_, Value>(1)?),
            dir: value_text(row.get::<_, Value>(2)?),
            file: value_text(row.get::<_, Value>(3)?),
            fname_start: row.get::<_, String>(4)?,
            fname_end: row.get::<_, String>(5)?,
        })
    })?;

    let mut rows = Vec::new();
    for raw in mapped {
        let raw = raw?;
        let (Some(fname_start), Some(fname_end)) = (
            parse_naive_timestamp(&raw.fname_start),
            parse_naive_timestamp(&raw.fname_end),
        ) else {
            continue;
        };
        rows.push(IndexRecord {
            time: raw.time,
            computer: raw.computer,
            dir: raw.dir,
            file: raw.file,
            fname_start,
            fname_end,
        });
    }
    debug!(
        table = %req.table,
        candidates = rows.len(),
        "candidate index query"
    );

    Ok(CandidateResult {
        rows,
        sql,
        params,
        expanded_sql,
    })
}

struct RawRow {
    time: String,
    computer: String,
    dir: String,
    file: String,
    fname_start: String,
    fname_end: String,
}

fn value_text(value: Value) -> String {
    match value {
        Value::Text(s) => s,
        Value::Integer(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Null | Value::Blob(_) => String::new(),
    }
}
