// SPDX-License-Identifier: Apache-2.0

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use wavescope_core::{is_sql_identifier, parse_naive_timestamp, WaveformConfig};
use wavescope_model::{FilterSpec, TimeWindow};
use wavescope_query::parse_filter_expr;

use crate::errors::ApiError;

const DEBUG_TRUE: [&str; 3] = ["1", "true", "yes"];

/// Validated query parameters shared by every waveform route.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformParams {
    pub table: String,
    pub window: TimeWindow,
    /// Explicit channel, or the one derived from `device`; empty when unset.
    pub channel: String,
    pub device: String,
    pub max_n: usize,
    pub granularity: usize,
    pub yoffset: f64,
    pub filter: FilterSpec,
    pub debug: bool,
    pub force: bool,
}

impl WaveformParams {
    #[must_use]
    pub fn channel_opt(&self) -> Option<&str> {
        Some(self.channel.as_str()).filter(|c| !c.is_empty())
    }

    #[must_use]
    pub fn device_opt(&self) -> Option<&str> {
        Some(self.device.as_str()).filter(|d| !d.is_empty())
    }
}

/// Collapse raw query pairs, keeping the first value of a repeated key.
#[must_use]
pub fn first_value_per_key(pairs: Vec<(String, String)>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (k, v) in pairs {
        out.entry(k).or_insert(v);
    }
    out
}

pub fn parse_waveform_params(
    query: &BTreeMap<String, String>,
    cfg: &WaveformConfig,
) -> Result<WaveformParams, ApiError> {
    let table = query
        .get("table")
        .map_or_else(|| cfg.default_table.clone(), |v| v.trim().to_string());
    let start_raw = trimmed(query, "start");
    let end_raw = trimmed(query, "end");
    let mut channel = trimmed(query, "channel").to_string();
    let device = trimmed(query, "device").to_string();

    let max_n = parse_int(query, "max_n")?.map_or(cfg.default_max_n, |n| cfg.clamp_max_n(n));
    let granularity = parse_int(query, "granularity")?.map_or(cfg.default_granularity, |g| {
        usize::try_from(g.max(1)).unwrap_or(usize::MAX)
    });
    let yoffset = match query.get("yoffset") {
        None => cfg.default_yoffset,
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ApiError::invalid_param("yoffset", raw))?,
    };
    let filter_raw = trimmed(query, "filter");
    let debug = query
        .get("debug")
        .is_some_and(|v| DEBUG_TRUE.contains(&v.as_str()));
    let force = query
        .get("force")
        .is_some_and(|v| DEBUG_TRUE.contains(&v.to_lowercase().as_str()));

    if !is_sql_identifier(&table) {
        return Err(ApiError::bad_table(&table));
    }
    if start_raw.is_empty() || end_raw.is_empty() {
        return Err(ApiError::missing_window());
    }
    let start =
        parse_naive_timestamp(start_raw).ok_or_else(|| ApiError::invalid_timestamp(start_raw))?;
    let end = parse_naive_timestamp(end_raw).ok_or_else(|| ApiError::invalid_timestamp(end_raw))?;
    let window = TimeWindow::new(start, end).map_err(|e| ApiError::invalid_window(e.0))?;

    if channel.is_empty() && !device.is_empty() {
        if let Some(derived) = channel_from_device(&device) {
            channel = derived;
        }
    }

    let filter = parse_filter_expr(filter_raw);

    Ok(WaveformParams {
        table,
        window,
        channel,
        device,
        max_n,
        granularity,
        yoffset,
        filter,
        debug,
        force,
    })
}

/// Digits after a trailing `_ch`, e.g. `caen8ch_ch7` gives `7`.
#[must_use]
pub fn channel_from_device(device: &str) -> Option<String> {
    static DEVICE_CHANNEL: OnceLock<Option<Regex>> = OnceLock::new();
    let re = DEVICE_CHANNEL
        .get_or_init(|| Regex::new(r"_ch([0-9]+)$").ok())
        .as_ref()?;
    re.captures(device)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn trimmed<'a>(query: &'a BTreeMap<String, String>, name: &str) -> &'a str {
    query.get(name).map_or("", |v| v.trim())
}

fn parse_int(query: &BTreeMap<String, String>, name: &str) -> Result<Option<i64>, ApiError> {
    let Some(raw) = query.get(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<i64>()
        .map(Some)
        .map_err(|_| ApiError::invalid_param(name, raw))
}
