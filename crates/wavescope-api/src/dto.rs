// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use wavescope_core::format_iso;
use wavescope_model::{
    FileListing, FileUsage, FilterSpec, PulseRecord, PulseSummary, QueryDebug, Waveform,
};

use crate::params::WaveformParams;

/// Request fields echoed at the top of every JSON response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestEcho {
    pub table: String,
    pub start: String,
    pub end: String,
    pub channel: Option<String>,
    pub device: Option<String>,
    pub filter_raw: String,
    pub filter_parsed: FilterSpec,
}

impl From<&WaveformParams> for RequestEcho {
    fn from(p: &WaveformParams) -> Self {
        Self {
            table: p.table.clone(),
            start: format_iso(&p.window.start()),
            end: format_iso(&p.window.end()),
            channel: p.channel_opt().map(str::to_string),
            device: p.device_opt().map(str::to_string),
            filter_raw: p.filter.raw.clone(),
            filter_parsed: p.filter.clone(),
        }
    }
}

/// `/waveforms.json`: at most `max_n` plotted pulses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CappedResponse {
    #[serde(flatten)]
    pub echo: RequestEcho,
    pub count: usize,
    pub total_matching: usize,
    pub max_n: usize,
    pub granularity: usize,
    pub yoffset: f64,
    pub files: Vec<FileUsage>,
    pub data: Vec<Waveform>,
    pub pulses: Vec<PulseSummary>,
    pub debug: Option<QueryDebug>,
}

/// `/waveforms.all.json`: every matching pulse with samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncappedResponse {
    #[serde(flatten)]
    pub echo: RequestEcho,
    pub granularity: usize,
    pub returned_pulses: usize,
    pub total_matching: usize,
    pub files: Vec<FileUsage>,
    pub pulses: Vec<PulseRecord>,
    pub debug: Option<QueryDebug>,
}

/// `/waveforms.meta`: overlapping files without reading them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaResponse {
    #[serde(flatten)]
    pub echo: RequestEcho,
    pub files: Vec<FileListing>,
    pub debug: Option<QueryDebug>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

impl HealthResponse {
    #[must_use]
    pub const fn ok() -> Self {
        Self { status: "ok" }
    }
}
