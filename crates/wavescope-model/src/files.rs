// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One index row whose filename carried a decodable interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRecord {
    /// Acquisition time column, as stored.
    pub time: String,
    pub computer: String,
    pub dir: String,
    pub file: String,
    #[serde(with = "crate::iso_time")]
    pub fname_start: NaiveDateTime,
    #[serde(with = "crate::iso_time")]
    pub fname_end: NaiveDateTime,
}

impl IndexRecord {
    /// Untrusted path segments below the data root.
    #[must_use]
    pub fn path_segments(&self) -> [&str; 3] {
        [&self.computer, &self.dir, &self.file]
    }
}

/// A resolved on-disk file and its declared interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub file_start: NaiveDateTime,
    pub file_end: NaiveDateTime,
}

impl CandidateFile {
    #[must_use]
    pub fn usage(&self, count: usize) -> FileUsage {
        FileUsage {
            path: self.path.clone(),
            file_start: self.file_start,
            file_end: self.file_end,
            count,
        }
    }

    #[must_use]
    pub fn listing(&self) -> FileListing {
        FileListing {
            path: self.path.clone(),
            file_start: self.file_start,
            file_end: self.file_end,
            num_entries: None,
        }
    }

    #[must_use]
    pub fn debug(&self, counters: FileDiagnostics) -> FileDebug {
        FileDebug {
            path: self.path.clone(),
            file_start: self.file_start,
            file_end: self.file_end,
            counters,
        }
    }
}

/// Per-file extractor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileDiagnostics {
    pub scanned: usize,
    pub time_match: usize,
    #[serde(rename = "psd_keep")]
    pub shape_keep: usize,
    pub energy_keep: usize,
    pub final_keep: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileUsage {
    pub path: PathBuf,
    #[serde(with = "crate::iso_time")]
    pub file_start: NaiveDateTime,
    #[serde(with = "crate::iso_time")]
    pub file_end: NaiveDateTime,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileListing {
    pub path: PathBuf,
    #[serde(with = "crate::iso_time")]
    pub file_start: NaiveDateTime,
    #[serde(with = "crate::iso_time")]
    pub file_end: NaiveDateTime,
    pub num_entries: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDebug {
    pub path: PathBuf,
    #[serde(with = "crate::iso_time")]
    pub file_start: NaiveDateTime,
    #[serde(with = "crate::iso_time")]
    pub file_end: NaiveDateTime,
    #[serde(flatten)]
    pub counters: FileDiagnostics,
}

/// Query diagnostics returned when debugging is requested.
///
/// `per_file` is absent for listing requests, which never open files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryDebug {
    pub sql: String,
    pub sql_params: BTreeMap<String, String>,
    pub expanded_sql: String,
    pub candidate_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_file: Option<Vec<FileDebug>>,
}
