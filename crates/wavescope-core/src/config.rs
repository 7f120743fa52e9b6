// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

use crate::is_sql_identifier;

pub const DEFAULT_BASE_DIR: &str = "/mnt/gdrive/Computers";
pub const DEFAULT_INDEX_TABLE: &str = "root_files";
pub const DEFAULT_TREE_NAME: &str = "Data_R";
pub const TIMESTAMP_DIVISOR: f64 = 1e12;
pub const DEFAULT_MAX_N: usize = 80;
pub const HARD_CAP_N: usize = 500;
pub const MAX_CANDIDATE_FILES: usize = 10;
pub const CANDIDATE_ROW_LIMIT: usize = 4000;
pub const UNCAPPED_MAX_PULSES: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Column names of the externally populated file index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexColumns {
    pub time: String,
    pub computer: String,
    pub dir: String,
    pub file: String,
}

impl Default for IndexColumns {
    fn default() -> Self {
        Self {
            time: "time".to_string(),
            computer: "computer".to_string(),
            dir: "dir".to_string(),
            file: "file".to_string(),
        }
    }
}

/// Branch names inside one event tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BranchNames {
    pub timestamp: String,
    pub samples: String,
    pub energy: String,
    pub energy_short: String,
}

impl Default for BranchNames {
    fn default() -> Self {
        Self {
            timestamp: "Timestamp".to_string(),
            samples: "Samples".to_string(),
            energy: "Energy".to_string(),
            energy_short: "EnergyShort".to_string(),
        }
    }
}

/// Process-wide settings, built once at startup and shared read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaveformConfig {
    pub base_dir: PathBuf,
    pub default_table: String,
    pub columns: IndexColumns,
    pub tree_name: String,
    pub branches: BranchNames,
    /// Raw clock ticks per second.
    pub timestamp_divisor: f64,
    pub default_max_n: usize,
    pub hard_cap_n: usize,
    pub default_granularity: usize,
    pub default_yoffset: f64,
    pub max_candidate_files: usize,
    pub candidate_row_limit: usize,
    pub uncapped_max_pulses: usize,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from(DEFAULT_BASE_DIR),
            default_table: DEFAULT_INDEX_TABLE.to_string(),
            columns: IndexColumns::default(),
            tree_name: DEFAULT_TREE_NAME.to_string(),
            branches: BranchNames::default(),
            timestamp_divisor: TIMESTAMP_DIVISOR,
            default_max_n: DEFAULT_MAX_N,
            hard_cap_n: HARD_CAP_N,
            default_granularity: 1,
            default_yoffset: 0.0,
            max_candidate_files: MAX_CANDIDATE_FILES,
            candidate_row_limit: CANDIDATE_ROW_LIMIT,
            uncapped_max_pulses: UNCAPPED_MAX_PULSES,
        }
    }
}

impl WaveformConfig {
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_dir.as_os_str().is_empty() {
            return Err(ConfigError("base_dir must not be empty".to_string()));
        }
        if !is_sql_identifier(&self.default_table) {
            return Err(ConfigError(format!(
                "default_table is not an identifier: {}",
                self.default_table
            )));
        }
        for (label, name) in [
            ("columns.time", &self.columns.time),
            ("columns.computer", &self.columns.computer),
            ("columns.dir", &self.columns.dir),
            ("columns.file", &self.columns.file),
        ] {
            if !is_sql_identifier(name) {
                return Err(ConfigError(format!("{label} is not an identifier: {name}")));
            }
        }
        if !(self.timestamp_divisor.is_finite() && self.timestamp_divisor > 0.0) {
            return Err(ConfigError(
                "timestamp_divisor must be finite and > 0".to_string(),
            ));
        }
        if self.hard_cap_n == 0 {
            return Err(ConfigError("hard_cap_n must be > 0".to_string()));
        }
        if self.default_max_n == 0 || self.default_max_n > self.hard_cap_n {
            return Err(ConfigError(format!(
                "default_max_n must be in [1, {}]",
                self.hard_cap_n
            )));
        }
        if self.default_granularity == 0 {
            return Err(ConfigError("default_granularity must be > 0".to_string()));
        }
        if !self.default_yoffset.is_finite() {
            return Err(ConfigError("default_yoffset must be finite".to_string()));
        }
        if self.max_candidate_files == 0
            || self.candidate_row_limit == 0
            || self.uncapped_max_pulses == 0
        {
            return Err(ConfigError("file and pulse caps must be > 0".to_string()));
        }
        if self.candidate_row_limit < self.max_candidate_files {
            return Err(ConfigError(
                "candidate_row_limit must not be below max_candidate_files".to_string(),
            ));
        }
        Ok(())
    }

    /// Clamp a requested record count into `[1, hard_cap_n]`.
    #[must_use]
    pub fn clamp_max_n(&self, requested: i64) -> usize {
        let cap = i64::try_from(self.hard_cap_n).unwrap_or(i64::MAX);
        usize::try_from(requested.clamp(1, cap)).unwrap_or(1)
    }
}
