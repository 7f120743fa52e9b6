// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

pub mod config;
pub mod path;
pub mod time;

pub use config::{ConfigError, WaveformConfig};
pub use path::{resolve_under_base, PathError, PathErrorKind};
pub use time::{
    format_clock_label, format_iso, format_sql_timestamp, offset_by_seconds,
    parse_filename_token, parse_naive_timestamp,
};

pub const CRATE_NAME: &str = "wavescope-core";

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Validation = 3,
    DependencyFailure = 4,
    Internal = 10,
}

/// True for `[A-Za-z_][A-Za-z0-9_]*`, the only shape accepted for SQL names
/// that are interpolated into query text.
#[must_use]
pub fn is_sql_identifier(raw: &str) -> bool {
    let mut chars = raw.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
