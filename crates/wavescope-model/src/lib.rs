// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

mod filter;
mod files;
mod pulse;
mod window;

pub use filter::{FilterKind, FilterSpec};
pub use files::{
    CandidateFile, FileDebug, FileDiagnostics, FileListing, FileUsage, IndexRecord, QueryDebug,
};
pub use pulse::{PulseRecord, PulseSummary, Waveform};
pub use window::{TimeWindow, ValidationError};

pub const CRATE_NAME: &str = "wavescope-model";

/// Serialize naive timestamps in the service's ISO form.
pub mod iso_time {
    use chrono::NaiveDateTime;
    use serde::Serializer;
    use wavescope_core::format_iso;

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_iso(ts))
    }
}
