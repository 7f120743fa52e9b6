// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

//! Event-file access and per-file record extraction.
//!
//! An event file holds one tree of aligned branches: a raw clock, optional
//! energies and the digitized samples. Backends implement [`EventSource`];
//! the extractor only sees the [`EventTree`] seam.

use std::fmt::{Display, Formatter};
use std::path::Path;

mod extract;
mod fake;
mod parquet_backend;

pub use extract::{extract_file, extract_records, ExtractRequest, Extraction};
pub use fake::{FakeBranch, FakeEventSource, FakeTree};
pub use parquet_backend::{write_event_file, EventTable, ParquetEventSource, TREE_METADATA_KEY};

pub const CRATE_NAME: &str = "wavescope-store";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(pub String);

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// Opens event trees by path.
pub trait EventSource: Send + Sync + 'static {
    fn backend_tag(&self) -> &'static str;

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    /// `Ok(None)` when the file carries no tree with this name.
    fn open_tree(&self, path: &Path, tree: &str) -> Result<Option<Box<dyn EventTree>>, StoreError>;
}

/// Column-wise reads over one opened tree. All branches have one value per
/// entry, in file order.
pub trait EventTree {
    fn num_entries(&self) -> u64;

    fn has_branch(&self, branch: &str) -> bool;

    /// Raw clock ticks. Signed and unsigned 64-bit sources both fit.
    fn read_clock(&self, branch: &str) -> Result<Vec<i128>, StoreError>;

    fn read_f64(&self, branch: &str) -> Result<Vec<f64>, StoreError>;

    /// Sample arrays for the listed entries only, returned in `rows` order.
    fn read_samples(&self, branch: &str, rows: &[usize]) -> Result<Vec<Vec<i64>>, StoreError>;

    /// Branch names, for inspection.
    fn branches(&self) -> Vec<String>;
}
