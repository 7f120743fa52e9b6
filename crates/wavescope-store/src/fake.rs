// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use wavescope_core::config::BranchNames;

use crate::{EventSource, EventTree, StoreError};

/// In-memory event files keyed by path.
#[derive(Default)]
pub struct FakeEventSource {
    pub files: Mutex<HashMap<PathBuf, FakeTree>>,
    pub open_calls: AtomicU64,
}

impl FakeEventSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(self, path: impl Into<PathBuf>, tree: FakeTree) -> Self {
        self.insert(path, tree);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, tree: FakeTree) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), tree);
        }
    }

    #[must_use]
    pub fn open_count(&self) -> u64 {
        self.open_calls.load(Ordering::Relaxed)
    }
}

impl EventSource for FakeEventSource {
    fn backend_tag(&self) -> &'static str {
        "fake"
    }

    fn exists(&self, path: &Path) -> bool {
        self.files
            .lock()
            .map(|files| files.contains_key(path))
            .unwrap_or(false)
    }

    fn open_tree(&self, path: &Path, tree: &str) -> Result<Option<Box<dyn EventTree>>, StoreError> {
        self.open_calls.fetch_add(1, Ordering::Relaxed);
        let files = self
            .files
            .lock()
            .map_err(|_| StoreError("fake event source lock poisoned".to_string()))?;
        let found = files
            .get(path)
            .ok_or_else(|| StoreError(format!("no such event file: {}", path.display())))?;
        if found.name != tree {
            return Ok(None);
        }
        Ok(Some(Box::new(found.clone())))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FakeBranch {
    Clock(Vec<i64>),
    Float(Vec<f64>),
    Samples(Vec<Vec<i64>>),
    /// Every read of this branch fails.
    Broken,
}

impl FakeBranch {
    fn len(&self) -> usize {
        match self {
            Self::Clock(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Samples(v) => v.len(),
            Self::Broken => 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeTree {
    pub name: String,
    pub branches: BTreeMap<String, FakeBranch>,
}

impl FakeTree {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            branches: BTreeMap::new(),
        }
    }

    /// A complete tree with clock, energies and samples.
    #[must_use]
    pub fn pulses(
        names: &BranchNames,
        tree: &str,
        clock: Vec<i64>,
        energy: Vec<f64>,
        energy_short: Vec<f64>,
        samples: Vec<Vec<i64>>,
    ) -> Self {
        Self::named(tree)
            .with_branch(&names.timestamp, FakeBranch::Clock(clock))
            .with_branch(&names.energy, FakeBranch::Float(energy))
            .with_branch(&names.energy_short, FakeBranch::Float(energy_short))
            .with_branch(&names.samples, FakeBranch::Samples(samples))
    }

    #[must_use]
    pub fn with_branch(mut self, name: impl Into<String>, branch: FakeBranch) -> Self {
        self.branches.insert(name.into(), branch);
        self
    }

    #[must_use]
    pub fn without_branch(mut self, name: &str) -> Self {
        self.branches.remove(name);
        self
    }

    fn branch(&self, name: &str) -> Result<&FakeBranch, StoreError> {
        match self.branches.get(name) {
            Some(FakeBranch::Broken) => Err(StoreError(format!("corrupt branch: {name}"))),
            Some(branch) => Ok(branch),
            None => Err(StoreError(format!("missing branch: {name}"))),
        }
    }
}

impl EventTree for FakeTree {
    fn num_entries(&self) -> u64 {
        let n = self.branches.values().map(FakeBranch::len).max().unwrap_or(0);
        u64::try_from(n).unwrap_or(u64::MAX)
    }

    fn has_branch(&self, branch: &str) -> bool {
        self.branches.contains_key(branch)
    }

    fn read_clock(&self, branch: &str) -> Result<Vec<i128>, StoreError> {
        match self.branch(branch)? {
            FakeBranch::Clock(v) => Ok(v.iter().map(|&x| i128::from(x)).collect()),
            _ => Err(StoreError(format!("branch {branch} is not a clock"))),
        }
    }

    fn read_f64(&self, branch: &str) -> Result<Vec<f64>, StoreError> {
        match self.branch(branch)? {
            FakeBranch::Float(v) => Ok(v.clone()),
            FakeBranch::Clock(v) => Ok(v.iter().map(|&x| x as f64).collect()),
            _ => Err(StoreError(format!("branch {branch} is not numeric"))),
        }
    }

    fn read_samples(&self, branch: &str, rows: &[usize]) -> Result<Vec<Vec<i64>>, StoreError> {
        let FakeBranch::Samples(all) = self.branch(branch)? else {
            return Err(StoreError(format!("branch {branch} holds no sample arrays")));
        };
        rows.iter()
            .map(|&row| {
                all.get(row)
                    .cloned()
                    .ok_or_else(|| StoreError(format!("entry {row} out of range in {branch}")))
            })
            .collect()
    }

    fn branches(&self) -> Vec<String> {
        self.branches.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_counts_calls_and_checks_tree_name() {
        let source = FakeEventSource::new().with_file(
            "/data/a.root",
            FakeTree::named("Data_R").with_branch("Timestamp", FakeBranch::Clock(vec![1, 2])),
        );
        assert!(source.exists(Path::new("/data/a.root")));
        assert!(!source.exists(Path::new("/data/b.root")));
        let tree = source
            .open_tree(Path::new("/data/a.root"), "Data_R")
            .expect("open")
            .expect("tree");
        assert_eq!(tree.num_entries(), 2);
        assert!(source
            .open_tree(Path::new("/data/a.root"), "Other")
            .expect("open")
            .is_none());
        assert!(source.open_tree(Path::new("/data/b.root"), "Data_R").is_err());
        assert_eq!(source.open_count(), 3);
    }

    #[test]
    fn broken_branch_fails_reads() {
        let tree = FakeTree::named("t").with_branch("Samples", FakeBranch::Broken);
        assert!(tree.has_branch("Samples"));
        assert!(tree.read_samples("Samples", &[0]).is_err());
        assert!(tree.read_clock("Timestamp").is_err());
    }
}
