// SPDX-License-Identifier: Apache-2.0

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

use crate::index::register_index_functions;
use crate::{QueryError, QueryErrorCode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexPoolConfig {
    /// Connections open at once, idle or checked out.
    pub max_size: usize,
    pub cache_kib: i64,
    pub mmap_bytes: i64,
    pub busy_timeout: Duration,
    pub statement_cache: usize,
}

impl Default for IndexPoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            cache_kib: 16 * 1024,
            mmap_bytes: 64 * 1024 * 1024,
            busy_timeout: Duration::from_millis(2_000),
            statement_cache: 32,
        }
    }
}

#[derive(Default)]
struct PoolState {
    idle: Vec<Connection>,
    /// Idle plus checked-out connections.
    live: usize,
}

/// Fixed-size set of read-only connections to the file index.
///
/// A connection is checked out for one query body and returned afterwards.
/// Idle connections are pinged before reuse and replaced when the ping fails.
/// A checkout with every connection in use fails with `PoolExhausted`.
pub struct IndexPool {
    path: PathBuf,
    cfg: IndexPoolConfig,
    state: Mutex<PoolState>,
    opened: AtomicU64,
    discarded: AtomicU64,
}

impl IndexPool {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, cfg: IndexPoolConfig) -> Self {
        Self {
            path: path.into(),
            cfg,
            state: Mutex::new(PoolState::default()),
            opened: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` on a validated connection, then return it to the pool.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, QueryError>,
    ) -> Result<T, QueryError> {
        let conn = self.checkout()?;
        let out = f(&conn);
        self.checkin(conn);
        out
    }

    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.state.lock().map(|s| s.idle.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn in_use_count(&self) -> usize {
        self.state
            .lock()
            .map(|s| s.live.saturating_sub(s.idle.len()))
            .unwrap_or(0)
    }

    #[must_use]
    pub fn opened_total(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn discarded_total(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Open one connection eagerly so startup fails fast on a bad path.
    pub fn warm(&self) -> Result<(), QueryError> {
        let conn = self.checkout()?;
        self.checkin(conn);
        Ok(())
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, PoolState>, QueryError> {
        self.state
            .lock()
            .map_err(|_| QueryError::new(QueryErrorCode::PoolExhausted, "index pool lock poisoned"))
    }

    fn checkout(&self) -> Result<Connection, QueryError> {
        loop {
            let candidate = {
                let mut state = self.lock_state()?;
                match state.idle.pop() {
                    Some(conn) => conn,
                    None if state.live < self.cfg.max_size => {
                        state.live += 1;
                        drop(state);
                        return self.open().map_err(|e| {
                            self.release_slot();
                            e
                        });
                    }
                    None => {
                        return Err(QueryError::new(
                            QueryErrorCode::PoolExhausted,
                            format!(
                                "all {} index connections are in use",
                                self.cfg.max_size
                            ),
                        ));
                    }
                }
            };
            if ping(&candidate) {
                return Ok(candidate);
            }
            self.discarded.fetch_add(1, Ordering::Relaxed);
            self.release_slot();
            warn!(path = %self.path.display(), "discarding index connection that failed pre-ping");
        }
    }

    fn checkin(&self, conn: Connection) {
        if let Ok(mut state) = self.state.lock() {
            state.idle.push(conn);
        }
    }

    fn release_slot(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.live = state.live.saturating_sub(1);
        }
    }

    fn open(&self) -> Result<Connection, QueryError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.execute_batch(&format!(
            "PRAGMA query_only=ON; PRAGMA temp_store=MEMORY; PRAGMA cache_size=-{}; PRAGMA mmap_size={}; PRAGMA case_sensitive_like=ON;",
            self.cfg.cache_kib, self.cfg.mmap_bytes,
        ))?;
        conn.busy_timeout(self.cfg.busy_timeout)?;
        conn.set_prepared_statement_cache_capacity(self.cfg.statement_cache);
        register_index_functions(&conn)?;
        self.opened.fetch_add(1, Ordering::Relaxed);
        debug!(path = %self.path.display(), "opened index connection");
        Ok(conn)
    }
}

fn ping(conn: &Connection) -> bool {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        .map(|v| v == 1)
        .unwrap_or(false)
}
