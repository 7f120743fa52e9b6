// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use wavescope_core::ConfigError;
use wavescope_query::IndexPoolConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub index_db: PathBuf,
    /// Index connections open at once.
    pub pool_size: usize,
    /// Concurrent index queries plus file extractions; at most `pool_size`.
    pub heavy_workers: usize,
    pub request_timeout: Duration,
    pub sqlite_cache_kib: i64,
    pub sqlite_mmap_bytes: i64,
    pub sqlite_busy_timeout: Duration,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            index_db: PathBuf::from("artifacts/index.sqlite"),
            pool_size: 8,
            heavy_workers: 4,
            request_timeout: Duration::from_secs(60),
            sqlite_cache_kib: 16 * 1024,
            sqlite_mmap_bytes: 64 * 1024 * 1024,
            sqlite_busy_timeout: Duration::from_millis(2_000),
            log_json: false,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn pool_config(&self) -> IndexPoolConfig {
        IndexPoolConfig {
            max_size: self.pool_size,
            cache_kib: self.sqlite_cache_kib,
            mmap_bytes: self.sqlite_mmap_bytes,
            busy_timeout: self.sqlite_busy_timeout,
            ..IndexPoolConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError("bind address must not be empty".to_string()));
        }
        if self.pool_size == 0 || self.heavy_workers == 0 {
            return Err(ConfigError("pool size and heavy workers must be > 0".to_string()));
        }
        if self.heavy_workers > self.pool_size {
            return Err(ConfigError(format!(
                "heavy workers ({}) must not exceed pool size ({})",
                self.heavy_workers, self.pool_size
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError("request timeout must be > 0".to_string()));
        }
        if self.sqlite_cache_kib < 0 || self.sqlite_mmap_bytes < 0 {
            return Err(ConfigError("sqlite pragma sizes must be >= 0".to_string()));
        }
        Ok(())
    }
}
