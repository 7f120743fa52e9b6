// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use wavescope_core::WaveformConfig;
use wavescope_query::IndexPool;
use wavescope_server::{build_router, AppState, ServerConfig};
use wavescope_store::ParquetEventSource;

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(default)
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_duration_ms(name: &str, default: Duration) -> Duration {
    Duration::from_millis(env_u64(
        name,
        u64::try_from(default.as_millis()).unwrap_or(u64::MAX),
    ))
}

fn waveform_config_from_env() -> WaveformConfig {
    let d = WaveformConfig::default();
    let base_dir = env::var("WAVESCOPE_BASE_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| d.base_dir.clone(), PathBuf::from);
    WaveformConfig {
        base_dir,
        default_table: env_string("WAVESCOPE_INDEX_TABLE", &d.default_table),
        tree_name: env_string("WAVESCOPE_TREE_NAME", &d.tree_name),
        timestamp_divisor: env_f64("WAVESCOPE_TIMESTAMP_DIVISOR", d.timestamp_divisor),
        default_max_n: env_usize("WAVESCOPE_DEFAULT_MAX_N", d.default_max_n),
        hard_cap_n: env_usize("WAVESCOPE_HARD_CAP_N", d.hard_cap_n),
        max_candidate_files: env_usize("WAVESCOPE_MAX_FILES", d.max_candidate_files),
        candidate_row_limit: env_usize("WAVESCOPE_CANDIDATE_ROW_LIMIT", d.candidate_row_limit),
        uncapped_max_pulses: env_usize("WAVESCOPE_UNCAPPED_MAX_PULSES", d.uncapped_max_pulses),
        ..d
    }
}

fn server_config_from_env() -> ServerConfig {
    let d = ServerConfig::default();
    let index_db = env::var("WAVESCOPE_INDEX_DB")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| d.index_db.clone(), PathBuf::from);
    ServerConfig {
        bind_addr: env_string("WAVESCOPE_BIND", &d.bind_addr),
        index_db,
        pool_size: env_usize("WAVESCOPE_POOL_SIZE", d.pool_size),
        heavy_workers: env_usize("WAVESCOPE_HEAVY_WORKERS", d.heavy_workers),
        request_timeout: env_duration_ms("WAVESCOPE_REQUEST_TIMEOUT_MS", d.request_timeout),
        sqlite_cache_kib: env_i64("WAVESCOPE_SQLITE_CACHE_KIB", d.sqlite_cache_kib),
        sqlite_mmap_bytes: env_i64("WAVESCOPE_SQLITE_MMAP_BYTES", d.sqlite_mmap_bytes),
        sqlite_busy_timeout: env_duration_ms(
            "WAVESCOPE_SQLITE_BUSY_TIMEOUT_MS",
            d.sqlite_busy_timeout,
        ),
        log_json: env_bool("WAVESCOPE_LOG_JSON", d.log_json),
    }
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let server = server_config_from_env();
    init_tracing(server.log_json);

    let cfg = waveform_config_from_env();
    cfg.validate().map_err(|e| format!("invalid waveform config: {e}"))?;
    server
        .validate()
        .map_err(|e| format!("invalid server config: {e}"))?;
    info!(
        config = %serde_json::to_string(&server).unwrap_or_default(),
        base_dir = %cfg.base_dir.display(),
        table = %cfg.default_table,
        "effective configuration"
    );

    let pool = IndexPool::new(server.index_db.clone(), server.pool_config());
    if let Err(e) = pool.warm() {
        warn!(index_db = %server.index_db.display(), error = %e, "index database not reachable at startup");
    }

    let bind_addr = server.bind_addr.clone();
    let state = AppState::new(cfg, server, pool, Arc::new(ParquetEventSource));
    let app = build_router(state);

    let addr: SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("invalid bind addr {bind_addr}: {e}"))?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4().map_err(|e| format!("socket v4 failed: {e}"))?
    } else {
        tokio::net::TcpSocket::new_v6().map_err(|e| format!("socket v6 failed: {e}"))?
    };
    socket
        .set_reuseaddr(true)
        .map_err(|e| format!("set_reuseaddr failed: {e}"))?;
    socket.bind(addr).map_err(|e| format!("bind failed: {e}"))?;
    let listener: TcpListener = socket
        .listen(1024)
        .map_err(|e| format!("listen failed: {e}"))?;
    info!("wavescope-server listening on {bind_addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await
        .map_err(|e| format!("server failed: {e}"))?;
    info!("wavescope-server stopped");
    Ok(())
}
