/*!
 * Server Configuration
 * Defaults from `core::limits`, overridable through `MEMSRV_*` variables
 */

use super::ServerError;
use crate::core::limits;
use crate::core::types::Size;
use crate::monitoring::SnapshotFormat;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Room for the status byte and the longest reply text
const FRAME_OVERHEAD: usize = 64;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    pub arena_size: Size,
    /// No snapshots are written when unset
    pub snapshot_dir: Option<PathBuf>,
    pub snapshot_format: SnapshotFormat,
    pub gc_interval: Duration,
    pub max_connections: usize,
    pub idle_timeout: Duration,
    pub max_frame_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), limits::DEFAULT_PORT),
            arena_size: limits::DEFAULT_ARENA_SIZE,
            snapshot_dir: None,
            snapshot_format: SnapshotFormat::Text,
            gc_interval: limits::DEFAULT_GC_INTERVAL,
            max_connections: limits::DEFAULT_MAX_CONNECTIONS,
            idle_timeout: limits::DEFAULT_IDLE_TIMEOUT,
            max_frame_len: limits::MAX_FRAME_LEN,
        }
    }
}

impl ServerConfig {
    /// Local-only config with an OS-assigned port
    pub fn ephemeral(arena_size: Size) -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            arena_size,
            ..Self::default()
        }
    }

    /// Environment variables:
    /// - MEMSRV_BIND: listen address (default: 0.0.0.0)
    /// - MEMSRV_PORT: listen port (default: 50051)
    /// - MEMSRV_MEMSIZE_MB: arena size in MiB (default: 10)
    /// - MEMSRV_DUMP_DIR: snapshot directory (default: none)
    /// - MEMSRV_DUMP_FORMAT: `text` or `json` (default: text)
    /// - MEMSRV_GC_INTERVAL_SECS: sweep period (default: 5)
    /// - MEMSRV_MAX_CONNECTIONS: concurrent sessions (default: 1024)
    /// - MEMSRV_IDLE_TIMEOUT_SECS: idle session timeout (default: 300)
    /// - MEMSRV_MAX_FRAME_LEN: frame limit in bytes (default: 16MB, raised to fit the arena)
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let defaults = Self::default();

        let bind: IpAddr = parse(&lookup, "MEMSRV_BIND")?.unwrap_or(defaults.listen_addr.ip());
        let port: u16 = parse(&lookup, "MEMSRV_PORT")?.unwrap_or(limits::DEFAULT_PORT);
        let arena_mb: usize = parse(&lookup, "MEMSRV_MEMSIZE_MB")?.unwrap_or(limits::DEFAULT_ARENA_MB);
        let arena_size = arena_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| ServerError::Config(format!("MEMSRV_MEMSIZE_MB too large: {arena_mb}")))?;

        let snapshot_format = match lookup("MEMSRV_DUMP_FORMAT").as_deref() {
            None | Some("text") => SnapshotFormat::Text,
            Some("json") => SnapshotFormat::Json,
            Some(other) => {
                return Err(ServerError::Config(format!(
                    "MEMSRV_DUMP_FORMAT must be text or json, got {other:?}"
                )))
            }
        };

        let config = Self {
            listen_addr: SocketAddr::new(bind, port),
            arena_size,
            snapshot_dir: lookup("MEMSRV_DUMP_DIR")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            snapshot_format,
            gc_interval: parse(&lookup, "MEMSRV_GC_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.gc_interval),
            max_connections: parse(&lookup, "MEMSRV_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            idle_timeout: parse(&lookup, "MEMSRV_IDLE_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
            max_frame_len: parse(&lookup, "MEMSRV_MAX_FRAME_LEN")?
                .unwrap_or_else(|| defaults.max_frame_len.max(arena_size + FRAME_OVERHEAD)),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.arena_size == 0 {
            return Err(ServerError::Config("arena size must be non-zero".to_string()));
        }
        if self.gc_interval.is_zero() {
            return Err(ServerError::Config("GC interval must be non-zero".to_string()));
        }
        if self.max_connections == 0 {
            return Err(ServerError::Config("max connections must be non-zero".to_string()));
        }
        if self.idle_timeout.is_zero() {
            return Err(ServerError::Config("idle timeout must be non-zero".to_string()));
        }
        // A GET of the largest possible block must fit in one frame
        if self.max_frame_len < self.arena_size + FRAME_OVERHEAD {
            return Err(ServerError::Config(format!(
                "max frame length {} cannot carry a {}-byte block",
                self.max_frame_len, self.arena_size
            )));
        }
        Ok(())
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ServerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ServerError::Config(format!("{key}={raw:?}: {e}"))),
    }
}
