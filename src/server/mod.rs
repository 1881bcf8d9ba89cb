/*!
 * Protocol Server
 *
 * Accepts TCP connections and runs one session task per connection.
 * Sessions are capped by a semaphore: when every permit is taken the accept
 * loop waits, and pending connections queue in the listen backlog.
 *
 * The server owns the GC task; `run_until` stops accepting on shutdown,
 * then stops the GC and awaits it before returning.
 */

mod config;
mod dispatch;
mod session;

pub use config::ServerConfig;
pub use dispatch::{dispatch, handle_request};

use crate::memory::{GcTask, MemoryError, MemoryManager};
use crate::monitoring::{DirectorySink, SnapshotWriter};
use session::{run_session, SessionLimits};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{info, info_span, warn, Instrument};

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("Arena unavailable: {0}")]
    Arena(#[source] MemoryError),

    #[error("Snapshot sink unavailable: {0}")]
    Snapshot(#[source] io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A bound, not yet running, server
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
    memory: MemoryManager,
    gc: GcTask,
    connections: Arc<Semaphore>,
}

impl Server {
    /// Build the memory manager (with a snapshot directory if configured),
    /// bind the listener, and start the GC task
    ///
    /// Must be called inside a tokio runtime.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;

        let mut memory = MemoryManager::try_new(config.arena_size).map_err(ServerError::Arena)?;
        if let Some(dir) = &config.snapshot_dir {
            let sink =
                DirectorySink::new(dir, config.snapshot_format).map_err(ServerError::Snapshot)?;
            let writer = SnapshotWriter::spawn(sink).map_err(ServerError::Snapshot)?;
            info!(dir = %dir.display(), "Writing block table snapshots");
            memory = memory.with_snapshots(writer);
        }

        Self::with_memory(config, memory).await
    }

    /// Like [`Server::bind`] but over a caller-built manager
    pub async fn with_memory(
        config: ServerConfig,
        memory: MemoryManager,
    ) -> Result<Self, ServerError> {
        config.validate()?;

        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.listen_addr,
                source,
            })?;
        let gc = GcTask::spawn(memory.clone(), config.gc_interval);

        info!(
            addr = %listener.local_addr()?,
            arena_bytes = config.arena_size,
            max_connections = config.max_connections,
            "Memory server listening"
        );

        Ok(Self {
            listener,
            connections: Arc::new(Semaphore::new(config.max_connections)),
            config,
            memory,
            gc,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn gc(&self) -> &GcTask {
        &self.gc
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until `shutdown` resolves, then stop the GC and wait for it
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let Server {
            listener,
            config,
            memory,
            gc,
            connections,
        } = self;
        let limits = SessionLimits {
            idle_timeout: config.idle_timeout,
            max_frame_len: config.max_frame_len,
        };
        tokio::pin!(shutdown);

        loop {
            let permit = tokio::select! {
                _ = &mut shutdown => break,
                permit = Arc::clone(&connections).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        continue;
                    }
                },
            };

            info!(%peer, "Session opened");
            let memory = memory.clone();
            tokio::spawn(
                async move {
                    run_session(stream, peer, memory, limits).await;
                    drop(permit);
                    info!("Session closed");
                }
                .instrument(info_span!("session", %peer)),
            );
        }

        info!("Shutting down: no longer accepting connections");
        drop(listener);
        gc.shutdown().await;
        Ok(())
    }

    /// Serve until Ctrl-C
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Could not listen for Ctrl-C; shutting down");
            }
        })
        .await
    }
}
