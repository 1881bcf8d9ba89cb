/*!
 * Test Server Harness
 * Runs a server on its own runtime thread for blocking clients
 */

#![allow(dead_code)]

use remote_memory::client::{Client, ClientConfig};
use remote_memory::memory::{MemoryManager, SweepStats};
use remote_memory::protocol::{read_frame_blocking, write_frame_blocking, Response};
use remote_memory::server::{Server, ServerConfig};
use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::oneshot;

const FRAME_LIMIT: usize = 1 << 20;

pub struct TestServer {
    pub addr: SocketAddr,
    pub memory: MemoryManager,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TestServer {
    pub fn start(arena_size: usize) -> Self {
        Self::start_with(ServerConfig::ephemeral(arena_size))
    }

    /// Sweeps only happen when a test asks for one
    pub fn start_with(mut config: ServerConfig) -> Self {
        config.gc_interval = Duration::from_secs(3600);

        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let thread = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("runtime");
            runtime.block_on(async move {
                let server = Server::bind(config).await.expect("bind");
                let addr = server.local_addr().expect("local addr");
                ready_tx
                    .send((addr, server.memory().clone()))
                    .expect("ready");
                server
                    .run_until(async {
                        let _ = shutdown_rx.await;
                    })
                    .await
                    .expect("serve");
            });
        });

        let (addr, memory) = ready_rx.recv().expect("server failed to start");
        Self {
            addr,
            memory,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        }
    }

    pub fn client(&self) -> Arc<Client> {
        Client::connect(ClientConfig::from(self.addr).with_io_timeout(Duration::from_secs(5)))
            .expect("connect")
    }

    pub fn raw(&self) -> RawConnection {
        RawConnection::connect(self.addr)
    }

    pub fn sweep(&self) -> SweepStats {
        self.memory.sweep()
    }

    pub fn ref_count(&self, id: u64) -> Option<u32> {
        self.memory.block(id).filter(|b| !b.free).map(|b| b.ref_count)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// Speaks the wire protocol directly
pub struct RawConnection {
    pub stream: TcpStream,
}

impl RawConnection {
    pub fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .expect("timeout");
        Self { stream }
    }

    pub fn send(&mut self, request: &[u8]) -> Response {
        write_frame_blocking(&mut self.stream, request, FRAME_LIMIT).expect("write");
        let payload = read_frame_blocking(&mut self.stream, FRAME_LIMIT)
            .expect("read")
            .expect("server closed connection");
        Response::decode(&payload).expect("decode")
    }

    /// The reply body as text, errors included
    pub fn send_text(&mut self, request: &str) -> String {
        match self.send(request.as_bytes()) {
            Response::Success(body) => String::from_utf8_lossy(&body).into_owned(),
            Response::Error(reply) => reply.message().to_string(),
        }
    }

    pub fn create(&mut self, size: usize, type_tag: &str) -> u64 {
        self.send_text(&format!("CREATE {size} {type_tag}"))
            .parse()
            .expect("CREATE returned an id")
    }
}
