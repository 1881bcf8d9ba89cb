/*!
 * Client Connection
 * One persistent blocking connection, strictly request-then-response
 */

use super::{ClientError, ClientResult};
use crate::core::limits;
use crate::core::types::{BlockId, Size};
use crate::protocol::{read_frame_blocking, write_frame_blocking, Command, Response};
use parking_lot::Mutex;
use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// `host:port`
    pub addr: String,
    pub connect_timeout: Duration,
    /// Applied to every read and write
    pub io_timeout: Duration,
    pub max_frame_len: usize,
}

impl ClientConfig {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: limits::DEFAULT_CONNECT_TIMEOUT,
            io_timeout: limits::DEFAULT_IO_TIMEOUT,
            max_frame_len: limits::MAX_FRAME_LEN,
        }
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl From<SocketAddr> for ClientConfig {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.to_string())
    }
}

/// Connection to a memory server
///
/// Shared by every handle created from it. Requests are serialized by a
/// lock, so one connection never has two requests in flight. After a
/// transport error the connection is dropped and the next request dials
/// again.
pub struct Client {
    config: ClientConfig,
    stream: Mutex<Option<TcpStream>>,
}

impl Client {
    /// Connect eagerly so configuration errors surface here
    pub fn connect(config: ClientConfig) -> ClientResult<Arc<Self>> {
        let stream = dial(&config)?;
        Ok(Arc::new(Self {
            config,
            stream: Mutex::new(Some(stream)),
        }))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send one command and return the success body
    pub fn request(&self, command: &Command) -> ClientResult<Vec<u8>> {
        let mut guard = self.stream.lock();
        if guard.is_none() {
            *guard = Some(dial(&self.config)?);
        }
        let stream = guard.as_mut().ok_or_else(|| {
            ClientError::Transport(io::Error::new(io::ErrorKind::NotConnected, "not connected"))
        })?;

        let exchange = write_frame_blocking(stream, &command.encode(), self.config.max_frame_len)
            .and_then(|()| read_frame_blocking(stream, self.config.max_frame_len));

        let payload = match exchange {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                *guard = None;
                return Err(ClientError::Transport(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )));
            }
            Err(e) => {
                // The stream may hold half a frame; never reuse it
                warn!(verb = command.verb(), error = %e, "Request failed, dropping connection");
                *guard = None;
                return Err(e.into());
            }
        };
        drop(guard);

        match Response::decode(&payload)? {
            Response::Success(body) => Ok(body),
            Response::Error(reply) => Err(ClientError::Server(reply)),
        }
    }

    /// CREATE: allocate `size` bytes, returning the new block id
    pub fn create(&self, size: Size, type_tag: &str) -> ClientResult<BlockId> {
        if type_tag.is_empty() || type_tag.chars().any(char::is_whitespace) {
            return Err(ClientError::Protocol(format!(
                "type tag must be one non-empty token, got {type_tag:?}"
            )));
        }
        let body = self.request(&Command::Create {
            size,
            type_tag: type_tag.to_string(),
        })?;
        let text = String::from_utf8_lossy(&body);
        text.parse::<BlockId>()
            .map_err(|_| ClientError::Protocol(format!("CREATE returned {text:?}, not an id")))
    }

    pub fn set(&self, id: BlockId, value: &[u8]) -> ClientResult<()> {
        self.request(&Command::Set {
            id,
            value: value.to_vec(),
        })
        .map(|_| ())
    }

    pub fn get(&self, id: BlockId) -> ClientResult<Vec<u8>> {
        self.request(&Command::Get { id })
    }

    pub fn inc_ref(&self, id: BlockId) -> ClientResult<()> {
        self.request(&Command::IncRef { id }).map(|_| ())
    }

    pub fn dec_ref(&self, id: BlockId) -> ClientResult<()> {
        self.request(&Command::DecRef { id }).map(|_| ())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("addr", &self.config.addr)
            .field("connected", &self.stream.lock().is_some())
            .finish()
    }
}

fn dial(config: &ClientConfig) -> io::Result<TcpStream> {
    let mut last_error = None;
    for addr in config.addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, config.connect_timeout) {
            Ok(stream) => {
                stream.set_read_timeout(Some(config.io_timeout))?;
                stream.set_write_timeout(Some(config.io_timeout))?;
                stream.set_nodelay(true)?;
                debug!(%addr, "Connected to memory server");
                return Ok(stream);
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{} resolved to no addresses", config.addr),
        )
    }))
}
