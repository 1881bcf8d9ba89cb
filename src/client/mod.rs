/*!
 * Client Library
 *
 * Remote handles ("smart pointers") into a memory server's block table.
 * A handle holds only a block id; every access goes over the wire.
 *
 * ## Reference counting
 *
 * Each bound handle owns exactly one count on its block:
 * - `allocate` binds with the count of 1 the server set at creation
 * - `clone`/`try_clone`/`assign_from`/decoding a list link send INC_REF
 *   before binding
 * - `Drop`, `release`, and rebinding send one DEC_REF for the old id
 *
 * Blocks are reclaimed by the server's sweep once the count reaches zero.
 */

mod codec;
mod connection;
mod handle;
mod node;

pub use codec::{Decimal, FixedWidth, Remote};
pub use connection::{Client, ClientConfig};
pub use handle::RemoteHandle;
pub use node::ListNode;

use crate::protocol::{ErrorReply, ProtocolError};
use thiserror::Error;

/// Client operation result
pub type ClientResult<T> = Result<T, ClientError>;

/// Client errors
///
/// `Server` means the server answered and refused; `Transport` means it
/// could not be reached or the connection broke.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("Server refused: {0}")]
    Server(ErrorReply),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Handle is not bound to a block")]
    Unbound,

    #[error("Decode error: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    /// The server's reply, if this is a server-side refusal
    pub fn server_reply(&self) -> Option<&ErrorReply> {
        match self {
            ClientError::Server(reply) => Some(reply),
            _ => None,
        }
    }
}

impl From<ProtocolError> for ClientError {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Io(e) => ClientError::Transport(e),
            other => ClientError::Protocol(other.to_string()),
        }
    }
}
