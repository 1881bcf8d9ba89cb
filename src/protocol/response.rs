/*!
 * Responses
 * One status byte (`+` success, `-` failure) followed by the reply text
 */

use super::{ProtocolError, ProtocolResult};
use crate::core::types::BlockId;

const SUCCESS: u8 = b'+';
const FAILURE: u8 = b'-';

/// Error replies a server can send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorReply {
    /// CREATE could not be satisfied
    NoMemory,
    /// SET on an unknown/free id or past the block's capacity
    InvalidIdOrSize,
    /// GET, INC_REF, or DEC_REF on an unknown/free id
    InvalidId,
    UnknownCommand,
    /// Known verb, unusable arguments
    Malformed,
    /// Anything this client version does not recognize
    Other(String),
}

impl ErrorReply {
    pub fn message(&self) -> &str {
        match self {
            ErrorReply::NoMemory => "ERROR: No memory available",
            ErrorReply::InvalidIdOrSize => "ERROR: Invalid ID or size",
            ErrorReply::InvalidId => "ERROR: Invalid ID",
            ErrorReply::UnknownCommand => "ERROR: Unknown command",
            ErrorReply::Malformed => "ERROR: Malformed command",
            ErrorReply::Other(message) => message,
        }
    }

    fn from_message(message: &str) -> Self {
        [
            ErrorReply::NoMemory,
            ErrorReply::InvalidIdOrSize,
            ErrorReply::InvalidId,
            ErrorReply::UnknownCommand,
            ErrorReply::Malformed,
        ]
        .into_iter()
        .find(|reply| reply.message() == message)
        .unwrap_or_else(|| ErrorReply::Other(message.to_string()))
    }
}

impl std::fmt::Display for ErrorReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// A reply to one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `<id>`, `OK`, or the raw bytes of a block
    Success(Vec<u8>),
    Error(ErrorReply),
}

impl Response {
    pub fn id(id: BlockId) -> Self {
        Response::Success(id.to_string().into_bytes())
    }

    pub fn ok() -> Self {
        Response::Success(b"OK".to_vec())
    }

    pub fn value(bytes: Vec<u8>) -> Self {
        Response::Success(bytes)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }

    pub fn encode(&self) -> Vec<u8> {
        match self {
            Response::Success(body) => {
                let mut out = Vec::with_capacity(body.len() + 1);
                out.push(SUCCESS);
                out.extend_from_slice(body);
                out
            }
            Response::Error(reply) => {
                let message = reply.message().as_bytes();
                let mut out = Vec::with_capacity(message.len() + 1);
                out.push(FAILURE);
                out.extend_from_slice(message);
                out
            }
        }
    }

    pub fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        match payload.split_first() {
            Some((&SUCCESS, body)) => Ok(Response::Success(body.to_vec())),
            Some((&FAILURE, body)) => Ok(Response::Error(ErrorReply::from_message(
                &String::from_utf8_lossy(body),
            ))),
            Some((other, _)) => Err(ProtocolError::MalformedResponse(format!(
                "unknown status byte 0x{other:02x}"
            ))),
            None => Err(ProtocolError::MalformedResponse("empty response".to_string())),
        }
    }
}
