/*!
 * Wire Protocol
 *
 * Text commands carried in length-prefixed frames.
 *
 * ```text
 * frame    = len:u32 (big-endian) payload[len]
 * request  = "CREATE <size> <type>" | "SET <id> <value>" | "GET <id>"
 *          | "INC_REF <id>" | "DEC_REF <id>"
 * response = "+" text | "-" "ERROR: ..."
 * ```
 */

mod command;
mod frame;
mod response;

pub use command::Command;
pub use frame::{read_frame, read_frame_blocking, write_frame, write_frame_blocking};
pub use response::{ErrorReply, Response};

use thiserror::Error;

/// Protocol operation result
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Malformed {verb} command: {reason}")]
    Malformed { verb: &'static str, reason: String },

    #[error("Frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Transport error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// The reply a server sends for a request it could not parse
    pub fn reply(&self) -> ErrorReply {
        match self {
            ProtocolError::UnknownCommand(_) => ErrorReply::UnknownCommand,
            _ => ErrorReply::Malformed,
        }
    }
}
