/*!
 * Command Dispatch
 * Maps parsed commands onto the allocator and reference counter
 *
 * Socket-free: sessions feed it payloads, tests can call it directly.
 * Each command is one atomic step against the table; nothing here spans
 * two commands.
 */

use crate::memory::{Allocator, ReferenceCounter};
use crate::protocol::{Command, ErrorReply, Response};
use tracing::debug;

/// Execute one command
pub fn dispatch<M>(memory: &M, command: Command) -> Response
where
    M: Allocator + ReferenceCounter + ?Sized,
{
    match command {
        Command::Create { size, type_tag } => match memory.allocate(size, &type_tag) {
            Ok(id) => Response::id(id),
            Err(_) => Response::Error(ErrorReply::NoMemory),
        },
        Command::Set { id, value } => match memory.write(id, &value) {
            Ok(()) => Response::ok(),
            Err(_) => Response::Error(ErrorReply::InvalidIdOrSize),
        },
        Command::Get { id } => match memory.read(id) {
            Ok(bytes) => Response::value(bytes),
            Err(_) => Response::Error(ErrorReply::InvalidId),
        },
        Command::IncRef { id } => match memory.inc_ref(id) {
            Ok(_) => Response::ok(),
            Err(_) => Response::Error(ErrorReply::InvalidId),
        },
        Command::DecRef { id } => match memory.dec_ref(id) {
            Ok(_) => Response::ok(),
            Err(_) => Response::Error(ErrorReply::InvalidId),
        },
    }
}

/// Parse a request payload and execute it
///
/// Unparseable requests get an error reply and never reach the table.
pub fn handle_request<M>(memory: &M, payload: &[u8]) -> Response
where
    M: Allocator + ReferenceCounter + ?Sized,
{
    match Command::parse(payload) {
        Ok(command) => {
            let verb = command.verb();
            let response = dispatch(memory, command);
            debug!(verb, ok = response.is_success(), "Command handled");
            response
        }
        Err(e) => {
            debug!(error = %e, "Rejected request");
            Response::Error(e.reply())
        }
    }
}
