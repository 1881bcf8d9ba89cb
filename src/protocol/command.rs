/*!
 * Request Commands
 * Parsing and rendering of the five request verbs
 */

use super::{ProtocolError, ProtocolResult};
use crate::core::types::{BlockId, Size};

/// A parsed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { size: Size, type_tag: String },
    Set { id: BlockId, value: Vec<u8> },
    Get { id: BlockId },
    IncRef { id: BlockId },
    DecRef { id: BlockId },
}

impl Command {
    pub fn verb(&self) -> &'static str {
        match self {
            Command::Create { .. } => "CREATE",
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::IncRef { .. } => "INC_REF",
            Command::DecRef { .. } => "DEC_REF",
        }
    }

    /// Parse a request payload
    ///
    /// `SET` skips spaces before the id, then takes every byte after the
    /// space that follows the id as the value, spaces included.
    pub fn parse(payload: &[u8]) -> ProtocolResult<Self> {
        let (verb, rest) = match payload.iter().position(|&b| b == b' ') {
            Some(i) => (&payload[..i], Some(&payload[i + 1..])),
            None => (payload, None),
        };

        match verb {
            b"CREATE" => {
                let args = text("CREATE", rest)?;
                let mut parts = args.split_ascii_whitespace();
                let (Some(size), Some(type_tag), None) = (parts.next(), parts.next(), parts.next())
                else {
                    return Err(malformed("CREATE", "expected <size> <type>"));
                };
                let size = size
                    .parse::<Size>()
                    .map_err(|e| malformed("CREATE", format!("bad size {size:?}: {e}")))?;
                Ok(Command::Create {
                    size,
                    type_tag: type_tag.to_string(),
                })
            }
            b"SET" => {
                let rest = rest.ok_or_else(|| malformed("SET", "expected <id> <value>"))?;
                let start = rest.iter().position(|&b| b != b' ').unwrap_or(rest.len());
                let rest = &rest[start..];
                let Some(split) = rest.iter().position(|&b| b == b' ') else {
                    return Err(malformed("SET", "expected <id> <value>"));
                };
                let id = parse_id("SET", std::str::from_utf8(&rest[..split]).ok())?;
                Ok(Command::Set {
                    id,
                    value: rest[split + 1..].to_vec(),
                })
            }
            b"GET" => Ok(Command::Get {
                id: single_id("GET", rest)?,
            }),
            b"INC_REF" => Ok(Command::IncRef {
                id: single_id("INC_REF", rest)?,
            }),
            b"DEC_REF" => Ok(Command::DecRef {
                id: single_id("DEC_REF", rest)?,
            }),
            other => Err(ProtocolError::UnknownCommand(
                String::from_utf8_lossy(other).into_owned(),
            )),
        }
    }

    /// Render the request payload
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Command::Create { size, type_tag } => format!("CREATE {size} {type_tag}").into_bytes(),
            Command::Set { id, value } => {
                let mut out = format!("SET {id} ").into_bytes();
                out.extend_from_slice(value);
                out
            }
            Command::Get { id } => format!("GET {id}").into_bytes(),
            Command::IncRef { id } => format!("INC_REF {id}").into_bytes(),
            Command::DecRef { id } => format!("DEC_REF {id}").into_bytes(),
        }
    }
}

fn malformed(verb: &'static str, reason: impl Into<String>) -> ProtocolError {
    ProtocolError::Malformed {
        verb,
        reason: reason.into(),
    }
}

fn text<'a>(verb: &'static str, rest: Option<&'a [u8]>) -> ProtocolResult<&'a str> {
    let rest = rest.ok_or_else(|| malformed(verb, "missing arguments"))?;
    std::str::from_utf8(rest).map_err(|_| malformed(verb, "arguments are not UTF-8"))
}

fn parse_id(verb: &'static str, token: Option<&str>) -> ProtocolResult<BlockId> {
    let token = token.ok_or_else(|| malformed(verb, "id is not UTF-8"))?;
    token
        .parse::<BlockId>()
        .map_err(|e| malformed(verb, format!("bad id {token:?}: {e}")))
}

fn single_id(verb: &'static str, rest: Option<&[u8]>) -> ProtocolResult<BlockId> {
    let args = text(verb, rest)?;
    let mut parts = args.split_ascii_whitespace();
    match (parts.next(), parts.next()) {
        (Some(id), None) => parse_id(verb, Some(id)),
        _ => Err(malformed(verb, "expected <id>")),
    }
}
