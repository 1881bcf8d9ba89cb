/*!
 * Value Codecs
 * How typed values are laid out in a block
 *
 * - Numbers: canonical decimal text, space-padded to a fixed width
 * - `String`: UTF-8 bytes plus a NUL terminator, so a short value written
 *   over a longer one reads back cleanly
 * - `Vec<u8>`: raw bytes; reads return the whole block
 */

use super::{Client, ClientError, ClientResult};
use crate::core::types::Size;
use std::sync::Arc;

/// A type that can live in a remote block
pub trait Remote: Sized {
    /// Type tag sent with CREATE
    const TYPE_TAG: &'static str;

    /// Bytes to allocate for a payload of up to `capacity` encoded bytes
    fn allocation_size(capacity: Size) -> Size {
        capacity
    }

    fn encode(&self) -> Vec<u8>;

    /// Rebuild a value from a block's bytes
    ///
    /// Types holding handles bind them through `client`.
    fn decode(bytes: &[u8], client: &Arc<Client>) -> ClientResult<Self>;
}

/// A type whose encoding never exceeds `WIDTH` bytes
pub trait FixedWidth: Remote {
    const WIDTH: Size;
}

/// Numbers stored as decimal text
pub trait Decimal: Sized {
    /// Longest possible rendering
    const WIDTH: Size;

    fn to_decimal(&self) -> String;

    fn from_decimal(text: &str) -> Result<Self, String>;
}

/// Strip padding and anything past a NUL
pub(super) fn decimal_text(bytes: &[u8]) -> ClientResult<&str> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end])
        .map(str::trim)
        .map_err(|e| ClientError::Decode(format!("not UTF-8: {e}")))
}

fn padded(text: String, width: Size) -> Vec<u8> {
    format!("{text:<width$}").into_bytes()
}

macro_rules! decimal_integer {
    ($($ty:ty => $width:expr, $tag:expr;)*) => {$(
        impl Decimal for $ty {
            const WIDTH: Size = $width;

            fn to_decimal(&self) -> String {
                self.to_string()
            }

            fn from_decimal(text: &str) -> Result<Self, String> {
                text.parse::<$ty>().map_err(|e| format!("{text:?}: {e}"))
            }
        }

        impl Remote for $ty {
            const TYPE_TAG: &'static str = $tag;

            fn encode(&self) -> Vec<u8> {
                padded(self.to_decimal(), <$ty as Decimal>::WIDTH)
            }

            fn decode(bytes: &[u8], _client: &Arc<Client>) -> ClientResult<Self> {
                <$ty as Decimal>::from_decimal(decimal_text(bytes)?).map_err(ClientError::Decode)
            }
        }

        impl FixedWidth for $ty {
            const WIDTH: Size = <$ty as Decimal>::WIDTH;
        }
    )*};
}

decimal_integer! {
    i32 => 11, "i32";
    i64 => 20, "i64";
    u32 => 10, "u32";
    u64 => 20, "u64";
}

impl Decimal for f64 {
    /// `-2.2250738585072014e-308`
    const WIDTH: Size = 24;

    fn to_decimal(&self) -> String {
        // Exponent form keeps the width bounded and round-trips exactly
        format!("{self:e}")
    }

    fn from_decimal(text: &str) -> Result<Self, String> {
        text.parse::<f64>().map_err(|e| format!("{text:?}: {e}"))
    }
}

impl Remote for f64 {
    const TYPE_TAG: &'static str = "f64";

    fn encode(&self) -> Vec<u8> {
        padded(self.to_decimal(), <f64 as Decimal>::WIDTH)
    }

    fn decode(bytes: &[u8], _client: &Arc<Client>) -> ClientResult<Self> {
        <f64 as Decimal>::from_decimal(decimal_text(bytes)?).map_err(ClientError::Decode)
    }
}

impl FixedWidth for f64 {
    const WIDTH: Size = <f64 as Decimal>::WIDTH;
}

impl Remote for String {
    const TYPE_TAG: &'static str = "string";

    /// Room for the terminator
    fn allocation_size(capacity: Size) -> Size {
        capacity + 1
    }

    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len() + 1);
        bytes.extend_from_slice(self.as_bytes());
        bytes.push(0);
        bytes
    }

    fn decode(bytes: &[u8], _client: &Arc<Client>) -> ClientResult<Self> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        String::from_utf8(bytes[..end].to_vec())
            .map_err(|e| ClientError::Decode(format!("not UTF-8: {e}")))
    }
}

impl Remote for Vec<u8> {
    const TYPE_TAG: &'static str = "bytes";

    fn encode(&self) -> Vec<u8> {
        self.clone()
    }

    fn decode(bytes: &[u8], _client: &Arc<Client>) -> ClientResult<Self> {
        Ok(bytes.to_vec())
    }
}
