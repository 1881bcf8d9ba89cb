/*!
 * List Nodes
 * A value plus a link to the next node's block
 *
 * Encoded as `"<value> <next-id>"` with `-1` for no next node. Decoding
 * acquires a reference to the next block but does not read it; the next
 * node is fetched only when its handle is dereferenced.
 *
 * The link stored inside a block does not own a count. Whoever builds a
 * list keeps handles to the nodes it needs alive.
 */

use super::codec::{decimal_text, Decimal, FixedWidth, Remote};
use super::{Client, ClientError, ClientResult, RemoteHandle};
use crate::core::types::{BlockId, Size, UNBOUND_ID};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ListNode<T> {
    pub value: T,
    pub next: RemoteHandle<ListNode<T>>,
}

impl<T> ListNode<T> {
    /// A node with no successor
    pub fn new(value: T, client: &Arc<Client>) -> Self {
        Self {
            value,
            next: RemoteHandle::unbound(client),
        }
    }

    pub fn with_next(value: T, next: RemoteHandle<ListNode<T>>) -> Self {
        Self { value, next }
    }
}

impl<T: Decimal> Remote for ListNode<T> {
    const TYPE_TAG: &'static str = "list_node";

    fn encode(&self) -> Vec<u8> {
        let text = format!("{} {}", self.value.to_decimal(), self.next.raw_id());
        let width = <Self as FixedWidth>::WIDTH;
        format!("{text:<width$}").into_bytes()
    }

    fn decode(bytes: &[u8], client: &Arc<Client>) -> ClientResult<Self> {
        let text = decimal_text(bytes)?;
        let (value, next) = text
            .split_once(' ')
            .ok_or_else(|| ClientError::Decode(format!("list node {text:?}: missing link")))?;

        let value = T::from_decimal(value.trim()).map_err(ClientError::Decode)?;
        let next_id: i64 = next
            .trim()
            .parse()
            .map_err(|e| ClientError::Decode(format!("list node link {next:?}: {e}")))?;

        let next = match next_id {
            UNBOUND_ID => RemoteHandle::unbound(client),
            id if id >= 0 => RemoteHandle::acquire(client, id as BlockId)?,
            id => return Err(ClientError::Decode(format!("list node link {id} is not an id"))),
        };
        Ok(Self { value, next })
    }
}

impl<T: Decimal> FixedWidth for ListNode<T> {
    /// value, separator, then an id that may be `-1`
    const WIDTH: Size = T::WIDTH + 1 + 20;
}
