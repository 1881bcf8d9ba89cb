/*!
 * Remote Handles
 * Typed, reference-counted proxies for server-side blocks
 */

use super::codec::{FixedWidth, Remote};
use super::{Client, ClientError, ClientResult};
use crate::core::types::{BlockId, Size, UNBOUND_ID};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

/// Handle to a block holding a `T`
///
/// A bound handle owns one reference count on its block and gives it back
/// when dropped, released, or rebound.
///
/// # Example
///
/// ```no_run
/// # use remote_memory::client::{Client, ClientConfig, RemoteHandle};
/// # fn example() -> remote_memory::client::ClientResult<()> {
/// let client = Client::connect(ClientConfig::new("127.0.0.1:50051"))?;
/// let a = RemoteHandle::<i32>::allocate(&client)?; // count 1
/// a.set(&42)?;
/// let b = a.try_clone()?;                           // count 2
/// assert_eq!(b.get()?, 42);
/// drop(a);                                          // count 1
/// drop(b);                                          // count 0, swept later
/// # Ok(())
/// # }
/// ```
pub struct RemoteHandle<T> {
    client: Arc<Client>,
    id: Option<BlockId>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> RemoteHandle<T> {
    /// A handle bound to nothing
    pub fn unbound(client: &Arc<Client>) -> Self {
        Self {
            client: Arc::clone(client),
            id: None,
            _marker: PhantomData,
        }
    }

    /// Start referencing an existing block: INC_REF, then bind
    ///
    /// On failure nothing is bound and nothing needs releasing.
    pub fn acquire(client: &Arc<Client>, id: BlockId) -> ClientResult<Self> {
        client.inc_ref(id)?;
        Ok(Self {
            client: Arc::clone(client),
            id: Some(id),
            _marker: PhantomData,
        })
    }

    /// Bound block id; never touches the network
    #[inline]
    pub fn id(&self) -> Option<BlockId> {
        self.id
    }

    /// Id as sent on the wire, `-1` when unbound
    #[inline]
    pub fn raw_id(&self) -> i64 {
        self.id.map_or(UNBOUND_ID, |id| id as i64)
    }

    #[inline]
    pub fn is_bound(&self) -> bool {
        self.id.is_some()
    }

    pub fn client(&self) -> &Arc<Client> {
        &self.client
    }

    /// Another handle to the same block, with its own count
    pub fn try_clone(&self) -> ClientResult<Self> {
        match self.id {
            Some(id) => Self::acquire(&self.client, id),
            None => Ok(Self::unbound(&self.client)),
        }
    }

    /// Rebind to whatever `other` references
    ///
    /// The new block is acquired before the old one is released, so
    /// assigning a handle to itself (or to a handle of the same block on
    /// the same client) never lets the count touch zero. A handle from
    /// another client carries its connection along; the old block is
    /// released through the connection it was acquired on.
    ///
    /// If acquiring fails this handle is left as it was. If releasing the
    /// old block fails the new binding stays and the error is returned.
    pub fn assign_from(&mut self, other: &Self) -> ClientResult<()> {
        if self.id == other.id && Arc::ptr_eq(&self.client, &other.client) {
            return Ok(());
        }
        if let Some(id) = other.id {
            other.client.inc_ref(id)?;
        }
        let previous = std::mem::replace(&mut self.id, other.id);
        let previous_client = std::mem::replace(&mut self.client, Arc::clone(&other.client));
        match previous {
            Some(old) => previous_client.dec_ref(old),
            None => Ok(()),
        }
    }

    /// Give the reference back now instead of on drop
    ///
    /// The handle is unbound afterwards even if the server refused.
    pub fn release(&mut self) -> ClientResult<()> {
        match self.id.take() {
            Some(id) => self.client.dec_ref(id),
            None => Ok(()),
        }
    }

    fn bound_id(&self) -> ClientResult<BlockId> {
        self.id.ok_or(ClientError::Unbound)
    }
}

impl<T: Remote> RemoteHandle<T> {
    /// Allocate a block for payloads of up to `capacity` encoded bytes
    pub fn allocate_with_capacity(client: &Arc<Client>, capacity: Size) -> ClientResult<Self> {
        let id = client.create(T::allocation_size(capacity), T::TYPE_TAG)?;
        // The server created the block with a count of 1; that count is ours
        Ok(Self {
            client: Arc::clone(client),
            id: Some(id),
            _marker: PhantomData,
        })
    }

    /// Write a value; the binding and counts are unchanged
    pub fn set(&self, value: &T) -> ClientResult<()> {
        let id = self.bound_id()?;
        self.client.set(id, &value.encode())
    }

    /// Read and decode the block's value
    pub fn get(&self) -> ClientResult<T> {
        let id = self.bound_id()?;
        let bytes = self.client.get(id)?;
        T::decode(&bytes, &self.client)
    }
}

impl<T: FixedWidth> RemoteHandle<T> {
    /// Allocate a block sized for any `T`
    pub fn allocate(client: &Arc<Client>) -> ClientResult<Self> {
        Self::allocate_with_capacity(client, T::WIDTH)
    }
}

impl<T> Clone for RemoteHandle<T> {
    /// INC_REF then bind
    ///
    /// `Clone` cannot fail, so a refused increment yields an unbound handle
    /// (and is logged); use `try_clone` to see the error.
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(handle) => handle,
            Err(e) => {
                warn!(id = ?self.id, error = %e, "Handle clone could not acquire a reference");
                Self::unbound(&self.client)
            }
        }
    }
}

impl<T> Drop for RemoteHandle<T> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            if let Err(e) = self.client.dec_ref(id) {
                warn!(id, error = %e, "Dropped handle could not release its reference");
            }
        }
    }
}

impl<T> fmt::Debug for RemoteHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteHandle")
            .field("type", &std::any::type_name::<T>())
            .field("id", &self.id)
            .finish()
    }
}
