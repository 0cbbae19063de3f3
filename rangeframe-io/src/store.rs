use std::fmt::Debug;
use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use rangeframe_error::RangeFrameResult;

use crate::CancellationSignal;

/// A stream of the bytes of one range request, in order.
pub type ByteStream = BoxStream<'static, RangeFrameResult<Bytes>>;

/// The remote collaborator: a store of sized, immutable objects grouped into containers.
///
/// Implementations signal a missing object or a failed metadata query as
/// [`ObjectUnavailable`][rangeframe_error::RangeFrameError::ObjectUnavailable]. Retries, if
/// any, are the implementation's business.
#[async_trait]
pub trait RangeStore: Debug + Send + Sync {
    /// Returns the total size in bytes of `key` within `container`.
    async fn head_size(&self, container: &str, key: &str) -> RangeFrameResult<u64>;

    /// Streams the bytes of `key` within `container` covered by the half-open `range`.
    ///
    /// A store may yield fewer bytes than requested; callers check the total.
    async fn get_range(
        &self,
        container: &str,
        key: &str,
        range: Range<u64>,
    ) -> RangeFrameResult<ByteStream>;
}

/// An object resolved against a [`RangeStore`], with its size fixed at resolution time.
#[derive(Debug, Clone)]
pub struct RemoteObjectHandle {
    store: Arc<dyn RangeStore>,
    container: String,
    key: String,
    size: u64,
}

impl RemoteObjectHandle {
    /// Create a handle for an object whose size is already known.
    pub fn new(
        store: Arc<dyn RangeStore>,
        container: impl Into<String>,
        key: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            store,
            container: container.into(),
            key: key.into(),
            size,
        }
    }

    /// Query the store for the object's size and build a handle for it.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(store, cancel)))]
    pub async fn resolve(
        store: Arc<dyn RangeStore>,
        container: &str,
        key: &str,
        cancel: &CancellationSignal,
    ) -> RangeFrameResult<Self> {
        let size = cancel.guard(store.head_size(container, key)).await?;
        log::trace!("resolved {container}/{key}: {size} bytes");
        Ok(Self::new(store, container, key, size))
    }

    pub fn store(&self) -> &Arc<dyn RangeStore> {
        &self.store
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}
