use std::ops::Range;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use hashbrown::HashMap;
use rangeframe_error::{RangeFrameResult, rangeframe_err};
use tokio::sync::Notify;

use crate::{ByteStream, RangeStore};

/// Objects held in memory, keyed by `container/key`.
#[derive(Debug, Default)]
pub struct StaticStore {
    objects: HashMap<String, Bytes>,
}

impl StaticStore {
    pub fn with_object(mut self, container: &str, key: &str, data: impl Into<Bytes>) -> Self {
        self.objects.insert(format!("{container}/{key}"), data.into());
        self
    }

    fn object(&self, container: &str, key: &str) -> RangeFrameResult<&Bytes> {
        self.objects
            .get(&format!("{container}/{key}"))
            .ok_or_else(|| rangeframe_err!(ObjectUnavailable: key, "not found"))
    }
}

#[async_trait]
impl RangeStore for StaticStore {
    async fn head_size(&self, container: &str, key: &str) -> RangeFrameResult<u64> {
        Ok(self.object(container, key)?.len() as u64)
    }

    async fn get_range(
        &self,
        container: &str,
        key: &str,
        range: Range<u64>,
    ) -> RangeFrameResult<ByteStream> {
        let data = self.object(container, key)?;
        let end = usize::try_from(range.end).unwrap().min(data.len());
        let slice = data.slice(usize::try_from(range.start).unwrap()..end);
        // Split the response so readers have to stitch chunks together.
        let mid = slice.len() / 2;
        let chunks = vec![Ok(slice.slice(..mid)), Ok(slice.slice(mid..))];
        Ok(stream::iter(chunks).boxed())
    }
}

/// `bucket/digits` containing `0123456789`.
pub fn digits_store() -> Arc<dyn RangeStore> {
    Arc::new(StaticStore::default().with_object("bucket", "digits", "0123456789"))
}

/// Records every range request before forwarding it.
#[derive(Debug)]
pub struct CountingStore {
    inner: Arc<dyn RangeStore>,
    requests: Mutex<Vec<Range<u64>>>,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn RangeStore>) -> Self {
        Self {
            inner,
            requests: Mutex::default(),
        }
    }

    pub fn range_requests(&self) -> Vec<Range<u64>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RangeStore for CountingStore {
    async fn head_size(&self, container: &str, key: &str) -> RangeFrameResult<u64> {
        self.inner.head_size(container, key).await
    }

    async fn get_range(
        &self,
        container: &str,
        key: &str,
        range: Range<u64>,
    ) -> RangeFrameResult<ByteStream> {
        self.requests.lock().unwrap().push(range.clone());
        self.inner.get_range(container, key, range).await
    }
}

/// Returns at most `limit` bytes of any range.
#[derive(Debug)]
pub struct TruncatingStore {
    inner: Arc<dyn RangeStore>,
    limit: usize,
}

impl TruncatingStore {
    pub fn new(inner: Arc<dyn RangeStore>, limit: usize) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl RangeStore for TruncatingStore {
    async fn head_size(&self, container: &str, key: &str) -> RangeFrameResult<u64> {
        self.inner.head_size(container, key).await
    }

    async fn get_range(
        &self,
        container: &str,
        key: &str,
        range: Range<u64>,
    ) -> RangeFrameResult<ByteStream> {
        let end = range.end.min(range.start + self.limit as u64);
        self.inner.get_range(container, key, range.start..end).await
    }
}

/// Never answers a range request, announcing each one through [`BlockingStore::started`].
#[derive(Debug, Default)]
pub struct BlockingStore {
    started: Arc<Notify>,
}

impl BlockingStore {
    pub fn started(&self) -> Arc<Notify> {
        self.started.clone()
    }
}

#[async_trait]
impl RangeStore for BlockingStore {
    async fn head_size(&self, _container: &str, _key: &str) -> RangeFrameResult<u64> {
        Ok(10)
    }

    async fn get_range(
        &self,
        _container: &str,
        _key: &str,
        _range: Range<u64>,
    ) -> RangeFrameResult<ByteStream> {
        self.started.notify_one();
        futures::future::pending().await
    }
}
