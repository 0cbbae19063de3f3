use std::ops::Range;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use hashbrown::HashMap;
use object_store::path::Path;
use object_store::{GetOptions, GetRange, ObjectStore};
use rangeframe_error::{RangeFrameError, RangeFrameResult, rangeframe_err};

use crate::{ByteStream, RangeStore};

/// A [`RangeStore`] over a set of [`ObjectStore`]s, one per named container (bucket).
///
/// The object store clients are built once, upstream, and injected here.
#[derive(Debug, Default, Clone)]
pub struct ObjectStoreContainers {
    containers: HashMap<String, Arc<dyn ObjectStore>>,
}

impl ObjectStoreContainers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `store` as the backing store for `container`.
    pub fn with_container(
        mut self,
        container: impl Into<String>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        self.register(container, store);
        self
    }

    /// Register `store` as the backing store for `container`, returning any previous one.
    pub fn register(
        &mut self,
        container: impl Into<String>,
        store: Arc<dyn ObjectStore>,
    ) -> Option<Arc<dyn ObjectStore>> {
        self.containers.insert(container.into(), store)
    }

    /// The object store backing `container`.
    pub fn container(&self, container: &str) -> RangeFrameResult<&Arc<dyn ObjectStore>> {
        self.containers
            .get(container)
            .ok_or_else(|| rangeframe_err!("unknown container {container}"))
    }
}

/// A missing object is reported as unavailable no matter which operation noticed it.
fn object_error(key: &str, err: object_store::Error) -> RangeFrameError {
    match err {
        object_store::Error::NotFound { .. } => {
            rangeframe_err!(ObjectUnavailable: key, "object not found")
        }
        other => RangeFrameError::from(other),
    }
}

#[async_trait]
impl RangeStore for ObjectStoreContainers {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn head_size(&self, container: &str, key: &str) -> RangeFrameResult<u64> {
        let store = self
            .container(container)
            .map_err(|err| rangeframe_err!(ObjectUnavailable: key, "{err}"))?;
        let location = Path::from(key);
        log::trace!("head {container}/{location}");

        store
            .head(&location)
            .await
            .map(|meta| meta.size)
            .map_err(|err| match object_error(key, err) {
                unavailable @ RangeFrameError::ObjectUnavailable(..) => unavailable,
                other => rangeframe_err!(ObjectUnavailable: key, "metadata query failed: {other}"),
            })
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    async fn get_range(
        &self,
        container: &str,
        key: &str,
        range: Range<u64>,
    ) -> RangeFrameResult<ByteStream> {
        let store = self.container(container)?;
        let location = Path::from(key);

        let response = store
            .get_opts(
                &location,
                GetOptions {
                    range: Some(GetRange::Bounded(range)),
                    ..Default::default()
                },
            )
            .await
            .map_err(|err| object_error(key, err))?;

        Ok(response.into_stream().map_err(RangeFrameError::from).boxed())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use futures::TryStreamExt;
    use object_store::memory::InMemory;
    use object_store::path::Path;
    use object_store::{ObjectStore, PutPayload};
    use rangeframe_error::RangeFrameError;

    use super::*;

    async fn containers() -> ObjectStoreContainers {
        let store = InMemory::new();
        store
            .put(&Path::from("nested/obj.bin"), PutPayload::from_static(b"abcdefgh"))
            .await
            .unwrap();
        ObjectStoreContainers::new().with_container("bucket", Arc::new(store))
    }

    #[tokio::test]
    async fn head_reports_object_size() {
        let containers = containers().await;
        assert_eq!(containers.head_size("bucket", "nested/obj.bin").await.unwrap(), 8);
    }

    #[tokio::test]
    async fn head_of_missing_object_is_unavailable() {
        let containers = containers().await;
        let err = containers.head_size("bucket", "missing.bin").await.unwrap_err();
        assert!(matches!(err, RangeFrameError::ObjectUnavailable(..)));
    }

    #[tokio::test]
    async fn unknown_container_is_rejected() {
        let containers = containers().await;
        let err = containers.head_size("other", "nested/obj.bin").await.unwrap_err();
        assert!(matches!(err, RangeFrameError::ObjectUnavailable(..)));
    }

    #[tokio::test]
    async fn get_range_streams_requested_bytes() {
        let containers = containers().await;
        let chunks: Vec<Bytes> = containers
            .get_range("bucket", "nested/obj.bin", 2..5)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();

        assert_eq!(chunks.concat(), b"cde");
    }
}
