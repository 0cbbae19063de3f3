#![allow(dead_code)]

use std::ops::Range;
use std::sync::{Arc, Mutex};

use arrow_array::{ArrayRef, Int64Array, RecordBatch, StringArray};
use arrow_schema::{Field, Schema};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream};
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use rangeframe::error::RangeFrameResult;
use rangeframe::io::{ByteStream, ObjectStoreContainers, RangeStore};
use tokio::sync::Notify;

pub const BUCKET: &str = "tables";

/// Write `columns` as a single Parquet file with row groups of at most `row_group_size`.
pub fn parquet_bytes(columns: Vec<(&str, ArrayRef)>, row_group_size: usize) -> Vec<u8> {
    let schema = Arc::new(Schema::new(
        columns
            .iter()
            .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
            .collect::<Vec<_>>(),
    ));
    let batch =
        RecordBatch::try_new(schema.clone(), columns.into_iter().map(|(_, a)| a).collect())
            .unwrap();

    let props = WriterProperties::builder()
        .set_max_row_group_size(row_group_size)
        .build();
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, Some(props)).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
    buf
}

/// The three-row `id`/`name` table used throughout the tests.
pub fn sales() -> Vec<u8> {
    parquet_bytes(
        vec![
            ("id", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
            (
                "name",
                Arc::new(StringArray::from(vec!["Alice", "Bob", "Charlie"])) as ArrayRef,
            ),
        ],
        1024,
    )
}

/// An empty table with the same schema as [`sales`].
pub fn empty_sales() -> Vec<u8> {
    parquet_bytes(
        vec![
            ("id", Arc::new(Int64Array::from(Vec::<i64>::new())) as ArrayRef),
            ("name", Arc::new(StringArray::from(Vec::<&str>::new())) as ArrayRef),
        ],
        1024,
    )
}

pub async fn memory_store(objects: Vec<(&str, Vec<u8>)>) -> Arc<InMemory> {
    let store = InMemory::new();
    for (key, bytes) in objects {
        store
            .put(&Path::from(key), PutPayload::from(bytes))
            .await
            .unwrap();
    }
    Arc::new(store)
}

pub async fn containers(objects: Vec<(&str, Vec<u8>)>) -> Arc<ObjectStoreContainers> {
    let store = memory_store(objects).await;
    Arc::new(ObjectStoreContainers::new().with_container(BUCKET, store))
}

/// Records every range request before passing it on.
#[derive(Debug)]
pub struct RecordingStore {
    inner: Arc<dyn RangeStore>,
    requests: Mutex<Vec<Range<u64>>>,
}

impl RecordingStore {
    pub fn new(inner: Arc<dyn RangeStore>) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<Range<u64>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RangeStore for RecordingStore {
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

/// Answers metadata queries but holds every range request open forever.
#[derive(Debug)]
pub struct StallingStore {
    inner: Arc<dyn RangeStore>,
    started: Arc<Notify>,
}

impl StallingStore {
    pub fn new(inner: Arc<dyn RangeStore>) -> Self {
        Self {
            inner,
            started: Arc::new(Notify::new()),
        }
    }

    pub fn started(&self) -> Arc<Notify> {
        self.started.clone()
    }
}

#[async_trait]
impl RangeStore for StallingStore {
    async fn head_size(&self, container: &str, key: &str) -> RangeFrameResult<u64> {
        self.inner.head_size(container, key).await
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

/// Holds every metadata query open forever.
#[derive(Debug)]
pub struct HangingHeadStore {
    inner: Arc<dyn RangeStore>,
    started: Arc<Notify>,
}

impl HangingHeadStore {
    pub fn new(inner: Arc<dyn RangeStore>) -> Self {
        Self {
            inner,
            started: Arc::new(Notify::new()),
        }
    }

    pub fn started(&self) -> Arc<Notify> {
        self.started.clone()
    }
}

#[async_trait]
impl RangeStore for HangingHeadStore {
    async fn head_size(&self, _container: &str, _key: &str) -> RangeFrameResult<u64> {
        self.started.notify_one();
        futures::future::pending().await
    }

    async fn get_range(
        &self,
        container: &str,
        key: &str,
        range: Range<u64>,
    ) -> RangeFrameResult<ByteStream> {
        self.inner.get_range(container, key, range).await
    }
}

/// Serves the footer faithfully but cuts every other response down to `keep` bytes.
#[derive(Debug)]
pub struct TruncatingStore {
    inner: Arc<dyn RangeStore>,
    keep: usize,
}

impl TruncatingStore {
    pub fn new(inner: Arc<dyn RangeStore>, keep: usize) -> Self {
        Self { inner, keep }
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
        let size = self.inner.head_size(container, key).await?;
        let stream = self.inner.get_range(container, key, range.clone()).await?;
        // Footer metadata and the 8 trailing bytes.
        if range.end + 8 >= size {
            return Ok(stream);
        }

        let mut bytes = stream.try_collect::<Vec<Bytes>>().await?.concat();
        bytes.truncate(self.keep);
        Ok(stream::once(async move { Ok(Bytes::from(bytes)) }).boxed())
    }
}
