use std::io::SeekFrom;
use std::sync::Arc;
use std::time::Duration;

use rangeframe_error::{FetchStage, RangeFrameError, RangeFrameResult, rangeframe_err};
use rangeframe_io::{
    CancellationSignal, RangeReadable, RangeSource, RangeStore, RemoteObjectHandle,
};
use tokio::sync::watch;

use crate::{
    CoercionPolicy, ColumnarTableReader, DEFAULT_BATCH_SIZE, OutputFrame, ParquetTableReader,
    TableToFrameConverter,
};

/// Knobs of a single [`RemoteTableFetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub coercion: CoercionPolicy,
    /// Rows per decoded record batch.
    pub batch_size: usize,
    /// Abandon the fetch, reporting it as cancelled, once this much time has passed.
    pub timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            coercion: CoercionPolicy::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: None,
        }
    }
}

impl FetchOptions {
    pub fn with_coercion(mut self, coercion: CoercionPolicy) -> Self {
        self.coercion = coercion;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Turns a remote Parquet object into a single [`OutputFrame`] named after its key.
///
/// Each fetch opens its own [`RangeSource`]; nothing is shared between fetches besides the
/// store client, so concurrent fetches are independent.
#[derive(Debug, Clone)]
pub struct RemoteTableFetch {
    store: Arc<dyn RangeStore>,
    options: FetchOptions,
}

impl RemoteTableFetch {
    pub fn new(store: Arc<dyn RangeStore>) -> Self {
        Self {
            store,
            options: FetchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// Fetch `key` from `container` without a way to abort it.
    pub async fn fetch(&self, container: &str, key: &str) -> RangeFrameResult<Vec<OutputFrame>> {
        self.fetch_with_cancel(container, key, &CancellationSignal::new())
            .await
    }

    /// Fetch `key` from `container`, abandoning outstanding remote calls once `cancel` fires.
    ///
    /// Errors carry the key and the stage that failed as context; use
    /// [`RangeFrameError::root`] to inspect the underlying kind.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, cancel)))]
    pub async fn fetch_with_cancel(
        &self,
        container: &str,
        key: &str,
        cancel: &CancellationSignal,
    ) -> RangeFrameResult<Vec<OutputFrame>> {
        log::debug!("fetching {container}/{key}");
        let stage = StageTracker::new();
        let fetched = match self.options.timeout {
            None => self.fetch_frame(container, key, cancel, &stage).await,
            Some(timeout) => {
                match tokio::time::timeout(timeout, self.fetch_frame(container, key, cancel, &stage))
                    .await
                {
                    Ok(fetched) => fetched,
                    Err(_) => {
                        let millis = timeout.as_millis();
                        let stage = stage.current();
                        log::debug!("fetch of {container}/{key} timed out after {millis} ms ({stage})");
                        Err(stage_error(key, stage, rangeframe_err!(Cancelled))
                            .with_context(format!("timed out after {millis} ms")))
                    }
                }
            }
        };

        let frame = fetched?;
        log::debug!(
            "fetched {container}/{key}: {} fields, {} rows",
            frame.fields().len(),
            frame.num_rows()
        );
        Ok(vec![frame])
    }

    async fn fetch_frame(
        &self,
        container: &str,
        key: &str,
        cancel: &CancellationSignal,
        stage: &StageTracker,
    ) -> RangeFrameResult<OutputFrame> {
        stage.enter(FetchStage::Metadata);
        let handle = RemoteObjectHandle::resolve(self.store.clone(), container, key, cancel)
            .await
            .map_err(|err| metadata_error(key, err))?;

        stage.enter(FetchStage::Parse);
        let source = StagedSource {
            inner: RangeSource::new(handle).with_cancellation(cancel.clone()),
            stage: stage.clone(),
        };
        let table = ParquetTableReader::new(source)
            .with_batch_size(self.options.batch_size)
            .read_table(cancel)
            .await
            .map_err(|err| {
                let failed = stage_of(&err, FetchStage::Parse);
                stage_error(key, failed, err)
            })?;

        stage.enter(FetchStage::Convert);
        let frame = TableToFrameConverter::new(self.options.coercion)
            .convert(&table)
            .map_err(|err| stage_error(key, FetchStage::Convert, err))?;
        Ok(frame.with_name(key))
    }
}

/// Fetch `key` from `container` of `store` with default options.
pub async fn fetch(
    store: Arc<dyn RangeStore>,
    container: &str,
    key: &str,
) -> RangeFrameResult<Vec<OutputFrame>> {
    RemoteTableFetch::new(store).fetch(container, key).await
}

/// The step a fetch is in, still readable once the fetch itself has been dropped.
#[derive(Debug, Clone)]
struct StageTracker(Arc<watch::Sender<FetchStage>>);

impl StageTracker {
    fn new() -> Self {
        Self(Arc::new(watch::channel(FetchStage::Metadata).0))
    }

    fn enter(&self, stage: FetchStage) {
        self.0.send_replace(stage);
    }

    fn current(&self) -> FetchStage {
        *self.0.borrow()
    }
}

/// Marks the fetch as reading a byte range for as long as a read is outstanding.
#[derive(Debug)]
struct StagedSource<R> {
    inner: R,
    stage: StageTracker,
}

impl<R: RangeReadable> RangeReadable for StagedSource<R> {
    fn size(&self) -> u64 {
        self.inner.size()
    }

    fn position(&self) -> i64 {
        self.inner.position()
    }

    fn seek(&mut self, pos: SeekFrom) -> RangeFrameResult<i64> {
        self.inner.seek(pos)
    }

    async fn read_at(&self, buf: &mut [u8], offset: u64) -> RangeFrameResult<usize> {
        self.stage.enter(FetchStage::RangeRead);
        let read = self.inner.read_at(buf, offset).await;
        self.stage.enter(FetchStage::Parse);
        read
    }
}

fn stage_error(key: &str, stage: FetchStage, err: RangeFrameError) -> RangeFrameError {
    err.with_context(format!("fetch {key} ({stage})"))
}

/// Every metadata failure other than cancellation surfaces as an unavailable object.
fn metadata_error(key: &str, err: RangeFrameError) -> RangeFrameError {
    let err = match err.root() {
        RangeFrameError::ObjectUnavailable(..) | RangeFrameError::Cancelled => err,
        _ => rangeframe_err!(ObjectUnavailable: key, "{err}"),
    };
    stage_error(key, FetchStage::Metadata, err)
}

/// Failures of the byte source keep their own stage even when the reader reports them.
fn stage_of(err: &RangeFrameError, default: FetchStage) -> FetchStage {
    match err.root() {
        RangeFrameError::OutOfRange(..)
        | RangeFrameError::ShortRead(..)
        | RangeFrameError::ObjectUnavailable(..)
        | RangeFrameError::ObjectStore(_)
        | RangeFrameError::IOError(_) => FetchStage::RangeRead,
        _ => default,
    }
}
