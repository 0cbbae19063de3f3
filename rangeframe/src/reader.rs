use std::future::Future;
use std::io::SeekFrom;
use std::ops::Range;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use parquet::arrow::ParquetRecordBatchStreamBuilder;
use parquet::arrow::arrow_reader::ArrowReaderOptions;
use parquet::arrow::async_reader::AsyncFileReader;
use parquet::errors::ParquetError;
use parquet::file::metadata::{ParquetMetaData, ParquetMetaDataReader};
use rangeframe_error::{RangeFrameExpect, RangeFrameResult, rangeframe_bail};
use rangeframe_io::{CancellationSignal, RangeReadable};

use crate::ParsedTable;

/// Trailing magic of a Parquet file.
pub const PARQUET_MAGIC: &[u8; 4] = b"PAR1";
/// Metadata length (little-endian u32) followed by the trailing magic.
const FOOTER_SIZE: usize = 8;
/// Leading magic plus footer: nothing smaller can be a Parquet file.
const MIN_FILE_SIZE: u64 = 12;

pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Decodes a whole columnar table out of a seekable byte source.
pub trait ColumnarTableReader {
    /// Read every row of every column. Any decoding failure is reported as
    /// [`FormatError`][rangeframe_error::RangeFrameError::FormatError]; failures of the
    /// underlying source keep their own kind.
    fn read_table(
        self,
        cancel: &CancellationSignal,
    ) -> impl Future<Output = RangeFrameResult<ParsedTable>> + Send;
}

/// A [`ColumnarTableReader`] for Parquet files.
///
/// The footer is located by seeking to the tail of the source, then column chunks are
/// fetched by position as the record batch stream asks for them.
#[derive(Debug)]
pub struct ParquetTableReader<R> {
    source: R,
    batch_size: usize,
}

impl<R: RangeReadable + Unpin + 'static> ParquetTableReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

impl<R: RangeReadable + Unpin + 'static> ColumnarTableReader for ParquetTableReader<R> {
    async fn read_table(self, cancel: &CancellationSignal) -> RangeFrameResult<ParsedTable> {
        let builder = ParquetRecordBatchStreamBuilder::new(ParquetRangeReader::new(self.source))
            .await?;
        let schema = builder.schema().clone();
        let num_rows = usize::try_from(builder.metadata().file_metadata().num_rows())?;
        log::trace!(
            "parquet footer: {} columns, {} rows, {} row groups",
            schema.fields().len(),
            num_rows,
            builder.metadata().num_row_groups()
        );

        let mut stream = builder.with_batch_size(self.batch_size).build()?;
        let mut batches = Vec::new();
        while let Some(batch) = stream.next().await {
            if cancel.is_cancelled() {
                rangeframe_bail!(Cancelled);
            }
            batches.push(batch?);
        }

        ParsedTable::from_batches(schema, &batches, num_rows)
    }
}

/// Adapts a [`RangeReadable`] to the async Parquet reader.
struct ParquetRangeReader<R> {
    source: R,
    metadata: Option<Arc<ParquetMetaData>>,
}

impl<R: RangeReadable> ParquetRangeReader<R> {
    fn new(source: R) -> Self {
        Self {
            source,
            metadata: None,
        }
    }
}

impl<R: RangeReadable + Unpin + 'static> AsyncFileReader for ParquetRangeReader<R> {
    fn get_bytes(&mut self, range: Range<u64>) -> BoxFuture<'_, parquet::errors::Result<Bytes>> {
        async move {
            let expected = range.end.saturating_sub(range.start);
            let bytes = self.source.read_byte_range(range.clone()).await?;
            if u64::try_from(bytes.len()).rangeframe_expect("usize fits in u64") < expected {
                return Err(ParquetError::EOF(format!(
                    "column data {}..{} extends past the end of a {} byte file",
                    range.start,
                    range.end,
                    self.source.size()
                )));
            }
            Ok(bytes)
        }
        .boxed()
    }

    fn get_metadata<'a>(
        &'a mut self,
        _options: Option<&'a ArrowReaderOptions>,
    ) -> BoxFuture<'a, parquet::errors::Result<Arc<ParquetMetaData>>> {
        async move {
            if let Some(metadata) = &self.metadata {
                return Ok(metadata.clone());
            }
            let metadata = Arc::new(read_metadata(&mut self.source).await?);
            self.metadata = Some(metadata.clone());
            Ok(metadata)
        }
        .boxed()
    }
}

/// Read and decode the footer metadata, tail first.
async fn read_metadata<R: RangeReadable>(source: &mut R) -> RangeFrameResult<ParquetMetaData> {
    let size = source.size();
    if size < MIN_FILE_SIZE {
        rangeframe_bail!(FormatError: "file of {} bytes is too small to be parquet", size);
    }

    let footer_len = u64::try_from(FOOTER_SIZE)?;
    source.seek(SeekFrom::End(-i64::try_from(footer_len)?))?;
    let mut footer = [0u8; FOOTER_SIZE];
    let read = source.read(&mut footer).await?;
    if read != FOOTER_SIZE || &footer[4..] != PARQUET_MAGIC {
        rangeframe_bail!(FormatError: "missing {} trailer", "PAR1");
    }

    let metadata_len = u64::from(u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]));
    if metadata_len + MIN_FILE_SIZE > size {
        rangeframe_bail!(
            FormatError: "footer declares {} bytes of metadata in a {} byte file",
            metadata_len,
            size
        );
    }

    source.seek(SeekFrom::End(-i64::try_from(metadata_len + footer_len)?))?;
    let mut buf = vec![0u8; usize::try_from(metadata_len)?];
    let read = source.read(&mut buf).await?;
    if read != buf.len() {
        rangeframe_bail!(FormatError: "footer metadata truncated to {} bytes", read);
    }

    Ok(ParquetMetaDataReader::decode_metadata(&buf)?)
}
