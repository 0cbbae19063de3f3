use std::future::Future;
use std::io::SeekFrom;
use std::ops::Range;

use bytes::Bytes;
use rangeframe_error::{RangeFrameResult, rangeframe_bail};

/// A byte source supporting positioned reads and a logical cursor.
///
/// This is the only capability a columnar reader needs from its input. Implementations must
/// treat the underlying object as immutable for their whole lifetime, so two reads of the
/// same range always return the same bytes.
///
/// A single instance serves one reader at a time; it is not meant to be shared between
/// concurrent readers.
pub trait RangeReadable: Send + Sync {
    /// Total number of readable bytes.
    fn size(&self) -> u64;

    /// Current cursor position. May be negative or past [`size`][Self::size].
    fn position(&self) -> i64;

    /// Move the cursor and return its new absolute position.
    ///
    /// This never performs I/O and never validates the target against the object size: a
    /// position outside `[0, size)` only fails once it is read from. The only error is an
    /// arithmetic overflow of the position.
    fn seek(&mut self, pos: SeekFrom) -> RangeFrameResult<i64>;

    /// Read into `buf` starting at `offset`, independent of the cursor.
    ///
    /// The range `[offset, offset + buf.len())` is clipped to the end of the object and the
    /// number of bytes written is returned. Reading at or past the end yields
    /// [`OutOfRange`][rangeframe_error::RangeFrameError::OutOfRange], which plays the role
    /// of end-of-stream. A clipped range that cannot be filled completely yields
    /// [`ShortRead`][rangeframe_error::RangeFrameError::ShortRead].
    fn read_at(
        &self,
        buf: &mut [u8],
        offset: u64,
    ) -> impl Future<Output = RangeFrameResult<usize>> + Send;

    /// Read into `buf` at the cursor, advancing it by the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = RangeFrameResult<usize>> + Send {
        async move {
            let position = self.position();
            let Ok(offset) = u64::try_from(position) else {
                rangeframe_bail!("cannot read at negative position {position}");
            };
            let read = self.read_at(buf, offset).await?;
            self.seek(SeekFrom::Current(i64::try_from(read)?))?;
            Ok(read)
        }
    }

    /// Read the half-open `range` into a fresh buffer. The result is shorter than the range
    /// only if the range extends past the end of the object.
    fn read_byte_range(
        &self,
        range: Range<u64>,
    ) -> impl Future<Output = RangeFrameResult<Bytes>> + Send {
        async move {
            if range.end < range.start {
                rangeframe_bail!("invalid byte range {}..{}", range.start, range.end);
            }
            let mut buf = vec![0u8; usize::try_from(range.end - range.start)?];
            let read = self.read_at(&mut buf, range.start).await?;
            buf.truncate(read);
            Ok(Bytes::from(buf))
        }
    }
}
