use std::io::SeekFrom;
use std::sync::Arc;

use futures::StreamExt;
use rangeframe_error::{RangeFrameResult, rangeframe_bail, rangeframe_err};

use crate::{CancellationSignal, RangeReadable, RangeStore, RemoteObjectHandle};

/// A seekable view of one remote object.
///
/// Every [`read_at`][RangeReadable::read_at] turns into exactly one range request against
/// the store; nothing is cached or read ahead. The cursor is purely local state, so a
/// `RangeSource` belongs to a single read session and is deliberately not `Clone`.
#[derive(Debug)]
pub struct RangeSource {
    handle: RemoteObjectHandle,
    pos: i64,
    cancel: CancellationSignal,
}

impl RangeSource {
    /// Create a source positioned at offset 0.
    pub fn new(handle: RemoteObjectHandle) -> Self {
        Self {
            handle,
            pos: 0,
            cancel: CancellationSignal::default(),
        }
    }

    /// Resolve the object's size and open a source over it.
    pub async fn open(
        store: Arc<dyn RangeStore>,
        container: &str,
        key: &str,
        cancel: CancellationSignal,
    ) -> RangeFrameResult<Self> {
        let handle = RemoteObjectHandle::resolve(store, container, key, &cancel).await?;
        Ok(Self::new(handle).with_cancellation(cancel))
    }

    /// Abandon outstanding range requests once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationSignal) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn handle(&self) -> &RemoteObjectHandle {
        &self.handle
    }

    pub fn key(&self) -> &str {
        self.handle.key()
    }

    /// Request `[offset, offset + target.len())` and fill all of `target` from the response.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, target)))]
    async fn fetch_exact(&self, target: &mut [u8], offset: u64) -> RangeFrameResult<usize> {
        let expected = u64::try_from(target.len())?;
        let end = offset + expected;
        log::trace!(
            "range read {}/{} bytes={}-{}",
            self.handle.container(),
            self.handle.key(),
            offset,
            end - 1
        );

        let mut stream = self
            .handle
            .store()
            .get_range(self.handle.container(), self.handle.key(), offset..end)
            .await?;

        let mut filled = 0;
        while filled < target.len() {
            let Some(chunk) = stream.next().await else {
                break;
            };
            let chunk = chunk?;
            let take = chunk.len().min(target.len() - filled);
            target[filled..filled + take].copy_from_slice(&chunk[..take]);
            filled += take;
        }

        if filled < target.len() {
            rangeframe_bail!(ShortRead: self.handle.key(), offset, expected, u64::try_from(filled)?);
        }
        Ok(filled)
    }
}

impl RangeReadable for RangeSource {
    fn size(&self) -> u64 {
        self.handle.size()
    }

    fn position(&self) -> i64 {
        self.pos
    }

    fn seek(&mut self, pos: SeekFrom) -> RangeFrameResult<i64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => Some(i64::try_from(offset)?),
            SeekFrom::Current(delta) => self.pos.checked_add(delta),
            SeekFrom::End(delta) => i64::try_from(self.handle.size())?.checked_add(delta),
        };
        self.pos = new_pos.ok_or_else(|| rangeframe_err!("seek from position {} overflows", self.pos))?;
        Ok(self.pos)
    }

    async fn read_at(&self, buf: &mut [u8], offset: u64) -> RangeFrameResult<usize> {
        let size = self.handle.size();
        if offset >= size {
            rangeframe_bail!(OutOfRange: offset, size);
        }
        if buf.is_empty() {
            return Ok(0);
        }

        let available = usize::try_from(size - offset).unwrap_or(usize::MAX);
        let len = buf.len().min(available);
        self.cancel.guard(self.fetch_exact(&mut buf[..len], offset)).await
    }
}
