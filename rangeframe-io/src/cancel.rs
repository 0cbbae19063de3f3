use std::future::{self, Future};
use std::sync::Arc;

use rangeframe_error::{RangeFrameResult, rangeframe_bail, rangeframe_err};
use tokio::sync::watch;

/// A caller-owned abort switch shared by every remote call of a fetch.
///
/// Clones observe the same switch. Once [`cancel`][Self::cancel] is called the signal stays
/// fired; any call raced through [`guard`][Self::guard] is dropped and resolves to
/// [`Cancelled`][rangeframe_error::RangeFrameError::Cancelled].
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationSignal {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once the signal has fired.
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        let fired = receiver.wait_for(|cancelled| *cancelled).await.map(|_| ());
        if fired.is_err() {
            // We hold a sender ourselves, so the channel cannot close underneath us.
            future::pending::<()>().await;
        }
    }

    /// Run `fut` unless the signal fires first, in which case `fut` is dropped mid-flight.
    pub async fn guard<F, T>(&self, fut: F) -> RangeFrameResult<T>
    where
        F: Future<Output = RangeFrameResult<T>>,
    {
        if self.is_cancelled() {
            rangeframe_bail!(Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(rangeframe_err!(Cancelled)),
            result = fut => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future;

    use super::*;

    #[tokio::test]
    async fn guard_passes_through_when_not_cancelled() {
        let signal = CancellationSignal::new();
        let value = signal.guard(async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn guard_rejects_after_cancel() {
        let signal = CancellationSignal::new();
        signal.clone().cancel();
        assert!(signal.is_cancelled());

        let err = signal.guard(async { Ok(()) }).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn guard_abandons_outstanding_future() {
        let signal = CancellationSignal::new();
        let remote = signal.clone();

        let (result, ()) = tokio::join!(
            signal.guard(future::pending::<RangeFrameResult<()>>()),
            async move { remote.cancel() }
        );

        assert!(result.unwrap_err().is_cancelled());
    }
}
