//! Single in-flight request slot for the one-shot clients.

use crate::transport::{Completion, TransportEvent};
use futures_core::Stream;
use futures_util::StreamExt;
use parking_lot::Mutex;
use pcore::Error;
use tokio_util::sync::CancellationToken;

/// Holds the cancellation token of the request in flight, if any.
#[derive(Debug, Default)]
pub(crate) struct Slot {
    current: Mutex<Option<CancellationToken>>,
}

impl Slot {
    /// Claim the slot, or fail with [`Error::Busy`].
    pub(crate) fn acquire(&self) -> Result<Claim<'_>, Error> {
        let mut current = self.current.lock();
        if current.is_some() {
            return Err(Error::Busy);
        }
        let token = CancellationToken::new();
        *current = Some(token.clone());
        Ok(Claim { slot: self, token })
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Cancel the request in flight. Returns `false` when idle.
    pub(crate) fn cancel(&self) -> bool {
        match self.current.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Releases the slot on drop.
pub(crate) struct Claim<'a> {
    slot: &'a Slot,
    pub(crate) token: CancellationToken,
}

impl Claim<'_> {
    /// Drain `events` to the terminal completion, then classify it.
    pub(crate) async fn finish(
        &self,
        events: impl Stream<Item = TransportEvent>,
    ) -> Result<String, Error> {
        let mut events = std::pin::pin!(events);
        let mut completion = None;
        while let Some(event) = events.next().await {
            if let TransportEvent::Complete(done) = event {
                completion = Some(done);
                break;
            }
        }

        if self.token.is_cancelled() {
            return Err(Error::Cancelled);
        }
        completion
            .unwrap_or_else(|| Completion::failed("transport closed without completing"))
            .into_result()
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        *self.slot.current.lock() = None;
    }
}
