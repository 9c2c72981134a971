//! Pending-request table
//!
//! One bit per [`AudioId`], held in a `watch` channel so that clearing a bit
//! wakes every task waiting on it. The bit is the only correlation key: a
//! reply clears whatever request for that identifier is outstanding.
//!
//! Replies may land before anyone waits. `wait_cleared` checks the current
//! value before suspending, so a reply that races ahead of the wait is never
//! missed.

use audio_protocol::AudioId;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// The wait was cancelled while the bit was still set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("wait interrupted")]
pub struct Interrupted;

fn mask(id: AudioId) -> u32 {
    1 << id.as_raw()
}

/// Per-identifier pending bits plus a shared wake-up condition
#[derive(Debug)]
pub struct PendingTable {
    bits: watch::Sender<u32>,
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingTable {
    /// Create an empty table
    pub fn new() -> Self {
        let (bits, _) = watch::channel(0);
        Self { bits }
    }

    /// Set the bit for `id`, returning whether it was already set
    pub fn mark_pending(&self, id: AudioId) -> bool {
        let mut was_pending = false;
        self.bits.send_modify(|bits| {
            was_pending = *bits & mask(id) != 0;
            *bits |= mask(id);
        });
        trace!(%id, was_pending, "marked pending");
        was_pending
    }

    /// Clear the bit for `id` and wake any waiter
    ///
    /// Returns whether the bit was set. Clearing an already-clear bit is a
    /// harmless no-op, which is what a stale or duplicate reply hits.
    pub fn clear_and_wake(&self, id: AudioId) -> bool {
        let cleared = self.bits.send_if_modified(|bits| {
            if *bits & mask(id) != 0 {
                *bits &= !mask(id);
                true
            } else {
                false
            }
        });
        trace!(%id, cleared, "clear and wake");
        cleared
    }

    /// Whether a request for `id` is outstanding
    pub fn is_pending(&self, id: AudioId) -> bool {
        *self.bits.borrow() & mask(id) != 0
    }

    /// Wait until the bit for `id` is clear
    ///
    /// With `interrupt`, cancelling the token ends the wait with
    /// [`Interrupted`]. If the bit clears at the same moment the token fires,
    /// the clear wins. Callers that do get `Interrupted` must still re-check
    /// [`is_pending`](Self::is_pending): the reply may have landed between
    /// the interruption and the return.
    pub async fn wait_cleared(
        &self,
        id: AudioId,
        interrupt: Option<&CancellationToken>,
    ) -> Result<(), Interrupted> {
        let mut rx = self.bits.subscribe();
        let cleared = async move {
            // The sender lives in `self`, so the channel cannot close while we wait.
            let _ = rx.wait_for(|bits| *bits & mask(id) == 0).await;
        };

        match interrupt {
            Some(token) => tokio::select! {
                biased;
                _ = cleared => Ok(()),
                _ = token.cancelled() => Err(Interrupted),
            },
            None => {
                cleared.await;
                Ok(())
            }
        }
    }

    /// Set the bit for `id` and return a guard that clears it on drop
    pub fn guard(&self, id: AudioId) -> (PendingGuard<'_>, bool) {
        let was_pending = self.mark_pending(id);
        (
            PendingGuard {
                table: self,
                id,
                armed: true,
            },
            was_pending,
        )
    }
}

/// Clears a pending bit when dropped, unless disarmed
///
/// A query future that is dropped mid-wait must not leave its bit set, or the
/// next reply for that identifier would wake nobody and the next query would
/// see a stale pending bit.
#[derive(Debug)]
pub struct PendingGuard<'a> {
    table: &'a PendingTable,
    id: AudioId,
    armed: bool,
}

impl PendingGuard<'_> {
    /// The bit has been dealt with; do not touch it on drop
    pub fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed && self.table.clear_and_wake(self.id) {
            trace!(id = %self.id, "pending bit released by guard");
        }
    }
}
