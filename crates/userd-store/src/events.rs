//! Shared poll loop behind [`UserStore::events`](crate::UserStore::events).

use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::StoreError;
use crate::record::OutboxEntry;
use crate::traits::UserStore;

/// One step of the event stream: a claimed outbox entry or a store failure.
pub type EventResult = Result<OutboxEntry, StoreError>;

/// Spawn the claim-poll loop and return its receiving end.
///
/// Each iteration claims at most one outbox head via
/// [`claim_next`](UserStore::claim_next), forwards it (or the error) to the
/// receiver, and sleeps a uniformly random interval in
/// `[min_interval, max_interval)`. The loop exits when the token is
/// cancelled or the receiver is dropped.
pub(crate) fn spawn_event_stream<S>(
    store: S,
    cancel: CancellationToken,
    min_interval: Duration,
    max_interval: Duration,
    retry_interval: Duration,
) -> mpsc::Receiver<EventResult>
where
    S: UserStore + Clone + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(async move {
        loop {
            let step = tokio::select! {
                _ = cancel.cancelled() => break,
                step = store.claim_next(retry_interval) => step,
            };
            match step {
                Ok(Some(entry)) => {
                    if tx.send(Ok(entry)).await.is_err() {
                        break;
                    }
                }
                // Nothing claimable right now; poll again after the jitter.
                Ok(None) => {}
                Err(err) => {
                    if tx.send(Err(err)).await.is_err() {
                        break;
                    }
                }
            }
            let wait = rand::thread_rng().gen_range(min_interval..max_interval);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }
        }
        debug!("outbox event stream closed");
    });
    rx
}
