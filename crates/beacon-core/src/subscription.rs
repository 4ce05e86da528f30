//! Live views of the alert store.
//!
//! A [`Subscription`] carries the snapshot current at attach time plus a
//! [`SnapshotStream`] of later states. Each subscriber owns a single-slot
//! `watch` receiver: a slow subscriber only ever skips to the newest state and
//! never holds up writers.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::snapshot::Snapshot;

/// Receiver slot shared by a stream and its cancel handles.
type Slot = Arc<Mutex<Option<watch::Receiver<Snapshot>>>>;

/// Returned by [`AlertStore::subscribe`](crate::store::AlertStore::subscribe).
pub struct Subscription {
  /// The store's content when the subscription was attached.
  pub initial: Snapshot,
  /// Every later change, coalesced to the newest state.
  pub updates: SnapshotStream,
  /// Detaches `updates`.
  pub cancel:  CancelHandle,
}

impl Subscription {
  /// Attach to a publisher's receiver; its current value becomes `initial`.
  pub fn from_watch(mut rx: watch::Receiver<Snapshot>) -> Self {
    let initial = rx.borrow_and_update().clone();
    let slot: Slot = Arc::new(Mutex::new(Some(rx)));
    let (cancel_tx, cancelled) = watch::channel(false);
    Self {
      initial,
      updates: SnapshotStream { slot: Arc::clone(&slot), cancelled },
      cancel: CancelHandle { flag: Arc::new(cancel_tx), slot },
    }
  }
}

// ─── Stream ──────────────────────────────────────────────────────────────────

/// The update half of a [`Subscription`].
pub struct SnapshotStream {
  slot:      Slot,
  cancelled: watch::Receiver<bool>,
}

enum Next {
  Snapshot(Snapshot),
  Detached,
}

impl SnapshotStream {
  /// Wait for the next state of the store.
  ///
  /// Returns `None` once the subscription is cancelled or the store shuts
  /// down; the underlying receiver is released at that point and every later
  /// call returns `None` immediately.
  pub async fn next(&mut self) -> Option<Snapshot> {
    let mut slot = self.slot.lock().await;
    let rx = slot.as_mut()?;
    let next = tokio::select! {
      biased;
      () = wait_cancelled(&mut self.cancelled) => Next::Detached,
      changed = rx.changed() => match changed {
        Ok(()) => Next::Snapshot(rx.borrow_and_update().clone()),
        Err(_) => Next::Detached,
      },
    };
    match next {
      Next::Snapshot(snapshot) => Some(snapshot),
      Next::Detached => {
        *slot = None;
        None
      }
    }
  }

  /// `true` once the stream has ended.
  pub fn is_detached(&self) -> bool {
    *self.cancelled.borrow()
      || self.slot.try_lock().is_ok_and(|slot| slot.is_none())
  }
}

/// Resolves once the flag is set; never resolves if every handle is dropped
/// without cancelling.
async fn wait_cancelled(cancelled: &mut watch::Receiver<bool>) {
  while !*cancelled.borrow_and_update() {
    if cancelled.changed().await.is_err() {
      std::future::pending::<()>().await;
    }
  }
}

// ─── Cancellation ────────────────────────────────────────────────────────────

/// Detaches a [`SnapshotStream`]. Cheap to clone.
///
/// Cancelling is idempotent and remains safe after the store has shut down.
#[derive(Clone)]
pub struct CancelHandle {
  flag: Arc<watch::Sender<bool>>,
  slot: Slot,
}

impl CancelHandle {
  /// Detach the stream and release its receiver.
  ///
  /// The receiver is dropped here unless a `next()` call currently holds it,
  /// in which case that call wakes, drops it, and returns `None`.
  pub fn cancel(&self) {
    self.flag.send_replace(true);
    if let Ok(mut slot) = self.slot.try_lock() {
      slot.take();
    }
  }

  pub fn is_cancelled(&self) -> bool { *self.flag.borrow() }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use tokio::time::timeout;

  use super::*;

  fn publisher() -> (watch::Sender<Snapshot>, Subscription) {
    let (tx, rx) = watch::channel(Snapshot::default());
    (tx, Subscription::from_watch(rx))
  }

  fn at(revision: u64) -> Snapshot {
    Snapshot { revision, ..Snapshot::default() }
  }

  #[tokio::test]
  async fn coalesces_to_latest() {
    let (tx, mut sub) = publisher();
    tx.send_replace(at(1));
    tx.send_replace(at(2));
    tx.send_replace(at(3));

    let next = sub.updates.next().await.unwrap();
    assert_eq!(next.revision, 3);
    assert!(
      timeout(Duration::from_millis(50), sub.updates.next())
        .await
        .is_err(),
      "no further change was published"
    );
  }

  #[tokio::test]
  async fn cancel_ends_stream_and_is_idempotent() {
    let (tx, mut sub) = publisher();
    sub.cancel.cancel();
    assert_eq!(tx.receiver_count(), 0, "receiver released before any poll");
    sub.cancel.cancel();
    tx.send_replace(at(1));

    assert!(sub.updates.next().await.is_none());
    assert!(sub.updates.is_detached());
    assert_eq!(tx.receiver_count(), 0);
    assert!(sub.cancel.is_cancelled());
  }

  #[tokio::test]
  async fn cancel_wakes_pending_next() {
    let (tx, sub) = publisher();
    let Subscription { mut updates, cancel, .. } = sub;
    let waiter = tokio::spawn(async move {
      let got = updates.next().await;
      (got, updates)
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    cancel.cancel();
    let (got, updates) =
      timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    assert!(got.is_none());
    assert!(updates.is_detached());
    assert_eq!(tx.receiver_count(), 0);
  }

  #[tokio::test]
  async fn dropped_publisher_ends_stream() {
    let (tx, mut sub) = publisher();
    drop(tx);
    assert!(sub.updates.next().await.is_none());
    sub.cancel.cancel();
  }

  #[tokio::test]
  async fn dropping_handle_without_cancel_keeps_stream_alive() {
    let (tx, sub) = publisher();
    let Subscription { mut updates, cancel, .. } = sub;
    drop(cancel);
    tx.send_replace(at(7));
    assert_eq!(updates.next().await.unwrap().revision, 7);
  }
}
