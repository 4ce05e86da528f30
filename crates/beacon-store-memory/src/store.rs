//! [`MemoryStore`], the in-process implementation of [`AlertStore`].

use std::{collections::HashMap, sync::Arc, time::Duration};

use beacon_core::{
  Error, Result,
  alert::AlertRecord,
  session::SessionId,
  snapshot::{AlertMap, Mutation, Snapshot},
  store::AlertStore,
  subscription::Subscription,
};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

// ─── State ───────────────────────────────────────────────────────────────────

/// Everything behind the store's single lock.
struct State {
  alerts:    Arc<AlertMap>,
  /// Server-side time of the most recent put per key; drives expiry.
  last_put:  HashMap<SessionId, DateTime<Utc>>,
  revision:  u64,
  /// `None` once the store has shut down.
  publisher: Option<watch::Sender<Snapshot>>,
}

impl State {
  fn snapshot(&self) -> Snapshot {
    Snapshot::new(self.revision, Arc::clone(&self.alerts))
  }

  fn ensure_open(&self) -> Result<&watch::Sender<Snapshot>> {
    self.publisher.as_ref().ok_or(Error::Closed)
  }

  /// Bump the revision and hand the new state to every subscriber.
  fn publish(&mut self) {
    self.revision += 1;
    let snapshot = self.snapshot();
    if let Some(publisher) = &self.publisher {
      publisher.send_replace(snapshot);
    }
  }

  fn remove(&mut self, id: &SessionId) -> Mutation {
    self.last_put.remove(id);
    if !self.alerts.contains_key(id) {
      return Mutation::Absent;
    }
    Arc::make_mut(&mut self.alerts).remove(id);
    self.publish();
    Mutation::Removed
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// The live alert mapping plus its notification engine.
///
/// Every operation takes one lock, and a new snapshot is published before the
/// lock is released, so subscribers observe revisions in order and never see
/// a half-applied write. Publishing overwrites a single slot per subscriber
/// and never waits.
///
/// Cloning is cheap; clones share the same mapping.
#[derive(Clone)]
pub struct MemoryStore {
  inner: Arc<Mutex<State>>,
}

impl Default for MemoryStore {
  fn default() -> Self { Self::new() }
}

impl MemoryStore {
  /// An empty store at revision 0.
  pub fn new() -> Self {
    let (publisher, _) = watch::channel(Snapshot::default());
    Self {
      inner: Arc::new(Mutex::new(State {
        alerts:    Arc::new(AlertMap::new()),
        last_put:  HashMap::new(),
        revision:  0,
        publisher: Some(publisher),
      })),
    }
  }

  /// Close the notification engine.
  ///
  /// Open streams end, later writes and subscriptions fail with
  /// [`Error::Closed`], and reads keep returning the final state. Calling it
  /// again is a no-op.
  pub async fn shutdown(&self) {
    let mut state = self.inner.lock().await;
    if let Some(publisher) = state.publisher.take() {
      info!(
        revision = state.revision,
        alerts = state.alerts.len(),
        subscribers = publisher.receiver_count(),
        "alert store shut down"
      );
    }
  }

  pub async fn is_closed(&self) -> bool {
    self.inner.lock().await.publisher.is_none()
  }

  /// Number of attached, not yet released subscription streams.
  pub async fn subscriber_count(&self) -> usize {
    self
      .inner
      .lock()
      .await
      .publisher
      .as_ref()
      .map_or(0, watch::Sender::receiver_count)
  }

  /// Remove every record whose most recent put happened before `cutoff`.
  ///
  /// All removals land in one revision. Returns the expired ids, sorted.
  pub async fn expire_older_than(
    &self,
    cutoff: DateTime<Utc>,
  ) -> Result<Vec<SessionId>> {
    let mut guard = self.inner.lock().await;
    let state = &mut *guard;
    state.ensure_open()?;

    let mut stale: Vec<SessionId> = state
      .last_put
      .iter()
      .filter(|(_, at)| **at < cutoff)
      .map(|(id, _)| id.clone())
      .collect();
    if stale.is_empty() {
      return Ok(stale);
    }
    stale.sort();

    let alerts = Arc::make_mut(&mut state.alerts);
    for id in &stale {
      alerts.remove(id);
      state.last_put.remove(id);
      warn!(session_id = %id, "expired alert with no put since {cutoff}");
    }
    state.publish();
    Ok(stale)
  }

  /// Remove every record that has not been put for longer than `max_age`.
  pub async fn expire_idle(&self, max_age: Duration) -> Result<Vec<SessionId>> {
    let cutoff = TimeDelta::from_std(max_age)
      .ok()
      .and_then(|age| Utc::now().checked_sub_signed(age));
    match cutoff {
      Some(cutoff) => self.expire_older_than(cutoff).await,
      None => Ok(Vec::new()),
    }
  }
}

impl AlertStore for MemoryStore {
  type Error = Error;

  async fn put(&self, id: SessionId, record: AlertRecord) -> Result<Mutation> {
    let record = record.for_session(&id)?;
    let mut state = self.inner.lock().await;
    state.ensure_open()?;

    if record.is_clearing() {
      let mutation = state.remove(&id);
      debug!(session_id = %id, ?mutation, revision = state.revision, "alert cleared as safe");
      return Ok(mutation);
    }

    // An identical put still counts as a sign of life for expiry.
    state.last_put.insert(id.clone(), Utc::now());
    let mutation = match state.alerts.get(&id) {
      None => Mutation::Created,
      Some(existing) if *existing == record => Mutation::Unchanged,
      Some(_) => Mutation::Replaced,
    };
    if mutation.changed() {
      Arc::make_mut(&mut state.alerts).insert(id.clone(), record);
      state.publish();
    }
    debug!(session_id = %id, ?mutation, revision = state.revision, "alert put");
    Ok(mutation)
  }

  async fn delete(&self, id: SessionId) -> Result<Mutation> {
    let mut state = self.inner.lock().await;
    state.ensure_open()?;
    let mutation = state.remove(&id);
    debug!(session_id = %id, ?mutation, revision = state.revision, "alert deleted");
    Ok(mutation)
  }

  async fn get(&self, id: SessionId) -> Result<Option<AlertRecord>> {
    Ok(self.inner.lock().await.alerts.get(&id).cloned())
  }

  async fn snapshot(&self) -> Result<Snapshot> {
    Ok(self.inner.lock().await.snapshot())
  }

  async fn subscribe(&self) -> Result<Subscription> {
    let state = self.inner.lock().await;
    let subscription = Subscription::from_watch(state.ensure_open()?.subscribe());
    debug!(revision = subscription.initial.revision, "subscriber attached");
    Ok(subscription)
  }
}
