//! Handler for `GET /stream`, the live dashboard feed.
//!
//! Each connection is one subscription. The first `snapshot` event carries the
//! state at attach time; every later event carries the whole mapping after a
//! change, with the revision as the event id. Disconnecting drops the
//! subscription.

use axum::{
  extract::State,
  response::sse::{Event, KeepAlive, Sse},
};
use beacon_core::{
  snapshot::Snapshot,
  store::AlertStore,
  subscription::Subscription,
};
use futures::{Stream, StreamExt as _, future, stream};

use crate::{ApiState, error::ApiError};

/// `GET /stream`
pub async fn handler<S>(
  State(state): State<ApiState<S>>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError>
where
  S: AlertStore,
{
  let Subscription { initial, updates, .. } =
    state.store.subscribe().await.map_err(ApiError::store)?;
  tracing::debug!(revision = initial.revision, "snapshot stream opened");

  let later = stream::unfold(updates, |mut updates| async move {
    updates.next().await.map(|snapshot| (snapshot, updates))
  });
  let events = stream::once(future::ready(initial))
    .chain(later)
    .map(|snapshot| snapshot_event(&snapshot));

  Ok(
    Sse::new(events)
      .keep_alive(KeepAlive::new().interval(state.config.sse_keep_alive)),
  )
}

fn snapshot_event(snapshot: &Snapshot) -> Result<Event, axum::Error> {
  Event::default()
    .event("snapshot")
    .id(snapshot.revision.to_string())
    .json_data(snapshot)
}
