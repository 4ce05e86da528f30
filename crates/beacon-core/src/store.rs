//! The `AlertStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `beacon-store-memory`).
//! Transports (`beacon-api`) depend on this abstraction, not on any concrete
//! backend.

use std::future::Future;

use crate::{
  alert::AlertRecord,
  session::SessionId,
  snapshot::{Mutation, Snapshot},
  subscription::Subscription,
};

/// The authoritative mapping of active alerts, plus its live subscriptions.
///
/// Writes are last-write-wins per key; there is no cross-key ordering. A
/// snapshot always reflects a state that existed at some instant. Writers
/// never wait on subscribers.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait AlertStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Validate `record`, stamp it with `id`, and replace whatever `id` held.
  ///
  /// A record whose status is `SAFE` removes the key instead.
  fn put(
    &self,
    id: SessionId,
    record: AlertRecord,
  ) -> impl Future<Output = Result<Mutation, Self::Error>> + Send + '_;

  /// Remove the record for `id`. Removing an absent key is not an error.
  fn delete(
    &self,
    id: SessionId,
  ) -> impl Future<Output = Result<Mutation, Self::Error>> + Send + '_;

  /// Retrieve the record for `id`. Returns `None` if not present.
  fn get(
    &self,
    id: SessionId,
  ) -> impl Future<Output = Result<Option<AlertRecord>, Self::Error>> + Send + '_;

  /// A consistent copy of the whole mapping.
  fn snapshot(
    &self,
  ) -> impl Future<Output = Result<Snapshot, Self::Error>> + Send + '_;

  /// Attach a live view: the current snapshot plus a stream of later ones.
  fn subscribe(
    &self,
  ) -> impl Future<Output = Result<Subscription, Self::Error>> + Send + '_;
}
