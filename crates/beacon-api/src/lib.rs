//! JSON and Server-Sent Events API for Beacon.
//!
//! Exposes an axum [`Router`] backed by any [`beacon_core::store::AlertStore`].
//! There is no authentication: any caller may put or delete any session's
//! alert. TLS and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", beacon_api::api_router(store.clone(), ApiConfig::default()))
//! ```

pub mod alerts;
pub mod error;
pub mod etag;
pub mod sessions;
pub mod stream;

use std::{sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post},
};
use beacon_core::store::AlertStore;

pub use error::ApiError;

/// Default interval between SSE keep-alive comments.
pub const DEFAULT_SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// Tunables for the API layer.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  /// How often an idle `/stream` connection receives a keep-alive comment.
  pub sse_keep_alive: Duration,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self { sse_keep_alive: DEFAULT_SSE_KEEP_ALIVE }
  }
}

/// Shared state threaded through all API handlers.
pub struct ApiState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ApiConfig>,
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: Arc::clone(&self.config),
    }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>, config: ApiConfig) -> Router<()>
where
  S: AlertStore + 'static,
{
  let state = ApiState { store, config: Arc::new(config) };
  Router::new()
    // Sessions
    .route("/sessions", post(sessions::create))
    // Alerts
    .route("/alerts", get(alerts::snapshot::<S>))
    .route(
      "/alerts/{id}",
      get(alerts::get_one::<S>)
        .put(alerts::put_one::<S>)
        .delete(alerts::delete_one::<S>),
    )
    // Live feed
    .route("/stream", get(stream::handler::<S>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
