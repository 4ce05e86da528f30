//! HTTP server assembly for Beacon.
//!
//! Mounts the [`beacon_api`] router under `/api` on top of a [`MemoryStore`],
//! adds a health probe and request tracing, and owns the server's
//! configuration.

use std::{path::Path, sync::Arc, time::Duration};

use axum::{Json, Router, extract::State, routing::get};
use beacon_api::ApiConfig;
use beacon_core::store::AlertStore;
use beacon_store_memory::MemoryStore;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_reap_interval_secs() -> u64 { 30 }
fn default_sse_keep_alive_secs() -> u64 { 15 }

/// Runtime server configuration, deserialised from `config.toml` and
/// `BEACON_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  /// Expire alerts not put for this many seconds. Unset keeps alerts until
  /// their sender clears them; `0` is rejected.
  #[serde(default)]
  pub alert_ttl_secs:      Option<u64>,
  #[serde(default = "default_reap_interval_secs")]
  pub reap_interval_secs:  u64,
  #[serde(default = "default_sse_keep_alive_secs")]
  pub sse_keep_alive_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                default_host(),
      port:                default_port(),
      alert_ttl_secs:      None,
      reap_interval_secs:  default_reap_interval_secs(),
      sse_keep_alive_secs: default_sse_keep_alive_secs(),
    }
  }
}

impl ServerConfig {
  /// Layer the optional TOML file at `path` under `BEACON_*` environment
  /// variables (e.g. `BEACON_PORT=9000`).
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("BEACON"))
      .build()?
      .try_deserialize::<Self>()?
      .validate()
  }

  /// Reject settings that deserialise but cannot be served.
  pub fn validate(self) -> Result<Self, config::ConfigError> {
    if self.alert_ttl_secs == Some(0) {
      return Err(config::ConfigError::Message(
        "alert_ttl_secs must be at least 1; leave it unset to disable expiry"
          .to_string(),
      ));
    }
    Ok(self)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn alert_ttl(&self) -> Option<Duration> {
    self.alert_ttl_secs.map(Duration::from_secs)
  }

  pub fn reap_interval(&self) -> Duration {
    Duration::from_secs(self.reap_interval_secs.max(1))
  }

  pub fn sse_keep_alive(&self) -> Duration {
    Duration::from_secs(self.sse_keep_alive_secs.max(1))
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state for the server-level routes.
#[derive(Clone)]
pub struct AppState {
  pub store:  MemoryStore,
  pub config: Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete server [`Router`].
pub fn router(state: AppState) -> Router {
  let api = beacon_api::api_router(
    Arc::new(state.store.clone()),
    ApiConfig { sse_keep_alive: state.config.sse_keep_alive() },
  );
  Router::new()
    .route("/healthz", get(health))
    .with_state(state)
    .nest("/api", api)
    .layer(TraceLayer::new_for_http())
}

/// `GET /healthz`
async fn health(State(state): State<AppState>) -> Json<Value> {
  let closed = state.store.is_closed().await;
  let (revision, alerts) = match state.store.snapshot().await {
    Ok(snapshot) => (snapshot.revision, snapshot.len()),
    Err(e) => {
      tracing::warn!("health check could not read a snapshot: {e}");
      (0, 0)
    }
  };
  Json(json!({
    "status":      if closed { "closed" } else { "ok" },
    "revision":    revision,
    "alerts":      alerts,
    "subscribers": state.store.subscriber_count().await,
    "expiry":      state.config.alert_ttl_secs,
  }))
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
  };
  use tower::ServiceExt as _;

  use super::*;

  fn make_state() -> AppState {
    AppState {
      store:  MemoryStore::new(),
      config: Arc::new(ServerConfig::default()),
    }
  }

  async fn send(
    state: &AppState,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> Response {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
      Some(json) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string())),
      None => builder.body(Body::empty()),
    }
    .unwrap();
    router(state.clone()).oneshot(req).await.unwrap()
  }

  async fn json_body(resp: Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  fn alert(lat: f64, lng: f64, battery: u8) -> Value {
    json!({
      "location": { "lat": lat, "lng": lng },
      "status": "EMERGENCY",
      "timestamp": "10:42:00",
      "batteryPercent": battery,
    })
  }

  #[test]
  fn missing_config_file_yields_defaults() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/beacon.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
    assert_eq!(cfg.alert_ttl(), None);
    assert_eq!(cfg.reap_interval(), Duration::from_secs(30));
    assert_eq!(cfg.address(), "127.0.0.1:8080");
  }

  #[test]
  fn zero_alert_ttl_is_rejected() {
    let cfg = ServerConfig { alert_ttl_secs: Some(0), ..ServerConfig::default() };
    assert!(matches!(cfg.validate(), Err(config::ConfigError::Message(_))));

    let cfg = ServerConfig { alert_ttl_secs: Some(60), ..ServerConfig::default() };
    let cfg = cfg.validate().unwrap();
    assert_eq!(cfg.alert_ttl(), Some(Duration::from_secs(60)));
  }

  #[tokio::test]
  async fn health_reports_store_state() {
    let state = make_state();
    send(&state, "PUT", "/api/alerts/A1", Some(alert(12.9, 77.6, 42))).await;

    let resp = send(&state, "GET", "/healthz", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["alerts"], 1);
    assert_eq!(body["revision"], 1);

    state.store.shutdown().await;
    let body = json_body(send(&state, "GET", "/healthz", None).await).await;
    assert_eq!(body["status"], "closed");
  }

  #[tokio::test]
  async fn sos_lifecycle_over_http() {
    let state = make_state();

    let resp = send(&state, "PUT", "/api/alerts/A1", Some(alert(12.9, 77.6, 42))).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let snap = json_body(send(&state, "GET", "/api/alerts", None).await).await;
    assert_eq!(snap["alerts"].as_object().unwrap().len(), 1);
    assert_eq!(snap["alerts"]["A1"]["location"]["lat"], 12.9);
    assert_eq!(snap["alerts"]["A1"]["batteryPercent"], 42);

    let resp = send(&state, "DELETE", "/api/alerts/A1", None).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let snap = json_body(send(&state, "GET", "/api/alerts", None).await).await;
    assert!(snap["alerts"].as_object().unwrap().is_empty());

    let (a, b) = tokio::join!(
      send(&state, "PUT", "/api/alerts/A1", Some(alert(12.9, 77.6, 42))),
      send(&state, "PUT", "/api/alerts/B2", Some(alert(-33.9, 18.4, 7))),
    );
    assert_eq!(a.status(), StatusCode::CREATED);
    assert_eq!(b.status(), StatusCode::CREATED);

    let snap = state.store.snapshot().await.unwrap();
    assert_eq!(snap.len(), 2);
    assert_eq!(snap.get("B2").unwrap().battery_percent, 7);
  }

  #[tokio::test]
  async fn unknown_route_is_404() {
    let state = make_state();
    let resp = send(&state, "GET", "/alerts", None).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
