//! Handler for `POST /sessions`.
//!
//! Issues the key a sender publishes under. With an `installId` the id is
//! derived from it and therefore survives reloads; without one it is random.

use axum::{Json, body::Bytes, http::StatusCode, response::IntoResponse};
use beacon_core::session::{
  InstallScopedSessionIds, RandomSessionIds, SessionId, SessionIdProvider,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  /// Stable per-install identifier kept by the sender device.
  pub install_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedSession {
  pub session_id: SessionId,
  /// `true` when the id will be issued again for the same install.
  pub stable:     bool,
}

/// `POST /sessions` with body `{"installId":"..."}` (optional, may be empty).
pub async fn create(body: Bytes) -> Result<impl IntoResponse, ApiError> {
  let body: CreateBody = if body.iter().all(u8::is_ascii_whitespace) {
    CreateBody::default()
  } else {
    serde_json::from_slice(&body)
      .map_err(|e| ApiError::BadRequest(e.to_string()))?
  };

  let issued = match body.install_id.as_deref() {
    Some(install_id) => IssuedSession {
      session_id: InstallScopedSessionIds::new(install_id)?.new_session_id(),
      stable:     true,
    },
    None => IssuedSession {
      session_id: RandomSessionIds.new_session_id(),
      stable:     false,
    },
  };
  tracing::debug!(session_id = %issued.session_id, stable = issued.stable, "session issued");
  Ok((StatusCode::CREATED, Json(issued)))
}
