//! Handlers for `/alerts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/alerts` | Whole snapshot; honours `If-None-Match` |
//! | `GET`    | `/alerts/:id` | 404 if no live alert |
//! | `PUT`    | `/alerts/:id` | Body: [`AlertRecord`] or `null`; 201 / 200 / 204 |
//! | `DELETE` | `/alerts/:id` | Always 204 |

use axum::{
  Json,
  extract::{Path, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Response},
};
use beacon_core::{
  alert::AlertRecord,
  session::SessionId,
  snapshot::Mutation,
  store::AlertStore,
};

use crate::{
  ApiState,
  error::ApiError,
  etag::{compute_etag, if_none_match_hits},
};

// ─── Snapshot ─────────────────────────────────────────────────────────────────

/// `GET /alerts`: the current [`Snapshot`](beacon_core::snapshot::Snapshot)
/// with an `ETag`; `304` when `If-None-Match` still matches.
pub async fn snapshot<S>(
  State(state): State<ApiState<S>>,
  headers: HeaderMap,
) -> Result<Response, ApiError>
where
  S: AlertStore,
{
  let snapshot = state.store.snapshot().await.map_err(ApiError::store)?;
  let etag = compute_etag(&snapshot);

  let unchanged = headers
    .get(header::IF_NONE_MATCH)
    .and_then(|v| v.to_str().ok())
    .is_some_and(|v| if_none_match_hits(v, &etag));
  if unchanged {
    return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
  }

  Ok(([(header::ETAG, etag)], Json(snapshot)).into_response())
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /alerts/:id`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path(raw): Path<String>,
) -> Result<Json<AlertRecord>, ApiError>
where
  S: AlertStore,
{
  let id = SessionId::new(raw)?;
  let record = state
    .store
    .get(id.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("no active alert for {id}")))?;
  Ok(Json(record))
}

// ─── Put ──────────────────────────────────────────────────────────────────────

/// `PUT /alerts/:id`: replace the alert for `id`.
///
/// Returns 201 with the stored record when the alert is new, 200 when it
/// replaced (or matched) an existing one, and 204 when the body was `null` or
/// the record's status is `SAFE`, both of which clear the alert.
pub async fn put_one<S>(
  State(state): State<ApiState<S>>,
  Path(raw): Path<String>,
  Json(body): Json<Option<AlertRecord>>,
) -> Result<Response, ApiError>
where
  S: AlertStore,
{
  let id = SessionId::new(raw)?;
  let Some(record) = body else {
    state.store.delete(id).await.map_err(ApiError::store)?;
    return Ok(StatusCode::NO_CONTENT.into_response());
  };

  let record = record.for_session(&id)?;
  let mutation = state
    .store
    .put(id, record.clone())
    .await
    .map_err(ApiError::store)?;

  Ok(match mutation {
    Mutation::Created => (StatusCode::CREATED, Json(record)).into_response(),
    Mutation::Replaced | Mutation::Unchanged => Json(record).into_response(),
    Mutation::Removed | Mutation::Absent => {
      StatusCode::NO_CONTENT.into_response()
    }
  })
}

// ─── Delete ───────────────────────────────────────────────────────────────────

/// `DELETE /alerts/:id`, the "I am safe" action. Idempotent.
pub async fn delete_one<S>(
  State(state): State<ApiState<S>>,
  Path(raw): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: AlertStore,
{
  let id = SessionId::new(raw)?;
  state.store.delete(id).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
