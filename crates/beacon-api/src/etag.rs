//! ETag computation for snapshots.
//!
//! ETags are SHA-256 hashes over the content of every live record, in session
//! id order. The revision is left out: a restarted store holding the same
//! alerts yields the same tag.

use beacon_core::{alert::AlertStatus, snapshot::Snapshot};
use sha2::{Digest, Sha256};

/// Compute a quoted strong ETag for `snapshot`.
pub fn compute_etag(snapshot: &Snapshot) -> String {
  let mut hasher = Sha256::new();
  for (id, record) in snapshot.alerts.iter() {
    hasher.update((id.as_str().len() as u64).to_le_bytes());
    hasher.update(id.as_str().as_bytes());
    match record.location {
      Some(loc) => {
        hasher.update([1u8]);
        hasher.update(loc.lat.to_le_bytes());
        hasher.update(loc.lng.to_le_bytes());
      }
      None => hasher.update([0u8]),
    }
    hasher.update([match record.status {
      AlertStatus::Emergency => b'E',
      AlertStatus::Safe => b'S',
    }]);
    hasher.update((record.timestamp.len() as u64).to_le_bytes());
    hasher.update(record.timestamp.as_bytes());
    hasher.update([record.battery_percent]);
  }
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// `true` if an `If-None-Match` header value names `etag`.
///
/// Accepts `*`, comma-separated lists, weak validators, and bare tags.
pub fn if_none_match_hits(header: &str, etag: &str) -> bool {
  let bare = etag.trim_matches('"');
  header.split(',').map(str::trim).any(|candidate| {
    candidate == "*"
      || candidate.trim_start_matches("W/").trim_matches('"') == bare
  })
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use beacon_core::{
    alert::{AlertRecord, Location},
    session::SessionId,
    snapshot::AlertMap,
  };

  use super::*;

  fn snapshot(revision: u64, battery: u8) -> Snapshot {
    let id = SessionId::new("A1").unwrap();
    let record = AlertRecord::emergency(Location::new(12.9, 77.6), "10:42")
      .with_battery(battery)
      .for_session(&id)
      .unwrap();
    let mut alerts = AlertMap::new();
    alerts.insert(id, record);
    Snapshot::new(revision, Arc::new(alerts))
  }

  #[test]
  fn same_content_same_tag_across_revisions() {
    assert_eq!(compute_etag(&snapshot(1, 42)), compute_etag(&snapshot(9, 42)));
  }

  #[test]
  fn content_change_changes_tag() {
    assert_ne!(compute_etag(&snapshot(1, 42)), compute_etag(&snapshot(1, 41)));
    assert_ne!(
      compute_etag(&snapshot(1, 42)),
      compute_etag(&Snapshot::default())
    );
  }

  #[test]
  fn tag_is_quoted_hex() {
    let tag = compute_etag(&Snapshot::default());
    assert!(tag.starts_with('"') && tag.ends_with('"'));
    assert_eq!(tag.len(), 64 + 2);
  }

  #[test]
  fn if_none_match_forms() {
    let tag = compute_etag(&Snapshot::default());
    let bare = tag.trim_matches('"').to_string();
    assert!(if_none_match_hits(&tag, &tag));
    assert!(if_none_match_hits(&bare, &tag));
    assert!(if_none_match_hits(&format!("W/{tag}"), &tag));
    assert!(if_none_match_hits(&format!("\"other\", {tag}"), &tag));
    assert!(if_none_match_hits("*", &tag));
    assert!(!if_none_match_hits("\"other\"", &tag));
  }
}
