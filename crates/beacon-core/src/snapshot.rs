//! Point-in-time copies of the whole alert mapping.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{alert::AlertRecord, session::SessionId};

/// The full mapping of live alerts, ordered by session id.
///
/// The ordering is an implementation detail; consumers key off the id.
pub type AlertMap = BTreeMap<SessionId, AlertRecord>;

/// An immutable copy of the store at one revision.
///
/// Cloning is cheap; the map is shared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
  /// Bumped by exactly one for every mutation that changed the content.
  pub revision: u64,
  pub alerts:   Arc<AlertMap>,
}

impl Snapshot {
  pub fn new(revision: u64, alerts: Arc<AlertMap>) -> Self {
    Self { revision, alerts }
  }

  pub fn get(&self, id: &str) -> Option<&AlertRecord> { self.alerts.get(id) }

  pub fn contains(&self, id: &str) -> bool { self.alerts.contains_key(id) }

  pub fn len(&self) -> usize { self.alerts.len() }

  pub fn is_empty(&self) -> bool { self.alerts.is_empty() }

  pub fn session_ids(&self) -> impl Iterator<Item = &SessionId> {
    self.alerts.keys()
  }
}

/// What a put or delete did to the mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
  /// The key was absent and now holds a record.
  Created,
  /// The key held a different record, which was replaced in full.
  Replaced,
  /// The key already held an identical record.
  Unchanged,
  /// The key held a record, which was removed.
  Removed,
  /// The key was already absent.
  Absent,
}

impl Mutation {
  /// `true` if subscribers see a new snapshot because of this mutation.
  pub fn changed(self) -> bool {
    matches!(self, Self::Created | Self::Replaced | Self::Removed)
  }
}
