//! Session identifiers: the key every alert record is stored under.
//!
//! A sender obtains one [`SessionId`] per session and keeps it for the
//! session's lifetime. Re-randomising the id on every load orphans whatever was
//! published under the old one, so [`InstallScopedSessionIds`] derives the id
//! deterministically from a stable per-install identifier instead.

use std::{borrow::Borrow, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Namespace for UUID v5 session ids derived from install identifiers.
const INSTALL_NAMESPACE: Uuid =
  Uuid::from_u128(0x6f1c_2a4e_93b7_4d05_8e21_5b0c_7d4a_e913);

// ─── SessionId ───────────────────────────────────────────────────────────────

/// A validated, non-empty alert key.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
  /// Longest accepted id, in bytes.
  pub const MAX_LEN: usize = 128;

  /// Validate `raw` and wrap it.
  ///
  /// Rejects empty ids, ids with leading or trailing whitespace, ids
  /// containing `/` or control characters, and ids longer than
  /// [`Self::MAX_LEN`].
  pub fn new(raw: impl Into<String>) -> Result<Self> {
    let raw = raw.into();
    if raw.is_empty() {
      return Err(Error::InvalidKey("session id is empty".into()));
    }
    if raw.len() > Self::MAX_LEN {
      return Err(Error::InvalidKey(format!(
        "session id is {} bytes, limit is {}",
        raw.len(),
        Self::MAX_LEN
      )));
    }
    if raw.trim() != raw {
      return Err(Error::InvalidKey(format!(
        "session id {raw:?} has surrounding whitespace"
      )));
    }
    if raw.chars().any(|c| c == '/' || c.is_control()) {
      return Err(Error::InvalidKey(format!(
        "session id {raw:?} contains a reserved character"
      )));
    }
    Ok(Self(raw))
  }

  /// Derive the stable session id for an install identifier.
  pub fn for_install(install_id: &str) -> Result<Self> {
    let install_id = install_id.trim();
    if install_id.is_empty() {
      return Err(Error::InvalidKey("install id is empty".into()));
    }
    Ok(Self(
      Uuid::new_v5(&INSTALL_NAMESPACE, install_id.as_bytes()).to_string(),
    ))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SessionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for SessionId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::new(s) }
}

impl TryFrom<String> for SessionId {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { Self::new(value) }
}

impl From<SessionId> for String {
  fn from(id: SessionId) -> Self { id.0 }
}

impl AsRef<str> for SessionId {
  fn as_ref(&self) -> &str { &self.0 }
}

impl Borrow<str> for SessionId {
  fn borrow(&self) -> &str { &self.0 }
}

// ─── Providers ───────────────────────────────────────────────────────────────

/// Hands out session ids to senders.
pub trait SessionIdProvider: Send + Sync {
  fn new_session_id(&self) -> SessionId;
}

/// A fresh random (UUID v4) id on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSessionIds;

impl SessionIdProvider for RandomSessionIds {
  fn new_session_id(&self) -> SessionId {
    SessionId(Uuid::new_v4().to_string())
  }
}

/// The same id on every call, derived from a stable install identifier.
///
/// A sender that restarts mid-emergency gets its old id back and overwrites
/// (or clears) the record it already published.
#[derive(Debug, Clone)]
pub struct InstallScopedSessionIds {
  id: SessionId,
}

impl InstallScopedSessionIds {
  pub fn new(install_id: &str) -> Result<Self> {
    Ok(Self { id: SessionId::for_install(install_id)? })
  }
}

impl SessionIdProvider for InstallScopedSessionIds {
  fn new_session_id(&self) -> SessionId { self.id.clone() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rejects_empty_and_padded_ids() {
    assert!(matches!(SessionId::new(""), Err(Error::InvalidKey(_))));
    assert!(matches!(SessionId::new(" A1"), Err(Error::InvalidKey(_))));
    assert!(matches!(SessionId::new("a/b"), Err(Error::InvalidKey(_))));
    assert!(matches!(
      SessionId::new("x".repeat(SessionId::MAX_LEN + 1)),
      Err(Error::InvalidKey(_))
    ));
    assert_eq!(SessionId::new("A1").unwrap().as_str(), "A1");
  }

  #[test]
  fn random_ids_do_not_collide() {
    let provider = RandomSessionIds;
    let a = provider.new_session_id();
    let b = provider.new_session_id();
    assert_ne!(a, b);
  }

  #[test]
  fn install_scoped_ids_are_stable() {
    let first = InstallScopedSessionIds::new("device-42").unwrap();
    let again = InstallScopedSessionIds::new("device-42").unwrap();
    let other = InstallScopedSessionIds::new("device-43").unwrap();
    assert_eq!(first.new_session_id(), first.new_session_id());
    assert_eq!(first.new_session_id(), again.new_session_id());
    assert_ne!(first.new_session_id(), other.new_session_id());
    assert!(InstallScopedSessionIds::new("  ").is_err());
  }

  #[test]
  fn deserialising_validates() {
    let ok: SessionId = serde_json::from_str("\"B2\"").unwrap();
    assert_eq!(ok.as_str(), "B2");
    assert!(serde_json::from_str::<SessionId>("\"\"").is_err());
  }
}
