//! Alert records, one per active emergency.
//!
//! Records are replaced wholesale on every put (last-write-wins). The
//! `timestamp` is whatever the sender supplied and is never interpreted.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, session::SessionId};

/// Battery level assumed when the sender's device cannot report one.
pub const DEFAULT_BATTERY_PERCENT: u8 = 100;

fn default_battery() -> u8 { DEFAULT_BATTERY_PERCENT }

// ─── Location ────────────────────────────────────────────────────────────────

/// WGS84 coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub lat: f64,
  pub lng: f64,
}

impl Location {
  pub fn new(lat: f64, lng: f64) -> Self { Self { lat, lng } }

  /// Reject non-finite or out-of-range coordinates.
  pub fn validate(&self) -> Result<()> {
    if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
      return Err(Error::InvalidRecord(format!(
        "latitude {} is outside [-90, 90]",
        self.lat
      )));
    }
    if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
      return Err(Error::InvalidRecord(format!(
        "longitude {} is outside [-180, 180]",
        self.lng
      )));
    }
    Ok(())
  }
}

// ─── Status ──────────────────────────────────────────────────────────────────

/// `Safe` never lives in the store: putting a `Safe` record clears the key.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertStatus {
  #[default]
  Emergency,
  Safe,
}

// ─── Record ──────────────────────────────────────────────────────────────────

/// The payload a sender publishes under its [`SessionId`].
///
/// Input also accepts the legacy keys `time` and `battery`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
  /// Stamped by the store from the key the record is put under.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub session_id:      Option<SessionId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub location:        Option<Location>,
  #[serde(default)]
  pub status:          AlertStatus,
  #[serde(default, alias = "time")]
  pub timestamp:       String,
  #[serde(default = "default_battery", alias = "battery")]
  pub battery_percent: u8,
}

impl AlertRecord {
  /// An `EMERGENCY` record at `location` with an unknown battery level.
  pub fn emergency(location: Location, timestamp: impl Into<String>) -> Self {
    Self {
      session_id:      None,
      location:        Some(location),
      status:          AlertStatus::Emergency,
      timestamp:       timestamp.into(),
      battery_percent: DEFAULT_BATTERY_PERCENT,
    }
  }

  pub fn with_battery(mut self, percent: u8) -> Self {
    self.battery_percent = percent;
    self
  }

  /// `true` when storing this record means removing the key.
  pub fn is_clearing(&self) -> bool { self.status == AlertStatus::Safe }

  pub fn validate(&self) -> Result<()> {
    match (self.status, &self.location) {
      (AlertStatus::Emergency, None) => {
        return Err(Error::InvalidRecord(
          "an EMERGENCY record requires a location".into(),
        ));
      }
      (_, Some(location)) => location.validate()?,
      (AlertStatus::Safe, None) => {}
    }
    if self.battery_percent > 100 {
      return Err(Error::InvalidRecord(format!(
        "battery level {}% is above 100",
        self.battery_percent
      )));
    }
    Ok(())
  }

  /// Validate the record and stamp it with the key it is stored under.
  ///
  /// A record that already names a different session is rejected.
  pub fn for_session(mut self, id: &SessionId) -> Result<Self> {
    if let Some(existing) = &self.session_id
      && existing != id
    {
      return Err(Error::InvalidRecord(format!(
        "record names session {existing} but was put under {id}"
      )));
    }
    self.validate()?;
    self.session_id = Some(id.clone());
    Ok(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn a1() -> SessionId { SessionId::new("A1").unwrap() }

  #[test]
  fn rejects_bad_coordinates() {
    for (lat, lng) in [
      (f64::NAN, 0.0),
      (0.0, f64::INFINITY),
      (90.5, 0.0),
      (0.0, -180.01),
    ] {
      let record = AlertRecord::emergency(Location::new(lat, lng), "now");
      assert!(
        matches!(record.validate(), Err(Error::InvalidRecord(_))),
        "accepted ({lat}, {lng})"
      );
    }
  }

  #[test]
  fn emergency_requires_location() {
    let mut record = AlertRecord::emergency(Location::new(1.0, 2.0), "now");
    record.location = None;
    assert!(matches!(record.validate(), Err(Error::InvalidRecord(_))));

    record.status = AlertStatus::Safe;
    assert!(record.validate().is_ok());
  }

  #[test]
  fn battery_above_100_is_rejected() {
    let record =
      AlertRecord::emergency(Location::new(1.0, 2.0), "now").with_battery(101);
    assert!(matches!(record.validate(), Err(Error::InvalidRecord(_))));
  }

  #[test]
  fn for_session_stamps_and_checks_key() {
    let record = AlertRecord::emergency(Location::new(12.9, 77.6), "now")
      .for_session(&a1())
      .unwrap();
    assert_eq!(record.session_id, Some(a1()));

    let other = SessionId::new("B2").unwrap();
    assert!(matches!(
      record.for_session(&other),
      Err(Error::InvalidRecord(_))
    ));
  }

  #[test]
  fn accepts_legacy_wire_keys_and_defaults_battery() {
    let legacy: AlertRecord = serde_json::from_str(
      r#"{"location":{"lat":12.9,"lng":77.6},"status":"EMERGENCY","time":"10:42","battery":42}"#,
    )
    .unwrap();
    assert_eq!(legacy.timestamp, "10:42");
    assert_eq!(legacy.battery_percent, 42);

    let bare: AlertRecord =
      serde_json::from_str(r#"{"location":{"lat":1.0,"lng":2.0}}"#).unwrap();
    assert_eq!(bare.status, AlertStatus::Emergency);
    assert_eq!(bare.battery_percent, DEFAULT_BATTERY_PERCENT);
  }

  #[test]
  fn serialises_camel_case() {
    let record = AlertRecord::emergency(Location::new(12.9, 77.6), "10:42")
      .with_battery(42)
      .for_session(&a1())
      .unwrap();
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["sessionId"], "A1");
    assert_eq!(json["status"], "EMERGENCY");
    assert_eq!(json["batteryPercent"], 42);
  }
}
