//! Timestamp and id helpers.
//!
//! Envelope timestamps must be RFC-3339 (§6), so this upgrades past the
//! teacher's epoch-seconds `now_epoch_z()` helper while keeping its other
//! convention: ULIDs for event and session identifiers.

use chrono::Utc;
use ulid::Ulid;

/// Current instant as an RFC-3339 string, e.g. `2026-08-01T12:00:00Z`.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// A fresh, lexically sortable identifier for events and sessions.
pub fn new_id() -> String {
    Ulid::new().to_string()
}
