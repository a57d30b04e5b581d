//! Reservation records as stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a reservation. Transitions only confirmed → cancelled; a
/// cancelled reservation is never re-confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Confirmed,
    Cancelled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "confirmed" => Some(ReservationStatus::Confirmed),
            "cancelled" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booking tied to one restaurant and one customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    /// Assigned by the store at insert time.
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub customer_name: String,
    pub customer_phone: Option<String>,
    pub party_size: i32,
    /// Always a fully resolved absolute instant, never a relative phrase.
    pub reserved_at: DateTime<Utc>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields for a reservation about to be inserted.
///
/// The phone is mandatory here: the missing-phone check happens before a
/// record is ever built.
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub restaurant_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub party_size: i32,
    pub reserved_at: DateTime<Utc>,
}

/// Partial update applied to a single reservation. Unset fields are left
/// untouched by the store.
#[derive(Debug, Clone, Default)]
pub struct ReservationPatch {
    pub party_size: Option<i32>,
    pub reserved_at: Option<DateTime<Utc>>,
    pub status: Option<ReservationStatus>,
}

impl ReservationPatch {
    pub fn is_empty(&self) -> bool {
        self.party_size.is_none() && self.reserved_at.is_none() && self.status.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [ReservationStatus::Confirmed, ReservationStatus::Cancelled] {
            assert_eq!(ReservationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ReservationStatus::parse("pending"), None);
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(ReservationPatch::default().is_empty());
        let patch = ReservationPatch {
            party_size: Some(4),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }
}
