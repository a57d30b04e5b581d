//! Decision logic for creating, finding, updating and cancelling
//! reservations.
//!
//! The manager never formats user-facing text and never reads the clock;
//! callers supply the reference "now" so every decision is reproducible.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use uuid::Uuid;

use crate::db::ReservationStore;
use crate::error::StoreError;
use crate::reservations::{NewReservation, Reservation, ReservationPatch, ReservationStatus};
use crate::temporal;

/// Maximum confirmed reservations one phone may hold at one restaurant on
/// one calendar day.
pub const DAILY_CAP: i64 = 2;

/// Phone values the telephony platform substitutes when there is no real
/// caller number (browser test calls, withheld numbers).
const PLACEHOLDER_PHONES: [&str; 3] = ["webuser", "anonymous", "unknown"];

/// Error taxonomy for reservation operations. Rendered to user-facing prose
/// by a single adapter at the tool boundary.
#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("could not resolve {0:?} to a date and time")]
    UnresolvedDate(String),

    #[error("no usable customer phone number")]
    MissingPhone,

    #[error("daily reservation cap reached")]
    DailyLimitExceeded,

    #[error("no field to update was supplied")]
    NothingToUpdate,

    #[error("no matching confirmed reservation")]
    NotFound,

    #[error("several reservations match")]
    Ambiguous,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a booking insert.
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub party_size: i32,
    /// Resolved instant in the restaurant's civil timezone, for rendering.
    pub reserved_at: DateTime<Tz>,
}

/// Outcome of a find-and-disambiguate lookup.
#[derive(Debug, Clone)]
pub enum FindOutcome {
    Unique(Reservation),
    NotFound,
    /// More than one match; the system never guesses among homonyms.
    Ambiguous,
}

/// What the management tool was asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManageAction {
    Cancel,
    Update,
}

/// Result of a successful update or cancel.
#[derive(Debug, Clone)]
pub enum Applied {
    Cancelled,
    Updated {
        party_size: Option<i32>,
        reserved_at: Option<DateTime<Tz>>,
    },
}

/// Owns the reservation lifecycle. Stateless between calls; concurrency is
/// whatever the host request layer provides.
///
/// Known limitation: the cap check and the insert are two store round-trips
/// with no transaction, so two near-simultaneous bookings from the same
/// customer can both pass the check and briefly exceed the cap.
pub struct ReservationManager {
    store: Arc<dyn ReservationStore>,
    timezone: Tz,
}

impl ReservationManager {
    pub fn new(store: Arc<dyn ReservationStore>, timezone: Tz) -> Self {
        Self { store, timezone }
    }

    /// The reference instant tool calls are anchored to.
    pub fn now_local(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.timezone)
    }

    /// Create a confirmed reservation after date resolution and the daily
    /// cap check pass. Exactly one insert on success, none on any failure.
    pub async fn create(
        &self,
        restaurant_id: Uuid,
        customer_name: &str,
        customer_phone: Option<&str>,
        party_size: i32,
        date_phrase: &str,
        now: DateTime<Tz>,
    ) -> Result<Booking, ReservationError> {
        debug_assert!(party_size > 0, "party_size must be validated by the caller");

        let phone = customer_phone
            .filter(|p| is_usable_phone(p))
            .ok_or(ReservationError::MissingPhone)?;

        let reserved_at = temporal::resolve(date_phrase, now)
            .map_err(|e| ReservationError::UnresolvedDate(e.phrase))?;

        let (day_start, day_end) = temporal::day_bounds(reserved_at);
        let existing = self
            .store
            .count_confirmed_in_window(phone, restaurant_id, day_start, day_end)
            .await?;
        if existing >= DAILY_CAP {
            return Err(ReservationError::DailyLimitExceeded);
        }

        let id = self
            .store
            .insert_reservation(&NewReservation {
                restaurant_id,
                customer_name: customer_name.to_string(),
                customer_phone: phone.to_string(),
                party_size,
                reserved_at: reserved_at.with_timezone(&Utc),
            })
            .await?;

        tracing::info!(%id, customer = customer_name, party_size, "reservation created");

        Ok(Booking {
            id,
            party_size,
            reserved_at,
        })
    }

    /// Find the single confirmed reservation a customer is talking about.
    ///
    /// The lookup is scoped to one restaurant; bookings held elsewhere are
    /// invisible. A phone number, when supplied, narrows by exact equality.
    /// More than one match is ambiguous even with a phone: the system never
    /// picks arbitrarily.
    pub async fn find_active(
        &self,
        restaurant_id: Uuid,
        name: &str,
        phone: Option<&str>,
    ) -> Result<FindOutcome, ReservationError> {
        let mut matches = self
            .store
            .find_confirmed_by_name(restaurant_id, name, phone)
            .await?;
        Ok(match matches.len() {
            0 => FindOutcome::NotFound,
            1 => FindOutcome::Unique(matches.remove(0)),
            _ => FindOutcome::Ambiguous,
        })
    }

    /// Cancel or update a previously found reservation.
    ///
    /// All supplied fields are validated before any write; an unresolvable
    /// new date fails the whole call with no partial mutation.
    pub async fn apply_action(
        &self,
        target: &Reservation,
        action: ManageAction,
        new_party_size: Option<i32>,
        new_date_phrase: Option<&str>,
        now: DateTime<Tz>,
    ) -> Result<Applied, ReservationError> {
        debug_assert!(
            new_party_size.is_none_or(|n| n > 0),
            "party_size must be validated by the caller"
        );

        match action {
            ManageAction::Cancel => {
                self.store
                    .update_reservation(
                        target.id,
                        &ReservationPatch {
                            status: Some(ReservationStatus::Cancelled),
                            ..Default::default()
                        },
                    )
                    .await?;
                tracing::info!(id = %target.id, "reservation cancelled");
                Ok(Applied::Cancelled)
            }
            ManageAction::Update => {
                if new_party_size.is_none() && new_date_phrase.is_none() {
                    return Err(ReservationError::NothingToUpdate);
                }

                let reserved_at = new_date_phrase
                    .map(|phrase| {
                        temporal::resolve(phrase, now)
                            .map_err(|e| ReservationError::UnresolvedDate(e.phrase))
                    })
                    .transpose()?;

                self.store
                    .update_reservation(
                        target.id,
                        &ReservationPatch {
                            party_size: new_party_size,
                            reserved_at: reserved_at.map(|at| at.with_timezone(&Utc)),
                            status: None,
                        },
                    )
                    .await?;
                tracing::info!(id = %target.id, "reservation updated");
                Ok(Applied::Updated {
                    party_size: new_party_size,
                    reserved_at,
                })
            }
        }
    }
}

/// A phone is usable when present, non-empty and not one of the platform's
/// placeholder markers.
fn is_usable_phone(phone: &str) -> bool {
    let trimmed = phone.trim();
    !trimmed.is_empty()
        && !PLACEHOLDER_PHONES
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}
