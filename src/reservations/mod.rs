//! Reservation lifecycle: creation, lookup, update and cancellation.

mod manager;
mod types;

pub use manager::{
    Applied, Booking, FindOutcome, ManageAction, ReservationError, ReservationManager, DAILY_CAP,
};
pub use types::{NewReservation, Reservation, ReservationPatch, ReservationStatus};
