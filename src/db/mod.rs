//! Store abstraction layer.
//!
//! The decision logic only ever talks to the store through this trait, so
//! tests substitute an in-memory fake and the binary wires in Postgres.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::StoreError;
use crate::reservations::{NewReservation, Reservation, ReservationPatch};

mod postgres;

pub use postgres::PgStore;

/// A restaurant row. Read-only from this backend's perspective.
#[derive(Debug, Clone)]
pub struct Restaurant {
    pub id: Uuid,
    pub name: String,
    /// Number the telephony platform dials in on; the key for call routing.
    pub platform_number: String,
}

/// An available menu item, used only for prompt construction.
#[derive(Debug, Clone)]
pub struct MenuItem {
    pub name: String,
    pub price: Decimal,
}

/// Read/write operations the reservation backend consumes.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Resolve the restaurant that owns a platform phone number.
    async fn find_restaurant_by_number(
        &self,
        number: &str,
    ) -> Result<Option<Restaurant>, StoreError>;

    /// Available menu items for a restaurant, for the system prompt.
    async fn list_available_menu_items(
        &self,
        restaurant_id: Uuid,
    ) -> Result<Vec<MenuItem>, StoreError>;

    /// Count confirmed reservations for (phone, restaurant) with
    /// `reserved_at` in `[from, to)`. Drives the daily cap.
    async fn count_confirmed_in_window(
        &self,
        phone: &str,
        restaurant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, StoreError>;

    /// Insert a confirmed reservation; the store assigns the identity.
    async fn insert_reservation(&self, new: &NewReservation) -> Result<Uuid, StoreError>;

    /// Confirmed reservations at one restaurant whose customer name contains
    /// `name` (case-insensitive), optionally narrowed by exact phone
    /// equality. Cancelled reservations are never returned, and bookings
    /// held at other restaurants are never visible.
    async fn find_confirmed_by_name(
        &self,
        restaurant_id: Uuid,
        name: &str,
        phone: Option<&str>,
    ) -> Result<Vec<Reservation>, StoreError>;

    /// Apply a partial update to one reservation.
    async fn update_reservation(
        &self,
        id: Uuid,
        patch: &ReservationPatch,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
pub mod memory {
    //! In-memory fake store for tests.

    use std::sync::Mutex;

    use super::*;
    use crate::reservations::ReservationStatus;

    #[derive(Default)]
    pub struct MemoryStore {
        pub restaurants: Vec<Restaurant>,
        pub menu: Vec<(Uuid, MenuItem)>,
        pub reservations: Mutex<Vec<Reservation>>,
        /// When set, every call fails; simulates a store outage.
        pub failing: bool,
    }

    impl MemoryStore {
        pub fn with_restaurant(restaurant: Restaurant) -> Self {
            Self {
                restaurants: vec![restaurant],
                ..Default::default()
            }
        }

        pub fn seed_reservation(&self, reservation: Reservation) {
            self.reservations.lock().unwrap().push(reservation);
        }

        fn check_failing(&self) -> Result<(), StoreError> {
            if self.failing {
                Err(StoreError::Pool("store unavailable".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl ReservationStore for MemoryStore {
        async fn find_restaurant_by_number(
            &self,
            number: &str,
        ) -> Result<Option<Restaurant>, StoreError> {
            self.check_failing()?;
            Ok(self
                .restaurants
                .iter()
                .find(|r| r.platform_number == number)
                .cloned())
        }

        async fn list_available_menu_items(
            &self,
            restaurant_id: Uuid,
        ) -> Result<Vec<MenuItem>, StoreError> {
            self.check_failing()?;
            Ok(self
                .menu
                .iter()
                .filter(|(id, _)| *id == restaurant_id)
                .map(|(_, item)| item.clone())
                .collect())
        }

        async fn count_confirmed_in_window(
            &self,
            phone: &str,
            restaurant_id: Uuid,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<i64, StoreError> {
            self.check_failing()?;
            let reservations = self.reservations.lock().unwrap();
            Ok(reservations
                .iter()
                .filter(|r| {
                    r.status == ReservationStatus::Confirmed
                        && r.restaurant_id == restaurant_id
                        && r.customer_phone.as_deref() == Some(phone)
                        && r.reserved_at >= from
                        && r.reserved_at < to
                })
                .count() as i64)
        }

        async fn insert_reservation(&self, new: &NewReservation) -> Result<Uuid, StoreError> {
            self.check_failing()?;
            let id = Uuid::new_v4();
            self.reservations.lock().unwrap().push(Reservation {
                id,
                restaurant_id: new.restaurant_id,
                customer_name: new.customer_name.clone(),
                customer_phone: Some(new.customer_phone.clone()),
                party_size: new.party_size,
                reserved_at: new.reserved_at,
                status: ReservationStatus::Confirmed,
                created_at: Utc::now(),
            });
            Ok(id)
        }

        async fn find_confirmed_by_name(
            &self,
            restaurant_id: Uuid,
            name: &str,
            phone: Option<&str>,
        ) -> Result<Vec<Reservation>, StoreError> {
            self.check_failing()?;
            let needle = name.to_lowercase();
            let reservations = self.reservations.lock().unwrap();
            Ok(reservations
                .iter()
                .filter(|r| {
                    r.status == ReservationStatus::Confirmed
                        && r.restaurant_id == restaurant_id
                        && r.customer_name.to_lowercase().contains(&needle)
                        && phone.is_none_or(|p| r.customer_phone.as_deref() == Some(p))
                })
                .cloned()
                .collect())
        }

        async fn update_reservation(
            &self,
            id: Uuid,
            patch: &ReservationPatch,
        ) -> Result<(), StoreError> {
            self.check_failing()?;
            let mut reservations = self.reservations.lock().unwrap();
            if let Some(reservation) = reservations.iter_mut().find(|r| r.id == id) {
                if let Some(size) = patch.party_size {
                    reservation.party_size = size;
                }
                if let Some(at) = patch.reserved_at {
                    reservation.reserved_at = at;
                }
                if let Some(status) = patch.status {
                    reservation.status = status;
                }
            }
            Ok(())
        }
    }
}
