//! PostgreSQL implementation of the reservation store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::NoTls;
use tokio_postgres::types::ToSql;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::db::{MenuItem, ReservationStore, Restaurant};
use crate::error::StoreError;
use crate::reservations::{NewReservation, Reservation, ReservationPatch, ReservationStatus};

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// Store backed by a Postgres connection pool.
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    /// Create a new store and verify the database is reachable.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let mut cfg = Config::new();
        cfg.url = Some(config.url().to_string());
        cfg.pool = Some(deadpool_postgres::PoolConfig {
            max_size: config.pool_size,
            ..Default::default()
        });

        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::Pool(e.to_string()))?;

        // Test connection
        let _ = pool.get().await?;

        Ok(Self { pool })
    }

    /// Run embedded schema migrations.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        let mut conn = self.pool.get().await?;
        let report = embedded::migrations::runner()
            .run_async(&mut **conn)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        for migration in report.applied_migrations() {
            tracing::info!(version = migration.version(), name = migration.name(), "applied migration");
        }
        Ok(())
    }

    async fn conn(&self) -> Result<deadpool_postgres::Object, StoreError> {
        Ok(self.pool.get().await?)
    }
}

fn row_to_reservation(row: &tokio_postgres::Row) -> Result<Reservation, StoreError> {
    let status_raw: String = row.get("status");
    let status = ReservationStatus::parse(&status_raw)
        .ok_or_else(|| StoreError::Decode(format!("unknown reservation status: {status_raw}")))?;

    Ok(Reservation {
        id: row.get("id"),
        restaurant_id: row.get("restaurant_id"),
        customer_name: row.get("customer_name"),
        customer_phone: row.get("customer_phone"),
        party_size: row.get("party_size"),
        reserved_at: row.get("reserved_at"),
        status,
        created_at: row.get("created_at"),
    })
}

const RESERVATION_COLUMNS: &str =
    "id, restaurant_id, customer_name, customer_phone, party_size, reserved_at, status, created_at";

/// Escapes LIKE metacharacters so a caller-supplied name is matched
/// literally inside the ILIKE pattern.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn find_restaurant_by_number(
        &self,
        number: &str,
    ) -> Result<Option<Restaurant>, StoreError> {
        let conn = self.conn().await?;
        let row = conn
            .query_opt(
                "SELECT id, name, platform_number FROM restaurants WHERE platform_number = $1",
                &[&number],
            )
            .await?;

        Ok(row.map(|row| Restaurant {
            id: row.get("id"),
            name: row.get("name"),
            platform_number: row.get("platform_number"),
        }))
    }

    async fn list_available_menu_items(
        &self,
        restaurant_id: Uuid,
    ) -> Result<Vec<MenuItem>, StoreError> {
        let conn = self.conn().await?;
        let rows = conn
            .query(
                "SELECT name, price FROM menu_items
                 WHERE restaurant_id = $1 AND is_available
                 ORDER BY name",
                &[&restaurant_id],
            )
            .await?;

        Ok(rows
            .iter()
            .map(|row| MenuItem {
                name: row.get("name"),
                price: row.get("price"),
            })
            .collect())
    }

    async fn count_confirmed_in_window(
        &self,
        phone: &str,
        restaurant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, StoreError> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "SELECT COUNT(*) FROM reservations
                 WHERE customer_phone = $1 AND restaurant_id = $2
                   AND status = 'confirmed'
                   AND reserved_at >= $3 AND reserved_at < $4",
                &[&phone, &restaurant_id, &from, &to],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn insert_reservation(&self, new: &NewReservation) -> Result<Uuid, StoreError> {
        let conn = self.conn().await?;
        let row = conn
            .query_one(
                "INSERT INTO reservations
                   (restaurant_id, customer_name, customer_phone, party_size, reserved_at, status)
                 VALUES ($1, $2, $3, $4, $5, 'confirmed')
                 RETURNING id",
                &[
                    &new.restaurant_id,
                    &new.customer_name,
                    &new.customer_phone,
                    &new.party_size,
                    &new.reserved_at,
                ],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn find_confirmed_by_name(
        &self,
        restaurant_id: Uuid,
        name: &str,
        phone: Option<&str>,
    ) -> Result<Vec<Reservation>, StoreError> {
        let conn = self.conn().await?;
        let pattern = escape_like(name);
        let rows = match phone {
            Some(phone) => {
                let sql = format!(
                    "SELECT {RESERVATION_COLUMNS} FROM reservations
                     WHERE status = 'confirmed'
                       AND restaurant_id = $1
                       AND customer_name ILIKE '%' || $2 || '%'
                       AND customer_phone = $3
                     ORDER BY reserved_at"
                );
                conn.query(sql.as_str(), &[&restaurant_id, &pattern, &phone])
                    .await?
            }
            None => {
                let sql = format!(
                    "SELECT {RESERVATION_COLUMNS} FROM reservations
                     WHERE status = 'confirmed'
                       AND restaurant_id = $1
                       AND customer_name ILIKE '%' || $2 || '%'
                     ORDER BY reserved_at"
                );
                conn.query(sql.as_str(), &[&restaurant_id, &pattern]).await?
            }
        };

        rows.iter().map(row_to_reservation).collect()
    }

    async fn update_reservation(
        &self,
        id: Uuid,
        patch: &ReservationPatch,
    ) -> Result<(), StoreError> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut assignments: Vec<String> = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![&id];

        if let Some(size) = &patch.party_size {
            params.push(size);
            assignments.push(format!("party_size = ${}", params.len()));
        }
        if let Some(at) = &patch.reserved_at {
            params.push(at);
            assignments.push(format!("reserved_at = ${}", params.len()));
        }
        let status_text;
        if let Some(status) = &patch.status {
            status_text = status.as_str();
            params.push(&status_text);
            assignments.push(format!("status = ${}", params.len()));
        }

        let sql = format!(
            "UPDATE reservations SET {} WHERE id = $1",
            assignments.join(", ")
        );

        let conn = self.conn().await?;
        conn.execute(sql.as_str(), &params).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::escape_like;

    #[test]
    fn escape_like_neutralises_wildcards() {
        assert_eq!(escape_like("Martin"), "Martin");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
