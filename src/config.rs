//! Environment-driven configuration.
//!
//! Everything is loaded once at startup and passed down explicitly; nothing
//! reads the environment after `Settings::from_env` returns.

use std::env;

use chrono_tz::Tz;

use crate::error::ConfigError;

/// Database connection configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    url: String,
    /// Maximum number of pooled connections.
    pub pool_size: usize,
}

impl DatabaseConfig {
    /// Connection string for the store.
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// HTTP server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Restaurant-facing configuration.
#[derive(Debug, Clone)]
pub struct RestaurantConfig {
    /// Civil timezone used to interpret and render all reservation times.
    pub timezone: Tz,
    /// Platform number substituted when a payload carries no called number
    /// (browser-based test calls have no phone leg).
    pub fallback_number: Option<String>,
}

/// Full application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub restaurant: RestaurantConfig,
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;

        let pool_size = match env::var("DATABASE_POOL_SIZE") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                var: "DATABASE_POOL_SIZE",
                reason: format!("not a positive integer: {raw}"),
            })?,
            Err(_) => 8,
        };

        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                var: "PORT",
                reason: format!("not a valid port: {raw}"),
            })?,
            Err(_) => 8080,
        };

        let timezone = match env::var("RESTAURANT_TIMEZONE") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidVar {
                var: "RESTAURANT_TIMEZONE",
                reason: format!("unknown timezone: {raw}"),
            })?,
            Err(_) => chrono_tz::Europe::Paris,
        };

        let fallback_number = env::var("WEB_TEST_NUMBER").ok().filter(|n| !n.is_empty());

        Ok(Self {
            database: DatabaseConfig { url, pool_size },
            server: ServerConfig { host, port },
            restaurant: RestaurantConfig {
                timezone,
                fallback_number,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timezone_is_paris() {
        // from_env reads real env vars, so exercise the parse path directly.
        let tz: Tz = "Europe/Paris".parse().unwrap();
        assert_eq!(tz, chrono_tz::Europe::Paris);
    }

    #[test]
    fn database_url_is_required() {
        // Sanity check on the error shape rather than on env mutation, which
        // is process-global and races with other tests.
        let err = ConfigError::MissingVar("DATABASE_URL");
        assert!(err.to_string().contains("DATABASE_URL"));
    }
}
