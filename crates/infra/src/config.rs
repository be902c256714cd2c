//! Process configuration, read from the environment.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::error::{StoreResult, map_sqlx_error};
use crate::store::{InMemoryStore, InventoryStore, PostgresStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Postgres URL. Unset means the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub bind_addr: String,
    /// Only consulted by the in-memory store.
    pub reservations_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            database_max_connections: 5,
            bind_addr: "0.0.0.0:8080".to_string(),
            reservations_enabled: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            reservations_enabled: parse_or(
                &lookup,
                "FORGEDESK_RESERVATIONS",
                defaults.reservations_enabled,
            ),
        }
    }

    /// Open the configured store. Migrations are not run here.
    pub async fn connect_store(&self) -> StoreResult<Arc<dyn InventoryStore>> {
        match &self.database_url {
            Some(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(self.database_max_connections)
                    .connect(url)
                    .await
                    .map_err(|e| map_sqlx_error("connect", e))?;
                info!(max_connections = self.database_max_connections, "connected to postgres");
                Ok(Arc::new(PostgresStore::new(pool)))
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store");
                let store = if self.reservations_enabled {
                    InMemoryStore::new()
                } else {
                    InMemoryStore::without_reservations()
                };
                Ok(Arc::new(store))
            }
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = %default, "invalid config value; using default");
            default
        }),
    }
}
