//! Startup wiring: config -> store -> migrations -> capabilities -> engines.

use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use forgedesk_infra::capabilities::{self, Capabilities};
use forgedesk_infra::store::InMemoryStore;
use forgedesk_infra::{AppConfig, Engines, InventoryStore};

/// Connect the configured store, migrate it once and resolve capabilities once.
pub async fn build_engines(config: &AppConfig) -> anyhow::Result<Engines> {
    let store = config
        .connect_store()
        .await
        .context("failed to open the inventory store")?;
    store.migrate().await.context("failed to run migrations")?;

    let capabilities = capabilities::detect(store.as_ref()).await;
    info!(reservations = capabilities.reservations, "capabilities resolved");

    Ok(Engines::new(store, capabilities))
}

/// Engines over a fresh in-memory store.
pub fn in_memory_engines(reservations: bool) -> Engines {
    if reservations {
        Engines::new(Arc::new(InMemoryStore::new()), Capabilities::all())
    } else {
        Engines::new(
            Arc::new(InMemoryStore::without_reservations()),
            Capabilities::without_reservations(),
        )
    }
}
