//! Optional subsystems, resolved once at startup.

use serde::{Deserialize, Serialize};
use tracing::warn;

use forgedesk_core::{DomainError, DomainResult};

use crate::store::InventoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Job reservation tables are present.
    pub reservations: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self { reservations: true }
    }

    pub fn without_reservations() -> Self {
        Self { reservations: false }
    }

    pub fn require_reservations(&self) -> DomainResult<()> {
        if self.reservations {
            Ok(())
        } else {
            Err(DomainError::unsupported(
                "job reservations are not available in this deployment",
            ))
        }
    }
}

/// Ask the store what it supports.
///
/// A detection failure disables the optional subsystems instead of failing
/// startup.
pub async fn detect(store: &dyn InventoryStore) -> Capabilities {
    match store.detect_capabilities().await {
        Ok(caps) => {
            if !caps.reservations {
                warn!("job reservation tables not found; reservation features disabled");
            }
            caps
        }
        Err(err) => {
            warn!(error = %err, "capability detection failed; reservation features disabled");
            Capabilities::without_reservations()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[test]
    fn missing_reservations_is_unsupported() {
        let err = Capabilities::without_reservations()
            .require_reservations()
            .unwrap_err();
        assert!(matches!(err, DomainError::UnsupportedFeature(_)));
        assert!(Capabilities::all().require_reservations().is_ok());
    }

    #[tokio::test]
    async fn detection_reflects_the_store() {
        let store = InMemoryStore::new();
        assert_eq!(detect(&store).await, Capabilities::all());

        let store = InMemoryStore::without_reservations();
        assert_eq!(detect(&store).await, Capabilities::without_reservations());
    }
}
