//! Suppliers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgedesk_core::{DomainError, DomainResult, SupplierId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_phone: Option<String>,
    /// Used for items that carry no lead time of their own.
    pub default_lead_time_days: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSupplier {
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    #[serde(default)]
    pub default_lead_time_days: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl NewSupplier {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn build(self, now: DateTime<Utc>) -> DomainResult<Supplier> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("supplier name cannot be empty"));
        }
        if self.default_lead_time_days < 0 {
            return Err(DomainError::validation("default lead time cannot be negative"));
        }
        Ok(Supplier {
            id: SupplierId::new(),
            name,
            contact_name: clean(self.contact_name),
            contact_email: clean(self.contact_email),
            contact_phone: clean(self.contact_phone),
            default_lead_time_days: self.default_lead_time_days,
            notes: clean(self.notes),
            created_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_trims_and_drops_blank_contacts() {
        let supplier = NewSupplier {
            name: "  Acme Metals ".into(),
            contact_email: Some(" ".into()),
            default_lead_time_days: 10,
            ..NewSupplier::default()
        }
        .build(Utc::now())
        .unwrap();
        assert_eq!(supplier.name, "Acme Metals");
        assert_eq!(supplier.contact_email, None);
        assert_eq!(supplier.default_lead_time_days, 10);
    }

    #[test]
    fn build_rejects_blank_name_and_negative_lead_time() {
        assert!(matches!(
            NewSupplier::named(" ").build(Utc::now()),
            Err(DomainError::Validation(_))
        ));
        let mut supplier = NewSupplier::named("Acme");
        supplier.default_lead_time_days = -1;
        assert!(matches!(supplier.build(Utc::now()), Err(DomainError::Validation(_))));
    }
}
