//! Whole-inventory commitment summary.

use serde::{Deserialize, Serialize};

use crate::item::InventoryItem;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_stock: i64,
    pub total_committed: i64,
    /// Sum of per-item availability, with oversubscribed items counted as zero.
    pub total_available: i64,
    pub active_reservations: i64,
}

impl InventorySummary {
    pub fn from_items<'a>(
        items: impl IntoIterator<Item = &'a InventoryItem>,
        active_reservations: i64,
    ) -> Self {
        let mut summary = Self {
            active_reservations,
            ..Self::default()
        };
        for item in items {
            summary.total_stock += item.stock;
            summary.total_committed += item.committed_qty;
            summary.total_available += item.available_qty().max(0);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemDetails;
    use chrono::Utc;
    use forgedesk_core::ItemId;

    #[test]
    fn oversubscribed_items_do_not_reduce_total_available() {
        let mut a = InventoryItem::from_details(ItemId::new(), ItemDetails::new("A", "A"), Utc::now());
        a.stock = 50;
        a.committed_qty = 60;
        let mut b = InventoryItem::from_details(ItemId::new(), ItemDetails::new("B", "B"), Utc::now());
        b.stock = 10;
        b.committed_qty = 4;

        let summary = InventorySummary::from_items([&a, &b], 3);
        assert_eq!(summary.total_stock, 60);
        assert_eq!(summary.total_committed, 64);
        assert_eq!(summary.total_available, 6);
        assert_eq!(summary.active_reservations, 3);
    }
}
