//! Daily usage roll-up and cached average daily use.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use forgedesk_core::ItemId;
use forgedesk_inventory::usage::{average_daily_use, window_start};

use super::finish;
use crate::error::EngineResult;
use crate::store::{InventoryStore, StoreTx};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemAverage {
    pub item_id: ItemId,
    pub average_daily_use: Decimal,
}

/// Add consumption to each item's total for `date`. Non-positive quantities are skipped.
pub async fn record_daily_usage(
    tx: &mut dyn StoreTx,
    date: NaiveDate,
    usage: &BTreeMap<ItemId, i64>,
) -> EngineResult<()> {
    for (item_id, quantity) in usage {
        if *quantity <= 0 {
            continue;
        }
        tx.add_daily_usage(*item_id, date, *quantity).await?;
    }
    Ok(())
}

/// Recompute and store the trailing average for `ids` as of `as_of`.
///
/// Unknown ids are skipped. Items without any usage history get zero.
#[instrument(skip(tx, ids), fields(items = ids.len()), err)]
pub async fn recalculate_averages_in(
    tx: &mut dyn StoreTx,
    ids: &[ItemId],
    as_of: NaiveDate,
) -> EngineResult<Vec<ItemAverage>> {
    let items = tx.lock_items(ids).await?;
    let ids: Vec<ItemId> = items.iter().map(|item| item.id).collect();

    let totals = tx.usage_totals(&ids, window_start(as_of), as_of).await?;
    let first_days = tx.first_usage_dates(&ids, as_of).await?;

    let mut averages = Vec::with_capacity(items.len());
    for item in &items {
        let total = totals.get(&item.id).copied().unwrap_or(0);
        let average = average_daily_use(total, first_days.get(&item.id).copied(), as_of);
        if item.average_daily_use != Some(average) {
            tx.set_average_daily_use(item.id, average).await?;
        }
        averages.push(ItemAverage {
            item_id: item.id,
            average_daily_use: average,
        });
    }
    Ok(averages)
}

async fn recalculate(
    store: &dyn InventoryStore,
    ids: &[ItemId],
    as_of: NaiveDate,
) -> EngineResult<Vec<ItemAverage>> {
    let mut tx = store.begin().await?;
    let result = recalculate_averages_in(tx.as_mut(), ids, as_of).await;
    finish(tx, result).await
}

/// Refresh averages once the unit of work that recorded the usage has committed.
pub(crate) async fn refresh_after_commit(store: &dyn InventoryStore, ids: &[ItemId], as_of: NaiveDate) {
    if ids.is_empty() {
        return;
    }
    match recalculate(store, ids, as_of).await {
        Ok(averages) => debug!(items = averages.len(), "average daily use refreshed"),
        Err(err) => warn!(error = %err, items = ids.len(), "average daily use refresh failed"),
    }
}

#[derive(Clone)]
pub struct UsageEngine {
    store: Arc<dyn InventoryStore>,
}

impl UsageEngine {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// Recalculate the cached average for `ids`. Idempotent.
    pub async fn recalculate_averages(
        &self,
        ids: &[ItemId],
        as_of: NaiveDate,
    ) -> EngineResult<Vec<ItemAverage>> {
        recalculate(self.store.as_ref(), ids, as_of).await
    }

    /// Recalculate the cached average for every item.
    pub async fn recalculate_all(&self, as_of: NaiveDate) -> EngineResult<Vec<ItemAverage>> {
        let mut tx = self.store.begin().await?;
        let result = recalculate_all_in(tx.as_mut(), as_of).await;
        finish(tx, result).await
    }
}

pub(crate) async fn recalculate_all_in(
    tx: &mut dyn StoreTx,
    as_of: NaiveDate,
) -> EngineResult<Vec<ItemAverage>> {
    let ids: Vec<ItemId> = tx.list_items().await?.into_iter().map(|item| item.id).collect();
    recalculate_averages_in(tx, &ids, as_of).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engines;
    use crate::engine::test_support::{engines, seed_item};
    use chrono::{Days, Utc};
    use rust_decimal_macros::dec;

    async fn record(engines: &Engines, item_id: ItemId, date: NaiveDate, qty: i64) {
        let mut tx = engines.usage.store.begin().await.unwrap();
        record_daily_usage(tx.as_mut(), date, &BTreeMap::from([(item_id, qty)]))
            .await
            .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn average_spreads_over_days_since_first_use() {
        let engines = engines();
        let item = seed_item(&engines, "U-1", 100, 0).await;
        let today = Utc::now().date_naive();
        let nine_days_ago = today.checked_sub_days(Days::new(9)).unwrap();

        record(&engines, item.item.id, nine_days_ago, 12).await;
        record(&engines, item.item.id, today, 8).await;

        let averages = engines
            .usage
            .recalculate_averages(&[item.item.id], today)
            .await
            .unwrap();
        assert_eq!(averages[0].average_daily_use, dec!(2));
    }

    #[tokio::test]
    async fn usage_outside_the_window_is_ignored_but_caps_the_divisor() {
        let engines = engines();
        let item = seed_item(&engines, "U-2", 100, 0).await;
        let today = Utc::now().date_naive();

        record(&engines, item.item.id, today.checked_sub_days(Days::new(45)).unwrap(), 500).await;
        record(&engines, item.item.id, today, 15).await;

        let averages = engines
            .usage
            .recalculate_averages(&[item.item.id], today)
            .await
            .unwrap();
        assert_eq!(averages[0].average_daily_use, dec!(0.5));
    }

    #[tokio::test]
    async fn no_history_averages_zero_and_recalculation_is_idempotent() {
        let engines = engines();
        let item = seed_item(&engines, "U-3", 0, 0).await;
        let today = Utc::now().date_naive();
        assert_eq!(item.item.average_daily_use, None);

        let first = engines.usage.recalculate_all(today).await.unwrap();
        let second = engines.usage.recalculate_all(today).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].average_daily_use, Decimal::ZERO);

        let stored = engines.catalog.get_item(item.item.id).await.unwrap();
        assert_eq!(stored.item.average_daily_use, Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn non_positive_usage_is_not_recorded() {
        let engines = engines();
        let item = seed_item(&engines, "U-4", 10, 0).await;
        let today = Utc::now().date_naive();
        record(&engines, item.item.id, today, 0).await;
        record(&engines, item.item.id, today, -5).await;

        let averages = engines
            .usage
            .recalculate_averages(&[item.item.id], today)
            .await
            .unwrap();
        assert_eq!(averages[0].average_daily_use, Decimal::ZERO);
    }
}
