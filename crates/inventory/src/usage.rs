//! Daily usage roll-up and trailing average.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use forgedesk_core::ItemId;

/// Length of the trailing average window, in days (inclusive of the as-of day).
pub const AVERAGE_WINDOW_DAYS: i64 = 30;

/// Decimal places kept on a cached average.
pub const AVERAGE_SCALE: u32 = 4;

/// Cumulative consumption of one item on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub item_id: ItemId,
    pub usage_date: NaiveDate,
    pub quantity_used: i64,
}

/// First day of the window ending on `as_of`.
pub fn window_start(as_of: NaiveDate) -> NaiveDate {
    as_of
        .checked_sub_days(Days::new((AVERAGE_WINDOW_DAYS - 1) as u64))
        .unwrap_or(NaiveDate::MIN)
}

/// Number of days the average is spread over: days since first recorded usage,
/// inclusive, capped to the window.
pub fn days_covered(first_usage: NaiveDate, as_of: NaiveDate) -> i64 {
    let since = (as_of - first_usage).num_days();
    (since + 1).clamp(1, AVERAGE_WINDOW_DAYS)
}

/// Average daily use for an item.
///
/// `first_usage` is the earliest day with any recorded usage; `None` means no
/// history at all and yields zero.
pub fn average_daily_use(
    total_in_window: i64,
    first_usage: Option<NaiveDate>,
    as_of: NaiveDate,
) -> Decimal {
    let Some(first) = first_usage else {
        return Decimal::ZERO;
    };
    let days = days_covered(first, as_of);
    (Decimal::from(total_in_window) / Decimal::from(days)).round_dp(AVERAGE_SCALE)
}
