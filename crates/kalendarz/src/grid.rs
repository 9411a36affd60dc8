//! Month grid generation.
//!
//! A month is laid out as full Monday..Sunday weeks: the grid starts on the
//! Monday on or before the 1st and ends on the Sunday on or after the last day,
//! so leading and trailing cells belong to the neighbouring months.

use chrono::{Datelike, Days, NaiveDate};
use std::collections::HashSet;
use tracing::warn;

use crate::types::{DateKey, DayCell, WeekRow, YearMonth};

/// Monday on or before `date`, `None` past the start of chrono's range.
pub fn week_start(date: NaiveDate) -> Option<NaiveDate> {
    let offset = date.weekday().num_days_from_monday() as u64;
    date.checked_sub_days(Days::new(offset))
}

/// Sunday on or after `date`, `None` past the end of chrono's range.
pub fn week_end(date: NaiveDate) -> Option<NaiveDate> {
    let offset = 6 - date.weekday().num_days_from_monday() as u64;
    date.checked_add_days(Days::new(offset))
}

/// Build the week rows for the month containing `reference`.
///
/// The result always has 4, 5 or 6 rows, except for the first and last month
/// chrono can represent when their padding weeks fall outside its range: those
/// yield no rows. `today` is compared by calendar date only, so pass
/// `Local::now().date_naive()` or a fixed date in tests.
pub fn build_grid(
    reference: NaiveDate,
    offer_dates: &HashSet<DateKey>,
    order_dates: &HashSet<DateKey>,
    today: NaiveDate,
) -> Vec<WeekRow> {
    let month = YearMonth::of(reference);
    let (Some(grid_start), Some(grid_end)) =
        (week_start(month.first_day()), week_end(month.last_day()))
    else {
        warn!(month = %month, "Month grid falls outside the supported date range");
        return Vec::new();
    };

    let cell = |date: NaiveDate| {
        let key = DateKey::new(date);
        DayCell {
            day_label: format!("{:02}", date.day()),
            key,
            is_today: date == today,
            has_offer: offer_dates.contains(&key),
            has_order: order_dates.contains(&key),
            in_current_month: month.contains(date),
        }
    };

    grid_start
        .iter_weeks()
        .take_while(|monday| *monday <= grid_end)
        .map(|monday| WeekRow {
            days: std::array::from_fn(|i| cell(monday + Days::new(i as u64))),
        })
        .collect()
}
