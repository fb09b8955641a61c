//! New-user counts by month of first activity

use crate::types::{DailyActivity, NewUsersRow, YearMonth};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Count users by the month their activity began.
///
/// Each user's adoption month is the month of their earliest filtered
/// activity. Months before `floor` (inclusive lower bound) are dropped.
/// Output is sparse: a month with zero new users produces no row, which
/// matches the upstream reporting this table feeds.
pub fn new_users_monthly(filtered: &[DailyActivity], floor: YearMonth) -> Vec<NewUsersRow> {
    let mut first_seen: BTreeMap<&str, NaiveDate> = BTreeMap::new();
    for row in filtered {
        first_seen
            .entry(row.user_id.as_str())
            .and_modify(|first| *first = (*first).min(row.activity_date))
            .or_insert(row.activity_date);
    }

    let mut counts: BTreeMap<YearMonth, u64> = BTreeMap::new();
    for first in first_seen.into_values() {
        let month = YearMonth::from_date(first);
        if month >= floor {
            *counts.entry(month).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .map(|(year_month, count)| NewUsersRow { year_month, count })
        .collect()
}
