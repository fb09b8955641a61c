//! Monthly active users

use crate::types::{DailyActivity, MauRow, YearMonth};
use std::collections::{BTreeMap, BTreeSet};

/// Count distinct users per month of filtered activity.
///
/// Months before `floor` (inclusive lower bound) are dropped. A user
/// active in three months counts toward all three; within one month they
/// count once however many days they were active.
pub fn mau_monthly(filtered: &[DailyActivity], floor: YearMonth) -> Vec<MauRow> {
    let mut users_by_month: BTreeMap<YearMonth, BTreeSet<&str>> = BTreeMap::new();
    for row in filtered {
        let month = YearMonth::from_date(row.activity_date);
        if month >= floor {
            users_by_month
                .entry(month)
                .or_default()
                .insert(row.user_id.as_str());
        }
    }

    users_by_month
        .into_iter()
        .map(|(year_month, users)| MauRow {
            year_month,
            mau: users.len() as u64,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn activity(user: &str, date: (i32, u32, u32)) -> DailyActivity {
        DailyActivity {
            user_id: user.to_string(),
            activity_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            version_prefix: None,
            event_count: 1,
        }
    }

    fn floor(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    #[test]
    fn test_distinct_users_per_month() {
        let filtered = vec![
            activity("u1", (2024, 10, 1)),
            activity("u1", (2024, 10, 15)),
            activity("u2", (2024, 10, 20)),
            activity("u1", (2024, 11, 2)),
        ];

        let rows = mau_monthly(&filtered, floor("2024-10"));
        assert_eq!(
            rows,
            vec![
                MauRow {
                    year_month: floor("2024-10"),
                    mau: 2
                },
                MauRow {
                    year_month: floor("2024-11"),
                    mau: 1
                },
            ]
        );
    }

    #[test]
    fn test_floor_month_itself_is_included() {
        let filtered = vec![activity("u1", (2024, 10, 1))];
        let rows = mau_monthly(&filtered, floor("2024-10"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mau, 1);
    }

    #[test]
    fn test_months_below_floor_are_dropped() {
        let filtered = vec![
            activity("u1", (2024, 9, 20)),
            activity("u1", (2024, 10, 2)),
        ];
        let rows = mau_monthly(&filtered, floor("2024-10"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year_month, floor("2024-10"));
    }

    #[test]
    fn test_empty_input_is_empty_result() {
        assert!(mau_monthly(&[], floor("2024-10")).is_empty());
    }
}
