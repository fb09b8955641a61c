//! Command-category MAU
//!
//! Classifies raw command invocations by their first two tokens and
//! counts distinct sustained users per (month, category). Used twice per
//! run with disjoint allow-lists: once for plugin commands, once for
//! core commands.

use crate::types::{CategoryMauRow, CommandInvocation, YearMonth};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Derive a category label from command text: the first two
/// whitespace-delimited tokens, joined by a single space.
///
/// Total over all inputs. A command with fewer than two tokens yields the
/// trimmed command unchanged, which for an all-whitespace command is the
/// empty string; such labels simply never match an allow-list.
pub fn category_label(command: &str) -> String {
    let mut tokens = command.split_whitespace();
    match (tokens.next(), tokens.next()) {
        (Some(first), Some(second)) => format!("{} {}", first, second),
        _ => command.trim().to_string(),
    }
}

/// Count distinct sustained users per (month, category label).
///
/// Invocations are kept when the user is in the sustained set, the
/// invocation date is at or after `floor_date`, and the derived label is
/// in `allowlist`. Rows are ordered by month ascending, then
/// `unique_users` descending, then label, so identical inputs always
/// produce identical output.
pub fn category_mau(
    invocations: &[CommandInvocation],
    sustained: &BTreeSet<String>,
    floor_date: NaiveDate,
    allowlist: &[String],
) -> Vec<CategoryMauRow> {
    let mut users: BTreeMap<(YearMonth, String), BTreeSet<&str>> = BTreeMap::new();

    for invocation in invocations {
        let day = invocation.timestamp.date_naive();
        if day < floor_date {
            continue;
        }
        if !sustained.contains(&invocation.user_id) {
            continue;
        }
        let label = category_label(&invocation.command);
        if !allowlist.iter().any(|allowed| allowed == &label) {
            continue;
        }

        users
            .entry((YearMonth::from_date(day), label))
            .or_default()
            .insert(invocation.user_id.as_str());
    }

    let mut rows: Vec<CategoryMauRow> = users
        .into_iter()
        .map(|((year_month, category_label), users)| CategoryMauRow {
            year_month,
            category_label,
            unique_users: users.len() as u64,
        })
        .collect();

    rows.sort_by(|a, b| {
        a.year_month
            .cmp(&b.year_month)
            .then(b.unique_users.cmp(&a.unique_users))
            .then(a.category_label.cmp(&b.category_label))
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn invocation(user: &str, ts: &str, command: &str) -> CommandInvocation {
        CommandInvocation {
            user_id: user.to_string(),
            timestamp: chrono::DateTime::parse_from_rfc3339(ts)
                .unwrap()
                .with_timezone(&Utc),
            command: command.to_string(),
        }
    }

    fn sustained(users: &[&str]) -> BTreeSet<String> {
        users.iter().map(|u| u.to_string()).collect()
    }

    fn allowlist(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    fn floor() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
    }

    #[test]
    fn test_category_label_is_total() {
        assert_eq!(category_label("kedro run --pipeline x"), "kedro run");
        assert_eq!(category_label("kedro viz"), "kedro viz");
        assert_eq!(category_label("kedro"), "kedro");
        assert_eq!(category_label(""), "");
        assert_eq!(category_label("   "), "");
        assert_eq!(category_label("  kedro   run  "), "kedro run");
    }

    #[test]
    fn test_command_lands_only_in_matching_list() {
        let invocations = vec![invocation("u1", "2024-10-05T09:00:00Z", "kedro run --pipeline x")];
        let sustained = sustained(&["u1"]);

        let core = category_mau(&invocations, &sustained, floor(), &allowlist(&["kedro run"]));
        let plugin = category_mau(
            &invocations,
            &sustained,
            floor(),
            &allowlist(&["kedro mlflow"]),
        );

        assert_eq!(core.len(), 1);
        assert_eq!(core[0].category_label, "kedro run");
        assert_eq!(core[0].unique_users, 1);
        assert!(plugin.is_empty());
    }

    #[test]
    fn test_non_sustained_users_are_excluded() {
        let invocations = vec![invocation("drive-by", "2024-10-05T09:00:00Z", "kedro run")];
        let rows = category_mau(
            &invocations,
            &sustained(&["someone-else"]),
            floor(),
            &allowlist(&["kedro run"]),
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn test_floor_date_is_inclusive() {
        let invocations = vec![
            invocation("u1", "2024-10-01T00:00:00Z", "kedro run"),
            invocation("u1", "2024-09-30T23:59:59Z", "kedro run"),
        ];
        let rows = category_mau(
            &invocations,
            &sustained(&["u1"]),
            floor(),
            &allowlist(&["kedro run"]),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].year_month.to_string(), "2024-10");
    }

    #[test]
    fn test_users_counted_once_per_month_per_category() {
        let invocations = vec![
            invocation("u1", "2024-10-05T09:00:00Z", "kedro run --pipeline a"),
            invocation("u1", "2024-10-06T09:00:00Z", "kedro run --pipeline b"),
            invocation("u2", "2024-10-07T09:00:00Z", "kedro run"),
        ];
        let rows = category_mau(
            &invocations,
            &sustained(&["u1", "u2"]),
            floor(),
            &allowlist(&["kedro run"]),
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].unique_users, 2);
    }

    #[test]
    fn test_rows_ordered_by_month_then_count_desc() {
        let invocations = vec![
            invocation("u1", "2024-10-05T09:00:00Z", "kedro viz"),
            invocation("u2", "2024-10-05T10:00:00Z", "kedro viz"),
            invocation("u1", "2024-10-06T09:00:00Z", "kedro run"),
            invocation("u1", "2024-11-01T09:00:00Z", "kedro run"),
        ];
        let rows = category_mau(
            &invocations,
            &sustained(&["u1", "u2"]),
            floor(),
            &allowlist(&["kedro run", "kedro viz"]),
        );

        let flat: Vec<(String, String, u64)> = rows
            .iter()
            .map(|r| {
                (
                    r.year_month.to_string(),
                    r.category_label.clone(),
                    r.unique_users,
                )
            })
            .collect();
        assert_eq!(
            flat,
            vec![
                ("2024-10".to_string(), "kedro viz".to_string(), 2),
                ("2024-10".to_string(), "kedro run".to_string(), 1),
                ("2024-11".to_string(), "kedro run".to_string(), 1),
            ]
        );
    }
}
