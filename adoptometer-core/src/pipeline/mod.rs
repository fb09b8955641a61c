//! The adoption metrics aggregation pipeline
//!
//! Five sub-stages executing in dependency order, each a pure function
//! taking and returning immutable tabular values:
//!
//! ```text
//! Events ──► daily_activity ──► user_lifespans ──► sustained_users
//!                │                                       │
//!                └────────────► filtered_activity ◄──────┘
//!                                      │
//!                      ┌───────────────┼───────────────────┐
//!                      ▼               ▼                   ▼
//!              new_users_monthly   mau_monthly     category_mau × 2
//!                                              (CommandInvocations joined
//!                                               to the sustained set)
//! ```
//!
//! Stages 1–4 form a strict sequential chain. The four stage-5
//! projections only read their inputs and are mutually independent. A run
//! is a pure function of its inputs: identical events, invocations, and
//! configuration produce identical output rows, so reruns are safe.

use crate::config::Config;
use crate::error::Result;
use crate::metrics;
use crate::source::ActivitySource;
use crate::types::{
    ActivityReport, AdoptionReport, DailyActivity, Event, UserLifespan,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// Stage 1: collapse raw events into one row per (user, day).
///
/// Events before `start_date` and events flagged as CI are dropped;
/// an absent CI flag counts as "not CI". Output is sorted by
/// (date, user) for deterministic reruns.
pub fn daily_activity(events: &[Event], start_date: NaiveDate) -> Vec<DailyActivity> {
    let mut groups: BTreeMap<(NaiveDate, String), (u64, Option<String>)> = BTreeMap::new();

    for event in events {
        if matches!(event.is_ci, Some(true)) {
            continue;
        }
        let day = event.timestamp.date_naive();
        if day < start_date {
            continue;
        }

        let prefix = event.project_version.as_deref().map(version_prefix);
        let entry = groups
            .entry((day, event.user_id.clone()))
            .or_insert((0, None));
        entry.0 += 1;
        // A missing version never beats a present one
        if prefix > entry.1 {
            entry.1 = prefix;
        }
    }

    groups
        .into_iter()
        .map(
            |((activity_date, user_id), (event_count, version_prefix))| DailyActivity {
                user_id,
                activity_date,
                version_prefix,
                event_count,
            },
        )
        .collect()
}

/// First four characters of a version string.
fn version_prefix(version: &str) -> String {
    version.chars().take(4).collect()
}

/// Stage 2: first and last observed activity day per user.
///
/// Pure aggregation, no filtering. One row per distinct user, sorted by
/// user id.
pub fn user_lifespans(daily: &[DailyActivity]) -> Vec<UserLifespan> {
    let mut spans: BTreeMap<&str, (NaiveDate, NaiveDate)> = BTreeMap::new();

    for row in daily {
        spans
            .entry(row.user_id.as_str())
            .and_modify(|(first, last)| {
                *first = (*first).min(row.activity_date);
                *last = (*last).max(row.activity_date);
            })
            .or_insert((row.activity_date, row.activity_date));
    }

    spans
        .into_iter()
        .map(|(user_id, (first_seen, last_seen))| UserLifespan {
            user_id: user_id.to_string(),
            first_seen,
            last_seen,
        })
        .collect()
}

/// Stage 3: the adoption-noise filter.
///
/// Keeps users whose activity span is **strictly greater** than
/// `threshold_days`. The exclusive comparison is policy: it silently
/// determines which users count as adopters everywhere downstream, which
/// is why the threshold lives in configuration rather than here.
pub fn sustained_users(lifespans: &[UserLifespan], threshold_days: i64) -> BTreeSet<String> {
    lifespans
        .iter()
        .filter(|lifespan| lifespan.span_days() > threshold_days)
        .map(|lifespan| lifespan.user_id.clone())
        .collect()
}

/// Stage 4: restrict daily activity to sustained users.
///
/// Blank user ids never qualify, guarding against malformed join keys.
/// The result is the canonical "real user activity" table shared by every
/// activity-based metric.
pub fn filtered_activity(
    daily: &[DailyActivity],
    sustained: &BTreeSet<String>,
) -> Vec<DailyActivity> {
    daily
        .iter()
        .filter(|row| !row.user_id.trim().is_empty() && sustained.contains(&row.user_id))
        .cloned()
        .collect()
}

/// Run the full pipeline and produce the canonical four-table report.
///
/// Validates configuration before touching the source; an invalid config
/// never executes a query. No partial output: any stage error aborts the
/// whole run.
pub fn run<S: ActivitySource + ?Sized>(source: &S, config: &Config) -> Result<AdoptionReport> {
    config.validate()?;

    let events = source.events()?;
    let invocations = source.command_invocations()?;
    tracing::info!(
        events = events.len(),
        invocations = invocations.len(),
        "Loaded raw telemetry"
    );

    let daily = daily_activity(&events, config.aggregation.start_date);
    let lifespans = user_lifespans(&daily);
    let sustained = sustained_users(&lifespans, config.aggregation.sustained_threshold_days);
    let filtered = filtered_activity(&daily, &sustained);
    tracing::debug!(
        daily_rows = daily.len(),
        users = lifespans.len(),
        sustained = sustained.len(),
        filtered_rows = filtered.len(),
        "Derived sustained-user activity"
    );

    let report = AdoptionReport {
        new_users_monthly: metrics::new_users_monthly(
            &filtered,
            config.aggregation.new_user_floor_month,
        ),
        mau_monthly: metrics::mau_monthly(&filtered, config.aggregation.mau_floor_month),
        plugin_category_mau: metrics::category_mau(
            &invocations,
            &sustained,
            config.aggregation.command_floor_date,
            &config.categories.plugin_categories,
        ),
        core_category_mau: metrics::category_mau(
            &invocations,
            &sustained,
            config.aggregation.command_floor_date,
            &config.categories.core_categories,
        ),
    };

    tracing::info!(
        new_user_months = report.new_users_monthly.len(),
        mau_months = report.mau_monthly.len(),
        plugin_rows = report.plugin_category_mau.len(),
        core_rows = report.core_category_mau.len(),
        "Adoption report complete"
    );

    Ok(report)
}

/// Run only stages 1–4 plus the two activity-derived projections.
///
/// The two-table variant predates the command-category metrics; it reuses
/// the same stage functions as [`run`], so the variants cannot drift.
pub fn run_adoption_only<S: ActivitySource + ?Sized>(
    source: &S,
    config: &Config,
) -> Result<ActivityReport> {
    config.validate()?;

    let events = source.events()?;
    let daily = daily_activity(&events, config.aggregation.start_date);
    let lifespans = user_lifespans(&daily);
    let sustained = sustained_users(&lifespans, config.aggregation.sustained_threshold_days);
    let filtered = filtered_activity(&daily, &sustained);

    Ok(ActivityReport {
        new_users_monthly: metrics::new_users_monthly(
            &filtered,
            config.aggregation.new_user_floor_month,
        ),
        mau_monthly: metrics::mau_monthly(&filtered, config.aggregation.mau_floor_month),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemorySource;
    use chrono::{TimeZone, Utc};

    fn event(user: &str, ts: &str) -> Event {
        versioned_event(user, ts, None, None)
    }

    fn versioned_event(
        user: &str,
        ts: &str,
        version: Option<&str>,
        is_ci: Option<bool>,
    ) -> Event {
        Event {
            user_id: user.to_string(),
            timestamp: chrono::DateTime::parse_from_rfc3339(ts)
                .unwrap()
                .with_timezone(&Utc),
            project_version: version.map(|v| v.to_string()),
            is_ci,
        }
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
    }

    #[test]
    fn test_daily_activity_groups_by_user_day() {
        let events = vec![
            event("u1", "2024-09-01T08:00:00Z"),
            event("u1", "2024-09-01T17:30:00Z"),
            event("u1", "2024-09-02T09:00:00Z"),
            event("u2", "2024-09-01T12:00:00Z"),
        ];

        let daily = daily_activity(&events, start());
        assert_eq!(daily.len(), 3);

        let u1_day1 = daily
            .iter()
            .find(|r| {
                r.user_id == "u1"
                    && r.activity_date == NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
            })
            .unwrap();
        assert_eq!(u1_day1.event_count, 2);
    }

    #[test]
    fn test_daily_activity_single_event_on_boundary_date() {
        let events = vec![event("u1", "2024-09-01T00:00:00Z")];
        let daily = daily_activity(&events, start());
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].event_count, 1);
    }

    #[test]
    fn test_daily_activity_excludes_ci_and_pre_start() {
        let events = vec![
            versioned_event("ci-bot", "2024-09-05T10:00:00Z", None, Some(true)),
            event("early", "2024-08-31T23:59:59Z"),
            versioned_event("human", "2024-09-05T10:00:00Z", None, Some(false)),
        ];

        let daily = daily_activity(&events, start());
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].user_id, "human");
    }

    #[test]
    fn test_daily_activity_takes_max_version_prefix() {
        let events = vec![
            versioned_event("u1", "2024-09-01T08:00:00Z", Some("0.19.8"), None),
            versioned_event("u1", "2024-09-01T09:00:00Z", Some("0.20.1"), None),
            versioned_event("u1", "2024-09-01T10:00:00Z", None, None),
        ];

        let daily = daily_activity(&events, start());
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].version_prefix.as_deref(), Some("0.20"));
    }

    #[test]
    fn test_lifespans_min_max() {
        let events = vec![
            event("u1", "2024-09-12T10:00:00Z"),
            event("u1", "2024-09-01T10:00:00Z"),
            event("u1", "2024-09-05T10:00:00Z"),
        ];
        let daily = daily_activity(&events, start());
        let lifespans = user_lifespans(&daily);

        assert_eq!(lifespans.len(), 1);
        assert_eq!(
            lifespans[0].first_seen,
            NaiveDate::from_ymd_opt(2024, 9, 1).unwrap()
        );
        assert_eq!(
            lifespans[0].last_seen,
            NaiveDate::from_ymd_opt(2024, 9, 12).unwrap()
        );
    }

    #[test]
    fn test_sustained_threshold_is_exclusive() {
        // u1: span 11 days > 8 -> sustained. u2: span 4 days -> excluded.
        // u3: span exactly 8 days -> excluded (strictly greater required).
        let events = vec![
            event("u1", "2024-09-01T10:00:00Z"),
            event("u1", "2024-09-12T10:00:00Z"),
            event("u2", "2024-09-01T10:00:00Z"),
            event("u2", "2024-09-05T10:00:00Z"),
            event("u3", "2024-09-01T10:00:00Z"),
            event("u3", "2024-09-09T10:00:00Z"),
        ];
        let daily = daily_activity(&events, start());
        let sustained = sustained_users(&user_lifespans(&daily), 8);

        assert!(sustained.contains("u1"));
        assert!(!sustained.contains("u2"));
        assert!(!sustained.contains("u3"));
    }

    #[test]
    fn test_raising_threshold_never_grows_sustained_set() {
        let events = vec![
            event("u1", "2024-09-01T10:00:00Z"),
            event("u1", "2024-09-12T10:00:00Z"),
            event("u2", "2024-09-01T10:00:00Z"),
            event("u2", "2024-09-20T10:00:00Z"),
            event("u3", "2024-09-01T10:00:00Z"),
            event("u3", "2024-09-03T10:00:00Z"),
        ];
        let lifespans = user_lifespans(&daily_activity(&events, start()));

        let mut previous_len = usize::MAX;
        for threshold in 0..30 {
            let set = sustained_users(&lifespans, threshold);
            assert!(set.len() <= previous_len);
            previous_len = set.len();
        }
    }

    #[test]
    fn test_filtered_activity_drops_blank_users() {
        let daily = vec![
            DailyActivity {
                user_id: "u1".to_string(),
                activity_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
                version_prefix: None,
                event_count: 1,
            },
            DailyActivity {
                user_id: "  ".to_string(),
                activity_date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
                version_prefix: None,
                event_count: 1,
            },
        ];
        let sustained: BTreeSet<String> =
            ["u1", "  "].iter().map(|s| s.to_string()).collect();

        let filtered = filtered_activity(&daily, &sustained);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].user_id, "u1");
    }

    #[test]
    fn test_run_is_idempotent() {
        let source = InMemorySource::new(
            vec![
                event("u1", "2024-11-01T10:00:00Z"),
                event("u1", "2024-11-20T10:00:00Z"),
                event("u2", "2024-11-03T10:00:00Z"),
                event("u2", "2024-12-01T10:00:00Z"),
            ],
            vec![crate::types::CommandInvocation {
                user_id: "u1".to_string(),
                timestamp: Utc.with_ymd_and_hms(2024, 11, 2, 9, 0, 0).unwrap(),
                command: "kedro run".to_string(),
            }],
        );
        let config = Config::default();

        let first = run(&source, &config).unwrap();
        let second = run(&source, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_rejects_invalid_config_before_querying() {
        let source = InMemorySource::default();
        let mut config = Config::default();
        config.aggregation.sustained_threshold_days = -3;

        let err = run(&source, &config).unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));
    }

    #[test]
    fn test_new_users_never_outside_sustained_set() {
        let events = vec![
            // sustained adopter
            event("u1", "2024-11-01T10:00:00Z"),
            event("u1", "2024-11-20T10:00:00Z"),
            // one-off trial, must not earn adoption credit
            event("u2", "2024-11-05T10:00:00Z"),
        ];
        let source = InMemorySource::new(events.clone(), vec![]);
        let config = Config::default();

        let report = run(&source, &config).unwrap();
        let daily = daily_activity(&events, config.aggregation.start_date);
        let sustained =
            sustained_users(&user_lifespans(&daily), config.aggregation.sustained_threshold_days);

        let total_new: u64 = report.new_users_monthly.iter().map(|r| r.count).sum();
        assert_eq!(total_new as usize, sustained.len());
        assert_eq!(total_new, 1);
    }

    #[test]
    fn test_adoption_only_variant_matches_full_report() {
        let source = InMemorySource::new(
            vec![
                event("u1", "2024-11-01T10:00:00Z"),
                event("u1", "2024-11-20T10:00:00Z"),
            ],
            vec![],
        );
        let config = Config::default();

        let full = run(&source, &config).unwrap();
        let adoption = run_adoption_only(&source, &config).unwrap();
        assert_eq!(adoption.new_users_monthly, full.new_users_monthly);
        assert_eq!(adoption.mau_monthly, full.mau_monthly);
    }
}
