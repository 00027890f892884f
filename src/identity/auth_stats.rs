//! Per-user authentication statistics.
//!
//! [`AuthStatsAggregator`] folds [`AuthEvent`]s into one [`AuthStats`] per
//! user name: a count plus earliest and latest timestamp for each outcome,
//! and the number of whole days since the latest success.
//!
//! The fold is order independent for distinct timestamps. When two events
//! of the same user and outcome carry the same instant, the one folded
//! first stays (comparisons are strict), which only shows when the two
//! spell the instant differently, e.g. `Z` vs `+00:00`.
//!
//! "Now" for `days_since_success` is fixed when the aggregator is created,
//! so every record in one run is measured against the same instant.

use super::types::{AuthEvent, Outcome, Timestamp};
use crate::utils::time::days_since;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Count and time range of one outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeStats {
    pub count: u64,
    pub earliest: Option<Timestamp>,
    pub latest: Option<Timestamp>,
}

impl OutcomeStats {
    /// Record one event time. Returns true when `latest` changed.
    fn record(&mut self, time: &Timestamp) -> bool {
        self.count += 1;

        if self.earliest.as_ref().map_or(true, |e| time.at < e.at) {
            self.earliest = Some(time.clone());
        }

        if self.latest.as_ref().map_or(true, |l| time.at > l.at) {
            self.latest = Some(time.clone());
            return true;
        }

        false
    }
}

/// Authentication summary for one user name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStats {
    pub user_name: String,
    pub success: OutcomeStats,
    pub failure: OutcomeStats,
    /// Whole days from the latest success to the fold time; `None` without
    /// any success.
    pub days_since_success: Option<i64>,
}

impl AuthStats {
    fn new(user_name: &str) -> Self {
        Self {
            user_name: user_name.to_string(),
            success: OutcomeStats::default(),
            failure: OutcomeStats::default(),
            days_since_success: None,
        }
    }
}

/// Accumulator table keyed by exact user name.
#[derive(Debug)]
pub struct AuthStatsAggregator {
    now: DateTime<Utc>,
    table: HashMap<String, AuthStats>,
}

impl AuthStatsAggregator {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            table: HashMap::new(),
        }
    }

    pub fn fold_event(&mut self, event: &AuthEvent) {
        let stats = self
            .table
            .entry(event.user_name.clone())
            .or_insert_with(|| AuthStats::new(&event.user_name));

        match event.outcome {
            Outcome::Success => {
                if stats.success.record(&event.time) {
                    stats.days_since_success = Some(days_since(&event.time.at, &self.now));
                }
            }
            Outcome::Failure => {
                stats.failure.record(&event.time);
            }
        }
    }

    pub fn fold<'e, I>(&mut self, events: I)
    where
        I: IntoIterator<Item = &'e AuthEvent>,
    {
        for event in events {
            self.fold_event(event);
        }
    }

    pub fn finish(self) -> HashMap<String, AuthStats> {
        self.table
    }
}

/// Fold `events` measured against `now`.
pub fn fold_auth_events<'e, I>(events: I, now: DateTime<Utc>) -> HashMap<String, AuthStats>
where
    I: IntoIterator<Item = &'e AuthEvent>,
{
    let mut aggregator = AuthStatsAggregator::new(now);
    aggregator.fold(events);
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::parse_event_time;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap()
    }

    fn event(user: &str, time: &str, outcome: Outcome) -> AuthEvent {
        AuthEvent {
            user_name: user.to_string(),
            time: parse_event_time(time).unwrap(),
            outcome,
        }
    }

    fn raw(ts: &Option<Timestamp>) -> Option<&str> {
        ts.as_ref().map(|t| t.raw.as_str())
    }

    fn permutations(events: &[AuthEvent]) -> Vec<Vec<AuthEvent>> {
        if events.len() <= 1 {
            return vec![events.to_vec()];
        }
        let mut result = Vec::new();
        for i in 0..events.len() {
            let mut rest = events.to_vec();
            let first = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, first.clone());
                result.push(tail);
            }
        }
        result
    }

    #[test]
    fn test_alice_scenario() {
        let events = vec![
            event("alice", "2024-01-01T00:00:00Z", Outcome::Success),
            event("alice", "2024-01-03T00:00:00Z", Outcome::Success),
            event("alice", "2024-01-02T00:00:00Z", Outcome::Failure),
        ];

        let stats = fold_auth_events(&events, now());
        let alice = &stats["alice"];

        assert_eq!(alice.success.count, 2);
        assert_eq!(raw(&alice.success.earliest), Some("2024-01-01T00:00:00Z"));
        assert_eq!(raw(&alice.success.latest), Some("2024-01-03T00:00:00Z"));
        assert_eq!(alice.failure.count, 1);
        assert_eq!(raw(&alice.failure.earliest), Some("2024-01-02T00:00:00Z"));
        assert_eq!(raw(&alice.failure.latest), Some("2024-01-02T00:00:00Z"));
        assert_eq!(alice.days_since_success, Some(7));
    }

    #[test]
    fn test_fold_is_order_independent() {
        let events = vec![
            event("alice", "2024-01-05T08:00:00Z", Outcome::Success),
            event("bob", "2024-01-02T00:00:00Z", Outcome::Failure),
            event("alice", "2024-01-01T00:00:00Z", Outcome::Failure),
            event("alice", "2024-01-03T00:00:00Z", Outcome::Success),
            event("bob", "2024-01-04T00:00:00Z", Outcome::Success),
        ];

        let expected = fold_auth_events(&events, now());
        for permutation in permutations(&events) {
            assert_eq!(fold_auth_events(&permutation, now()), expected);
        }
    }

    #[test]
    fn test_fold_is_idempotent_across_accumulators() {
        let events = vec![
            event("alice", "2024-01-01T00:00:00Z", Outcome::Success),
            event("bob", "2024-01-02T00:00:00Z", Outcome::Failure),
        ];

        let mut first = AuthStatsAggregator::new(now());
        let mut second = AuthStatsAggregator::new(now());
        first.fold(&events);
        second.fold(&events);

        assert_eq!(first.finish(), second.finish());
    }

    #[test]
    fn test_equal_instants_keep_first_seen() {
        let utc = event("alice", "2024-01-01T00:00:00Z", Outcome::Success);
        let offset = event("alice", "2024-01-01T01:00:00+01:00", Outcome::Success);
        assert_eq!(utc.time.at, offset.time.at);

        let utc_first = fold_auth_events([&utc, &offset], now());
        let offset_first = fold_auth_events([&offset, &utc], now());

        assert_eq!(
            raw(&utc_first["alice"].success.earliest),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(
            raw(&utc_first["alice"].success.latest),
            Some("2024-01-01T00:00:00Z")
        );
        assert_eq!(
            raw(&offset_first["alice"].success.earliest),
            Some("2024-01-01T01:00:00+01:00")
        );
        assert_eq!(
            raw(&offset_first["alice"].success.latest),
            Some("2024-01-01T01:00:00+01:00")
        );

        // Everything except the kept spelling is the same.
        assert_eq!(utc_first["alice"].success.count, 2);
        assert_eq!(offset_first["alice"].success.count, 2);
        assert_eq!(
            utc_first["alice"].days_since_success,
            offset_first["alice"].days_since_success
        );
    }

    #[test]
    fn test_identical_timestamps_in_either_order_match() {
        let a = event("alice", "2024-01-01T00:00:00Z", Outcome::Failure);
        let b = event("alice", "2024-01-01T00:00:00Z", Outcome::Failure);

        assert_eq!(
            fold_auth_events([&a, &b], now()),
            fold_auth_events([&b, &a], now())
        );
    }

    #[test]
    fn test_lexical_order_is_not_used() {
        // Lexically "2024-01-01T10:00:00+05:00" sorts after the UTC time,
        // chronologically it is earlier.
        let events = vec![
            event("alice", "2024-01-01T06:00:00Z", Outcome::Success),
            event("alice", "2024-01-01T10:00:00+05:00", Outcome::Success),
        ];
        let stats = fold_auth_events(&events, now());

        assert_eq!(
            raw(&stats["alice"].success.earliest),
            Some("2024-01-01T10:00:00+05:00")
        );
        assert_eq!(raw(&stats["alice"].success.latest), Some("2024-01-01T06:00:00Z"));
    }

    #[test]
    fn test_failure_only_user_has_no_success_fields() {
        let events = vec![event("mallory", "2024-01-09T00:00:00Z", Outcome::Failure)];
        let stats = fold_auth_events(&events, now());
        let mallory = &stats["mallory"];

        assert_eq!(mallory.success.count, 0);
        assert!(mallory.success.earliest.is_none());
        assert!(mallory.success.latest.is_none());
        assert!(mallory.days_since_success.is_none());
        assert_eq!(mallory.failure.count, 1);
    }

    #[test]
    fn test_success_only_user_has_zero_failures() {
        let events = vec![event("alice", "2024-01-09T00:00:00Z", Outcome::Success)];
        let stats = fold_auth_events(&events, now());

        assert_eq!(stats["alice"].failure.count, 0);
        assert!(stats["alice"].failure.earliest.is_none());
        assert!(stats["alice"].failure.latest.is_none());
    }

    #[test]
    fn test_users_without_events_are_absent() {
        let events = vec![event("alice", "2024-01-09T00:00:00Z", Outcome::Success)];
        let stats = fold_auth_events(&events, now());

        assert_eq!(stats.len(), 1);
        assert!(!stats.contains_key("bob"));
        assert!(fold_auth_events(&[], now()).is_empty());
    }

    #[test]
    fn test_user_names_are_exact_keys() {
        let events = vec![
            event("Alice", "2024-01-09T00:00:00Z", Outcome::Success),
            event("alice", "2024-01-09T00:00:00Z", Outcome::Success),
        ];
        let stats = fold_auth_events(&events, now());
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn test_days_since_success_tracks_latest_success() {
        let mut aggregator = AuthStatsAggregator::new(now());
        aggregator.fold_event(&event("alice", "2024-01-01T12:00:00Z", Outcome::Success));
        aggregator.fold_event(&event("alice", "2024-01-08T11:00:00Z", Outcome::Success));
        aggregator.fold_event(&event("alice", "2024-01-09T12:00:00Z", Outcome::Failure));

        let stats = aggregator.finish();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats["alice"].days_since_success, Some(2));
    }

    #[test]
    fn test_counts_never_decrease() {
        let mut aggregator = AuthStatsAggregator::new(now());
        let mut previous = 0;
        for day in 1..=9 {
            aggregator.fold_event(&event(
                "alice",
                &format!("2024-01-0{}T00:00:00Z", 10 - day),
                Outcome::Success,
            ));
            let count = aggregator.table["alice"].success.count;
            assert!(count > previous);
            previous = count;
        }
    }
}
