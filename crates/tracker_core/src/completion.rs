use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{TrackerId, TrackerRecord};

/// Result of asking to mark a tracker complete. None of these is an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed,
    AlreadyCompleted,
    FutureDateRejected,
}

impl CompletionOutcome {
    pub fn changed(self) -> bool {
        matches!(self, CompletionOutcome::Completed)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UncompleteOutcome {
    Removed,
    NotCompleted,
}

impl UncompleteOutcome {
    pub fn changed(self) -> bool {
        matches!(self, UncompleteOutcome::Removed)
    }
}

/// The session's completion records, at most one per tracker and day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionTracker {
    records: Vec<TrackerRecord>,
}

impl CompletionTracker {
    /// Loads records, collapsing duplicate (tracker, day) pairs left behind by
    /// older stores.
    pub fn new(records: Vec<TrackerRecord>) -> Self {
        let total = records.len();
        let mut seen = HashSet::with_capacity(total);
        let records: Vec<TrackerRecord> = records
            .into_iter()
            .filter(|record| seen.insert(*record))
            .collect();
        if records.len() != total {
            tracing::warn!(
                dropped = total - records.len(),
                "collapsed duplicate completion records"
            );
        }
        Self { records }
    }

    pub fn records(&self) -> &[TrackerRecord] {
        &self.records
    }

    pub fn is_completed_on(&self, tracker_id: TrackerId, date: NaiveDate) -> bool {
        self.records
            .iter()
            .any(|record| record.matches(tracker_id, date))
    }

    pub fn completed_count(&self, tracker_id: TrackerId) -> usize {
        self.records
            .iter()
            .filter(|record| record.tracker_id == tracker_id)
            .count()
    }

    /// Trackers with a completion on `date`.
    pub fn completed_on(&self, date: NaiveDate) -> HashSet<TrackerId> {
        self.records
            .iter()
            .filter(|record| record.date == date)
            .map(|record| record.tracker_id)
            .collect()
    }

    /// Marks `tracker_id` done on `date`. Dates after `today` are refused and
    /// repeated calls for the same day leave a single record.
    pub fn complete(
        &mut self,
        tracker_id: TrackerId,
        date: NaiveDate,
        today: NaiveDate,
    ) -> CompletionOutcome {
        if date > today {
            return CompletionOutcome::FutureDateRejected;
        }
        if self.is_completed_on(tracker_id, date) {
            return CompletionOutcome::AlreadyCompleted;
        }
        self.records.push(TrackerRecord::new(tracker_id, date));
        CompletionOutcome::Completed
    }

    pub fn uncomplete(&mut self, tracker_id: TrackerId, date: NaiveDate) -> UncompleteOutcome {
        let before = self.records.len();
        self.records
            .retain(|record| !record.matches(tracker_id, date));
        if self.records.len() < before {
            UncompleteOutcome::Removed
        } else {
            UncompleteOutcome::NotCompleted
        }
    }

    /// Drops every record of a deleted tracker and returns how many went.
    pub fn remove_tracker(&mut self, tracker_id: TrackerId) -> usize {
        let before = self.records.len();
        self.records
            .retain(|record| record.tracker_id != tracker_id);
        before - self.records.len()
    }

    pub fn total(&self) -> usize {
        self.records.len()
    }

    /// Number of distinct days with at least one completion.
    pub fn active_days(&self) -> usize {
        self.records
            .iter()
            .map(|record| record.date)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn complete_is_idempotent_per_day() {
        let today = date(2026, 10, 17);
        let id = TrackerId::new();
        let mut tracker = CompletionTracker::default();

        assert_eq!(tracker.complete(id, today, today), CompletionOutcome::Completed);
        assert!(tracker.is_completed_on(id, today));
        assert_eq!(
            tracker.complete(id, today, today),
            CompletionOutcome::AlreadyCompleted
        );
        assert_eq!(tracker.completed_count(id), 1);
    }

    #[test]
    fn future_dates_are_rejected() {
        let today = date(2026, 10, 17);
        let id = TrackerId::new();
        let mut tracker = CompletionTracker::default();

        let outcome = tracker.complete(id, date(2026, 10, 18), today);
        assert_eq!(outcome, CompletionOutcome::FutureDateRejected);
        assert!(!outcome.changed());
        assert_eq!(tracker.completed_count(id), 0);

        assert_eq!(
            tracker.complete(id, date(2026, 9, 1), today),
            CompletionOutcome::Completed
        );
    }

    #[test]
    fn uncomplete_removes_exactly_one_day() {
        let today = date(2026, 10, 17);
        let id = TrackerId::new();
        let mut tracker = CompletionTracker::default();
        tracker.complete(id, date(2026, 10, 16), today);
        tracker.complete(id, today, today);

        assert_eq!(tracker.uncomplete(id, today), UncompleteOutcome::Removed);
        assert!(!tracker.is_completed_on(id, today));
        assert_eq!(tracker.completed_count(id), 1);
        assert_eq!(
            tracker.uncomplete(id, today),
            UncompleteOutcome::NotCompleted
        );
    }

    #[test]
    fn loading_collapses_duplicates() {
        let id = TrackerId::new();
        let day = date(2026, 10, 10);
        let tracker = CompletionTracker::new(vec![
            TrackerRecord::new(id, day),
            TrackerRecord::new(id, day),
            TrackerRecord::new(id, date(2026, 10, 11)),
        ]);
        assert_eq!(tracker.completed_count(id), 2);
        assert_eq!(tracker.active_days(), 2);
    }

    #[test]
    fn per_date_membership_and_cascade() {
        let today = date(2026, 10, 17);
        let (a, b) = (TrackerId::new(), TrackerId::new());
        let mut tracker = CompletionTracker::default();
        tracker.complete(a, today, today);
        tracker.complete(b, today, today);
        tracker.complete(a, date(2026, 10, 15), today);

        assert_eq!(tracker.completed_on(today), HashSet::from([a, b]));
        assert_eq!(tracker.remove_tracker(a), 2);
        assert_eq!(tracker.total(), 1);
        assert_eq!(tracker.completed_on(today), HashSet::from([b]));
    }
}
