use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::completion::CompletionTracker;
use crate::model::TrackerCategory;
use crate::schedule::ScheduleEngine;

/// The four list filters offered above the tracker grid.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TrackerFilter {
    All,
    #[default]
    DueToday,
    Completed,
    NotCompleted,
}

impl TrackerFilter {
    pub const ALL: [TrackerFilter; 4] = [
        TrackerFilter::All,
        TrackerFilter::DueToday,
        TrackerFilter::Completed,
        TrackerFilter::NotCompleted,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TrackerFilter::All => "All trackers",
            TrackerFilter::DueToday => "Trackers for today",
            TrackerFilter::Completed => "Completed",
            TrackerFilter::NotCompleted => "Not completed",
        }
    }
}

impl fmt::Display for TrackerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TrackerFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(TrackerFilter::All),
            "today" | "due" | "due-today" => Ok(TrackerFilter::DueToday),
            "completed" | "done" => Ok(TrackerFilter::Completed),
            "not-completed" | "incomplete" | "todo" => Ok(TrackerFilter::NotCompleted),
            other => Err(format!("unknown filter `{other}`")),
        }
    }
}

/// What happens to the active filter when the user picks another date.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateChangePolicy {
    #[default]
    ResetToDueToday,
    KeepFilter,
}

impl FromStr for DateChangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reset" | "reset-to-due-today" => Ok(DateChangePolicy::ResetToDueToday),
            "keep" | "keep-filter" => Ok(DateChangePolicy::KeepFilter),
            other => Err(format!("unknown date change policy `{other}`")),
        }
    }
}

/// Caller-side selection: exactly one active filter plus the selected date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterState {
    mode: TrackerFilter,
    selected_date: NaiveDate,
    policy: DateChangePolicy,
}

impl FilterState {
    pub fn new(today: NaiveDate, policy: DateChangePolicy) -> Self {
        Self {
            mode: TrackerFilter::DueToday,
            selected_date: today,
            policy,
        }
    }

    pub fn mode(&self) -> TrackerFilter {
        self.mode
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn policy(&self) -> DateChangePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: DateChangePolicy) {
        self.policy = policy;
    }

    /// Switches filter. Choosing `DueToday` also moves the selection to today.
    pub fn select_mode(&mut self, mode: TrackerFilter, today: NaiveDate) {
        self.mode = mode;
        if mode == TrackerFilter::DueToday {
            self.selected_date = today;
        }
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
        if self.policy == DateChangePolicy::ResetToDueToday {
            self.mode = TrackerFilter::DueToday;
        }
    }
}

/// Applies a filter to the full category set, keeping the pinned-first
/// grouping produced by [`ScheduleEngine`].
#[derive(Debug, Clone, Copy)]
pub struct FilterEngine<'a> {
    schedule: &'a ScheduleEngine,
}

impl<'a> FilterEngine<'a> {
    pub fn new(schedule: &'a ScheduleEngine) -> Self {
        Self { schedule }
    }

    pub fn apply(
        &self,
        categories: &[TrackerCategory],
        completions: &CompletionTracker,
        mode: TrackerFilter,
        selected_date: NaiveDate,
    ) -> Vec<TrackerCategory> {
        match mode {
            TrackerFilter::All => self.schedule.group(categories, |_| true),
            TrackerFilter::DueToday => self.schedule.due_on(categories, selected_date),
            TrackerFilter::Completed => {
                let done = completions.completed_on(selected_date);
                self.schedule
                    .group(categories, |tracker| done.contains(&tracker.id))
            }
            TrackerFilter::NotCompleted => {
                let done = completions.completed_on(selected_date);
                self.schedule
                    .group(categories, |tracker| !done.contains(&tracker.id))
            }
        }
    }

    pub fn apply_state(
        &self,
        categories: &[TrackerCategory],
        completions: &CompletionTracker,
        state: &FilterState,
    ) -> Vec<TrackerCategory> {
        self.apply(categories, completions, state.mode(), state.selected_date())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTracker, Tracker, TrackerId};
    use crate::schedule::tracker_count;
    use crate::weekday::{Weekday, WeekdaySet};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tracker(name: &str, schedule: WeekdaySet) -> Tracker {
        Tracker::from_new(
            TrackerId::new(),
            NewTracker::new(name, "🙂", "Color selection 1", schedule),
        )
    }

    fn fixture() -> (Vec<TrackerCategory>, Tracker, Tracker, Tracker) {
        let monday_only = tracker("Dishes", WeekdaySet::from_days([Weekday::Monday]));
        let daily = tracker("Water", WeekdaySet::EVERY_DAY);
        let never = tracker("Someday", WeekdaySet::EMPTY);
        let categories = vec![TrackerCategory::with_trackers(
            "Home",
            vec![monday_only.clone(), daily.clone(), never.clone()],
        )];
        (categories, monday_only, daily, never)
    }

    #[test]
    fn all_ignores_schedule_and_completion() {
        let (categories, ..) = fixture();
        let engine = ScheduleEngine::new();
        let visible = FilterEngine::new(&engine).apply(
            &categories,
            &CompletionTracker::default(),
            TrackerFilter::All,
            date(2026, 10, 13),
        );
        assert_eq!(tracker_count(&visible), 3);
    }

    #[test]
    fn due_today_matches_schedule_engine() {
        let (categories, ..) = fixture();
        let engine = ScheduleEngine::new();
        let monday = date(2026, 10, 12);
        let visible = FilterEngine::new(&engine).apply(
            &categories,
            &CompletionTracker::default(),
            TrackerFilter::DueToday,
            monday,
        );
        assert_eq!(visible, engine.due_on(&categories, monday));
        assert_eq!(tracker_count(&visible), 2);
    }

    #[test]
    fn completed_and_not_completed_partition_by_selected_date() {
        let (categories, monday_only, daily, never) = fixture();
        let engine = ScheduleEngine::new();
        let filter = FilterEngine::new(&engine);
        let today = date(2026, 10, 17);
        let monday = date(2026, 10, 12);
        let mut completions = CompletionTracker::default();
        completions.complete(monday_only.id, monday, today);
        completions.complete(daily.id, today, today);

        let done = filter.apply(&categories, &completions, TrackerFilter::Completed, monday);
        assert_eq!(tracker_count(&done), 1);
        assert_eq!(done[0].trackers[0].id, monday_only.id);

        let pending = filter.apply(&categories, &completions, TrackerFilter::NotCompleted, monday);
        let ids: Vec<TrackerId> = pending[0].trackers.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![daily.id, never.id]);
    }

    #[test]
    fn pinned_grouping_applies_to_every_mode() {
        let (mut categories, monday_only, ..) = fixture();
        categories[0].trackers[0].pinned = true;
        let engine = ScheduleEngine::new();
        let visible = FilterEngine::new(&engine).apply(
            &categories,
            &CompletionTracker::default(),
            TrackerFilter::All,
            date(2026, 10, 13),
        );
        assert_eq!(visible[0].title, "Pinned");
        assert_eq!(visible[0].trackers[0].id, monday_only.id);
        assert_eq!(visible[1].trackers.len(), 2);
    }

    #[test]
    fn date_change_resets_filter_under_default_policy() {
        let today = date(2026, 10, 17);
        let mut state = FilterState::new(today, DateChangePolicy::default());
        state.select_mode(TrackerFilter::Completed, today);
        state.select_date(date(2026, 10, 12));
        assert_eq!(state.mode(), TrackerFilter::DueToday);
        assert_eq!(state.selected_date(), date(2026, 10, 12));

        let mut keep = FilterState::new(today, DateChangePolicy::KeepFilter);
        keep.select_mode(TrackerFilter::Completed, today);
        keep.select_date(date(2026, 10, 12));
        assert_eq!(keep.mode(), TrackerFilter::Completed);
    }

    #[test]
    fn choosing_due_today_snaps_to_today() {
        let today = date(2026, 10, 17);
        let mut state = FilterState::new(today, DateChangePolicy::KeepFilter);
        state.select_date(date(2026, 10, 1));
        state.select_mode(TrackerFilter::DueToday, today);
        assert_eq!(state.selected_date(), today);
    }

    #[test]
    fn parses_filter_names() {
        assert_eq!("today".parse::<TrackerFilter>(), Ok(TrackerFilter::DueToday));
        assert_eq!(
            "Not-Completed".parse::<TrackerFilter>(),
            Ok(TrackerFilter::NotCompleted)
        );
        assert!("weekly".parse::<TrackerFilter>().is_err());
        assert_eq!(
            "keep".parse::<DateChangePolicy>(),
            Ok(DateChangePolicy::KeepFilter)
        );
    }
}
