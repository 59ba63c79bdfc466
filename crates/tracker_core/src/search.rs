use chrono::NaiveDate;

use crate::model::{Tracker, TrackerCategory};
use crate::schedule::ScheduleEngine;

/// Narrows `sections` to trackers due on `date` whose name contains `query`,
/// ignoring case. A blank query falls back to the plain due set for `date`.
pub fn search(
    schedule: &ScheduleEngine,
    sections: &[TrackerCategory],
    query: &str,
    date: NaiveDate,
) -> Vec<TrackerCategory> {
    let query = query.trim();
    if query.is_empty() {
        return schedule.due_on(sections, date);
    }
    retain(sections, |tracker| {
        tracker.name_matches(query) && tracker.is_due_on(date)
    })
}

/// Keeps trackers whose name contains `query`, ignoring case and schedule.
/// Sections left empty are dropped; a blank query keeps everything.
pub fn narrow(sections: &[TrackerCategory], query: &str) -> Vec<TrackerCategory> {
    let query = query.trim();
    retain(sections, |tracker| query.is_empty() || tracker.name_matches(query))
}

fn retain<F>(sections: &[TrackerCategory], keep: F) -> Vec<TrackerCategory>
where
    F: Fn(&Tracker) -> bool,
{
    sections
        .iter()
        .filter_map(|section| {
            let trackers: Vec<_> = section
                .trackers
                .iter()
                .filter(|&tracker| keep(tracker))
                .cloned()
                .collect();
            (!trackers.is_empty())
                .then(|| TrackerCategory::with_trackers(section.title.clone(), trackers))
        })
        .collect()
}
