use chrono::NaiveDate;

use crate::model::{Tracker, TrackerCategory};

pub const DEFAULT_PINNED_TITLE: &str = "Pinned";

/// Derives the trackers due on a date, grouped the way the tracker list shows
/// them: one leading pseudo-category of pinned trackers, then each stored
/// category in its original order with its remaining due trackers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEngine {
    pinned_title: String,
}

impl Default for ScheduleEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleEngine {
    pub fn new() -> Self {
        Self {
            pinned_title: DEFAULT_PINNED_TITLE.to_string(),
        }
    }

    pub fn with_pinned_title(title: impl Into<String>) -> Self {
        Self {
            pinned_title: title.into(),
        }
    }

    pub fn pinned_title(&self) -> &str {
        &self.pinned_title
    }

    pub fn due_on(&self, categories: &[TrackerCategory], date: NaiveDate) -> Vec<TrackerCategory> {
        self.group(categories, |tracker| tracker.is_due_on(date))
    }

    /// Groups every tracker accepted by `include` pinned-first. Sections that
    /// end up empty, the pinned one included, are left out.
    pub fn group<F>(&self, categories: &[TrackerCategory], include: F) -> Vec<TrackerCategory>
    where
        F: Fn(&Tracker) -> bool,
    {
        let mut pinned: Vec<Tracker> = Vec::new();
        let mut sections: Vec<TrackerCategory> = Vec::new();

        for category in categories {
            let mut remaining = Vec::new();
            for tracker in category.trackers.iter().filter(|&tracker| include(tracker)) {
                if tracker.pinned {
                    pinned.push(tracker.clone());
                } else {
                    remaining.push(tracker.clone());
                }
            }
            if !remaining.is_empty() {
                sections.push(TrackerCategory::with_trackers(
                    category.title.clone(),
                    remaining,
                ));
            }
        }

        if !pinned.is_empty() {
            sections.insert(
                0,
                TrackerCategory::with_trackers(self.pinned_title.clone(), pinned),
            );
        }
        sections
    }
}

pub fn tracker_count(sections: &[TrackerCategory]) -> usize {
    sections.iter().map(|section| section.trackers.len()).sum()
}
