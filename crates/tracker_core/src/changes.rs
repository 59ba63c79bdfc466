use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::model::{TrackerCategory, TrackerId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    pub fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }
}

/// Structural delta between two category snapshots. Deleted positions refer
/// to the old snapshot, inserted positions to the new one.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryUpdate {
    pub inserted_sections: Vec<usize>,
    pub deleted_sections: Vec<usize>,
    pub inserted_items: Vec<IndexPath>,
    pub deleted_items: Vec<IndexPath>,
}

impl CategoryUpdate {
    pub fn is_empty(&self) -> bool {
        self.inserted_sections.is_empty()
            && self.deleted_sections.is_empty()
            && self.inserted_items.is_empty()
            && self.deleted_items.is_empty()
    }
}

/// Diffs sections by title and items by tracker id. A tracker that moved to
/// another section shows up as one deletion and one insertion.
pub fn diff(old: &[TrackerCategory], new: &[TrackerCategory]) -> CategoryUpdate {
    let old_index: HashMap<&str, usize> = old
        .iter()
        .enumerate()
        .map(|(idx, section)| (section.title.as_str(), idx))
        .collect();
    let new_index: HashMap<&str, usize> = new
        .iter()
        .enumerate()
        .map(|(idx, section)| (section.title.as_str(), idx))
        .collect();

    let mut update = CategoryUpdate::default();

    for (idx, section) in old.iter().enumerate() {
        if !new_index.contains_key(section.title.as_str()) {
            update.deleted_sections.push(idx);
        }
    }

    for (new_idx, section) in new.iter().enumerate() {
        let Some(&old_idx) = old_index.get(section.title.as_str()) else {
            update.inserted_sections.push(new_idx);
            continue;
        };
        let before = ids(&old[old_idx]);
        let after = ids(section);

        for (item, tracker) in old[old_idx].trackers.iter().enumerate() {
            if !after.contains(&tracker.id) {
                update.deleted_items.push(IndexPath::new(old_idx, item));
            }
        }
        for (item, tracker) in section.trackers.iter().enumerate() {
            if !before.contains(&tracker.id) {
                update.inserted_items.push(IndexPath::new(new_idx, item));
            }
        }
    }

    update.deleted_items.sort();
    update
}

fn ids(section: &TrackerCategory) -> HashSet<TrackerId> {
    section.trackers.iter().map(|tracker| tracker.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NewTracker, Tracker};
    use crate::weekday::WeekdaySet;

    fn tracker(name: &str) -> Tracker {
        Tracker::from_new(
            TrackerId::new(),
            NewTracker::new(name, "🙂", "Color selection 1", WeekdaySet::EVERY_DAY),
        )
    }

    #[test]
    fn identical_snapshots_produce_no_update() {
        let sections = vec![TrackerCategory::with_trackers("A", vec![tracker("a")])];
        assert!(diff(&sections, &sections).is_empty());
    }

    #[test]
    fn reports_new_and_removed_sections() {
        let old = vec![TrackerCategory::new("Gone"), TrackerCategory::new("Kept")];
        let new = vec![TrackerCategory::new("Fresh"), TrackerCategory::new("Kept")];
        let update = diff(&old, &new);
        assert_eq!(update.deleted_sections, vec![0]);
        assert_eq!(update.inserted_sections, vec![0]);
        assert!(update.inserted_items.is_empty());
    }

    #[test]
    fn moved_tracker_is_deleted_then_inserted() {
        let moving = tracker("move me");
        let stay = tracker("stay");
        let old = vec![
            TrackerCategory::with_trackers("A", vec![stay.clone(), moving.clone()]),
            TrackerCategory::with_trackers("B", vec![]),
        ];
        let new = vec![
            TrackerCategory::with_trackers("A", vec![stay]),
            TrackerCategory::with_trackers("B", vec![moving]),
        ];
        let update = diff(&old, &new);
        assert_eq!(update.deleted_items, vec![IndexPath::new(0, 1)]);
        assert_eq!(update.inserted_items, vec![IndexPath::new(1, 0)]);
        assert!(update.inserted_sections.is_empty());
    }
}
