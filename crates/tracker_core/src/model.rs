use chrono::{DateTime, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::TrackerError;
use crate::palette;
use crate::weekday::{Weekday, WeekdaySet};

/// Opaque tracker identity, assigned once at creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TrackerId(Uuid);

impl TrackerId {
    pub fn new() -> Self {
        TrackerId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TrackerId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TrackerId {
    fn from(value: Uuid) -> Self {
        TrackerId(value)
    }
}

impl FromStr for TrackerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(TrackerId)
    }
}

impl fmt::Display for TrackerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tracker {
    pub id: TrackerId,
    pub name: String,
    pub emoji: String,
    pub color: String,
    pub schedule: WeekdaySet,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub category_index: usize,
    #[serde(default)]
    pub emoji_index: usize,
    #[serde(default)]
    pub color_index: usize,
}

impl Tracker {
    pub fn from_new(id: TrackerId, new: NewTracker) -> Self {
        Self {
            id,
            name: new.name,
            emoji: new.emoji,
            color: new.color,
            schedule: new.schedule,
            pinned: false,
            category_index: new.category_index,
            emoji_index: new.emoji_index,
            color_index: new.color_index,
        }
    }

    /// Replaces the editable attributes; identity and pin state are kept.
    pub fn apply_edit(&mut self, edit: NewTracker) {
        self.name = edit.name;
        self.emoji = edit.emoji;
        self.color = edit.color;
        self.schedule = edit.schedule;
        self.category_index = edit.category_index;
        self.emoji_index = edit.emoji_index;
        self.color_index = edit.color_index;
    }

    pub fn is_due_on(&self, date: NaiveDate) -> bool {
        self.schedule.is_due_on(date)
    }

    pub fn name_matches(&self, query: &str) -> bool {
        self.name.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Everything needed to create a tracker, or to edit one in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTracker {
    pub name: String,
    pub emoji: String,
    pub color: String,
    pub schedule: WeekdaySet,
    pub category_index: usize,
    pub emoji_index: usize,
    pub color_index: usize,
}

impl NewTracker {
    pub fn new(
        name: impl Into<String>,
        emoji: impl Into<String>,
        color: impl Into<String>,
        schedule: WeekdaySet,
    ) -> Self {
        Self {
            name: name.into(),
            emoji: emoji.into(),
            color: color.into(),
            schedule,
            category_index: 0,
            emoji_index: 0,
            color_index: 0,
        }
    }

    /// Resolves palette positions into display values.
    pub fn from_palette(
        name: impl Into<String>,
        emoji_index: usize,
        color_index: usize,
        schedule: WeekdaySet,
    ) -> Result<Self, TrackerError> {
        let emoji = palette::emoji_at(emoji_index).ok_or_else(|| TrackerError::InvalidInput {
            field: "emoji_index",
            reason: format!("{emoji_index} is outside the emoji palette"),
        })?;
        let color = palette::color_at(color_index).ok_or_else(|| TrackerError::InvalidInput {
            field: "color_index",
            reason: format!("{color_index} is outside the color palette"),
        })?;
        let mut new = Self::new(name, emoji, color, schedule);
        new.emoji_index = emoji_index;
        new.color_index = color_index;
        Ok(new)
    }

    /// One-off event: due only on the weekday it was created on.
    pub fn event(
        name: impl Into<String>,
        emoji: impl Into<String>,
        color: impl Into<String>,
        created_on: NaiveDate,
    ) -> Self {
        Self::new(
            name,
            emoji,
            color,
            WeekdaySet::from_days([Weekday::of(created_on)]),
        )
    }

    pub fn with_category_index(mut self, index: usize) -> Self {
        self.category_index = index;
        self
    }

    pub(crate) fn normalized(mut self) -> Result<Self, TrackerError> {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return Err(TrackerError::InvalidInput {
                field: "name",
                reason: "tracker name must not be empty".to_string(),
            });
        }
        self.name = trimmed.to_string();
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrackerCategory {
    pub title: String,
    #[serde(default)]
    pub trackers: Vec<Tracker>,
}

impl TrackerCategory {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            trackers: Vec::new(),
        }
    }

    pub fn with_trackers(title: impl Into<String>, trackers: Vec<Tracker>) -> Self {
        Self {
            title: title.into(),
            trackers,
        }
    }

    pub fn tracker(&self, id: TrackerId) -> Option<&Tracker> {
        self.trackers.iter().find(|tracker| tracker.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

/// A completion fact for one tracker on one calendar day.
/// Points every tracker's `category_index` at the section that holds it.
pub fn reindex(categories: &mut [TrackerCategory]) {
    for (index, category) in categories.iter_mut().enumerate() {
        for tracker in &mut category.trackers {
            tracker.category_index = index;
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TrackerRecord {
    pub tracker_id: TrackerId,
    pub date: NaiveDate,
}

impl TrackerRecord {
    pub fn new(tracker_id: TrackerId, date: NaiveDate) -> Self {
        Self { tracker_id, date }
    }

    /// Records an instant at day granularity in the instant's own timezone.
    pub fn at<Tz: TimeZone>(tracker_id: TrackerId, instant: &DateTime<Tz>) -> Self {
        Self::new(tracker_id, instant.date_naive())
    }

    pub fn matches(&self, tracker_id: TrackerId, date: NaiveDate) -> bool {
        self.tracker_id == tracker_id && self.date == date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn new_tracker_rejects_blank_names() {
        let new = NewTracker::new("   ", "🙂", "Color selection 1", WeekdaySet::EVERY_DAY);
        assert!(matches!(
            new.normalized(),
            Err(TrackerError::InvalidInput { field: "name", .. })
        ));

        let new = NewTracker::new("  Read ", "🙂", "Color selection 1", WeekdaySet::EVERY_DAY);
        assert_eq!(new.normalized().unwrap().name, "Read");
    }

    #[test]
    fn palette_indices_are_resolved() {
        let new = NewTracker::from_palette("Run", 3, 4, WeekdaySet::EMPTY).unwrap();
        assert_eq!(new.emoji, "🌺");
        assert_eq!(new.color, "Color selection 5");
        assert_eq!(new.emoji_index, 3);
        assert_eq!(new.color_index, 4);

        assert!(NewTracker::from_palette("Run", 30, 0, WeekdaySet::EMPTY).is_err());
    }

    #[test]
    fn events_are_due_on_their_creation_weekday() {
        let tuesday = NaiveDate::from_ymd_opt(2026, 10, 13).unwrap();
        let new = NewTracker::event("Dentist", "🦷", "Color selection 2", tuesday);
        assert_eq!(new.schedule.days(), vec![Weekday::Tuesday]);
    }

    #[test]
    fn edits_keep_identity_and_pin() {
        let id = TrackerId::new();
        let mut tracker = Tracker::from_new(
            id,
            NewTracker::new("Walk", "🙂", "Color selection 1", WeekdaySet::EVERY_DAY),
        );
        tracker.pinned = true;
        tracker.apply_edit(NewTracker::new(
            "Long walk",
            "🏓",
            "Color selection 3",
            WeekdaySet::EMPTY,
        ));
        assert_eq!(tracker.id, id);
        assert!(tracker.pinned);
        assert_eq!(tracker.name, "Long walk");
        assert!(tracker.schedule.is_empty());
    }

    #[test]
    fn records_truncate_time_of_day() {
        let id = TrackerId::new();
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let late = offset.with_ymd_and_hms(2026, 10, 12, 23, 59, 0).unwrap();
        let early = offset.with_ymd_and_hms(2026, 10, 12, 0, 1, 0).unwrap();
        assert_eq!(TrackerRecord::at(id, &late), TrackerRecord::at(id, &early));
        assert!(TrackerRecord::at(id, &late)
            .matches(id, NaiveDate::from_ymd_opt(2026, 10, 12).unwrap()));
    }

    #[test]
    fn name_matching_is_case_insensitive() {
        let tracker = Tracker::from_new(
            TrackerId::new(),
            NewTracker::new("Dishes", "🙂", "Color selection 1", WeekdaySet::EMPTY),
        );
        assert!(tracker.name_matches("dISH"));
        assert!(!tracker.name_matches("iron"));
    }
}
