use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{self, Tracker, TrackerCategory, TrackerId, TrackerRecord};
use crate::settings::SessionSettings;

/// Persistence collaborator. The core keeps the authoritative in-memory copy
/// for a session and calls exactly one write method per mutation.
pub trait TrackerStore: Send + Sync {
    fn load_categories(&self) -> Result<Vec<TrackerCategory>, StoreError>;
    fn load_records(&self) -> Result<Vec<TrackerRecord>, StoreError>;
    fn load_settings(&self) -> Result<SessionSettings, StoreError>;
    fn save_settings(&self, settings: &SessionSettings) -> Result<(), StoreError>;

    fn create_category(&self, title: &str) -> Result<(), StoreError>;
    fn create_tracker(&self, tracker: &Tracker, category_title: &str) -> Result<(), StoreError>;
    fn update_tracker(&self, tracker: &Tracker, category_title: &str) -> Result<(), StoreError>;
    fn delete_tracker(&self, id: TrackerId) -> Result<(), StoreError>;
    fn set_pinned(&self, id: TrackerId, pinned: bool) -> Result<(), StoreError>;
    fn create_record(&self, record: &TrackerRecord) -> Result<(), StoreError>;
    fn delete_record(&self, record: &TrackerRecord) -> Result<(), StoreError>;

    /// Reports, once, that the backing data changed outside this session.
    fn take_external_change(&self) -> bool {
        false
    }
}

/// Lets a caller keep a handle on a store it hands to the service.
impl<S: TrackerStore + ?Sized> TrackerStore for Arc<S> {
    fn load_categories(&self) -> Result<Vec<TrackerCategory>, StoreError> {
        (**self).load_categories()
    }

    fn load_records(&self) -> Result<Vec<TrackerRecord>, StoreError> {
        (**self).load_records()
    }

    fn load_settings(&self) -> Result<SessionSettings, StoreError> {
        (**self).load_settings()
    }

    fn save_settings(&self, settings: &SessionSettings) -> Result<(), StoreError> {
        (**self).save_settings(settings)
    }

    fn create_category(&self, title: &str) -> Result<(), StoreError> {
        (**self).create_category(title)
    }

    fn create_tracker(&self, tracker: &Tracker, category_title: &str) -> Result<(), StoreError> {
        (**self).create_tracker(tracker, category_title)
    }

    fn update_tracker(&self, tracker: &Tracker, category_title: &str) -> Result<(), StoreError> {
        (**self).update_tracker(tracker, category_title)
    }

    fn delete_tracker(&self, id: TrackerId) -> Result<(), StoreError> {
        (**self).delete_tracker(id)
    }

    fn set_pinned(&self, id: TrackerId, pinned: bool) -> Result<(), StoreError> {
        (**self).set_pinned(id, pinned)
    }

    fn create_record(&self, record: &TrackerRecord) -> Result<(), StoreError> {
        (**self).create_record(record)
    }

    fn delete_record(&self, record: &TrackerRecord) -> Result<(), StoreError> {
        (**self).delete_record(record)
    }

    fn take_external_change(&self) -> bool {
        (**self).take_external_change()
    }
}

/// Everything a store persists, in one serializable document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreSnapshot {
    pub categories: Vec<TrackerCategory>,
    pub records: Vec<TrackerRecord>,
    pub settings: SessionSettings,
}

impl StoreSnapshot {
    pub fn create_category(&mut self, title: &str) -> Result<(), StoreError> {
        if self.categories.iter().any(|category| category.title == title) {
            return Err(StoreError::DuplicateTitle {
                title: title.to_string(),
            });
        }
        self.categories.push(TrackerCategory::new(title));
        self.categories.sort_by(|a, b| a.title.cmp(&b.title));
        model::reindex(&mut self.categories);
        Ok(())
    }

    pub fn create_tracker(
        &mut self,
        tracker: &Tracker,
        category_title: &str,
    ) -> Result<(), StoreError> {
        let category = self.category_mut(category_title)?;
        category.trackers.push(tracker.clone());
        model::reindex(&mut self.categories);
        Ok(())
    }

    /// Rewrites a tracker, moving it when `category_title` names another category.
    pub fn update_tracker(
        &mut self,
        tracker: &Tracker,
        category_title: &str,
    ) -> Result<(), StoreError> {
        self.category_mut(category_title)?;
        let (from, idx) = self
            .position(tracker.id)
            .ok_or(StoreError::TrackerNotFound { id: tracker.id })?;
        if self.categories[from].title == category_title {
            self.categories[from].trackers[idx] = tracker.clone();
        } else {
            self.categories[from].trackers.remove(idx);
            self.category_mut(category_title)?
                .trackers
                .push(tracker.clone());
        }
        model::reindex(&mut self.categories);
        Ok(())
    }

    pub fn delete_tracker(&mut self, id: TrackerId) -> Result<(), StoreError> {
        let (section, idx) = self
            .position(id)
            .ok_or(StoreError::TrackerNotFound { id })?;
        self.categories[section].trackers.remove(idx);
        self.records.retain(|record| record.tracker_id != id);
        Ok(())
    }

    pub fn set_pinned(&mut self, id: TrackerId, pinned: bool) -> Result<(), StoreError> {
        let (section, idx) = self
            .position(id)
            .ok_or(StoreError::TrackerNotFound { id })?;
        self.categories[section].trackers[idx].pinned = pinned;
        Ok(())
    }

    pub fn create_record(&mut self, record: &TrackerRecord) -> Result<(), StoreError> {
        if self.position(record.tracker_id).is_none() {
            return Err(StoreError::TrackerNotFound {
                id: record.tracker_id,
            });
        }
        if !self.records.contains(record) {
            self.records.push(*record);
        }
        Ok(())
    }

    pub fn delete_record(&mut self, record: &TrackerRecord) -> Result<(), StoreError> {
        let before = self.records.len();
        self.records.retain(|existing| existing != record);
        if self.records.len() == before {
            return Err(StoreError::RecordNotFound {
                tracker_id: record.tracker_id,
                date: record.date,
            });
        }
        Ok(())
    }

    fn category_mut(&mut self, title: &str) -> Result<&mut TrackerCategory, StoreError> {
        self.categories
            .iter_mut()
            .find(|category| category.title == title)
            .ok_or_else(|| StoreError::CategoryNotFound {
                title: title.to_string(),
            })
    }

    fn position(&self, id: TrackerId) -> Option<(usize, usize)> {
        self.categories
            .iter()
            .enumerate()
            .find_map(|(section, category)| {
                category
                    .trackers
                    .iter()
                    .position(|tracker| tracker.id == id)
                    .map(|idx| (section, idx))
            })
    }
}

/// Volatile store for tests and previews. Writes can be switched off to
/// exercise failure handling.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: RwLock<StoreSnapshot>,
    unavailable: AtomicBool,
    external_change: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot.read().clone()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Edits the data as another writer would, flagging an external change.
    pub fn modify_externally(&self, edit: impl FnOnce(&mut StoreSnapshot)) {
        edit(&mut *self.snapshot.write());
        self.external_change.store(true, Ordering::SeqCst);
    }

    fn write<F>(&self, op: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StoreSnapshot) -> Result<(), StoreError>,
    {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is read-only".into()));
        }
        op(&mut *self.snapshot.write())
    }
}

impl TrackerStore for MemoryStore {
    fn load_categories(&self) -> Result<Vec<TrackerCategory>, StoreError> {
        Ok(self.snapshot.read().categories.clone())
    }

    fn load_records(&self) -> Result<Vec<TrackerRecord>, StoreError> {
        Ok(self.snapshot.read().records.clone())
    }

    fn load_settings(&self) -> Result<SessionSettings, StoreError> {
        Ok(self.snapshot.read().settings.clone())
    }

    fn save_settings(&self, settings: &SessionSettings) -> Result<(), StoreError> {
        self.write(|snapshot| {
            snapshot.settings = settings.clone();
            Ok(())
        })
    }

    fn create_category(&self, title: &str) -> Result<(), StoreError> {
        self.write(|snapshot| snapshot.create_category(title))
    }

    fn create_tracker(&self, tracker: &Tracker, category_title: &str) -> Result<(), StoreError> {
        self.write(|snapshot| snapshot.create_tracker(tracker, category_title))
    }

    fn update_tracker(&self, tracker: &Tracker, category_title: &str) -> Result<(), StoreError> {
        self.write(|snapshot| snapshot.update_tracker(tracker, category_title))
    }

    fn delete_tracker(&self, id: TrackerId) -> Result<(), StoreError> {
        self.write(|snapshot| snapshot.delete_tracker(id))
    }

    fn set_pinned(&self, id: TrackerId, pinned: bool) -> Result<(), StoreError> {
        self.write(|snapshot| snapshot.set_pinned(id, pinned))
    }

    fn create_record(&self, record: &TrackerRecord) -> Result<(), StoreError> {
        self.write(|snapshot| snapshot.create_record(record))
    }

    fn delete_record(&self, record: &TrackerRecord) -> Result<(), StoreError> {
        self.write(|snapshot| snapshot.delete_record(record))
    }

    fn take_external_change(&self) -> bool {
        self.external_change.swap(false, Ordering::SeqCst)
    }
}
