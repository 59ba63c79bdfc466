use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracker_core::settings::SessionSettings;
use tracker_core::store::{StoreSnapshot, TrackerStore};
use tracker_core::{StoreError, Tracker, TrackerCategory, TrackerId, TrackerRecord};

use crate::document;

/// JSON-file backed store. Every write rewrites the whole file; the in-memory
/// copy only changes once the file write succeeded.
pub struct JsonFileStore {
    path: PathBuf,
    snapshot: Arc<RwLock<StoreSnapshot>>,
    external_change: Arc<AtomicBool>,
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = document::read(&path)?.unwrap_or_default();
        tracing::info!(
            path = %path.display(),
            categories = snapshot.categories.len(),
            records = snapshot.records.len(),
            "opened tracker data file"
        );
        Ok(Self {
            path,
            snapshot: Arc::new(RwLock::new(snapshot)),
            external_change: Arc::new(AtomicBool::new(false)),
            watcher: Mutex::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.snapshot.read().clone()
    }

    /// Re-reads the file, replacing the in-memory copy.
    pub fn refresh(&self) -> Result<(), StoreError> {
        let fresh = document::read(&self.path)?.unwrap_or_default();
        *self.snapshot.write() = fresh;
        Ok(())
    }

    /// Starts watching the data file for edits made by other processes.
    pub fn watch(&self) -> Result<(), StoreError> {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            return Ok(());
        }
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let path = self.path.clone();
        let snapshot = Arc::clone(&self.snapshot);
        let flag = Arc::clone(&self.external_change);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(%err, "file watcher error");
                    return;
                }
            };
            if !event
                .paths
                .iter()
                .any(|changed| changed.file_name() == path.file_name())
            {
                return;
            }
            tracing::debug!(?event, "filesystem change detected");
            // Our own writes leave the file equal to memory and are ignored.
            match document::read(&path) {
                Ok(Some(on_disk)) if on_disk != *snapshot.read() => {
                    flag.store(true, Ordering::SeqCst);
                }
                Ok(_) => {}
                Err(err) => tracing::debug!(%err, "skipping unreadable data file"),
            }
        })
        .map_err(watch_error)?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(watch_error)?;
        tracing::info!(path = %self.path.display(), "watching tracker data file");
        *slot = Some(watcher);
        Ok(())
    }

    fn write<F>(&self, op: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut StoreSnapshot) -> Result<(), StoreError>,
    {
        let mut current = self.snapshot.write();
        let mut next = current.clone();
        op(&mut next)?;
        if let Err(err) = document::write(&self.path, &next) {
            tracing::warn!(%err, path = %self.path.display(), "failed to write data file");
            return Err(err);
        }
        *current = next;
        Ok(())
    }
}

fn watch_error(err: notify::Error) -> StoreError {
    StoreError::Unavailable(format!("cannot watch data file: {err}"))
}

impl TrackerStore for JsonFileStore {
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
        if !self.external_change.swap(false, Ordering::SeqCst) {
            return false;
        }
        match self.refresh() {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(%err, "ignoring external change that could not be read");
                false
            }
        }
    }
}
