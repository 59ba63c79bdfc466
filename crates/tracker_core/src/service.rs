use chrono::{Local, NaiveDate};
use tracing::{debug, info, instrument, warn};

use crate::{
    changes::{self, CategoryUpdate},
    completion::{CompletionOutcome, CompletionTracker, UncompleteOutcome},
    error::{StoreError, TrackerError},
    filter::{DateChangePolicy, FilterEngine, FilterState, TrackerFilter},
    model::{self, NewTracker, Tracker, TrackerCategory, TrackerId, TrackerRecord},
    schedule::ScheduleEngine,
    search,
    settings::SessionSettings,
    store::{MemoryStore, TrackerStore},
};

/// Source of "today" for the future-date rule and the due-today filter.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Observers of session changes, typically the presentation layer.
pub trait ChangeSink: Send + Sync {
    fn entities_changed(&self, update: &CategoryUpdate);
    fn completion_changed(&self, tracker_id: TrackerId, date: NaiveDate, completed: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerCellState {
    pub completed_on_date: bool,
    pub completed_days: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerStats {
    pub trackers_completed: usize,
    pub active_days: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionToggle {
    Completed,
    Uncompleted,
    FutureDateRejected,
}

#[derive(Clone)]
struct SessionState {
    categories: Vec<TrackerCategory>,
    completions: CompletionTracker,
}

/// Owns one session's trackers, categories and completion records, and keeps
/// them in step with the persistence collaborator.
pub struct TrackerService {
    store: Box<dyn TrackerStore>,
    categories: Vec<TrackerCategory>,
    completions: CompletionTracker,
    settings: SessionSettings,
    schedule: ScheduleEngine,
    filter: FilterState,
    clock: Box<dyn Clock>,
    change_sink: Option<Box<dyn ChangeSink>>,
}

pub struct TrackerServiceBuilder {
    store: Option<Box<dyn TrackerStore>>,
    clock: Box<dyn Clock>,
    change_sink: Option<Box<dyn ChangeSink>>,
}

impl TrackerServiceBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            clock: Box::new(SystemClock),
            change_sink: None,
        }
    }

    pub fn with_store(mut self, store: Box<dyn TrackerStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_change_sink(mut self, sink: Box<dyn ChangeSink>) -> Self {
        self.change_sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<TrackerService, TrackerError> {
        let today = self.clock.today();
        let mut service = TrackerService {
            store: self
                .store
                .unwrap_or_else(|| Box::new(MemoryStore::new()) as Box<dyn TrackerStore>),
            categories: Vec::new(),
            completions: CompletionTracker::default(),
            settings: SessionSettings::default(),
            schedule: ScheduleEngine::new(),
            filter: FilterState::new(today, DateChangePolicy::default()),
            clock: self.clock,
            change_sink: self.change_sink,
        };
        service.reload()?;
        Ok(service)
    }
}

impl Default for TrackerServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackerService {
    pub fn builder() -> TrackerServiceBuilder {
        TrackerServiceBuilder::new()
    }

    /// Re-reads everything from the store and reports what moved.
    pub fn reload(&mut self) -> Result<CategoryUpdate, TrackerError> {
        let mut categories = self.store.load_categories()?;
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        model::reindex(&mut categories);
        let records = self.store.load_records()?;
        let settings = self.store.load_settings()?;

        let update = changes::diff(&self.categories, &categories);
        self.categories = categories;
        self.completions = CompletionTracker::new(records);
        self.apply_settings(settings);
        info!(
            categories = self.categories.len(),
            records = self.completions.total(),
            "session loaded"
        );
        self.notify_entities(&update);
        Ok(update)
    }

    /// Reloads when the store saw a write from outside this session.
    pub fn poll_external_changes(&mut self) -> Result<Option<CategoryUpdate>, TrackerError> {
        if !self.store.take_external_change() {
            return Ok(None);
        }
        debug!("store changed externally, reloading");
        self.reload().map(Some)
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn categories(&self) -> &[TrackerCategory] {
        &self.categories
    }

    pub fn records(&self) -> &[TrackerRecord] {
        self.completions.records()
    }

    pub fn tracker(&self, id: TrackerId) -> Option<&Tracker> {
        self.categories
            .iter()
            .find_map(|category| category.tracker(id))
    }

    pub fn category_of(&self, id: TrackerId) -> Option<&str> {
        self.categories
            .iter()
            .find(|category| category.tracker(id).is_some())
            .map(|category| category.title.as_str())
    }

    // ---- queries ----

    pub fn due_on(&self, date: NaiveDate) -> Vec<TrackerCategory> {
        self.schedule.due_on(&self.categories, date)
    }

    /// The grouped list for the active filter and selected date, narrowed by
    /// `query` when it is not blank.
    pub fn visible(&self, query: &str) -> Vec<TrackerCategory> {
        let filtered = FilterEngine::new(&self.schedule).apply_state(
            &self.categories,
            &self.completions,
            &self.filter,
        );
        if query.trim().is_empty() {
            return filtered;
        }
        match self.filter.mode() {
            TrackerFilter::DueToday => search::search(
                &self.schedule,
                &filtered,
                query,
                self.filter.selected_date(),
            ),
            // these modes ignore the schedule, so the name alone decides
            _ => search::narrow(&filtered, query),
        }
    }

    pub fn filter_state(&self) -> &FilterState {
        &self.filter
    }

    pub fn select_filter(&mut self, mode: TrackerFilter) {
        let today = self.today();
        self.filter.select_mode(mode, today);
        debug!(?mode, date = %self.filter.selected_date(), "filter selected");
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.filter.select_date(date);
        debug!(mode = ?self.filter.mode(), %date, "date selected");
    }

    pub fn is_completed_on(&self, tracker_id: TrackerId, date: NaiveDate) -> bool {
        self.completions.is_completed_on(tracker_id, date)
    }

    pub fn completed_count(&self, tracker_id: TrackerId) -> usize {
        self.completions.completed_count(tracker_id)
    }

    pub fn tracker_state(&self, tracker_id: TrackerId, date: NaiveDate) -> TrackerCellState {
        TrackerCellState {
            completed_on_date: self.completions.is_completed_on(tracker_id, date),
            completed_days: self.completions.completed_count(tracker_id),
        }
    }

    pub fn stats(&self) -> TrackerStats {
        TrackerStats {
            trackers_completed: self.completions.total(),
            active_days: self.completions.active_days(),
        }
    }

    // ---- mutations ----

    #[instrument(skip(self))]
    pub fn create_category(&mut self, title: &str) -> Result<(), TrackerError> {
        let title = normalize_title(title)?;
        if self.categories.iter().any(|category| category.title == title) {
            return Err(TrackerError::DuplicateTitle { title });
        }
        if title == self.settings.pinned_title {
            return Err(TrackerError::InvalidInput {
                field: "title",
                reason: format!("`{title}` is the pinned section title"),
            });
        }
        let previous = self.state();
        self.categories.push(TrackerCategory::new(title.clone()));
        self.categories.sort_by(|a, b| a.title.cmp(&b.title));
        model::reindex(&mut self.categories);
        self.commit(previous, |store| store.create_category(&title))?;
        info!(%title, "category created");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn create_tracker(
        &mut self,
        new: NewTracker,
        category_title: &str,
    ) -> Result<TrackerId, TrackerError> {
        let new = new.normalized()?;
        let section = self.category_index(category_title)?;
        let mut tracker = Tracker::from_new(TrackerId::new(), new);
        tracker.category_index = section;
        let id = tracker.id;

        let previous = self.state();
        self.categories[section].trackers.push(tracker.clone());
        self.commit(previous, |store| {
            store.create_tracker(&tracker, category_title)
        })?;
        info!(tracker_id = %id, category = %category_title, "tracker created");
        Ok(id)
    }

    /// Replaces a tracker's attributes, moving it when the category changes.
    #[instrument(skip(self))]
    pub fn update_tracker(
        &mut self,
        id: TrackerId,
        edit: NewTracker,
        category_title: &str,
    ) -> Result<(), TrackerError> {
        let edit = edit.normalized()?;
        let target = self.category_index(category_title)?;
        let (from, idx) = self
            .position(id)
            .ok_or(TrackerError::TrackerNotFound { id })?;

        let previous = self.state();
        let mut tracker = self.categories[from].trackers.remove(idx);
        tracker.apply_edit(edit);
        tracker.category_index = target;
        let updated = tracker.clone();
        if from == target {
            self.categories[from].trackers.insert(idx, tracker);
        } else {
            self.categories[target].trackers.push(tracker);
        }
        self.commit(previous, |store| {
            store.update_tracker(&updated, category_title)
        })?;
        info!(tracker_id = %id, category = %category_title, "tracker updated");
        Ok(())
    }

    /// Deletes a tracker together with its completion records.
    #[instrument(skip(self))]
    pub fn delete_tracker(&mut self, id: TrackerId) -> Result<(), TrackerError> {
        let (section, idx) = self
            .position(id)
            .ok_or(TrackerError::TrackerNotFound { id })?;

        let previous = self.state();
        self.categories[section].trackers.remove(idx);
        let dropped = self.completions.remove_tracker(id);
        self.commit(previous, |store| store.delete_tracker(id))?;
        info!(tracker_id = %id, records = dropped, "tracker deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn set_pinned(&mut self, id: TrackerId, pinned: bool) -> Result<(), TrackerError> {
        let (section, idx) = self
            .position(id)
            .ok_or(TrackerError::TrackerNotFound { id })?;
        if self.categories[section].trackers[idx].pinned == pinned {
            return Ok(());
        }

        let previous = self.state();
        self.categories[section].trackers[idx].pinned = pinned;
        self.commit(previous, |store| store.set_pinned(id, pinned))?;
        info!(tracker_id = %id, pinned, "pin changed");
        Ok(())
    }

    /// Flips the pin flag and returns the new value.
    pub fn toggle_pin(&mut self, id: TrackerId) -> Result<bool, TrackerError> {
        let pinned = !self
            .tracker(id)
            .ok_or(TrackerError::TrackerNotFound { id })?
            .pinned;
        self.set_pinned(id, pinned)?;
        Ok(pinned)
    }

    #[instrument(skip(self))]
    pub fn complete(
        &mut self,
        tracker_id: TrackerId,
        date: NaiveDate,
    ) -> Result<CompletionOutcome, TrackerError> {
        self.require_tracker(tracker_id)?;
        let today = self.today();

        let previous = self.state();
        let outcome = self.completions.complete(tracker_id, date, today);
        match outcome {
            CompletionOutcome::Completed => {
                let record = TrackerRecord::new(tracker_id, date);
                self.commit(previous, |store| store.create_record(&record))?;
                info!(%tracker_id, %date, "tracker completed");
                self.notify_completion(tracker_id, date, true);
            }
            CompletionOutcome::AlreadyCompleted => {
                debug!(%tracker_id, %date, "already completed");
            }
            CompletionOutcome::FutureDateRejected => {
                debug!(%tracker_id, %date, %today, "refusing to complete a future date");
            }
        }
        Ok(outcome)
    }

    #[instrument(skip(self))]
    pub fn uncomplete(
        &mut self,
        tracker_id: TrackerId,
        date: NaiveDate,
    ) -> Result<UncompleteOutcome, TrackerError> {
        self.require_tracker(tracker_id)?;

        let previous = self.state();
        let outcome = self.completions.uncomplete(tracker_id, date);
        if outcome.changed() {
            let record = TrackerRecord::new(tracker_id, date);
            self.commit(previous, |store| store.delete_record(&record))?;
            info!(%tracker_id, %date, "completion removed");
            self.notify_completion(tracker_id, date, false);
        }
        Ok(outcome)
    }

    pub fn toggle_completion(
        &mut self,
        tracker_id: TrackerId,
        date: NaiveDate,
    ) -> Result<CompletionToggle, TrackerError> {
        if self.is_completed_on(tracker_id, date) {
            self.uncomplete(tracker_id, date)?;
            return Ok(CompletionToggle::Uncompleted);
        }
        Ok(match self.complete(tracker_id, date)? {
            CompletionOutcome::FutureDateRejected => CompletionToggle::FutureDateRejected,
            CompletionOutcome::Completed | CompletionOutcome::AlreadyCompleted => {
                CompletionToggle::Completed
            }
        })
    }

    pub fn complete_onboarding(&mut self) -> Result<(), TrackerError> {
        self.update_settings(|settings| settings.onboarding_completed = true)
    }

    pub fn set_date_change_policy(&mut self, policy: DateChangePolicy) -> Result<(), TrackerError> {
        self.update_settings(|settings| settings.date_change_policy = policy)
    }

    pub fn set_pinned_title(&mut self, title: &str) -> Result<(), TrackerError> {
        let title = normalize_title(title)?;
        if self.categories.iter().any(|category| category.title == title) {
            return Err(TrackerError::InvalidInput {
                field: "pinned_title",
                reason: format!("a category is already titled `{title}`"),
            });
        }
        self.update_settings(|settings| settings.pinned_title = title)
    }
}

impl TrackerService {
    fn state(&self) -> SessionState {
        SessionState {
            categories: self.categories.clone(),
            completions: self.completions.clone(),
        }
    }

    /// Persists an in-memory change that has already been applied. On failure
    /// the previous state is put back before the error is returned.
    fn commit<F>(&mut self, previous: SessionState, write: F) -> Result<(), TrackerError>
    where
        F: FnOnce(&dyn TrackerStore) -> Result<(), StoreError>,
    {
        if let Err(err) = write(&*self.store) {
            warn!(%err, "persisting change failed, restoring session state");
            self.categories = previous.categories;
            self.completions = previous.completions;
            return Err(err.into());
        }
        let update = changes::diff(&previous.categories, &self.categories);
        self.notify_entities(&update);
        Ok(())
    }

    fn update_settings<F>(&mut self, edit: F) -> Result<(), TrackerError>
    where
        F: FnOnce(&mut SessionSettings),
    {
        let mut settings = self.settings.clone();
        edit(&mut settings);
        self.store.save_settings(&settings)?;
        self.apply_settings(settings);
        Ok(())
    }

    fn apply_settings(&mut self, settings: SessionSettings) {
        if settings.pinned_title != self.schedule.pinned_title() {
            self.schedule = ScheduleEngine::with_pinned_title(settings.pinned_title.clone());
        }
        self.filter.set_policy(settings.date_change_policy);
        self.settings = settings;
    }

    fn notify_entities(&self, update: &CategoryUpdate) {
        if update.is_empty() {
            return;
        }
        if let Some(sink) = &self.change_sink {
            sink.entities_changed(update);
        }
    }

    fn notify_completion(&self, tracker_id: TrackerId, date: NaiveDate, completed: bool) {
        if let Some(sink) = &self.change_sink {
            sink.completion_changed(tracker_id, date, completed);
        }
    }

    fn category_index(&self, title: &str) -> Result<usize, TrackerError> {
        self.categories
            .iter()
            .position(|category| category.title == title)
            .ok_or_else(|| TrackerError::CategoryNotFound {
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

    fn require_tracker(&self, id: TrackerId) -> Result<(), TrackerError> {
        self.position(id)
            .map(|_| ())
            .ok_or(TrackerError::TrackerNotFound { id })
    }
}

fn normalize_title(title: &str) -> Result<String, TrackerError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TrackerError::InvalidInput {
            field: "title",
            reason: "title must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}
