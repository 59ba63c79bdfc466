use chrono::NaiveDate;

use tracker_core::completion::{CompletionOutcome, UncompleteOutcome};
use tracker_core::filter::TrackerFilter;
use tracker_core::search::search;
use tracker_core::service::FixedClock;
use tracker_core::store::{MemoryStore, TrackerStore};
use tracker_core::{NewTracker, TrackerError, TrackerService, Weekday, WeekdaySet};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// 2026-10-12 is a Monday.
fn session(today: NaiveDate) -> TrackerService {
    TrackerService::builder()
        .with_clock(Box::new(FixedClock(today)))
        .build()
        .unwrap()
}

fn habit(name: &str, days: &[Weekday]) -> NewTracker {
    NewTracker::from_palette(name, 0, 0, days.iter().copied().collect()).unwrap()
}

fn due_names(service: &TrackerService, on: NaiveDate) -> Vec<(String, Vec<String>)> {
    service
        .due_on(on)
        .into_iter()
        .map(|section| {
            let names = section.trackers.into_iter().map(|t| t.name).collect();
            (section.title, names)
        })
        .collect()
}

#[test]
fn chores_are_due_on_their_weekdays_only() {
    let mut service = session(date(2026, 10, 17));
    service.create_category("Chores").unwrap();
    service
        .create_tracker(habit("Dishes", &[Weekday::Monday, Weekday::Wednesday]), "Chores")
        .unwrap();

    assert!(service.due_on(date(2026, 10, 13)).is_empty());
    assert_eq!(
        due_names(&service, date(2026, 10, 12)),
        vec![("Chores".to_string(), vec!["Dishes".to_string()])]
    );
}

#[test]
fn friday_tracker_and_unscheduled_tracker() {
    let mut service = session(date(2026, 10, 17));
    service.create_category("Home").unwrap();
    service
        .create_tracker(habit("Sweep", &[Weekday::Friday]), "Home")
        .unwrap();
    service
        .create_tracker(
            NewTracker::new("Someday", "🙂", "Color selection 1", WeekdaySet::EMPTY),
            "Home",
        )
        .unwrap();

    assert_eq!(
        due_names(&service, date(2026, 10, 16)),
        vec![("Home".to_string(), vec!["Sweep".to_string()])]
    );
    assert!(service.due_on(date(2026, 10, 17)).is_empty());
}

#[test]
fn pinning_regroups_without_touching_category_index() {
    let monday = date(2026, 10, 12);
    let mut service = session(monday);
    service.create_category("Chores").unwrap();
    service.create_category("Study").unwrap();
    let dishes = service
        .create_tracker(habit("Dishes", &[Weekday::Monday]).with_category_index(0), "Chores")
        .unwrap();
    service
        .create_tracker(habit("Reading", &[Weekday::Monday]).with_category_index(1), "Study")
        .unwrap();

    service.set_pinned(dishes, true).unwrap();
    assert_eq!(
        due_names(&service, monday),
        vec![
            ("Pinned".to_string(), vec!["Dishes".to_string()]),
            ("Study".to_string(), vec!["Reading".to_string()]),
        ]
    );

    service.select_filter(TrackerFilter::All);
    let all = service.visible("");
    assert_eq!(all[0].title, "Pinned");
    assert_eq!(service.tracker(dishes).unwrap().category_index, 0);
    assert_eq!(service.category_of(dishes), Some("Chores"));
}

#[test]
fn completion_is_idempotent_and_reversible() {
    let today = date(2026, 10, 14);
    let mut service = session(today);
    service.create_category("Chores").unwrap();
    let id = service
        .create_tracker(habit("Dishes", &[Weekday::Monday, Weekday::Wednesday]), "Chores")
        .unwrap();

    assert_eq!(service.complete(id, today).unwrap(), CompletionOutcome::Completed);
    assert!(service.is_completed_on(id, today));
    assert_eq!(
        service.complete(id, today).unwrap(),
        CompletionOutcome::AlreadyCompleted
    );
    assert_eq!(service.completed_count(id), 1);

    assert_eq!(
        service.complete(id, date(2026, 10, 15)).unwrap(),
        CompletionOutcome::FutureDateRejected
    );
    assert_eq!(service.completed_count(id), 1);

    assert_eq!(service.uncomplete(id, today).unwrap(), UncompleteOutcome::Removed);
    assert!(!service.is_completed_on(id, today));
    assert_eq!(service.completed_count(id), 0);
}

#[test]
fn search_narrows_the_due_set() {
    let monday = date(2026, 10, 12);
    let mut service = session(monday);
    service.create_category("Chores").unwrap();
    service
        .create_tracker(habit("Dishes", &[Weekday::Monday]), "Chores")
        .unwrap();
    service
        .create_tracker(habit("Ironing", &[Weekday::Monday]), "Chores")
        .unwrap();

    let due = service.due_on(monday);
    let found = search(&Default::default(), &due, "Dish", monday);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].trackers.len(), 1);
    assert_eq!(found[0].trackers[0].name, "Dishes");
    assert_eq!(service.visible("Dish"), found);
}

#[test]
fn duplicate_category_title_is_rejected() {
    let mut service = session(date(2026, 10, 12));
    service.create_category("Chores").unwrap();
    let err = service.create_category("Chores").unwrap_err();
    assert!(matches!(err, TrackerError::DuplicateTitle { ref title } if title == "Chores"));
    assert_eq!(service.categories().len(), 1);
}

#[test]
fn completed_and_not_completed_partition_every_tracker() {
    let monday = date(2026, 10, 12);
    let mut service = session(monday);
    service.create_category("Chores").unwrap();
    let dishes = service
        .create_tracker(habit("Dishes", &[Weekday::Monday]), "Chores")
        .unwrap();
    service
        .create_tracker(habit("Laundry", &[Weekday::Saturday]), "Chores")
        .unwrap();
    service.complete(dishes, monday).unwrap();

    service.select_filter(TrackerFilter::Completed);
    let completed = service.visible("");
    assert_eq!(completed[0].trackers.len(), 1);
    assert_eq!(completed[0].trackers[0].id, dishes);

    service.select_filter(TrackerFilter::NotCompleted);
    let pending = service.visible("");
    assert_eq!(pending[0].trackers.len(), 1);
    assert_eq!(pending[0].trackers[0].name, "Laundry");
}

#[test]
fn persisted_state_reloads_into_a_new_session() {
    let store = std::sync::Arc::new(MemoryStore::new());
    let monday = date(2026, 10, 12);
    let id = {
        let mut service = TrackerService::builder()
            .with_store(Box::new(store.clone()))
            .with_clock(Box::new(FixedClock(monday)))
            .build()
            .unwrap();
        service.create_category("Chores").unwrap();
        let id = service
            .create_tracker(habit("Dishes", &[Weekday::Monday]), "Chores")
            .unwrap();
        service.complete(id, monday).unwrap();
        id
    };

    assert_eq!(store.load_records().unwrap().len(), 1);
    let service = TrackerService::builder()
        .with_store(Box::new(store))
        .with_clock(Box::new(FixedClock(monday)))
        .build()
        .unwrap();
    assert!(service.is_completed_on(id, monday));
    assert_eq!(service.stats().active_days, 1);
}
