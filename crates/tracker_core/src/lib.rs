pub mod changes;
pub mod completion;
pub mod error;
pub mod filter;
pub mod model;
pub mod palette;
pub mod schedule;
pub mod search;
pub mod service;
pub mod settings;
pub mod store;
pub mod weekday;

pub use crate::error::{StoreError, TrackerError};
pub use crate::model::{NewTracker, Tracker, TrackerCategory, TrackerId, TrackerRecord};
pub use crate::service::{TrackerService, TrackerServiceBuilder};
pub use crate::weekday::{Weekday, WeekdaySet};
