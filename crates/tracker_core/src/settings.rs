use serde::{Deserialize, Serialize};

use crate::filter::DateChangePolicy;
use crate::schedule::DEFAULT_PINNED_TITLE;

/// Per-user session preferences, persisted alongside the entities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionSettings {
    pub onboarding_completed: bool,
    pub date_change_policy: DateChangePolicy,
    pub pinned_title: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            onboarding_completed: false,
            date_change_policy: DateChangePolicy::default(),
            pinned_title: DEFAULT_PINNED_TITLE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let settings: SessionSettings =
            serde_json::from_str(r#"{"onboarding_completed": true}"#).unwrap();
        assert!(settings.onboarding_completed);
        assert_eq!(settings.pinned_title, "Pinned");
        assert_eq!(
            settings.date_change_policy,
            DateChangePolicy::ResetToDueToday
        );
    }
}
