//! One-time import of onboarding quiz answers into the filter state
//!
//! The discovery view may be entered with the answers of one of two quizzes.
//! They are applied once, on entry, and never again for the same entry.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::filter::{FilterPanel, FilterState, PriceRange};
use crate::models::{DifficultyTier, LooseNumber, Region};

/// Answers of the beginner quiz, which asks where the trip starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationFirstAnswers {
    pub address: String,
    #[serde(default)]
    pub trip_duration: Option<String>,
    #[serde(default)]
    pub no_time_limit: bool,
    /// `daily` or `total`
    #[serde(default)]
    pub cost_type: Option<String>,
    #[serde(default)]
    pub cost_amount: Option<LooseNumber>,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// Answers of the experienced-skier quiz
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileFirstAnswers {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub skill: Option<String>,
    #[serde(default)]
    pub budget: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// A payload carrying `address` is location-first, anything else profile-first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferencePayload {
    LocationFirst(LocationFirstAnswers),
    ProfileFirst(ProfileFirstAnswers),
}

/// Closes `panel` after `after` unless another panel was opened meanwhile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelDismissal {
    pub panel: FilterPanel,
    pub after: Duration,
}

impl PanelDismissal {
    pub fn apply(&self, state: &mut FilterState) {
        if state.active_panel == Some(self.panel) {
            state.active_panel = None;
        }
    }
}

/// Follow-up work for the host after an import
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub applied: bool,
    /// Location text that should be geocoded
    pub geocode: Option<String>,
    pub dismissal: Option<PanelDismissal>,
}

pub fn skill_tier(skill: &str) -> Option<DifficultyTier> {
    match skill.trim().to_lowercase().as_str() {
        "beginner" => Some(DifficultyTier::Green),
        "intermediate" => Some(DifficultyTier::Blue),
        "advanced" => Some(DifficultyTier::Black),
        "expert" => Some(DifficultyTier::DoubleBlack),
        _ => None,
    }
}

pub fn budget_band(budget: &str) -> Option<PriceRange> {
    let (min, max) = match budget.trim().to_lowercase().as_str() {
        "budget" => (0.0, 100.0),
        "moderate" => (100.0, 200.0),
        "premium" => (200.0, 300.0),
        "luxury" => (300.0, 500.0),
        _ => return None,
    };
    Some(PriceRange::new(min, max))
}

pub struct PreferenceImportAdapter {
    payload: Option<PreferencePayload>,
    panel_dismiss: Duration,
}

impl PreferenceImportAdapter {
    #[must_use]
    pub fn new(payload: Option<PreferencePayload>, panel_dismiss: Duration) -> Self {
        Self {
            payload,
            panel_dismiss,
        }
    }

    /// Whether the payload is still waiting to be applied
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.payload.is_some()
    }

    /// Applies the payload once; later calls leave `state` untouched
    pub fn apply(&mut self, state: &mut FilterState) -> ImportOutcome {
        match self.payload.take() {
            None => {
                debug!("No quiz preferences to apply");
                ImportOutcome::default()
            }
            Some(PreferencePayload::LocationFirst(answers)) => {
                info!("Applying location-first quiz preferences");
                apply_location_first(&answers, state)
            }
            Some(PreferencePayload::ProfileFirst(answers)) => {
                info!("Applying profile-first quiz preferences");
                apply_profile_first(&answers, state, self.panel_dismiss)
            }
        }
    }
}

fn apply_location_first(answers: &LocationFirstAnswers, state: &mut FilterState) -> ImportOutcome {
    if answers.cost_type.as_deref() == Some("daily") {
        let amount = answers.cost_amount.as_ref().and_then(LooseNumber::as_f64);
        if let Some(amount) = amount.filter(|a| a.is_finite() && *a > 0.0) {
            state.price = PriceRange::new(0.0, amount);
        }
    }

    state.difficulties = [DifficultyTier::Green].into_iter().collect();

    let address = answers.address.trim();
    if address.is_empty() {
        state.active_panel = Some(FilterPanel::Difficulty);
        return ImportOutcome {
            applied: true,
            ..ImportOutcome::default()
        };
    }

    state.distance.location_text = address.to_string();
    state.distance.anchor = None;
    state.active_panel = Some(FilterPanel::Distance);
    ImportOutcome {
        applied: true,
        geocode: Some(address.to_string()),
        dismissal: None,
    }
}

fn apply_profile_first(
    answers: &ProfileFirstAnswers,
    state: &mut FilterState,
    panel_dismiss: Duration,
) -> ImportOutcome {
    let mut outcome = ImportOutcome {
        applied: true,
        ..ImportOutcome::default()
    };

    if let Some(region) = answers.region.as_deref().and_then(Region::normalize) {
        state.region = Some(region);
        state.active_panel = Some(FilterPanel::Region);
        outcome.dismissal = Some(PanelDismissal {
            panel: FilterPanel::Region,
            after: panel_dismiss,
        });
    }

    if let Some(tier) = answers.skill.as_deref().and_then(skill_tier) {
        state.difficulties = [tier].into_iter().collect();
    }

    if let Some(band) = answers.budget.as_deref().and_then(budget_band) {
        state.price = band;
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    const DISMISS: Duration = Duration::from_millis(1500);

    fn import(payload: serde_json::Value) -> (FilterState, ImportOutcome) {
        let payload: PreferencePayload = serde_json::from_value(payload).unwrap();
        let mut adapter = PreferenceImportAdapter::new(Some(payload), DISMISS);
        let mut state = FilterState::default();
        let outcome = adapter.apply(&mut state);
        (state, outcome)
    }

    #[test]
    fn test_payload_shape_detection() {
        let location: PreferencePayload =
            serde_json::from_value(json!({ "address": "", "costAmount": 50 })).unwrap();
        assert!(matches!(location, PreferencePayload::LocationFirst(_)));

        let profile: PreferencePayload =
            serde_json::from_value(json!({ "region": "West", "skill": "expert" })).unwrap();
        assert!(matches!(profile, PreferencePayload::ProfileFirst(_)));
    }

    #[test]
    fn test_empty_address_with_daily_budget() {
        let (state, outcome) =
            import(json!({ "address": "", "costType": "daily", "costAmount": "120" }));
        assert_eq!(state.price, PriceRange::new(0.0, 120.0));
        assert_eq!(state.active_panel, Some(FilterPanel::Difficulty));
        assert!(state.difficulties.contains(&DifficultyTier::Green));
        assert_eq!(outcome.geocode, None);
    }

    #[test]
    fn test_address_opens_distance_panel() {
        let (state, outcome) = import(json!({
            "address": "Denver, CO",
            "tripDuration": "3",
            "noTimeLimit": false,
            "costType": "total",
            "costAmount": "900",
            "interests": ["Night Skiing"]
        }));
        assert_eq!(state.active_panel, Some(FilterPanel::Distance));
        assert_eq!(state.distance.location_text, "Denver, CO");
        assert!(!state.distance.is_active());
        // total budgets do not touch the price slider
        assert_eq!(state.price, PriceRange::new(0.0, 400.0));
        assert_eq!(outcome.geocode.as_deref(), Some("Denver, CO"));
    }

    #[rstest]
    #[case(json!("0"))]
    #[case(json!("abc"))]
    #[case(json!(""))]
    #[case(json!(-20))]
    fn test_unusable_daily_amount_keeps_price(#[case] amount: serde_json::Value) {
        let (state, _) = import(json!({ "address": "", "costType": "daily", "costAmount": amount }));
        assert_eq!(state.price, PriceRange::new(0.0, 400.0));
    }

    #[rstest]
    #[case("beginner", DifficultyTier::Green)]
    #[case("intermediate", DifficultyTier::Blue)]
    #[case("advanced", DifficultyTier::Black)]
    #[case("expert", DifficultyTier::DoubleBlack)]
    fn test_skill_maps_to_single_tier(#[case] skill: &str, #[case] tier: DifficultyTier) {
        let (state, _) = import(json!({ "skill": skill }));
        assert_eq!(state.difficulties.len(), 1);
        assert!(state.difficulties.contains(&tier));
    }

    #[rstest]
    #[case("budget", 0.0, 100.0)]
    #[case("moderate", 100.0, 200.0)]
    #[case("premium", 200.0, 300.0)]
    #[case("luxury", 300.0, 500.0)]
    fn test_budget_bands(#[case] budget: &str, #[case] min: f64, #[case] max: f64) {
        let (state, _) = import(json!({ "budget": budget }));
        assert_eq!(state.price, PriceRange::new(min, max));
    }

    #[test]
    fn test_region_opens_panel_briefly() {
        let (mut state, outcome) = import(json!({ "region": "Eastern" }));
        assert_eq!(state.region, Some(Region::East));
        assert_eq!(state.active_panel, Some(FilterPanel::Region));

        let dismissal = outcome.dismissal.unwrap();
        assert_eq!(dismissal.after, DISMISS);
        dismissal.apply(&mut state);
        assert_eq!(state.active_panel, None);
    }

    #[test]
    fn test_dismissal_leaves_other_panel_open() {
        let (mut state, outcome) = import(json!({ "region": "rocky" }));
        state.toggle_panel(FilterPanel::Price);
        outcome.dismissal.unwrap().apply(&mut state);
        assert_eq!(state.active_panel, Some(FilterPanel::Price));
    }

    #[test]
    fn test_unknown_region_is_ignored() {
        let (state, outcome) = import(json!({ "region": "Alps" }));
        assert_eq!(state.region, None);
        assert_eq!(state.active_panel, None);
        assert_eq!(outcome.dismissal, None);
    }

    #[test]
    fn test_absent_payload_and_second_application_are_no_ops() {
        let mut state = FilterState::default();
        let outcome = PreferenceImportAdapter::new(None, DISMISS).apply(&mut state);
        assert!(!outcome.applied);
        assert_eq!(state, FilterState::default());

        let payload = serde_json::from_value(json!({ "budget": "luxury" })).unwrap();
        let mut adapter = PreferenceImportAdapter::new(Some(payload), DISMISS);
        adapter.apply(&mut state);
        assert!(!adapter.is_pending());

        let mut fresh = FilterState::default();
        let again = adapter.apply(&mut fresh);
        assert!(!again.applied);
        assert_eq!(fresh, FilterState::default());
    }
}
