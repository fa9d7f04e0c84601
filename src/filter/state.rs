//! Filter state: the values behind every filter pill and detail panel

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::FilterConfig;
use crate::models::{Amenity, Coordinate, DifficultyTier, Region};

/// Smallest gap the price slider keeps between its two handles
pub const PRICE_SLIDER_GAP: f64 = 10.0;

/// Inclusive `[min, max]` price range in dollars
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }

    /// Moves the lower handle, never closer than the slider gap to `max`
    pub fn set_min(&mut self, value: f64) {
        self.min = value.min(self.max - PRICE_SLIDER_GAP).max(0.0);
    }

    /// Moves the upper handle, never closer than the slider gap to `min`
    pub fn set_max(&mut self, value: f64) {
        self.max = value.max(self.min + PRICE_SLIDER_GAP);
    }
}

/// Free-text location, its resolved anchor and the search radius
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DistanceQuery {
    pub location_text: String,
    pub anchor: Option<Coordinate>,
    pub radius_miles: Option<f64>,
}

/// An active distance query reduced to what the predicate and the map need
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveDistance {
    pub anchor: Coordinate,
    pub radius_miles: f64,
}

impl DistanceQuery {
    /// Active only with non-empty text, a resolved anchor and a usable radius
    #[must_use]
    pub fn active(&self) -> Option<ActiveDistance> {
        if self.location_text.trim().is_empty() {
            return None;
        }
        let anchor = self.anchor?;
        let radius_miles = self.radius_miles.filter(|r| r.is_finite() && *r >= 0.0)?;
        Some(ActiveDistance {
            anchor,
            radius_miles,
        })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active().is_some()
    }
}

/// Detail panels of the filter bar; at most one is open at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterPanel {
    Price,
    Difficulty,
    Region,
    Distance,
    Amenities,
}

/// Values restored by the per-dimension resets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterDefaults {
    pub price_max: f64,
    pub radius_miles: f64,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            price_max: 400.0,
            radius_miles: 100.0,
        }
    }
}

impl From<&FilterConfig> for FilterDefaults {
    fn from(config: &FilterConfig) -> Self {
        Self {
            price_max: config.price_max,
            radius_miles: config.default_radius_miles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub price: PriceRange,
    pub difficulties: BTreeSet<DifficultyTier>,
    pub region: Option<Region>,
    pub distance: DistanceQuery,
    pub amenities: BTreeSet<Amenity>,
    pub favorites_active: bool,
    pub active_panel: Option<FilterPanel>,
    /// Inline message shown under the location field after a failed lookup
    pub location_error: Option<String>,
    defaults: FilterDefaults,
}

impl Default for FilterState {
    fn default() -> Self {
        Self::with_defaults(FilterDefaults::default())
    }
}

impl FilterState {
    #[must_use]
    pub fn with_defaults(defaults: FilterDefaults) -> Self {
        Self {
            price: PriceRange::new(0.0, defaults.price_max),
            difficulties: BTreeSet::new(),
            region: None,
            distance: DistanceQuery {
                location_text: String::new(),
                anchor: None,
                radius_miles: Some(defaults.radius_miles),
            },
            amenities: BTreeSet::new(),
            favorites_active: false,
            active_panel: None,
            location_error: None,
            defaults,
        }
    }

    #[must_use]
    pub fn defaults(&self) -> FilterDefaults {
        self.defaults
    }

    /// Whether a dimension currently narrows the results (filter pill highlight)
    #[must_use]
    pub fn is_dimension_active(&self, panel: FilterPanel) -> bool {
        match panel {
            FilterPanel::Price => {
                self.price != PriceRange::new(0.0, self.defaults.price_max)
            }
            FilterPanel::Difficulty => !self.difficulties.is_empty(),
            FilterPanel::Region => self.region.is_some(),
            FilterPanel::Distance => self.distance.is_active(),
            FilterPanel::Amenities => !self.amenities.is_empty(),
        }
    }

    /// Opens `panel`, or closes it when it is already the open one
    pub fn toggle_panel(&mut self, panel: FilterPanel) {
        if self.active_panel == Some(panel) {
            self.active_panel = None;
        } else {
            self.active_panel = Some(panel);
        }
    }

    /// Favorites is a plain toggle; it closes any open panel
    pub fn toggle_favorites(&mut self) {
        self.favorites_active = !self.favorites_active;
        self.active_panel = None;
    }

    pub fn reset_price(&mut self) {
        self.price = PriceRange::new(0.0, self.defaults.price_max);
    }

    pub fn reset_difficulty(&mut self) {
        self.difficulties.clear();
    }

    pub fn reset_region(&mut self) {
        self.region = None;
    }

    pub fn reset_distance(&mut self) {
        self.distance = DistanceQuery {
            location_text: String::new(),
            anchor: None,
            radius_miles: Some(self.defaults.radius_miles),
        };
        self.location_error = None;
    }

    pub fn reset_amenities(&mut self) {
        self.amenities.clear();
    }

    pub fn reset_favorites(&mut self) {
        self.favorites_active = false;
    }

    /// Resets the dimension behind a panel
    pub fn reset(&mut self, panel: FilterPanel) {
        match panel {
            FilterPanel::Price => self.reset_price(),
            FilterPanel::Difficulty => self.reset_difficulty(),
            FilterPanel::Region => self.reset_region(),
            FilterPanel::Distance => self.reset_distance(),
            FilterPanel::Amenities => self.reset_amenities(),
        }
    }
}
