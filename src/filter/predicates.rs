//! One pure `Resort -> bool` test per filter dimension
//!
//! An absent constraint always passes, so every predicate is the identity
//! under AND-composition when its dimension is unused.

use std::collections::BTreeSet;

use super::state::{ActiveDistance, FilterState, PriceRange};
use crate::geo;
use crate::models::{Amenity, DifficultyTier, Region, Resort};

/// Run share a tier needs before a resort counts as offering it
pub const DEFAULT_DIFFICULTY_THRESHOLD: f64 = 30.0;

/// Unparseable prices fail: price is the filter that is always applied.
#[must_use]
pub fn price(resort: &Resort, range: &PriceRange) -> bool {
    resort
        .full_day_price()
        .is_some_and(|price| range.contains(price))
}

/// Passes when any selected tier reaches the threshold.
#[must_use]
pub fn difficulty(resort: &Resort, tiers: &BTreeSet<DifficultyTier>, threshold: f64) -> bool {
    if tiers.is_empty() {
        return true;
    }
    tiers.iter().any(|tier| {
        resort
            .difficulty_percent(*tier)
            .is_some_and(|percent| percent >= threshold)
    })
}

#[must_use]
pub fn region(resort: &Resort, region: Option<Region>) -> bool {
    match region {
        None => true,
        Some(region) => resort.region == region.tag(),
    }
}

/// Resorts without a usable coordinate never pass an active query.
#[must_use]
pub fn distance(resort: &Resort, query: Option<&ActiveDistance>) -> bool {
    let Some(query) = query else {
        return true;
    };
    match resort.coordinate() {
        Some(coordinate) => geo::distance_miles(&query.anchor, &coordinate) <= query.radius_miles,
        None => false,
    }
}

/// Passes when every selected amenity is offered.
#[must_use]
pub fn amenities(resort: &Resort, selected: &BTreeSet<Amenity>) -> bool {
    selected.iter().all(|amenity| resort.offers(*amenity))
}

#[must_use]
pub fn favorites(resort: &Resort, active: bool, favorites: &BTreeSet<String>) -> bool {
    !active || favorites.contains(&resort.id)
}

/// The filter-relevant projection of [`FilterState`].
///
/// Panel visibility and inline messages are left out so that they never
/// invalidate a computed result.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    pub price: PriceRange,
    pub difficulties: BTreeSet<DifficultyTier>,
    pub difficulty_threshold: f64,
    pub region: Option<Region>,
    pub distance: Option<ActiveDistance>,
    pub amenities: BTreeSet<Amenity>,
    pub favorites_active: bool,
}

impl FilterCriteria {
    #[must_use]
    pub fn from_state(state: &FilterState, difficulty_threshold: f64) -> Self {
        Self {
            price: state.price,
            difficulties: state.difficulties.clone(),
            difficulty_threshold,
            region: state.region,
            distance: state.distance.active(),
            amenities: state.amenities.clone(),
            favorites_active: state.favorites_active,
        }
    }

    /// Predicates with a live constraint; price first, favorites last
    #[must_use]
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = vec![Predicate::Price(self.price)];
        if !self.difficulties.is_empty() {
            predicates.push(Predicate::Difficulty {
                tiers: self.difficulties.clone(),
                threshold: self.difficulty_threshold,
            });
        }
        if let Some(region) = self.region {
            predicates.push(Predicate::Region(region));
        }
        if let Some(query) = self.distance {
            predicates.push(Predicate::Distance(query));
        }
        if !self.amenities.is_empty() {
            predicates.push(Predicate::Amenities(self.amenities.clone()));
        }
        if self.favorites_active {
            predicates.push(Predicate::Favorites);
        }
        predicates
    }
}

/// A single filter dimension with its constraint
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Price(PriceRange),
    Difficulty {
        tiers: BTreeSet<DifficultyTier>,
        threshold: f64,
    },
    Region(Region),
    Distance(ActiveDistance),
    Amenities(BTreeSet<Amenity>),
    Favorites,
}

impl Predicate {
    #[must_use]
    pub fn test(&self, resort: &Resort, favorite_ids: &BTreeSet<String>) -> bool {
        match self {
            Predicate::Price(range) => price(resort, range),
            Predicate::Difficulty { tiers, threshold } => difficulty(resort, tiers, *threshold),
            Predicate::Region(tag) => region(resort, Some(*tag)),
            Predicate::Distance(query) => distance(resort, Some(query)),
            Predicate::Amenities(selected) => amenities(resort, selected),
            Predicate::Favorites => favorites(resort, true, favorite_ids),
        }
    }
}

/// AND of every predicate; an empty slice keeps every resort
#[must_use]
pub fn compose(
    predicates: &[Predicate],
    favorite_ids: &BTreeSet<String>,
) -> impl Fn(&Resort) -> bool {
    move |resort: &Resort| {
        predicates
            .iter()
            .all(|predicate| predicate.test(resort, favorite_ids))
    }
}

/// Resorts passing every predicate, in collection order
#[must_use]
pub fn apply(
    resorts: &[Resort],
    predicates: &[Predicate],
    favorite_ids: &BTreeSet<String>,
) -> Vec<Resort> {
    let keep = compose(predicates, favorite_ids);
    resorts.iter().filter(|resort| keep(resort)).cloned().collect()
}

/// How many of `resorts` are favorited
#[must_use]
pub fn favorites_count(resorts: &[Resort], favorite_ids: &BTreeSet<String>) -> usize {
    resorts
        .iter()
        .filter(|resort| favorite_ids.contains(&resort.id))
        .count()
}
