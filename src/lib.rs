//! `SlopeFinder` - ski resort discovery engine
//!
//! This library provides composable resort filters (price, difficulty, region,
//! distance, amenities, favorites), optimistic favorites persistence and a map
//! controller that keeps camera and overlays in step with the filters.

pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod favorites;
pub mod filter;
pub mod geo;
pub mod geocoding;
pub mod map;
pub mod models;
pub mod preferences;
pub mod source;
pub mod telemetry;

// Re-export core types for public API
pub use cache::{GeocodeCache, GeocodeKey};
pub use config::SlopeFinderConfig;
pub use discovery::Discovery;
pub use error::SlopeFinderError;
pub use favorites::{FavoritesRemote, FavoritesStore, PendingToggle, ToggleOutcome};
pub use filter::{FilterEngine, FilterPanel, FilterState, PriceRange};
pub use geocoding::{CachedGeocoder, Geocoder, LocationQuery, OpenMeteoGeocoder};
pub use map::{MapSurface, MapViewportController, RecordingSurface};
pub use models::{Amenity, Coordinate, DifficultyTier, Region, Resort};
pub use preferences::{PreferenceImportAdapter, PreferencePayload};
pub use source::ResortFeed;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, SlopeFinderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
