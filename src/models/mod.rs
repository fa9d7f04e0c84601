//! Data models for the SlopeFinder engine
//!
//! This module contains the core domain models organized by concern:
//! - Coordinate: Geographic coordinates and their validity
//! - Resort: Externally sourced resort records and their loosely typed fields
//! - Catalog: Fixed enumerations (difficulty tiers, amenities, regions)

pub mod catalog;
pub mod coordinate;
pub mod resort;

// Re-export all public types for convenient access
pub use catalog::{Amenity, Bounds, DifficultyTier, Region, RegionView};
pub use coordinate::Coordinate;
pub use resort::{Difficulty, DifficultyBreakdown, LooseNumber, Resort, parse_percentage, parse_price};
