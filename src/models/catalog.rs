//! Fixed enumerations shared by the filters, the map and the preference import

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Coordinate;

/// One of the five run difficulty categories, easiest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DifficultyTier {
    Green,
    Blue,
    #[serde(rename = "Double Blue")]
    DoubleBlue,
    Black,
    #[serde(rename = "Double Black")]
    DoubleBlack,
}

impl DifficultyTier {
    pub const ALL: [DifficultyTier; 5] = [
        DifficultyTier::Green,
        DifficultyTier::Blue,
        DifficultyTier::DoubleBlue,
        DifficultyTier::Black,
        DifficultyTier::DoubleBlack,
    ];

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            DifficultyTier::Green => "Green",
            DifficultyTier::Blue => "Blue",
            DifficultyTier::DoubleBlue => "Double Blue",
            DifficultyTier::Black => "Black",
            DifficultyTier::DoubleBlack => "Double Black",
        }
    }
}

/// Amenities a resort may advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Amenity {
    #[serde(rename = "Night Skiing")]
    NightSkiing,
    #[serde(rename = "Terrain Park")]
    TerrainPark,
    Backcountry,
    Snowmobile,
    #[serde(rename = "Snow Tubing")]
    SnowTubing,
    #[serde(rename = "Ice Skating")]
    IceSkating,
}

impl Amenity {
    pub const ALL: [Amenity; 6] = [
        Amenity::NightSkiing,
        Amenity::TerrainPark,
        Amenity::Backcountry,
        Amenity::Snowmobile,
        Amenity::SnowTubing,
        Amenity::IceSkating,
    ];

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Amenity::NightSkiing => "Night Skiing",
            Amenity::TerrainPark => "Terrain Park",
            Amenity::Backcountry => "Backcountry",
            Amenity::Snowmobile => "Snowmobile",
            Amenity::SnowTubing => "Snow Tubing",
            Amenity::IceSkating => "Ice Skating",
        }
    }
}

/// Latitude/longitude box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

/// Camera target and highlight style for a region
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionView {
    pub center: Coordinate,
    pub zoom: f64,
    pub bounds: Bounds,
}

/// Region tags used by the resort collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Region {
    East,
    West,
    Rocky,
    Central,
}

impl Region {
    pub const ALL: [Region; 4] = [Region::East, Region::West, Region::Rocky, Region::Central];

    /// Tag as stored on resort records
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Region::East => "East",
            Region::West => "West",
            Region::Rocky => "Rocky",
            Region::Central => "Central",
        }
    }

    /// Highlight colour of the region overlay
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Region::East => "#4264fb",
            Region::West => "#D7961F",
            Region::Rocky => "#fb4242",
            Region::Central => "#003E1F",
        }
    }

    #[must_use]
    pub fn view(self) -> RegionView {
        match self {
            Region::East => RegionView {
                center: Coordinate::new(43.5, -73.5),
                zoom: 5.5,
                bounds: Bounds {
                    north: 47.5,
                    south: 35.0,
                    east: -67.0,
                    west: -85.0,
                },
            },
            Region::West => RegionView {
                center: Coordinate::new(43.0, -120.0),
                zoom: 4.0,
                bounds: Bounds {
                    north: 49.0,
                    south: 32.0,
                    east: -110.0,
                    west: -125.0,
                },
            },
            Region::Rocky => RegionView {
                center: Coordinate::new(43.0, -109.0),
                zoom: 4.0,
                bounds: Bounds {
                    north: 49.0,
                    south: 31.0,
                    east: -103.0,
                    west: -115.0,
                },
            },
            Region::Central => RegionView {
                center: Coordinate::new(42.0, -92.0),
                zoom: 4.0,
                bounds: Bounds {
                    north: 49.0,
                    south: 29.0,
                    east: -85.0,
                    west: -103.0,
                },
            },
        }
    }

    /// Lenient lookup used for quiz answers (`eastern`, `West`, ...)
    #[must_use]
    pub fn normalize(value: &str) -> Option<Region> {
        match value.trim().to_lowercase().as_str() {
            "east" | "eastern" => Some(Region::East),
            "west" | "western" => Some(Region::West),
            "rocky" => Some(Region::Rocky),
            "central" => Some(Region::Central),
            _ => None,
        }
    }
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl fmt::Display for Amenity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Lowercases and drops spaces, dashes and underscores
fn compact(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

impl FromStr for DifficultyTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = compact(s);
        DifficultyTier::ALL
            .into_iter()
            .find(|tier| compact(tier.display_name()) == wanted)
            .ok_or_else(|| format!("unknown difficulty tier '{s}'"))
    }
}

impl FromStr for Amenity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = compact(s);
        Amenity::ALL
            .into_iter()
            .find(|amenity| compact(amenity.display_name()) == wanted)
            .ok_or_else(|| format!("unknown amenity '{s}'"))
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::normalize(s).ok_or_else(|| format!("unknown region '{s}'"))
    }
}
