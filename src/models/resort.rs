//! Resort records as delivered by the remote store
//!
//! Records are externally sourced and loosely typed: coordinates may arrive as
//! numbers or strings, prices as currency text and run percentages as `"35%"`
//! or `"-"`. Accessors here turn those fields into typed values and return
//! `None` for anything malformed; they never fail.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{Amenity, Coordinate, DifficultyTier};

/// Any JSON scalar as text; numbers and booleans keep their literal form,
/// null and containers become empty
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    })
}

/// `None` for anything that does not fit `T`
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// `T::default()` for anything that does not fit `T`
fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// A number that may have been stored as a JSON number or as text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseNumber {
    Number(f64),
    Text(String),
}

impl LooseNumber {
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            LooseNumber::Number(n) => *n,
            LooseNumber::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// Run difficulty percentages per tier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyBreakdown {
    #[serde(default, deserialize_with = "lenient_text")]
    pub green: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub blue: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub double_blue: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub black: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub double_black: String,
}

impl DifficultyBreakdown {
    /// Raw percentage text for a tier
    #[must_use]
    pub fn raw(&self, tier: DifficultyTier) -> &str {
        match tier {
            DifficultyTier::Green => &self.green,
            DifficultyTier::Blue => &self.blue,
            DifficultyTier::DoubleBlue => &self.double_blue,
            DifficultyTier::Black => &self.black,
            DifficultyTier::DoubleBlack => &self.double_black,
        }
    }

    fn raw_mut(&mut self, tier: DifficultyTier) -> &mut String {
        match tier {
            DifficultyTier::Green => &mut self.green,
            DifficultyTier::Blue => &mut self.blue,
            DifficultyTier::DoubleBlue => &mut self.double_blue,
            DifficultyTier::Black => &mut self.black,
            DifficultyTier::DoubleBlack => &mut self.double_black,
        }
    }

    /// Parsed percentage for a tier; `None` for `"-"`, empty or garbage
    #[must_use]
    pub fn percent(&self, tier: DifficultyTier) -> Option<f64> {
        parse_percentage(self.raw(tier))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Difficulty {
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub percent: DifficultyBreakdown,
}

/// A ski resort record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resort {
    pub id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub state: String,
    /// Region tag, usually one of `East`, `West`, `Rocky`, `Central`
    #[serde(default, deserialize_with = "lenient_text")]
    pub region: String,
    #[serde(default, deserialize_with = "lenient")]
    pub latitude: Option<LooseNumber>,
    #[serde(default, deserialize_with = "lenient")]
    pub longitude: Option<LooseNumber>,
    /// Currency text such as `"$89.99"`
    #[serde(default, deserialize_with = "lenient_text")]
    pub full_day_ticket: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub half_day_ticket: String,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub difficulty: Difficulty,
    #[serde(default, deserialize_with = "lenient_text")]
    pub terrain_park: String,
    #[serde(default, deserialize_with = "lenient")]
    pub backcountry: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub snowmobile: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub snow_tubing: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub ice_skating: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub night_skiing: Option<bool>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub elevation: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub runs: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<f64>,
}

impl Resort {
    /// Bare record with only an identifier and a name
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            state: String::new(),
            region: String::new(),
            latitude: None,
            longitude: None,
            full_day_ticket: String::new(),
            half_day_ticket: String::new(),
            difficulty: Difficulty::default(),
            terrain_park: String::new(),
            backcountry: None,
            snowmobile: None,
            snow_tubing: None,
            ice_skating: None,
            night_skiing: None,
            description: String::new(),
            url: None,
            elevation: None,
            runs: None,
            rating: None,
        }
    }

    #[must_use]
    pub fn with_coordinate(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(LooseNumber::Number(latitude));
        self.longitude = Some(LooseNumber::Number(longitude));
        self
    }

    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    #[must_use]
    pub fn with_price(mut self, full_day_ticket: impl Into<String>) -> Self {
        self.full_day_ticket = full_day_ticket.into();
        self
    }

    #[must_use]
    pub fn with_difficulty(mut self, tier: DifficultyTier, percent: impl Into<String>) -> Self {
        *self.difficulty.percent.raw_mut(tier) = percent.into();
        self
    }

    #[must_use]
    pub fn with_amenity(mut self, amenity: Amenity) -> Self {
        match amenity {
            Amenity::TerrainPark => self.terrain_park = "Yes".to_string(),
            Amenity::NightSkiing => self.night_skiing = Some(true),
            Amenity::Backcountry => self.backcountry = Some(true),
            Amenity::Snowmobile => self.snowmobile = Some(true),
            Amenity::SnowTubing => self.snow_tubing = Some(true),
            Amenity::IceSkating => self.ice_skating = Some(true),
        }
        self
    }

    /// Validated coordinate, `None` when missing, non-numeric or out of range
    #[must_use]
    pub fn coordinate(&self) -> Option<Coordinate> {
        let latitude = self.latitude.as_ref()?.as_f64()?;
        let longitude = self.longitude.as_ref()?.as_f64()?;
        let coordinate = Coordinate::new(latitude, longitude);
        coordinate.is_valid().then_some(coordinate)
    }

    /// Full-day ticket price in dollars
    #[must_use]
    pub fn full_day_price(&self) -> Option<f64> {
        parse_price(&self.full_day_ticket)
    }

    #[must_use]
    pub fn difficulty_percent(&self, tier: DifficultyTier) -> Option<f64> {
        self.difficulty.percent.percent(tier)
    }

    #[must_use]
    pub fn offers(&self, amenity: Amenity) -> bool {
        match amenity {
            Amenity::TerrainPark => {
                let value = self.terrain_park.trim().to_lowercase();
                !matches!(value.as_str(), "" | "no" | "none" | "-" | "0" | "false")
            }
            Amenity::NightSkiing => self.night_skiing == Some(true),
            Amenity::Backcountry => self.backcountry == Some(true),
            Amenity::Snowmobile => self.snowmobile == Some(true),
            Amenity::SnowTubing => self.snow_tubing == Some(true),
            Amenity::IceSkating => self.ice_skating == Some(true),
        }
    }
}

/// Extracts a number from currency text by dropping everything but digits and `.`
#[must_use]
pub fn parse_price(text: &str) -> Option<f64> {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Parses `"35%"` style text; `"-"` and empty mean no runs of that tier
#[must_use]
pub fn parse_percentage(text: &str) -> Option<f64> {
    let trimmed = text.trim().trim_end_matches('%').trim();
    if trimmed.is_empty() || trimmed == "-" {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|p| p.is_finite())
}
