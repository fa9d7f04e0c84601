//! Open-Meteo geocoding client (no API key required)

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::Geocoder;
use crate::SlopeFinderError;
use crate::config::GeocodingConfig;
use crate::models::Coordinate;

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeocodingResult>>,
}

#[derive(Debug, Deserialize)]
struct GeocodingResult {
    name: String,
    latitude: f64,
    longitude: f64,
    country: Option<String>,
    admin1: Option<String>,
}

impl GeocodingResult {
    fn label(&self) -> String {
        match (&self.admin1, &self.country) {
            (Some(state), _) => format!("{}, {}", self.name, state),
            (None, Some(country)) => format!("{}, {}", self.name, country),
            (None, None) => self.name.clone(),
        }
    }
}

pub struct OpenMeteoGeocoder {
    client: Client,
    base_url: String,
}

impl OpenMeteoGeocoder {
    pub fn new(config: &GeocodingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("SlopeFinder/", env!("CARGO_PKG_VERSION")))
            .build()
            .with_context(|| "Failed to create HTTP client")?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, text: &str) -> String {
        format!(
            "{}/search?name={}&count=5&language=en&format=json",
            self.base_url,
            urlencoding::encode(text)
        )
    }

    async fn search(&self, text: &str) -> Result<Vec<GeocodingResult>> {
        let response = self
            .client
            .get(self.search_url(text))
            .send()
            .await
            .with_context(|| "Geocoding request failed")?
            .error_for_status()
            .with_context(|| "Geocoding service returned an error")?;
        let parsed: GeocodingResponse = response
            .json()
            .await
            .with_context(|| "Failed to parse OpenMeteo geocoding response")?;
        Ok(parsed.results.unwrap_or_default())
    }
}

#[async_trait]
impl Geocoder for OpenMeteoGeocoder {
    #[instrument(skip(self))]
    async fn resolve(&self, text: &str) -> Result<Coordinate, SlopeFinderError> {
        let start = Instant::now();
        let results = self.search(text).await.map_err(|e| {
            warn!("Geocoding '{}' failed: {:#}", text, e);
            SlopeFinderError::geocode(text, format!("{e:#}"))
        })?;

        let Some(best) = results.into_iter().next() else {
            warn!("No results found for location '{}'", text);
            return Err(SlopeFinderError::geocode(text, "no results"));
        };
        let coordinate = Coordinate::new(best.latitude, best.longitude);
        if !coordinate.is_valid() {
            return Err(SlopeFinderError::geocode(text, "invalid coordinate in response"));
        }

        info!(
            "Resolved '{}' to {} ({}) in {:.3}s",
            text,
            best.label(),
            coordinate.format_coordinates(),
            start.elapsed().as_secs_f64()
        );
        debug!(country = ?best.country, "Geocoding result");
        Ok(coordinate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geocoder(base_url: &str) -> OpenMeteoGeocoder {
        let config = GeocodingConfig {
            base_url: base_url.to_string(),
            ..GeocodingConfig::default()
        };
        OpenMeteoGeocoder::new(&config).unwrap()
    }

    #[test]
    fn test_search_url_encodes_query() {
        let url = geocoder("https://geocoding-api.open-meteo.com/v1/").search_url("Salt Lake City");
        assert_eq!(
            url,
            "https://geocoding-api.open-meteo.com/v1/search?name=Salt%20Lake%20City&count=5&language=en&format=json"
        );
    }

    #[test]
    fn test_response_parsing() {
        let body = r#"{"results":[{"id":1,"name":"Denver","latitude":39.73915,"longitude":-104.9847,"country":"United States","admin1":"Colorado"}],"generationtime_ms":0.5}"#;
        let parsed: GeocodingResponse = serde_json::from_str(body).unwrap();
        let results = parsed.results.unwrap();
        assert_eq!(results[0].label(), "Denver, Colorado");
        assert_eq!(results[0].latitude, 39.73915);

        let empty: GeocodingResponse = serde_json::from_str(r#"{"generationtime_ms":0.5}"#).unwrap();
        assert!(empty.results.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_service_is_geocode_error() {
        let err = geocoder("http://127.0.0.1:9")
            .resolve("Denver")
            .await
            .unwrap_err();
        assert!(matches!(err, SlopeFinderError::Geocode { .. }));
    }
}
