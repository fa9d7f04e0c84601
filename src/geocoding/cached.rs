//! Geocoder decorator backed by the persistent cache

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use super::Geocoder;
use crate::SlopeFinderError;
use crate::cache::{GeocodeCache, GeocodeKey};
use crate::models::Coordinate;

pub struct CachedGeocoder<G> {
    inner: G,
    cache: GeocodeCache,
}

impl<G: Geocoder> CachedGeocoder<G> {
    #[must_use]
    pub fn new(inner: G, cache: GeocodeCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    /// Failed lookups are not cached; cache errors only cost a remote call
    #[instrument(skip(self))]
    async fn resolve(&self, text: &str) -> Result<Coordinate, SlopeFinderError> {
        let key = GeocodeKey::new(text);
        match self.cache.lookup(&key).await {
            Ok(Some(coordinate)) => {
                debug!("Geocode cache hit");
                return Ok(coordinate);
            }
            Ok(None) => {}
            Err(e) => warn!("Geocode cache read failed: {e:#}"),
        }

        let coordinate = self.inner.resolve(text).await?;
        if let Err(e) = self.cache.remember(&key, coordinate).await {
            warn!("Geocode cache write failed: {e:#}");
        }
        Ok(coordinate)
    }
}
