//! On-disk memo of resolved place names

use std::fmt;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use fjall::Keyspace;
use rand::RngExt;
use serde::{Deserialize, Serialize};
use tokio::task;
use tracing::{debug, instrument};

use crate::geocoding::normalize_query;
use crate::models::Coordinate;

/// Normalized place name; queries differing only in case or spacing share one
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeocodeKey(String);

impl GeocodeKey {
    #[must_use]
    pub fn new(query: &str) -> Self {
        Self(normalize_query(query))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }
}

impl fmt::Display for GeocodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredPlace {
    latitude: f64,
    longitude: f64,
    /// Unix seconds
    expires_at: u64,
}

impl StoredPlace {
    fn is_fresh(&self, now: u64) -> bool {
        now < self.expires_at
    }

    fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Resolved coordinates per [`GeocodeKey`], each kept for roughly `ttl`
#[derive(Clone)]
pub struct GeocodeCache {
    places: Keyspace,
    ttl: Duration,
}

fn unix_now() -> Result<u64> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// `base` scaled by a random factor in `[0.9, 1.1)` so entries written
/// together do not all expire together
#[must_use]
pub fn jittered_ttl(base: Duration) -> Duration {
    let jitter: f64 = rand::rng().random_range(0.9..1.1);
    base.mul_f64(jitter)
}

impl GeocodeCache {
    /// Opens (or creates) the place database under `path`
    pub fn open(path: impl AsRef<Path>, ttl: Duration) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let places = db.keyspace("geocodes", fjall::KeyspaceCreateOptions::default)?;
        Ok(Self { places, ttl })
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Remembered coordinate for `key`; an expired entry is deleted and missed
    #[instrument(name = "lookup_geocode", level = "debug", skip(self))]
    pub async fn lookup(&self, key: &GeocodeKey) -> Result<Option<Coordinate>> {
        let places = self.places.clone();
        let key = key.to_bytes();
        let now = unix_now()?;

        let found = task::spawn_blocking(move || -> Result<Option<StoredPlace>> {
            let Some(bytes) = places.get(&key)?.map(|v| v.to_vec()) else {
                return Ok(None);
            };
            let place: StoredPlace =
                postcard::from_bytes(&bytes).context("Unreadable geocode entry")?;
            if place.is_fresh(now) {
                return Ok(Some(place));
            }
            places.remove(key)?;
            Ok(None)
        })
        .await??;

        match found {
            Some(place) => {
                debug!("Place remembered");
                Ok(Some(place.coordinate()))
            }
            None => {
                debug!("Place unknown or expired");
                Ok(None)
            }
        }
    }

    /// Remembers `coordinate` for a jittered [`GeocodeCache::ttl`]
    #[instrument(name = "remember_geocode", level = "debug", skip(self))]
    pub async fn remember(&self, key: &GeocodeKey, coordinate: Coordinate) -> Result<()> {
        self.remember_for(key, coordinate, jittered_ttl(self.ttl)).await
    }

    async fn remember_for(
        &self,
        key: &GeocodeKey,
        coordinate: Coordinate,
        ttl: Duration,
    ) -> Result<()> {
        let expires_at = unix_now()?.saturating_add(ttl.as_secs());
        let place = StoredPlace {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            expires_at,
        };
        let bytes = postcard::to_stdvec(&place)?;
        let places = self.places.clone();
        let key = key.to_bytes();
        task::spawn_blocking(move || places.insert(key, bytes)).await??;
        Ok(())
    }

    pub async fn forget(&self, key: &GeocodeKey) -> Result<()> {
        let places = self.places.clone();
        let key = key.to_bytes();
        task::spawn_blocking(move || places.remove(key)).await??;
        Ok(())
    }
}
