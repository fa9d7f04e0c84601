//! Resolving free-text locations to coordinates
//!
//! [`Geocoder`] is the capability the distance filter depends on.
//! [`LocationQuery`] makes sure only the answer to the latest request is
//! applied when several lookups overlap.

pub mod cached;
pub mod open_meteo;

pub use cached::CachedGeocoder;
pub use open_meteo::OpenMeteoGeocoder;

use async_trait::async_trait;

use crate::SlopeFinderError;
use crate::models::Coordinate;

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Best coordinate for `text`, or [`SlopeFinderError::Geocode`]
    async fn resolve(&self, text: &str) -> Result<Coordinate, SlopeFinderError>;
}

#[async_trait]
impl<G: Geocoder + ?Sized> Geocoder for std::sync::Arc<G> {
    async fn resolve(&self, text: &str) -> Result<Coordinate, SlopeFinderError> {
        (**self).resolve(text).await
    }
}

/// Handle for one issued lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTicket {
    id: u64,
    text: String,
}

impl QueryTicket {
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Last-request-wins tracker for location lookups
#[derive(Debug, Default)]
pub struct LocationQuery {
    latest: u64,
}

impl LocationQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a ticket that supersedes every earlier one
    pub fn begin(&mut self, text: &str) -> QueryTicket {
        self.latest += 1;
        QueryTicket {
            id: self.latest,
            text: text.to_string(),
        }
    }

    /// Invalidates every outstanding ticket
    pub fn cancel(&mut self) {
        self.latest += 1;
    }

    #[must_use]
    pub fn is_current(&self, ticket: &QueryTicket) -> bool {
        ticket.id == self.latest
    }
}

/// Lookup key shared by the cache and logging: trimmed and lowercased
#[must_use]
pub fn normalize_query(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_ticket_is_current() {
        let mut query = LocationQuery::new();
        let first = query.begin("Denver");
        let second = query.begin("Boulder");
        assert!(!query.is_current(&first));
        assert!(query.is_current(&second));
        assert_eq!(second.text(), "Boulder");

        query.cancel();
        assert!(!query.is_current(&second));
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  Salt   Lake City "), "salt lake city");
        assert_eq!(normalize_query("DENVER"), "denver");
    }
}
