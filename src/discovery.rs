//! Discovery view facade
//!
//! Wires the filter engine, the favorites store, the map controller and the
//! location lookups together and is the only thing a hosting UI talks to.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

use crate::SlopeFinderError;
use crate::config::SlopeFinderConfig;
use crate::favorites::{FavoritesStore, ToggleOutcome};
use crate::filter::{FilterEngine, FilterState};
use crate::geocoding::{Geocoder, LocationQuery, QueryTicket};
use crate::map::{MapSurface, MapViewportController};
use crate::models::{Coordinate, Resort};
use crate::preferences::{ImportOutcome, PanelDismissal, PreferenceImportAdapter, PreferencePayload};
use crate::source::ResortFeed;

pub struct Discovery<S: MapSurface> {
    engine: FilterEngine,
    favorites: FavoritesStore,
    favorites_rx: watch::Receiver<Arc<BTreeSet<String>>>,
    resorts_rx: Option<watch::Receiver<Arc<[Resort]>>>,
    map: MapViewportController<S>,
    location: LocationQuery,
    selected: Option<Resort>,
    panel_dismiss: Duration,
}

impl<S: MapSurface> Discovery<S> {
    pub fn new(config: &SlopeFinderConfig, favorites: FavoritesStore, region_shapes: Value) -> Self {
        let mut engine = FilterEngine::from_config(&config.filters);
        let mut favorites_rx = favorites.subscribe();
        engine.set_favorites(Arc::clone(&favorites_rx.borrow_and_update()));
        Self {
            engine,
            favorites,
            favorites_rx,
            resorts_rx: None,
            map: MapViewportController::new(&config.map, region_shapes),
            location: LocationQuery::new(),
            selected: None,
            panel_dismiss: config.map.panel_dismiss_delay(),
        }
    }

    /// Follows `feed` from now on
    pub fn connect(&mut self, feed: &ResortFeed) {
        let mut rx = feed.subscribe();
        self.engine.set_resorts(Arc::clone(&rx.borrow_and_update()));
        self.resorts_rx = Some(rx);
    }

    /// Applies resort and favorites pushes that arrived since the last call.
    ///
    /// Returns whether anything changed.
    pub fn pump(&mut self) -> bool {
        let mut changed = false;
        if let Some(rx) = self.resorts_rx.as_mut() {
            if rx.has_changed().unwrap_or(false) {
                let resorts = Arc::clone(&rx.borrow_and_update());
                self.engine.set_resorts(resorts);
                changed = true;
            }
        }
        if self.favorites_rx.has_changed().unwrap_or(false) {
            let favorites = Arc::clone(&self.favorites_rx.borrow_and_update());
            self.engine.set_favorites(favorites);
            changed = true;
        }
        changed
    }

    /// Waits for the next resort or favorites push and applies it.
    ///
    /// A closed resort feed is disconnected and no longer waited on.
    pub async fn next_update(&mut self) {
        match self.resorts_rx.as_mut() {
            Some(resorts_rx) => {
                tokio::select! {
                    changed = resorts_rx.changed() => {
                        if changed.is_err() {
                            info!("Resort feed closed, keeping the last collection");
                            self.resorts_rx = None;
                        }
                    }
                    _ = self.favorites_rx.changed() => {}
                }
            }
            None => {
                let _ = self.favorites_rx.changed().await;
            }
        }
        self.pump();
    }

    /// Whether a resort feed is still connected
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.resorts_rx.is_some()
    }

    /// Current filtered list
    #[must_use]
    pub fn filtered(&self) -> Arc<[Resort]> {
        self.engine.filtered()
    }

    #[must_use]
    pub fn state(&self) -> &FilterState {
        self.engine.state()
    }

    #[must_use]
    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    pub fn update_state<F>(&mut self, change: F)
    where
        F: FnOnce(&mut FilterState),
    {
        self.engine.update(change);
        self.map.sync(self.engine.state());
    }

    #[must_use]
    pub fn shows_no_favorites_notice(&self) -> bool {
        self.engine.shows_no_favorites_notice()
    }

    #[must_use]
    pub fn favorites(&self) -> &FavoritesStore {
        &self.favorites
    }

    /// User-visible favorites error, if any
    #[must_use]
    pub fn favorites_error(&self) -> Option<String> {
        self.favorites.error()
    }

    /// Flips a favorite and persists it.
    ///
    /// The flip reaches the filtered list before the remote write starts; the
    /// settled membership is applied once the write is done.
    pub async fn toggle_favorite(
        &mut self,
        resort_id: &str,
    ) -> Result<ToggleOutcome, SlopeFinderError> {
        let pending = self.favorites.begin_toggle(resort_id);
        self.pump();
        let result = match pending {
            Ok(pending) => pending.persist().await,
            Err(e) => Err(e),
        };
        self.pump();
        result
    }

    pub async fn sign_in(&mut self, user_id: &str) -> Result<(), SlopeFinderError> {
        let store = self.favorites.clone();
        let result = store.sign_in(user_id).await;
        self.pump();
        result
    }

    pub fn sign_out(&mut self) {
        self.favorites.sign_out();
        self.engine.update(FilterState::reset_favorites);
        self.pump();
    }

    pub fn select_resort(&mut self, resort: Option<Resort>) {
        if let Some(resort) = &resort {
            debug!(id = %resort.id, "Resort selected");
        }
        self.selected = resort;
    }

    #[must_use]
    pub fn selected_resort(&self) -> Option<&Resort> {
        self.selected.as_ref()
    }

    /// Sets the location text and invalidates any earlier lookup.
    ///
    /// The distance filter stays inactive until [`Discovery::finish_location`]
    /// supplies the anchor. Empty text clears the query and needs no lookup.
    pub fn begin_location(&mut self, text: &str) -> Option<QueryTicket> {
        let text = text.trim();
        if text.is_empty() {
            self.location.cancel();
            self.update_state(|state| {
                state.distance.location_text.clear();
                state.distance.anchor = None;
                state.location_error = None;
            });
            return None;
        }

        let ticket = self.location.begin(text);
        self.update_state(|state| {
            state.distance.location_text = text.to_string();
            state.distance.anchor = None;
            state.location_error = None;
        });
        Some(ticket)
    }

    /// Applies a lookup result; results of superseded lookups are dropped.
    ///
    /// Returns whether the result was applied.
    pub fn finish_location(
        &mut self,
        ticket: &QueryTicket,
        result: Result<Coordinate, SlopeFinderError>,
    ) -> bool {
        if !self.location.is_current(ticket) {
            debug!(text = ticket.text(), "Discarding stale geocode result");
            return false;
        }
        match result {
            Ok(anchor) => self.update_state(|state| {
                state.distance.anchor = Some(anchor);
                state.location_error = None;
            }),
            Err(e) => {
                let message = e.user_message();
                self.update_state(|state| {
                    state.distance.anchor = None;
                    state.location_error = Some(message);
                });
            }
        }
        true
    }

    /// Sets the location text and resolves it with `geocoder`
    #[instrument(skip(self, geocoder))]
    pub async fn set_location(
        &mut self,
        text: &str,
        geocoder: &dyn Geocoder,
    ) -> Result<(), SlopeFinderError> {
        let Some(ticket) = self.begin_location(text) else {
            return Ok(());
        };
        let result = geocoder.resolve(ticket.text()).await;
        let outcome = match &result {
            Ok(_) => Ok(()),
            Err(SlopeFinderError::Geocode { query, message }) => {
                Err(SlopeFinderError::geocode(query.as_str(), message.as_str()))
            }
            Err(e) => Err(SlopeFinderError::geocode(ticket.text(), e.to_string())),
        };
        self.finish_location(&ticket, result);
        outcome
    }

    /// Applies quiz answers carried into this navigation entry.
    ///
    /// A returned geocode request is meant for [`Discovery::set_location`] and
    /// a returned dismissal for [`Discovery::run_dismissal`].
    pub fn enter(&mut self, payload: Option<PreferencePayload>) -> ImportOutcome {
        let mut adapter = PreferenceImportAdapter::new(payload, self.panel_dismiss);
        let mut outcome = ImportOutcome::default();
        self.update_state(|state| outcome = adapter.apply(state));
        if outcome.applied {
            info!("Quiz preferences applied");
        }
        outcome
    }

    pub fn apply_dismissal(&mut self, dismissal: &PanelDismissal) {
        self.update_state(|state| dismissal.apply(state));
    }

    /// Sleeps for the dismissal delay, then applies it
    pub async fn run_dismissal(&mut self, dismissal: PanelDismissal) {
        tokio::time::sleep(dismissal.after).await;
        self.apply_dismissal(&dismissal);
    }

    #[must_use]
    pub fn map(&self) -> &MapViewportController<S> {
        &self.map
    }

    pub fn attach_map(&mut self, surface: S) -> Option<S> {
        let previous = self.map.attach(surface);
        self.map.sync(self.engine.state());
        previous
    }

    pub fn map_ready(&mut self) {
        self.map.on_surface_ready();
        self.map.sync(self.engine.state());
    }

    pub fn detach_map(&mut self) -> Option<S> {
        self.map.detach()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::favorites::InMemoryFavoritesRemote;
    use crate::map::{RecordingSurface, empty_region_shapes};
    use crate::models::DifficultyTier;

    fn discovery() -> Discovery<RecordingSurface> {
        let remote = InMemoryFavoritesRemote::new().with_user("u1", ["b"]);
        Discovery::new(
            &SlopeFinderConfig::default(),
            FavoritesStore::new(Arc::new(remote)),
            empty_region_shapes(),
        )
    }

    fn feed() -> ResortFeed {
        let feed = ResortFeed::new();
        feed.publish(vec![
            Resort::new("a", "Alpha")
                .with_price("$80")
                .with_coordinate(39.6, -106.3),
            Resort::new("b", "Bravo")
                .with_price("$150")
                .with_coordinate(40.6, -111.6)
                .with_difficulty(DifficultyTier::Blue, "45%"),
        ]);
        feed
    }

    #[tokio::test]
    async fn test_closed_feed_stops_waking_updates() {
        let mut discovery = discovery();
        discovery.connect(&feed());

        discovery.next_update().await;
        assert!(!discovery.is_connected());
        assert_eq!(discovery.filtered().len(), 2);

        let idle = tokio::time::timeout(Duration::from_millis(20), discovery.next_update()).await;
        assert!(idle.is_err());

        let store = discovery.favorites().clone();
        tokio::spawn(async move { store.sign_in("u1").await });
        tokio::time::timeout(Duration::from_secs(1), discovery.next_update())
            .await
            .unwrap();
        discovery.update_state(FilterState::toggle_favorites);
        assert_eq!(discovery.filtered()[0].id, "b");
    }

    #[test]
    fn test_feed_pushes_reach_filtered_list() {
        let mut discovery = discovery();
        let feed = feed();
        discovery.connect(&feed);
        assert_eq!(discovery.filtered().len(), 2);

        feed.publish(vec![Resort::new("c", "Charlie").with_price("$99")]);
        assert!(discovery.pump());
        assert_eq!(discovery.filtered()[0].id, "c");
        assert!(!discovery.pump());
    }

    #[tokio::test]
    async fn test_sign_out_resets_favorites_filter() {
        let mut discovery = discovery();
        discovery.connect(&feed());
        discovery.sign_in("u1").await.unwrap();
        discovery.update_state(FilterState::toggle_favorites);
        assert_eq!(discovery.filtered().len(), 1);

        discovery.sign_out();
        assert!(!discovery.state().favorites_active);
        assert_eq!(discovery.filtered().len(), 2);
    }

    #[test]
    fn test_stale_location_result_is_dropped() {
        let mut discovery = discovery();
        discovery.connect(&feed());
        let first = discovery.begin_location("Vail").unwrap();
        let second = discovery.begin_location("Salt Lake City").unwrap();

        assert!(discovery.finish_location(&second, Ok(Coordinate::new(40.6, -111.6))));
        assert!(!discovery.finish_location(&first, Ok(Coordinate::new(39.6, -106.3))));
        let anchor = discovery.state().distance.anchor.unwrap();
        assert_eq!(anchor, Coordinate::new(40.6, -111.6));
    }

    #[test]
    fn test_failed_location_sets_inline_error() {
        let mut discovery = discovery();
        discovery.connect(&feed());
        let ticket = discovery.begin_location("Atlantis").unwrap();
        discovery.finish_location(&ticket, Err(SlopeFinderError::geocode("Atlantis", "none")));

        let state = discovery.state();
        assert!(!state.distance.is_active());
        assert!(state.location_error.as_deref().unwrap().contains("Atlantis"));
        assert_eq!(discovery.filtered().len(), 2);
    }

    #[test]
    fn test_pending_lookup_keeps_distance_inactive() {
        let mut discovery = discovery();
        discovery.connect(&feed());
        let ticket = discovery.begin_location("Vail").unwrap();
        assert!(!discovery.state().distance.is_active());

        discovery.finish_location(&ticket, Ok(Coordinate::new(39.6, -106.3)));
        discovery.update_state(|state| state.distance.radius_miles = Some(5.0));
        assert_eq!(discovery.filtered().len(), 1);

        assert!(discovery.begin_location("   ").is_none());
        assert_eq!(discovery.filtered().len(), 2);
    }
}
