//! Camera and overlay lifecycle of the discovery map
//!
//! The controller owns the attached surface, so no other code can add or
//! remove layers behind its back. Overlay calls are only issued once the
//! surface reported it is ready; until then distance changes are remembered
//! and drawn on readiness.

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use super::surface::{CameraTransition, LayerKind, MapSurface, OverlayDefinition};
use crate::config::MapConfig;
use crate::filter::{ActiveDistance, FilterPanel, FilterState};
use crate::geo;
use crate::models::{Coordinate, Region};

pub const REGION_SOURCE: &str = "states";
pub const MASK_LAYER: &str = "us-mask";
pub const REGION_FILL_LAYER: &str = "region-states-fill";
pub const REGION_OUTLINE_LAYER: &str = "region-states-outline";
pub const DISTANCE_SOURCE: &str = "distance-source";
pub const DISTANCE_FILL_LAYER: &str = "distance-fill";
pub const DISTANCE_BORDER_LAYER: &str = "distance-border";

/// Feature property holding the region tag in the region shapes
pub const REGION_PROPERTY: &str = "REGION";

const DISTANCE_COLOR: &str = "#4264fb";

/// Whole-map camera used when the region panel opens without a selection
pub const DEFAULT_CENTER: Coordinate = Coordinate {
    latitude: 23.8283,
    longitude: -98.5795,
};
pub const DEFAULT_ZOOM: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerPhase {
    Uninitialized,
    LayersLoading,
    LayersReady,
}

/// Last camera issued and the overlays the controller created, in creation order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Viewport {
    pub camera: Option<CameraTransition>,
    pub overlays: Vec<String>,
}

pub struct MapViewportController<S: MapSurface> {
    surface: Option<S>,
    phase: LayerPhase,
    viewport: Viewport,
    region_shapes: Value,
    transition: Duration,
    padding_px: u32,
    circle_steps: usize,
    /// Region panel flag and selection seen by the last sync
    region_signal: Option<(bool, Option<Region>)>,
    wanted_distance: Option<ActiveDistance>,
    drawn_distance: Option<ActiveDistance>,
}

impl<S: MapSurface> MapViewportController<S> {
    /// `region_shapes` is the GeoJSON collection of state outlines tagged by region
    #[must_use]
    pub fn new(config: &MapConfig, region_shapes: Value) -> Self {
        Self {
            surface: None,
            phase: LayerPhase::Uninitialized,
            viewport: Viewport::default(),
            region_shapes,
            transition: config.transition(),
            padding_px: config.padding_px,
            circle_steps: config.circle_steps,
            region_signal: None,
            wanted_distance: None,
            drawn_distance: None,
        }
    }

    #[must_use]
    pub fn phase(&self) -> LayerPhase {
        self.phase
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    #[must_use]
    pub fn surface(&self) -> Option<&S> {
        self.surface.as_ref()
    }

    /// Takes ownership of a fresh surface.
    ///
    /// A previously attached surface is torn down and handed back.
    pub fn attach(&mut self, surface: S) -> Option<S> {
        let previous = self.detach();
        debug!("Map surface attached");
        self.surface = Some(surface);
        self.phase = LayerPhase::LayersLoading;
        previous
    }

    /// Creates the region overlays; repeated signals are ignored
    #[instrument(skip(self))]
    pub fn on_surface_ready(&mut self) {
        if self.phase != LayerPhase::LayersLoading {
            debug!(phase = ?self.phase, "Ignoring surface ready signal");
            return;
        }

        let region_overlays = [
            (
                REGION_SOURCE,
                OverlayDefinition::Source {
                    data: self.region_shapes.clone(),
                },
            ),
            (
                MASK_LAYER,
                fill_layer(
                    REGION_SOURCE,
                    json!({ "fill-color": "#000", "fill-opacity": 0 }),
                    None,
                ),
            ),
            (
                REGION_FILL_LAYER,
                fill_layer(
                    REGION_SOURCE,
                    json!({
                        "fill-color": region_color_expression(),
                        "fill-opacity": ["case", ["==", ["get", REGION_PROPERTY], ""], 0, 0.2],
                    }),
                    None,
                ),
            ),
            (
                REGION_OUTLINE_LAYER,
                line_layer(
                    REGION_SOURCE,
                    json!({
                        "line-color": region_color_expression(),
                        "line-width": ["case", ["==", ["get", REGION_PROPERTY], ""], 0, 1],
                    }),
                ),
            ),
        ];
        for (id, definition) in region_overlays {
            let _ = self.add_overlay(id, definition);
        }

        self.phase = LayerPhase::LayersReady;
        self.redraw_distance();
    }

    /// Follows a new filter state: region camera and distance overlay
    pub fn sync(&mut self, state: &FilterState) {
        self.wanted_distance = state.distance.active();
        if self.surface.is_none() {
            return;
        }

        let signal = (state.active_panel == Some(FilterPanel::Region), state.region);
        if self.region_signal != Some(signal) {
            self.region_signal = Some(signal);
            if signal.0 {
                self.fly_to_region(signal.1);
            }
        }

        if self.phase == LayerPhase::LayersReady {
            self.redraw_distance();
        }
    }

    /// Removes every overlay this controller created, newest first, and gives
    /// the surface back
    #[instrument(skip(self))]
    pub fn detach(&mut self) -> Option<S> {
        self.surface.as_ref()?;
        let created: Vec<String> = self.viewport.overlays.iter().rev().cloned().collect();
        for id in &created {
            self.remove_overlay(id);
        }
        if !self.viewport.overlays.is_empty() {
            warn!(left = ?self.viewport.overlays, "Surface kept overlays on detach");
        }

        self.phase = LayerPhase::Uninitialized;
        self.viewport = Viewport::default();
        self.region_signal = None;
        self.drawn_distance = None;
        debug!("Map surface detached");
        self.surface.take()
    }

    fn fly_to_region(&mut self, region: Option<Region>) {
        let transition = match region {
            Some(region) => {
                let view = region.view();
                CameraTransition {
                    center: view.center,
                    zoom: view.zoom,
                    bounds: Some(view.bounds),
                    duration: self.transition,
                    padding_px: Some(self.padding_px),
                }
            }
            None => CameraTransition {
                center: DEFAULT_CENTER,
                zoom: DEFAULT_ZOOM,
                bounds: None,
                duration: self.transition,
                padding_px: None,
            },
        };
        debug!(region = ?region, "Flying to region");
        if let Some(surface) = self.surface.as_mut() {
            surface.set_camera(transition.clone());
            self.viewport.camera = Some(transition);
        }
    }

    /// Replaces the drawn radius with the wanted one.
    ///
    /// `drawn_distance` only advances once the old overlay is gone and the new
    /// one is complete, so a failed step is retried on the next sync.
    fn redraw_distance(&mut self) {
        if self.wanted_distance == self.drawn_distance {
            return;
        }
        let mut cleared = true;
        for id in [DISTANCE_FILL_LAYER, DISTANCE_BORDER_LAYER, DISTANCE_SOURCE] {
            if self.is_created(id) {
                cleared &= self.remove_overlay(id);
            }
        }
        if !cleared {
            warn!("Previous distance overlay is still drawn, redraw postponed");
            return;
        }

        let Some(query) = self.wanted_distance else {
            self.drawn_distance = None;
            return;
        };
        let ring = geo::radius_polygon(&query.anchor, query.radius_miles, self.circle_steps);
        if ring.is_empty() {
            debug!(radius = query.radius_miles, "Nothing to draw for distance query");
            self.drawn_distance = Some(query);
            return;
        }

        let complete = self.add_overlay(
            DISTANCE_SOURCE,
            OverlayDefinition::Source {
                data: geo::ring_to_geojson(&ring),
            },
        ) && self.add_overlay(
            DISTANCE_FILL_LAYER,
            fill_layer(
                DISTANCE_SOURCE,
                json!({ "fill-color": DISTANCE_COLOR, "fill-opacity": 0.2 }),
                Some(REGION_OUTLINE_LAYER),
            ),
        ) && self.add_overlay(
            DISTANCE_BORDER_LAYER,
            line_layer(
                DISTANCE_SOURCE,
                json!({ "line-color": DISTANCE_COLOR, "line-width": 2, "line-opacity": 0.8 }),
            ),
        );
        if complete {
            self.drawn_distance = Some(query);
        }
    }

    fn is_created(&self, id: &str) -> bool {
        self.viewport.overlays.iter().any(|created| created == id)
    }

    /// Returns whether `id` is drawn afterwards
    fn add_overlay(&mut self, id: &str, definition: OverlayDefinition) -> bool {
        if self.phase == LayerPhase::Uninitialized {
            return false;
        }
        if self.is_created(id) {
            debug!(id, "Overlay already created");
            return true;
        }
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        match surface.add_overlay(id, definition) {
            Ok(()) => {
                self.viewport.overlays.push(id.to_string());
                true
            }
            Err(e) => {
                warn!("Failed to add overlay {id}: {e}");
                false
            }
        }
    }

    /// Returns whether `id` is gone; a rejected removal stays tracked
    fn remove_overlay(&mut self, id: &str) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        match surface.remove_overlay(id) {
            Ok(()) => {
                self.viewport.overlays.retain(|created| created != id);
                true
            }
            Err(e) => {
                warn!("Failed to remove overlay {id}: {e}");
                false
            }
        }
    }
}

fn region_color_expression() -> Value {
    let mut expression = vec![json!("match"), json!(["get", REGION_PROPERTY])];
    for region in Region::ALL {
        expression.push(json!(region.tag()));
        expression.push(json!(region.color()));
    }
    expression.push(json!("#000000"));
    Value::Array(expression)
}

fn fill_layer(source: &str, paint: Value, before: Option<&str>) -> OverlayDefinition {
    OverlayDefinition::Layer {
        kind: LayerKind::Fill,
        source: source.to_string(),
        paint,
        before: before.map(str::to_string),
    }
}

fn line_layer(source: &str, paint: Value) -> OverlayDefinition {
    OverlayDefinition::Layer {
        kind: LayerKind::Line,
        source: source.to_string(),
        paint,
        before: None,
    }
}

/// Empty feature collection for hosts without region outlines
#[must_use]
pub fn empty_region_shapes() -> Value {
    json!({ "type": "FeatureCollection", "features": [] })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::surface::{RecordingSurface, SurfaceCall};

    type Controller = MapViewportController<RecordingSurface>;

    fn controller() -> Controller {
        MapViewportController::new(&MapConfig::default(), empty_region_shapes())
    }

    fn ready_controller() -> Controller {
        let mut controller = controller();
        controller.attach(RecordingSurface::new());
        controller.on_surface_ready();
        controller
    }

    fn surface(controller: &Controller) -> &RecordingSurface {
        controller.surface().unwrap()
    }

    fn distance_state(lat: f64, lon: f64, radius: f64) -> FilterState {
        let mut state = FilterState::default();
        state.distance.location_text = "Somewhere".to_string();
        state.distance.anchor = Some(Coordinate::new(lat, lon));
        state.distance.radius_miles = Some(radius);
        state
    }

    #[test]
    fn test_lifecycle_phases() {
        let mut controller = controller();
        assert_eq!(controller.phase(), LayerPhase::Uninitialized);
        controller.on_surface_ready();
        assert_eq!(controller.phase(), LayerPhase::Uninitialized);

        controller.attach(RecordingSurface::new());
        assert_eq!(controller.phase(), LayerPhase::LayersLoading);
        controller.on_surface_ready();
        assert_eq!(controller.phase(), LayerPhase::LayersReady);
        assert_eq!(
            surface(&controller).overlay_ids(),
            vec![REGION_SOURCE, MASK_LAYER, REGION_FILL_LAYER, REGION_OUTLINE_LAYER]
        );
    }

    #[test]
    fn test_second_ready_signal_is_ignored() {
        let mut controller = ready_controller();
        let calls = surface(&controller).calls().len();
        controller.on_surface_ready();
        assert_eq!(surface(&controller).calls().len(), calls);
        assert_eq!(controller.viewport().overlays.len(), 4);
    }

    #[test]
    fn test_region_panel_flies_to_selected_region() {
        let mut controller = ready_controller();
        let mut state = FilterState::default();
        state.region = Some(Region::East);
        controller.sync(&state);
        // region selected but panel closed
        assert!(surface(&controller).cameras().is_empty());

        state.toggle_panel(FilterPanel::Region);
        controller.sync(&state);
        let cameras = surface(&controller).cameras();
        assert_eq!(cameras.len(), 1);
        assert_eq!(cameras[0].center, Coordinate::new(43.5, -73.5));
        assert_eq!(cameras[0].zoom, 5.5);
        assert_eq!(cameras[0].duration, Duration::from_millis(1500));
        assert_eq!(cameras[0].padding_px, Some(50));

        // unchanged signal does not fly again
        controller.sync(&state);
        assert_eq!(surface(&controller).cameras().len(), 1);
    }

    #[test]
    fn test_region_panel_without_selection_shows_default_view() {
        let mut controller = ready_controller();
        let mut state = FilterState::default();
        state.toggle_panel(FilterPanel::Region);
        controller.sync(&state);
        let camera = controller.viewport().camera.clone().unwrap();
        assert_eq!(camera.center, DEFAULT_CENTER);
        assert_eq!(camera.zoom, DEFAULT_ZOOM);
        assert_eq!(camera.padding_px, None);
    }

    #[test]
    fn test_distance_overlay_drawn_and_replaced() {
        let mut controller = ready_controller();
        controller.sync(&distance_state(39.6, -106.3, 25.0));
        assert_eq!(
            surface(&controller).overlay_ids(),
            vec![
                REGION_SOURCE,
                MASK_LAYER,
                REGION_FILL_LAYER,
                DISTANCE_FILL_LAYER,
                REGION_OUTLINE_LAYER,
                DISTANCE_SOURCE,
                DISTANCE_BORDER_LAYER,
            ]
        );

        let Some(OverlayDefinition::Source { data }) = surface(&controller).overlay(DISTANCE_SOURCE)
        else {
            panic!("distance source missing");
        };
        assert_eq!(data["geometry"]["coordinates"][0].as_array().unwrap().len(), 65);

        controller.sync(&distance_state(39.6, -106.3, 50.0));
        let removed: Vec<_> = surface(&controller)
            .calls()
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Remove(id) => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            removed,
            vec![DISTANCE_FILL_LAYER, DISTANCE_BORDER_LAYER, DISTANCE_SOURCE]
        );
        assert!(surface(&controller).has_overlay(DISTANCE_BORDER_LAYER));
    }

    #[test]
    fn test_inactive_query_removes_overlay() {
        let mut controller = ready_controller();
        controller.sync(&distance_state(39.6, -106.3, 25.0));
        controller.sync(&FilterState::default());
        assert!(!surface(&controller).has_overlay(DISTANCE_SOURCE));
        assert_eq!(controller.viewport().overlays.len(), 4);
    }

    #[test]
    fn test_distance_before_ready_is_deferred() {
        let mut controller = controller();
        controller.attach(RecordingSurface::new());
        controller.sync(&distance_state(44.4, -72.0, 10.0));
        assert!(surface(&controller).calls().is_empty());

        controller.on_surface_ready();
        assert!(surface(&controller).has_overlay(DISTANCE_FILL_LAYER));
    }

    #[test]
    fn test_overlay_failure_does_not_block_camera() {
        let mut failing = RecordingSurface::new();
        failing.fail_on(DISTANCE_SOURCE);
        let mut controller = controller();
        controller.attach(failing);
        controller.on_surface_ready();

        let mut state = distance_state(39.6, -106.3, 25.0);
        state.region = Some(Region::Rocky);
        state.toggle_panel(FilterPanel::Region);
        controller.sync(&state);

        assert_eq!(surface(&controller).cameras().len(), 1);
        assert!(!surface(&controller).has_overlay(DISTANCE_FILL_LAYER));
        assert_eq!(controller.viewport().overlays.len(), 4);
    }

    #[test]
    fn test_rejected_removal_keeps_overlay_tracked() {
        let mut controller = ready_controller();
        controller.sync(&distance_state(39.6, -106.3, 50.0));

        controller.surface.as_mut().unwrap().fail_on(DISTANCE_BORDER_LAYER);
        controller.sync(&distance_state(39.6, -106.3, 25.0));
        let tracked = &controller.viewport().overlays;
        assert!(tracked.iter().any(|id| id == DISTANCE_BORDER_LAYER));
        assert!(tracked.iter().any(|id| id == DISTANCE_SOURCE));
        assert!(surface(&controller).has_overlay(DISTANCE_BORDER_LAYER));

        // the postponed redraw goes through once the surface cooperates
        controller.surface.as_mut().unwrap().recover(DISTANCE_BORDER_LAYER);
        controller.sync(&distance_state(39.6, -106.3, 25.0));
        assert!(surface(&controller).has_overlay(DISTANCE_FILL_LAYER));
        assert_eq!(controller.viewport().overlays.len(), 7);

        let surface = controller.detach().unwrap();
        assert!(surface.overlay_ids().is_empty());
    }

    #[test]
    fn test_rejected_removal_is_cleaned_up_on_detach() {
        let mut controller = ready_controller();
        controller.sync(&distance_state(39.6, -106.3, 50.0));
        controller.surface.as_mut().unwrap().fail_on(DISTANCE_BORDER_LAYER);
        controller.sync(&distance_state(39.6, -106.3, 25.0));

        controller.surface.as_mut().unwrap().recover(DISTANCE_BORDER_LAYER);
        let surface = controller.detach().unwrap();
        assert!(surface.overlay_ids().is_empty());
    }

    #[test]
    fn test_detach_removes_in_reverse_creation_order() {
        let mut controller = ready_controller();
        controller.sync(&distance_state(39.6, -106.3, 25.0));
        let created = controller.viewport().overlays.clone();

        let mut surface = controller.detach().unwrap();
        assert_eq!(controller.phase(), LayerPhase::Uninitialized);
        assert!(surface.overlay_ids().is_empty());

        let removed: Vec<String> = surface
            .calls()
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Remove(id) => Some(id.clone()),
                _ => None,
            })
            .collect();
        let mut expected = created;
        expected.reverse();
        assert_eq!(removed, expected);

        // a fresh surface gets the overlays again
        surface.clear_calls();
        controller.attach(surface);
        controller.on_surface_ready();
        assert!(self::surface(&controller).has_overlay(DISTANCE_SOURCE));
    }
}
