//! Drawing surface abstraction and a recording implementation

use std::collections::HashSet;
use std::time::Duration;

use serde_json::Value;

use crate::SlopeFinderError;
use crate::models::{Bounds, Coordinate};

/// Animated camera move
#[derive(Debug, Clone, PartialEq)]
pub struct CameraTransition {
    pub center: Coordinate,
    pub zoom: f64,
    pub bounds: Option<Bounds>,
    pub duration: Duration,
    pub padding_px: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Fill,
    Line,
}

/// Something a surface can draw under a stable id
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayDefinition {
    /// GeoJSON data that layers draw from
    Source { data: Value },
    Layer {
        kind: LayerKind,
        source: String,
        paint: Value,
        /// Insert below this layer instead of on top
        before: Option<String>,
    },
}

impl OverlayDefinition {
    #[must_use]
    pub fn is_source(&self) -> bool {
        matches!(self, OverlayDefinition::Source { .. })
    }
}

/// The map the controller draws on.
///
/// Adding an id that already exists and removing one that does not are
/// errors, like on a real map library.
pub trait MapSurface {
    fn set_camera(&mut self, transition: CameraTransition);
    fn add_overlay(&mut self, id: &str, definition: OverlayDefinition)
    -> Result<(), SlopeFinderError>;
    fn remove_overlay(&mut self, id: &str) -> Result<(), SlopeFinderError>;
    fn has_overlay(&self, id: &str) -> bool;
}

impl<T: MapSurface + ?Sized> MapSurface for Box<T> {
    fn set_camera(&mut self, transition: CameraTransition) {
        (**self).set_camera(transition);
    }

    fn add_overlay(
        &mut self,
        id: &str,
        definition: OverlayDefinition,
    ) -> Result<(), SlopeFinderError> {
        (**self).add_overlay(id, definition)
    }

    fn remove_overlay(&mut self, id: &str) -> Result<(), SlopeFinderError> {
        (**self).remove_overlay(id)
    }

    fn has_overlay(&self, id: &str) -> bool {
        (**self).has_overlay(id)
    }
}

/// Every call a [`RecordingSurface`] received, in order
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Camera(CameraTransition),
    Add(String),
    Remove(String),
}

/// In-memory surface that records calls and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingSurface {
    overlays: Vec<(String, OverlayDefinition)>,
    calls: Vec<SurfaceCall>,
    failing: HashSet<String>,
}

impl RecordingSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every add/remove of `id` fail
    pub fn fail_on(&mut self, id: &str) {
        self.failing.insert(id.to_string());
    }

    pub fn recover(&mut self, id: &str) {
        self.failing.remove(id);
    }

    #[must_use]
    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Ids currently drawn, bottom to top
    #[must_use]
    pub fn overlay_ids(&self) -> Vec<&str> {
        self.overlays.iter().map(|(id, _)| id.as_str()).collect()
    }

    #[must_use]
    pub fn overlay(&self, id: &str) -> Option<&OverlayDefinition> {
        self.overlays
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, definition)| definition)
    }

    #[must_use]
    pub fn cameras(&self) -> Vec<&CameraTransition> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SurfaceCall::Camera(transition) => Some(transition),
                _ => None,
            })
            .collect()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.overlays.iter().position(|(existing, _)| existing == id)
    }
}

impl MapSurface for RecordingSurface {
    fn set_camera(&mut self, transition: CameraTransition) {
        self.calls.push(SurfaceCall::Camera(transition));
    }

    fn add_overlay(
        &mut self,
        id: &str,
        definition: OverlayDefinition,
    ) -> Result<(), SlopeFinderError> {
        self.calls.push(SurfaceCall::Add(id.to_string()));
        if self.failing.contains(id) {
            return Err(SlopeFinderError::overlay(id, "surface rejected overlay"));
        }
        if self.has_overlay(id) {
            return Err(SlopeFinderError::overlay(id, "already exists"));
        }

        let mut index = self.overlays.len();
        if let OverlayDefinition::Layer { source, before, .. } = &definition {
            if !self.has_overlay(source) {
                return Err(SlopeFinderError::overlay(
                    id,
                    format!("source '{source}' not found"),
                ));
            }
            if let Some(before) = before {
                index = self.position(before).ok_or_else(|| {
                    SlopeFinderError::overlay(id, format!("layer '{before}' not found"))
                })?;
            }
        }
        self.overlays.insert(index, (id.to_string(), definition));
        Ok(())
    }

    fn remove_overlay(&mut self, id: &str) -> Result<(), SlopeFinderError> {
        self.calls.push(SurfaceCall::Remove(id.to_string()));
        if self.failing.contains(id) {
            return Err(SlopeFinderError::overlay(id, "surface rejected removal"));
        }
        let index = self
            .position(id)
            .ok_or_else(|| SlopeFinderError::overlay(id, "not found"))?;
        if self.overlays[index].1.is_source() {
            let in_use = self.overlays.iter().any(|(_, definition)| {
                matches!(definition, OverlayDefinition::Layer { source, .. } if source == id)
            });
            if in_use {
                return Err(SlopeFinderError::overlay(id, "source is still in use"));
            }
        }
        self.overlays.remove(index);
        Ok(())
    }

    fn has_overlay(&self, id: &str) -> bool {
        self.position(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer(source: &str, before: Option<&str>) -> OverlayDefinition {
        OverlayDefinition::Layer {
            kind: LayerKind::Fill,
            source: source.to_string(),
            paint: json!({}),
            before: before.map(str::to_string),
        }
    }

    #[test]
    fn test_surface_enforces_dependencies() {
        let mut surface = RecordingSurface::new();
        assert!(surface.add_overlay("fill", layer("src", None)).is_err());

        surface
            .add_overlay("src", OverlayDefinition::Source { data: json!({}) })
            .unwrap();
        surface.add_overlay("top", layer("src", None)).unwrap();
        surface.add_overlay("under", layer("src", Some("top"))).unwrap();
        assert_eq!(surface.overlay_ids(), vec!["src", "under", "top"]);

        assert!(surface.add_overlay("top", layer("src", None)).is_err());
        assert!(surface.remove_overlay("src").is_err());
        surface.remove_overlay("top").unwrap();
        surface.remove_overlay("under").unwrap();
        surface.remove_overlay("src").unwrap();
        assert!(surface.remove_overlay("src").is_err());
    }

    #[test]
    fn test_injected_failures() {
        let mut surface = RecordingSurface::new();
        surface.fail_on("src");
        assert!(
            surface
                .add_overlay("src", OverlayDefinition::Source { data: json!({}) })
                .is_err()
        );
        surface.recover("src");
        assert!(
            surface
                .add_overlay("src", OverlayDefinition::Source { data: json!({}) })
                .is_ok()
        );
        assert_eq!(
            surface.calls(),
            &[
                SurfaceCall::Add("src".to_string()),
                SurfaceCall::Add("src".to_string())
            ]
        );
    }
}
