pub mod controller;
pub mod surface;

pub use controller::{
    DEFAULT_CENTER, DEFAULT_ZOOM, DISTANCE_BORDER_LAYER, DISTANCE_FILL_LAYER, DISTANCE_SOURCE,
    LayerPhase, MASK_LAYER, MapViewportController, REGION_FILL_LAYER, REGION_OUTLINE_LAYER,
    REGION_SOURCE, Viewport, empty_region_shapes,
};
pub use surface::{
    CameraTransition, LayerKind, MapSurface, OverlayDefinition, RecordingSurface, SurfaceCall,
};
