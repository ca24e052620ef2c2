// Track map module: geometry fitting, drawing and pointer interaction

pub mod definition;
pub mod picker;
pub mod projection;
pub mod renderer;
pub mod surface;

pub use definition::TrackDefinition;
pub use picker::{HoverState, PointPicker, SelectionChange};
pub use projection::{BoundingBox, DrawRect, MapReference, Point2D, SurfaceSize};
pub use renderer::{AnnotatedPoint, DetailContent, RenderContext, TrackScene};
pub use surface::{Color, DrawingSurface, SvgSurface};

use crate::config::AnalysisConfig;
use crate::errors::TrackLensError;

/// Renders a scene into a standalone SVG document
pub fn render_svg(
    scene: TrackScene,
    width: u32,
    height: u32,
    config: &AnalysisConfig,
) -> Result<String, TrackLensError> {
    let mut context = RenderContext::new(SvgSurface::new(width, height), scene, config);
    context.render();
    context.dispose().to_svg()
}
