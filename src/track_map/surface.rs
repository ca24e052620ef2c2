// Drawing surface abstraction and its SVG document implementation

use log::{debug, warn};

use super::projection::{Point2D, SurfaceSize};
use crate::errors::TrackLensError;

/// RGBA color used by drawing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    fn to_svg(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!(
                "rgba({},{},{},{:.3})",
                self.r,
                self.g,
                self.b,
                self.a as f32 / 255.
            )
        }
    }
}

/// Primitive drawing commands the track map renderer emits
pub trait DrawingSurface {
    /// Logical size of the surface
    fn size(&self) -> SurfaceSize;

    /// Device pixels per logical pixel
    fn pixel_ratio(&self) -> f32 {
        1.
    }

    /// Drops everything drawn so far
    fn clear(&mut self);

    fn path(&mut self, points: &[Point2D], stroke_width: f32, color: Color, closed: bool);

    fn filled_circle(&mut self, center: Point2D, radius: f32, color: Color);

    fn text(&mut self, anchor: Point2D, text: &str, font_size: f32, color: Color);

    fn rounded_rect(&mut self, min: Point2D, max: Point2D, corner_radius: f32, fill: Color);
}

/// Builds an SVG document from drawing commands
#[derive(Debug, Clone)]
pub struct SvgSurface {
    size: SurfaceSize,
    elements: Vec<String>,
}

impl SvgSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: SurfaceSize::new(width as f32, height as f32),
            elements: Vec::new(),
        }
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Renders the accumulated commands into a complete SVG document
    pub fn to_svg(&self) -> Result<String, TrackLensError> {
        if self.size.width <= 0. || self.size.height <= 0. {
            return Err(TrackLensError::SvgGenerationError {
                reason: format!(
                    "Invalid canvas size: {}x{}",
                    self.size.width, self.size.height
                ),
            });
        }

        let mut svg = String::with_capacity(256 + self.elements.iter().map(|e| e.len()).sum::<usize>());
        svg.push_str(&format!(
            r#"<svg width="{w}" height="{h}" xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {w} {h}">"#,
            w = self.size.width,
            h = self.size.height,
        ));
        for element in &self.elements {
            svg.push_str("\n  ");
            svg.push_str(element);
        }
        svg.push_str(&format!(
            "\n  <!-- Generated from {} drawing commands -->",
            self.elements.len()
        ));
        svg.push_str("\n</svg>");

        debug!("Generated SVG with {} characters", svg.len());
        Ok(svg)
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl DrawingSurface for SvgSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn clear(&mut self) {
        self.elements.clear();
    }

    fn path(&mut self, points: &[Point2D], stroke_width: f32, color: Color, closed: bool) {
        let mut finite = points.iter().filter(|p| p.x.is_finite() && p.y.is_finite());
        let Some(first) = finite.next() else {
            warn!("Skipping path without finite points");
            return;
        };

        let mut d = format!("M {:.2},{:.2}", first.x, first.y);
        for point in finite {
            d.push_str(&format!(" L {:.2},{:.2}", point.x, point.y));
        }
        if closed {
            d.push_str(" Z");
        }
        self.elements.push(format!(
            r#"<path d="{}" stroke="{}" stroke-width="{:.2}" fill="none" stroke-linecap="round" stroke-linejoin="round" />"#,
            d,
            color.to_svg(),
            stroke_width
        ));
    }

    fn filled_circle(&mut self, center: Point2D, radius: f32, color: Color) {
        self.elements.push(format!(
            r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}" />"#,
            center.x,
            center.y,
            radius,
            color.to_svg()
        ));
    }

    fn text(&mut self, anchor: Point2D, text: &str, font_size: f32, color: Color) {
        self.elements.push(format!(
            r#"<text x="{:.2}" y="{:.2}" font-size="{:.1}" fill="{}">{}</text>"#,
            anchor.x,
            anchor.y,
            font_size,
            color.to_svg(),
            escape_text(text)
        ));
    }

    fn rounded_rect(&mut self, min: Point2D, max: Point2D, corner_radius: f32, fill: Color) {
        self.elements.push(format!(
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" rx="{:.2}" fill="{}" />"#,
            min.x,
            min.y,
            (max.x - min.x).max(0.),
            (max.y - min.y).max(0.),
            corner_radius,
            fill.to_svg()
        ));
    }
}
