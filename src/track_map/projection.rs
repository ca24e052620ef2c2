// Projection of normalized track coordinates onto a drawing surface

use serde::{Deserialize, Serialize};

/// Represents a 2D coordinate point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point2D) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Bounding box for coordinate calculations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundingBox {
    pub fn new() -> Self {
        Self {
            min_x: f32::INFINITY,
            max_x: f32::NEG_INFINITY,
            min_y: f32::INFINITY,
            max_y: f32::NEG_INFINITY,
        }
    }

    pub fn update(&mut self, point: Point2D) {
        self.min_x = self.min_x.min(point.x);
        self.max_x = self.max_x.max(point.x);
        self.min_y = self.min_y.min(point.y);
        self.max_y = self.max_y.max(point.y);
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// Maps a point into the unit square of this box; an axis without extent maps to 0.5
    pub fn normalize(&self, point: Point2D) -> Point2D {
        let axis = |value: f32, min: f32, range: f32| {
            if range > 0. { (value - min) / range } else { 0.5 }
        };
        Point2D::new(
            axis(point.x, self.min_x, self.width()),
            axis(point.y, self.min_y, self.height()),
        )
    }
}

/// Size of a drawing surface in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

impl SurfaceSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Reference content the track map is fitted to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MapReference {
    /// Top-down map image with its stored pixel dimensions
    Image { width: u32, height: u32 },
    /// World bounding box of the recorded positions
    WorldBounds(BoundingBox),
}

impl MapReference {
    /// Portrait images are stored rotated and need a fixed -90 degree turn
    pub fn requires_rotation(&self) -> bool {
        match self {
            MapReference::Image { width, height } => height > width,
            MapReference::WorldBounds(_) => false,
        }
    }

    /// Width over height of the content as it appears once drawn
    pub fn aspect_ratio(&self) -> Option<f32> {
        let (w, h) = match self {
            MapReference::Image { width, height } => {
                if self.requires_rotation() {
                    (*height as f32, *width as f32)
                } else {
                    (*width as f32, *height as f32)
                }
            }
            MapReference::WorldBounds(bounds) => (bounds.width(), bounds.height()),
        };
        if w > 0. && h > 0. && w.is_finite() && h.is_finite() {
            Some(w / h)
        } else {
            None
        }
    }
}

/// Area of the surface the track map occupies
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawRect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub is_rotated: bool,
}

impl DrawRect {
    /// Letterboxes the reference content into the surface minus `padding` on every side.
    /// Without a usable reference the whole available area is used.
    pub fn fit(surface: SurfaceSize, padding: f32, reference: Option<&MapReference>) -> Self {
        let available_w = (surface.width - 2. * padding).max(0.);
        let available_h = (surface.height - 2. * padding).max(0.);
        let is_rotated = reference.is_some_and(|r| r.requires_rotation());

        let (w, h) = match reference.and_then(|r| r.aspect_ratio()) {
            Some(aspect) if available_h > 0. => {
                if available_w / available_h > aspect {
                    (available_h * aspect, available_h)
                } else {
                    (available_w, available_w / aspect)
                }
            }
            _ => (available_w, available_h),
        };

        Self {
            x: padding + (available_w - w) / 2.,
            y: padding + (available_h - h) / 2.,
            w,
            h,
            is_rotated,
        }
    }

    /// Same rectangle without the rotation, the frame data points are placed in
    pub fn unrotated(&self) -> Self {
        Self {
            is_rotated: false,
            ..*self
        }
    }

    /// Normalized point to surface pixels
    pub fn project(&self, normalized: Point2D) -> Point2D {
        let (u, v) = if self.is_rotated {
            (normalized.y, 1. - normalized.x)
        } else {
            (normalized.x, normalized.y)
        };
        Point2D::new(self.x + u * self.w, self.y + v * self.h)
    }

    /// Surface pixels to normalized point, the inverse of `project`.
    /// A degenerate rectangle maps every pixel to the center.
    pub fn unproject(&self, pixel: Point2D) -> Point2D {
        let u = if self.w > 0. {
            (pixel.x - self.x) / self.w
        } else {
            0.5
        };
        let v = if self.h > 0. {
            (pixel.y - self.y) / self.h
        } else {
            0.5
        };
        if self.is_rotated {
            Point2D::new(1. - v, u)
        } else {
            Point2D::new(u, v)
        }
    }

    pub fn contains(&self, pixel: Point2D) -> bool {
        pixel.x >= self.x
            && pixel.x <= self.x + self.w
            && pixel.y >= self.y
            && pixel.y <= self.y + self.h
    }
}
