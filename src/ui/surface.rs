// Drawing surface replayed onto an egui painter

use egui::{Align2, Color32, CornerRadius, FontId, Painter, Pos2, Rect, Shape, Stroke, Vec2};

use crate::track_map::{Color, DrawingSurface, Point2D, SurfaceSize};

#[derive(Debug, Clone, PartialEq)]
enum PaintCommand {
    Path {
        points: Vec<Point2D>,
        width: f32,
        color: Color,
        closed: bool,
    },
    Circle {
        center: Point2D,
        radius: f32,
        color: Color,
    },
    Text {
        anchor: Point2D,
        text: String,
        font_size: f32,
        color: Color,
    },
    Rect {
        min: Point2D,
        max: Point2D,
        corner_radius: f32,
        fill: Color,
    },
}

pub(crate) fn color32(color: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

/// Surface in physical pixels of an egui area. Commands are kept and replayed
/// every frame so the scene only has to be rendered again when it changes.
#[derive(Debug, Clone)]
pub struct EguiSurface {
    logical_size: Vec2,
    pixels_per_point: f32,
    commands: Vec<PaintCommand>,
}

impl EguiSurface {
    pub fn new(logical_size: Vec2, pixels_per_point: f32) -> Self {
        Self {
            logical_size,
            pixels_per_point: pixels_per_point.max(f32::EPSILON),
            commands: Vec::new(),
        }
    }

    /// Whether this surface still fits an area of the given size and scale
    pub fn matches(&self, logical_size: Vec2, pixels_per_point: f32) -> bool {
        self.logical_size == logical_size && self.pixels_per_point == pixels_per_point
    }

    /// Screen position to surface pixels
    pub fn to_surface(&self, origin: Pos2, screen: Pos2) -> Point2D {
        let local = (screen - origin) * self.pixels_per_point;
        Point2D::new(local.x, local.y)
    }

    /// Surface pixels to screen position
    pub fn to_screen(&self, origin: Pos2, point: Point2D) -> Pos2 {
        origin + Vec2::new(point.x, point.y) / self.pixels_per_point
    }

    fn points(&self, value: f32) -> f32 {
        value / self.pixels_per_point
    }

    pub fn paint(&self, painter: &Painter, origin: Pos2) {
        for command in &self.commands {
            match command {
                PaintCommand::Path {
                    points,
                    width,
                    color,
                    closed,
                } => {
                    let screen: Vec<Pos2> = points
                        .iter()
                        .map(|p| self.to_screen(origin, *p))
                        .collect();
                    let stroke = Stroke::new(self.points(*width), color32(*color));
                    if *closed {
                        painter.add(Shape::closed_line(screen, stroke));
                    } else {
                        painter.add(Shape::line(screen, stroke));
                    }
                }
                PaintCommand::Circle {
                    center,
                    radius,
                    color,
                } => {
                    painter.circle_filled(
                        self.to_screen(origin, *center),
                        self.points(*radius),
                        color32(*color),
                    );
                }
                PaintCommand::Text {
                    anchor,
                    text,
                    font_size,
                    color,
                } => {
                    painter.text(
                        self.to_screen(origin, *anchor),
                        Align2::LEFT_TOP,
                        text,
                        FontId::proportional(self.points(*font_size)),
                        color32(*color),
                    );
                }
                PaintCommand::Rect {
                    min,
                    max,
                    corner_radius,
                    fill,
                } => {
                    painter.rect_filled(
                        Rect::from_min_max(self.to_screen(origin, *min), self.to_screen(origin, *max)),
                        CornerRadius::same(self.points(*corner_radius).round().clamp(0., 255.) as u8),
                        color32(*fill),
                    );
                }
            }
        }
    }
}

impl DrawingSurface for EguiSurface {
    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(
            self.logical_size.x * self.pixels_per_point,
            self.logical_size.y * self.pixels_per_point,
        )
    }

    fn pixel_ratio(&self) -> f32 {
        self.pixels_per_point
    }

    fn clear(&mut self) {
        self.commands.clear();
    }

    fn path(&mut self, points: &[Point2D], stroke_width: f32, color: Color, closed: bool) {
        let points: Vec<Point2D> = points
            .iter()
            .copied()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .collect();
        if points.len() < 2 {
            return;
        }
        self.commands.push(PaintCommand::Path {
            points,
            width: stroke_width,
            color,
            closed,
        });
    }

    fn filled_circle(&mut self, center: Point2D, radius: f32, color: Color) {
        self.commands.push(PaintCommand::Circle {
            center,
            radius,
            color,
        });
    }

    fn text(&mut self, anchor: Point2D, text: &str, font_size: f32, color: Color) {
        self.commands.push(PaintCommand::Text {
            anchor,
            text: text.to_string(),
            font_size,
            color,
        });
    }

    fn rounded_rect(&mut self, min: Point2D, max: Point2D, corner_radius: f32, fill: Color) {
        self.commands.push(PaintCommand::Rect {
            min,
            max,
            corner_radius,
            fill,
        });
    }
}
