// Owned rendering context for the annotated track map

use log::{debug, warn};
use uom::si::f32::Velocity;
use uom::si::velocity::{kilometer_per_hour, meter_per_second};

use super::picker::{HoverState, PointPicker, SelectionChange};
use super::projection::{DrawRect, MapReference, Point2D, SurfaceSize};
use super::surface::{Color, DrawingSurface};
use crate::analysis::{PerformanceTier, SectionKind, SectionResult};
use crate::config::AnalysisConfig;
use crate::telemetry::{Lap, TrackLayout};

const BACKGROUND: Color = Color::rgb(40, 40, 40);
const TRACK_COLOR: Color = Color::rgb(200, 200, 200);
const LABEL_COLOR: Color = Color::rgb(240, 240, 240);
const CARD_COLOR: Color = Color::rgba(20, 20, 20, 230);
const UNRATED_COLOR: Color = Color::rgb(150, 150, 150);

const TRACK_STROKE: f32 = 3.;
const POINT_RADIUS: f32 = 6.;
const SELECTED_POINT_RADIUS: f32 = 9.;
const LABEL_FONT: f32 = 12.;
const CARD_FONT: f32 = 13.;
const CARD_PADDING: f32 = 8.;
const CARD_LINE_HEIGHT: f32 = 17.;
const CARD_WIDTH: f32 = 170.;

pub fn tier_color(tier: PerformanceTier) -> Color {
    match tier {
        PerformanceTier::First => Color::rgb(80, 160, 255),
        PerformanceTier::Record => Color::rgb(190, 90, 255),
        PerformanceTier::Excellent => Color::rgb(60, 200, 90),
        PerformanceTier::Good => Color::rgb(240, 200, 40),
        PerformanceTier::NeedsImprovement => Color::rgb(230, 70, 60),
    }
}

/// Formatted content of the detail card shown for the selected point
#[derive(Debug, Clone, PartialEq)]
pub struct DetailContent {
    pub label: String,
    pub speed_mps: f32,
    /// 0 to 1
    pub brake: f32,
    /// 0 to 1
    pub throttle: f32,
    pub lateral_g: Option<f32>,
    pub is_valid: bool,
}

impl DetailContent {
    pub fn speed_kmh(&self) -> f32 {
        Velocity::new::<meter_per_second>(self.speed_mps).get::<kilometer_per_hour>()
    }

    pub fn lines(&self) -> Vec<String> {
        let lateral = match self.lateral_g {
            Some(g) => format!("Lateral: {:.2} g", g),
            None => "Lateral: n/a".to_string(),
        };
        vec![
            self.label.clone(),
            format!("Speed: {:.0} km/h", self.speed_kmh()),
            format!("Brake: {:.0}%", self.brake * 100.),
            format!("Throttle: {:.0}%", self.throttle * 100.),
            lateral,
            if self.is_valid { "Valid" } else { "Invalid" }.to_string(),
        ]
    }
}

/// A point of interest on the map, positioned in the normalized data frame
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedPoint {
    pub position: Point2D,
    pub label: String,
    pub tier: Option<PerformanceTier>,
    pub detail: DetailContent,
}

/// Everything drawn for one lap on one track
#[derive(Debug, Clone, Default)]
pub struct TrackScene {
    /// Normalized track outline
    pub outline: Vec<Point2D>,
    pub points: Vec<AnnotatedPoint>,
    pub map_reference: Option<MapReference>,
}

impl TrackScene {
    /// Scene of a lap with one annotated point at the middle of every section.
    /// Returns `None` when the lap has no world coordinates to draw.
    pub fn from_lap(
        lap: &Lap,
        results: &[SectionResult],
        map_reference: Option<MapReference>,
    ) -> Option<Self> {
        let layout = TrackLayout::from_samples(lap.samples())?;
        let samples = lap.samples();

        let points = results
            .iter()
            .filter_map(|result| {
                let section = &result.section;
                let middle = (section.start_index + section.end_index) / 2;
                let (Some(position), Some(sample)) =
                    (layout.nearest_point_for_sample(middle), samples.get(middle))
                else {
                    warn!(
                        "Section {} has no position on the map, not annotating it",
                        section.section_id
                    );
                    return None;
                };
                let label = match section.kind {
                    SectionKind::Corner => format!("T{}", section.section_id),
                    SectionKind::Straight => format!("S{}", section.section_id),
                };
                Some(AnnotatedPoint {
                    position,
                    detail: DetailContent {
                        label: format!("{} ({})", label, result.tier.label()),
                        speed_mps: sample.speed_mps,
                        brake: sample.brake,
                        throttle: sample.throttle,
                        lateral_g: sample.lateral_g,
                        is_valid: section.is_valid,
                    },
                    label,
                    tier: Some(result.tier),
                })
            })
            .collect();

        Some(Self {
            outline: layout.points.clone(),
            points,
            map_reference: map_reference.or(Some(MapReference::WorldBounds(layout.bounds))),
        })
    }
}

/// Renders a `TrackScene` onto a surface it owns and tracks the hover selection.
/// Created per view, recreated on resize and disposed when the view goes away.
pub struct RenderContext<S: DrawingSurface> {
    surface: S,
    scene: TrackScene,
    hover: HoverState,
    hit_radius_px: f32,
    padding_px: f32,
    rotate_data_points: bool,
    rect: DrawRect,
}

impl<S: DrawingSurface> RenderContext<S> {
    pub fn new(surface: S, scene: TrackScene, config: &AnalysisConfig) -> Self {
        let mut context = Self {
            surface,
            scene,
            hover: HoverState::default(),
            hit_radius_px: config.hit_radius_px,
            padding_px: config.padding_px,
            rotate_data_points: config.rotate_data_points,
            rect: DrawRect::fit(SurfaceSize::new(0., 0.), 0., None),
        };
        context.layout();
        context
    }

    fn layout(&mut self) {
        self.rect = DrawRect::fit(
            self.surface.size(),
            self.padding_px * self.surface.pixel_ratio(),
            self.scene.map_reference.as_ref(),
        );
        debug!("Track map laid out in {:?}", self.rect);
    }

    /// Swaps in a new surface, e.g. after a resize, and hands back the old one
    pub fn recreate(&mut self, surface: S) -> S {
        let previous = std::mem::replace(&mut self.surface, surface);
        self.layout();
        self.hover = HoverState::default();
        previous
    }

    /// Replaces the scene. The selection does not carry over.
    pub fn set_scene(&mut self, scene: TrackScene) {
        self.scene = scene;
        self.hover = HoverState::default();
        self.layout();
    }

    pub fn dispose(self) -> S {
        self.surface
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn scene(&self) -> &TrackScene {
        &self.scene
    }

    /// Rectangle the background reference is fitted to
    pub fn background_rect(&self) -> DrawRect {
        self.rect
    }

    /// Rectangle data points are placed and hit-tested in
    pub fn data_rect(&self) -> DrawRect {
        if self.rotate_data_points {
            self.rect
        } else {
            self.rect.unrotated()
        }
    }

    pub fn point_pixels(&self) -> Vec<Point2D> {
        let rect = self.data_rect();
        self.scene
            .points
            .iter()
            .map(|p| rect.project(p.position))
            .collect()
    }

    pub fn selected(&self) -> Option<&AnnotatedPoint> {
        self.hover.selected().and_then(|i| self.scene.points.get(i))
    }

    pub fn selected_detail(&self) -> Option<&DetailContent> {
        self.selected().map(|p| &p.detail)
    }

    /// Pointer position in surface pixels
    pub fn pointer_moved(&mut self, pointer: Point2D) -> SelectionChange {
        let picker = PointPicker::new(self.hit_radius_px, self.surface.pixel_ratio());
        let picked = picker.pick(pointer, self.point_pixels());
        self.hover.update(picked)
    }

    pub fn pointer_left(&mut self) -> SelectionChange {
        self.hover.pointer_left()
    }

    /// Redraws the whole scene. Idempotent for an unchanged scene and selection.
    pub fn render(&mut self) {
        let ratio = self.surface.pixel_ratio();
        let background = self.rect;
        let data = self.data_rect();

        self.surface.clear();
        self.surface.rounded_rect(
            Point2D::new(background.x, background.y),
            Point2D::new(background.x + background.w, background.y + background.h),
            8. * ratio,
            BACKGROUND,
        );

        if self.scene.outline.len() > 1 {
            let outline: Vec<Point2D> = self.scene.outline.iter().map(|p| data.project(*p)).collect();
            self.surface
                .path(&outline, TRACK_STROKE * ratio, TRACK_COLOR, true);
        }

        let selected = self.hover.selected();
        for (i, point) in self.scene.points.iter().enumerate() {
            let center = data.project(point.position);
            let radius = if selected == Some(i) {
                SELECTED_POINT_RADIUS
            } else {
                POINT_RADIUS
            } * ratio;
            let color = point.tier.map(tier_color).unwrap_or(UNRATED_COLOR);
            self.surface.filled_circle(center, radius, color);
            self.surface.text(
                Point2D::new(center.x + radius + 2. * ratio, center.y - radius),
                &point.label,
                LABEL_FONT * ratio,
                LABEL_COLOR,
            );
        }

        if let Some(index) = selected
            && let Some(point) = self.scene.points.get(index)
        {
            let anchor = data.project(point.position);
            self.draw_detail_card(anchor, &point.detail.lines(), ratio);
        }
    }

    fn draw_detail_card(&mut self, anchor: Point2D, lines: &[String], ratio: f32) {
        let size = self.surface.size();
        let w = CARD_WIDTH * ratio;
        let h = (2. * CARD_PADDING + lines.len() as f32 * CARD_LINE_HEIGHT) * ratio;
        let offset = 12. * ratio;

        // flip to the other side of the point when the card would leave the surface
        let x = if anchor.x + offset + w > size.width {
            (anchor.x - offset - w).max(0.)
        } else {
            anchor.x + offset
        };
        let y = if anchor.y + offset + h > size.height {
            (anchor.y - offset - h).max(0.)
        } else {
            anchor.y + offset
        };

        self.surface.rounded_rect(
            Point2D::new(x, y),
            Point2D::new(x + w, y + h),
            6. * ratio,
            CARD_COLOR,
        );
        for (i, line) in lines.iter().enumerate() {
            self.surface.text(
                Point2D::new(
                    x + CARD_PADDING * ratio,
                    y + (CARD_PADDING + i as f32 * CARD_LINE_HEIGHT) * ratio,
                ),
                line,
                CARD_FONT * ratio,
                LABEL_COLOR,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track_map::surface::SvgSurface;

    /// Records drawing commands so tests can inspect them
    #[derive(Default)]
    struct RecordingSurface {
        size: (f32, f32),
        pixel_ratio: f32,
        circles: Vec<(Point2D, f32)>,
        texts: Vec<String>,
        paths: usize,
        rects: usize,
    }

    impl RecordingSurface {
        fn new(width: f32, height: f32, pixel_ratio: f32) -> Self {
            Self {
                size: (width, height),
                pixel_ratio,
                ..Default::default()
            }
        }
    }

    impl DrawingSurface for RecordingSurface {
        fn size(&self) -> SurfaceSize {
            SurfaceSize::new(self.size.0, self.size.1)
        }

        fn pixel_ratio(&self) -> f32 {
            self.pixel_ratio
        }

        fn clear(&mut self) {
            self.circles.clear();
            self.texts.clear();
            self.paths = 0;
            self.rects = 0;
        }

        fn path(&mut self, _points: &[Point2D], _stroke_width: f32, _color: Color, _closed: bool) {
            self.paths += 1;
        }

        fn filled_circle(&mut self, center: Point2D, radius: f32, _color: Color) {
            self.circles.push((center, radius));
        }

        fn text(&mut self, _anchor: Point2D, text: &str, _font_size: f32, _color: Color) {
            self.texts.push(text.to_string());
        }

        fn rounded_rect(&mut self, _min: Point2D, _max: Point2D, _corner_radius: f32, _fill: Color) {
            self.rects += 1;
        }
    }

    fn detail(label: &str) -> DetailContent {
        DetailContent {
            label: label.to_string(),
            speed_mps: 25.,
            brake: 0.5,
            throttle: 0.,
            lateral_g: Some(1.2),
            is_valid: true,
        }
    }

    fn scene() -> TrackScene {
        TrackScene {
            outline: vec![
                Point2D::new(0., 0.),
                Point2D::new(1., 0.),
                Point2D::new(1., 1.),
                Point2D::new(0., 1.),
            ],
            points: vec![
                AnnotatedPoint {
                    position: Point2D::new(0.25, 0.5),
                    label: "T1".to_string(),
                    tier: Some(PerformanceTier::Good),
                    detail: detail("T1 (good)"),
                },
                AnnotatedPoint {
                    position: Point2D::new(0.75, 0.5),
                    label: "T2".to_string(),
                    tier: None,
                    detail: detail("T2"),
                },
            ],
            map_reference: None,
        }
    }

    #[test]
    fn test_detail_lines_are_formatted() {
        let lines = detail("T1").lines();
        assert_eq!(lines[0], "T1");
        assert_eq!(lines[1], "Speed: 90 km/h");
        assert_eq!(lines[2], "Brake: 50%");
        assert_eq!(lines[3], "Throttle: 0%");
        assert_eq!(lines[4], "Lateral: 1.20 g");
        assert_eq!(lines[5], "Valid");
    }

    #[test]
    fn test_hover_selects_and_clears() {
        // 440x440 with 20px padding: a 400px square data rect at (20, 20)
        let mut context = RenderContext::new(
            RecordingSurface::new(440., 440., 1.),
            scene(),
            &AnalysisConfig::default(),
        );
        let pixels = context.point_pixels();
        assert_eq!(pixels[0], Point2D::new(120., 220.));

        assert_eq!(
            context.pointer_moved(Point2D::new(130., 225.)),
            SelectionChange::Selected(0)
        );
        assert_eq!(
            context.pointer_moved(Point2D::new(125., 220.)),
            SelectionChange::Unchanged
        );
        assert_eq!(context.selected_detail().unwrap().label, "T1 (good)");

        // far from both points
        assert_eq!(
            context.pointer_moved(Point2D::new(220., 20.)),
            SelectionChange::Cleared
        );
        context.pointer_moved(Point2D::new(320., 220.));
        assert_eq!(context.pointer_left(), SelectionChange::Cleared);
        assert!(context.selected().is_none());
    }

    #[test]
    fn test_hit_radius_scales_with_pixel_ratio() {
        let config = AnalysisConfig::default();
        let mut native = RenderContext::new(RecordingSurface::new(440., 440., 1.), scene(), &config);
        let pointer = |ctx: &RenderContext<RecordingSurface>| {
            let p = ctx.point_pixels()[0];
            Point2D::new(p.x, p.y - 70.)
        };
        let target = pointer(&native);
        assert_eq!(native.pointer_moved(target), SelectionChange::Unchanged);

        let mut retina = RenderContext::new(RecordingSurface::new(880., 880., 2.), scene(), &config);
        let target = pointer(&retina);
        assert_eq!(retina.pointer_moved(target), SelectionChange::Selected(0));
    }

    #[test]
    fn test_render_draws_detail_card_for_selection() {
        let mut context = RenderContext::new(
            RecordingSurface::new(440., 440., 1.),
            scene(),
            &AnalysisConfig::default(),
        );
        context.render();
        assert_eq!(context.surface().paths, 1);
        assert_eq!(context.surface().circles.len(), 2);
        assert_eq!(context.surface().rects, 1);
        assert_eq!(context.surface().texts, vec!["T1", "T2"]);

        context.pointer_moved(Point2D::new(320., 220.));
        context.render();
        assert_eq!(context.surface().rects, 2);
        assert_eq!(context.surface().circles[1].1, SELECTED_POINT_RADIUS);
        assert!(context.surface().texts.contains(&"Lateral: 1.20 g".to_string()));

        // idempotent redraw
        let texts = context.surface().texts.clone();
        context.render();
        assert_eq!(context.surface().texts, texts);
    }

    #[test]
    fn test_data_points_stay_unrotated_for_portrait_images() {
        let mut portrait = scene();
        portrait.map_reference = Some(MapReference::Image {
            width: 300,
            height: 600,
        });
        let config = AnalysisConfig::default();
        let context = RenderContext::new(RecordingSurface::new(440., 440., 1.), portrait.clone(), &config);
        assert!(context.background_rect().is_rotated);
        assert!(!context.data_rect().is_rotated);

        let rotating = RenderContext::new(
            RecordingSurface::new(440., 440., 1.),
            portrait,
            &AnalysisConfig {
                rotate_data_points: true,
                ..Default::default()
            },
        );
        assert!(rotating.data_rect().is_rotated);
    }

    #[test]
    fn test_recreate_resets_layout_and_selection() {
        let mut context = RenderContext::new(
            RecordingSurface::new(440., 440., 1.),
            scene(),
            &AnalysisConfig::default(),
        );
        context.pointer_moved(Point2D::new(120., 220.));
        assert!(context.selected().is_some());

        let old = context.recreate(RecordingSurface::new(840., 440., 1.));
        assert_eq!(old.size, (440., 440.));
        assert!(context.selected().is_none());
        assert_eq!(context.data_rect().w, 800.);

        let surface = context.dispose();
        assert_eq!(surface.size, (840., 440.));
    }

    #[test]
    fn test_scene_from_lap_annotates_sections() {
        use crate::analysis::{SectionBoundary, segment_lap};
        use crate::telemetry::TelemetrySample;

        let samples: Vec<TelemetrySample> = (0..40)
            .map(|i| {
                let angle = i as f32 / 40. * std::f32::consts::TAU;
                TelemetrySample {
                    time_offset: i as f32 * 0.5,
                    normalized_position: Some(i as f32 / 39.),
                    world_x: Some(angle.cos() * 100.),
                    world_z: Some(angle.sin() * 50.),
                    speed_mps: 30.,
                    ..Default::default()
                }
            })
            .collect();
        let lap = Lap::new(1, 20., [None; 3], true, samples);
        let sections = segment_lap(
            lap.samples(),
            &[SectionBoundary {
                section_id: 1,
                kind: SectionKind::Corner,
                start_index: 10,
                end_index: 20,
            }],
        );
        let results: Vec<SectionResult> = sections
            .into_iter()
            .map(|section| SectionResult {
                section,
                tier: PerformanceTier::First,
                delta_to_record: None,
                new_record: true,
            })
            .collect();

        let scene = TrackScene::from_lap(&lap, &results, None).unwrap();
        assert_eq!(scene.outline.len(), 40);
        assert_eq!(scene.points.len(), 1);
        assert_eq!(scene.points[0].label, "T1");
        assert_eq!(scene.points[0].detail.label, "T1 (first)");
        assert!(matches!(
            scene.map_reference,
            Some(MapReference::WorldBounds(_))
        ));

        let mut context = RenderContext::new(SvgSurface::new(400, 300), scene, &AnalysisConfig::default());
        context.render();
        let svg = context.dispose().to_svg().unwrap();
        assert!(svg.contains("<path"));
        assert!(svg.contains(">T1<"));
    }

    #[test]
    fn test_scene_requires_world_coordinates() {
        let lap = Lap::new(1, 20., [None; 3], true, vec![Default::default(); 10]);
        assert!(TrackScene::from_lap(&lap, &[], None).is_none());
    }
}
