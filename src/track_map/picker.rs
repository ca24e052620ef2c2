// Nearest-point hit testing for pointer driven detail display

use log::debug;

use super::projection::Point2D;

/// Finds the annotated point closest to the pointer within a hit radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointPicker {
    /// Hit radius at native resolution
    pub hit_radius_px: f32,
    /// Device pixels per logical pixel of the drawing surface
    pub pixel_ratio: f32,
}

impl PointPicker {
    pub fn new(hit_radius_px: f32, pixel_ratio: f32) -> Self {
        Self {
            hit_radius_px,
            pixel_ratio,
        }
    }

    pub fn effective_radius(&self) -> f32 {
        self.hit_radius_px * self.pixel_ratio
    }

    /// Index of the nearest candidate within the effective radius.
    /// Equidistant candidates resolve to the first one in iteration order.
    pub fn pick<I>(&self, pointer: Point2D, candidates: I) -> Option<usize>
    where
        I: IntoIterator<Item = Point2D>,
    {
        let radius = self.effective_radius();
        let mut best: Option<(usize, f32)> = None;
        for (i, candidate) in candidates.into_iter().enumerate() {
            let distance = pointer.distance_to(candidate);
            if distance > radius {
                continue;
            }
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((i, distance)),
            }
        }
        best.map(|(i, _)| i)
    }
}

/// Outcome of feeding a pointer event to a `HoverState`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    /// A different point became selected: re-render and request its detail card
    Selected(usize),
    /// The previous selection was dropped
    Cleared,
    Unchanged,
}

/// Tracks the current hover selection across pointer events
#[derive(Debug, Clone, Default)]
pub struct HoverState {
    selected: Option<usize>,
}

impl HoverState {
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Applies the result of a pick for the latest pointer position
    pub fn update(&mut self, picked: Option<usize>) -> SelectionChange {
        if picked == self.selected {
            return SelectionChange::Unchanged;
        }
        self.selected = picked;
        match picked {
            Some(index) => {
                debug!("Hover selection changed to point {}", index);
                SelectionChange::Selected(index)
            }
            None => SelectionChange::Cleared,
        }
    }

    /// The pointer left the drawing surface
    pub fn pointer_left(&mut self) -> SelectionChange {
        self.update(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equidistant_candidates_pick_first() {
        let picker = PointPicker::new(50., 1.);
        let points = [Point2D::new(100., 100.), Point2D::new(110., 100.)];
        assert_eq!(picker.pick(Point2D::new(105., 100.), points), Some(0));

        let reversed = [points[1], points[0]];
        assert_eq!(picker.pick(Point2D::new(105., 100.), reversed), Some(0));
    }

    #[test]
    fn test_nearest_candidate_wins() {
        let picker = PointPicker::new(50., 1.);
        let points = [
            Point2D::new(0., 0.),
            Point2D::new(30., 0.),
            Point2D::new(12., 0.),
        ];
        assert_eq!(picker.pick(Point2D::new(10., 0.), points), Some(2));
    }

    #[test]
    fn test_outside_radius_picks_nothing() {
        let picker = PointPicker::new(50., 1.);
        let points = [Point2D::new(0., 0.)];
        assert_eq!(picker.pick(Point2D::new(50.5, 0.), points), None);
        assert_eq!(picker.pick(Point2D::new(50., 0.), points), Some(0));
        assert_eq!(picker.pick(Point2D::new(0., 0.), []), None);
    }

    #[test]
    fn test_radius_scales_with_pixel_ratio() {
        let picker = PointPicker::new(50., 2.);
        assert_eq!(picker.effective_radius(), 100.);
        assert_eq!(
            picker.pick(Point2D::new(80., 0.), [Point2D::new(0., 0.)]),
            Some(0)
        );
    }

    #[test]
    fn test_hover_state_transitions() {
        let mut hover = HoverState::default();
        assert_eq!(hover.update(Some(3)), SelectionChange::Selected(3));
        assert_eq!(hover.update(Some(3)), SelectionChange::Unchanged);
        assert_eq!(hover.update(Some(1)), SelectionChange::Selected(1));
        assert_eq!(hover.update(None), SelectionChange::Cleared);
        assert_eq!(hover.update(None), SelectionChange::Unchanged);

        hover.update(Some(2));
        assert_eq!(hover.pointer_left(), SelectionChange::Cleared);
        assert_eq!(hover.selected(), None);
    }
}
