use super::intersect_2d::cross_2d;
use super::{Point2, TOLERANCE};

/// Which side of a directed line a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
    On,
}

impl Side {
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::On => Side::On,
        }
    }
}

/// A directed 2D line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line2 {
    pub start: Point2,
    pub end: Point2,
}

impl Line2 {
    #[must_use]
    pub fn new(start: Point2, end: Point2) -> Self {
        Self { start, end }
    }

    /// Side of the infinite line through this segment that `point` is on.
    #[must_use]
    pub fn side_of(&self, point: &Point2) -> Side {
        let c = cross_2d(&(self.end - self.start), &(point - self.start));
        if c > TOLERANCE {
            Side::Left
        } else if c < -TOLERANCE {
            Side::Right
        } else {
            Side::On
        }
    }

    /// Distance from `point` to the segment, or to the infinite line when
    /// `segment_only` is false.
    #[must_use]
    pub fn distance_to(&self, point: &Point2, segment_only: bool) -> f64 {
        let d = self.end - self.start;
        let len_sq = d.norm_squared();
        if len_sq < TOLERANCE * TOLERANCE {
            return (point - self.start).norm();
        }
        let mut t = (point - self.start).dot(&d) / len_sq;
        if segment_only {
            t = t.clamp(0.0, 1.0);
        }
        (point - (self.start + d * t)).norm()
    }

    /// Whether this segment may be seen from `viewpoint` through the segment
    /// `window`.
    ///
    /// The region seen is bounded by the window's line and the two rays from
    /// the viewpoint through its ends. The segment is rejected only when both
    /// of its ends lie strictly outside the same bound, so a `true` answer
    /// can still be a miss.
    #[must_use]
    pub fn is_visible_through(&self, viewpoint: &Point2, window: &Line2) -> bool {
        let to_start = Line2::new(*viewpoint, window.start);
        let to_end = Line2::new(*viewpoint, window.end);
        let bounds = [
            (*window, window.side_of(viewpoint).opposite()),
            (to_start, to_start.side_of(&window.end)),
            (to_end, to_end.side_of(&window.start)),
        ];
        bounds.iter().all(|(line, inside)| {
            *inside == Side::On
                || line.side_of(&self.start) != inside.opposite()
                || line.side_of(&self.end) != inside.opposite()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vertical() -> Line2 {
        Line2::new(Point2::new(0.0, 0.5), Point2::new(0.0, -0.5))
    }

    #[test]
    fn side_of_vertical_line() {
        let line = vertical();
        assert_eq!(line.side_of(&Point2::new(1.0, 0.0)), Side::Left);
        assert_eq!(line.side_of(&Point2::new(-1.0, 0.0)), Side::Right);
        assert_eq!(line.side_of(&Point2::new(0.0, 3.0)), Side::On);
    }

    #[test]
    fn distance_segment_vs_line() {
        let line = vertical();
        let p = Point2::new(1.0, 2.5);
        assert_relative_eq!(line.distance_to(&p, false), 1.0);
        assert_relative_eq!(line.distance_to(&p, true), 5.0_f64.sqrt());
    }

    #[test]
    fn visibility_through_window() {
        let window = vertical();
        let viewpoint = Point2::new(2.0, 0.0);
        let behind = Line2::new(Point2::new(-2.0, 0.2), Point2::new(-2.0, -0.2));
        assert!(behind.is_visible_through(&viewpoint, &window));

        // Between the viewpoint and the window.
        let near = Line2::new(Point2::new(1.0, 0.2), Point2::new(1.0, -0.2));
        assert!(!near.is_visible_through(&viewpoint, &window));

        // Beyond the window but off to one side of the wedge.
        let aside = Line2::new(Point2::new(-2.0, 5.0), Point2::new(-3.0, 6.0));
        assert!(!aside.is_visible_through(&viewpoint, &window));

        // Straddling a bound counts as visible.
        let across = Line2::new(Point2::new(-2.0, 0.0), Point2::new(-2.0, 9.0));
        assert!(across.is_visible_through(&viewpoint, &window));
    }

    #[test]
    fn visibility_from_viewpoint_on_window_line() {
        let segment = Line2::new(Point2::new(5.0, 5.0), Point2::new(6.0, 5.0));
        assert!(segment.is_visible_through(&Point2::new(0.0, 3.0), &vertical()));
    }
}
