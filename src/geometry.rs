//! Geometric primitives shared by every detector.
//!
//! Coordinates are page pixels with the origin at the top-left corner and
//! y growing downward. All operations are pure and return zero for
//! degenerate input instead of failing.

use serde::{Deserialize, Serialize};

/// A 2D point in page space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point.
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f32 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// A closed 1D interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Lower bound
    pub start: f32,
    /// Upper bound
    pub end: f32,
}

impl Interval {
    /// Create an interval, swapping the bounds if needed.
    pub fn new(a: f32, b: f32) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// Length of the interval (0 for degenerate input).
    pub fn len(&self) -> f32 {
        let len = self.end - self.start;
        if len.is_finite() && len > 0.0 {
            len
        } else {
            0.0
        }
    }

    /// Whether the interval has zero length.
    pub fn is_empty(&self) -> bool {
        self.len() == 0.0
    }

    /// Length of the overlap with another interval.
    pub fn overlap(&self, other: &Interval) -> f32 {
        let len = self.end.min(other.end) - self.start.max(other.start);
        if len.is_finite() && len > 0.0 {
            len
        } else {
            0.0
        }
    }

    /// Distance between the intervals (0 when they overlap or touch).
    pub fn gap(&self, other: &Interval) -> f32 {
        (other.start - self.end).max(self.start - other.end).max(0.0)
    }

    /// Whether a value lies inside the interval.
    pub fn contains(&self, v: f32) -> bool {
        v >= self.start && v <= self.end
    }

    /// Smallest interval covering both.
    pub fn union(&self, other: &Interval) -> Interval {
        Interval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// An axis-aligned rectangle in page-pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
}

impl Rect {
    /// Create a rectangle from two corners, normalizing their order.
    ///
    /// # Examples
    ///
    /// ```
    /// use pagelayout::geometry::Rect;
    ///
    /// let rect = Rect::new(110.0, 70.0, 10.0, 20.0);
    /// assert_eq!(rect.x0, 10.0);
    /// assert_eq!(rect.width(), 100.0);
    /// assert_eq!(rect.height(), 50.0);
    /// ```
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Create a rectangle from its top-left corner and size.
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Width (0 for degenerate or non-finite rectangles).
    pub fn width(&self) -> f32 {
        self.x_interval().len()
    }

    /// Height (0 for degenerate or non-finite rectangles).
    pub fn height(&self) -> f32 {
        self.y_interval().len()
    }

    /// Area of the rectangle.
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Whether the rectangle has no area or non-finite coordinates.
    pub fn is_degenerate(&self) -> bool {
        !(self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite())
            || self.width() <= 0.0
            || self.height() <= 0.0
    }

    /// Center point.
    pub fn center(&self) -> Point {
        Point::new((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Horizontal extent.
    pub fn x_interval(&self) -> Interval {
        Interval {
            start: self.x0,
            end: self.x1,
        }
    }

    /// Vertical extent.
    pub fn y_interval(&self) -> Interval {
        Interval {
            start: self.y0,
            end: self.y1,
        }
    }

    /// Ratio of the longer side to the shorter one (infinite when degenerate).
    pub fn aspect_ratio(&self) -> f32 {
        let (w, h) = (self.width(), self.height());
        if w <= 0.0 || h <= 0.0 {
            return f32::INFINITY;
        }
        w.max(h) / w.min(h)
    }

    /// Check if a point lies inside the rectangle (edges included).
    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.x0 && p.x <= self.x1 && p.y >= self.y0 && p.y <= self.y1
    }

    /// Check if another rectangle lies entirely inside this one.
    pub fn contains(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.x1 <= self.x1 && other.y0 >= self.y0 && other.y1 <= self.y1
    }

    /// Overlapping region, if any.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x1 > x0 && y1 > y0 {
            Some(Rect { x0, y0, x1, y1 })
        } else {
            None
        }
    }

    /// Area of the overlapping region (0 when disjoint).
    pub fn intersection_area(&self, other: &Rect) -> f32 {
        self.x_interval().overlap(&other.x_interval()) * self.y_interval().overlap(&other.y_interval())
    }

    /// Check if the rectangles share a region of positive area.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.intersection_area(other) > 0.0
    }

    /// Smallest rectangle containing both.
    ///
    /// # Examples
    ///
    /// ```
    /// use pagelayout::geometry::Rect;
    ///
    /// let union = Rect::new(0.0, 0.0, 50.0, 50.0).union(&Rect::new(25.0, 25.0, 75.0, 75.0));
    /// assert_eq!(union, Rect::new(0.0, 0.0, 75.0, 75.0));
    /// ```
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Merge two rectangles into their minimal bounding rectangle.
    pub fn merge(&self, other: &Rect) -> Rect {
        self.union(other)
    }

    /// Intersection over union, in `[0, 1]`.
    ///
    /// Returns 0 when the rectangles are disjoint or both degenerate.
    pub fn iou(&self, other: &Rect) -> f32 {
        let inter = self.intersection_area(other);
        if inter <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            (inter / union).min(1.0)
        } else {
            0.0
        }
    }

    /// Fraction of this rectangle's area covered by `other`.
    pub fn coverage_by(&self, other: &Rect) -> f32 {
        let area = self.area();
        if area > 0.0 {
            self.intersection_area(other) / area
        } else {
            0.0
        }
    }

    /// Grow the rectangle by separate horizontal and vertical margins.
    pub fn pad(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            x0: self.x0 - dx,
            y0: self.y0 - dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }

    /// Vertical distance between the rectangles (0 when they overlap vertically).
    pub fn vertical_gap(&self, other: &Rect) -> f32 {
        self.y_interval().gap(&other.y_interval())
    }

    /// Horizontal overlap length.
    pub fn horizontal_overlap(&self, other: &Rect) -> f32 {
        self.x_interval().overlap(&other.x_interval())
    }

    /// Bounding box of a sequence of rectangles.
    pub fn enclosing<'a, I>(rects: I) -> Option<Rect>
    where
        I: IntoIterator<Item = &'a Rect>,
    {
        rects.into_iter().fold(None, |acc, r| match acc {
            None => Some(*r),
            Some(u) => Some(u.union(r)),
        })
    }
}

/// Compare two floats for sorting, treating NaN as equal.
pub(crate) fn cmp_f32(a: f32, b: f32) -> std::cmp::Ordering {
    a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal)
}

/// Median of a set of values (`None` when empty).
pub(crate) fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| cmp_f32(*a, *b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_normalizes_corners() {
        let r = Rect::new(110.0, 70.0, 10.0, 20.0);
        assert_eq!(r, Rect::new(10.0, 20.0, 110.0, 70.0));
        assert_eq!(r.width(), 100.0);
        assert_eq!(r.height(), 50.0);
        assert_eq!(r.area(), 5000.0);
    }

    #[test]
    fn test_intersection_area() {
        let r1 = Rect::new(0.0, 0.0, 100.0, 100.0);
        let r2 = Rect::new(50.0, 50.0, 150.0, 150.0);
        let r3 = Rect::new(200.0, 200.0, 300.0, 300.0);

        assert_eq!(r1.intersection_area(&r2), 2500.0);
        assert_eq!(r1.intersection_area(&r3), 0.0);
        assert_eq!(r1.intersection(&r2), Some(Rect::new(50.0, 50.0, 100.0, 100.0)));
        assert!(r1.intersection(&r3).is_none());
    }

    #[test]
    fn test_iou_identity_disjoint_symmetric() {
        let a = Rect::new(10.0, 10.0, 60.0, 40.0);
        let b = Rect::new(30.0, 20.0, 90.0, 70.0);
        let c = Rect::new(500.0, 500.0, 510.0, 510.0);

        assert_eq!(a.iou(&a), 1.0);
        assert_eq!(a.iou(&c), 0.0);
        assert_eq!(a.iou(&b), b.iou(&a));
        assert!(a.iou(&b) > 0.0 && a.iou(&b) < 1.0);
    }

    #[test]
    fn test_iou_known_value() {
        // 2500 / (10000 + 10000 - 2500)
        let r1 = Rect::new(0.0, 0.0, 100.0, 100.0);
        let r2 = Rect::new(50.0, 50.0, 150.0, 150.0);
        assert!((r1.iou(&r2) - 2500.0 / 17500.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_inputs_return_zero() {
        let line = Rect::new(0.0, 10.0, 100.0, 10.0);
        let point = Rect::new(5.0, 5.0, 5.0, 5.0);
        let box_ = Rect::new(0.0, 0.0, 100.0, 100.0);

        assert!(line.is_degenerate());
        assert_eq!(line.area(), 0.0);
        assert_eq!(line.iou(&box_), 0.0);
        assert_eq!(point.iou(&point), 0.0);
        assert_eq!(box_.coverage_by(&line), 0.0);

        let nan = Rect {
            x0: f32::NAN,
            y0: 0.0,
            x1: 10.0,
            y1: 10.0,
        };
        assert!(nan.is_degenerate());
        assert_eq!(nan.area(), 0.0);
        assert_eq!(nan.iou(&box_), 0.0);
    }

    #[test]
    fn test_merge_is_minimal_bounding_rect() {
        let r1 = Rect::new(0.0, 0.0, 50.0, 50.0);
        let r2 = Rect::new(25.0, 60.0, 75.0, 80.0);
        let merged = r1.merge(&r2);
        assert_eq!(merged, Rect::new(0.0, 0.0, 75.0, 80.0));
        assert!(merged.contains(&r1));
        assert!(merged.contains(&r2));
    }

    #[test]
    fn test_interval_ops() {
        let a = Interval::new(0.0, 10.0);
        let b = Interval::new(20.0, 15.0);
        assert_eq!(b.start, 15.0);
        assert_eq!(a.overlap(&b), 0.0);
        assert_eq!(a.gap(&b), 5.0);
        assert_eq!(b.gap(&a), 5.0);
        assert_eq!(a.union(&b), Interval::new(0.0, 20.0));
        assert!(a.contains(10.0));
    }

    #[test]
    fn test_vertical_gap_and_overlap() {
        let a = Rect::new(0.0, 0.0, 100.0, 20.0);
        let b = Rect::new(50.0, 30.0, 150.0, 40.0);
        assert_eq!(a.vertical_gap(&b), 10.0);
        assert_eq!(a.horizontal_overlap(&b), 50.0);
    }

    #[test]
    fn test_enclosing_and_median() {
        let rects = [Rect::new(0.0, 0.0, 1.0, 1.0), Rect::new(5.0, 5.0, 6.0, 8.0)];
        assert_eq!(Rect::enclosing(&rects), Some(Rect::new(0.0, 0.0, 6.0, 8.0)));
        assert_eq!(Rect::enclosing(&[]), None);

        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_point_distance() {
        assert_eq!(Point::new(0.0, 0.0).distance(&Point::new(3.0, 4.0)), 5.0);
    }
}
