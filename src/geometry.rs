//! Pixel geometry: coordinates, inclusive boxes, disc membership and IoU.
//!
//! Every coordinate is a [`Pixel`] with `x` = column and `y` = row. Boxes are
//! inclusive on both ends, so a box with `min == max` covers exactly one
//! pixel and the area of a box is `(max_x - min_x + 1) * (max_y - min_y + 1)`.

/// Integer pixel coordinate. `x` is the column, `y` the row.
///
/// Signed so that windows around cells near the raster border can extend
/// past the origin before they are clipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pixel {
    pub x: i32,
    pub y: i32,
}

impl Pixel {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned box with inclusive integer bounds.
///
/// Invariant: `min_x <= max_x` and `min_y <= max_y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl BoundingBox {
    pub fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        debug_assert!(min_x <= max_x && min_y <= max_y);
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Square window of half-width `half` centred on `center`.
    pub fn around(center: Pixel, half: i32) -> Self {
        Self::new(
            center.x - half,
            center.y - half,
            center.x + half,
            center.y + half,
        )
    }

    /// Smallest box enclosing every pixel, `None` for an empty set.
    pub fn enclosing<'a, I>(pixels: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Pixel>,
    {
        let mut it = pixels.into_iter();
        let first = it.next()?;
        let mut b = Self::new(first.x, first.y, first.x, first.y);
        for p in it {
            b.min_x = b.min_x.min(p.x);
            b.min_y = b.min_y.min(p.y);
            b.max_x = b.max_x.max(p.x);
            b.max_y = b.max_y.max(p.y);
        }
        Some(b)
    }

    /// Inclusive width in pixels.
    #[inline]
    pub fn width(&self) -> i64 {
        self.max_x as i64 - self.min_x as i64 + 1
    }

    /// Inclusive height in pixels.
    #[inline]
    pub fn height(&self) -> i64 {
        self.max_y as i64 - self.min_y as i64 + 1
    }

    /// Number of pixels covered.
    #[inline]
    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Number of pixels shared with `other` (0 when disjoint).
    pub fn intersection_area(&self, other: &BoundingBox) -> i64 {
        let x_a = self.min_x.max(other.min_x) as i64;
        let y_a = self.min_y.max(other.min_y) as i64;
        let x_b = self.max_x.min(other.max_x) as i64;
        let y_b = self.max_y.min(other.max_y) as i64;
        (x_b - x_a + 1).max(0) * (y_b - y_a + 1).max(0)
    }

    pub fn contains(&self, p: Pixel) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }
}

/// Closed-disc membership: `|point - center|² <= radius²`.
#[inline]
pub fn inside_circle(center: Pixel, point: Pixel, radius: f64) -> bool {
    let dx = (center.x - point.x) as f64;
    let dy = (center.y - point.y) as f64;
    dx * dx + dy * dy <= radius * radius
}

/// Intersection-over-union of two inclusive boxes, in `[0, 1]`.
///
/// Returns 0 when the union is empty.
pub fn calculate_iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let inter = a.intersection_area(b);
    let union = a.area() + b.area() - inter;
    if union <= 0 {
        return 0.0;
    }
    inter as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_iou_identical() {
        let a = BoundingBox::new(85, 85, 115, 115);
        assert_relative_eq!(calculate_iou(&a, &a), 1.0);
        let single = BoundingBox::new(3, 3, 3, 3);
        assert_relative_eq!(calculate_iou(&single, &single), 1.0);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = BoundingBox::new(0, 0, 9, 9);
        let b = BoundingBox::new(10, 0, 19, 9);
        assert_eq!(calculate_iou(&a, &b), 0.0);
        let c = BoundingBox::new(0, 20, 9, 29);
        assert_eq!(calculate_iou(&a, &c), 0.0);
    }

    #[test]
    fn test_iou_containment() {
        let outer = BoundingBox::new(0, 0, 9, 9);
        let inner = BoundingBox::new(2, 2, 6, 6);
        assert_eq!(outer.area(), 100);
        assert_eq!(inner.area(), 25);
        assert_relative_eq!(calculate_iou(&outer, &inner), 0.25);
        assert_relative_eq!(calculate_iou(&inner, &outer), 0.25);
    }

    #[test]
    fn test_iou_partial_overlap() {
        // 10x10 boxes shifted by 5 columns: 50 shared, 150 union
        let a = BoundingBox::new(0, 0, 9, 9);
        let b = BoundingBox::new(5, 0, 14, 9);
        assert_relative_eq!(calculate_iou(&a, &b), 50.0 / 150.0);
    }

    #[test]
    fn test_inside_circle_boundary() {
        let c = Pixel::new(0, 0);
        assert!(inside_circle(c, Pixel::new(3, 4), 5.0));
        assert!(!inside_circle(c, Pixel::new(3, 4), 5.0 - 1e-6));
        assert!(!inside_circle(c, Pixel::new(5, 1), 5.0));
        assert!(inside_circle(c, c, 0.0));
        assert!(inside_circle(Pixel::new(7, 7), Pixel::new(7, 7), 3.0));
    }

    #[test]
    fn test_around_and_enclosing() {
        let b = BoundingBox::around(Pixel::new(100, 100), 15);
        assert_eq!(b, BoundingBox::new(85, 85, 115, 115));

        let pts = [Pixel::new(5, 5), Pixel::new(400, 400), Pixel::new(7, 2)];
        assert_eq!(
            BoundingBox::enclosing(&pts),
            Some(BoundingBox::new(5, 2, 400, 400))
        );
        assert_eq!(BoundingBox::enclosing(&[]), None);
    }
}
