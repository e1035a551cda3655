//! Geometric primitives: points, quadrilaterals, convex hull and
//! minimum-area rectangle extraction via rotating calipers.

/// A point in floating-point image coordinates. May carry negative or
/// off-canvas values after margin expansion; callers must clamp before
/// sampling pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }
}

/// An ordered 4-tuple of points. Convention after post-processing: the
/// first point is the top-left (minimum x+y), the remainder clockwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub points: [Point; 4],
}

impl Quad {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    pub fn from_rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::new([
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    /// Reorders points so the first is the minimum (x+y) corner and the
    /// remainder run clockwise (per spec §4.C step 7).
    pub fn ordered_clockwise(mut self) -> Self {
        let start = self
            .points
            .iter()
            .enumerate()
            .min_by(|a, b| (a.1.x + a.1.y).partial_cmp(&(b.1.x + b.1.y)).unwrap())
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.points.rotate_left(start);

        // Ensure clockwise order (in image coordinates, y grows downward,
        // so clockwise corresponds to a negative signed area in standard
        // math orientation).
        let area: f64 = (0..4)
            .map(|i| {
                let p0 = self.points[i];
                let p1 = self.points[(i + 1) % 4];
                p0.x * p1.y - p1.x * p0.y
            })
            .sum();
        if area > 0.0 {
            self.points[1..].reverse();
        }
        self
    }

    pub fn min_xy(&self) -> Point {
        let x = self.points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let y = self.points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        Point::new(x, y)
    }

    pub fn max_xy(&self) -> Point {
        let x = self
            .points
            .iter()
            .map(|p| p.x)
            .fold(f64::NEG_INFINITY, f64::max);
        let y = self
            .points
            .iter()
            .map(|p| p.y)
            .fold(f64::NEG_INFINITY, f64::max);
        Point::new(x, y)
    }

    pub fn width(&self) -> f64 {
        self.max_xy().x - self.min_xy().x
    }

    pub fn height(&self) -> f64 {
        self.max_xy().y - self.min_xy().y
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Quad {
        Quad::new(self.points.map(|p| Point::new(p.x + dx, p.y + dy)))
    }

    pub fn scale(&self, sx: f64, sy: f64) -> Quad {
        Quad::new(self.points.map(|p| Point::new(p.x * sx, p.y * sy)))
    }

    /// This quad's own tilt off horizontal, in degrees, taken from the
    /// top edge (`points[0]` to `points[1]`). Zero for an axis-aligned
    /// rectangle built with [`Quad::from_rect`].
    pub fn tilt_deg(&self) -> f64 {
        let top = self.points[1].sub(self.points[0]);
        top.y.atan2(top.x).to_degrees()
    }
}

/// Computes the convex hull of a point set via the monotone-chain
/// algorithm. Returns points in counter-clockwise order with no
/// duplicate endpoint.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap().then(a.y.partial_cmp(&b.y).unwrap()));
    pts.dedup_by(|a, b| a.x == b.x && a.y == b.y);

    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: Point, a: Point, b: Point| a.sub(o).cross(b.sub(o));

    let mut lower: Vec<Point> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// A rectangle described by four corner points plus its area, as
/// produced by [`min_area_rect`].
#[derive(Debug, Clone)]
pub struct MinAreaRect {
    pub quad: Quad,
    pub area: f64,
}

/// Minimum-area rectangle containing a point set, via convex hull +
/// rotating calipers (spec §4.C step 5): for each hull edge, rotate all
/// hull points by the edge's angle, take the axis-aligned bounding box
/// of the rotated points, compute its area, keep the minimum, then
/// rotate the resulting rectangle back.
pub fn min_area_rect(points: &[Point]) -> Option<MinAreaRect> {
    let hull = convex_hull(points);
    if hull.is_empty() {
        return None;
    }
    if hull.len() < 3 {
        let min = Point::new(
            hull.iter().map(|p| p.x).fold(f64::INFINITY, f64::min),
            hull.iter().map(|p| p.y).fold(f64::INFINITY, f64::min),
        );
        let max = Point::new(
            hull.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max),
            hull.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max),
        );
        let quad = Quad::from_rect(min.x, min.y, max.x.max(min.x + 1.0), max.y.max(min.y + 1.0));
        let area = quad.width() * quad.height();
        return Some(MinAreaRect { quad, area });
    }

    let n = hull.len();
    let mut best: Option<MinAreaRect> = None;

    for i in 0..n {
        let p0 = hull[i];
        let p1 = hull[(i + 1) % n];
        let edge = p1.sub(p0);
        let angle = edge.y.atan2(edge.x);
        let (sin, cos) = angle.sin_cos();

        // Rotate every hull point into the edge-aligned frame.
        let rotated: Vec<Point> = hull
            .iter()
            .map(|p| Point::new(p.x * cos + p.y * sin, -p.x * sin + p.y * cos))
            .collect();

        let min_x = rotated.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = rotated.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = rotated.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = rotated.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);

        let area = (max_x - min_x) * (max_y - min_y);

        if best.as_ref().map(|b| area < b.area).unwrap_or(true) {
            // Rotate the axis-aligned corners back into image space.
            let corners_rot = [
                Point::new(min_x, min_y),
                Point::new(max_x, min_y),
                Point::new(max_x, max_y),
                Point::new(min_x, max_y),
            ];
            let corners = corners_rot.map(|p| Point::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos));
            best = Some(MinAreaRect {
                quad: Quad::new(corners),
                area,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convex_hull_of_square() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
            Point::new(2.0, 2.0), // interior point, should be discarded
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
    }

    #[test]
    fn min_area_rect_axis_aligned_box() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 5.0),
            Point::new(0.0, 5.0),
        ];
        let rect = min_area_rect(&pts).unwrap();
        assert!((rect.area - 50.0).abs() < 1e-6);
    }

    #[test]
    fn quad_ordered_clockwise_starts_at_min_sum() {
        let quad = Quad::new([
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
        ])
        .ordered_clockwise();
        assert_eq!(quad.points[0], Point::new(0.0, 0.0));
    }
}
