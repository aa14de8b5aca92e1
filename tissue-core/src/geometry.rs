//! Planar polygon geometry used by cells and the division engine.
//!
//! Every predicate here takes degenerate input (zero-length segments,
//! coincident points, collapsed polygons) and still returns a defined
//! answer, never NaN-driven garbage.

use glam::DVec2;

/// Relative tolerance below which the two principal moments of a
/// polygon are treated as equal.
const ISOTROPY_TOLERANCE: f64 = 1e-12;

/// Principal-axis description of a polygon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisInfo {
    /// Unit vector along the direction of largest spread.
    pub long_axis: DVec2,
    /// Extent along `long_axis` of the ellipse with the same second moments.
    pub length: f64,
    /// Extent along the perpendicular of `long_axis`.
    pub width: f64,
}

impl AxisInfo {
    /// The perpendicular of the long axis.
    #[inline]
    pub fn short_axis(&self) -> DVec2 {
        self.long_axis.perp()
    }
}

/// Signed distance-like measure of `q` relative to the line `p1 -> p2`.
///
/// Positive on the left, negative on the right, zero on the line (or
/// everywhere, when `p1 == p2`).
#[inline]
pub fn line_side(p1: DVec2, p2: DVec2, q: DVec2) -> f64 {
    (p2 - p1).perp_dot(q - p1)
}

/// Where the segment `a -> b` crosses the infinite line through `p1, p2`.
///
/// Returns the parameter `t` in `(0, 1)` such that the crossing point is
/// `a.lerp(b, t)`. Only strict crossings count: an endpoint lying on the
/// line, a segment lying along the line, or a degenerate line all give
/// `None`.
pub fn segment_line_crossing(a: DVec2, b: DVec2, p1: DVec2, p2: DVec2) -> Option<f64> {
    let sa = line_side(p1, p2, a);
    let sb = line_side(p1, p2, b);
    if !(sa.is_finite() && sb.is_finite()) {
        return None;
    }
    if (sa > 0.0 && sb < 0.0) || (sa < 0.0 && sb > 0.0) {
        Some(sa / (sa - sb))
    } else {
        None
    }
}

fn on_segment(a: DVec2, b: DVec2, q: DVec2) -> bool {
    q.x >= a.x.min(b.x) && q.x <= a.x.max(b.x) && q.y >= a.y.min(b.y) && q.y <= a.y.max(b.y)
}

/// Closed-segment intersection test, touching endpoints included.
pub fn segments_intersect(a1: DVec2, a2: DVec2, b1: DVec2, b2: DVec2) -> bool {
    let d1 = line_side(b1, b2, a1);
    let d2 = line_side(b1, b2, a2);
    let d3 = line_side(a1, a2, b1);
    let d4 = line_side(a1, a2, b2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(b1, b2, a1))
        || (d2 == 0.0 && on_segment(b1, b2, a2))
        || (d3 == 0.0 && on_segment(a1, a2, b1))
        || (d4 == 0.0 && on_segment(a1, a2, b2))
}

/// A closed polygon given by its vertices in boundary order.
///
/// The closing edge from the last vertex back to the first is implicit.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    pub points: Vec<DVec2>,
}

impl Polygon {
    pub fn new(points: Vec<DVec2>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates over the edges as `(start, end)` pairs, closing edge included.
    pub fn edges(&self) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Shoelace area; positive for counter-clockwise vertex order.
    pub fn signed_area(&self) -> f64 {
        0.5 * self.edges().map(|(a, b)| a.perp_dot(b)).sum::<f64>()
    }

    /// Area-weighted centroid.
    ///
    /// Falls back to the vertex mean for polygons with (near) zero area.
    pub fn centroid(&self) -> DVec2 {
        if self.points.is_empty() {
            return DVec2::ZERO;
        }
        let mut acc = DVec2::ZERO;
        let mut twice_area = 0.0;
        for (a, b) in self.edges() {
            let cross = a.perp_dot(b);
            twice_area += cross;
            acc += (a + b) * cross;
        }
        if twice_area.abs() > f64::EPSILON {
            acc / (3.0 * twice_area)
        } else {
            self.points.iter().copied().sum::<DVec2>() / self.points.len() as f64
        }
    }

    /// Long axis, length and width from the polygon's second moments of area.
    ///
    /// The length and width are those of the ellipse with the same
    /// inertia tensor, `4 * sqrt(lambda / area)` for each principal moment
    /// `lambda`. When both moments coincide (a square, a regular polygon)
    /// there is no preferred direction and the x axis is returned.
    pub fn length(&self) -> AxisInfo {
        let degenerate = AxisInfo {
            long_axis: DVec2::X,
            length: 0.0,
            width: 0.0,
        };

        let mut area = 0.0;
        let mut sx = 0.0;
        let mut sy = 0.0;
        let mut sxx = 0.0;
        let mut syy = 0.0;
        let mut sxy = 0.0;
        for (a, b) in self.edges() {
            let cross = a.perp_dot(b);
            area += cross;
            sx += (a.x + b.x) * cross;
            sy += (a.y + b.y) * cross;
            sxx += (a.x * a.x + a.x * b.x + b.x * b.x) * cross;
            syy += (a.y * a.y + a.y * b.y + b.y * b.y) * cross;
            sxy += (a.x * b.y + 2.0 * a.x * a.y + 2.0 * b.x * b.y + b.x * a.y) * cross;
        }
        area *= 0.5;
        sx /= 6.0;
        sy /= 6.0;
        sxx /= 12.0;
        syy /= 12.0;
        sxy /= 24.0;

        // Clockwise input flips every integral's sign.
        if area < 0.0 {
            area = -area;
            sx = -sx;
            sy = -sy;
            sxx = -sxx;
            syy = -syy;
            sxy = -sxy;
        }
        if !(area > f64::EPSILON) || !area.is_finite() {
            return degenerate;
        }

        // Central moments.
        let ixx = sxx - sx * sx / area;
        let iyy = syy - sy * sy / area;
        let ixy = sxy - sx * sy / area;

        let mean = 0.5 * (ixx + iyy);
        let half_diff = (0.25 * (ixx - iyy) * (ixx - iyy) + ixy * ixy).sqrt();
        let lambda_major = mean + half_diff;
        let lambda_minor = (mean - half_diff).max(0.0);

        let long_axis = if half_diff <= ISOTROPY_TOLERANCE * mean.abs() {
            DVec2::X
        } else {
            let v = DVec2::new(ixy, lambda_major - ixx);
            let v = if v.length_squared() > (lambda_major - iyy).powi(2) * ISOTROPY_TOLERANCE {
                v
            } else {
                DVec2::new(lambda_major - iyy, ixy)
            };
            let n = v.normalize_or_zero();
            if n == DVec2::ZERO { DVec2::X } else { n }
        };

        AxisInfo {
            long_axis,
            length: 4.0 * (lambda_major.max(0.0) / area).sqrt(),
            width: 4.0 * (lambda_minor / area).sqrt(),
        }
    }

    /// Whether any two non-adjacent edges touch or cross.
    pub fn self_intersects(&self) -> bool {
        let n = self.points.len();
        if n < 4 {
            return false;
        }
        for i in 0..n {
            let (a1, a2) = (self.points[i], self.points[(i + 1) % n]);
            // j starts two edges on; skip the closing edge when i == 0.
            for j in (i + 2)..n {
                if i == 0 && j == n - 1 {
                    continue;
                }
                let (b1, b2) = (self.points[j], self.points[(j + 1) % n]);
                if segments_intersect(a1, a2, b1, b2) {
                    return true;
                }
            }
        }
        false
    }

    /// Whether the infinite line through `p1, p2` separates the polygon's
    /// vertices, i.e. actually passes through its interior.
    pub fn intersects_line(&self, p1: DVec2, p2: DVec2) -> bool {
        let mut left = false;
        let mut right = false;
        for &q in &self.points {
            let s = line_side(p1, p2, q);
            left |= s > 0.0;
            right |= s < 0.0;
            if left && right {
                return true;
            }
        }
        false
    }

    /// Whether the segment `p1 -> p2` touches or crosses any edge.
    pub fn line_piece_intersects(&self, p1: DVec2, p2: DVec2) -> bool {
        self.edges().any(|(a, b)| segments_intersect(a, b, p1, p2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn unit_square() -> Polygon {
        Polygon::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(0.0, 1.0),
        ])
    }

    fn rectangle(w: f64, h: f64) -> Polygon {
        Polygon::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(w, 0.0),
            DVec2::new(w, h),
            DVec2::new(0.0, h),
        ])
    }

    #[test]
    fn area_sign_follows_orientation() {
        let sq = unit_square();
        assert_relative_eq!(sq.signed_area(), 1.0);

        let mut rev = sq.points.clone();
        rev.reverse();
        assert_relative_eq!(Polygon::new(rev).signed_area(), -1.0);
    }

    #[test]
    fn centroid_of_square_is_its_middle() {
        let c = unit_square().centroid();
        assert_relative_eq!(c.x, 0.5);
        assert_relative_eq!(c.y, 0.5);
    }

    #[test]
    fn centroid_of_collapsed_polygon_is_vertex_mean() {
        let p = Polygon::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(2.0, 0.0),
            DVec2::new(4.0, 0.0),
        ]);
        let c = p.centroid();
        assert_relative_eq!(c.x, 2.0);
        assert_relative_eq!(c.y, 0.0);
    }

    #[test]
    fn long_axis_of_wide_rectangle_is_horizontal() {
        let info = rectangle(4.0, 1.0).length();
        assert_abs_diff_eq!(info.long_axis.y.abs(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(info.long_axis.x.abs(), 1.0, epsilon = 1e-12);
        assert!(info.length > info.width);
        // Equivalent ellipse of a w x h rectangle: length = 4 * w / sqrt(12).
        assert_relative_eq!(info.length, 4.0 * 4.0 / 12f64.sqrt(), epsilon = 1e-9);
        assert_relative_eq!(info.width, 4.0 * 1.0 / 12f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn long_axis_of_tall_rectangle_is_vertical() {
        let info = rectangle(1.0, 3.0).length();
        assert_abs_diff_eq!(info.long_axis.x.abs(), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(info.long_axis.y.abs(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(info.short_axis().y.abs(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn long_axis_of_tilted_rectangle_follows_tilt() {
        let angle = 0.3f64;
        let rot = DVec2::from_angle(angle);
        let pts = rectangle(5.0, 1.0)
            .points
            .into_iter()
            .map(|p| rot.rotate(p) + DVec2::new(3.0, -2.0))
            .collect();
        let info = Polygon::new(pts).length();
        let expected = DVec2::from_angle(angle);
        assert_abs_diff_eq!(info.long_axis.dot(expected).abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn square_has_no_preferred_axis() {
        let info = unit_square().length();
        assert_eq!(info.long_axis, DVec2::X);
        assert_relative_eq!(info.length, info.width, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_polygon_length_is_zero() {
        let info = Polygon::new(vec![DVec2::ZERO, DVec2::ZERO, DVec2::ZERO]).length();
        assert_eq!(info.length, 0.0);
        assert_eq!(info.long_axis, DVec2::X);
    }

    #[test]
    fn bow_tie_self_intersects() {
        let bow = Polygon::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(1.0, 1.0),
            DVec2::new(1.0, 0.0),
            DVec2::new(0.0, 1.0),
        ]);
        assert!(bow.self_intersects());
        assert!(!unit_square().self_intersects());
    }

    #[test]
    fn crossing_requires_strictly_opposite_sides() {
        let p1 = DVec2::new(0.5, -1.0);
        let p2 = DVec2::new(0.5, 2.0);
        let t = segment_line_crossing(DVec2::new(0.0, 0.0), DVec2::new(1.0, 0.0), p1, p2);
        assert_relative_eq!(t.unwrap_or(f64::NAN), 0.5);

        // Endpoint on the line.
        assert!(segment_line_crossing(DVec2::new(0.5, 0.0), DVec2::new(1.0, 0.0), p1, p2).is_none());
        // Degenerate line.
        assert!(segment_line_crossing(DVec2::ZERO, DVec2::X, p1, p1).is_none());
    }

    #[test]
    fn line_and_line_piece_predicates() {
        let sq = unit_square();
        assert!(sq.intersects_line(DVec2::new(0.5, 10.0), DVec2::new(0.5, 11.0)));
        assert!(!sq.intersects_line(DVec2::new(2.0, 0.0), DVec2::new(2.0, 1.0)));
        // Coincident points never separate anything.
        assert!(!sq.intersects_line(DVec2::new(0.5, 0.5), DVec2::new(0.5, 0.5)));

        assert!(sq.line_piece_intersects(DVec2::new(0.5, 0.5), DVec2::new(0.5, 3.0)));
        assert!(!sq.line_piece_intersects(DVec2::new(0.2, 0.2), DVec2::new(0.8, 0.8)));
    }
}
