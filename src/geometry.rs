//! Small 2D helpers on top of `Vec2`.
//!
//! Vector arithmetic (add, scale, dot, distance, length²) comes straight from
//! `bevy::math::Vec2`; this module only adds the guarded variants the
//! simulation needs plus a few polygon/segment tests.

use bevy::math::Vec2;

/// Squared lengths below this are treated as coincident points.
pub const DEGENERATE_EPSILON: f32 = 1e-12;

/// Unit vector along `v`, or `None` for zero / non-finite input.
pub fn normalize_or_none(v: Vec2) -> Option<Vec2> {
    let len2 = v.length_squared();
    if len2 <= DEGENERATE_EPSILON || !len2.is_finite() {
        return None;
    }
    Some(v / len2.sqrt())
}

/// `v` rotated by +90°.
pub fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}

fn cross(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Intersection point of the closed segments `a0..a1` and `b0..b1`.
///
/// Parallel and collinear segments return `None`.
pub fn segment_intersection(a0: Vec2, a1: Vec2, b0: Vec2, b1: Vec2) -> Option<Vec2> {
    let r = a1 - a0;
    let s = b1 - b0;
    let denom = cross(r, s);
    if denom.abs() <= f32::EPSILON {
        return None;
    }
    let qp = b0 - a0;
    let t = cross(qp, s) / denom;
    let u = cross(qp, r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a0 + r * t)
    } else {
        None
    }
}

/// Even-odd point-in-polygon test. Polygons with fewer than three vertices
/// contain nothing.
pub fn polygon_contains(polygon: &[Vec2], point: Vec2) -> bool {
    if polygon.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let (pi, pj) = (polygon[i], polygon[j]);
        if (pi.y > point.y) != (pj.y > point.y) {
            let x_cross = (pj.x - pi.x) * (point.y - pi.y) / (pj.y - pi.y) + pi.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Triangle list approximating the unit circle: one triangle per segment,
/// each `[rim_i, rim_i+1, centre]`.
pub fn circle_fan(segments: usize) -> Vec<[f32; 3]> {
    let segments = segments.max(3);
    let rim: Vec<Vec2> = (0..segments)
        .map(|i| Vec2::from_angle(std::f32::consts::TAU * i as f32 / segments as f32))
        .collect();

    let mut vertices = Vec::with_capacity(segments * 3);
    for i in 0..segments {
        let next = rim[(i + 1) % segments];
        vertices.push([rim[i].x, rim[i].y, 0.0]);
        vertices.push([next.x, next.y, 0.0]);
        vertices.push([0.0, 0.0, 0.0]);
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_guards_zero() {
        assert_eq!(normalize_or_none(Vec2::ZERO), None);
        assert_eq!(normalize_or_none(Vec2::new(f32::NAN, 0.0)), None);
        let n = normalize_or_none(Vec2::new(3.0, 4.0)).unwrap();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn perpendicular_is_orthogonal() {
        let v = Vec2::new(2.0, -1.0);
        assert_eq!(perpendicular(v).dot(v), 0.0);
        assert_eq!(perpendicular(Vec2::X), Vec2::Y);
    }

    #[test]
    fn crossing_segments_intersect() {
        let p = segment_intersection(
            Vec2::new(-1.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, -1.0),
            Vec2::new(0.0, 1.0),
        )
        .unwrap();
        assert!(p.length() < 1e-6);
    }

    #[test]
    fn disjoint_and_parallel_segments_do_not_intersect() {
        assert!(segment_intersection(
            Vec2::ZERO,
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, -1.0),
            Vec2::new(2.0, 1.0),
        )
        .is_none());
        assert!(segment_intersection(
            Vec2::ZERO,
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
        )
        .is_none());
    }

    #[test]
    fn polygon_membership() {
        let square = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ];
        assert!(polygon_contains(&square, Vec2::new(0.5, 0.5)));
        assert!(!polygon_contains(&square, Vec2::new(1.5, 0.5)));
        assert!(!polygon_contains(&square[..2], Vec2::new(0.5, 0.0)));
    }

    #[test]
    fn circle_fan_has_three_vertices_per_segment() {
        let fan = circle_fan(16);
        assert_eq!(fan.len(), 48);
        for tri in fan.chunks(3) {
            let rim = Vec2::new(tri[0][0], tri[0][1]);
            assert!((rim.length() - 1.0).abs() < 1e-5);
            assert_eq!(tri[2], [0.0, 0.0, 0.0]);
        }
        assert_eq!(circle_fan(1).len(), 9);
    }
}
