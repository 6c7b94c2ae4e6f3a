//! Geometry over landmarks
//!
//! Pure, total functions. Degenerate inputs (coincident points) give stable
//! values instead of NaN so threshold comparisons downstream stay total.

use crate::Landmark;

/// Angle in degrees at vertex `b` of the path a-b-c, in [0, 180]
///
/// Returns 0 when `a` or `c` coincides with `b`.
pub fn angle_at(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    let (bax, bay) = (a.x - b.x, a.y - b.y);
    let (bcx, bcy) = (c.x - b.x, c.y - b.y);

    if (bax == 0.0 && bay == 0.0) || (bcx == 0.0 && bcy == 0.0) {
        return 0.0;
    }

    let radians = bcy.atan2(bcx) - bay.atan2(bax);
    let mut angle = radians.to_degrees().abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }
    angle.clamp(0.0, 180.0)
}

/// 3-D Euclidean distance
pub fn distance(p1: &Landmark, p2: &Landmark) -> f32 {
    let dx = p2.x - p1.x;
    let dy = p2.y - p1.y;
    let dz = p2.z - p1.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Distance on the image plane, ignoring depth
pub fn planar_distance(p1: &Landmark, p2: &Landmark) -> f32 {
    (p2.x - p1.x).hypot(p2.y - p1.y)
}

/// Midpoint of two landmarks; visibility is the weaker of the two
pub fn midpoint(a: &Landmark, b: &Landmark) -> Landmark {
    Landmark {
        x: (a.x + b.x) / 2.0,
        y: (a.y + b.y) / 2.0,
        z: (a.z + b.z) / 2.0,
        visibility: a.visibility.min(b.visibility),
    }
}

/// Mean position of a set of landmarks
pub fn centroid(points: &[&Landmark]) -> Option<Landmark> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f32;
    let (x, y, z, vis) = points.iter().fold((0.0, 0.0, 0.0, 1.0f32), |acc, p| {
        (acc.0 + p.x, acc.1 + p.y, acc.2 + p.z, acc.3.min(p.visibility))
    });
    Some(Landmark::new(x / n, y / n, z / n, vis))
}

/// Deviation of the segment upper-lower from vertical, in degrees [0, 90]
pub fn vertical_deviation(upper: &Landmark, lower: &Landmark) -> f32 {
    let dx = (lower.x - upper.x).abs();
    let dy = (lower.y - upper.y).abs();
    dx.atan2(dy).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_right_angle() {
        let a = Landmark::at(0.0, 1.0);
        let b = Landmark::at(0.0, 0.0);
        let c = Landmark::at(1.0, 0.0);
        assert!((angle_at(&a, &b, &c) - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_straight_line_is_180() {
        let a = Landmark::at(0.5, 0.2);
        let b = Landmark::at(0.5, 0.5);
        let c = Landmark::at(0.5, 0.8);
        assert!((angle_at(&a, &b, &c) - 180.0).abs() < 1e-3);
    }

    #[test]
    fn test_reflex_folds_below_180() {
        // Bearings of +170° and -170° are 20° apart, not 340°
        let b = Landmark::at(0.0, 0.0);
        let a = Landmark::at(-1.0, 0.176);
        let c = Landmark::at(-1.0, -0.176);
        let angle = angle_at(&a, &b, &c);
        assert!(angle < 25.0, "got {angle}");
    }

    #[test]
    fn test_coincident_points() {
        let p = Landmark::at(0.3, 0.3);
        let q = Landmark::at(0.6, 0.1);
        assert_eq!(angle_at(&p, &p, &q), 0.0);
        assert_eq!(angle_at(&q, &p, &p), 0.0);
        assert_eq!(distance(&p, &p), 0.0);
    }

    #[test]
    fn test_distance_uses_depth() {
        let a = Landmark::new(0.0, 0.0, 0.0, 1.0);
        let b = Landmark::new(0.3, 0.0, 0.4, 1.0);
        assert!((distance(&a, &b) - 0.5).abs() < 1e-6);
        assert!((planar_distance(&a, &b) - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_midpoint_and_centroid() {
        let a = Landmark::new(0.2, 0.4, 0.0, 0.9);
        let b = Landmark::new(0.6, 0.8, 0.2, 0.5);
        let m = midpoint(&a, &b);
        assert!((m.x - 0.4).abs() < 1e-6);
        assert!((m.y - 0.6).abs() < 1e-6);
        assert_eq!(m.visibility, 0.5);

        let c = centroid(&[&a, &b]).unwrap();
        assert!((c.x - m.x).abs() < 1e-6);
        assert!(centroid(&[]).is_none());
    }

    #[test]
    fn test_vertical_deviation() {
        let upper = Landmark::at(0.5, 0.3);
        assert!(vertical_deviation(&upper, &Landmark::at(0.5, 0.7)) < 1e-4);
        assert!((vertical_deviation(&upper, &Landmark::at(0.9, 0.7)) - 45.0).abs() < 1e-3);
    }

    proptest! {
        #[test]
        fn prop_angle_is_total_and_bounded(
            ax in -2.0f32..2.0, ay in -2.0f32..2.0,
            bx in -2.0f32..2.0, by in -2.0f32..2.0,
            cx in -2.0f32..2.0, cy in -2.0f32..2.0,
        ) {
            let angle = angle_at(&Landmark::at(ax, ay), &Landmark::at(bx, by), &Landmark::at(cx, cy));
            prop_assert!(!angle.is_nan());
            prop_assert!((0.0..=180.0).contains(&angle));
        }

        #[test]
        fn prop_angle_is_symmetric(
            ax in -1.0f32..1.0, ay in -1.0f32..1.0,
            cx in -1.0f32..1.0, cy in -1.0f32..1.0,
        ) {
            let b = Landmark::at(0.0, 0.0);
            let a = Landmark::at(ax, ay);
            let c = Landmark::at(cx, cy);
            prop_assert!((angle_at(&a, &b, &c) - angle_at(&c, &b, &a)).abs() < 1e-3);
        }
    }
}
