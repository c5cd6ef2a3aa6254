use std::f64::consts::PI;

use super::Point;

/// Angle at `vertex`, in degrees, between the rays towards `a` and `c`.
///
/// The result always lies in `[0, 180]`. `None` when any point is missing.
pub fn angle_at(a: Option<Point>, vertex: Option<Point>, c: Option<Point>) -> Option<f64> {
    let (a, b, c) = (a?, vertex?, c?);

    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let mut angle = (radians * 180.0 / PI).abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }

    Some(angle)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn p(x: f64, y: f64) -> Option<Point> {
        Some(Point::new(x, y))
    }

    #[test]
    fn test_right_angle() {
        let angle = angle_at(p(1.0, 0.0), p(0.0, 0.0), p(0.0, 1.0)).unwrap();
        assert!((angle - 90.0).abs() < EPS);
    }

    #[test]
    fn test_collinear_with_vertex_between() {
        let angle = angle_at(p(-3.0, 2.0), p(0.0, 2.0), p(5.0, 2.0)).unwrap();
        assert!((angle - 180.0).abs() < EPS);
    }

    #[test]
    fn test_reflex_difference_is_folded() {
        // atan2 difference here is 270 degrees before folding.
        let angle = angle_at(p(-1.0, -1.0), p(0.0, 0.0), p(-1.0, 1.0)).unwrap();
        assert!((angle - 90.0).abs() < EPS);
    }

    #[test]
    fn test_result_stays_in_range() {
        let points = [
            (0.3, -1.2),
            (4.0, 0.5),
            (-2.5, -2.5),
            (0.0, 3.0),
            (-1.0, 0.01),
            (7.5, -0.2),
        ];
        for &a in &points {
            for &c in &points {
                if a == c {
                    continue;
                }
                let angle = angle_at(p(a.0, a.1), p(0.1, 0.2), p(c.0, c.1)).unwrap();
                assert!((0.0..=180.0).contains(&angle), "{angle} out of range");
            }
        }
    }

    #[test]
    fn test_missing_point_yields_none() {
        assert!(angle_at(None, p(0.0, 0.0), p(1.0, 1.0)).is_none());
        assert!(angle_at(p(1.0, 0.0), None, p(1.0, 1.0)).is_none());
        assert!(angle_at(p(1.0, 0.0), p(0.0, 0.0), None).is_none());
    }

    #[test]
    fn test_is_reproducible() {
        let first = angle_at(p(0.12, 0.98), p(0.4, 0.51), p(0.77, 0.93));
        let second = angle_at(p(0.12, 0.98), p(0.4, 0.51), p(0.77, 0.93));
        assert_eq!(first.map(f64::to_bits), second.map(f64::to_bits));
    }
}
