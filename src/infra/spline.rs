//! Uniform Catmull-Rom spline with an arc-length lookup table.

use crate::infra::types::Point;

/// Samples per control segment when building the arc-length table.
const SAMPLES_PER_SEGMENT: usize = 20;

/// A Catmull-Rom spline sampled into an arc-length table.
///
/// The curve interpolates its interior control points; evaluation is by
/// arc length so callers can advance along it at a metric rate.
#[derive(Debug, Clone)]
pub struct CatmullRomSpline {
    samples: Vec<Point>,
    arc_lengths: Vec<f32>,
}

impl CatmullRomSpline {
    /// Fit a spline through `points`.
    ///
    /// With `dummy_endpoints`, the first and last entries act as tangent
    /// anchors only and the curve runs from `points[1]` to
    /// `points[points.len() - 2]`. Without it, the endpoints are
    /// duplicated as anchors and the curve covers the whole polyline.
    pub fn fit(points: &[Point], dummy_endpoints: bool) -> Self {
        let control: Vec<Point> = if dummy_endpoints {
            assert!(
                points.len() >= 4,
                "spline with anchor endpoints needs at least 4 control points, got {}",
                points.len()
            );
            points.to_vec()
        } else {
            assert!(
                points.len() >= 2,
                "spline needs at least 2 control points, got {}",
                points.len()
            );
            let mut padded = Vec::with_capacity(points.len() + 2);
            padded.push(points[0]);
            padded.extend_from_slice(points);
            padded.push(points[points.len() - 1]);
            padded
        };

        let mut samples = vec![control[1]];
        for i in 1..control.len() - 2 {
            for k in 1..=SAMPLES_PER_SEGMENT {
                let t = k as f32 / SAMPLES_PER_SEGMENT as f32;
                samples.push(catmull_rom(
                    control[i - 1],
                    control[i],
                    control[i + 1],
                    control[i + 2],
                    t,
                ));
            }
        }

        let mut arc_lengths = Vec::with_capacity(samples.len());
        arc_lengths.push(0.0);
        for i in 1..samples.len() {
            let step = samples[i].distance(&samples[i - 1]);
            arc_lengths.push(arc_lengths[i - 1] + step);
        }

        Self {
            samples,
            arc_lengths,
        }
    }

    /// Total arc length of the curve.
    pub fn length(&self) -> f32 {
        *self.arc_lengths.last().expect("spline has samples")
    }

    /// Point at arc length `s`, clamped to the curve ends.
    pub fn position_at(&self, s: f32) -> Point {
        let (i, t) = self.locate(s);
        let a = self.samples[i];
        let b = self.samples[i + 1];
        a + (b - a) * t
    }

    /// Tangent heading (radians) at arc length `s`.
    pub fn heading_at(&self, s: f32) -> f32 {
        let (i, _) = self.locate(s);
        (self.samples[i + 1] - self.samples[i]).heading()
    }

    /// Arc length of the sample nearest to `pt`.
    pub fn project(&self, pt: Point) -> f32 {
        let mut best = 0usize;
        let mut best_dist = f32::INFINITY;
        for (i, sample) in self.samples.iter().enumerate() {
            let d = sample.distance(&pt);
            if d < best_dist {
                best_dist = d;
                best = i;
            }
        }
        self.arc_lengths[best]
    }

    /// Sample segment index and interpolation fraction for arc length `s`.
    fn locate(&self, s: f32) -> (usize, f32) {
        let last = self.samples.len() - 1;
        if s <= 0.0 {
            return (0, 0.0);
        }
        if s >= self.length() {
            return (last - 1, 1.0);
        }
        let i = self.arc_lengths.partition_point(|&a| a < s);
        // arc_lengths[i - 1] < s <= arc_lengths[i]
        let lo = self.arc_lengths[i - 1];
        let hi = self.arc_lengths[i];
        let t = if hi > lo { (s - lo) / (hi - lo) } else { 0.0 };
        (i - 1, t)
    }
}

fn catmull_rom(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let t2 = t * t;
    let t3 = t2 * t;
    (p1 * 2.0
        + (p2 - p0) * t
        + (p0 * 2.0 - p1 * 5.0 + p2 * 4.0 - p3) * t2
        + ((p1 - p2) * 3.0 + p3 - p0) * t3)
        * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight() -> CatmullRomSpline {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(3.0, 0.0),
        ];
        CatmullRomSpline::fit(&pts, true)
    }

    #[test]
    fn test_straight_line_length() {
        let spline = straight();
        assert!((spline.length() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_curve_spans_interior_points() {
        let spline = straight();
        let start = spline.position_at(0.0);
        let end = spline.position_at(spline.length());
        assert!(start.distance(&Point::new(1.0, 0.0)) < 1e-4);
        assert!(end.distance(&Point::new(2.0, 0.0)) < 1e-4);
    }

    #[test]
    fn test_midpoint_on_straight_line() {
        let spline = straight();
        let mid = spline.position_at(0.5);
        assert!((mid.x - 1.5).abs() < 1e-3);
        assert!(mid.y.abs() < 1e-4);
    }

    #[test]
    fn test_heading_along_x() {
        let spline = straight();
        assert!(spline.heading_at(0.5).abs() < 1e-4);
    }

    #[test]
    fn test_clamped_beyond_ends() {
        let spline = straight();
        let before = spline.position_at(-5.0);
        let after = spline.position_at(100.0);
        assert!(before.distance(&Point::new(1.0, 0.0)) < 1e-4);
        assert!(after.distance(&Point::new(2.0, 0.0)) < 1e-4);
    }

    #[test]
    fn test_project_returns_nearest_arc_length() {
        let spline = straight();
        let s = spline.project(Point::new(1.5, 0.3));
        assert!((s - 0.5).abs() < 0.1);
    }

    #[test]
    fn test_fit_without_dummy_endpoints() {
        let pts = [Point::new(0.0, 0.0), Point::new(4.0, 0.0)];
        let spline = CatmullRomSpline::fit(&pts, false);
        assert!((spline.length() - 4.0).abs() < 1e-3);
    }

    #[test]
    #[should_panic(expected = "at least 4 control points")]
    fn test_fit_with_too_few_anchored_points_panics() {
        CatmullRomSpline::fit(&[Point::ZERO, Point::new(1.0, 0.0)], true);
    }
}
