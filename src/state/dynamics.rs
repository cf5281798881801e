//! Spline-following acceleration dynamics.
//!
//! Each agent owns one model instance. The high-level layer registers the
//! episode track exactly once; after that the model advances the vehicle
//! along the curve under scalar acceleration commands.

use crate::infra::{CatmullRomSpline, Point};
use crate::state::vehicle::Vehicle;

/// Per-agent dynamics model: acceleration control along a registered
/// Catmull-Rom track.
#[derive(Debug, Clone)]
pub struct SplineAccelerationModel {
    dt: f32,
    spline: Option<CatmullRomSpline>,
    /// Arc length under the vehicle.
    cursor: f32,
}

impl SplineAccelerationModel {
    pub fn new(dt: f32) -> Self {
        assert!(dt > 0.0, "timestep must be positive");
        Self {
            dt,
            spline: None,
            cursor: 0.0,
        }
    }

    pub fn has_track(&self) -> bool {
        self.spline.is_some()
    }

    /// Register the episode track. With `dummy_endpoints`, the first and
    /// last points are tangent anchors outside the drivable area.
    ///
    /// Panics if a track was already registered this episode.
    pub fn register_track(&mut self, points: &[Point], dummy_endpoints: bool) {
        assert!(
            self.spline.is_none(),
            "track already registered for this episode"
        );
        self.spline = Some(CatmullRomSpline::fit(points, dummy_endpoints));
        self.cursor = 0.0;
    }

    /// One physics tick: integrate speed and re-pose the vehicle from the
    /// registered track.
    pub fn step(&mut self, vehicle: &mut Vehicle, accln: f32) {
        let spline = self
            .spline
            .as_ref()
            .expect("cannot step dynamics before a track is registered");
        vehicle.speed = (vehicle.speed + accln * self.dt).clamp(0.0, vehicle.speed_limit);
        self.cursor = (self.cursor + vehicle.speed * self.dt).min(spline.length());
        vehicle.position = spline.position_at(self.cursor);
        vehicle.orientation = spline.heading_at(self.cursor);
    }

    /// Pure single-tick map for nominal open-loop rollouts.
    ///
    /// State layout is `[x, y, speed, orientation]`. Before a track is
    /// registered the state advances in a straight line; afterwards it is
    /// projected onto the curve.
    pub fn forward(&self, state: [f32; 4], accln: f32) -> [f32; 4] {
        let [x, y, speed, orientation] = state;
        let next_speed = (speed + accln * self.dt).max(0.0);
        match &self.spline {
            Some(spline) => {
                let s = spline.project(Point::new(x, y)) + next_speed * self.dt;
                let position = spline.position_at(s);
                [position.x, position.y, next_speed, spline.heading_at(s)]
            }
            None => [
                x + next_speed * self.dt * orientation.cos(),
                y + next_speed * self.dt * orientation.sin(),
                next_speed,
                orientation,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> Vec<Point> {
        vec![
            Point::new(-2.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(12.0, 0.0),
        ]
    }

    fn vehicle() -> Vehicle {
        Vehicle::new(
            "agent_0",
            Point::new(0.0, 0.0),
            0.0,
            5.0,
            Point::new(10.0, 0.0),
            0.0,
        )
    }

    #[test]
    fn test_register_track_once() {
        let mut model = SplineAccelerationModel::new(0.1);
        assert!(!model.has_track());
        model.register_track(&track(), true);
        assert!(model.has_track());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_double_registration_panics() {
        let mut model = SplineAccelerationModel::new(0.1);
        model.register_track(&track(), true);
        model.register_track(&track(), true);
    }

    #[test]
    #[should_panic(expected = "before a track is registered")]
    fn test_step_without_track_panics() {
        let mut model = SplineAccelerationModel::new(0.1);
        model.step(&mut vehicle(), 1.0);
    }

    #[test]
    fn test_step_advances_along_track() {
        let mut model = SplineAccelerationModel::new(0.1);
        model.register_track(&track(), true);
        let mut v = vehicle();
        for _ in 0..10 {
            model.step(&mut v, 1.0);
        }
        assert!(v.speed > 0.9);
        assert!(v.position.x > 0.0);
        assert!(v.position.y.abs() < 1e-3);
    }

    #[test]
    fn test_speed_clamped_to_limit() {
        let mut model = SplineAccelerationModel::new(0.1);
        model.register_track(&track(), true);
        let mut v = vehicle();
        for _ in 0..200 {
            model.step(&mut v, 1.5);
        }
        assert!(v.speed <= v.speed_limit + 1e-6);
    }

    #[test]
    fn test_forward_without_track_is_straight_line() {
        let model = SplineAccelerationModel::new(0.1);
        let next = model.forward([0.0, 0.0, 1.0, 0.0], 0.0);
        assert!((next[0] - 0.1).abs() < 1e-6);
        assert!(next[1].abs() < 1e-6);
    }

    #[test]
    fn test_forward_speed_never_negative() {
        let model = SplineAccelerationModel::new(0.1);
        let next = model.forward([0.0, 0.0, 0.05, 0.0], -1.5);
        assert_eq!(next[2], 0.0);
    }

    #[test]
    fn test_forward_follows_registered_track() {
        let mut model = SplineAccelerationModel::new(0.1);
        model.register_track(&track(), true);
        let next = model.forward([2.0, 0.5, 2.0, 0.0], 0.0);
        // Projected back to the curve and advanced along it.
        assert!(next[1].abs() < 0.1);
        assert!(next[0] > 2.0);
    }
}
