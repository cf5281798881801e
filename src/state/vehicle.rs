use crate::infra::{Point, angle_normalize};

/// Kinematic record for one vehicle.
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub name: String,
    pub position: Point,
    pub speed: f32,
    pub orientation: f32,
    pub speed_limit: f32,
    pub destination: Point,
    pub dest_orientation: f32,
}

impl Vehicle {
    pub fn new(
        name: impl Into<String>,
        position: Point,
        orientation: f32,
        speed_limit: f32,
        destination: Point,
        dest_orientation: f32,
    ) -> Self {
        Self {
            name: name.into(),
            position,
            speed: 0.0,
            orientation,
            speed_limit,
            destination,
            dest_orientation,
        }
    }

    pub fn distance_from_destination(&self) -> f32 {
        self.position.distance(&self.destination)
    }

    /// Signed angle from the current heading to the destination bearing.
    pub fn heading_error(&self) -> f32 {
        let bearing = (self.destination - self.position).heading();
        angle_normalize(bearing - self.orientation)
    }

    /// State vector `[x, y, speed, orientation]` consumed by the dynamics.
    pub fn state4(&self) -> [f32; 4] {
        [
            self.position.x,
            self.position.y,
            self.speed,
            self.orientation,
        ]
    }
}

/// Target state the high-level policy perturbs via discrete offsets.
#[derive(Debug, Clone, Copy)]
pub struct GoalState {
    pub position: Point,
    pub speed: f32,
    pub orientation: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn vehicle() -> Vehicle {
        Vehicle::new(
            "agent_0",
            Point::new(10.0, 0.0),
            PI,
            8.0,
            Point::new(-10.0, 0.0),
            PI,
        )
    }

    #[test]
    fn test_spawns_at_rest() {
        assert_eq!(vehicle().speed, 0.0);
    }

    #[test]
    fn test_distance_from_destination() {
        assert!((vehicle().distance_from_destination() - 20.0).abs() < 1e-6);
    }

    #[test]
    fn test_heading_error_when_aligned() {
        // Facing -x with the destination straight ahead.
        assert!(vehicle().heading_error().abs() < 1e-5);
    }

    #[test]
    fn test_state4_layout() {
        let state = vehicle().state4();
        assert_eq!(state[0], 10.0);
        assert_eq!(state[1], 0.0);
        assert_eq!(state[2], 0.0);
        assert!((state[3] - PI).abs() < 1e-6);
    }
}
