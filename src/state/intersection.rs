//! 4-way intersection geometry and route construction.
//!
//! The drivable area is a central square of half-width `width / 2` with
//! four road arms (`road_0` .. `road_3`) extending along +x, +y, -x and -y
//! out to `length + width / 2` from the centre.

use crate::infra::Point;
use crate::state::vehicle::GoalState;

/// One approach road of the intersection.
#[derive(Debug, Clone)]
pub struct Road {
    /// Road name; always ends in the arm digit.
    pub name: String,
    pub index: usize,
}

impl Road {
    pub fn new(index: usize) -> Self {
        assert!(index < 4, "road index {index} out of range for a 4-way intersection");
        Self {
            name: format!("road_{index}"),
            index,
        }
    }

    /// Axis the road runs along: 0 = x, 1 = y.
    pub fn travel_axis(&self) -> usize {
        self.index % 2
    }

    /// Axis a left/right deviation is applied to, parsed from the trailing
    /// digit of the road name.
    pub fn deviation_axis(&self) -> usize {
        let digit = self
            .name
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .expect("road name ends in a digit") as usize;
        (digit + 1) % 2
    }
}

/// Entry pose, destination and intermediate goals for one crossing.
#[derive(Debug, Clone)]
pub struct Route {
    pub road: Road,
    pub spawn_position: Point,
    pub spawn_orientation: f32,
    pub destination: Point,
    pub dest_orientation: f32,
    pub goals: Vec<GoalState>,
}

impl Route {
    /// Straight-line distance from spawn to destination.
    pub fn straight_distance(&self) -> f32 {
        self.spawn_position.distance(&self.destination)
    }
}

/// Geometry of the 4-way intersection.
#[derive(Debug, Clone)]
pub struct IntersectionLayout {
    /// Length of each road arm, from the square edge to its outer end.
    pub length: f32,
    /// Width of the drivable square (and of each road).
    pub width: f32,
}

impl Default for IntersectionLayout {
    fn default() -> Self {
        Self {
            length: 40.0,
            width: 20.0,
        }
    }
}

impl IntersectionLayout {
    pub fn new(length: f32, width: f32) -> Self {
        assert!(length > 0.0 && width > 0.0, "layout extents must be positive");
        Self { length, width }
    }

    /// Half-width of the central drivable square.
    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    /// Distance from the centre to a road arm's outer end.
    pub fn extent(&self) -> f32 {
        self.length + self.width / 2.0
    }

    /// Outward unit direction of arm `index`.
    pub fn arm_direction(index: usize) -> Point {
        match index {
            0 => Point::new(1.0, 0.0),
            1 => Point::new(0.0, 1.0),
            2 => Point::new(-1.0, 0.0),
            3 => Point::new(0.0, -1.0),
            _ => panic!("road index {index} out of range for a 4-way intersection"),
        }
    }

    /// Whether `pt` lies inside the central drivable square.
    pub fn inside_square(&self, pt: Point) -> bool {
        pt.x.abs() <= self.half_width() && pt.y.abs() <= self.half_width()
    }

    /// Build the route entering on arm `from` and leaving on arm `to`,
    /// with `n_goals` intermediate goal states along the crossing. The
    /// final goal sits at the destination.
    pub fn route(&self, from: usize, to: usize, n_goals: usize, speed: f32) -> Route {
        assert!(from != to, "route must leave on a different arm");
        assert!(n_goals >= 1, "route needs at least one intermediate goal");

        let d_in = Self::arm_direction(from);
        let d_out = Self::arm_direction(to);

        let spawn_position = d_in * self.extent();
        let spawn_orientation = (-d_in).heading();
        let destination = d_out * self.extent();
        let dest_orientation = d_out.heading();

        // Waypoint polyline from the square entry to the destination.
        let polyline = [
            d_in * self.half_width(),
            Point::ZERO,
            d_out * self.half_width(),
            destination,
        ];
        let goals = sample_goals(&polyline, n_goals, speed);

        Route {
            road: Road::new(from),
            spawn_position,
            spawn_orientation,
            destination,
            dest_orientation,
            goals,
        }
    }
}

/// Place `n` goal states at even arc positions along `polyline`, ending at
/// its last vertex. The last goal targets zero speed.
fn sample_goals(polyline: &[Point], n: usize, speed: f32) -> Vec<GoalState> {
    let mut cumulative = vec![0.0f32];
    for i in 1..polyline.len() {
        let step = polyline[i].distance(&polyline[i - 1]);
        cumulative.push(cumulative[i - 1] + step);
    }
    let total = *cumulative.last().expect("polyline has vertices");

    let mut goals = Vec::with_capacity(n);
    for k in 1..=n {
        let s = total * k as f32 / n as f32;
        let i = cumulative
            .partition_point(|&c| c < s)
            .clamp(1, polyline.len() - 1);
        let lo = cumulative[i - 1];
        let hi = cumulative[i];
        let t = if hi > lo { (s - lo) / (hi - lo) } else { 1.0 };
        let a = polyline[i - 1];
        let b = polyline[i];
        goals.push(GoalState {
            position: a + (b - a) * t,
            speed: if k == n { 0.0 } else { speed },
            orientation: (b - a).heading(),
        });
    }
    goals
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_road_axes() {
        assert_eq!(Road::new(0).travel_axis(), 0);
        assert_eq!(Road::new(1).travel_axis(), 1);
        // Deviations are perpendicular to travel.
        assert_eq!(Road::new(0).deviation_axis(), 1);
        assert_eq!(Road::new(1).deviation_axis(), 0);
        assert_eq!(Road::new(2).deviation_axis(), 1);
        assert_eq!(Road::new(3).deviation_axis(), 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_road_index_out_of_range_panics() {
        Road::new(4);
    }

    #[test]
    fn test_layout_extents() {
        let layout = IntersectionLayout::new(40.0, 20.0);
        assert_eq!(layout.half_width(), 10.0);
        assert_eq!(layout.extent(), 50.0);
        assert!(layout.inside_square(Point::new(9.0, -9.0)));
        assert!(!layout.inside_square(Point::new(11.0, 0.0)));
    }

    #[test]
    fn test_straight_route_goals() {
        let layout = IntersectionLayout::new(40.0, 20.0);
        let route = layout.route(0, 2, 3, 8.0);

        assert_eq!(route.spawn_position, Point::new(50.0, 0.0));
        assert!((route.spawn_orientation - PI).abs() < 1e-5);
        assert_eq!(route.destination, Point::new(-50.0, 0.0));
        assert_eq!(route.goals.len(), 3);

        // Polyline (10,0) -> (0,0) -> (-10,0) -> (-50,0), goals at s = 20, 40, 60.
        assert!(route.goals[0].position.distance(&Point::new(-10.0, 0.0)) < 1e-4);
        assert!(route.goals[1].position.distance(&Point::new(-30.0, 0.0)) < 1e-4);
        assert!(route.goals[2].position.distance(&Point::new(-50.0, 0.0)) < 1e-4);
        assert_eq!(route.goals[2].speed, 0.0);
        assert!((route.straight_distance() - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_turning_route_ends_at_destination() {
        let layout = IntersectionLayout::default();
        let route = layout.route(0, 1, 4, 8.0);
        let last = route.goals.last().unwrap();
        assert!(last.position.distance(&route.destination) < 1e-4);
        assert!((route.dest_orientation - PI / 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_deviated_final_goal_leaves_square_on_one_axis() {
        // The trailing far-field anchor is computed from the last appended
        // waypoint, which must sit outside the square on exactly one axis
        // even at the largest catalog offset (0.75 * width / 2 per axis).
        let layout = IntersectionLayout::default();
        let max_offset = 0.75 * layout.width / 2.0;
        for to in [1, 2, 3] {
            let route = layout.route(0, to, 3, 8.0);
            let last = route.goals.last().unwrap().position;
            for (dx, dy) in [(max_offset, max_offset), (-max_offset, -max_offset)] {
                let deviated = last + Point::new(dx, dy);
                let x_out = deviated.x.abs() > layout.half_width();
                let y_out = deviated.y.abs() > layout.half_width();
                assert!(x_out != y_out, "deviated {deviated:?} must violate one axis");
            }
        }
    }
}
