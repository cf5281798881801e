mod metrics;
mod spline;
mod types;

pub use metrics::{EpisodeMetrics, MovingAverage};
pub use spline::CatmullRomSpline;
pub use types::{Point, angle_normalize};
