//! Multi-agent intersection driving environments for training and
//! evaluating hierarchical driving policies.
//!
//! The crate is organised in layers:
//! - [`infra`]: geometry primitives, the Catmull-Rom spline, metrics
//! - [`state`]: the intersection layout, vehicle records and per-agent
//!   spline-following dynamics
//! - [`envs`]: the base acceleration-control environment and the
//!   hierarchical [`SplineEnv`] wrapper around it
//! - [`control`]: the frozen low-level controller contract and its
//!   implementations (neural policy behind the `rl` feature)

pub mod control;
pub mod envs;
pub mod infra;
pub mod state;

// Re-export commonly used types for convenience
pub use envs::{RoadIntersectionEnv, Scenario, SplineEnv, TrackStrategy};
pub use infra::Point;
pub use state::IntersectionLayout;
