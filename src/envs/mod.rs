//! Environments: gym-style step/reset interfaces over the intersection
//! world.

mod base;
mod spaces;
mod spline;

pub use base::{
    Agent, BaseStep, DoneFlags, EnvConfig, LOW_LEVEL_OBS_DIM, RoadIntersectionEnv, Scenario,
    VehicleSpawn, accln_actions,
};
pub use spaces::{ActionSpace, BoxSpace};
pub use spline::{
    SplineEnv, StepInfo, StepResult, TrackState, TrackStrategy, TransformedAction, dummy_point,
};
