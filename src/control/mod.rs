//! Low-level control: the frozen acceleration policy contract and its
//! implementations.

mod controller;
// Burn-dependent policy (enabled with --features rl)
#[cfg(feature = "rl")]
mod policy;

pub use controller::{AcclnController, ConstantController, ScriptedController};
#[cfg(feature = "rl")]
pub use policy::{AcclnPolicy, Actor, CheckpointMeta, PolicyError};
