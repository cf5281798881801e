//! The frozen low-level controller contract and simple implementations.

use std::sync::Mutex;

/// A frozen low-level acceleration policy, consumed by the spline
/// environment through inference calls only. Implementations keep no
/// mutable state across calls beyond their own internals.
pub trait AcclnController {
    /// Select a discrete acceleration index for the given observation.
    fn act(&self, obs: &[f32], deterministic: bool) -> usize;

    /// Human-readable name for logging.
    fn name(&self) -> String;
}

/// Controller that always selects the same acceleration index.
pub struct ConstantController {
    index: usize,
}

impl ConstantController {
    pub const fn new(index: usize) -> Self {
        Self { index }
    }
}

impl AcclnController for ConstantController {
    fn act(&self, _obs: &[f32], _deterministic: bool) -> usize {
        self.index
    }

    fn name(&self) -> String {
        "ConstantController".to_string()
    }
}

/// Controller replaying a fixed sequence of indices, cycling when
/// exhausted.
pub struct ScriptedController {
    actions: Vec<usize>,
    cursor: Mutex<usize>,
}

impl ScriptedController {
    /// # Panics
    ///
    /// Panics if `actions` is empty.
    pub fn new(actions: Vec<usize>) -> Self {
        assert!(
            !actions.is_empty(),
            "ScriptedController requires at least one action"
        );
        Self {
            actions,
            cursor: Mutex::new(0),
        }
    }
}

impl AcclnController for ScriptedController {
    fn act(&self, _obs: &[f32], _deterministic: bool) -> usize {
        let mut cursor = self.cursor.lock().unwrap();
        let action = self.actions[*cursor];
        *cursor = (*cursor + 1) % self.actions.len();
        action
    }

    fn name(&self) -> String {
        "ScriptedController".to_string()
    }
}
