//! Observation and action space descriptors.

use rand::Rng;

/// Box-bounded observation space.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSpace {
    pub low: Vec<f32>,
    pub high: Vec<f32>,
}

impl BoxSpace {
    pub fn new(low: Vec<f32>, high: Vec<f32>) -> Self {
        assert_eq!(low.len(), high.len(), "box bounds must have equal length");
        Self { low, high }
    }

    pub fn dim(&self) -> usize {
        self.low.len()
    }

    pub fn contains(&self, obs: &[f32]) -> bool {
        obs.len() == self.dim()
            && obs
                .iter()
                .zip(self.low.iter().zip(self.high.iter()))
                .all(|(&v, (&lo, &hi))| v >= lo && v <= hi)
    }
}

/// Action space exposed to the high-level caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSpace {
    Discrete { n: usize },
}

impl ActionSpace {
    pub fn size(&self) -> usize {
        match self {
            ActionSpace::Discrete { n } => *n,
        }
    }

    pub fn contains(&self, action: usize) -> bool {
        match self {
            ActionSpace::Discrete { n } => action < *n,
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> usize {
        match self {
            ActionSpace::Discrete { n } => rng.random_range(0..*n),
        }
    }
}
