//! Frozen low-level acceleration policy backed by a Burn checkpoint.
//!
//! The checkpoint directory holds `meta.json` (network dimensions plus the
//! model kind, `"centralized_critic"` or `"decentralized"`; only the actor
//! is consumed here) and `actor.mpk` with the named-MPK weights.

use std::path::{Path, PathBuf};

use burn::config::Config;
use burn::module::Module;
use burn::nn::{Linear, LinearConfig, Relu};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, RecorderError};
use burn::tensor::activation::softmax;
use burn::tensor::backend::Backend;
use thiserror::Error;

use super::controller::AcclnController;

/// Checkpoint metadata stored next to the actor weights.
#[derive(Debug, Config)]
pub struct CheckpointMeta {
    /// "centralized_critic" or "decentralized".
    pub model: String,
    /// Observation dimension the actor was trained on.
    pub obs_dim: usize,
    /// Hidden layer size.
    pub hidden_size: usize,
    /// Number of hidden layers.
    pub num_layers: usize,
    /// Size of the acceleration catalog.
    pub num_actions: usize,
}

/// Errors that can occur when loading or saving a policy checkpoint.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Checkpoint metadata missing, unparsable or unwritable.
    #[error("checkpoint metadata error at {path}: {message}")]
    Meta {
        /// Path that was attempted.
        path: PathBuf,
        /// Description of the underlying failure.
        message: String,
    },
    /// Actor weights missing or incompatible.
    #[error("actor weights error at {path}: {source}")]
    Weights {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying recorder error.
        source: RecorderError,
    },
}

/// Actor network: observation to logits over the acceleration catalog.
#[derive(Module, Debug)]
pub struct Actor<B: Backend> {
    input: Linear<B>,
    hidden: Vec<Linear<B>>,
    output: Linear<B>,
    activation: Relu,
}

impl<B: Backend> Actor<B> {
    pub fn new(device: &B::Device, meta: &CheckpointMeta) -> Self {
        let input = LinearConfig::new(meta.obs_dim, meta.hidden_size).init(device);

        let mut hidden = Vec::new();
        for _ in 0..meta.num_layers.saturating_sub(1) {
            hidden.push(LinearConfig::new(meta.hidden_size, meta.hidden_size).init(device));
        }

        let output = LinearConfig::new(meta.hidden_size, meta.num_actions).init(device);

        Self {
            input,
            hidden,
            output,
            activation: Relu::new(),
        }
    }

    /// Forward pass returning raw logits.
    pub fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut x = self.activation.forward(self.input.forward(obs));
        for layer in &self.hidden {
            x = self.activation.forward(layer.forward(x));
        }
        self.output.forward(x)
    }
}

/// Frozen policy implementing [`AcclnController`].
pub struct AcclnPolicy<B: Backend> {
    actor: Actor<B>,
    meta: CheckpointMeta,
    device: B::Device,
    centralized: bool,
}

impl<B: Backend> AcclnPolicy<B> {
    /// Load a policy from a checkpoint directory.
    pub fn load(device: B::Device, dir: &Path) -> Result<Self, PolicyError> {
        let meta_path = dir.join("meta.json");
        let meta =
            CheckpointMeta::load(&meta_path).map_err(|e| PolicyError::Meta {
                path: meta_path.clone(),
                message: e.to_string(),
            })?;
        let centralized = meta.model == "centralized_critic";

        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let weights_path = dir.join("actor");
        let actor = Actor::new(&device, &meta)
            .load_file(weights_path.clone(), &recorder, &device)
            .map_err(|source| PolicyError::Weights {
                path: weights_path,
                source,
            })?;

        tracing::info!(
            "loaded accln policy ({}) from {}",
            meta.model,
            dir.display()
        );
        Ok(Self {
            actor,
            meta,
            device,
            centralized,
        })
    }

    /// Build a policy from freshly initialized weights; useful for tests
    /// and for exporting checkpoints.
    pub fn from_meta(device: B::Device, meta: CheckpointMeta) -> Self {
        let centralized = meta.model == "centralized_critic";
        let actor = Actor::new(&device, &meta);
        Self {
            actor,
            meta,
            device,
            centralized,
        }
    }

    /// Whether the checkpoint was trained with a centralized critic.
    pub fn centralized(&self) -> bool {
        self.centralized
    }

    /// Save the actor weights and metadata to a checkpoint directory.
    pub fn save(&self, dir: &Path) -> Result<(), PolicyError> {
        let meta_path = dir.join("meta.json");
        self.meta
            .save(&meta_path)
            .map_err(|e| PolicyError::Meta {
                path: meta_path,
                message: e.to_string(),
            })?;
        let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
        let weights_path = dir.join("actor");
        self.actor
            .clone()
            .save_file(weights_path.clone(), &recorder)
            .map_err(|source| PolicyError::Weights {
                path: weights_path,
                source,
            })?;
        Ok(())
    }

    fn logits(&self, obs: &[f32]) -> Tensor<B, 2> {
        let tensor = Tensor::<B, 1>::from_floats(obs, &self.device).reshape([1, obs.len()]);
        self.actor.forward(tensor)
    }
}

impl<B: Backend> AcclnController for AcclnPolicy<B> {
    fn act(&self, obs: &[f32], deterministic: bool) -> usize {
        assert_eq!(
            obs.len(),
            self.meta.obs_dim,
            "observation dimension mismatch: policy expects {}, got {}",
            self.meta.obs_dim,
            obs.len()
        );
        let logits = self.logits(obs);
        let index: Tensor<B, 2, Int> = if deterministic {
            logits.argmax(1)
        } else {
            // Gumbel-max sampling from the categorical distribution.
            let probs = softmax(logits, 1);
            let uniform = Tensor::<B, 2>::random(
                probs.shape(),
                burn::tensor::Distribution::Uniform(0.0, 1.0),
                &probs.device(),
            );
            let gumbel = -(-uniform.log()).log();
            (probs.log() + gumbel).argmax(1)
        };
        let values: Vec<i64> = index.into_data().to_vec().unwrap();
        values[0] as usize
    }

    fn name(&self) -> String {
        format!("AcclnPolicy({})", self.meta.model)
    }
}
