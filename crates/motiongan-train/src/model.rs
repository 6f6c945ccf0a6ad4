//! Model contracts.
//!
//! The protocol never sees network internals, only these traits. Reference
//! implementations live in `motiongan-model`; tests drive the protocol with
//! lightweight stubs.

use std::path::Path;

use ndarray::{Array3, Array4};

use motiongan_core::Result;
use motiongan_data::AssembledBatch;

use crate::losses::{ClassifierLosses, DiscLosses, GenLosses};

/// Evaluation output of the generator side: losses plus the generated
/// sequence, and optionally a learned embedding for rendering.
pub struct GenEval {
    pub losses: GenLosses,
    /// Generated coordinates `(batch, joints, time, 3)`.
    pub generated: Array4<f32>,
    /// Optional embedding `(batch, height, width)`.
    pub embedding: Option<Array3<f32>>,
}

/// The adversarial pair as one unit: a critic and a generator trained in
/// alternation.
pub trait AdversarialModel {
    /// One critic gradient update; returns that update's losses.
    fn disc_train(&mut self, batch: &AssembledBatch) -> Result<DiscLosses>;

    /// One generator gradient update.
    fn gen_train(&mut self, batch: &AssembledBatch) -> Result<GenLosses>;

    /// Critic losses without any weight update.
    fn disc_eval(&mut self, batch: &AssembledBatch) -> Result<DiscLosses>;

    /// Generator losses and output without any weight update.
    fn gen_eval(&mut self, batch: &AssembledBatch) -> Result<GenEval>;

    /// Set the learning rate on every adjustable sub-model.
    fn update_lr(&mut self, rate: f64) -> Result<()>;

    /// Persist both weight sets.
    fn save_weights(&self, disc_path: &Path, gen_path: &Path) -> Result<()>;

    /// Restore both weight sets.
    fn load_weights(&mut self, disc_path: &Path, gen_path: &Path) -> Result<()>;
}

/// Single-network supervised action classifier.
pub trait ActionClassifier {
    /// One gradient update on `(poses, sparse labels)`.
    fn train_step(
        &mut self,
        poses: &Array4<f32>,
        actions: &ndarray::Array1<u32>,
    ) -> Result<ClassifierLosses>;

    /// Metrics without a weight update.
    fn eval(
        &mut self,
        poses: &Array4<f32>,
        actions: &ndarray::Array1<u32>,
    ) -> Result<ClassifierLosses>;

    fn update_lr(&mut self, rate: f64) -> Result<()>;

    fn save_weights(&self, path: &Path) -> Result<()>;
}
