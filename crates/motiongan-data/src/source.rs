//! Batch-source contract and a deterministic synthetic source.
//!
//! Real dataset loaders live outside this workspace; the training protocol
//! only ever sees this trait. The synthetic source generates smooth
//! sinusoidal "walkers" and is used by the CLI demo path and the test suite.

use ndarray::{s, Array4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use motiongan_core::{ActionLabel, LabelBatch, PoseBatch, Result};

/// A pull-based provider of `(labels, poses)` batches.
///
/// Each pull is synchronous and may block; exhaustion or a malformed batch is
/// fatal to the epoch and surfaces as an error, never as a silent skip.
pub trait BatchSource {
    /// Number of training batches that constitute one epoch.
    fn train_epoch_size(&self) -> usize;

    /// Number of held-out validation batches available per epoch.
    fn val_epoch_size(&self) -> usize;

    fn next_train(&mut self) -> Result<(LabelBatch, PoseBatch)>;

    fn next_val(&mut self) -> Result<(LabelBatch, PoseBatch)>;

    /// Undo dataset normalization for rendering. Identity by default.
    fn denormalize(&self, poses: &Array4<f32>) -> Array4<f32> {
        poses.clone()
    }
}

/// Configuration for [`SyntheticSource`].
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub batch_size: usize,
    pub njoints: usize,
    pub seq_len: usize,
    pub num_actions: usize,
    pub train_batches: usize,
    pub val_batches: usize,
    pub seed: u64,
    /// Probability that a joint-frame is flagged as unobserved by the sensor.
    pub dropout_rate: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        SyntheticConfig {
            batch_size: 8,
            njoints: 20,
            seq_len: 16,
            num_actions: 12,
            train_batches: 4,
            val_batches: 1,
            seed: 42,
            dropout_rate: 0.05,
        }
    }
}

/// Deterministic in-memory batch source.
///
/// Poses are sinusoidal trajectories parameterized by the action class, so a
/// classifier has real signal to learn; the transmission flag simulates
/// sensor dropout at a configurable rate.
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    sequence: u32,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> SyntheticSource {
        let rng = StdRng::seed_from_u64(config.seed);
        SyntheticSource {
            config,
            rng,
            sequence: 0,
        }
    }

    fn next_batch(&mut self) -> Result<(LabelBatch, PoseBatch)> {
        let c = &self.config;
        let mut labels = Vec::with_capacity(c.batch_size);
        let mut data = Array4::<f32>::zeros((c.batch_size, c.njoints, c.seq_len, 4));

        for b in 0..c.batch_size {
            let action = self.rng.gen_range(0..c.num_actions as u32);
            let subject = self.rng.gen_range(0..8u32);
            let phase: f32 = self.rng.gen_range(0.0..std::f32::consts::TAU);
            labels.push(ActionLabel {
                sequence: self.sequence,
                subject,
                action,
                length: c.seq_len as u32,
            });
            self.sequence = self.sequence.wrapping_add(1);

            let speed = 0.2 + 0.05 * action as f32;
            for j in 0..c.njoints {
                let offset = j as f32 * 0.3;
                for t in 0..c.seq_len {
                    let angle = phase + speed * t as f32 + offset;
                    data[[b, j, t, 0]] = angle.cos();
                    data[[b, j, t, 1]] = 0.05 * t as f32;
                    data[[b, j, t, 2]] = 1.0 + angle.sin() * 0.5;
                }
            }
        }

        let mut flags = data.slice_mut(s![.., .., .., 3..]);
        let dropout = self.config.dropout_rate;
        flags.mapv_inplace(|_| if self.rng.gen_bool(dropout) { 0.0 } else { 1.0 });

        Ok((LabelBatch::Single(labels), PoseBatch::new(data)?))
    }
}

impl BatchSource for SyntheticSource {
    fn train_epoch_size(&self) -> usize {
        self.config.train_batches
    }

    fn val_epoch_size(&self) -> usize {
        self.config.val_batches
    }

    fn next_train(&mut self) -> Result<(LabelBatch, PoseBatch)> {
        self.next_batch()
    }

    fn next_val(&mut self) -> Result<(LabelBatch, PoseBatch)> {
        self.next_batch()
    }
}
