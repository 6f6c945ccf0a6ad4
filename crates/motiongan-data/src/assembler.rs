//! Batch assembly: from a raw `(labels, poses)` pair to model-ready inputs.
//!
//! Each call draws a fresh mask mode, so a single assembled batch never mixes
//! two masking regimes. The keep probability follows a linear decay over
//! training: near-full visibility at epoch 0, drifting toward heavier
//! occlusion as training proceeds.

use ndarray::{Array1, Array2, Array4};
use rand::Rng;

use motiongan_core::{Error, LabelBatch, PoseBatch, Result, RunMode, Skeleton};

use crate::augment::augment;
use crate::mask::{MaskGenerator, MaskMode};

/// Linear occlusion schedule: `0.8 - 0.6 * epoch / num_epochs`.
pub fn occlusion_keep_prob(epoch: usize, num_epochs: usize) -> f32 {
    0.8 - 0.6 * epoch as f32 / num_epochs.max(1) as f32
}

/// Static assembly configuration, fixed for a whole run.
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    pub batch_size: usize,
    pub seq_len: usize,
    pub num_epochs: usize,
    /// Width of the latent conditioning vector; 0 disables latent noise.
    pub latent_dim: usize,
    /// Append the action-class column to the discriminator inputs.
    pub action_cond: bool,
    /// Apply the augmentation stage to training batches before masking.
    pub augment: bool,
}

/// A fully assembled batch ready for either sub-model.
///
/// The generator consumes `[real, mask]` (+ latent when present); the
/// discriminator prepends the real sequence and appends the action column
/// when conditioning is on.
#[derive(Debug, Clone)]
pub struct AssembledBatch {
    /// Coordinate channels, `(batch, joints, time, 3)`.
    pub real: Array4<f32>,
    /// Final visibility mask, `(batch, joints, time, 1)`:
    /// transmission flag AND synthetic mask.
    pub mask: Array4<f32>,
    /// Uniform `[0, 1)` latent noise, `(batch, latent_dim)`.
    pub latent: Option<Array2<f32>>,
    /// Action-class conditioning column.
    pub actions: Option<Array1<u32>>,
    /// The mode this batch was masked with.
    pub mode: MaskMode,
    pub keep_prob: f32,
}

pub struct BatchAssembler {
    config: AssemblerConfig,
    njoints: usize,
    mask_gen: MaskGenerator,
}

impl BatchAssembler {
    pub fn new(config: AssemblerConfig, skeleton: &Skeleton) -> BatchAssembler {
        let mask_gen = MaskGenerator::new(config.batch_size, config.seq_len, skeleton);
        BatchAssembler {
            config,
            njoints: skeleton.njoints,
            mask_gen,
        }
    }

    /// Assemble one batch, drawing a fresh mask mode and computing the
    /// epoch-scheduled keep probability.
    pub fn assemble<R: Rng>(
        &self,
        labels: &LabelBatch,
        poses: &PoseBatch,
        epoch: usize,
        run_mode: RunMode,
        rng: &mut R,
    ) -> Result<AssembledBatch> {
        let mode = MaskMode::sample(rng);
        self.assemble_with_mode(labels, poses, epoch, run_mode, mode, rng)
    }

    /// Assemble with an explicit mode (used by deterministic validation
    /// renders and tests).
    pub fn assemble_with_mode<R: Rng>(
        &self,
        labels: &LabelBatch,
        poses: &PoseBatch,
        epoch: usize,
        run_mode: RunMode,
        mode: MaskMode,
        rng: &mut R,
    ) -> Result<AssembledBatch> {
        self.check_shape(poses)?;
        let keep_prob = occlusion_keep_prob(epoch, self.config.num_epochs);

        let (mut coords, transmission) = poses.split();
        if self.config.augment {
            coords = augment(coords, run_mode, rng);
        }

        let synthetic = self.mask_gen.generate(mode, keep_prob, rng)?;
        let mask = &transmission * &synthetic;

        let latent = (self.config.latent_dim > 0).then(|| {
            Array2::from_shape_fn((self.config.batch_size, self.config.latent_dim), |_| {
                rng.gen::<f32>()
            })
        });

        let actions = if self.config.action_cond {
            Some(labels.actions()?)
        } else {
            None
        };

        Ok(AssembledBatch {
            real: coords,
            mask,
            latent,
            actions,
            mode,
            keep_prob,
        })
    }

    fn check_shape(&self, poses: &PoseBatch) -> Result<()> {
        let expected = [
            self.config.batch_size,
            self.njoints,
            self.config.seq_len,
            motiongan_core::POSE_CHANNELS,
        ];
        if poses.data().shape() != expected {
            return Err(Error::shape_mismatch(&expected, poses.data().shape()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motiongan_core::{ActionLabel, SkeletonDataset};
    use ndarray::s;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixture(latent_dim: usize, action_cond: bool) -> (BatchAssembler, LabelBatch, PoseBatch) {
        let skeleton = Skeleton::for_dataset(SkeletonDataset::Msrc12).unwrap();
        let config = AssemblerConfig {
            batch_size: 3,
            seq_len: 12,
            num_epochs: 10,
            latent_dim,
            action_cond,
            augment: false,
        };
        let assembler = BatchAssembler::new(config, &skeleton);

        let mut data = Array4::from_shape_fn((3, 20, 12, 4), |(b, j, t, c)| {
            0.1 * (b + j + t + c) as f32
        });
        // Transmission flag: drop one joint-frame, keep the rest.
        data.slice_mut(s![.., .., .., 3..]).fill(1.0);
        data[[0, 5, 3, 3]] = 0.0;
        let poses = PoseBatch::new(data).unwrap();

        let labels = LabelBatch::Single(
            (0..3)
                .map(|i| ActionLabel {
                    sequence: i,
                    subject: i,
                    action: i % 12,
                    length: 12,
                })
                .collect(),
        );
        (assembler, labels, poses)
    }

    #[test]
    fn keep_prob_decays_linearly() {
        assert!((occlusion_keep_prob(0, 10) - 0.8).abs() < 1e-6);
        assert!((occlusion_keep_prob(5, 10) - 0.5).abs() < 1e-6);
        assert!((occlusion_keep_prob(10, 10) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn final_mask_never_exceeds_either_input() {
        let (assembler, labels, poses) = fixture(0, false);
        let (_, transmission) = poses.split();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let batch = assembler
                .assemble(&labels, &poses, 2, RunMode::Train, &mut rng)
                .unwrap();
            let mut check = StdRng::seed_from_u64(seed);
            let mode = MaskMode::sample(&mut check);
            assert_eq!(batch.mode, mode);
            for (m, t) in batch.mask.iter().zip(transmission.iter()) {
                assert!(m <= t, "final mask must be ≤ transmission flag");
                assert!(*m == 0.0 || *m == 1.0);
            }
        }
    }

    #[test]
    fn transmission_zero_stays_zero_through_assembly() {
        let (assembler, labels, poses) = fixture(0, false);
        let mut rng = StdRng::seed_from_u64(3);
        let batch = assembler
            .assemble_with_mode(&labels, &poses, 0, RunMode::Train, MaskMode::NoMask, &mut rng)
            .unwrap();
        assert_eq!(batch.mask[[0, 5, 3, 0]], 0.0);
    }

    #[test]
    fn latent_noise_has_configured_width_and_range() {
        let (assembler, labels, poses) = fixture(8, false);
        let mut rng = StdRng::seed_from_u64(4);
        let batch = assembler
            .assemble(&labels, &poses, 0, RunMode::Train, &mut rng)
            .unwrap();
        let latent = batch.latent.expect("latent conditioning enabled");
        assert_eq!(latent.dim(), (3, 8));
        assert!(latent.iter().all(|&v| (0.0..1.0).contains(&v)));
        assert!(batch.actions.is_none());
    }

    #[test]
    fn action_conditioning_passes_class_column() {
        let (assembler, labels, poses) = fixture(0, true);
        let mut rng = StdRng::seed_from_u64(5);
        let batch = assembler
            .assemble(&labels, &poses, 0, RunMode::Train, &mut rng)
            .unwrap();
        assert_eq!(batch.actions.unwrap().to_vec(), vec![0, 1, 2]);
        assert!(batch.latent.is_none());
    }

    #[test]
    fn wrong_pose_shape_is_fatal() {
        let (assembler, labels, _) = fixture(0, false);
        let mut bad = Array4::<f32>::zeros((3, 20, 9, 4));
        bad.slice_mut(s![.., .., .., 3..]).fill(1.0);
        let poses = PoseBatch::new(bad).unwrap();
        let mut rng = StdRng::seed_from_u64(6);
        assert!(matches!(
            assembler.assemble(&labels, &poses, 0, RunMode::Train, &mut rng),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
