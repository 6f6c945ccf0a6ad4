//! Occlusion / visibility mask generation.
//!
//! A mask is `(batch, joints, time, 1)` with 1 = visible, 0 = occluded. Modes
//! 1..3 broadcast one pattern across the batch; only noisy transmission draws
//! an independent value per cell.

use std::collections::BTreeSet;

use ndarray::{s, Array4};
use rand::distributions::{Bernoulli, Distribution};
use rand::Rng;

use motiongan_core::{Error, Result, Skeleton};

/// Masking regimes understood by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskMode {
    /// Everything visible.
    NoMask,
    /// Zero every frame from `floor(time * keep_prob)` onward.
    FuturePrediction,
    /// Zero a random set of joints across all frames and samples.
    OcclusionSimulation,
    /// Zero whole body members until the visible-joint budget is met.
    StructuredOcclusion,
    /// Independent Bernoulli(keep_prob) visibility per cell.
    NoisyTransmission,
}

impl MaskMode {
    pub const ALL: [MaskMode; 5] = [
        MaskMode::NoMask,
        MaskMode::FuturePrediction,
        MaskMode::OcclusionSimulation,
        MaskMode::StructuredOcclusion,
        MaskMode::NoisyTransmission,
    ];

    /// Resolve a wire-format index, rejecting anything outside `0..=4`.
    pub fn from_index(index: u8) -> Result<MaskMode> {
        MaskMode::ALL
            .get(index as usize)
            .copied()
            .ok_or(Error::InvalidMaskMode { mode: index })
    }

    /// Draw one of the five modes uniformly.
    pub fn sample<R: Rng>(rng: &mut R) -> MaskMode {
        MaskMode::ALL[rng.gen_range(0..MaskMode::ALL.len())]
    }

    /// Human-readable name used in render captions.
    pub fn as_str(&self) -> &'static str {
        match self {
            MaskMode::NoMask => "No mask",
            MaskMode::FuturePrediction => "Future Prediction",
            MaskMode::OcclusionSimulation => "Occlusion Simulation",
            MaskMode::StructuredOcclusion => "Structured Occlusion",
            MaskMode::NoisyTransmission => "Noisy Transmission",
        }
    }
}

/// Generates synthetic visibility masks for a fixed tensor shape.
#[derive(Debug, Clone)]
pub struct MaskGenerator {
    batch_size: usize,
    njoints: usize,
    seq_len: usize,
    members: Vec<Vec<usize>>,
    member_union: BTreeSet<usize>,
}

impl MaskGenerator {
    pub fn new(batch_size: usize, seq_len: usize, skeleton: &Skeleton) -> MaskGenerator {
        let members: Vec<Vec<usize>> = skeleton
            .members
            .values()
            .map(|m| m.joints.clone())
            .collect();
        let member_union = members.iter().flatten().copied().collect();
        MaskGenerator {
            batch_size,
            njoints: skeleton.njoints,
            seq_len,
            members,
            member_union,
        }
    }

    pub fn shape(&self) -> (usize, usize, usize, usize) {
        (self.batch_size, self.njoints, self.seq_len, 1)
    }

    /// Produce a mask for `mode` at the given keep probability.
    ///
    /// `keep_prob` outside `[0, 1]` is a contract violation and is rejected,
    /// not clamped.
    pub fn generate<R: Rng>(
        &self,
        mode: MaskMode,
        keep_prob: f32,
        rng: &mut R,
    ) -> Result<Array4<f32>> {
        if !(0.0..=1.0).contains(&keep_prob) || !keep_prob.is_finite() {
            return Err(Error::InvalidKeepProb { value: keep_prob });
        }

        let mut mask = Array4::<f32>::ones(self.shape());
        match mode {
            MaskMode::NoMask => {}
            MaskMode::FuturePrediction => {
                let cut = (self.seq_len as f32 * keep_prob).floor() as usize;
                mask.slice_mut(s![.., .., cut.., ..]).fill(0.0);
            }
            MaskMode::OcclusionSimulation => {
                // Joints are drawn with replacement, so duplicates collapse
                // and the realized occlusion count may fall short of the
                // request.
                let draws = (self.njoints as f32 * (1.0 - keep_prob)).floor() as usize;
                for _ in 0..draws {
                    let joint = rng.gen_range(0..self.njoints);
                    mask.slice_mut(s![.., joint, .., ..]).fill(0.0);
                }
            }
            MaskMode::StructuredOcclusion => {
                for &joint in &self.structured_occlusion(keep_prob, rng) {
                    mask.slice_mut(s![.., joint, .., ..]).fill(0.0);
                }
            }
            MaskMode::NoisyTransmission => {
                let bernoulli = Bernoulli::new(keep_prob as f64)
                    .map_err(|_| Error::InvalidKeepProb { value: keep_prob })?;
                mask.mapv_inplace(|_| if bernoulli.sample(rng) { 1.0 } else { 0.0 });
            }
        }
        Ok(mask)
    }

    /// Accumulate whole body members into an occlusion set until the number of
    /// still-visible joints drops to the keep budget.
    ///
    /// Terminates unconditionally: once the set covers every joint the member
    /// table can contribute, no further draw can make progress and the loop
    /// exits with whatever occlusion accumulated.
    fn structured_occlusion<R: Rng>(&self, keep_prob: f32, rng: &mut R) -> Vec<usize> {
        let target = self.njoints as f32 * keep_prob;
        let mut occluded: BTreeSet<usize> = BTreeSet::new();
        if self.members.is_empty() {
            return Vec::new();
        }
        while (self.njoints - occluded.len()) as f32 > target {
            if occluded.is_superset(&self.member_union) {
                tracing::debug!(
                    occluded = occluded.len(),
                    njoints = self.njoints,
                    keep_prob = keep_prob as f64,
                    "member table exhausted before reaching the keep budget"
                );
                break;
            }
            let member = &self.members[rng.gen_range(0..self.members.len())];
            occluded.extend(member.iter().copied());
        }
        occluded.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motiongan_core::SkeletonDataset;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generator() -> MaskGenerator {
        let skeleton = Skeleton::for_dataset(SkeletonDataset::Msrc12).unwrap();
        MaskGenerator::new(4, 16, &skeleton)
    }

    #[test]
    fn rejects_out_of_range_mode_index() {
        assert!(MaskMode::from_index(4).is_ok());
        assert!(matches!(
            MaskMode::from_index(5),
            Err(Error::InvalidMaskMode { mode: 5 })
        ));
    }

    #[test]
    fn rejects_out_of_range_keep_prob() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            gen.generate(MaskMode::NoMask, 1.5, &mut rng),
            Err(Error::InvalidKeepProb { .. })
        ));
        assert!(matches!(
            gen.generate(MaskMode::NoMask, -0.1, &mut rng),
            Err(Error::InvalidKeepProb { .. })
        ));
    }

    #[test]
    fn no_mask_is_all_ones() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(1);
        let mask = gen.generate(MaskMode::NoMask, 0.3, &mut rng).unwrap();
        assert!(mask.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn future_prediction_zeroes_exactly_the_tail() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(2);
        for &keep_prob in &[0.0, 0.25, 0.5, 0.8, 1.0] {
            let mask = gen
                .generate(MaskMode::FuturePrediction, keep_prob, &mut rng)
                .unwrap();
            let cut = (16.0 * keep_prob).floor() as usize;
            for ((_, _, t, _), &v) in mask.indexed_iter() {
                if t < cut {
                    assert_eq!(v, 1.0, "frame {t} before cut {cut} must stay visible");
                } else {
                    assert_eq!(v, 0.0, "frame {t} at/after cut {cut} must be occluded");
                }
            }
        }
    }

    #[test]
    fn occlusion_simulation_zeroes_whole_joints_uniformly() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(3);
        let mask = gen
            .generate(MaskMode::OcclusionSimulation, 0.5, &mut rng)
            .unwrap();
        // Each joint is either fully visible or fully occluded across the
        // batch and all frames.
        for j in 0..20usize {
            let column = mask.slice(s![.., j, .., ..]);
            let first = column[[0, 0, 0]];
            assert!(column.iter().all(|&v| v == first));
        }
        // Drawing with replacement: occluded count is at most the request.
        let occluded = (0..20)
            .filter(|&j| mask[[0, j, 0, 0]] == 0.0)
            .count();
        assert!(occluded <= 10, "at most floor(20 * 0.5) joints occluded");
        assert!(occluded > 0);
    }

    #[test]
    fn structured_occlusion_full_keep_prob_means_no_occlusion() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(4);
        let mask = gen
            .generate(MaskMode::StructuredOcclusion, 1.0, &mut rng)
            .unwrap();
        assert!(mask.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn structured_occlusion_terminates_and_meets_budget() {
        let gen = generator();
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            for &keep_prob in &[0.0, 0.1, 0.4, 0.7, 0.95, 0.999] {
                let occluded = gen.structured_occlusion(keep_prob, &mut rng);
                let visible = 20 - occluded.len();
                // Either the budget was met or the member table is exhausted.
                assert!(
                    visible as f32 <= 20.0 * keep_prob
                        || occluded.len() == gen.member_union.len()
                );
            }
        }
    }

    #[test]
    fn structured_occlusion_exhausted_members_still_terminate() {
        // A topology whose members cannot cover all joints: njoints is larger
        // than anything the table reaches.
        let skeleton = Skeleton::for_dataset(SkeletonDataset::Msrc12).unwrap();
        let mut gen = MaskGenerator::new(2, 8, &skeleton);
        gen.njoints = 64; // 44 joints unreachable by any member
        let mut rng = StdRng::seed_from_u64(9);
        // keep_prob 0 asks for zero visible joints, which is unattainable.
        let occluded = gen.structured_occlusion(0.0, &mut rng);
        assert_eq!(occluded.len(), gen.member_union.len());
    }

    #[test]
    fn noisy_transmission_matches_keep_prob_statistically() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(5);
        let keep_prob = 0.7;
        let mut visible = 0usize;
        let mut total = 0usize;
        for _ in 0..30 {
            let mask = gen
                .generate(MaskMode::NoisyTransmission, keep_prob, &mut rng)
                .unwrap();
            visible += mask.iter().filter(|&&v| v == 1.0).count();
            total += mask.len();
        }
        let rate = visible as f32 / total as f32;
        assert!(
            (rate - keep_prob).abs() < 0.02,
            "visible rate {rate} should approach {keep_prob}"
        );
    }

    #[test]
    fn noisy_transmission_varies_across_batch_and_time() {
        let gen = generator();
        let mut rng = StdRng::seed_from_u64(6);
        let mask = gen
            .generate(MaskMode::NoisyTransmission, 0.5, &mut rng)
            .unwrap();
        let first_sample = mask.slice(s![0, .., .., ..]).to_owned();
        let any_batch_variation = (1..4)
            .any(|b| mask.slice(s![b, .., .., ..]) != first_sample);
        assert!(any_batch_variation);
    }
}
