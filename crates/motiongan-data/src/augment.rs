//! Training-time pose augmentation.
//!
//! Two randomized transforms over the coordinate channels, applied in order:
//! height jitter first, then simulated-occlusion jitter on its output. Both
//! are identity outside [`RunMode::Train`].

use ndarray::{s, Array4};
use rand::Rng;

use motiongan_core::RunMode;

/// Scale the z channel of each sample by an independent uniform draw in
/// `[0.7, 1.3)`. x and y are untouched.
pub fn jitter_height<R: Rng>(mut coords: Array4<f32>, rng: &mut R) -> Array4<f32> {
    let batch = coords.dim().0;
    for b in 0..batch {
        let scale: f32 = rng.gen_range(0.7..1.3);
        coords
            .slice_mut(s![b, .., .., 2..3])
            .mapv_inplace(|v| v * scale);
    }
    coords
}

/// Jitter every coordinate by an independent per-element factor in
/// `[0.8, 1.2)`, then keep the jittered version for a random half of the
/// batch (per-sample Bernoulli p = 0.5); the other half passes through
/// unchanged.
pub fn simulate_occlusions<R: Rng>(mut coords: Array4<f32>, rng: &mut R) -> Array4<f32> {
    let batch = coords.dim().0;
    for b in 0..batch {
        if rng.gen_bool(0.5) {
            coords
                .slice_mut(s![b, .., .., ..])
                .mapv_inplace(|v| v * rng.gen_range(0.8..1.2));
        }
    }
    coords
}

/// Full augmentation stage: height jitter then occlusion jitter, active only
/// in training mode.
pub fn augment<R: Rng>(coords: Array4<f32>, mode: RunMode, rng: &mut R) -> Array4<f32> {
    match mode {
        RunMode::Train => simulate_occlusions(jitter_height(coords, rng), rng),
        RunMode::Eval => coords,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn coords(batch: usize) -> Array4<f32> {
        Array4::from_shape_fn((batch, 4, 6, 3), |(b, j, t, c)| {
            1.0 + b as f32 + 0.1 * j as f32 + 0.01 * t as f32 + 0.5 * c as f32
        })
    }

    #[test]
    fn eval_mode_is_identity_for_any_seed() {
        let input = coords(3);
        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let output = augment(input.clone(), RunMode::Eval, &mut rng);
            assert_eq!(output, input);
        }
    }

    #[test]
    fn height_jitter_touches_only_z() {
        let input = coords(2);
        let mut rng = StdRng::seed_from_u64(7);
        let output = jitter_height(input.clone(), &mut rng);
        assert_eq!(
            output.slice(s![.., .., .., ..2]),
            input.slice(s![.., .., .., ..2])
        );
        assert_ne!(
            output.slice(s![.., .., .., 2..]),
            input.slice(s![.., .., .., 2..])
        );
    }

    #[test]
    fn height_jitter_uses_one_scalar_per_sample() {
        let input = coords(1);
        let mut rng = StdRng::seed_from_u64(11);
        let output = jitter_height(input.clone(), &mut rng);
        let ratios: Vec<f32> = output
            .slice(s![0, .., .., 2])
            .iter()
            .zip(input.slice(s![0, .., .., 2]).iter())
            .map(|(o, i)| o / i)
            .collect();
        let first = ratios[0];
        assert!((0.7..1.3).contains(&first));
        assert!(ratios.iter().all(|r| (r - first).abs() < 1e-5));
    }

    #[test]
    fn occlusion_jitter_leaves_unselected_samples_untouched() {
        let input = coords(32);
        let mut rng = StdRng::seed_from_u64(13);
        let output = simulate_occlusions(input.clone(), &mut rng);
        let mut untouched = 0usize;
        let mut jittered = 0usize;
        for b in 0..32 {
            if output.slice(s![b, .., .., ..]) == input.slice(s![b, .., .., ..]) {
                untouched += 1;
            } else {
                jittered += 1;
                for (o, i) in output
                    .slice(s![b, .., .., ..])
                    .iter()
                    .zip(input.slice(s![b, .., .., ..]).iter())
                {
                    let ratio = o / i;
                    assert!((0.8..1.2).contains(&ratio));
                }
            }
        }
        assert!(untouched > 0, "some samples should pass through");
        assert!(jittered > 0, "some samples should be jittered");
    }

    #[test]
    fn train_mode_composes_height_then_occlusion() {
        let input = coords(4);
        let mut rng_a = StdRng::seed_from_u64(17);
        let composed = augment(input.clone(), RunMode::Train, &mut rng_a);
        let mut rng_b = StdRng::seed_from_u64(17);
        let manual = simulate_occlusions(jitter_height(input, &mut rng_b), &mut rng_b);
        assert_eq!(composed, manual);
    }
}
