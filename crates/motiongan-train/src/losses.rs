//! Fixed loss records for both training phases.
//!
//! Discriminator and generator losses are separate record types merged by
//! explicit concatenation; their log names carry disjoint `disc/` and `gen/`
//! prefixes, so a merged record can never collide keys.

/// Critic-side losses for one update (or the mean over a sub-step group).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiscLosses {
    /// Wasserstein objective: `fake score − real score`.
    pub wgan: f64,
    /// Negated mean critic score on real sequences.
    pub real: f64,
    /// Mean critic score on generated sequences.
    pub fake: f64,
}

impl DiscLosses {
    pub fn accumulate(&mut self, other: &DiscLosses) {
        self.wgan += other.wgan;
        self.real += other.real;
        self.fake += other.fake;
    }

    /// Mean over `count` accumulated updates.
    pub fn mean(mut self, count: usize) -> DiscLosses {
        let n = count.max(1) as f64;
        self.wgan /= n;
        self.real /= n;
        self.fake /= n;
        self
    }
}

/// Generator-side losses for one update.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenLosses {
    /// Adversarial objective: negated mean critic score on generated output.
    pub wgan: f64,
    /// Reconstruction error on the occluded region.
    pub recon: f64,
}

impl GenLosses {
    pub fn accumulate(&mut self, other: &GenLosses) {
        self.wgan += other.wgan;
        self.recon += other.recon;
    }

    pub fn mean(mut self, count: usize) -> GenLosses {
        let n = count.max(1) as f64;
        self.wgan /= n;
        self.recon /= n;
        self
    }
}

/// One batch's merged log record: both phases, disjoint prefixes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchLosses {
    pub disc: DiscLosses,
    pub gen: GenLosses,
}

impl BatchLosses {
    pub fn new(disc: DiscLosses, gen: GenLosses) -> BatchLosses {
        BatchLosses { disc, gen }
    }

    /// Named fields for structured logging.
    pub fn fields(&self) -> [(&'static str, f64); 5] {
        [
            ("disc/wgan", self.disc.wgan),
            ("disc/real", self.disc.real),
            ("disc/fake", self.disc.fake),
            ("gen/wgan", self.gen.wgan),
            ("gen/recon", self.gen.recon),
        ]
    }
}

/// Running per-epoch sums of the headline losses, reset at epoch start.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpochAccumulator {
    disc_wgan_sum: f64,
    gen_wgan_sum: f64,
    batches: usize,
}

impl EpochAccumulator {
    pub fn record(&mut self, losses: &BatchLosses) {
        self.disc_wgan_sum += losses.disc.wgan;
        self.gen_wgan_sum += losses.gen.wgan;
        self.batches += 1;
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    /// Epoch-mean `(disc wgan, gen wgan)`.
    pub fn means(&self) -> (f64, f64) {
        let n = self.batches.max(1) as f64;
        (self.disc_wgan_sum / n, self.gen_wgan_sum / n)
    }

    pub fn reset(&mut self) {
        *self = EpochAccumulator::default();
    }
}

/// Supervised classifier metrics for one step or evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassifierLosses {
    pub cross_entropy: f64,
    pub accuracy: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disc_mean_over_substeps() {
        let mut acc = DiscLosses::default();
        for i in 1..=5 {
            acc.accumulate(&DiscLosses {
                wgan: i as f64,
                real: 2.0 * i as f64,
                fake: 0.5,
            });
        }
        let mean = acc.mean(5);
        assert!((mean.wgan - 3.0).abs() < 1e-12);
        assert!((mean.real - 6.0).abs() < 1e-12);
        assert!((mean.fake - 0.5).abs() < 1e-12);
    }

    #[test]
    fn merged_field_names_are_disjoint() {
        let merged = BatchLosses::new(DiscLosses::default(), GenLosses::default());
        let names: Vec<&str> = merged.fields().iter().map(|(n, _)| *n).collect();
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
        assert!(names.iter().all(|n| n.starts_with("disc/") || n.starts_with("gen/")));
    }

    #[test]
    fn epoch_accumulator_resets() {
        let mut acc = EpochAccumulator::default();
        acc.record(&BatchLosses::new(
            DiscLosses { wgan: 4.0, real: 0.0, fake: 0.0 },
            GenLosses { wgan: 2.0, recon: 0.0 },
        ));
        acc.record(&BatchLosses::new(
            DiscLosses { wgan: 2.0, real: 0.0, fake: 0.0 },
            GenLosses { wgan: 0.0, recon: 0.0 },
        ));
        assert_eq!(acc.means(), (3.0, 1.0));
        acc.reset();
        assert_eq!(acc.batches(), 0);
    }
}
