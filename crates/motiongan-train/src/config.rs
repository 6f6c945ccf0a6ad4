//! Run configuration.
//!
//! [`TrainConfig`] is immutable for the lifetime of a run; the only mutable
//! training state lives in the cursor owned by the protocol. Loadable from a
//! file plus `MOTIONGAN_`-prefixed environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use motiongan_core::{Error, Result, SkeletonDataset};

/// Which training path a run drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    /// Adversarial motion-completion pair.
    Gan,
    /// Supervised distance-matrix action classifier.
    Dmnn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Which skeleton registry entry this run trains against.
    pub dataset: SkeletonDataset,

    pub model: ModelKind,

    pub batch_size: usize,

    /// Number of frames per sequence.
    pub seq_len: usize,

    pub num_epochs: usize,

    /// Multiplies the length of an epoch; useful for tiny datasets.
    pub epoch_factor: usize,

    pub learning_rate: f64,

    /// Enable the three-segment staircase decay.
    pub lr_decay: bool,

    /// Discriminator updates per generator update.
    pub disc_batches: usize,

    /// Width of the latent conditioning vector; 0 disables it.
    pub latent_dim: usize,

    /// Feed the action class to both sub-models.
    pub action_cond: bool,

    /// Apply jitter augmentation to adversarial training batches.
    pub augment: bool,

    /// Poses arrive normalized and must be denormalized before rendering.
    pub normalize_data: bool,

    /// Base path for checkpoint files; fixed suffixes are appended.
    pub save_path: PathBuf,

    /// Dropout rate for the classifier path.
    pub dropout: f32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            dataset: SkeletonDataset::Msrc12,
            model: ModelKind::Gan,
            batch_size: 32,
            seq_len: 20,
            num_epochs: 200,
            epoch_factor: 1,
            learning_rate: 1.0e-3,
            lr_decay: true,
            disc_batches: 5,
            latent_dim: 0,
            action_cond: false,
            augment: false,
            normalize_data: false,
            save_path: PathBuf::from("save/motiongan"),
            dropout: 0.5,
        }
    }
}

impl TrainConfig {
    /// Load from a config file, then apply `MOTIONGAN_*` environment
    /// overrides.
    pub fn from_file(path: &Path) -> Result<TrainConfig> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()))
            .add_source(config::Environment::with_prefix("MOTIONGAN"))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        let cfg: TrainConfig = settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Number of training batches per epoch given the source's epoch size.
    pub fn train_batches(&self, train_epoch_size: usize) -> usize {
        train_epoch_size * self.epoch_factor
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be > 0".into()));
        }
        if self.seq_len == 0 {
            return Err(Error::Config("seq_len must be > 0".into()));
        }
        if self.num_epochs == 0 {
            return Err(Error::Config("num_epochs must be > 0".into()));
        }
        if self.epoch_factor == 0 {
            return Err(Error::Config("epoch_factor must be >= 1".into()));
        }
        if self.learning_rate <= 0.0 {
            return Err(Error::Config("learning_rate must be > 0".into()));
        }
        if self.disc_batches == 0 {
            return Err(Error::Config("disc_batches must be >= 1".into()));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(Error::Config("dropout must be in [0, 1)".into()));
        }
        Ok(())
    }
}
