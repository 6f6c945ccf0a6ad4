//! Supervised classifier training path.
//!
//! The contrast case to the adversarial protocol: one network, one loss, no
//! masking. The augmentation stage still runs on every training batch; the
//! validation pass sees raw coordinates.

use rand::Rng;

use motiongan_core::{Result, RunMode};
use motiongan_data::{augment, BatchSource};

use crate::config::TrainConfig;
use crate::losses::ClassifierLosses;
use crate::model::ActionClassifier;
use crate::protocol::InterruptHandle;
use crate::schedule::staircase_lr;

/// Summary of one classifier run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ClassifierReport {
    pub epochs: usize,
    pub batches: usize,
    pub final_train: ClassifierLosses,
    pub final_val: ClassifierLosses,
    pub interrupted: bool,
}

/// Epoch/batch loop for a single supervised network.
pub struct ClassifierTrainer<C, S, R> {
    config: TrainConfig,
    model: C,
    source: S,
    rng: R,
    interrupt: InterruptHandle,
}

impl<C, S, R> ClassifierTrainer<C, S, R>
where
    C: ActionClassifier,
    S: BatchSource,
    R: Rng,
{
    pub fn new(config: TrainConfig, model: C, source: S, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(ClassifierTrainer {
            config,
            model,
            source,
            rng,
            interrupt: InterruptHandle::new(),
        })
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Replace the interrupt flag with an externally owned one.
    pub fn with_interrupt(mut self, handle: InterruptHandle) -> Self {
        self.interrupt = handle;
        self
    }

    pub fn run(&mut self) -> Result<ClassifierReport> {
        let train_batches = self.config.train_batches(self.source.train_epoch_size());
        let mut report = ClassifierReport::default();
        let weights_path = self.weights_path();
        if let Some(parent) = weights_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        for epoch in 0..self.config.num_epochs {
            if self.config.lr_decay {
                let rate = staircase_lr(self.config.learning_rate, epoch, self.config.num_epochs);
                self.model.update_lr(rate)?;
            }

            let mut epoch_losses = ClassifierLosses::default();
            for _ in 0..train_batches {
                if self.interrupt.is_triggered() {
                    self.model.save_weights(&weights_path)?;
                    report.interrupted = true;
                    return Ok(report);
                }
                let (labels, poses) = self.source.next_train()?;
                let (coords, _) = poses.split();
                let coords = augment(coords, RunMode::Train, &mut self.rng);
                let losses = self.model.train_step(&coords, &labels.actions()?)?;
                epoch_losses = losses;
                report.batches += 1;
            }

            let (labels, poses) = self.source.next_val()?;
            let (coords, _) = poses.split();
            let val = self.model.eval(&coords, &labels.actions()?)?;
            tracing::info!(
                epoch,
                train_loss = epoch_losses.cross_entropy,
                val_loss = val.cross_entropy,
                val_accuracy = val.accuracy,
                "classifier epoch complete"
            );

            self.model.save_weights(&weights_path)?;
            report.epochs += 1;
            report.final_train = epoch_losses;
            report.final_val = val;
        }
        Ok(report)
    }

    fn weights_path(&self) -> std::path::PathBuf {
        let mut name = self
            .config
            .save_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str("_dmnn_weights.safetensors");
        self.config.save_path.with_file_name(name)
    }
}
