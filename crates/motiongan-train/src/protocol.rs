//! The adversarial training protocol.
//!
//! One synchronous state machine drives the whole run:
//!
//! ```text
//! Initializing
//!   → EpochLoop { BatchLoop { DiscPhase → GenPhase } → ValidationPhase → Checkpoint }
//!   → Terminated
//! ```
//!
//! Every batch runs `disc_batches` critic updates before exactly one
//! generator update, each sub-step on a freshly drawn batch and mask regime.
//! The cursor is protocol-owned, advanced once per completed batch and epoch,
//! and persisted at every Checkpoint. Interruption is cooperative: the flag
//! is observed at batch boundaries and the interrupt path still reaches
//! Checkpoint before returning.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::{s, Array4};
use rand::Rng;

use motiongan_core::{LabelBatch, Result, RunMode, Skeleton, TrainingCursor};
use motiongan_data::{AssembledBatch, AssemblerConfig, BatchAssembler, BatchSource};

use crate::checkpoint::Checkpointer;
use crate::config::TrainConfig;
use crate::losses::{BatchLosses, DiscLosses, EpochAccumulator};
use crate::model::{AdversarialModel, GenEval};
use crate::schedule::staircase_lr;
use crate::viz::{RenderRequest, VizSink};

/// Samples rendered from the validation batch per visualization epoch.
const RENDER_SAMPLES: usize = 16;

/// Shared cooperative-cancellation flag.
///
/// Cloned into whatever wants to request a stop (a Ctrl-C handler, a test);
/// the trainer observes it at batch boundaries.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn new() -> InterruptHandle {
        InterruptHandle::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Summary of one `run()` invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainReport {
    pub epochs: usize,
    pub batches: usize,
    pub validations: usize,
    pub checkpoints: usize,
    pub interrupted: bool,
    pub final_cursor: TrainingCursor,
}

/// Orchestrates adversarial training of `M` over batches from `S`, rendering
/// qualitative samples into `V`.
pub struct AdversarialTrainer<M, S, V, R> {
    config: TrainConfig,
    skeleton: Skeleton,
    model: M,
    source: S,
    sink: V,
    rng: R,
    assembler: BatchAssembler,
    checkpointer: Checkpointer,
    cursor: TrainingCursor,
    interrupt: InterruptHandle,
}

impl<M, S, V, R> AdversarialTrainer<M, S, V, R>
where
    M: AdversarialModel,
    S: BatchSource,
    V: VizSink,
    R: Rng,
{
    pub fn new(config: TrainConfig, model: M, source: S, sink: V, rng: R) -> Result<Self> {
        config.validate()?;
        let skeleton = Skeleton::for_dataset(config.dataset)?;
        let assembler = BatchAssembler::new(
            AssemblerConfig {
                batch_size: config.batch_size,
                seq_len: config.seq_len,
                num_epochs: config.num_epochs,
                latent_dim: config.latent_dim,
                action_cond: config.action_cond,
                augment: config.augment,
            },
            &skeleton,
        );
        let checkpointer = Checkpointer::new(config.save_path.clone());
        Ok(AdversarialTrainer {
            config,
            skeleton,
            model,
            source,
            sink,
            rng,
            assembler,
            checkpointer,
            cursor: TrainingCursor::default(),
            interrupt: InterruptHandle::new(),
        })
    }

    /// Handle for requesting a cooperative stop.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Replace the interrupt flag with an externally owned one, e.g. a flag
    /// already wired to a signal handler.
    pub fn with_interrupt(mut self, handle: InterruptHandle) -> Self {
        self.interrupt = handle;
        self
    }

    pub fn cursor(&self) -> TrainingCursor {
        self.cursor
    }

    /// Drive the state machine to Terminated (or to the interrupt path).
    pub fn run(&mut self) -> Result<TrainReport> {
        self.initialize()?;

        let train_batches = self.config.train_batches(self.source.train_epoch_size());
        let mut report = TrainReport::default();
        let start_epoch = self.cursor.epoch;

        for epoch in start_epoch..self.config.num_epochs {
            if self.config.lr_decay {
                let rate = staircase_lr(self.config.learning_rate, epoch, self.config.num_epochs);
                self.model.update_lr(rate)?;
                tracing::info!(epoch, rate, "learning rate set");
            }

            let mut epoch_acc = EpochAccumulator::default();
            let first_batch = if epoch == start_epoch { self.cursor.batch } else { 0 };

            for batch in first_batch..train_batches {
                if self.interrupt.is_triggered() {
                    return self.interrupted_exit(report);
                }
                let losses = self.train_batch(epoch)?;
                epoch_acc.record(&losses);
                report.batches += 1;
                self.cursor = TrainingCursor { epoch, batch: batch + 1 };
            }

            let (labels, assembled, _disc_eval, gen_eval) = self.validation_phase(epoch)?;
            report.validations += 1;

            if self.render_due(epoch) {
                self.render_samples(epoch, &labels, &assembled, &gen_eval);
            }

            self.cursor = TrainingCursor { epoch: epoch + 1, batch: 0 };
            self.checkpointer.save(&self.model, self.cursor)?;
            report.checkpoints += 1;
            report.epochs += 1;

            let (disc_mean, gen_mean) = epoch_acc.means();
            tracing::info!(
                epoch,
                disc_loss = disc_mean,
                gen_loss = gen_mean,
                batches = epoch_acc.batches(),
                "epoch complete"
            );
        }

        report.final_cursor = self.cursor;
        Ok(report)
    }

    /// Restore the persisted cursor and weights when a prior checkpoint
    /// exists; otherwise start from `(0, 0)`.
    fn initialize(&mut self) -> Result<()> {
        if let Some(record) = self.checkpointer.load_cursor()? {
            if record.cursor.epoch > 0 || record.cursor.batch > 0 {
                self.checkpointer.restore(&mut self.model)?;
                self.cursor = record.cursor;
                tracing::info!(
                    epoch = record.cursor.epoch,
                    batch = record.cursor.batch,
                    saved_at = %record.saved_at,
                    "resumed from checkpoint"
                );
            }
        }
        Ok(())
    }

    /// DiscPhase then GenPhase for one batch position.
    fn train_batch(&mut self, epoch: usize) -> Result<BatchLosses> {
        let mut acc = DiscLosses::default();
        for _ in 0..self.config.disc_batches {
            let (labels, poses) = self.source.next_train()?;
            let assembled =
                self.assembler
                    .assemble(&labels, &poses, epoch, RunMode::Train, &mut self.rng)?;
            acc.accumulate(&self.model.disc_train(&assembled)?);
        }
        let disc = acc.mean(self.config.disc_batches);

        let (labels, poses) = self.source.next_train()?;
        let assembled =
            self.assembler
                .assemble(&labels, &poses, epoch, RunMode::Train, &mut self.rng)?;
        let gen = self.model.gen_train(&assembled)?;

        let merged = BatchLosses::new(disc, gen);
        for (name, value) in merged.fields() {
            tracing::trace!(name, value, "batch loss");
        }
        Ok(merged)
    }

    /// One held-out batch, masking only (no augmentation), no weight updates.
    fn validation_phase(
        &mut self,
        epoch: usize,
    ) -> Result<(LabelBatch, AssembledBatch, DiscLosses, GenEval)> {
        let (labels, poses) = self.source.next_val()?;
        let assembled =
            self.assembler
                .assemble(&labels, &poses, epoch, RunMode::Eval, &mut self.rng)?;
        let disc = self.model.disc_eval(&assembled)?;
        let gen = self.model.gen_eval(&assembled)?;
        tracing::info!(
            epoch,
            disc_loss = disc.wgan,
            gen_loss = gen.losses.wgan,
            mask_mode = assembled.mode.as_str(),
            "validation"
        );
        Ok((labels, assembled, disc, gen))
    }

    fn render_due(&self, epoch: usize) -> bool {
        let cadence = (self.config.num_epochs / 10).max(1);
        epoch % cadence == 0 || epoch + 1 == self.config.num_epochs
    }

    /// Best-effort qualitative rendering of the validation batch; failures
    /// are logged and swallowed.
    fn render_samples(
        &mut self,
        epoch: usize,
        labels: &LabelBatch,
        assembled: &AssembledBatch,
        gen_eval: &GenEval,
    ) {
        let real = self.maybe_denormalize(&assembled.real);
        let generated = self.maybe_denormalize(&gen_eval.generated);
        if real.dim() != generated.dim() {
            tracing::warn!(epoch, "generated output shape differs from input; skipping render");
            return;
        }
        let (_, joints, frames, _) = real.dim();

        let count = assembled.real.dim().0.min(RENDER_SAMPLES);
        for i in 0..count {
            let Some(label) = labels.sample(i) else {
                continue;
            };
            let mut pose_pair = Array4::<f32>::zeros((2, joints, frames, 3));
            pose_pair
                .slice_mut(s![0, .., .., ..])
                .assign(&real.slice(s![i, .., .., ..]));
            pose_pair
                .slice_mut(s![1, .., .., ..])
                .assign(&generated.slice(s![i, .., .., ..]));

            let request = RenderRequest {
                pose_pair,
                label,
                dataset: self.skeleton.dataset,
                mask: Some(assembled.mask.slice(s![i, .., .., ..]).to_owned()),
                caption: Some(format!("mask mode: {}", assembled.mode.as_str())),
                path: self.render_path(),
            };
            match self.sink.render(&request) {
                Ok((height, width)) => {
                    tracing::debug!(epoch, sample = i, height, width, "rendered sample");
                }
                Err(error) => {
                    tracing::warn!(epoch, sample = i, %error, "render failed; continuing");
                }
            }
        }
    }

    fn maybe_denormalize(&self, poses: &Array4<f32>) -> Array4<f32> {
        if self.config.normalize_data {
            self.source.denormalize(poses)
        } else {
            poses.clone()
        }
    }

    fn render_path(&self) -> std::path::PathBuf {
        let mut name = self
            .config
            .save_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.push_str("_tmp.gif");
        self.config.save_path.with_file_name(name)
    }

    /// The only early exit: checkpoint, then report as interrupted.
    fn interrupted_exit(&mut self, mut report: TrainReport) -> Result<TrainReport> {
        tracing::warn!(
            epoch = self.cursor.epoch,
            batch = self.cursor.batch,
            "interrupt received; checkpointing before exit"
        );
        self.checkpointer.save(&self.model, self.cursor)?;
        report.checkpoints += 1;
        report.interrupted = true;
        report.final_cursor = self.cursor;
        Ok(report)
    }
}
