//! MotionGAN CLI entry point.
//!
//! Loads a run configuration, wires Ctrl-C into the cooperative interrupt
//! handle, and drives either the adversarial or the classifier training path
//! against the synthetic batch source.

use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use motiongan_core::Skeleton;
use motiongan_data::{SyntheticConfig, SyntheticSource};
use motiongan_model::{DmnnClassifier, DmnnConfig, GanConfig, GanModel};
use motiongan_train::{
    AdversarialTrainer, ClassifierTrainer, InterruptHandle, ModelKind, NullSink, TrainConfig,
};

#[derive(Parser, Debug)]
#[command(name = "motiongan", about = "Train motion-completion GANs and action classifiers")]
struct Cli {
    /// To talk or not to talk.
    #[arg(short, long)]
    verbose: bool,

    /// Base path for model output; overrides the configured one.
    #[arg(long)]
    save_path: Option<PathBuf>,

    /// Run configuration file.
    #[arg(long)]
    config_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = match &cli.config_file {
        Some(path) => TrainConfig::from_file(path)?,
        None => TrainConfig::default(),
    };
    if let Some(save_path) = cli.save_path {
        config.save_path = save_path;
    }

    let interrupt = InterruptHandle::new();
    {
        let handle = interrupt.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Ctrl-C received; finishing the current batch");
                handle.trigger();
            }
        });
    }

    tokio::task::spawn_blocking(move || run(config, interrupt)).await??;
    Ok(())
}

fn run(config: TrainConfig, interrupt: InterruptHandle) -> anyhow::Result<()> {
    let skeleton = Skeleton::for_dataset(config.dataset)?;
    tracing::info!(
        dataset = skeleton.dataset.as_str(),
        njoints = skeleton.njoints,
        actions = skeleton.num_actions(),
        "skeleton registry resolved"
    );

    let source = SyntheticSource::new(SyntheticConfig {
        batch_size: config.batch_size,
        njoints: skeleton.njoints,
        seq_len: config.seq_len,
        num_actions: skeleton.num_actions(),
        train_batches: 8,
        val_batches: 1,
        seed: 42,
        dropout_rate: 0.05,
    });
    let rng = StdRng::from_entropy();

    match config.model {
        ModelKind::Gan => {
            let model = GanModel::new(GanConfig {
                njoints: skeleton.njoints,
                seq_len: config.seq_len,
                latent_dim: config.latent_dim,
                action_cond: config.action_cond,
                num_actions: skeleton.num_actions(),
                learning_rate: config.learning_rate,
                ..GanConfig::default()
            })?;
            let mut trainer = AdversarialTrainer::new(config, model, source, NullSink, rng)?
                .with_interrupt(interrupt);
            let report = trainer.run()?;
            tracing::info!(
                epochs = report.epochs,
                batches = report.batches,
                checkpoints = report.checkpoints,
                interrupted = report.interrupted,
                "adversarial run finished"
            );
        }
        ModelKind::Dmnn => {
            let model = DmnnClassifier::new(DmnnConfig {
                njoints: skeleton.njoints,
                seq_len: config.seq_len,
                num_actions: skeleton.num_actions(),
                dropout: config.dropout,
                learning_rate: config.learning_rate,
                ..DmnnConfig::default()
            })?;
            let mut trainer =
                ClassifierTrainer::new(config, model, source, rng)?.with_interrupt(interrupt);
            let report = trainer.run()?;
            tracing::info!(
                epochs = report.epochs,
                batches = report.batches,
                val_accuracy = report.final_val.accuracy,
                interrupted = report.interrupted,
                "classifier run finished"
            );
        }
    }
    Ok(())
}
