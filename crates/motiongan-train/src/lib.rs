//! # MotionGAN-Train
//!
//! The training side of the system: run configuration, the adversarial
//! (discriminator/generator) training protocol with checkpoint recovery and
//! cooperative interruption, and the simpler supervised classifier path.

pub mod checkpoint;
pub mod classifier;
pub mod config;
pub mod losses;
pub mod model;
pub mod protocol;
pub mod schedule;
pub mod viz;

pub use checkpoint::{Checkpointer, CursorRecord};
pub use classifier::{ClassifierReport, ClassifierTrainer};
pub use config::{ModelKind, TrainConfig};
pub use losses::{BatchLosses, ClassifierLosses, DiscLosses, EpochAccumulator, GenLosses};
pub use model::{ActionClassifier, AdversarialModel, GenEval};
pub use protocol::{AdversarialTrainer, InterruptHandle, TrainReport};
pub use viz::{NullSink, RenderRequest, VizSink};
