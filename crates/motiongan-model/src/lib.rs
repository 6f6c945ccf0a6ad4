//! # MotionGAN-Model
//!
//! Candle reference implementations of the model contracts: a
//! masked-sequence inpainting generator with a WGAN critic, and a
//! distance-matrix action classifier. Kept intentionally small; the training
//! protocol only ever talks to the traits in `motiongan-train`.

pub mod classifier;
mod convert;
pub mod critic;
pub mod gan;
pub mod generator;

pub use classifier::{DmnnClassifier, DmnnConfig};
pub use critic::SequenceCritic;
pub use gan::{GanConfig, GanModel};
pub use generator::SequenceGenerator;
