//! # MotionGAN-Data
//!
//! Everything between a raw `(labels, poses)` pair and a model-ready batch:
//! occlusion mask generation, training-time augmentation, conditioning-input
//! assembly, the batch-source contract, and the distance-matrix feature
//! pipeline feeding the action classifier.

pub mod assembler;
pub mod augment;
pub mod features;
pub mod mask;
pub mod source;

pub use assembler::{AssembledBatch, AssemblerConfig, BatchAssembler};
pub use augment::{augment, jitter_height, simulate_occlusions};
pub use features::edm;
pub use mask::{MaskGenerator, MaskMode};
pub use source::{BatchSource, SyntheticConfig, SyntheticSource};
