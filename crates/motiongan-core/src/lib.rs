//! # MotionGAN-Core
//!
//! Core types, errors and skeleton metadata for the MotionGAN system:
//! adversarial training of motion-completion networks and action
//! classification over 3D skeletal sequences.

pub mod error;
pub mod skeleton;
pub mod types;

pub use error::{Error, Result};
pub use skeleton::*;
pub use types::*;
