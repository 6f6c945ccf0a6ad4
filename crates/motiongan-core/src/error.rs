//! Error types for the MotionGAN system.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid mask mode {mode}: expected an index in 0..=4")]
    InvalidMaskMode { mode: u8 },

    #[error("keep probability {value} is outside [0, 1]")]
    InvalidKeepProb { value: f32 },

    #[error("joint {joint} is not part of the reduced joint set")]
    JointNotInSubset { joint: usize },

    #[error("joint index {joint} out of range for skeleton with {njoints} joints")]
    JointOutOfRange { joint: usize, njoints: usize },

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("transmission flag at {index:?} is {value}, expected 0 or 1")]
    NonBinaryFlag { index: [usize; 3], value: f32 },

    #[error("batch source error: {0}")]
    BatchSource(String),

    #[error("empty label batch")]
    EmptyLabels,

    #[error("model error: {0}")]
    Model(String),

    #[error("checkpoint error at `{path}`: {message}")]
    Checkpoint { path: PathBuf, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("visualization error: {0}")]
    Viz(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Construct an [`Error::ShapeMismatch`] from two shape slices.
    pub fn shape_mismatch(expected: &[usize], actual: &[usize]) -> Self {
        Error::ShapeMismatch {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Construct an [`Error::Checkpoint`].
    pub fn checkpoint<S: Into<String>>(path: impl Into<PathBuf>, message: S) -> Self {
        Error::Checkpoint {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Construct an [`Error::Model`].
    pub fn model<S: Into<String>>(message: S) -> Self {
        Error::Model(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
