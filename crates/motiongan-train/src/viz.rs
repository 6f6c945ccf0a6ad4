//! Visualization sink contract.
//!
//! Rendering is an external collaborator: the protocol hands it pose pairs
//! and metadata, and a rendering failure must never abort training.

use std::path::PathBuf;

use ndarray::{Array3, Array4};

use motiongan_core::{ActionLabel, Result, SkeletonDataset};

/// One render request: a real/generated pose pair for a single sample.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    /// `(2, joints, time, 3)`: ground truth stacked with the generated
    /// sequence.
    pub pose_pair: Array4<f32>,
    pub label: ActionLabel,
    pub dataset: SkeletonDataset,
    /// The sample's visibility mask `(joints, time, 1)`.
    pub mask: Option<Array3<f32>>,
    pub caption: Option<String>,
    pub path: PathBuf,
}

/// Consumes render requests and reports the rendered dimensions.
pub trait VizSink {
    fn render(&mut self, request: &RenderRequest) -> Result<(u32, u32)>;
}

/// Discards every request. Used when no renderer is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl VizSink for NullSink {
    fn render(&mut self, _request: &RenderRequest) -> Result<(u32, u32)> {
        Ok((0, 0))
    }
}
