//! Fundamental data types for pose batches, labels and training state.

use ndarray::{s, Array1, Array4};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of channels carried by a raw pose batch: xyz plus the transmission
/// flag.
pub const POSE_CHANNELS: usize = 4;

/// Coordinate channels only.
pub const COORD_CHANNELS: usize = 3;

/// Index of the transmission-flag channel.
pub const TRANSMISSION_CHANNEL: usize = 3;

/// A batch of pose sequences shaped `(batch, joints, time, 4)`.
///
/// Channels 0..3 hold xyz coordinates; channel 3 is the binary transmission
/// flag recording whether the sensor actually observed that joint in that
/// frame. Construction validates the channel count and the flag invariant.
#[derive(Debug, Clone)]
pub struct PoseBatch {
    data: Array4<f32>,
}

impl PoseBatch {
    pub fn new(data: Array4<f32>) -> Result<PoseBatch> {
        let (_, _, _, channels) = data.dim();
        if channels != POSE_CHANNELS {
            return Err(Error::shape_mismatch(
                &[data.dim().0, data.dim().1, data.dim().2, POSE_CHANNELS],
                data.shape(),
            ));
        }
        for ((b, j, t, _), &value) in data.slice(s![.., .., .., TRANSMISSION_CHANNEL..]).indexed_iter()
        {
            if value != 0.0 && value != 1.0 {
                return Err(Error::NonBinaryFlag {
                    index: [b, j, t],
                    value,
                });
            }
        }
        Ok(PoseBatch { data })
    }

    pub fn batch_size(&self) -> usize {
        self.data.dim().0
    }

    pub fn njoints(&self) -> usize {
        self.data.dim().1
    }

    pub fn frames(&self) -> usize {
        self.data.dim().2
    }

    pub fn data(&self) -> &Array4<f32> {
        &self.data
    }

    /// Split into `(coordinates, transmission)` with shapes
    /// `(batch, joints, time, 3)` and `(batch, joints, time, 1)`.
    pub fn split(&self) -> (Array4<f32>, Array4<f32>) {
        let coords = self.data.slice(s![.., .., .., ..COORD_CHANNELS]).to_owned();
        let transmission = self
            .data
            .slice(s![.., .., .., TRANSMISSION_CHANNEL..])
            .to_owned();
        (coords, transmission)
    }
}

/// One labelled sample: `(sequence index, subject id, action class, length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLabel {
    pub sequence: u32,
    pub subject: u32,
    pub action: u32,
    pub length: u32,
}

/// Labels for a batch, either one record per sample or (for datasets with
/// per-frame annotation) a row of records per sample.
#[derive(Debug, Clone)]
pub enum LabelBatch {
    Single(Vec<ActionLabel>),
    Multi(Vec<Vec<ActionLabel>>),
}

impl LabelBatch {
    pub fn len(&self) -> usize {
        match self {
            LabelBatch::Single(labels) => labels.len(),
            LabelBatch::Multi(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The per-sample action-class column used for conditioning and
    /// classification. In multi mode each sample contributes its first record.
    pub fn actions(&self) -> Result<Array1<u32>> {
        let actions: Vec<u32> = match self {
            LabelBatch::Single(labels) => labels.iter().map(|l| l.action).collect(),
            LabelBatch::Multi(rows) => rows
                .iter()
                .map(|row| row.first().map(|l| l.action).ok_or(Error::EmptyLabels))
                .collect::<Result<Vec<u32>>>()?,
        };
        if actions.is_empty() {
            return Err(Error::EmptyLabels);
        }
        Ok(Array1::from_vec(actions))
    }

    /// The label record for sample `index` (first row in multi mode).
    pub fn sample(&self, index: usize) -> Option<ActionLabel> {
        match self {
            LabelBatch::Single(labels) => labels.get(index).copied(),
            LabelBatch::Multi(rows) => rows.get(index).and_then(|r| r.first().copied()),
        }
    }
}

/// Whether stochastic stages (augmentation) are active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Train,
    Eval,
}

/// Position within the training run, persisted across process restarts.
///
/// Owned exclusively by the training protocol; mutated once per completed
/// batch and once per completed epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingCursor {
    pub epoch: usize,
    pub batch: usize,
}
