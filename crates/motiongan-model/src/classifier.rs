//! Distance-matrix action classifier (DMNN).
//!
//! Consumes the EDM feature map rather than raw coordinates: a small conv
//! stack over `(joint-pair, time)` planes, mean-pooled into a class
//! distribution. Augmentation happens upstream in the trainer; no masking is
//! involved anywhere on this path.

use std::path::Path;

use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{conv2d, linear, loss, AdamW, Conv2d, Conv2dConfig, Dropout, Linear, Optimizer,
    ParamsAdamW, VarBuilder, VarMap};
use ndarray::{Array1, Array4};

use motiongan_core::{Error, Result};
use motiongan_data::edm;
use motiongan_train::{ActionClassifier, ClassifierLosses};

use crate::convert::{tensor1_u32, tensor4};

#[derive(Debug, Clone)]
pub struct DmnnConfig {
    pub njoints: usize,
    pub seq_len: usize,
    pub num_actions: usize,
    pub dropout: f32,
    pub channels: usize,
    pub learning_rate: f64,
}

impl Default for DmnnConfig {
    fn default() -> Self {
        DmnnConfig {
            njoints: 20,
            seq_len: 20,
            num_actions: 12,
            dropout: 0.5,
            channels: 32,
            learning_rate: 1.0e-3,
        }
    }
}

pub struct DmnnClassifier {
    config: DmnnConfig,
    device: Device,
    vars: VarMap,
    conv1: Conv2d,
    conv2: Conv2d,
    fc: Linear,
    dropout: Dropout,
    opt: AdamW,
}

fn cerr(e: candle_core::Error) -> Error {
    Error::model(e.to_string())
}

impl DmnnClassifier {
    pub fn new(config: DmnnConfig) -> Result<DmnnClassifier> {
        let device = Device::Cpu;
        let vars = VarMap::new();
        let vb = VarBuilder::from_varmap(&vars, DType::F32, &device);

        let half = (config.channels / 2).max(1);
        let conv1 = conv2d(
            1,
            half,
            3,
            Conv2dConfig {
                padding: 1,
                ..Default::default()
            },
            vb.pp("conv1"),
        )
        .map_err(cerr)?;
        let conv2 = conv2d(
            half,
            config.channels,
            3,
            Conv2dConfig {
                padding: 1,
                stride: 2,
                ..Default::default()
            },
            vb.pp("conv2"),
        )
        .map_err(cerr)?;
        let fc = linear(config.channels, config.num_actions, vb.pp("label")).map_err(cerr)?;
        let dropout = Dropout::new(config.dropout);

        let opt = AdamW::new(
            vars.all_vars(),
            ParamsAdamW {
                lr: config.learning_rate,
                ..Default::default()
            },
        )
        .map_err(cerr)?;

        Ok(DmnnClassifier {
            config,
            device,
            vars,
            conv1,
            conv2,
            fc,
            dropout,
            opt,
        })
    }

    pub fn config(&self) -> &DmnnConfig {
        &self.config
    }

    /// Logits over action classes from an EDM feature tensor
    /// `(batch, 1, joints², time)`.
    fn forward(&self, features: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let h = self.conv1.forward(features)?.relu()?;
        let h = self.conv2.forward(&h)?.relu()?;
        let h = h.flatten_from(2)?.mean(2)?;
        let h = self.dropout.forward(&h, train)?;
        self.fc.forward(&h)
    }

    fn step(
        &mut self,
        poses: &Array4<f32>,
        actions: &Array1<u32>,
        train: bool,
    ) -> Result<ClassifierLosses> {
        let features = edm(poses)?;
        self.candle_step(&features, actions, train).map_err(cerr)
    }

    fn candle_step(
        &mut self,
        features: &Array4<f32>,
        actions: &Array1<u32>,
        train: bool,
    ) -> candle_core::Result<ClassifierLosses> {
        // (batch, pairs, time, 1) → (batch, 1, pairs, time)
        let features = tensor4(features, &self.device)?.permute((0, 3, 1, 2))?;
        let targets = tensor1_u32(actions, &self.device)?;

        let logits = self.forward(&features, train)?;
        let ce = loss::cross_entropy(&logits, &targets)?;

        let predictions = logits.argmax(D::Minus1)?;
        let accuracy = predictions
            .eq(&targets)?
            .to_dtype(DType::F32)?
            .mean_all()?
            .to_scalar::<f32>()? as f64;

        if train {
            self.opt.backward_step(&ce)?;
        }

        Ok(ClassifierLosses {
            cross_entropy: ce.to_scalar::<f32>()? as f64,
            accuracy,
        })
    }
}

impl ActionClassifier for DmnnClassifier {
    fn train_step(
        &mut self,
        poses: &Array4<f32>,
        actions: &Array1<u32>,
    ) -> Result<ClassifierLosses> {
        self.step(poses, actions, true)
    }

    fn eval(&mut self, poses: &Array4<f32>, actions: &Array1<u32>) -> Result<ClassifierLosses> {
        self.step(poses, actions, false)
    }

    fn update_lr(&mut self, rate: f64) -> Result<()> {
        self.opt.set_learning_rate(rate);
        Ok(())
    }

    fn save_weights(&self, path: &Path) -> Result<()> {
        self.vars
            .save(path)
            .map_err(|e| Error::checkpoint(path, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    fn small_classifier() -> DmnnClassifier {
        DmnnClassifier::new(DmnnConfig {
            njoints: 6,
            seq_len: 8,
            num_actions: 4,
            dropout: 0.0,
            channels: 8,
            learning_rate: 1e-2,
        })
        .unwrap()
    }

    fn batch() -> (Array4<f32>, Array1<u32>) {
        // Per-sample scale so the (translation-invariant) EDM features differ
        // between samples.
        let poses = Array4::from_shape_fn((3, 6, 8, 3), |(b, j, t, c)| {
            (b as f32 + 1.0) * 0.05 * (j + t + c) as f32
        });
        let actions = Array1::from_vec(vec![0u32, 1, 3]);
        (poses, actions)
    }

    #[test]
    fn train_step_returns_finite_metrics() {
        let mut model = small_classifier();
        let (poses, actions) = batch();
        let losses = model.train_step(&poses, &actions).unwrap();
        assert!(losses.cross_entropy.is_finite());
        assert!((0.0..=1.0).contains(&losses.accuracy));
    }

    #[test]
    fn eval_does_not_change_the_model() {
        let mut model = small_classifier();
        let (poses, actions) = batch();
        let first = model.eval(&poses, &actions).unwrap();
        let second = model.eval(&poses, &actions).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn training_reduces_loss_on_a_fixed_batch() {
        let mut model = small_classifier();
        let (poses, actions) = batch();
        let initial = model.eval(&poses, &actions).unwrap().cross_entropy;
        for _ in 0..30 {
            model.train_step(&poses, &actions).unwrap();
        }
        let trained = model.eval(&poses, &actions).unwrap().cross_entropy;
        assert!(
            trained < initial,
            "loss should drop when memorizing one batch: {initial} -> {trained}"
        );
    }

    #[test]
    fn weights_save_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dmnn.safetensors");
        let model = small_classifier();
        model.save_weights(&path).unwrap();
        assert!(path.exists());
    }
}
