//! The adversarial pair wired to optimizers, implementing the
//! [`AdversarialModel`] contract.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};

use motiongan_core::{Error, Result};
use motiongan_data::AssembledBatch;
use motiongan_train::{AdversarialModel, DiscLosses, GenEval, GenLosses};

use crate::convert::{array4, tensor1_u32, tensor2, tensor4};
use crate::critic::SequenceCritic;
use crate::generator::SequenceGenerator;

#[derive(Debug, Clone)]
pub struct GanConfig {
    pub njoints: usize,
    pub seq_len: usize,
    pub latent_dim: usize,
    pub action_cond: bool,
    pub num_actions: usize,
    pub hidden_dim: usize,
    pub action_embed_dim: usize,
    /// Weight on the occluded-region reconstruction term.
    pub recon_weight: f64,
    pub learning_rate: f64,
}

impl Default for GanConfig {
    fn default() -> Self {
        GanConfig {
            njoints: 20,
            seq_len: 20,
            latent_dim: 0,
            action_cond: false,
            num_actions: 12,
            hidden_dim: 128,
            action_embed_dim: 16,
            recon_weight: 10.0,
            learning_rate: 1.0e-3,
        }
    }
}

/// Generator + critic with their own variable stores and optimizers.
pub struct GanModel {
    config: GanConfig,
    device: Device,
    gen_vars: VarMap,
    disc_vars: VarMap,
    generator: SequenceGenerator,
    critic: SequenceCritic,
    gen_opt: AdamW,
    disc_opt: AdamW,
}

fn cerr(e: candle_core::Error) -> Error {
    Error::model(e.to_string())
}

impl GanModel {
    pub fn new(config: GanConfig) -> Result<GanModel> {
        let device = Device::Cpu;

        let gen_vars = VarMap::new();
        let gen_vb = VarBuilder::from_varmap(&gen_vars, DType::F32, &device);
        let generator = SequenceGenerator::new(&config, gen_vb).map_err(cerr)?;

        let disc_vars = VarMap::new();
        let disc_vb = VarBuilder::from_varmap(&disc_vars, DType::F32, &device);
        let critic = SequenceCritic::new(&config, disc_vb).map_err(cerr)?;

        let params = ParamsAdamW {
            lr: config.learning_rate,
            ..Default::default()
        };
        let gen_opt = AdamW::new(gen_vars.all_vars(), params.clone()).map_err(cerr)?;
        let disc_opt = AdamW::new(disc_vars.all_vars(), params).map_err(cerr)?;

        Ok(GanModel {
            config,
            device,
            gen_vars,
            disc_vars,
            generator,
            critic,
            gen_opt,
            disc_opt,
        })
    }

    pub fn config(&self) -> &GanConfig {
        &self.config
    }

    fn batch_tensors(
        &self,
        batch: &AssembledBatch,
    ) -> candle_core::Result<(Tensor, Tensor, Option<Tensor>, Option<Tensor>)> {
        let real = tensor4(&batch.real, &self.device)?;
        let mask = tensor4(&batch.mask, &self.device)?;
        let latent = batch
            .latent
            .as_ref()
            .map(|l| tensor2(l, &self.device))
            .transpose()?;
        let actions = batch
            .actions
            .as_ref()
            .map(|a| tensor1_u32(a, &self.device))
            .transpose()?;
        Ok((real, mask, latent, actions))
    }

    fn disc_step(&mut self, batch: &AssembledBatch, train: bool) -> candle_core::Result<DiscLosses> {
        let (real, mask, latent, actions) = self.batch_tensors(batch)?;
        let fake = self
            .generator
            .forward(&real, &mask, latent.as_ref(), actions.as_ref())?
            .detach();

        let score_real = self.critic.forward(&real, actions.as_ref())?;
        let score_fake = self.critic.forward(&fake, actions.as_ref())?;

        let loss_real = score_real.mean_all()?.neg()?;
        let loss_fake = score_fake.mean_all()?;
        let wgan = (&loss_real + &loss_fake)?;

        if train {
            self.disc_opt.backward_step(&wgan)?;
        }

        Ok(DiscLosses {
            wgan: wgan.to_scalar::<f32>()? as f64,
            real: loss_real.to_scalar::<f32>()? as f64,
            fake: loss_fake.to_scalar::<f32>()? as f64,
        })
    }

    fn gen_step(
        &mut self,
        batch: &AssembledBatch,
        train: bool,
    ) -> candle_core::Result<(GenLosses, Tensor)> {
        let (real, mask, latent, actions) = self.batch_tensors(batch)?;
        let fake = self
            .generator
            .forward(&real, &mask, latent.as_ref(), actions.as_ref())?;

        let score = self.critic.forward(&fake, actions.as_ref())?;
        let adv = score.mean_all()?.neg()?;

        // Reconstruction on the occluded region only; the visible region is
        // carried through by construction.
        let inv_mask = (mask.ones_like()? - &mask)?;
        let recon = (fake.clone() - &real)?
            .sqr()?
            .broadcast_mul(&inv_mask)?
            .mean_all()?;

        let loss = (&adv + &recon.affine(self.config.recon_weight, 0.0)?)?;
        if train {
            self.gen_opt.backward_step(&loss)?;
        }

        Ok((
            GenLosses {
                wgan: adv.to_scalar::<f32>()? as f64,
                recon: recon.to_scalar::<f32>()? as f64,
            },
            fake,
        ))
    }
}

impl AdversarialModel for GanModel {
    fn disc_train(&mut self, batch: &AssembledBatch) -> Result<DiscLosses> {
        self.disc_step(batch, true).map_err(cerr)
    }

    fn gen_train(&mut self, batch: &AssembledBatch) -> Result<GenLosses> {
        self.gen_step(batch, true).map(|(l, _)| l).map_err(cerr)
    }

    fn disc_eval(&mut self, batch: &AssembledBatch) -> Result<DiscLosses> {
        self.disc_step(batch, false).map_err(cerr)
    }

    fn gen_eval(&mut self, batch: &AssembledBatch) -> Result<GenEval> {
        let (losses, fake) = self.gen_step(batch, false).map_err(cerr)?;
        let generated = array4(&fake.detach()).map_err(cerr)?;
        Ok(GenEval {
            losses,
            generated,
            embedding: None,
        })
    }

    fn update_lr(&mut self, rate: f64) -> Result<()> {
        self.gen_opt.set_learning_rate(rate);
        self.disc_opt.set_learning_rate(rate);
        Ok(())
    }

    fn save_weights(&self, disc_path: &Path, gen_path: &Path) -> Result<()> {
        self.disc_vars
            .save(disc_path)
            .map_err(|e| Error::checkpoint(disc_path, e.to_string()))?;
        self.gen_vars
            .save(gen_path)
            .map_err(|e| Error::checkpoint(gen_path, e.to_string()))?;
        Ok(())
    }

    fn load_weights(&mut self, disc_path: &Path, gen_path: &Path) -> Result<()> {
        self.disc_vars
            .load(disc_path)
            .map_err(|e| Error::checkpoint(disc_path, e.to_string()))?;
        self.gen_vars
            .load(gen_path)
            .map_err(|e| Error::checkpoint(gen_path, e.to_string()))?;
        Ok(())
    }
}
