//! WGAN critic over whole pose sequences.

use candle_core::{Module, Result, Tensor};
use candle_nn::{embedding, linear, Embedding, Linear, VarBuilder};

use crate::gan::GanConfig;

pub struct SequenceCritic {
    fc1: Linear,
    fc2: Linear,
    out: Linear,
    action_embed: Option<Embedding>,
}

impl SequenceCritic {
    pub fn new(config: &GanConfig, vb: VarBuilder) -> Result<SequenceCritic> {
        let mut in_dim = config.njoints * config.seq_len * 3;
        let action_embed = if config.action_cond {
            in_dim += config.action_embed_dim;
            Some(embedding(
                config.num_actions,
                config.action_embed_dim,
                vb.pp("action_embed"),
            )?)
        } else {
            None
        };

        Ok(SequenceCritic {
            fc1: linear(in_dim, config.hidden_dim, vb.pp("fc1"))?,
            fc2: linear(config.hidden_dim, config.hidden_dim, vb.pp("fc2"))?,
            out: linear(config.hidden_dim, 1, vb.pp("out"))?,
            action_embed,
        })
    }

    /// Score one batch of sequences; higher means "more real".
    ///
    /// Returns a `(batch,)` tensor of critic scores.
    pub fn forward(&self, coords: &Tensor, actions: Option<&Tensor>) -> Result<Tensor> {
        let x = coords.flatten_from(1)?;
        let x = if let Some(embed) = &self.action_embed {
            let actions = actions.ok_or_else(|| {
                candle_core::Error::Msg("action conditioning enabled but no actions given".into())
            })?;
            Tensor::cat(&[&x, &embed.forward(actions)?], 1)?
        } else {
            x
        };
        let h = self.fc1.forward(&x)?.relu()?;
        let h = self.fc2.forward(&h)?.relu()?;
        self.out.forward(&h)?.squeeze(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::{VarBuilder, VarMap};

    #[test]
    fn scores_have_batch_shape() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let config = GanConfig {
            njoints: 5,
            seq_len: 6,
            latent_dim: 0,
            action_cond: true,
            num_actions: 4,
            hidden_dim: 16,
            action_embed_dim: 4,
            recon_weight: 10.0,
            learning_rate: 1e-3,
        };
        let critic = SequenceCritic::new(&config, vb)?;

        let coords = Tensor::rand(0f32, 1.0, (3, 5, 6, 3), &device)?;
        let actions = Tensor::from_vec(vec![0u32, 1, 3], (3,), &device)?;
        let scores = critic.forward(&coords, Some(&actions))?;
        assert_eq!(scores.dims1()?, 3);
        Ok(())
    }
}
