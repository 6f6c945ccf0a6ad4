//! Masked-sequence inpainting generator.
//!
//! Observed joint-frames pass through untouched; occluded cells are filled by
//! a per-frame MLP over the masked input, optionally conditioned on a latent
//! vector and an action-class embedding. The output therefore always agrees
//! with the input wherever the mask says "visible".

use candle_core::{Module, Result, Tensor};
use candle_nn::{embedding, linear, Embedding, Linear, VarBuilder};

use crate::gan::GanConfig;

pub struct SequenceGenerator {
    fc1: Linear,
    fc2: Linear,
    out: Linear,
    action_embed: Option<Embedding>,
    latent_dim: usize,
}

impl SequenceGenerator {
    pub fn new(config: &GanConfig, vb: VarBuilder) -> Result<SequenceGenerator> {
        let mut in_dim = config.njoints * 4 + config.latent_dim;
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

        Ok(SequenceGenerator {
            fc1: linear(in_dim, config.hidden_dim, vb.pp("fc1"))?,
            fc2: linear(config.hidden_dim, config.hidden_dim, vb.pp("fc2"))?,
            out: linear(config.hidden_dim, config.njoints * 3, vb.pp("out"))?,
            action_embed,
            latent_dim: config.latent_dim,
        })
    }

    /// Complete a masked sequence.
    ///
    /// * `coords` — `(batch, joints, time, 3)`
    /// * `mask` — `(batch, joints, time, 1)`
    /// * `latent` — `(batch, latent_dim)` when latent conditioning is on
    /// * `actions` — `(batch,)` u32 when action conditioning is on
    pub fn forward(
        &self,
        coords: &Tensor,
        mask: &Tensor,
        latent: Option<&Tensor>,
        actions: Option<&Tensor>,
    ) -> Result<Tensor> {
        let masked = coords.broadcast_mul(mask)?;
        let x = Tensor::cat(&[&masked, mask], 3)?;
        let (batch, joints, time, channels) = x.dims4()?;

        // (batch, time, joints * 4): one feature row per frame.
        let x = x
            .permute((0, 2, 1, 3))?
            .reshape((batch, time, joints * channels))?;

        let mut features = vec![x];
        if let Some(latent) = latent {
            features.push(
                latent
                    .unsqueeze(1)?
                    .broadcast_as((batch, time, self.latent_dim))?,
            );
        }
        if let Some(embed) = &self.action_embed {
            let actions = actions.ok_or_else(|| {
                candle_core::Error::Msg("action conditioning enabled but no actions given".into())
            })?;
            let emb = embed.forward(actions)?;
            let width = emb.dims2()?.1;
            features.push(emb.unsqueeze(1)?.broadcast_as((batch, time, width))?);
        }
        let x = if features.len() == 1 {
            features.remove(0)
        } else {
            Tensor::cat(&features, 2)?
        };

        let h = self.fc1.forward(&x)?.relu()?;
        let h = self.fc2.forward(&h)?.relu()?;
        let synth = self.out.forward(&h)?;
        let synth = synth
            .reshape((batch, time, joints, 3))?
            .permute((0, 2, 1, 3))?;

        let inv_mask = (mask.ones_like()? - mask)?;
        masked.add(&synth.broadcast_mul(&inv_mask)?)
    }
}
