use ndarray::Array3;
use rand::rngs::StdRng;

use longsumm_core::ModelConfig;

use crate::attention::LongAttention;
use crate::layers::{LayerNorm, PositionwiseFeedForward};
use crate::mask::AttentionMask;

/// One encoder block: pre-norm long attention with a residual, then the
/// feed-forward sublayer. The first block skips the input norm.
#[derive(Debug, Clone)]
pub struct LongEncoderLayer {
    layer_norm: LayerNorm,
    self_attn: LongAttention,
    feed_forward: PositionwiseFeedForward,
}

impl LongEncoderLayer {
    pub fn init(config: &ModelConfig, rng: &mut StdRng) -> Self {
        Self {
            layer_norm: LayerNorm::new(config.hidden_size, config.layer_norm_eps),
            self_attn: LongAttention::init(config, rng),
            feed_forward: PositionwiseFeedForward::init(
                config.hidden_size,
                config.intermediate_size,
                config.layer_norm_eps,
                rng,
            ),
        }
    }

    pub fn forward(&self, iter: usize, inputs: &Array3<f32>, mask: &AttentionMask) -> Array3<f32> {
        let context = if iter != 0 {
            self.self_attn.forward(&self.layer_norm.forward(inputs), mask)
        } else {
            self.self_attn.forward(inputs, mask)
        };
        self.feed_forward.forward(&(context + inputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_first_layer_skips_input_norm() {
        let config = ModelConfig {
            hidden_size: 8,
            num_attention_heads: 2,
            intermediate_size: 16,
            ..Default::default()
        };
        let layer = LongEncoderLayer::init(&config, &mut StdRng::seed_from_u64(2));
        let mask = AttentionMask::from_lengths(&[3], 3);
        let x = Array3::from_shape_fn((1, 3, 8), |(_, i, j)| (i * 8 + j) as f32);

        let first = layer.forward(0, &x, &mask);
        let later = layer.forward(1, &x, &mask);
        assert_eq!(first.dim(), (1, 3, 8));
        assert!(first.iter().zip(later.iter()).any(|(a, b)| (a - b).abs() > 1e-4));
        assert!(first.iter().all(|v| v.is_finite()));
    }
}
