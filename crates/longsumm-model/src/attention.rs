//! Windowed self-attention with optional global positions.
//!
//! A local slot attends to unmasked slots within `window` on either side plus
//! every global slot of its row, all through the local projections. A global
//! slot attends to every unmasked slot through its own query/key/value
//! projections. Masked slots produce zero rows.

use ndarray::{s, Array3, ArrayView1, ArrayView2, ArrayViewMut1};
use rand::rngs::StdRng;

use longsumm_core::ModelConfig;

use crate::layers::Linear;
use crate::mask::{AttentionKind, AttentionMask};

#[derive(Debug, Clone)]
pub struct LongAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    query_global: Linear,
    key_global: Linear,
    value_global: Linear,
    output: Linear,
    num_heads: usize,
    head_dim: usize,
    window: usize,
}

impl LongAttention {
    pub fn init(config: &ModelConfig, rng: &mut StdRng) -> Self {
        let dim = config.hidden_size;
        Self {
            query: Linear::init(dim, dim, rng),
            key: Linear::init(dim, dim, rng),
            value: Linear::init(dim, dim, rng),
            query_global: Linear::init(dim, dim, rng),
            key_global: Linear::init(dim, dim, rng),
            value_global: Linear::init(dim, dim, rng),
            output: Linear::init(dim, dim, rng),
            num_heads: config.num_attention_heads,
            head_dim: config.head_dim(),
            window: config.one_sided_window(),
        }
    }

    /// Slots seen on either side of a local query.
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn forward(&self, hidden: &Array3<f32>, mask: &AttentionMask) -> Array3<f32> {
        let (batch, seq, dim) = hidden.dim();
        assert_eq!((batch, seq), mask.dim(), "attention mask shape mismatch");
        assert_eq!(dim, self.num_heads * self.head_dim, "hidden width mismatch");

        let scale = 1.0 / (self.head_dim as f32).sqrt();
        let q = self.query.forward(hidden) * scale;
        let k = self.key.forward(hidden);
        let v = self.value.forward(hidden);
        let mut context = Array3::<f32>::zeros((batch, seq, dim));

        for b in 0..batch {
            let kinds = mask.kinds().row(b);
            let global = mask.global_positions(b);
            let (kb, vb) = (k.slice(s![b, .., ..]), v.slice(s![b, .., ..]));

            for i in 0..seq {
                if kinds[i] != AttentionKind::Local {
                    continue;
                }
                let lo = i.saturating_sub(self.window);
                let hi = (i + self.window + 1).min(seq);
                let mut keys: Vec<usize> = (lo..hi).filter(|&j| !kinds[j].is_masked()).collect();
                keys.extend(global.iter().copied().filter(|&j| j < lo || j >= hi));
                self.attend(q.slice(s![b, i, ..]), kb, vb, &keys, context.slice_mut(s![b, i, ..]));
            }

            if !global.is_empty() {
                let row = hidden.slice(s![b, .., ..]);
                let qg = self.query_global.forward_2d(&row) * scale;
                let kg = self.key_global.forward_2d(&row);
                let vg = self.value_global.forward_2d(&row);
                let visible: Vec<usize> = (0..seq).filter(|&j| !kinds[j].is_masked()).collect();
                for &i in &global {
                    self.attend(qg.row(i), kg.view(), vg.view(), &visible, context.slice_mut(s![b, i, ..]));
                }
            }
        }

        let mut out = self.output.forward(&context);
        for ((b, i), kind) in mask.kinds().indexed_iter() {
            if kind.is_masked() {
                out.slice_mut(s![b, i, ..]).fill(0.0);
            }
        }
        out
    }

    /// Multi-head attention of one query row over `keys`.
    fn attend(
        &self,
        query: ArrayView1<f32>,
        k: ArrayView2<f32>,
        v: ArrayView2<f32>,
        keys: &[usize],
        mut out: ArrayViewMut1<f32>,
    ) {
        for h in 0..self.num_heads {
            let cols = h * self.head_dim..(h + 1) * self.head_dim;
            let qh = query.slice(s![cols.clone()]);
            let scores: Vec<f32> = keys
                .iter()
                .map(|&j| qh.dot(&k.slice(s![j, cols.clone()])))
                .collect();
            let mut head = out.slice_mut(s![cols.clone()]);
            for (&j, p) in keys.iter().zip(softmax(&scores)) {
                head.scaled_add(p, &v.slice(s![j, cols.clone()]));
            }
        }
    }
}

fn softmax(scores: &[f32]) -> Vec<f32> {
    let max = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp: Vec<f32> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}
