//! Sentence scoring head.
//!
//! Each sentence's logit sums a content term on its contextual vector, a
//! bilinear salience term against the document vector, one term per
//! auxiliary embedding (position, section, length) and a bias.

use ndarray::{Array1, Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::Rng;

use crate::layers::Linear;

#[derive(Debug, Clone)]
pub struct SentenceExtractor {
    content: Linear,
    salience: Array2<f32>,
    position: Linear,
    section: Linear,
    length: Linear,
    bias: f32,
}

/// Auxiliary per-sentence embeddings, each `[batch, seq, dim]`.
pub struct AuxEmbeddings<'a> {
    pub position: &'a Array3<f32>,
    pub section: &'a Array3<f32>,
    pub length: &'a Array3<f32>,
}

impl SentenceExtractor {
    pub fn init(dim: usize, rng: &mut StdRng) -> Self {
        let bound = (3.0 / dim as f32).sqrt();
        Self {
            content: Linear::init(dim, 1, rng),
            salience: Array2::from_shape_fn((dim, dim), |_| rng.gen_range(-bound..bound) / dim as f32),
            position: Linear::init(dim, 1, rng),
            section: Linear::init(dim, 1, rng),
            length: Linear::init(dim, 1, rng),
            bias: 0.0,
        }
    }

    /// Logits `[batch, seq]` for contextual vectors `[batch, seq, dim]` and
    /// document vectors `[batch, dim]`.
    pub fn forward(&self, sents: &Array3<f32>, doc: &Array2<f32>, aux: &AuxEmbeddings<'_>) -> Array2<f32> {
        let (batch, seq, _) = sents.dim();
        assert_eq!(doc.nrows(), batch, "document batch mismatch");
        for table in [aux.position, aux.section, aux.length] {
            assert_eq!(table.dim(), sents.dim(), "auxiliary embedding shape mismatch");
        }

        let mut logits = squeeze(self.content.forward(sents))
            + squeeze(self.position.forward(aux.position))
            + squeeze(self.section.forward(aux.section))
            + squeeze(self.length.forward(aux.length))
            + self.bias;

        for (b, mut row) in logits.outer_iter_mut().enumerate() {
            let projected: Array1<f32> = self.salience.dot(&doc.row(b));
            row += &sents.index_axis(Axis(0), b).dot(&projected);
        }
        debug_assert_eq!(logits.dim(), (batch, seq));
        logits
    }
}

/// Drop the trailing singleton axis of a `[batch, seq, 1]` projection.
fn squeeze(x: Array3<f32>) -> Array2<f32> {
    x.index_axis_move(Axis(2), 0)
}
