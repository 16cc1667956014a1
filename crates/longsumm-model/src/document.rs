use ndarray::{Array2, Array3, Axis};
use rand::rngs::StdRng;

use crate::layers::Linear;
use crate::mask::AttentionMask;

/// Document vector: masked mean of the sentence vectors, projected and
/// squashed with tanh.
#[derive(Debug, Clone)]
pub struct DocumentEncoder {
    proj: Linear,
}

impl DocumentEncoder {
    pub fn init(dim: usize, rng: &mut StdRng) -> Self {
        Self {
            proj: Linear::init(dim, dim, rng),
        }
    }

    /// `[batch, seq, dim]` → `[batch, dim]`. A row without sentences pools to zeros.
    pub fn forward(&self, sent_vecs: &Array3<f32>, mask: &AttentionMask) -> Array2<f32> {
        let valid = mask.valid().insert_axis(Axis(2));
        let sums = (sent_vecs * &valid).sum_axis(Axis(1));
        let counts = valid.sum_axis(Axis(1)).mapv(|c| c.max(1.0));
        let pooled = sums / &counts;
        self.proj.forward_2d(&pooled.view()).mapv_into(f32::tanh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array1};
    use rand::SeedableRng;

    #[test]
    fn test_mean_pooling_ignores_padding() {
        let encoder = DocumentEncoder {
            proj: Linear::new(Array2::eye(2), Array1::zeros(2)),
        };
        let mut x = Array3::zeros((1, 3, 2));
        x.slice_mut(s![0, 0, ..]).assign(&ndarray::arr1(&[0.2, 0.4]));
        x.slice_mut(s![0, 1, ..]).assign(&ndarray::arr1(&[0.4, 0.0]));
        x.slice_mut(s![0, 2, ..]).fill(50.0);

        let doc = encoder.forward(&x, &AttentionMask::from_lengths(&[2], 3));
        assert!((doc[[0, 0]] - 0.3f32.tanh()).abs() < 1e-6);
        assert!((doc[[0, 1]] - 0.2f32.tanh()).abs() < 1e-6);
    }

    #[test]
    fn test_empty_document_is_finite() {
        let encoder = DocumentEncoder::init(4, &mut StdRng::seed_from_u64(0));
        let x = Array3::from_elem((2, 3, 4), 1.0);
        let doc = encoder.forward(&x, &AttentionMask::from_lengths(&[0, 3], 3));
        assert_eq!(doc.dim(), (2, 4));
        assert!(doc.row(0).iter().all(|&v| v == 0.0));
        assert!(doc.iter().all(|v| v.abs() <= 1.0));
    }
}
