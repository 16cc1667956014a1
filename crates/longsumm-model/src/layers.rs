//! Dense building blocks: linear projection, layer norm, embedding table and
//! the position-wise feed-forward sublayer.

use ndarray::{s, Array1, Array2, Array3, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::Rng;

const SQRT_2_OVER_PI: f32 = 0.797_884_6;
const GELU_COEFF: f32 = 0.044_715;

/// Tanh approximation of GELU.
#[inline]
pub fn gelu(x: f32) -> f32 {
    0.5 * x * (1.0 + (SQRT_2_OVER_PI * (x + GELU_COEFF * x * x * x)).tanh())
}

#[inline]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn xavier(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f32> {
    let bound = (6.0 / (rows + cols) as f32).sqrt();
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-bound..bound))
}

/// `y = x W + b` with `W` stored as `[in, out]`.
#[derive(Debug, Clone)]
pub struct Linear {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Linear {
    pub fn new(weight: Array2<f32>, bias: Array1<f32>) -> Self {
        assert_eq!(weight.ncols(), bias.len(), "linear bias does not match output width");
        Self { weight, bias }
    }

    /// Xavier-uniform weights, zero bias.
    pub fn init(in_features: usize, out_features: usize, rng: &mut StdRng) -> Self {
        Self {
            weight: xavier(in_features, out_features, rng),
            bias: Array1::zeros(out_features),
        }
    }

    pub fn in_features(&self) -> usize {
        self.weight.nrows()
    }

    pub fn out_features(&self) -> usize {
        self.weight.ncols()
    }

    pub fn forward_2d(&self, x: &ArrayView2<f32>) -> Array2<f32> {
        x.dot(&self.weight) + &self.bias
    }

    pub fn forward(&self, x: &Array3<f32>) -> Array3<f32> {
        let (batch, seq, _) = x.dim();
        let mut out = Array3::zeros((batch, seq, self.out_features()));
        for (mut dst, src) in out.outer_iter_mut().zip(x.outer_iter()) {
            dst.assign(&self.forward_2d(&src));
        }
        out
    }
}

/// Layer normalization over the last axis.
#[derive(Debug, Clone)]
pub struct LayerNorm {
    weight: Array1<f32>,
    bias: Array1<f32>,
    eps: f32,
}

impl LayerNorm {
    pub fn new(dim: usize, eps: f32) -> Self {
        Self {
            weight: Array1::ones(dim),
            bias: Array1::zeros(dim),
            eps,
        }
    }

    pub fn with_params(weight: Array1<f32>, bias: Array1<f32>, eps: f32) -> Self {
        assert_eq!(weight.len(), bias.len());
        Self { weight, bias, eps }
    }

    pub fn forward(&self, hidden: &Array3<f32>) -> Array3<f32> {
        let dim = hidden.len_of(Axis(2)) as f32;
        let mean = hidden.sum_axis(Axis(2)).insert_axis(Axis(2)) / dim;
        let centered = hidden - &mean;
        let var = centered.mapv(|v| v * v).sum_axis(Axis(2)).insert_axis(Axis(2)) / dim;
        let inv_std = var.mapv(|v| 1.0 / (v + self.eps).sqrt());
        centered * &inv_std * &self.weight + &self.bias
    }
}

/// Learned lookup table. Ids past the last row read the last row.
#[derive(Debug, Clone)]
pub struct Embedding {
    weight: Array2<f32>,
}

impl Embedding {
    pub fn new(weight: Array2<f32>) -> Self {
        assert!(weight.nrows() > 0, "embedding table is empty");
        Self { weight }
    }

    pub fn init(rows: usize, dim: usize, rng: &mut StdRng) -> Self {
        Self::new(xavier(rows, dim, rng))
    }

    pub fn rows(&self) -> usize {
        self.weight.nrows()
    }

    pub fn forward(&self, ids: &ArrayView2<usize>) -> Array3<f32> {
        let (batch, seq) = ids.dim();
        let last = self.weight.nrows() - 1;
        let mut out = Array3::zeros((batch, seq, self.weight.ncols()));
        for ((b, i), &id) in ids.indexed_iter() {
            out.slice_mut(s![b, i, ..])
                .assign(&self.weight.row(id.min(last)));
        }
        out
    }
}

/// Pre-norm `w_2(gelu(w_1(LN(x)))) + x`. Dropout is the identity here.
#[derive(Debug, Clone)]
pub struct PositionwiseFeedForward {
    layer_norm: LayerNorm,
    w_1: Linear,
    w_2: Linear,
}

impl PositionwiseFeedForward {
    pub fn init(dim: usize, ff_dim: usize, eps: f32, rng: &mut StdRng) -> Self {
        Self {
            layer_norm: LayerNorm::new(dim, eps),
            w_1: Linear::init(dim, ff_dim, rng),
            w_2: Linear::init(ff_dim, dim, rng),
        }
    }

    pub fn forward(&self, x: &Array3<f32>) -> Array3<f32> {
        let inter = self.w_1.forward(&self.layer_norm.forward(x)).mapv_into(gelu);
        self.w_2.forward(&inter) + x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};
    use rand::SeedableRng;

    #[test]
    fn test_gelu_known_points() {
        assert_eq!(gelu(0.0), 0.0);
        assert!((gelu(1.0) - 0.8412).abs() < 1e-3);
        assert!((gelu(-1.0) + 0.1588).abs() < 1e-3);
    }

    #[test]
    fn test_linear_forward() {
        let linear = Linear::new(arr2(&[[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]]), arr1(&[0.5, -0.5]));
        let x = Array3::from_shape_vec((1, 2, 3), vec![1.0, 2.0, 3.0, 0.0, 0.0, 1.0]).unwrap();
        let y = linear.forward(&x);
        assert_eq!(y.dim(), (1, 2, 2));
        assert_eq!(y[[0, 0, 0]], 4.5);
        assert_eq!(y[[0, 0, 1]], 6.5);
        assert_eq!(y[[0, 1, 0]], 1.5);
        assert_eq!(y[[0, 1, 1]], 0.5);
    }

    #[test]
    fn test_layer_norm_basic() {
        let ln = LayerNorm::new(3, 1e-6);
        let hidden = Array3::from_shape_vec((1, 1, 3), vec![1.0, 2.0, 3.0]).unwrap();
        let out = ln.forward(&hidden);
        // (x - 2) / sqrt(2/3)
        assert!((out[[0, 0, 0]] + 1.2247).abs() < 1e-3);
        assert!(out[[0, 0, 1]].abs() < 1e-5);
        assert!((out[[0, 0, 2]] - 1.2247).abs() < 1e-3);
    }

    #[test]
    fn test_layer_norm_scale_and_bias() {
        let ln = LayerNorm::with_params(arr1(&[2.0, 0.5, 1.5]), arr1(&[1.0, -1.0, 0.5]), 1e-6);
        let hidden = Array3::from_shape_vec((1, 1, 3), vec![1.0, 2.0, 3.0]).unwrap();
        let out = ln.forward(&hidden);
        let std = (2.0f32 / 3.0 + 1e-6).sqrt();
        assert!((out[[0, 0, 0]] - (-1.0 / std * 2.0 + 1.0)).abs() < 1e-4);
        assert!((out[[0, 0, 1]] + 1.0).abs() < 1e-4);
        assert!((out[[0, 0, 2]] - (1.0 / std * 1.5 + 0.5)).abs() < 1e-4);
    }

    #[test]
    fn test_embedding_clamps_ids() {
        let table = Embedding::new(arr2(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]));
        let ids = arr2(&[[0usize, 2, 7]]);
        let out = table.forward(&ids.view());
        assert_eq!(out[[0, 1, 0]], 2.0);
        assert_eq!(out[[0, 2, 1]], 2.0);
    }

    #[test]
    fn test_seeded_init_is_deterministic() {
        let a = Linear::init(4, 3, &mut StdRng::seed_from_u64(7));
        let b = Linear::init(4, 3, &mut StdRng::seed_from_u64(7));
        assert_eq!(a.weight, b.weight);
        let bound = (6.0f32 / 7.0).sqrt();
        assert!(a.weight.iter().all(|w| w.abs() <= bound));
    }

    #[test]
    fn test_feed_forward_is_residual() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut ff = PositionwiseFeedForward::init(4, 8, 1e-6, &mut rng);
        ff.w_2 = Linear::new(Array2::zeros((8, 4)), Array1::zeros(4));
        let x = Array3::from_shape_fn((2, 3, 4), |(b, i, j)| (b + i * j) as f32);
        assert_eq!(ff.forward(&x), x);
    }
}
