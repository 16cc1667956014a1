use ndarray::{s, Array2, Array3};

/// Fixed sinusoidal position table. Inputs are scaled by `sqrt(dim)` before
/// the table is added.
#[derive(Debug, Clone)]
pub struct PositionalEncoding {
    pe: Array2<f32>,
    dim: usize,
}

impl PositionalEncoding {
    pub fn new(dim: usize, max_len: usize) -> Self {
        let mut pe = Array2::zeros((max_len, dim));
        for pos in 0..max_len {
            for i in (0..dim).step_by(2) {
                let angle = pos as f32 / 10000f32.powf(i as f32 / dim as f32);
                pe[[pos, i]] = angle.sin();
                if i + 1 < dim {
                    pe[[pos, i + 1]] = angle.cos();
                }
            }
        }
        Self { pe, dim }
    }

    pub fn max_len(&self) -> usize {
        self.pe.nrows()
    }

    /// Table rows for the first `n` positions.
    pub fn table(&self, n: usize) -> Array2<f32> {
        self.pe.slice(s![..n, ..]).to_owned()
    }

    pub fn forward(&self, emb: &Array3<f32>) -> Array3<f32> {
        let (_, seq, dim) = emb.dim();
        assert_eq!(dim, self.dim, "positional encoding width mismatch");
        assert!(
            seq <= self.max_len(),
            "{} positions exceed the table of {}",
            seq,
            self.max_len()
        );
        emb * (self.dim as f32).sqrt() + &self.pe.slice(s![..seq, ..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_values() {
        let pe = PositionalEncoding::new(4, 8);
        let t = pe.table(2);
        assert_eq!(t[[0, 0]], 0.0);
        assert_eq!(t[[0, 1]], 1.0);
        assert!((t[[1, 0]] - 1f32.sin()).abs() < 1e-6);
        assert!((t[[1, 3]] - (1.0 / 100.0f32).cos()).abs() < 1e-6);
    }

    #[test]
    fn test_forward_scales_then_adds() {
        let pe = PositionalEncoding::new(4, 8);
        let emb = Array3::from_elem((2, 3, 4), 1.0);
        let out = pe.forward(&emb);
        for b in 0..2 {
            assert_eq!(out[[b, 0, 0]], 2.0);
            assert_eq!(out[[b, 0, 1]], 3.0);
        }
        assert!((out[[1, 2, 0]] - (2.0 + 2f32.sin())).abs() < 1e-6);
    }

    #[test]
    fn test_odd_width() {
        let pe = PositionalEncoding::new(3, 2);
        assert_eq!(pe.table(1).row(0).to_vec(), vec![0.0, 1.0, 0.0]);
    }
}
