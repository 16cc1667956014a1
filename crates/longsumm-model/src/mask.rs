//! Per-position attention membership.
//!
//! An extended mask holds one float per sentence slot: negative for padding,
//! zero for local-window attention and positive for global attention. It is
//! decoded once per batch into an [`AttentionKind`] grid that every layer
//! reads.

use ndarray::{Array2, Axis};

/// Extended-mask value written for padded slots.
pub const MASKED_VALUE: f32 = -10000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionKind {
    /// Padding: neither attends nor is attended.
    Masked,
    /// Attends within the window and to every global position.
    Local,
    /// Attends to, and is attended by, every unmasked position.
    Global,
}

impl AttentionKind {
    pub fn from_extended(value: f32) -> Self {
        if value < 0.0 {
            Self::Masked
        } else if value > 0.0 {
            Self::Global
        } else {
            Self::Local
        }
    }

    pub fn is_masked(self) -> bool {
        self == Self::Masked
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttentionMask {
    kinds: Array2<AttentionKind>,
    has_global: bool,
}

impl AttentionMask {
    /// Decode a `[batch, seq]` extended mask.
    pub fn from_extended(mask: &Array2<f32>) -> Self {
        Self::from_kinds(mask.mapv(AttentionKind::from_extended))
    }

    /// Local attention over the first `lengths[b]` slots of each row.
    pub fn from_lengths(lengths: &[usize], seq: usize) -> Self {
        Self::from_kinds(Array2::from_shape_fn((lengths.len(), seq), |(b, i)| {
            if i < lengths[b] {
                AttentionKind::Local
            } else {
                AttentionKind::Masked
            }
        }))
    }

    pub fn from_kinds(kinds: Array2<AttentionKind>) -> Self {
        let has_global = kinds.iter().any(|&k| k == AttentionKind::Global);
        Self { kinds, has_global }
    }

    /// Promote an unmasked slot to global attention.
    pub fn set_global(&mut self, batch: usize, pos: usize) {
        let kind = &mut self.kinds[[batch, pos]];
        if !kind.is_masked() {
            *kind = AttentionKind::Global;
            self.has_global = true;
        }
    }

    /// `(batch, seq)`.
    pub fn dim(&self) -> (usize, usize) {
        self.kinds.dim()
    }

    pub fn kinds(&self) -> &Array2<AttentionKind> {
        &self.kinds
    }

    pub fn kind(&self, batch: usize, pos: usize) -> AttentionKind {
        self.kinds[[batch, pos]]
    }

    /// Whether any slot in the batch attends globally. When false the global
    /// projections are never evaluated.
    pub fn has_global(&self) -> bool {
        self.has_global
    }

    /// Global slots of one batch row, ascending.
    pub fn global_positions(&self, batch: usize) -> Vec<usize> {
        if !self.has_global {
            return Vec::new();
        }
        self.kinds
            .row(batch)
            .iter()
            .enumerate()
            .filter(|(_, k)| **k == AttentionKind::Global)
            .map(|(i, _)| i)
            .collect()
    }

    /// 1.0 for unmasked slots, 0.0 for padding.
    pub fn valid(&self) -> Array2<f32> {
        self.kinds.mapv(|k| if k.is_masked() { 0.0 } else { 1.0 })
    }

    /// Unmasked slots per batch row.
    pub fn valid_counts(&self) -> Vec<usize> {
        self.kinds
            .axis_iter(Axis(0))
            .map(|row| row.iter().filter(|k| !k.is_masked()).count())
            .collect()
    }

    /// Narrow to the first `seq` slots.
    pub fn truncate(&self, seq: usize) -> Self {
        Self::from_kinds(self.kinds.slice(ndarray::s![.., ..seq]).to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_decode_extended_mask() {
        let mask = AttentionMask::from_extended(&arr2(&[[0.0, 1.0, -10000.0], [0.0, 0.0, 0.0]]));
        assert!(mask.has_global());
        assert_eq!(mask.kind(0, 0), AttentionKind::Local);
        assert_eq!(mask.kind(0, 1), AttentionKind::Global);
        assert_eq!(mask.kind(0, 2), AttentionKind::Masked);
        assert_eq!(mask.global_positions(0), vec![1]);
        assert!(mask.global_positions(1).is_empty());
        assert_eq!(mask.valid_counts(), vec![2, 3]);
    }

    #[test]
    fn test_no_positive_entries_means_no_global() {
        let mask = AttentionMask::from_extended(&arr2(&[[0.0, -1.0], [-0.5, 0.0]]));
        assert!(!mask.has_global());
        assert_eq!(mask.valid(), arr2(&[[1.0, 0.0], [0.0, 1.0]]));
    }

    #[test]
    fn test_set_global_skips_padding() {
        let mut mask = AttentionMask::from_lengths(&[2, 1], 3);
        mask.set_global(1, 2);
        assert!(!mask.has_global());
        mask.set_global(0, 1);
        assert!(mask.has_global());
        assert_eq!(mask.truncate(2).dim(), (2, 2));
    }
}
