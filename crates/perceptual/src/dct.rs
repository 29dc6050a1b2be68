//! Structural (DCT) hash.
//!
//! The hash keeps the low-frequency `g × g` corner of a separable orthonormal
//! DCT-II over a `4g × 4g` grayscale grid. Only that corner is ever computed:
//! the row pass produces `g` coefficients per row and the column pass
//! produces `g` coefficients per column.

use crate::config::PerceptualError;
use crate::fingerprint::{BitWidth, Fingerprint, HashAlgorithm};
use crate::hashes::{check_grid, median};
use crate::pixels::PixelBuffer;

/// Precomputed cosine basis for an `n`-point DCT-II truncated to `k` outputs.
///
/// `table[u * n + x] = c(u) * sqrt(2 / n) * cos((2x + 1) * u * PI / (2n))`
/// with `c(0) = 1 / sqrt(2)` and `c(u > 0) = 1`.
#[derive(Debug, Clone)]
pub struct DctBasis {
    n: usize,
    k: usize,
    table: Vec<f64>,
}

impl DctBasis {
    pub fn new(n: usize, k: usize) -> Self {
        let k = k.min(n);
        let scale = (2.0 / n as f64).sqrt();
        let mut table = Vec::with_capacity(n * k);
        for u in 0..k {
            let cu = if u == 0 { std::f64::consts::FRAC_1_SQRT_2 } else { 1.0 };
            for x in 0..n {
                let angle =
                    ((2 * x + 1) as f64) * (u as f64) * std::f64::consts::PI / (2.0 * n as f64);
                table.push(cu * scale * angle.cos());
            }
        }
        Self { n, k, table }
    }

    /// Basis sized for the structural hash at `width`.
    pub fn for_width(width: BitWidth) -> Self {
        let g = width.grid_side();
        Self::new(4 * g, g)
    }

    pub fn input_side(&self) -> usize {
        self.n
    }

    pub fn output_side(&self) -> usize {
        self.k
    }

    /// Transform an `n × n` row-major block into its `k × k` low-frequency
    /// corner, row-major with the vertical frequency as the row.
    pub fn transform(&self, input: &[f64]) -> Vec<f64> {
        let (n, k) = (self.n, self.k);

        let mut rows = vec![0.0f64; n * k];
        for y in 0..n {
            let line = &input[y * n..(y + 1) * n];
            for u in 0..k {
                let basis = &self.table[u * n..(u + 1) * n];
                rows[y * k + u] = line.iter().zip(basis).map(|(p, c)| p * c).sum();
            }
        }

        let mut out = vec![0.0f64; k * k];
        for v in 0..k {
            let basis = &self.table[v * n..(v + 1) * n];
            for u in 0..k {
                out[v * k + u] = (0..n).map(|y| rows[y * k + u] * basis[y]).sum();
            }
        }
        out
    }
}

/// Structural hash of a `4g × 4g` buffer using a basis built for `width`.
pub(crate) fn structural_hash(
    basis: &DctBasis,
    buf: &PixelBuffer,
    width: BitWidth,
) -> Result<Fingerprint, PerceptualError> {
    check_grid(HashAlgorithm::Structural, buf, width)?;
    let block = basis.transform(&buf.luma());
    // DC is excluded from the median but still contributes bit 0.
    let threshold = median(&block[1..]);
    Fingerprint::from_bits(width, block.iter().map(|&v| v > threshold))
}
