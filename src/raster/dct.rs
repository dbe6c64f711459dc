use std::f64::consts::PI;

use crate::config::BLOCK_SIZE;

/// An 8x8 block of samples or coefficients, row-major.
pub type Block = [f64; 64];

/// Precomputed orthonormal 8x8 DCT-II basis for forward and inverse transforms.
///
/// Coefficient `(u, v)` holds vertical frequency `u` (row) and horizontal
/// frequency `v` (column), matching the usual 2-D DCT layout.
pub struct DctTables {
    /// `cos[k][n]` = alpha(k) * cos((2n + 1) k pi / 16).
    cos: [[f64; BLOCK_SIZE]; BLOCK_SIZE],
}

impl DctTables {
    pub fn new() -> Self {
        let mut cos = [[0.0f64; BLOCK_SIZE]; BLOCK_SIZE];
        let n = BLOCK_SIZE as f64;

        for (k, row) in cos.iter_mut().enumerate() {
            let alpha = if k == 0 {
                (1.0 / n).sqrt()
            } else {
                (2.0 / n).sqrt()
            };
            for (i, c) in row.iter_mut().enumerate() {
                *c = alpha * ((2 * i + 1) as f64 * k as f64 * PI / (2.0 * n)).cos();
            }
        }

        Self { cos }
    }

    /// Forward transform: F = C * f * C^T.
    pub fn forward(&self, block: &Block) -> Block {
        let mut tmp = [0.0f64; 64];
        // rows: tmp[y][v] = sum_x f[y][x] * C[v][x]
        for y in 0..BLOCK_SIZE {
            for v in 0..BLOCK_SIZE {
                tmp[y * BLOCK_SIZE + v] = (0..BLOCK_SIZE)
                    .map(|x| block[y * BLOCK_SIZE + x] * self.cos[v][x])
                    .sum();
            }
        }

        let mut out = [0.0f64; 64];
        // columns: out[u][v] = sum_y C[u][y] * tmp[y][v]
        for u in 0..BLOCK_SIZE {
            for v in 0..BLOCK_SIZE {
                out[u * BLOCK_SIZE + v] = (0..BLOCK_SIZE)
                    .map(|y| self.cos[u][y] * tmp[y * BLOCK_SIZE + v])
                    .sum();
            }
        }
        out
    }

    /// Inverse transform: f = C^T * F * C.
    pub fn inverse(&self, coeffs: &Block) -> Block {
        let mut tmp = [0.0f64; 64];
        // rows: tmp[u][x] = sum_v F[u][v] * C[v][x]
        for u in 0..BLOCK_SIZE {
            for x in 0..BLOCK_SIZE {
                tmp[u * BLOCK_SIZE + x] = (0..BLOCK_SIZE)
                    .map(|v| coeffs[u * BLOCK_SIZE + v] * self.cos[v][x])
                    .sum();
            }
        }

        let mut out = [0.0f64; 64];
        // columns: out[y][x] = sum_u C[u][y] * tmp[u][x]
        for y in 0..BLOCK_SIZE {
            for x in 0..BLOCK_SIZE {
                out[y * BLOCK_SIZE + x] = (0..BLOCK_SIZE)
                    .map(|u| self.cos[u][y] * tmp[u * BLOCK_SIZE + x])
                    .sum();
            }
        }
        out
    }
}

impl Default for DctTables {
    fn default() -> Self {
        Self::new()
    }
}
