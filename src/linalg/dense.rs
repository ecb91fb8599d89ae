//! Dense row-major matrix with LU factorization.

use crate::error::{NewtonError, Result};

use super::SetZero;

/// Pivots smaller than this times the largest entry are treated as zero.
const PIVOT_TOLERANCE: f64 = 1e-15;

/// Square dense matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    /// Entries, row-major
    data: Vec<f64>,
    /// Matrix dimension
    size: usize,
}

/// LU decomposition with partial pivoting, `P A = L U`.
#[derive(Debug, Clone)]
pub struct LuFactors {
    /// Packed L (unit diagonal, below) and U (on and above the diagonal)
    lu: Vec<f64>,
    /// Row permutation
    pivots: Vec<usize>,
    size: usize,
}

impl DenseMatrix {
    /// Create a zero matrix of the given dimension.
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0.0; size * size],
            size,
        }
    }

    /// Build a matrix from rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let size = rows.len();
        let mut matrix = Self::new(size);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != size {
                return Err(NewtonError::dimension_mismatch(size, row.len()));
            }
            matrix.data[i * size..(i + 1) * size].copy_from_slice(row);
        }
        Ok(matrix)
    }

    /// Identity matrix.
    pub fn identity(size: usize) -> Self {
        let mut matrix = Self::new(size);
        for i in 0..size {
            matrix.set(i, i, 1.0);
        }
        matrix
    }

    /// Matrix dimension.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get matrix element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.size + col]
    }

    /// Set matrix element at (row, col).
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.size + col] = value;
    }

    /// Add to matrix element at (row, col).
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.size + col] += value;
    }

    /// Scale every entry.
    pub fn scale(&mut self, factor: f64) {
        self.data.iter_mut().for_each(|a| *a *= factor);
    }

    /// Compute `y = A x`.
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        let n = self.size;
        for (i, yi) in y.iter_mut().enumerate().take(n) {
            let row = &self.data[i * n..(i + 1) * n];
            *yi = row.iter().zip(x).map(|(a, b)| a * b).sum();
        }
    }

    /// Compute `r = b - A x`.
    pub fn residual(&self, x: &[f64], b: &[f64], r: &mut [f64]) {
        self.mul_vec(x, r);
        for (ri, bi) in r.iter_mut().zip(b) {
            *ri = bi - *ri;
        }
    }

    /// Perform LU decomposition with partial pivoting.
    pub fn factor(&self) -> Result<LuFactors> {
        let n = self.size;
        let mut lu = self.data.clone();
        let mut pivots: Vec<usize> = (0..n).collect();
        let scale = self.data.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let threshold = PIVOT_TOLERANCE * scale;

        for k in 0..n {
            // Find pivot
            let mut max_val = lu[k * n + k].abs();
            let mut max_row = k;

            for i in (k + 1)..n {
                let val = lu[i * n + k].abs();
                if val > max_val {
                    max_val = val;
                    max_row = i;
                }
            }

            if !(max_val > threshold) {
                return Err(NewtonError::SingularMatrix { pivot: k });
            }

            // Swap rows if needed
            if max_row != k {
                pivots.swap(k, max_row);
                for j in 0..n {
                    lu.swap(k * n + j, max_row * n + j);
                }
            }

            // Eliminate
            let pivot = lu[k * n + k];
            for i in (k + 1)..n {
                let factor = lu[i * n + k] / pivot;
                lu[i * n + k] = factor;
                for j in (k + 1)..n {
                    lu[i * n + j] -= factor * lu[k * n + j];
                }
            }
        }

        Ok(LuFactors { lu, pivots, size: n })
    }
}

impl SetZero for DenseMatrix {
    fn set_zero(&mut self) {
        self.data.fill(0.0);
    }
}

impl LuFactors {
    /// Solve `A x = b` using the pre-computed decomposition.
    pub fn solve(&self, b: &[f64], x: &mut [f64]) -> Result<()> {
        let n = self.size;
        if b.len() != n {
            return Err(NewtonError::dimension_mismatch(n, b.len()));
        }
        if x.len() != n {
            return Err(NewtonError::dimension_mismatch(n, x.len()));
        }

        // Apply pivot permutation to b
        for i in 0..n {
            x[i] = b[self.pivots[i]];
        }

        // Forward substitution (L * y = Pb)
        for i in 0..n {
            for j in 0..i {
                x[i] -= self.lu[i * n + j] * x[j];
            }
        }

        // Back substitution (U * x = y)
        for i in (0..n).rev() {
            for j in (i + 1)..n {
                x[i] -= self.lu[i * n + j] * x[j];
            }
            x[i] /= self.lu[i * n + i];
        }

        Ok(())
    }
}
