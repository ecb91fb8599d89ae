//! Affine residual `F(u) = A u - b`.

use std::convert::Infallible;

use crate::error::{NewtonError, Result};
use crate::linalg::DenseMatrix;
use crate::problem::NonlinearProblem;

/// A linear system posed as a nonlinear problem.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    matrix: DenseMatrix,
    rhs: Vec<f64>,
}

impl LinearSystem {
    pub fn new(matrix: DenseMatrix, rhs: Vec<f64>) -> Result<Self> {
        if rhs.len() != matrix.size() {
            return Err(NewtonError::dimension_mismatch(matrix.size(), rhs.len()));
        }
        Ok(Self { matrix, rhs })
    }

    /// The 1D Laplacian stencil `[-1, 2, -1]` of size `n` with `b = 1`.
    pub fn laplacian(n: usize) -> Self {
        let mut matrix = DenseMatrix::new(n);
        for i in 0..n {
            matrix.set(i, i, 2.0);
            if i > 0 {
                matrix.set(i, i - 1, -1.0);
            }
            if i + 1 < n {
                matrix.set(i, i + 1, -1.0);
            }
        }
        Self {
            matrix,
            rhs: vec![1.0; n],
        }
    }

    pub fn matrix(&self) -> &DenseMatrix {
        &self.matrix
    }

    pub fn rhs(&self) -> &[f64] {
        &self.rhs
    }
}

impl NonlinearProblem for LinearSystem {
    type Jacobian = DenseMatrix;
    type Error = Infallible;

    fn size(&self) -> usize {
        self.rhs.len()
    }

    fn new_jacobian(&self) -> DenseMatrix {
        DenseMatrix::new(self.size())
    }

    fn residual(&self, u: &[f64], r: &mut [f64]) -> std::result::Result<(), Infallible> {
        self.matrix.mul_vec(u, r);
        for (ri, bi) in r.iter_mut().zip(&self.rhs) {
            *ri -= bi;
        }
        Ok(())
    }

    fn jacobian(&self, _u: &[f64], a: &mut DenseMatrix) -> std::result::Result<(), Infallible> {
        a.clone_from(&self.matrix);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{BiCgStab, DenseLu};
    use crate::newton::{Newton, NewtonConfig};
    use approx::assert_relative_eq;

    #[test]
    fn test_residual_and_jacobian() {
        let problem = LinearSystem::new(DenseMatrix::identity(2), vec![1.0, 2.0]).unwrap();
        let mut r = vec![0.0; 2];
        problem.residual(&[3.0, 3.0], &mut r).unwrap();
        assert_eq!(r, vec![2.0, 1.0]);

        let mut a = problem.new_jacobian();
        problem.jacobian(&[0.0, 0.0], &mut a).unwrap();
        assert_eq!(a.get(1, 1), 1.0);
        assert_eq!(a.get(0, 1), 0.0);
    }

    #[test]
    fn test_rejects_mismatched_rhs() {
        let err = LinearSystem::new(DenseMatrix::identity(3), vec![1.0]).unwrap_err();
        assert!(matches!(err, NewtonError::DimensionMismatch { expected: 3, actual: 1 }));
    }

    #[test]
    fn test_laplacian_single_newton_step() {
        // -u'' = 1 scaled by h^2: the parabola i (n + 1 - i) / 2
        let n = 8;
        let config = NewtonConfig::new().with_verbosity(0);
        let mut newton = Newton::with_config(LinearSystem::laplacian(n), DenseLu::new(), config);
        let (u, result) = newton.solve(vec![0.0; n]).unwrap();

        assert_eq!(result.iterations(), 1);
        for (i, ui) in u.iter().enumerate() {
            let k = (i + 1) as f64;
            assert_relative_eq!(*ui, k * (n as f64 + 1.0 - k) / 2.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_inexact_solver_needs_more_steps() {
        // A loose linear tolerance turns one exact step into several cheap ones
        let n = 30;
        let config = NewtonConfig::new()
            .with_verbosity(0)
            .with_min_linear_reduction(0.1)
            .with_fixed_linear_reduction(true);
        let mut newton = Newton::with_config(LinearSystem::laplacian(n), BiCgStab::default(), config);
        let (_, result) = newton.solve(vec![0.0; n]).unwrap();

        assert!(result.iterations() > 1);
        assert!(result.reduction() < 1e-8);
    }
}
