//! Direct solver: dense LU with partial pivoting.

use crate::error::{NewtonError, Result};

use super::{two_norm, DenseMatrix, LinearSolver, LinearSolverResult, Norm};

/// Dense LU solver.
///
/// Always reaches the requested reduction in one iteration unless the
/// matrix is singular, which is reported as non-convergence so the Newton
/// driver can fail with a linear solver error.
#[derive(Debug, Clone, Default)]
pub struct DenseLu {
    /// Reduction achieved by the last solve
    last_reduction: f64,
}

impl DenseLu {
    /// Create a new dense LU solver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduction achieved by the most recent solve.
    pub fn last_reduction(&self) -> f64 {
        self.last_reduction
    }
}

impl Norm for DenseLu {
    fn norm(&self, v: &[f64]) -> f64 {
        two_norm(v)
    }
}

impl LinearSolver<DenseMatrix> for DenseLu {
    fn solve(&mut self, a: &DenseMatrix, z: &mut [f64], r: &[f64], _reduction: f64) -> Result<LinearSolverResult> {
        let n = a.size();
        if r.len() != n {
            return Err(NewtonError::dimension_mismatch(n, r.len()));
        }

        let lu = match a.factor() {
            Ok(lu) => lu,
            Err(NewtonError::SingularMatrix { .. }) => {
                self.last_reduction = 1.0;
                return Ok(LinearSolverResult {
                    converged: false,
                    iterations: 1,
                    reduction: 1.0,
                });
            }
            Err(e) => return Err(e),
        };
        lu.solve(r, z)?;

        let r_norm = two_norm(r);
        let mut defect = vec![0.0; n];
        a.residual(z, r, &mut defect);
        self.last_reduction = if r_norm > 0.0 { two_norm(&defect) / r_norm } else { 0.0 };

        Ok(LinearSolverResult {
            converged: true,
            iterations: 1,
            reduction: self.last_reduction,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solves_in_one_iteration() {
        let a = DenseMatrix::from_rows(&[vec![4.0, 1.0], vec![1.0, 3.0]]).unwrap();
        let r = [1.0, 2.0];
        let mut z = [0.0; 2];

        let mut solver = DenseLu::new();
        let res = solver.solve(&a, &mut z, &r, 1e-3).unwrap();

        assert!(res.converged);
        assert_eq!(res.iterations, 1);
        assert!(res.reduction < 1e-14);
        assert_relative_eq!(z[0], 1.0 / 11.0, epsilon = 1e-14);
        assert_relative_eq!(z[1], 7.0 / 11.0, epsilon = 1e-14);
    }

    #[test]
    fn test_singular_reports_non_convergence() {
        let a = DenseMatrix::new(2);
        let mut z = [0.0; 2];
        let res = DenseLu::new().solve(&a, &mut z, &[1.0, 1.0], 1e-3).unwrap();
        assert!(!res.converged);
    }

    #[test]
    fn test_wrong_rhs_length() {
        let a = DenseMatrix::identity(3);
        let mut z = [0.0; 3];
        let err = DenseLu::new().solve(&a, &mut z, &[1.0], 1e-3).unwrap_err();
        assert!(matches!(err, NewtonError::DimensionMismatch { expected: 3, actual: 1 }));
    }
}
