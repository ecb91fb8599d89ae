//! The residual/Jacobian provider consumed by the Newton driver.

use std::convert::Infallible;
use std::error::Error as StdError;

use crate::linalg::{DenseMatrix, SetZero};

/// A discretized nonlinear system `F(u) = 0`.
///
/// Both assembly methods receive zeroed storage and must fill it, never
/// accumulate into it. They may be called any number of times per solve.
pub trait NonlinearProblem {
    /// Linearization storage.
    type Jacobian: SetZero;

    /// Assembly failure.
    type Error: StdError + Send + Sync + 'static;

    /// Number of unknowns.
    fn size(&self) -> usize;

    /// Allocate Jacobian storage (called lazily, at most once per kept matrix).
    fn new_jacobian(&self) -> Self::Jacobian;

    /// Evaluate `r = F(u)`.
    fn residual(&self, u: &[f64], r: &mut [f64]) -> Result<(), Self::Error>;

    /// Evaluate `a = F'(u)`.
    fn jacobian(&self, u: &[f64], a: &mut Self::Jacobian) -> Result<(), Self::Error>;
}

/// A problem built from a pair of closures with dense Jacobian storage.
pub struct FnProblem<R, J> {
    size: usize,
    residual: R,
    jacobian: J,
}

impl<R, J> FnProblem<R, J>
where
    R: Fn(&[f64], &mut [f64]),
    J: Fn(&[f64], &mut DenseMatrix),
{
    /// Create a problem of `size` unknowns.
    pub fn new(size: usize, residual: R, jacobian: J) -> Self {
        Self {
            size,
            residual,
            jacobian,
        }
    }
}

impl<R, J> NonlinearProblem for FnProblem<R, J>
where
    R: Fn(&[f64], &mut [f64]),
    J: Fn(&[f64], &mut DenseMatrix),
{
    type Jacobian = DenseMatrix;
    type Error = Infallible;

    fn size(&self) -> usize {
        self.size
    }

    fn new_jacobian(&self) -> DenseMatrix {
        DenseMatrix::new(self.size)
    }

    fn residual(&self, u: &[f64], r: &mut [f64]) -> Result<(), Infallible> {
        (self.residual)(u, r);
        Ok(())
    }

    fn jacobian(&self, u: &[f64], a: &mut DenseMatrix) -> Result<(), Infallible> {
        (self.jacobian)(u, a);
        Ok(())
    }
}
