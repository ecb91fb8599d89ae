//! The one-dimensional Bratu problem.
//!
//! ```text
//! -u'' = lambda e^u  on (0, 1),  u(0) = u(1) = 0
//! ```
//!
//! discretized with central differences on `n` interior points and scaled
//! by `h^2`, so row `i` of the residual reads
//!
//! ```text
//! F_i(u) = 2 u_i - u_{i-1} - u_{i+1} - h^2 lambda e^{u_i}
//! ```
//!
//! Solutions exist for `lambda` up to about 3.51; beyond that the Newton
//! iteration has nothing to converge to.

use std::convert::Infallible;

use crate::error::{NewtonError, Result};
use crate::linalg::DenseMatrix;
use crate::problem::NonlinearProblem;

/// Largest `lambda` for which the continuous problem has a solution.
pub const BRATU_CRITICAL_LAMBDA: f64 = 3.513_830_719;

#[derive(Debug, Clone)]
pub struct Bratu1d {
    points: usize,
    lambda: f64,
    h2: f64,
}

impl Bratu1d {
    /// `points` interior grid points, parameter `lambda`.
    pub fn new(points: usize, lambda: f64) -> Result<Self> {
        if points == 0 {
            return Err(NewtonError::invalid_parameter("points", "need at least one interior point"));
        }
        if !lambda.is_finite() || lambda < 0.0 {
            return Err(NewtonError::invalid_parameter("lambda", "must be finite and non-negative"));
        }
        let h = 1.0 / (points as f64 + 1.0);
        Ok(Self {
            points,
            lambda,
            h2: h * h,
        })
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Grid coordinate of unknown `i`.
    pub fn coordinate(&self, i: usize) -> f64 {
        (i as f64 + 1.0) * self.h2.sqrt()
    }
}

impl NonlinearProblem for Bratu1d {
    type Jacobian = DenseMatrix;
    type Error = Infallible;

    fn size(&self) -> usize {
        self.points
    }

    fn new_jacobian(&self) -> DenseMatrix {
        DenseMatrix::new(self.points)
    }

    fn residual(&self, u: &[f64], r: &mut [f64]) -> std::result::Result<(), Infallible> {
        let n = self.points;
        for i in 0..n {
            let left = if i > 0 { u[i - 1] } else { 0.0 };
            let right = if i + 1 < n { u[i + 1] } else { 0.0 };
            r[i] = 2.0 * u[i] - left - right - self.h2 * self.lambda * u[i].exp();
        }
        Ok(())
    }

    fn jacobian(&self, u: &[f64], a: &mut DenseMatrix) -> std::result::Result<(), Infallible> {
        let n = self.points;
        for i in 0..n {
            a.set(i, i, 2.0 - self.h2 * self.lambda * u[i].exp());
            if i > 0 {
                a.set(i, i - 1, -1.0);
            }
            if i + 1 < n {
                a.set(i, i + 1, -1.0);
            }
        }
        Ok(())
    }
}
