//! Residual evaluation and the non-finite defect check.

use crate::error::{NewtonError, Result};
use crate::linalg::Norm;
use crate::problem::NonlinearProblem;

use super::state::SolverState;

/// A residual norm, classified.
///
/// A non-finite defect is not an error by itself: the line search treats
/// it as "this damping factor did not help", everyone else turns it into
/// [`NewtonError::Defect`] via [`Defect::finite`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Defect {
    Finite(f64),
    NonFinite(f64),
}

impl Defect {
    fn classify(norm: f64) -> Self {
        if norm.is_finite() {
            Self::Finite(norm)
        } else {
            Self::NonFinite(norm)
        }
    }

    /// The raw norm.
    pub fn value(self) -> f64 {
        match self {
            Self::Finite(d) | Self::NonFinite(d) => d,
        }
    }

    pub fn is_finite(self) -> bool {
        matches!(self, Self::Finite(_))
    }

    /// Treat a non-finite defect as fatal.
    pub fn finite(self, iterations: usize) -> Result<f64> {
        match self {
            Self::Finite(d) => Ok(d),
            Self::NonFinite(d) => Err(NewtonError::defect(iterations, d)),
        }
    }
}

/// Computes `F(u)` and its norm.
pub struct DefectEvaluator<'a, P, N> {
    problem: &'a P,
    norm: &'a N,
}

impl<'a, P, N> DefectEvaluator<'a, P, N>
where
    P: NonlinearProblem,
    N: Norm,
{
    pub fn new(problem: &'a P, norm: &'a N) -> Self {
        Self { problem, norm }
    }

    /// Zero `residual`, refill it at `iterate`, and take its norm.
    pub fn evaluate(&self, iterate: &[f64], residual: &mut [f64]) -> Result<Defect> {
        residual.fill(0.0);
        self.problem
            .residual(iterate, residual)
            .map_err(NewtonError::problem)?;
        Ok(Defect::classify(self.norm.norm(residual)))
    }

    /// Re-evaluate at the state's iterate and record the defect.
    pub fn update<M>(&self, state: &mut SolverState<'_, M>) -> Result<Defect> {
        let defect = self.evaluate(state.iterate, &mut state.residual)?;
        state.defect = defect.value();
        Ok(defect)
    }
}
