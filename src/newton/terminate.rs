//! Convergence test.

use crate::error::{NewtonError, Result};

use super::config::NewtonConfig;
use super::state::SolverState;

/// Decides whether the iteration stops.
pub trait TerminationPolicy {
    /// `Ok(true)` when converged, `Ok(false)` to continue, an error when
    /// the iteration budget is spent without convergence.
    fn terminate<M>(&self, state: &SolverState<'_, M>) -> Result<bool>;
}

/// Relative/absolute defect test with an iteration cap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefectTermination {
    pub reduction: f64,
    pub absolute_limit: f64,
    pub max_iterations: usize,
    pub force_iteration: bool,
}

impl DefectTermination {
    pub fn from_config(config: &NewtonConfig) -> Self {
        Self {
            reduction: config.reduction,
            absolute_limit: config.absolute_limit,
            max_iterations: config.max_iterations,
            force_iteration: config.force_iteration,
        }
    }

    /// The convergence predicate alone.
    pub fn is_converged(&self, defect: f64, first_defect: f64) -> bool {
        defect < self.absolute_limit || defect < first_defect * self.reduction
    }
}

impl TerminationPolicy for DefectTermination {
    fn terminate<M>(&self, state: &SolverState<'_, M>) -> Result<bool> {
        if self.force_iteration && state.iterations == 0 {
            return Ok(false);
        }
        let converged = self.is_converged(state.defect, state.first_defect);
        if !converged && state.iterations >= self.max_iterations {
            return Err(NewtonError::not_converged(
                state.iterations,
                state.defect,
                state.reduction,
            ));
        }
        Ok(converged)
    }
}
