//! Jacobian reuse and inexact linear tolerance.
//!
//! Two decisions are made before every linear solve:
//!
//! - whether the Jacobian is rebuilt, based on how much the last step
//!   reduced the defect, and
//! - how accurately the linear system must be solved.
//!
//! Second order Newton convergence needs a linear reduction of at least
//! `(defect / prev_defect)^2`. For the last step, a reduction of
//! `stop_defect / (10 * defect)` already reaches the stopping criterion,
//! so the looser of the two is requested there.

use crate::error::{NewtonError, Result};
use crate::linalg::SetZero;
use crate::problem::NonlinearProblem;

use super::config::NewtonConfig;
use super::event::{Reporter, SolverEvent};
use super::state::SolverState;

/// Prepares the linear system of one Newton iteration.
pub trait StepPreparationPolicy {
    fn prepare<P: NonlinearProblem>(
        &self,
        problem: &P,
        state: &mut SolverState<'_, P::Jacobian>,
        reporter: &mut Reporter<'_>,
    ) -> Result<()>;
}

/// Threshold-driven reassembly with the quadratic tolerance rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptivePreparation {
    pub reduction: f64,
    pub absolute_limit: f64,
    pub min_linear_reduction: f64,
    pub fixed_linear_reduction: bool,
    pub reassemble_threshold: f64,
}

impl AdaptivePreparation {
    pub fn from_config(config: &NewtonConfig) -> Self {
        Self {
            reduction: config.reduction,
            absolute_limit: config.absolute_limit,
            min_linear_reduction: config.min_linear_reduction,
            fixed_linear_reduction: config.fixed_linear_reduction,
            reassemble_threshold: config.reassemble_threshold,
        }
    }

    /// Whether the defect ratio calls for a fresh Jacobian.
    pub fn needs_reassembly(&self, defect: f64, prev_defect: f64) -> bool {
        defect / prev_defect > self.reassemble_threshold
    }

    /// Linear reduction to request for a step starting at `defect`.
    pub fn linear_reduction(&self, defect: f64, prev_defect: f64, first_defect: f64) -> f64 {
        if self.fixed_linear_reduction {
            return self.min_linear_reduction;
        }

        // Largest defect at which Newton counts as converged
        let stop_defect = (first_defect * self.reduction).max(self.absolute_limit);
        let quadratic = defect * defect / (prev_defect * prev_defect);
        let last_step = stop_defect / (10.0 * defect);

        if last_step > quadratic {
            last_step
        } else {
            self.min_linear_reduction.min(quadratic)
        }
    }
}

impl StepPreparationPolicy for AdaptivePreparation {
    fn prepare<P: NonlinearProblem>(
        &self,
        problem: &P,
        state: &mut SolverState<'_, P::Jacobian>,
        reporter: &mut Reporter<'_>,
    ) -> Result<()> {
        state.reassembled = false;
        let forced = std::mem::take(&mut state.force_reassembly);
        if forced || self.needs_reassembly(state.defect, state.prev_defect) {
            reporter.emit(SolverEvent::Reassembling { forced });
            state.jacobian.set_zero();
            if let Err(err) = problem.jacobian(state.iterate, &mut state.jacobian) {
                // Partially filled, so it still needs a rebuild
                state.force_reassembly = true;
                return Err(NewtonError::problem(err));
            }
            state.reassembled = true;
        }

        state.linear_reduction =
            self.linear_reduction(state.defect, state.prev_defect, state.first_defect);
        state.prev_defect = state.defect;

        reporter.emit(SolverEvent::LinearReduction {
            requested: state.linear_reduction,
        });
        Ok(())
    }
}
