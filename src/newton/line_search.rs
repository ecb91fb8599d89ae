//! Globalization by backtracking line search.
//!
//! Starting from the full Newton step (`lambda = 1`), the damping factor is
//! shrunk geometrically until the defect satisfies
//!
//! ```text
//! defect(u - lambda z) <= (1 - lambda / 4) * defect(u)
//! ```
//!
//! A non-finite defect at some `lambda` is not fatal here; it only means
//! that damping factor did not help.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LineSearchFailure, NewtonError, Result};
use crate::linalg::Norm;
use crate::problem::NonlinearProblem;

use super::config::NewtonConfig;
use super::defect::{Defect, DefectEvaluator};
use super::event::{Reporter, SolverEvent};
use super::state::SolverState;

/// How the Newton correction is damped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LineSearchStrategy {
    /// Apply the full correction.
    None,
    /// Backtrack; fail unless a sufficient decrease is certified.
    #[default]
    BacktrackRequireDecrease,
    /// Backtrack; fall back to the best damping factor seen.
    BacktrackAcceptBest,
}

impl LineSearchStrategy {
    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::BacktrackRequireDecrease => "backtrackRequireDecrease",
            Self::BacktrackAcceptBest => "backtrackAcceptBest",
        }
    }
}

impl fmt::Display for LineSearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LineSearchStrategy {
    type Err = NewtonError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" | "noLineSearch" | "no_line_search" => Ok(Self::None),
            "backtrackRequireDecrease" | "backtrack_require_decrease" | "hackbuschReusken" => {
                Ok(Self::BacktrackRequireDecrease)
            }
            "backtrackAcceptBest" | "backtrack_accept_best" | "hackbuschReuskenAcceptBest" => {
                Ok(Self::BacktrackAcceptBest)
            }
            _ => Err(NewtonError::UnknownStrategy { name: s.to_string() }),
        }
    }
}

impl TryFrom<String> for LineSearchStrategy {
    type Error = NewtonError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<LineSearchStrategy> for String {
    fn from(strategy: LineSearchStrategy) -> Self {
        strategy.name().to_string()
    }
}

/// Result of globalizing one Newton correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    /// The iterate moved by `lambda` times the correction.
    Accepted { lambda: f64, trials: usize },
    /// The iterate and residual are back where the search started.
    Failed {
        reason: LineSearchFailure,
        trials: usize,
    },
}

/// Turns a Newton correction into an accepted step.
pub trait GlobalizationPolicy {
    /// Move `state.iterate` along `-state.correction`.
    ///
    /// On return `state.residual` and `state.defect` match `state.iterate`.
    /// Errors are fatal; a recoverable failure is reported as
    /// [`StepOutcome::Failed`].
    fn globalize<P, N>(
        &self,
        evaluator: &DefectEvaluator<'_, P, N>,
        state: &mut SolverState<'_, P::Jacobian>,
        reporter: &mut Reporter<'_>,
    ) -> Result<StepOutcome>
    where
        P: NonlinearProblem,
        N: Norm;
}

/// Backtracking line search with a geometric damping schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSearch {
    pub strategy: LineSearchStrategy,
    pub max_iterations: usize,
    pub damping_factor: f64,
}

impl LineSearch {
    pub fn from_config(config: &NewtonConfig) -> Self {
        Self {
            strategy: config.line_search_strategy,
            max_iterations: config.line_search_max_iterations,
            damping_factor: config.line_search_damping_factor,
        }
    }

    /// Handle an exhausted damping schedule.
    fn exhausted<P, N>(
        &self,
        evaluator: &DefectEvaluator<'_, P, N>,
        state: &mut SolverState<'_, P::Jacobian>,
        snapshot: &[f64],
        last_lambda: f64,
        best_lambda: f64,
        trials: usize,
    ) -> Result<StepOutcome>
    where
        P: NonlinearProblem,
        N: Norm,
    {
        let reason = match self.strategy {
            LineSearchStrategy::BacktrackAcceptBest if best_lambda > 0.0 => {
                if best_lambda != last_lambda {
                    state.restore(snapshot);
                    state.apply_correction(best_lambda);
                    evaluator.update(state)?.finite(state.iterations)?;
                }
                return Ok(StepOutcome::Accepted {
                    lambda: best_lambda,
                    trials,
                });
            }
            LineSearchStrategy::BacktrackAcceptBest => LineSearchFailure::NoImprovement,
            _ => LineSearchFailure::InsufficientDecrease,
        };

        state.restore(snapshot);
        evaluator.update(state)?.finite(state.iterations)?;
        Ok(StepOutcome::Failed { reason, trials })
    }
}

impl GlobalizationPolicy for LineSearch {
    fn globalize<P, N>(
        &self,
        evaluator: &DefectEvaluator<'_, P, N>,
        state: &mut SolverState<'_, P::Jacobian>,
        reporter: &mut Reporter<'_>,
    ) -> Result<StepOutcome>
    where
        P: NonlinearProblem,
        N: Norm,
    {
        if self.strategy == LineSearchStrategy::None {
            state.apply_correction(1.0);
            evaluator.update(state)?.finite(state.iterations)?;
            return Ok(StepOutcome::Accepted {
                lambda: 1.0,
                trials: 1,
            });
        }

        reporter.emit(SolverEvent::LineSearchStarted);
        let snapshot = state.iterate.to_vec();
        let mut lambda = 1.0;
        let mut best_lambda = 0.0;
        let mut best_defect = state.defect;
        let mut trials = 0;

        loop {
            reporter.emit(SolverEvent::LineSearchTrial { lambda });
            state.apply_correction(lambda);
            let defect = evaluator.update(state)?;
            trials += 1;

            match defect {
                Defect::Finite(d) => {
                    if d <= (1.0 - lambda / 4.0) * state.prev_defect {
                        reporter.emit(SolverEvent::LineSearchAccepted { lambda });
                        return Ok(StepOutcome::Accepted { lambda, trials });
                    }
                    if d < best_defect {
                        best_defect = d;
                        best_lambda = lambda;
                    }
                }
                Defect::NonFinite(_) => reporter.emit(SolverEvent::LineSearchNonFinite { lambda }),
            }

            if trials >= self.max_iterations {
                reporter.emit(SolverEvent::LineSearchExhausted { trials });
                return self.exhausted(evaluator, state, &snapshot, lambda, best_lambda, trials);
            }

            lambda *= self.damping_factor;
            state.restore(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{DenseLu, DenseMatrix};
    use crate::testing::{scalar_problem, Counting};
    use approx::assert_relative_eq;

    /// Evaluate the defect at `u0`, then set the correction `z`.
    fn run<P>(problem: &P, u0: f64, z: f64, search: LineSearch) -> (Result<StepOutcome>, f64, f64)
    where
        P: NonlinearProblem<Jacobian = DenseMatrix>,
    {
        let norm = DenseLu::new();
        let evaluator = DefectEvaluator::new(problem, &norm);
        let mut u = vec![u0];
        let mut residual = vec![0.0];
        let defect = evaluator.evaluate(&u, &mut residual).unwrap().value();

        let mut state = SolverState::new(&mut u, residual, DenseMatrix::new(1), defect);
        state.correction = vec![z];
        let mut log: Vec<SolverEvent> = Vec::new();
        let mut reporter = Reporter::new(&mut log, 4);
        let outcome = search.globalize(&evaluator, &mut state, &mut reporter);
        let defect = state.defect;
        (outcome, u[0], defect)
    }

    fn search(strategy: LineSearchStrategy) -> LineSearch {
        LineSearch::from_config(&NewtonConfig::default().with_line_search_strategy(strategy))
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(
            "hackbuschReusken".parse::<LineSearchStrategy>().unwrap(),
            LineSearchStrategy::BacktrackRequireDecrease
        );
        assert_eq!(
            "backtrack_accept_best".parse::<LineSearchStrategy>().unwrap(),
            LineSearchStrategy::BacktrackAcceptBest
        );
        assert_eq!("noLineSearch".parse::<LineSearchStrategy>().unwrap(), LineSearchStrategy::None);
        assert!(matches!(
            "armijo".parse::<LineSearchStrategy>(),
            Err(NewtonError::UnknownStrategy { .. })
        ));
        assert_eq!(LineSearchStrategy::BacktrackAcceptBest.to_string(), "backtrackAcceptBest");
    }

    #[test]
    fn test_full_step_accepted() {
        // F(u) = u - 1 from u = 3 with the exact correction
        let problem = scalar_problem(|u| u - 1.0, |_| 1.0);
        for strategy in [
            LineSearchStrategy::None,
            LineSearchStrategy::BacktrackRequireDecrease,
            LineSearchStrategy::BacktrackAcceptBest,
        ] {
            let (outcome, u, defect) = run(&problem, 3.0, 2.0, search(strategy));
            assert_eq!(outcome.unwrap(), StepOutcome::Accepted { lambda: 1.0, trials: 1 });
            assert_relative_eq!(u, 1.0);
            assert_eq!(defect, 0.0);
        }
    }

    #[test]
    fn test_none_matches_undamped_backtracking() {
        let problem = scalar_problem(|u| u * u - 2.0, |u| 2.0 * u);
        let (none, u_none, d_none) = run(&problem, 2.0, 0.5, search(LineSearchStrategy::None));
        let single = LineSearch {
            strategy: LineSearchStrategy::BacktrackRequireDecrease,
            max_iterations: 1,
            damping_factor: 0.5,
        };
        let (back, u_back, d_back) = run(&problem, 2.0, 0.5, single);

        assert_eq!(none.unwrap(), back.unwrap());
        assert_eq!(u_none.to_bits(), u_back.to_bits());
        assert_eq!(d_none.to_bits(), d_back.to_bits());
    }

    #[test]
    fn test_backtracks_past_non_finite() {
        // Blows up beyond u = 2.2; the root is at 2
        let problem = scalar_problem(
            |u| if u > 2.2 { f64::NAN } else { u * u - 4.0 },
            |u| 2.0 * u,
        );
        // Full step from 1 lands at 2.5
        let (outcome, u, defect) = run(&problem, 1.0, -1.5, search(LineSearchStrategy::BacktrackRequireDecrease));
        let StepOutcome::Accepted { lambda, trials } = outcome.unwrap() else {
            panic!("line search should succeed");
        };
        assert_eq!(lambda, 0.5);
        assert_eq!(trials, 2);
        assert_relative_eq!(u, 1.75);
        assert_relative_eq!(defect, 0.9375);
    }

    #[test]
    fn test_none_with_non_finite_is_fatal() {
        let problem = scalar_problem(|u| if u > 2.2 { f64::INFINITY } else { u - 2.0 }, |_| 1.0);
        let (outcome, _, _) = run(&problem, 1.0, -1.5, search(LineSearchStrategy::None));
        assert!(matches!(outcome, Err(NewtonError::Defect { .. })));
    }

    #[test]
    fn test_require_decrease_restores_on_failure() {
        // Wrong-way correction never decreases |u - 1|
        let problem = Counting::new(scalar_problem(|u| u - 1.0, |_| 1.0));
        let (outcome, u, defect) = run(&problem, 3.0, -1.0, search(LineSearchStrategy::BacktrackRequireDecrease));
        assert_eq!(
            outcome.unwrap(),
            StepOutcome::Failed {
                reason: LineSearchFailure::InsufficientDecrease,
                trials: 10
            }
        );
        assert_eq!(u, 3.0);
        assert_eq!(defect, 2.0);
        // Initial, ten trials, restore
        assert_eq!(problem.residuals(), 12);
    }

    #[test]
    fn test_accept_best_without_improvement_fails() {
        let problem = scalar_problem(|u| u - 1.0, |_| 1.0);
        let (outcome, u, defect) = run(&problem, 3.0, -1.0, search(LineSearchStrategy::BacktrackAcceptBest));
        assert_eq!(
            outcome.unwrap(),
            StepOutcome::Failed {
                reason: LineSearchFailure::NoImprovement,
                trials: 10
            }
        );
        assert_eq!(u, 3.0);
        assert_eq!(defect, 2.0);
    }

    #[test]
    fn test_accept_best_falls_back_to_best_lambda() {
        // Undefined between 0 and 3.5, so only the full step is finite
        let problem = scalar_problem(
            |u| if u < 0.0 || u > 3.5 { u - 1.0 } else { f64::NAN },
            |_| 1.0,
        );
        let short = LineSearch {
            strategy: LineSearchStrategy::BacktrackAcceptBest,
            max_iterations: 3,
            damping_factor: 0.5,
        };
        // From 4 (defect 3): lambda 1 -> -1.5 (2.5 > 2.25), 0.5 -> NaN, 0.25 -> NaN
        let (outcome, u, defect) = run(&problem, 4.0, 5.5, short);
        assert_eq!(outcome.unwrap(), StepOutcome::Accepted { lambda: 1.0, trials: 3 });
        assert_relative_eq!(u, -1.5);
        assert_relative_eq!(defect, 2.5);

        let (outcome, u, defect) = run(
            &problem,
            4.0,
            5.5,
            LineSearch {
                strategy: LineSearchStrategy::BacktrackRequireDecrease,
                ..short
            },
        );
        assert!(matches!(outcome.unwrap(), StepOutcome::Failed { trials: 3, .. }));
        assert_eq!(u, 4.0);
        assert_eq!(defect, 3.0);
    }

    #[test]
    fn test_accept_best_never_worse_than_full_step() {
        // Mildly overshooting correction with the default schedule
        let problem = scalar_problem(|u| (u - 1.0).powi(3) + (u - 1.0), |u| 3.0 * (u - 1.0).powi(2) + 1.0);
        let mut u_full = [3.0];
        let z = 2.6;
        u_full[0] -= z;
        let full_defect = ((u_full[0] - 1.0_f64).powi(3) + (u_full[0] - 1.0)).abs();

        let (outcome, _, defect) = run(&problem, 3.0, z, search(LineSearchStrategy::BacktrackAcceptBest));
        assert!(matches!(outcome.unwrap(), StepOutcome::Accepted { .. }));
        assert!(defect <= full_defect);
    }
}
