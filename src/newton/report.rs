//! Human-readable progress output through `tracing`.

use tracing::{debug, info, trace};

use super::event::{SolverEvent, SolverObserver};

/// Writes progress lines with the `tracing` macros.
///
/// Summary lines (verbosity 1-2) go to `info`, per-phase details
/// (verbosity 3) to `debug`, linear solver and line search internals
/// (verbosity 4) to `trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl TracingReporter {
    pub fn new() -> Self {
        Self
    }
}

impl SolverObserver for TracingReporter {
    fn observe(&mut self, event: &SolverEvent) {
        match *event {
            SolverEvent::InitialDefect { defect } => {
                info!("  Initial defect: {defect:12.4e}");
            }
            SolverEvent::IterationStarted { iteration } => {
                debug!("  Newton iteration {iteration} --------------------------------");
            }
            SolverEvent::Reassembling { forced: false } => debug!("      Reassembling matrix..."),
            SolverEvent::Reassembling { forced: true } => {
                debug!("      Reassembling matrix (forced)...");
            }
            SolverEvent::Assembled { elapsed } => {
                debug!("      matrix assembly time:             {:12.4e}", elapsed.as_secs_f64());
            }
            SolverEvent::LinearReduction { requested } => {
                debug!("      requested linear reduction:       {requested:12.4e}");
            }
            SolverEvent::LinearSolveStarted => trace!("      Solving linear system..."),
            SolverEvent::LinearSolved {
                iterations,
                reduction,
                elapsed,
            } => {
                trace!("          linear solver iterations:     {iterations:12}");
                trace!("          linear defect reduction:      {reduction:12.4e}");
                trace!("          linear solver time:           {:12.4e}", elapsed.as_secs_f64());
            }
            SolverEvent::LineSearchStarted => trace!("      Performing line search..."),
            SolverEvent::LineSearchTrial { lambda } => {
                trace!("          trying line search damping factor:   {lambda:12.4e}");
            }
            SolverEvent::LineSearchNonFinite { .. } => trace!("          NaNs detected"),
            SolverEvent::LineSearchAccepted { lambda } => {
                trace!("          line search damping factor:   {lambda:12.4e}");
            }
            SolverEvent::LineSearchExhausted { trials } => {
                trace!("          max line search iterations exceeded ({trials})");
            }
            SolverEvent::LineSearchRetry => {
                debug!("      line search failed - trying again with reassembled matrix");
            }
            SolverEvent::IterationCompleted {
                iteration,
                defect,
                step_reduction,
                total_reduction,
            } => {
                info!(
                    "  Newton iteration {iteration:2}.  New defect: {defect:12.4e}.  \
                     Reduction (this): {step_reduction:12.4e}.  Reduction (total): {total_reduction:12.4e}"
                );
            }
            SolverEvent::Converged {
                iterations,
                reduction,
                elapsed,
            } => {
                info!(
                    "  Newton converged after {iterations:2} iterations.  Reduction: {reduction:12.4e}   ({:.4}s)",
                    elapsed.as_secs_f64()
                );
            }
        }
    }
}
