//! Error types for the damped Newton solver.
//!
//! This module provides a unified error type [`NewtonError`] that covers
//! all error conditions that can occur while configuring the solver,
//! assembling a problem, and running the Newton iteration.

use std::error::Error as StdError;

use thiserror::Error;

/// Result type alias using [`NewtonError`].
pub type Result<T> = std::result::Result<T, NewtonError>;

/// Why a line search gave up.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSearchFailure {
    /// No damping factor certified a sufficient decrease.
    #[error("defect did not improve enough")]
    InsufficientDecrease,

    /// No damping factor lowered the defect at all.
    #[error("defect did not improve in any of the iterations")]
    NoImprovement,
}

/// Unified error type for all solver operations.
#[derive(Error, Debug)]
pub enum NewtonError {
    // ============ Newton Iteration Errors ============
    /// The residual norm is NaN or infinite
    #[error("Non-linear defect is NaN or Inf at iteration {iterations} (defect: {defect})")]
    Defect { iterations: usize, defect: f64 },

    /// The linear solver did not reach the requested reduction
    #[error("Linear solver did not converge in {linear_iterations} iterations (Newton iteration {iterations}, defect: {defect:.2e})")]
    LinearSolver {
        linear_iterations: usize,
        iterations: usize,
        defect: f64,
    },

    /// The damping schedule was exhausted, even with a fresh Jacobian
    #[error("Line search failed after {trials} trials at iteration {iterations}: {reason} (defect: {defect:.2e})")]
    LineSearch {
        reason: LineSearchFailure,
        trials: usize,
        iterations: usize,
        defect: f64,
    },

    /// Maximum iteration count reached without convergence
    #[error("Newton did not converge after {iterations} iterations (defect: {defect:.2e}, reduction: {reduction:.2e})")]
    NotConverged {
        iterations: usize,
        defect: f64,
        reduction: f64,
    },

    /// Result queried before a solve completed
    #[error("Newton result requested before a solve completed")]
    ResultUnavailable,

    // ============ Problem Errors ============
    /// Residual or Jacobian assembly failed
    #[error("Residual or Jacobian assembly failed")]
    Problem(#[source] Box<dyn StdError + Send + Sync>),

    /// Vector or matrix has the wrong size
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Matrix is singular and cannot be factored
    #[error("Singular matrix (pivot {pivot} vanished)")]
    SingularMatrix { pivot: usize },

    // ============ Configuration Errors ============
    /// Invalid solver parameter
    #[error("Invalid parameter '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    /// Unknown line search strategy name
    #[error("Unknown line search strategy '{name}'")]
    UnknownStrategy { name: String },

    /// Error reading a configuration file
    #[error("Failed to read config file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed configuration file
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration that cannot be rendered
    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl NewtonError {
    /// Create a defect error
    pub fn defect(iterations: usize, defect: f64) -> Self {
        Self::Defect { iterations, defect }
    }

    /// Create a linear solver error
    pub fn linear_solver(linear_iterations: usize, iterations: usize, defect: f64) -> Self {
        Self::LinearSolver {
            linear_iterations,
            iterations,
            defect,
        }
    }

    /// Create a line search error
    pub fn line_search(reason: LineSearchFailure, trials: usize, iterations: usize, defect: f64) -> Self {
        Self::LineSearch {
            reason,
            trials,
            iterations,
            defect,
        }
    }

    /// Create a not-converged error
    pub fn not_converged(iterations: usize, defect: f64, reduction: f64) -> Self {
        Self::NotConverged {
            iterations,
            defect,
            reduction,
        }
    }

    /// Wrap an error raised by a problem's residual or Jacobian assembly
    pub fn problem<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self::Problem(Box::new(error))
    }

    /// Create a dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }
}
