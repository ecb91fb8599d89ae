//! Solver configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NewtonError, Result};

use super::line_search::LineSearchStrategy;
use super::{
    DEFAULT_ABSOLUTE_LIMIT, DEFAULT_DAMPING_FACTOR, DEFAULT_LINE_SEARCH_MAX_ITERATIONS,
    DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_LINEAR_REDUCTION, DEFAULT_REASSEMBLE_THRESHOLD,
    DEFAULT_REDUCTION, DEFAULT_VERBOSITY, MAX_VERBOSITY,
};

/// Configuration for the Newton solver.
///
/// Every field is optional when loading from a file. Keys may be written
/// in snake_case or in the PascalCase of classic parameter files:
///
/// ```toml
/// [newton]
/// ReassembleThreshold = 0.1
/// LineSearchMaxIterations = 10
/// MaxIterations = 7
/// AbsoluteLimit = 1e-6
/// Reduction = 1e-4
/// MinLinearReduction = 1e-3
/// LineSearchDampingFactor = 0.9
/// LineSearchStrategy = "backtrackAcceptBest"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewtonConfig {
    /// Progress output volume, 0 (silent) to 4 (line search trials).
    #[serde(alias = "VerbosityLevel")]
    pub verbosity: u8,
    /// Keep the Jacobian across calls to `apply`.
    #[serde(alias = "KeepMatrix")]
    pub keep_matrix: bool,
    /// Relative defect reduction that counts as converged.
    #[serde(alias = "Reduction")]
    pub reduction: f64,
    /// Absolute defect that counts as converged.
    #[serde(alias = "AbsoluteLimit")]
    pub absolute_limit: f64,
    /// Newton iterations allowed before giving up.
    #[serde(alias = "MaxIterations")]
    pub max_iterations: usize,
    /// Take at least one step even if the initial guess is converged.
    #[serde(alias = "ForceIteration")]
    pub force_iteration: bool,
    /// Upper bound on the linear reduction requested per step.
    #[serde(alias = "MinLinearReduction")]
    pub min_linear_reduction: f64,
    /// Always request `min_linear_reduction` from the linear solver.
    #[serde(alias = "FixedLinearReduction")]
    pub fixed_linear_reduction: bool,
    /// Reassemble when `defect / prev_defect` exceeds this ratio.
    #[serde(alias = "ReassembleThreshold")]
    pub reassemble_threshold: f64,
    /// Globalization strategy.
    #[serde(alias = "LineSearchStrategy")]
    pub line_search_strategy: LineSearchStrategy,
    /// Damping trials per line search.
    #[serde(alias = "LineSearchMaxIterations")]
    pub line_search_max_iterations: usize,
    /// Factor by which the damping shrinks between trials.
    #[serde(alias = "LineSearchDampingFactor", alias = "LineSearchDamping")]
    pub line_search_damping_factor: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            verbosity: DEFAULT_VERBOSITY,
            keep_matrix: true,
            reduction: DEFAULT_REDUCTION,
            absolute_limit: DEFAULT_ABSOLUTE_LIMIT,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            force_iteration: false,
            min_linear_reduction: DEFAULT_MIN_LINEAR_REDUCTION,
            fixed_linear_reduction: false,
            reassemble_threshold: DEFAULT_REASSEMBLE_THRESHOLD,
            line_search_strategy: LineSearchStrategy::default(),
            line_search_max_iterations: DEFAULT_LINE_SEARCH_MAX_ITERATIONS,
            line_search_damping_factor: DEFAULT_DAMPING_FACTOR,
        }
    }
}

impl NewtonConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from TOML.
    ///
    /// Options may sit at the top level or inside a `[newton]` table.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut table: toml::Table = s.parse()?;
        let table = match table.remove("newton") {
            Some(toml::Value::Table(section)) => section,
            Some(other) => {
                table.insert("newton".to_string(), other);
                table
            }
            None => table,
        };
        let config: Self = toml::Value::Table(table).try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| NewtonError::FileReadError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check that every option is in range.
    pub fn validate(&self) -> Result<()> {
        if self.verbosity > MAX_VERBOSITY {
            return Err(NewtonError::invalid_parameter(
                "verbosity",
                format!("must be at most {MAX_VERBOSITY}"),
            ));
        }
        non_negative("reduction", self.reduction)?;
        non_negative("absolute_limit", self.absolute_limit)?;
        non_negative("reassemble_threshold", self.reassemble_threshold)?;
        non_negative("min_linear_reduction", self.min_linear_reduction)?;
        if !(self.line_search_damping_factor > 0.0 && self.line_search_damping_factor <= 1.0) {
            return Err(NewtonError::invalid_parameter(
                "line_search_damping_factor",
                "must lie in (0, 1]",
            ));
        }
        Ok(())
    }

    /// Set the verbosity level (0-4).
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Keep or drop the Jacobian between solves.
    pub fn with_keep_matrix(mut self, keep_matrix: bool) -> Self {
        self.keep_matrix = keep_matrix;
        self
    }

    /// Set the relative convergence tolerance.
    pub fn with_reduction(mut self, reduction: f64) -> Self {
        self.reduction = reduction;
        self
    }

    /// Set the absolute convergence tolerance.
    pub fn with_absolute_limit(mut self, absolute_limit: f64) -> Self {
        self.absolute_limit = absolute_limit;
        self
    }

    /// Set the maximum number of Newton iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Force at least one iteration.
    pub fn with_force_iteration(mut self, force_iteration: bool) -> Self {
        self.force_iteration = force_iteration;
        self
    }

    /// Set the loosest linear reduction ever requested.
    ///
    /// The adaptive rule requests the minimum of this value and the
    /// reduction needed for second order convergence.
    pub fn with_min_linear_reduction(mut self, min_linear_reduction: f64) -> Self {
        self.min_linear_reduction = min_linear_reduction;
        self
    }

    /// Always request `min_linear_reduction`.
    pub fn with_fixed_linear_reduction(mut self, fixed_linear_reduction: bool) -> Self {
        self.fixed_linear_reduction = fixed_linear_reduction;
        self
    }

    /// Set the defect ratio above which the Jacobian is reassembled.
    ///
    /// - 0.0 (default): reassemble every iteration
    /// - 0.1 - 0.5: reuse the Jacobian while Newton converges fast
    /// - >= 1.0: reassemble only when forced by a failed line search
    pub fn with_reassemble_threshold(mut self, reassemble_threshold: f64) -> Self {
        self.reassemble_threshold = reassemble_threshold;
        self
    }

    /// Set the line search strategy.
    pub fn with_line_search_strategy(mut self, strategy: LineSearchStrategy) -> Self {
        self.line_search_strategy = strategy;
        self
    }

    /// Set the number of damping trials per line search.
    pub fn with_line_search_max_iterations(mut self, max_iterations: usize) -> Self {
        self.line_search_max_iterations = max_iterations;
        self
    }

    /// Set the damping shrink factor.
    pub fn with_line_search_damping_factor(mut self, damping_factor: f64) -> Self {
        self.line_search_damping_factor = damping_factor;
        self
    }
}

fn non_negative(param: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(NewtonError::invalid_parameter(param, "must be finite and non-negative"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = NewtonConfig::default();
        assert_eq!(config.verbosity, 1);
        assert!(config.keep_matrix);
        assert_eq!(config.reduction, 1e-8);
        assert_eq!(config.absolute_limit, 1e-12);
        assert_eq!(config.max_iterations, 40);
        assert!(!config.force_iteration);
        assert_eq!(config.min_linear_reduction, 1e-3);
        assert!(!config.fixed_linear_reduction);
        assert_eq!(config.reassemble_threshold, 0.0);
        assert_eq!(config.line_search_strategy, LineSearchStrategy::BacktrackRequireDecrease);
        assert_eq!(config.line_search_max_iterations, 10);
        assert_eq!(config.line_search_damping_factor, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parameter_tree_keys() {
        let config = NewtonConfig::from_toml_str(
            r#"
            [newton]
            ReassembleThreshold = 0.1
            LineSearchMaxIterations = 12
            MaxIterations = 7
            AbsoluteLimit = 1e-6
            Reduction = 1e-4
            MinLinearReduction = 1e-2
            LineSearchDamping = 0.9
            LineSearchStrategy = "hackbuschReuskenAcceptBest"
            KeepMatrix = false
            "#,
        )
        .unwrap();

        assert_eq!(config.reassemble_threshold, 0.1);
        assert_eq!(config.line_search_max_iterations, 12);
        assert_eq!(config.max_iterations, 7);
        assert_eq!(config.absolute_limit, 1e-6);
        assert_eq!(config.reduction, 1e-4);
        assert_eq!(config.min_linear_reduction, 1e-2);
        assert_eq!(config.line_search_damping_factor, 0.9);
        assert_eq!(config.line_search_strategy, LineSearchStrategy::BacktrackAcceptBest);
        assert!(!config.keep_matrix);
        // Untouched keys keep their defaults
        assert_eq!(config.verbosity, 1);
    }

    #[test]
    fn test_snake_case_top_level() {
        let config = NewtonConfig::from_toml_str(
            "max_iterations = 3\nline_search_strategy = \"none\"\nforce_iteration = true\n",
        )
        .unwrap();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.line_search_strategy, LineSearchStrategy::None);
        assert!(config.force_iteration);
    }

    #[test]
    fn test_rejects_unknown_keys_and_bad_values() {
        assert!(matches!(
            NewtonConfig::from_toml_str("MaxIteration = 3"),
            Err(NewtonError::ConfigParse(_))
        ));
        assert!(matches!(
            NewtonConfig::from_toml_str("line_search_strategy = \"wolfe\""),
            Err(NewtonError::ConfigParse(_))
        ));
        assert!(matches!(
            NewtonConfig::from_toml_str("line_search_damping_factor = 1.5"),
            Err(NewtonError::InvalidParameter { .. })
        ));
        assert!(matches!(
            NewtonConfig::new().with_verbosity(5).validate(),
            Err(NewtonError::InvalidParameter { .. })
        ));
        assert!(matches!(
            NewtonConfig::new().with_reduction(f64::NAN).validate(),
            Err(NewtonError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = NewtonConfig::new()
            .with_reassemble_threshold(0.25)
            .with_line_search_strategy(LineSearchStrategy::BacktrackAcceptBest);
        let parsed = NewtonConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_range_boundaries() {
        // No damping and an exact linear solve are both legal
        assert!(NewtonConfig::new().with_line_search_damping_factor(1.0).validate().is_ok());
        assert!(NewtonConfig::new().with_min_linear_reduction(0.0).validate().is_ok());
        assert!(NewtonConfig::from_toml_str("min_linear_reduction = 0.0\nline_search_damping_factor = 1.0").is_ok());

        assert!(matches!(
            NewtonConfig::new().with_line_search_damping_factor(0.0).validate(),
            Err(NewtonError::InvalidParameter { .. })
        ));
        assert!(matches!(
            NewtonConfig::new().with_min_linear_reduction(-1e-3).validate(),
            Err(NewtonError::InvalidParameter { .. })
        ));
        assert!(matches!(
            NewtonConfig::new().with_min_linear_reduction(f64::INFINITY).validate(),
            Err(NewtonError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = NewtonConfig::from_file("/nonexistent/newton.toml").unwrap_err();
        assert!(matches!(err, NewtonError::FileReadError { .. }));
    }
}
