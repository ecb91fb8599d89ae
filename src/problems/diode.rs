//! Diode clipper ladder.
//!
//! A source `v_in` drives a chain of `stages` nodes through equal series
//! resistors; every node is clamped to ground by a diode. Kirchhoff's
//! current law at node `k` gives
//!
//! ```text
//! F_k(v) = (v_k - v_{k-1}) / R + (v_k - v_{k+1}) / R + I_d(v_k)
//! ```
//!
//! with `v_0 = v_in` and no right neighbour at the last node. The diode
//! follows the Shockley equation
//!
//! ```text
//! I_d(v) = Is * (exp(v / (n * Vt)) - 1)
//! ```
//!
//! without any voltage limiting, so a full Newton step from a cold start
//! overflows the exponential and the line search has to damp it.

use std::convert::Infallible;

use crate::error::{NewtonError, Result};
use crate::linalg::DenseMatrix;
use crate::problem::NonlinearProblem;

/// Thermal voltage at room temperature (V).
pub const THERMAL_VOLTAGE: f64 = 0.025852;

/// Shockley model parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiodeParams {
    /// Saturation current (Is), typically 1e-14 to 1e-12 A
    pub is: f64,
    /// Ideality factor (n), typically 1.0 to 2.0
    pub n: f64,
}

impl Default for DiodeParams {
    fn default() -> Self {
        Self { is: 1e-14, n: 1.0 }
    }
}

impl DiodeParams {
    /// Germanium diode (lower forward voltage).
    pub fn germanium() -> Self {
        Self { is: 1e-9, n: 1.5 }
    }

    /// Thermal voltage times ideality factor.
    pub fn n_vt(&self) -> f64 {
        self.n * THERMAL_VOLTAGE
    }

    /// Diode current at voltage `v`.
    pub fn current(&self, v: f64) -> f64 {
        self.is * ((v / self.n_vt()).exp() - 1.0)
    }

    /// dI/dV at voltage `v`.
    pub fn conductance(&self, v: f64) -> f64 {
        self.is / self.n_vt() * (v / self.n_vt()).exp()
    }
}

/// Resistor ladder with a diode to ground at every node.
#[derive(Debug, Clone)]
pub struct DiodeClipper {
    stages: usize,
    v_in: f64,
    conductance: f64,
    diode: DiodeParams,
}

impl DiodeClipper {
    /// `stages` nodes, source voltage `v_in`, series resistance `resistance` (ohms).
    pub fn new(stages: usize, v_in: f64, resistance: f64) -> Result<Self> {
        if stages == 0 {
            return Err(NewtonError::invalid_parameter("stages", "need at least one node"));
        }
        if !(resistance > 0.0) || !resistance.is_finite() {
            return Err(NewtonError::invalid_parameter("resistance", "must be positive and finite"));
        }
        if !v_in.is_finite() {
            return Err(NewtonError::invalid_parameter("v_in", "must be finite"));
        }
        Ok(Self {
            stages,
            v_in,
            conductance: 1.0 / resistance,
            diode: DiodeParams::default(),
        })
    }

    /// Replace the diode model.
    pub fn with_diode(mut self, diode: DiodeParams) -> Self {
        self.diode = diode;
        self
    }

    pub fn diode(&self) -> &DiodeParams {
        &self.diode
    }

    pub fn v_in(&self) -> f64 {
        self.v_in
    }

    /// Current drawn from the source at node voltages `v`.
    pub fn source_current(&self, v: &[f64]) -> f64 {
        (self.v_in - v[0]) * self.conductance
    }
}

impl NonlinearProblem for DiodeClipper {
    type Jacobian = DenseMatrix;
    type Error = Infallible;

    fn size(&self) -> usize {
        self.stages
    }

    fn new_jacobian(&self) -> DenseMatrix {
        DenseMatrix::new(self.stages)
    }

    fn residual(&self, v: &[f64], r: &mut [f64]) -> std::result::Result<(), Infallible> {
        let g = self.conductance;
        for k in 0..self.stages {
            let left = if k > 0 { v[k - 1] } else { self.v_in };
            r[k] = (v[k] - left) * g + self.diode.current(v[k]);
            if k + 1 < self.stages {
                r[k] += (v[k] - v[k + 1]) * g;
            }
        }
        Ok(())
    }

    fn jacobian(&self, v: &[f64], a: &mut DenseMatrix) -> std::result::Result<(), Infallible> {
        let g = self.conductance;
        for k in 0..self.stages {
            a.set(k, k, g + self.diode.conductance(v[k]));
            if k > 0 {
                a.set(k, k - 1, -g);
            }
            if k + 1 < self.stages {
                a.add(k, k, g);
                a.set(k, k + 1, -g);
            }
        }
        Ok(())
    }
}
