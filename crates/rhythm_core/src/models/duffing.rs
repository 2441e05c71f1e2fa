use crate::error::{Result, RhythmError};
use crate::traits::{Model, ParameterSet};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const DUFFING_NAMES: &[&str] = &["gamma", "alpha", "omega"];

/// Damping `gamma`, forcing amplitude `alpha`, forcing angular frequency `omega`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuffingParams {
    pub gamma: f64,
    pub alpha: f64,
    pub omega: f64,
}

impl Default for DuffingParams {
    fn default() -> Self {
        Self {
            gamma: 0.2,
            alpha: 2.5,
            omega: 0.36,
        }
    }
}

impl ParameterSet for DuffingParams {
    fn names(&self) -> &'static [&'static str] {
        DUFFING_NAMES
    }

    fn get(&self, name: &str) -> Option<f64> {
        match name {
            "gamma" => Some(self.gamma),
            "alpha" => Some(self.alpha),
            "omega" => Some(self.omega),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "gamma" => self.gamma = value,
            "alpha" => self.alpha = value,
            "omega" => self.omega = value,
            _ => {
                return Err(RhythmError::invalid(format!(
                    "Duffing oscillator has no parameter '{name}'"
                )))
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in [("gamma", self.gamma), ("alpha", self.alpha), ("omega", self.omega)] {
            if !value.is_finite() {
                return Err(RhythmError::invalid(format!(
                    "parameter {name} must be finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Periodically forced Duffing oscillator.
///
/// State `[x, y, z]`; `z` is a phase accumulator advancing by one per forcing
/// period, which keeps the system autonomous:
///
/// ```text
/// dx/dt = y
/// dy/dt = -x - x^3 - gamma * y + alpha * cos(2 pi z)
/// dz/dt = omega / (2 pi)
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Duffing;

impl Duffing {
    /// Index of the forcing phase accumulator in the state.
    pub const PHASE_INDEX: usize = 2;
}

impl Model for Duffing {
    type Params = DuffingParams;

    fn name(&self) -> &'static str {
        "duffing"
    }

    fn dimension(&self, _params: &DuffingParams) -> usize {
        3
    }

    fn evaluate(&self, _t: f64, state: &[f64], p: &DuffingParams, out: &mut [f64]) {
        let (x, y, z) = (state[0], state[1], state[2]);
        out[0] = y;
        out[1] = -x - x * x * x - p.gamma * y + p.alpha * (2.0 * PI * z).cos();
        out[2] = p.omega / (2.0 * PI);
    }
}
