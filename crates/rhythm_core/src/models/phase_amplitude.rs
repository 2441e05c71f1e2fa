//! Amplitude-phase (Poincaré) oscillators, alone or coupled via a mean-field.
//!
//! ```text
//! dx/dt = lambda * x * (A - r) - (2 pi / T) * y  [+ K * M]
//! dy/dt = lambda * y * (A - r) + (2 pi / T) * x
//! ```
//!
//! with `r = sqrt(x^2 + y^2)` and `M` the population mean of `x`.

use crate::error::{Result, RhythmError};
use crate::meanfield::{component_block, meanfield};
use crate::traits::{Model, ParameterSet};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const SINGLE_NAMES: &[&str] = &["A", "T", "lambda"];
const POPULATION_NAMES: &[&str] = &["A", "lambda", "K"];

fn check_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(RhythmError::invalid(format!(
            "parameter {name} must be finite, got {value}"
        )))
    }
}

fn check_period(value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(RhythmError::invalid(format!(
            "oscillator period must be positive, got {value}"
        )))
    }
}

#[inline]
fn relax_and_rotate(x: f64, y: f64, amplitude: f64, relaxation: f64, period: f64) -> (f64, f64) {
    let r = (x * x + y * y).sqrt();
    let omega = 2.0 * PI / period;
    let radial = relaxation * (amplitude - r);
    (radial * x - omega * y, radial * y + omega * x)
}

/// Amplitude `A`, intrinsic period `T` and amplitude relaxation rate `lambda`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseAmplitudeParams {
    #[serde(rename = "A")]
    pub amplitude: f64,
    #[serde(rename = "T")]
    pub period: f64,
    #[serde(rename = "lambda")]
    pub relaxation: f64,
}

impl Default for PhaseAmplitudeParams {
    fn default() -> Self {
        Self {
            amplitude: 1.0,
            period: 24.0,
            relaxation: 0.03,
        }
    }
}

impl ParameterSet for PhaseAmplitudeParams {
    fn names(&self) -> &'static [&'static str] {
        SINGLE_NAMES
    }

    fn get(&self, name: &str) -> Option<f64> {
        match name {
            "A" => Some(self.amplitude),
            "T" => Some(self.period),
            "lambda" => Some(self.relaxation),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "A" => self.amplitude = value,
            "T" => self.period = value,
            "lambda" => self.relaxation = value,
            _ => {
                return Err(RhythmError::invalid(format!(
                    "phase-amplitude oscillator has no parameter '{name}'"
                )))
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        check_finite("A", self.amplitude)?;
        check_finite("lambda", self.relaxation)?;
        check_period(self.period)
    }
}

/// A single uncoupled oscillator, state `[x, y]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseAmplitude;

impl Model for PhaseAmplitude {
    type Params = PhaseAmplitudeParams;

    fn name(&self) -> &'static str {
        "heterogeneous"
    }

    fn dimension(&self, _params: &PhaseAmplitudeParams) -> usize {
        2
    }

    fn evaluate(&self, _t: f64, state: &[f64], p: &PhaseAmplitudeParams, out: &mut [f64]) {
        let (dx, dy) = relax_and_rotate(state[0], state[1], p.amplitude, p.relaxation, p.period);
        out[0] = dx;
        out[1] = dy;
    }
}

/// Shared `A`, `lambda`, coupling `K` and one intrinsic period per oscillator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationParams {
    #[serde(rename = "A")]
    pub amplitude: f64,
    #[serde(rename = "lambda")]
    pub relaxation: f64,
    #[serde(rename = "K")]
    pub coupling: f64,
    pub periods: Vec<f64>,
}

impl PopulationParams {
    pub fn oscillators(&self) -> usize {
        self.periods.len()
    }

    /// The uncoupled parameters of oscillator `index`.
    pub fn member(&self, index: usize) -> Option<PhaseAmplitudeParams> {
        self.periods.get(index).map(|&period| PhaseAmplitudeParams {
            amplitude: self.amplitude,
            period,
            relaxation: self.relaxation,
        })
    }
}

impl ParameterSet for PopulationParams {
    fn names(&self) -> &'static [&'static str] {
        POPULATION_NAMES
    }

    fn get(&self, name: &str) -> Option<f64> {
        match name {
            "A" => Some(self.amplitude),
            "lambda" => Some(self.relaxation),
            "K" => Some(self.coupling),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "A" => self.amplitude = value,
            "lambda" => self.relaxation = value,
            "K" => self.coupling = value,
            _ => {
                return Err(RhythmError::invalid(format!(
                    "coupled population has no scalar parameter '{name}'"
                )))
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        check_finite("A", self.amplitude)?;
        check_finite("lambda", self.relaxation)?;
        check_finite("K", self.coupling)?;
        if self.periods.is_empty() {
            return Err(RhythmError::invalid(
                "coupled population needs at least one oscillator period",
            ));
        }
        self.periods.iter().try_for_each(|&period| check_period(period))
    }
}

/// `N` oscillators integrated as one `2N` state and coupled through the mean of `x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoupledPopulation;

impl Model for CoupledPopulation {
    type Params = PopulationParams;

    fn name(&self) -> &'static str {
        "coupled"
    }

    fn dimension(&self, params: &PopulationParams) -> usize {
        2 * params.oscillators()
    }

    fn evaluate(&self, _t: f64, state: &[f64], p: &PopulationParams, out: &mut [f64]) {
        let n = p.oscillators();
        let forcing = p.coupling * meanfield(n, component_block(state, n, 0));

        for (i, &period) in p.periods.iter().enumerate() {
            let (dx, dy) = relax_and_rotate(state[i], state[n + i], p.amplitude, p.relaxation, period);
            out[i] = dx + forcing;
            out[n + i] = dy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_limit_cycle_motion_is_pure_rotation() {
        let params = PhaseAmplitudeParams::default();
        let mut out = [0.0; 2];
        PhaseAmplitude.evaluate(0.0, &[1.0, 0.0], &params, &mut out);
        assert!(out[0].abs() < 1e-15);
        assert!((out[1] - 2.0 * PI / 24.0).abs() < 1e-15);
    }

    #[test]
    fn off_cycle_states_relax_towards_amplitude() {
        let params = PhaseAmplitudeParams {
            amplitude: 1.0,
            period: 10.0,
            relaxation: 0.5,
        };
        let mut out = [0.0; 2];
        PhaseAmplitude.evaluate(0.0, &[2.0, 0.0], &params, &mut out);
        assert!((out[0] - 0.5 * 2.0 * (1.0 - 2.0)).abs() < 1e-15);
        assert!((out[1] - 2.0 * PI / 10.0 * 2.0).abs() < 1e-15);
    }

    #[test]
    fn coupling_adds_scaled_mean_field_to_x_only() {
        let params = PopulationParams {
            amplitude: 1.0,
            relaxation: 0.1,
            coupling: 0.5,
            periods: vec![20.0, 25.0],
        };
        let uncoupled = PopulationParams {
            coupling: 0.0,
            ..params.clone()
        };
        let state = [0.6, -0.2, 0.1, 0.9];
        let mut coupled_out = [0.0; 4];
        let mut free_out = [0.0; 4];
        CoupledPopulation.evaluate(0.0, &state, &params, &mut coupled_out);
        CoupledPopulation.evaluate(0.0, &state, &uncoupled, &mut free_out);

        let forcing = 0.5 * (0.6 - 0.2) / 2.0;
        assert!((coupled_out[0] - free_out[0] - forcing).abs() < 1e-15);
        assert!((coupled_out[1] - free_out[1] - forcing).abs() < 1e-15);
        assert_eq!(coupled_out[2], free_out[2]);
        assert_eq!(coupled_out[3], free_out[3]);
    }

    #[test]
    fn population_members_match_single_oscillator() {
        let params = PopulationParams {
            amplitude: 1.2,
            relaxation: 0.03,
            coupling: 0.0,
            periods: vec![22.0, 26.0],
        };
        let state = [0.3, -0.7, 0.8, 0.1];
        let mut population = [0.0; 4];
        CoupledPopulation.evaluate(1.0, &state, &params, &mut population);
        for i in 0..2 {
            let member = params.member(i).expect("member");
            let mut single = [0.0; 2];
            PhaseAmplitude.evaluate(1.0, &[state[i], state[2 + i]], &member, &mut single);
            assert_eq!(single[0], population[i]);
            assert_eq!(single[1], population[2 + i]);
        }
        assert_eq!(CoupledPopulation.dimension(&params), 4);
    }

    #[test]
    fn validate_rejects_malformed_bundles() {
        let mut params = PhaseAmplitudeParams::default();
        params.period = 0.0;
        assert!(params.validate().is_err());

        let population = PopulationParams {
            amplitude: 1.0,
            relaxation: 0.03,
            coupling: 0.1,
            periods: vec![],
        };
        assert!(population.validate().is_err());
        let population = PopulationParams {
            periods: vec![24.0, -1.0],
            ..population
        };
        assert!(population.validate().is_err());
    }

    #[test]
    fn population_exposes_only_scalars_for_sweeps() {
        let mut params = PopulationParams {
            amplitude: 1.0,
            relaxation: 0.03,
            coupling: 0.0,
            periods: vec![24.0],
        };
        params.set("K", 0.2).expect("set K");
        assert_eq!(params.get("K"), Some(0.2));
        assert!(params.set("T", 10.0).is_err());
        assert!(params.get("periods").is_none());
    }
}
