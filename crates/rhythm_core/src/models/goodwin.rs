//! Goodwin negative-feedback loop: x activates y, y activates z, z represses x.
//!
//! ```text
//! dx/dt = v1 * K1^n / (K1^n + z^n) - v2 * x / (K2 + x)
//! dy/dt = v3 * x - v4 * y / (K4 + y)
//! dz/dt = v5 * y - v6 * z / (K6 + z)
//! ```
//!
//! The positive-feedback variant multiplies the repression term by
//! `(1 + c * x)`, which lets the loop oscillate at lower Hill exponents.

use crate::error::{Result, RhythmError};
use crate::traits::{Model, ParameterSet};
use serde::{Deserialize, Serialize};

const GOODWIN_NAMES: &[&str] = &[
    "v1", "v2", "v3", "v4", "v5", "v6", "K1", "K2", "K4", "K6", "n",
];

const FEEDBACK_NAMES: &[&str] = &[
    "v1", "v2", "v3", "v4", "v5", "v6", "K1", "K2", "K4", "K6", "n", "c",
];

/// Rates `v1..v6`, half-saturation constants `K1, K2, K4, K6` and Hill exponent `n`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoodwinParams {
    pub v1: f64,
    pub v2: f64,
    pub v3: f64,
    pub v4: f64,
    pub v5: f64,
    pub v6: f64,
    #[serde(rename = "K1")]
    pub k1: f64,
    #[serde(rename = "K2")]
    pub k2: f64,
    #[serde(rename = "K4")]
    pub k4: f64,
    #[serde(rename = "K6")]
    pub k6: f64,
    pub n: f64,
}

impl Default for GoodwinParams {
    fn default() -> Self {
        Self {
            v1: 0.7,
            v2: 0.45,
            v3: 0.7,
            v4: 0.35,
            v5: 0.7,
            v6: 0.35,
            k1: 1.0,
            k2: 1.0,
            k4: 1.0,
            k6: 1.0,
            n: 7.0,
        }
    }
}

impl GoodwinParams {
    fn slot(&mut self, name: &str) -> Option<&mut f64> {
        match name {
            "v1" => Some(&mut self.v1),
            "v2" => Some(&mut self.v2),
            "v3" => Some(&mut self.v3),
            "v4" => Some(&mut self.v4),
            "v5" => Some(&mut self.v5),
            "v6" => Some(&mut self.v6),
            "K1" => Some(&mut self.k1),
            "K2" => Some(&mut self.k2),
            "K4" => Some(&mut self.k4),
            "K6" => Some(&mut self.k6),
            "n" => Some(&mut self.n),
            _ => None,
        }
    }

    fn values(&self) -> [(&'static str, f64); 11] {
        [
            ("v1", self.v1),
            ("v2", self.v2),
            ("v3", self.v3),
            ("v4", self.v4),
            ("v5", self.v5),
            ("v6", self.v6),
            ("K1", self.k1),
            ("K2", self.k2),
            ("K4", self.k4),
            ("K6", self.k6),
            ("n", self.n),
        ]
    }
}

impl ParameterSet for GoodwinParams {
    fn names(&self) -> &'static [&'static str] {
        GOODWIN_NAMES
    }

    fn get(&self, name: &str) -> Option<f64> {
        self.values()
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    fn set(&mut self, name: &str, value: f64) -> Result<()> {
        let slot = self.slot(name).ok_or_else(|| {
            RhythmError::invalid(format!("Goodwin model has no parameter '{name}'"))
        })?;
        *slot = value;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, value) in self.values() {
            if !value.is_finite() {
                return Err(RhythmError::invalid(format!(
                    "parameter {name} must be finite, got {value}"
                )));
            }
        }
        for (name, value) in [("K1", self.k1), ("K2", self.k2), ("K4", self.k4), ("K6", self.k6)] {
            if value <= 0.0 {
                return Err(RhythmError::invalid(format!(
                    "half-saturation constant {name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Goodwin parameters plus the self-activation strength `c`.
///
/// Fields missing from a serialized bundle take the plain Goodwin defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoodwinFeedbackParams {
    #[serde(flatten)]
    pub goodwin: GoodwinParams,
    pub c: f64,
}

impl Default for GoodwinFeedbackParams {
    fn default() -> Self {
        Self {
            goodwin: GoodwinParams::default(),
            c: 1.0,
        }
    }
}

impl ParameterSet for GoodwinFeedbackParams {
    fn names(&self) -> &'static [&'static str] {
        FEEDBACK_NAMES
    }

    fn get(&self, name: &str) -> Option<f64> {
        match name {
            "c" => Some(self.c),
            _ => self.goodwin.get(name),
        }
    }

    fn set(&mut self, name: &str, value: f64) -> Result<()> {
        match name {
            "c" => {
                self.c = value;
                Ok(())
            }
            _ => self.goodwin.set(name, value),
        }
    }

    fn validate(&self) -> Result<()> {
        self.goodwin.validate()?;
        if !self.c.is_finite() {
            return Err(RhythmError::invalid(format!(
                "parameter c must be finite, got {}",
                self.c
            )));
        }
        Ok(())
    }
}

fn goodwin_rhs(state: &[f64], p: &GoodwinParams, activation: f64, out: &mut [f64]) {
    let (x, y, z) = (state[0], state[1], state[2]);
    let k1n = p.k1.powf(p.n);
    let repression = k1n / (k1n + z.powf(p.n));

    out[0] = p.v1 * repression * activation - p.v2 * x / (p.k2 + x);
    out[1] = p.v3 * x - p.v4 * y / (p.k4 + y);
    out[2] = p.v5 * y - p.v6 * z / (p.k6 + z);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Goodwin;

impl Model for Goodwin {
    type Params = GoodwinParams;

    fn name(&self) -> &'static str {
        "goodwin"
    }

    fn dimension(&self, _params: &GoodwinParams) -> usize {
        3
    }

    fn evaluate(&self, _t: f64, state: &[f64], params: &GoodwinParams, out: &mut [f64]) {
        goodwin_rhs(state, params, 1.0, out);
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GoodwinFeedback;

impl Model for GoodwinFeedback {
    type Params = GoodwinFeedbackParams;

    fn name(&self) -> &'static str {
        "goodwin_feedback"
    }

    fn dimension(&self, _params: &GoodwinFeedbackParams) -> usize {
        3
    }

    fn evaluate(&self, _t: f64, state: &[f64], params: &GoodwinFeedbackParams, out: &mut [f64]) {
        goodwin_rhs(state, &params.goodwin, 1.0 + params.c * state[0], out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goodwin_matches_hand_evaluation() {
        let params = GoodwinParams {
            n: 2.0,
            k1: 2.0,
            ..GoodwinParams::default()
        };
        let state = [1.0, 2.0, 3.0];
        let mut out = [0.0; 3];
        Goodwin.evaluate(0.0, &state, &params, &mut out);

        let dx = 0.7 * 4.0 / (4.0 + 9.0) - 0.45 * 1.0 / 2.0;
        let dy = 0.7 * 1.0 - 0.35 * 2.0 / 3.0;
        let dz = 0.7 * 2.0 - 0.35 * 3.0 / 4.0;
        assert!((out[0] - dx).abs() < 1e-14);
        assert!((out[1] - dy).abs() < 1e-14);
        assert!((out[2] - dz).abs() < 1e-14);
    }

    #[test]
    fn feedback_without_activation_equals_plain_goodwin() {
        let base = GoodwinParams::default();
        let params = GoodwinFeedbackParams { goodwin: base, c: 0.0 };
        let state = [0.4, 1.3, 0.8];
        let mut plain = [0.0; 3];
        let mut feedback = [0.0; 3];
        Goodwin.evaluate(5.0, &state, &base, &mut plain);
        GoodwinFeedback.evaluate(5.0, &state, &params, &mut feedback);
        assert_eq!(plain, feedback);
    }

    #[test]
    fn feedback_scales_production_term() {
        let base = GoodwinParams::default();
        let params = GoodwinFeedbackParams { goodwin: base, c: 2.0 };
        let state = [0.5, 0.0, 0.0];
        let mut out = [0.0; 3];
        GoodwinFeedback.evaluate(0.0, &state, &params, &mut out);
        // z = 0 leaves the repression term at 1.
        let expected = 0.7 * (1.0 + 2.0 * 0.5) - 0.45 * 0.5 / 1.5;
        assert!((out[0] - expected).abs() < 1e-14);
    }

    #[test]
    fn parameters_are_addressed_by_name() {
        let mut params = GoodwinFeedbackParams::default();
        params.set("v4", 0.9).expect("set v4");
        params.set("c", 3.0).expect("set c");
        assert_eq!(params.get("v4"), Some(0.9));
        assert_eq!(params.goodwin.v4, 0.9);
        assert_eq!(params.get("c"), Some(3.0));
        assert_eq!(params.get("K3"), None);
        assert!(params.set("K3", 1.0).is_err());
        assert_eq!(params.names().len(), 12);
    }

    #[test]
    fn validate_rejects_bad_constants() {
        let mut params = GoodwinParams::default();
        params.k2 = 0.0;
        assert!(params.validate().is_err());
        let mut params = GoodwinParams::default();
        params.v1 = f64::NAN;
        assert!(params.validate().is_err());
        assert!(GoodwinParams::default().validate().is_ok());
    }

    #[test]
    fn params_deserialize_with_upper_case_constants() {
        let json = r#"{"v1":0.7,"v2":0.45,"v3":0.7,"v4":0.35,"v5":0.7,"v6":0.35,
            "K1":1,"K2":1,"K4":1,"K6":1,"n":7,"c":0.5}"#;
        let params: GoodwinFeedbackParams = serde_json::from_str(json).expect("params");
        assert_eq!(params.goodwin.k6, 1.0);
        assert_eq!(params.c, 0.5);
    }

    #[test]
    fn empty_feedback_bundle_matches_default() {
        let params: GoodwinFeedbackParams = serde_json::from_str("{}").expect("params");
        assert_eq!(params, GoodwinFeedbackParams::default());
        assert_eq!(params.goodwin.n, 7.0);
    }
}
