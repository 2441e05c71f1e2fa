//! One-shot simulation and sweep entry points.

use crate::payload::{SimulationPayload, SweepPayload};
use anyhow::Context;
use rhythm_core::config::{run_simulation, run_sweep, SimulationConfig, SweepConfig};
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub(crate) fn simulation_payload(config: &SimulationConfig) -> anyhow::Result<SimulationPayload> {
    let report = run_simulation(config)
        .with_context(|| format!("Simulation of {} failed", config.model.kind()))?;
    Ok(report.into())
}

pub(crate) fn sweep_payload(config: &SweepConfig) -> anyhow::Result<SweepPayload> {
    // No worker threads on wasm32; run the points in order there.
    let config = SweepConfig {
        parallel: config.parallel && cfg!(not(target_arch = "wasm32")),
        ..config.clone()
    };
    let result = run_sweep(&config, None)
        .with_context(|| format!("Sweep over '{}' failed", config.sweep.parameter))?;
    Ok(SweepPayload::new(result, config.simulation.model.dimension()))
}

#[wasm_bindgen]
pub fn simulate(config: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let config: SimulationConfig = from_value(config)
        .map_err(|e| JsValue::from_str(&format!("Invalid simulation config: {}", e)))?;
    let payload = simulation_payload(&config).map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;
    to_value(&payload).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub fn sweep(config: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();

    let config: SweepConfig = from_value(config)
        .map_err(|e| JsValue::from_str(&format!("Invalid sweep config: {}", e)))?;
    let payload = sweep_payload(&config).map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;
    to_value(&payload).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhythm_core::config::{ModelExtras, ModelSpec};
    use rhythm_core::integrator::IntegratorSettings;
    use rhythm_core::models::{DuffingParams, PhaseAmplitudeParams};
    use rhythm_core::sweep::SweepRange;
    use rhythm_core::trajectory::TimeGrid;
    use rhythm_core::RhythmError;

    fn heterogeneous_config() -> SimulationConfig {
        SimulationConfig {
            model: ModelSpec::Heterogeneous(PhaseAmplitudeParams::default()),
            initial_state: vec![1.0, 0.0],
            time_grid: TimeGrid::new(0.0, 96.0, 0.25).expect("grid"),
            retained_window: 240,
            integrator: IntegratorSettings::default(),
        }
    }

    #[test]
    fn simulation_payload_is_row_major() {
        let payload = simulation_payload(&heterogeneous_config()).expect("payload");
        assert_eq!(payload.model, "heterogeneous");
        assert_eq!(payload.times.len(), 384);
        assert_eq!(payload.states.len(), 384);
        assert_eq!(payload.states[0], vec![1.0, 0.0]);
        let normalized = payload.normalized.expect("normalized window");
        assert_eq!(normalized.values.len(), 240);
        assert_eq!(normalized.means.len(), 2);
        assert_eq!(payload.dimensions.len(), 2);
        let period = payload.dimensions[0].period.expect("period");
        assert!((period - 24.0).abs() < 0.05);
        assert!(payload.analysis_error.is_none());
        assert!(matches!(payload.extras, ModelExtras::Empty));
    }

    #[test]
    fn degenerate_window_is_carried_in_payload() {
        let config = SimulationConfig {
            model: ModelSpec::Duffing(DuffingParams {
                alpha: 0.0,
                ..DuffingParams::default()
            }),
            initial_state: vec![0.0, 0.0, 0.0],
            time_grid: TimeGrid::new(0.0, 10.0, 0.1).expect("grid"),
            retained_window: 20,
            integrator: IntegratorSettings::default(),
        };
        let payload = simulation_payload(&config).expect("payload");
        assert!(payload.normalized.is_none());
        assert_eq!(
            payload.analysis_error,
            Some(RhythmError::DegenerateSignal {
                dimensions: vec![0, 1]
            })
        );
    }

    #[test]
    fn configuration_errors_keep_context() {
        let mut config = heterogeneous_config();
        config.initial_state = vec![1.0];
        let err = simulation_payload(&config).expect_err("dimension mismatch");
        let message = format!("{:#}", err);
        assert!(message.contains("Simulation of heterogeneous failed"));
        assert!(message.contains("dimension mismatch"));
    }

    #[test]
    fn sweep_payload_has_per_dimension_arrays() {
        let config = SweepConfig {
            simulation: heterogeneous_config(),
            sweep: SweepRange::new("T", 20.0, 30.0, 5.0).expect("range"),
            parallel: true,
        };
        let payload = sweep_payload(&config).expect("payload");
        assert_eq!(payload.values, vec![20.0, 25.0]);
        assert_eq!(payload.maxima.len(), 2);
        assert_eq!(payload.periods[0].len(), 2);
        for (period, value) in payload.periods[0].iter().zip(&payload.values) {
            let period = period.expect("period");
            assert!((period - value).abs() < 0.05);
        }
    }
}
