//! Incremental sweep runner for the UI.

use crate::payload::SweepPayload;
use anyhow::{bail, Context};
use js_sys::Float64Array;
use rhythm_core::config::{run_sweep_point, SweepConfig};
use rhythm_core::sweep::{BifurcationResult, SweepPoint};
use serde::Serialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct SweepProgress {
    pub(crate) done: bool,
    pub(crate) current_point: usize,
    pub(crate) total_points: usize,
}

/// Sweep points evaluated a batch at a time, in sweep order.
pub(crate) struct SweepBatches {
    config: SweepConfig,
    values: Vec<f64>,
    points: Vec<SweepPoint>,
}

impl SweepBatches {
    pub(crate) fn new(config: SweepConfig) -> anyhow::Result<Self> {
        config.validate().context("Invalid sweep configuration")?;
        let values = config.sweep.values();
        Ok(Self {
            points: Vec::with_capacity(values.len()),
            values,
            config,
        })
    }

    pub(crate) fn is_done(&self) -> bool {
        self.points.len() >= self.values.len()
    }

    pub(crate) fn values(&self) -> &[f64] {
        &self.values
    }

    pub(crate) fn run_points(&mut self, batch_size: usize) -> anyhow::Result<SweepProgress> {
        for _ in 0..batch_size {
            if self.is_done() {
                break;
            }
            let value = self.values[self.points.len()];
            let point = run_sweep_point(&self.config, value)
                .with_context(|| format!("Could not run sweep point {}", value))?;
            self.points.push(point);
        }
        Ok(self.progress())
    }

    /// Marks every point not yet run as cancelled.
    pub(crate) fn cancel(&mut self) {
        self.points.resize(self.values.len(), SweepPoint::Cancelled);
    }

    pub(crate) fn progress(&self) -> SweepProgress {
        SweepProgress {
            done: self.is_done(),
            current_point: self.points.len(),
            total_points: self.values.len(),
        }
    }

    pub(crate) fn result(&self) -> anyhow::Result<SweepPayload> {
        if !self.is_done() {
            bail!(
                "Sweep still running ({} of {} points)",
                self.points.len(),
                self.values.len()
            );
        }
        let result = BifurcationResult {
            parameter: self.config.sweep.parameter.clone(),
            values: self.values.clone(),
            points: self.points.clone(),
        };
        Ok(SweepPayload::new(
            result,
            self.config.simulation.model.dimension(),
        ))
    }
}

#[wasm_bindgen]
pub struct WasmSweepRunner {
    state: SweepBatches,
}

#[wasm_bindgen]
impl WasmSweepRunner {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<WasmSweepRunner, JsValue> {
        console_error_panic_hook::set_once();

        let config: SweepConfig = from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid sweep config: {}", e)))?;
        let state = SweepBatches::new(config).map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;
        Ok(WasmSweepRunner { state })
    }

    pub fn is_done(&self) -> bool {
        self.state.is_done()
    }

    pub fn run_points(&mut self, batch_size: u32) -> Result<JsValue, JsValue> {
        let progress = self
            .state
            .run_points(batch_size as usize)
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;
        to_value(&progress).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn cancel(&mut self) {
        self.state.cancel();
    }

    /// Swept parameter values, in sweep order.
    pub fn values(&self) -> Float64Array {
        Float64Array::from(self.state.values())
    }

    pub fn get_progress(&self) -> Result<JsValue, JsValue> {
        to_value(&self.state.progress())
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    pub fn get_result(&self) -> Result<JsValue, JsValue> {
        let payload = self
            .state
            .result()
            .map_err(|e| JsValue::from_str(&format!("{:#}", e)))?;
        to_value(&payload).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }
}
