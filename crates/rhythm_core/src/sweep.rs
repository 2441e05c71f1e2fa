//! One-parameter bifurcation sweeps.
//!
//! Every swept value gets its own parameter clone, integration and window
//! analysis. Points are independent, so they are spread over the rayon pool
//! and collected back in sweep order.

use crate::error::{Result, RhythmError};
use crate::integrator::Integrator;
use crate::postprocess::{analyze_window, DimensionSummary};
use crate::traits::{Model, ParameterSet};
use crate::trajectory::{arange_len, TimeGrid};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Half-open range `start, start + step, ...` with `stop` excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRange {
    pub parameter: String,
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl SweepRange {
    pub fn new(parameter: impl Into<String>, start: f64, stop: f64, step: f64) -> Result<Self> {
        let range = Self {
            parameter: parameter.into(),
            start,
            stop,
            step,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || !self.stop.is_finite() || !self.step.is_finite() {
            return Err(RhythmError::invalid("sweep bounds must be finite"));
        }
        if self.step <= 0.0 {
            return Err(RhythmError::invalid(format!(
                "sweep step must be positive, got {}",
                self.step
            )));
        }
        if self.start >= self.stop {
            return Err(RhythmError::invalid(format!(
                "sweep interval is empty: start {} >= stop {}",
                self.start, self.stop
            )));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        arange_len(self.start, self.stop, self.step)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn value(&self, index: usize) -> f64 {
        self.start + index as f64 * self.step
    }

    pub fn values(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.value(i)).collect()
    }
}

/// Shared flag that stops a sweep from starting further points.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct SweepOptions {
    pub integrator: Integrator,
    /// Run points on the rayon pool; `false` runs them in order on the caller's thread.
    pub parallel: bool,
    pub cancel: Option<CancelToken>,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            integrator: Integrator::default(),
            parallel: true,
            cancel: None,
        }
    }
}

/// Outcome of one swept value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SweepPoint {
    Completed { dimensions: Vec<DimensionSummary> },
    Failed { error: RhythmError },
    /// Not started because the sweep was cancelled.
    Cancelled,
}

impl SweepPoint {
    pub fn summary(&self, dimension: usize) -> Option<&DimensionSummary> {
        match self {
            SweepPoint::Completed { dimensions } => dimensions.get(dimension),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SweepPoint::Completed { .. })
    }
}

/// Swept values and their outcomes, index-aligned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BifurcationResult {
    pub parameter: String,
    pub values: Vec<f64>,
    pub points: Vec<SweepPoint>,
}

impl BifurcationResult {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Normalized maxima of `dimension`, `None` where the point did not complete.
    pub fn maxima(&self, dimension: usize) -> Vec<Option<f64>> {
        self.points
            .iter()
            .map(|p| p.summary(dimension).map(|s| s.max))
            .collect()
    }

    pub fn minima(&self, dimension: usize) -> Vec<Option<f64>> {
        self.points
            .iter()
            .map(|p| p.summary(dimension).map(|s| s.min))
            .collect()
    }

    /// Periods of `dimension`; `None` for failed points and for windows without two maxima.
    pub fn periods(&self, dimension: usize) -> Vec<Option<f64>> {
        self.points
            .iter()
            .map(|p| p.summary(dimension).and_then(|s| s.period))
            .collect()
    }

    pub fn completed(&self) -> usize {
        self.points.iter().filter(|p| p.is_completed()).count()
    }

    pub fn failed(&self) -> usize {
        self.points
            .iter()
            .filter(|p| matches!(p, SweepPoint::Failed { .. }))
            .count()
    }

    pub fn cancelled(&self) -> usize {
        self.points
            .iter()
            .filter(|p| matches!(p, SweepPoint::Cancelled))
            .count()
    }
}

/// Sweeps `range.parameter` and analyzes the last `retained_window` rows of each run.
///
/// Everything that does not depend on the swept value is checked up front and
/// rejected with `InvalidConfiguration`. Errors raised while running a point
/// are stored in that point and the sweep moves on.
pub fn sweep<M: Model>(
    model: &M,
    base_params: &M::Params,
    range: &SweepRange,
    initial_state: &[f64],
    grid: &TimeGrid,
    retained_window: usize,
    options: &SweepOptions,
) -> Result<BifurcationResult> {
    range.validate()?;
    grid.validate()?;
    base_params.validate()?;
    options.integrator.settings().validate()?;

    if base_params.get(&range.parameter).is_none() {
        return Err(RhythmError::invalid(format!(
            "model {} has no parameter '{}' (available: {})",
            model.name(),
            range.parameter,
            base_params.names().join(", ")
        )));
    }
    let dim = model.dimension(base_params);
    if initial_state.len() != dim {
        return Err(RhythmError::invalid(format!(
            "initial state dimension mismatch for {}: expected {}, got {}",
            model.name(),
            dim,
            initial_state.len()
        )));
    }
    if retained_window < 2 || retained_window > grid.len() {
        return Err(RhythmError::invalid(format!(
            "retained window must be between 2 and {} samples, got {}",
            grid.len(),
            retained_window
        )));
    }

    let values = range.values();
    info!(
        model = model.name(),
        parameter = %range.parameter,
        points = values.len(),
        parallel = options.parallel,
        "starting sweep"
    );

    let run_point = |value: f64| -> SweepPoint {
        if options.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return SweepPoint::Cancelled;
        }
        sweep_point(
            model,
            base_params,
            &range.parameter,
            value,
            initial_state,
            grid,
            retained_window,
            &options.integrator,
        )
    };

    let points: Vec<SweepPoint> = if options.parallel {
        values.par_iter().map(|&value| run_point(value)).collect()
    } else {
        values.iter().map(|&value| run_point(value)).collect()
    };

    let result = BifurcationResult {
        parameter: range.parameter.clone(),
        values,
        points,
    };
    info!(
        completed = result.completed(),
        failed = result.failed(),
        cancelled = result.cancelled(),
        "sweep finished"
    );
    Ok(result)
}

/// Runs a single sweep point; failures are folded into the returned point.
#[allow(clippy::too_many_arguments)]
pub fn sweep_point<M: Model>(
    model: &M,
    base_params: &M::Params,
    parameter: &str,
    value: f64,
    initial_state: &[f64],
    grid: &TimeGrid,
    retained_window: usize,
    integrator: &Integrator,
) -> SweepPoint {
    let outcome = evaluate_point(
        model,
        base_params,
        parameter,
        value,
        initial_state,
        grid,
        retained_window,
        integrator,
    );
    match outcome {
        Ok(dimensions) => {
            debug!(parameter, value, "sweep point completed");
            SweepPoint::Completed { dimensions }
        }
        Err(error) => {
            warn!(parameter, value, %error, "sweep point failed");
            SweepPoint::Failed { error }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn evaluate_point<M: Model>(
    model: &M,
    base_params: &M::Params,
    parameter: &str,
    value: f64,
    initial_state: &[f64],
    grid: &TimeGrid,
    retained_window: usize,
    integrator: &Integrator,
) -> Result<Vec<DimensionSummary>> {
    let mut params = base_params.clone();
    params.set(parameter, value)?;
    params.validate()?;
    let trajectory = integrator.integrate(model, initial_state, grid, &params)?;
    Ok(analyze_window(&trajectory, retained_window)?.dimensions)
}
