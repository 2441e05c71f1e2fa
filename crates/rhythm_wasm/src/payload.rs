//! Serializable shapes handed back to JS.

use rhythm_core::config::{ModelExtras, SimulationReport};
use rhythm_core::postprocess::{DimensionSummary, NormalizedTrajectory};
use rhythm_core::sweep::{BifurcationResult, SweepPoint};
use rhythm_core::RhythmError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct NormalizedPayload {
    pub(crate) times: Vec<f64>,
    pub(crate) values: Vec<Vec<f64>>,
    pub(crate) means: Vec<f64>,
}

impl From<NormalizedTrajectory> for NormalizedPayload {
    fn from(normalized: NormalizedTrajectory) -> Self {
        Self {
            values: normalized.rows(),
            times: normalized.times,
            means: normalized.means,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SimulationPayload {
    pub(crate) model: &'static str,
    pub(crate) times: Vec<f64>,
    /// One row per grid point.
    pub(crate) states: Vec<Vec<f64>>,
    pub(crate) normalized: Option<NormalizedPayload>,
    pub(crate) dimensions: Vec<DimensionSummary>,
    /// Set when the retained window could not be normalized.
    pub(crate) analysis_error: Option<RhythmError>,
    pub(crate) spectral_periods: Vec<Option<f64>>,
    pub(crate) extras: ModelExtras,
}

impl From<SimulationReport> for SimulationPayload {
    fn from(report: SimulationReport) -> Self {
        let states = report.trajectory.rows();
        let (normalized, dimensions, analysis_error) = match report.analysis {
            Ok(summary) => (Some(summary.normalized.into()), summary.dimensions, None),
            Err(err) => (None, Vec::new(), Some(err)),
        };
        Self {
            model: report.model,
            times: report.trajectory.times,
            states,
            normalized,
            dimensions,
            analysis_error,
            spectral_periods: report.spectral_periods,
            extras: report.extras,
        }
    }
}

/// Bifurcation result plus per-dimension arrays ready for plotting.
#[derive(Debug, Serialize)]
pub(crate) struct SweepPayload {
    pub(crate) parameter: String,
    pub(crate) values: Vec<f64>,
    pub(crate) points: Vec<SweepPoint>,
    pub(crate) maxima: Vec<Vec<Option<f64>>>,
    pub(crate) minima: Vec<Vec<Option<f64>>>,
    pub(crate) periods: Vec<Vec<Option<f64>>>,
}

impl SweepPayload {
    pub(crate) fn new(result: BifurcationResult, dimension: usize) -> Self {
        let maxima = (0..dimension).map(|d| result.maxima(d)).collect();
        let minima = (0..dimension).map(|d| result.minima(d)).collect();
        let periods = (0..dimension).map(|d| result.periods(d)).collect();
        Self {
            parameter: result.parameter,
            values: result.values,
            points: result.points,
            maxima,
            minima,
            periods,
        }
    }
}
