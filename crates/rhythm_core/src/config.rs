//! JSON-facing configuration and the runtime model dispatch behind it.

use crate::error::{Result, RhythmError};
use crate::integrator::{Integrator, IntegratorSettings};
use crate::meanfield::population_mean;
use crate::models::{
    CoupledPopulation, Duffing, DuffingParams, Goodwin, GoodwinFeedback, GoodwinFeedbackParams,
    GoodwinParams, PhaseAmplitude, PhaseAmplitudeParams, PopulationParams,
};
use crate::poincare::{stroboscopic_section, SectionPoint};
use crate::postprocess::{analyze_window, WindowSummary};
use crate::spectrum::spectral_period;
use crate::sweep::{
    sweep, sweep_point, BifurcationResult, CancelToken, SweepOptions, SweepPoint, SweepRange,
};
use crate::traits::{Model, ParameterSet};
use crate::trajectory::{TimeGrid, Trajectory};
use serde::{Deserialize, Serialize};

/// Model selection together with its parameter bundle.
///
/// Serialized as `{"kind": "...", "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "params", rename_all = "snake_case")]
pub enum ModelSpec {
    Goodwin(GoodwinParams),
    GoodwinFeedback(GoodwinFeedbackParams),
    Heterogeneous(PhaseAmplitudeParams),
    Coupled(PopulationParams),
    Duffing(DuffingParams),
}

impl ModelSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelSpec::Goodwin(_) => Goodwin.name(),
            ModelSpec::GoodwinFeedback(_) => GoodwinFeedback.name(),
            ModelSpec::Heterogeneous(_) => PhaseAmplitude.name(),
            ModelSpec::Coupled(_) => CoupledPopulation.name(),
            ModelSpec::Duffing(_) => Duffing.name(),
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            ModelSpec::Goodwin(p) => Goodwin.dimension(p),
            ModelSpec::GoodwinFeedback(p) => GoodwinFeedback.dimension(p),
            ModelSpec::Heterogeneous(p) => PhaseAmplitude.dimension(p),
            ModelSpec::Coupled(p) => CoupledPopulation.dimension(p),
            ModelSpec::Duffing(p) => Duffing.dimension(p),
        }
    }

    /// Current value of a sweepable scalar.
    pub fn parameter(&self, name: &str) -> Option<f64> {
        match self {
            ModelSpec::Goodwin(p) => p.get(name),
            ModelSpec::GoodwinFeedback(p) => p.get(name),
            ModelSpec::Heterogeneous(p) => p.get(name),
            ModelSpec::Coupled(p) => p.get(name),
            ModelSpec::Duffing(p) => p.get(name),
        }
    }

    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            ModelSpec::Goodwin(p) => p.names(),
            ModelSpec::GoodwinFeedback(p) => p.names(),
            ModelSpec::Heterogeneous(p) => p.names(),
            ModelSpec::Coupled(p) => p.names(),
            ModelSpec::Duffing(p) => p.names(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ModelSpec::Goodwin(p) => p.validate(),
            ModelSpec::GoodwinFeedback(p) => p.validate(),
            ModelSpec::Heterogeneous(p) => p.validate(),
            ModelSpec::Coupled(p) => p.validate(),
            ModelSpec::Duffing(p) => p.validate(),
        }
    }
}

/// One integration run plus the window to analyze.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub model: ModelSpec,
    pub initial_state: Vec<f64>,
    pub time_grid: TimeGrid,
    /// Number of trailing samples kept after the transient.
    pub retained_window: usize,
    #[serde(default)]
    pub integrator: IntegratorSettings,
}

impl SimulationConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = parse_json(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.time_grid.validate()?;
        self.integrator.validate()?;
        self.model.validate()?;

        let dim = self.model.dimension();
        if self.initial_state.len() != dim {
            return Err(RhythmError::invalid(format!(
                "initial state dimension mismatch for {}: expected {}, got {}",
                self.model.kind(),
                dim,
                self.initial_state.len()
            )));
        }
        let samples = self.time_grid.len();
        if self.retained_window < 2 || self.retained_window > samples {
            return Err(RhythmError::invalid(format!(
                "retained window must be between 2 and {} samples, got {}",
                samples, self.retained_window
            )));
        }
        Ok(())
    }
}

fn default_parallel() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub simulation: SimulationConfig,
    pub sweep: SweepRange,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl SweepConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = parse_json(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;
        self.sweep.validate()?;
        let model = &self.simulation.model;
        if model.parameter(&self.sweep.parameter).is_none() {
            return Err(RhythmError::invalid(format!(
                "model {} has no parameter '{}' (available: {})",
                model.kind(),
                self.sweep.parameter,
                model.parameter_names().join(", ")
            )));
        }
        Ok(())
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(json: &str) -> Result<T> {
    serde_json::from_str(json)
        .map_err(|err| RhythmError::invalid(format!("malformed configuration: {err}")))
}

/// Model-specific views of the retained window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelExtras {
    Empty,
    /// Cross-oscillator means of `x` and `y` for the coupled population.
    Population { x_mean: Vec<f64>, y_mean: Vec<f64> },
    /// Once-per-forcing-period samples of the Duffing oscillator.
    Stroboscopic { points: Vec<SectionPoint> },
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub model: &'static str,
    pub trajectory: Trajectory,
    /// Window analysis; a zero-mean column leaves `DegenerateSignal` here
    /// without discarding the trajectory.
    pub analysis: std::result::Result<WindowSummary, RhythmError>,
    /// FFT period of each raw retained column.
    pub spectral_periods: Vec<Option<f64>>,
    pub extras: ModelExtras,
}

fn integrate_spec(config: &SimulationConfig, integrator: &Integrator) -> Result<Trajectory> {
    let state = &config.initial_state;
    let grid = &config.time_grid;
    match &config.model {
        ModelSpec::Goodwin(p) => integrator.integrate(&Goodwin, state, grid, p),
        ModelSpec::GoodwinFeedback(p) => integrator.integrate(&GoodwinFeedback, state, grid, p),
        ModelSpec::Heterogeneous(p) => integrator.integrate(&PhaseAmplitude, state, grid, p),
        ModelSpec::Coupled(p) => integrator.integrate(&CoupledPopulation, state, grid, p),
        ModelSpec::Duffing(p) => integrator.integrate(&Duffing, state, grid, p),
    }
}

/// Integrates the configured model and analyzes its retained window.
pub fn run_simulation(config: &SimulationConfig) -> Result<SimulationReport> {
    config.validate()?;
    let integrator = Integrator::new(config.integrator)?;
    let trajectory = integrate_spec(config, &integrator)?;

    let window = trajectory.tail(config.retained_window)?;
    let analysis = analyze_window(&trajectory, config.retained_window);
    let spectral_periods = (0..window.dimension())
        .map(|j| spectral_period(&window.column(j), config.time_grid.step))
        .collect();

    let extras = match &config.model {
        ModelSpec::Coupled(p) => ModelExtras::Population {
            x_mean: population_mean(&window, p.oscillators(), 0)?,
            y_mean: population_mean(&window, p.oscillators(), 1)?,
        },
        ModelSpec::Duffing(_) => ModelExtras::Stroboscopic {
            points: stroboscopic_section(&window, Duffing::PHASE_INDEX)?,
        },
        _ => ModelExtras::Empty,
    };

    Ok(SimulationReport {
        model: config.model.kind(),
        trajectory,
        analysis,
        spectral_periods,
        extras,
    })
}

/// Runs the configured one-parameter sweep.
pub fn run_sweep(config: &SweepConfig, cancel: Option<CancelToken>) -> Result<BifurcationResult> {
    config.validate()?;
    let sim = &config.simulation;
    let options = SweepOptions {
        integrator: Integrator::new(sim.integrator)?,
        parallel: config.parallel,
        cancel,
    };
    let state = &sim.initial_state;
    let grid = &sim.time_grid;
    let window = sim.retained_window;
    let range = &config.sweep;

    match &sim.model {
        ModelSpec::Goodwin(p) => sweep(&Goodwin, p, range, state, grid, window, &options),
        ModelSpec::GoodwinFeedback(p) => {
            sweep(&GoodwinFeedback, p, range, state, grid, window, &options)
        }
        ModelSpec::Heterogeneous(p) => sweep(&PhaseAmplitude, p, range, state, grid, window, &options),
        ModelSpec::Coupled(p) => sweep(&CoupledPopulation, p, range, state, grid, window, &options),
        ModelSpec::Duffing(p) => sweep(&Duffing, p, range, state, grid, window, &options),
    }
}

/// Runs one point of the configured sweep at `value`.
///
/// Lets callers drive a sweep incrementally instead of through [`run_sweep`].
/// The configuration is checked first, so a bad config is an error here
/// rather than a `Failed` point.
pub fn run_sweep_point(config: &SweepConfig, value: f64) -> Result<SweepPoint> {
    config.validate()?;
    let sim = &config.simulation;
    let integrator = Integrator::new(sim.integrator)?;
    let parameter = config.sweep.parameter.as_str();
    let state = &sim.initial_state;
    let grid = &sim.time_grid;
    let window = sim.retained_window;

    let point = match &sim.model {
        ModelSpec::Goodwin(p) => {
            sweep_point(&Goodwin, p, parameter, value, state, grid, window, &integrator)
        }
        ModelSpec::GoodwinFeedback(p) => {
            sweep_point(&GoodwinFeedback, p, parameter, value, state, grid, window, &integrator)
        }
        ModelSpec::Heterogeneous(p) => {
            sweep_point(&PhaseAmplitude, p, parameter, value, state, grid, window, &integrator)
        }
        ModelSpec::Coupled(p) => {
            sweep_point(&CoupledPopulation, p, parameter, value, state, grid, window, &integrator)
        }
        ModelSpec::Duffing(p) => {
            sweep_point(&Duffing, p, parameter, value, state, grid, window, &integrator)
        }
    };
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn goodwin_config_parses_with_defaults() {
        let config = SimulationConfig::from_json(
            r#"{
                "model": {"kind": "goodwin", "params": {"n": 9}},
                "initial_state": [0.1, 0.2, 2.5],
                "time_grid": {"start": 0.0, "stop": 300.0, "step": 0.5},
                "retained_window": 200
            }"#,
        )
        .expect("config");
        match &config.model {
            ModelSpec::Goodwin(p) => {
                assert_eq!(p.n, 9.0);
                assert_eq!(p.v1, 0.7);
                assert_eq!(p.k6, 1.0);
            }
            other => panic!("unexpected model {other:?}"),
        }
        assert_eq!(config.integrator, IntegratorSettings::default());

        let report = run_simulation(&config).expect("simulation");
        assert_eq!(report.model, "goodwin");
        assert_eq!(report.trajectory.len(), 600);
        assert_eq!(report.trajectory.row(0), vec![0.1, 0.2, 2.5]);
        let summary = report.analysis.expect("analysis");
        assert_eq!(summary.dimensions.len(), 3);
        assert_eq!(summary.normalized.len(), 200);
        assert_eq!(report.spectral_periods.len(), 3);
        assert_eq!(report.extras, ModelExtras::Empty);
    }

    #[test]
    fn malformed_documents_are_configuration_errors() {
        assert_err_contains(SimulationConfig::from_json("{not json"), "malformed configuration");
        assert_err_contains(
            SimulationConfig::from_json(
                r#"{
                    "model": {"kind": "lorenz", "params": {}},
                    "initial_state": [1.0],
                    "time_grid": {"start": 0.0, "stop": 1.0, "step": 0.1},
                    "retained_window": 5
                }"#,
            ),
            "malformed configuration",
        );
        assert_err_contains(
            SimulationConfig::from_json(
                r#"{
                    "model": {"kind": "duffing", "params": {}},
                    "initial_state": [1.0, 0.0],
                    "time_grid": {"start": 0.0, "stop": 1.0, "step": 0.1},
                    "retained_window": 5
                }"#,
            ),
            "dimension mismatch",
        );
        assert_err_contains(
            SimulationConfig::from_json(
                r#"{
                    "model": {"kind": "heterogeneous", "params": {"T": -3}},
                    "initial_state": [1.0, 0.0],
                    "time_grid": {"start": 0.0, "stop": 1.0, "step": 0.1},
                    "retained_window": 5
                }"#,
            ),
            "period must be positive",
        );
        assert_err_contains(
            SimulationConfig::from_json(
                r#"{
                    "model": {"kind": "heterogeneous", "params": {}},
                    "initial_state": [1.0, 0.0],
                    "time_grid": {"start": 1.0, "stop": 1.0, "step": 0.1},
                    "retained_window": 5
                }"#,
            ),
            "time grid",
        );
    }

    #[test]
    fn coupled_report_carries_population_means() {
        let config = SimulationConfig {
            model: ModelSpec::Coupled(PopulationParams {
                amplitude: 1.0,
                relaxation: 0.03,
                coupling: 0.1,
                periods: vec![23.0, 24.0, 25.5],
            }),
            initial_state: vec![1.0, 0.5, -0.3, 0.0, 0.8, 0.9],
            time_grid: TimeGrid::new(0.0, 120.0, 0.5).expect("grid"),
            retained_window: 100,
            integrator: IntegratorSettings::default(),
        };
        let report = run_simulation(&config).expect("simulation");
        let window = report.trajectory.tail(100).expect("tail");
        match &report.extras {
            ModelExtras::Population { x_mean, y_mean } => {
                assert_eq!(x_mean.len(), 100);
                assert_eq!(y_mean.len(), 100);
                let row = window.row(10);
                let expected = (row[0] + row[1] + row[2]) / 3.0;
                assert!((x_mean[10] - expected).abs() < 1e-14);
                let expected = (row[3] + row[4] + row[5]) / 3.0;
                assert!((y_mean[10] - expected).abs() < 1e-14);
            }
            other => panic!("unexpected extras {other:?}"),
        }
    }

    #[test]
    fn duffing_report_has_stroboscopic_section() {
        let config = SimulationConfig {
            model: ModelSpec::Duffing(DuffingParams::default()),
            initial_state: vec![-2.0, -2.0, -2.0],
            time_grid: TimeGrid::new(0.0, 200.0, 0.1).expect("grid"),
            retained_window: 1000,
            integrator: IntegratorSettings::default(),
        };
        let report = run_simulation(&config).expect("simulation");
        let points = match report.extras {
            ModelExtras::Stroboscopic { points } => points,
            other => panic!("unexpected extras {other:?}"),
        };
        // 100 time units at 2 pi / 0.36 per forcing period.
        assert!(points.len() >= 5 && points.len() <= 6, "got {}", points.len());
        for point in &points {
            assert_eq!(point.state[Duffing::PHASE_INDEX].fract(), 0.0);
            assert!(point.time >= 100.0 - 1e-9);
        }
    }

    #[test]
    fn degenerate_window_is_reported_not_fatal() {
        let config = SimulationConfig {
            model: ModelSpec::Duffing(DuffingParams {
                alpha: 0.0,
                ..DuffingParams::default()
            }),
            initial_state: vec![0.0, 0.0, 0.0],
            time_grid: TimeGrid::new(0.0, 20.0, 0.1).expect("grid"),
            retained_window: 50,
            integrator: IntegratorSettings::default(),
        };
        let report = run_simulation(&config).expect("simulation");
        assert_eq!(
            report.analysis.expect_err("degenerate"),
            RhythmError::DegenerateSignal {
                dimensions: vec![0, 1]
            }
        );
        assert_eq!(report.spectral_periods[0], None);
    }

    #[test]
    fn sweep_config_round_trip_through_dispatch() {
        let config = SweepConfig::from_json(
            r#"{
                "simulation": {
                    "model": {"kind": "heterogeneous", "params": {"T": 12}},
                    "initial_state": [1.0, 0.0],
                    "time_grid": {"start": 0.0, "stop": 60.0, "step": 0.25},
                    "retained_window": 120,
                    "integrator": {"method": "rk4", "dt": 0.05, "max_steps": 100}
                },
                "sweep": {"parameter": "A", "start": 0.5, "stop": 1.5, "step": 0.5}
            }"#,
        )
        .expect("config");
        assert!(config.parallel);

        let result = run_sweep(&config, None).expect("sweep");
        assert_eq!(result.parameter, "A");
        assert_eq!(result.values, vec![0.5, 1.0]);
        assert!(result.points.iter().all(SweepPoint::is_completed));
        for period in result.periods(0) {
            let period = period.expect("rotating oscillator has a period");
            assert!((period - 12.0).abs() < 0.05);
        }

        let single = run_sweep_point(&config, result.values[1]).expect("point");
        assert_eq!(single, result.points[1]);

        let mut bad = config.clone();
        bad.sweep.parameter = "K".into();
        assert_err_contains(run_sweep(&bad, None), "no parameter 'K'");
        assert_err_contains(bad.validate(), "available: A, T, lambda");
        assert_err_contains(run_sweep_point(&bad, 0.5), "no parameter 'K'");

        let mut oversized = config.clone();
        oversized.simulation.retained_window = oversized.simulation.time_grid.len() + 1;
        assert_err_contains(run_sweep_point(&oversized, 0.5), "retained window");
    }
}
