use crate::error::{Result, RhythmError};
use crate::models::{PhaseAmplitude, PopulationParams};
use crate::solvers::{AdaptiveTsit5, FixedStep, Propagator, SolverError, RK4};
use crate::traits::{BoundModel, DynamicalSystem, Model, ParameterSet};
use crate::trajectory::{TimeGrid, Trajectory};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Solver used to march between grid points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum IntegratorSettings {
    /// Error-controlled Tsitouras 5(4); `max_steps` bounds each grid interval.
    Tsit5 {
        rtol: f64,
        atol: f64,
        min_step: f64,
        max_steps: usize,
    },
    /// Classic RK4 with a fixed internal step `dt`.
    Rk4 { dt: f64, max_steps: usize },
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        IntegratorSettings::Tsit5 {
            rtol: 1e-8,
            atol: 1e-10,
            min_step: 1e-12,
            max_steps: 100_000,
        }
    }
}

impl IntegratorSettings {
    pub fn validate(&self) -> Result<()> {
        match *self {
            IntegratorSettings::Tsit5 {
                rtol,
                atol,
                min_step,
                max_steps,
            } => {
                if !(rtol > 0.0 && rtol.is_finite()) || !(atol > 0.0 && atol.is_finite()) {
                    return Err(RhythmError::invalid("rtol and atol must be positive"));
                }
                if !(min_step > 0.0) {
                    return Err(RhythmError::invalid("min_step must be positive"));
                }
                if max_steps == 0 {
                    return Err(RhythmError::invalid("max_steps must be greater than zero"));
                }
            }
            IntegratorSettings::Rk4 { dt, max_steps } => {
                if !(dt > 0.0 && dt.is_finite()) {
                    return Err(RhythmError::invalid(format!(
                        "RK4 step dt must be positive, got {dt}"
                    )));
                }
                if max_steps == 0 {
                    return Err(RhythmError::invalid("max_steps must be greater than zero"));
                }
            }
        }
        Ok(())
    }

    fn build(self, dim: usize) -> InternalStepper {
        match self {
            IntegratorSettings::Tsit5 {
                rtol,
                atol,
                min_step,
                max_steps,
            } => InternalStepper::Tsit5(AdaptiveTsit5::new(dim, rtol, atol, min_step, max_steps)),
            IntegratorSettings::Rk4 { dt, max_steps } => {
                InternalStepper::Rk4(FixedStep::new(RK4::new(dim), dt, max_steps))
            }
        }
    }
}

enum InternalStepper {
    Tsit5(AdaptiveTsit5<f64>),
    Rk4(FixedStep<RK4<f64>>),
}

impl InternalStepper {
    fn advance(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t: &mut f64,
        state: &mut [f64],
        t_end: f64,
    ) -> std::result::Result<(), SolverError> {
        match self {
            InternalStepper::Tsit5(s) => s.advance(system, t, state, t_end),
            InternalStepper::Rk4(s) => s.advance(system, t, state, t_end),
        }
    }
}

/// Samples a model's solution on a time grid.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Integrator {
    settings: IntegratorSettings,
}

impl Integrator {
    pub fn new(settings: IntegratorSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> IntegratorSettings {
        self.settings
    }

    /// Integrates `model` from `initial_state` at `grid.start`.
    ///
    /// Row `i` of the result is the state at `grid.time(i)`; row 0 is
    /// `initial_state` itself. A solver failure or a non-finite state aborts
    /// the run with `IntegrationFailure` at the offending time.
    pub fn integrate<M: Model>(
        &self,
        model: &M,
        initial_state: &[f64],
        grid: &TimeGrid,
        params: &M::Params,
    ) -> Result<Trajectory> {
        grid.validate()?;
        params.validate()?;
        self.settings.validate()?;

        let dim = model.dimension(params);
        if initial_state.len() != dim {
            return Err(RhythmError::invalid(format!(
                "initial state dimension mismatch for {}: expected {}, got {}",
                model.name(),
                dim,
                initial_state.len()
            )));
        }
        if initial_state.iter().any(|v| !v.is_finite()) {
            return Err(RhythmError::invalid("initial state must be finite"));
        }

        let system = BoundModel::new(model, params);
        let mut stepper = self.settings.build(dim);
        let times = grid.points();

        let mut data = Vec::with_capacity(times.len() * dim);
        data.extend_from_slice(initial_state);
        let mut state = initial_state.to_vec();
        let mut t = times[0];

        for &target in &times[1..] {
            stepper
                .advance(&system, &mut t, &mut state, target)
                .map_err(|err| {
                    debug!(model = model.name(), error = %err, "solver gave up");
                    RhythmError::IntegrationFailure {
                        time: err.time(),
                        reason: err.to_string(),
                    }
                })?;
            if let Some(component) = state.iter().position(|v| !v.is_finite()) {
                return Err(RhythmError::IntegrationFailure {
                    time: target,
                    reason: format!("state component {component} is not finite"),
                });
            }
            data.extend_from_slice(&state);
        }

        Trajectory::from_rows(times, dim, &data)
    }
}

/// [`Integrator::integrate`] with the default adaptive solver.
pub fn integrate<M: Model>(
    model: &M,
    initial_state: &[f64],
    grid: &TimeGrid,
    params: &M::Params,
) -> Result<Trajectory> {
    Integrator::default().integrate(model, initial_state, grid, params)
}

/// Integrates each member of an uncoupled population on its own.
///
/// `initial_states` uses the block layout `[x_0..x_{N-1}, y_0..y_{N-1}]`,
/// the same as the coupled model, so the two can be compared directly.
pub fn integrate_population(
    integrator: &Integrator,
    params: &PopulationParams,
    initial_states: &[f64],
    grid: &TimeGrid,
) -> Result<Vec<Trajectory>> {
    params.validate()?;
    let n = params.oscillators();
    if initial_states.len() != 2 * n {
        return Err(RhythmError::invalid(format!(
            "population initial state must have {} values, got {}",
            2 * n,
            initial_states.len()
        )));
    }

    (0..n)
        .map(|i| {
            let member = params
                .member(i)
                .ok_or_else(|| RhythmError::invalid(format!("missing oscillator {i}")))?;
            integrator.integrate(
                &PhaseAmplitude,
                &[initial_states[i], initial_states[n + i]],
                grid,
                &member,
            )
        })
        .collect()
}
