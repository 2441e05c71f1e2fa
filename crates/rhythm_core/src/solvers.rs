//! Explicit Runge-Kutta kernels and the step-size controllers that drive them.
//!
//! The integrator only talks to the [`Propagator`] trait: "advance this system
//! from `t` to `t_end`". How the interval is subdivided is decided here.

use crate::traits::{DynamicalSystem, Scalar, Steppable};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("step size fell below {min_step:e} at t = {t}")]
    StepSizeUnderflow { t: f64, min_step: f64 },
    #[error("exceeded {max_steps} steps before reaching t = {target} (stopped at t = {t})")]
    StepBudgetExhausted { t: f64, target: f64, max_steps: usize },
}

impl SolverError {
    /// Time at which the solver gave up.
    pub fn time(&self) -> f64 {
        match self {
            SolverError::StepSizeUnderflow { t, .. } => *t,
            SolverError::StepBudgetExhausted { t, .. } => *t,
        }
    }
}

/// Advances a system across an interval, choosing its own sub-steps.
pub trait Propagator<T: Scalar> {
    fn advance(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: &mut T,
        state: &mut [T],
        t_end: T,
    ) -> Result<(), SolverError>;
}

fn to_f64<T: Scalar>(value: T) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}

/// Classic Runge-Kutta 4th Order Solver
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::from_f64(0.0).unwrap();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            tmp: vec![z; dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let half = T::from_f64(0.5).unwrap();
        let sixth = T::from_f64(1.0 / 6.0).unwrap();
        let two = T::from_f64(2.0).unwrap();

        let t0 = *t;

        // k1 = f(t, y)
        system.apply(t0, state, &mut self.k1);

        // k2 = f(t + dt/2, y + dt*k1/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k1[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k2);

        // k3 = f(t + dt/2, y + dt*k2/2)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k2[i] * half;
        }
        system.apply(t0 + dt * half, &self.tmp, &mut self.k3);

        // k4 = f(t + dt, y + dt*k3)
        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        system.apply(t0 + dt, &self.tmp, &mut self.k4);

        // y_next = y + dt/6 * (k1 + 2k2 + 2k3 + k4)
        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
    }
}

/// Tsitouras 5/4 Solver
pub struct Tsit5<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    k5: Vec<T>,
    k6: Vec<T>,
    k7: Vec<T>,
    tmp: Vec<T>,
    next: Vec<T>,
}

impl<T: Scalar> Tsit5<T> {
    pub fn new(dim: usize) -> Self {
        let z = T::from_f64(0.0).unwrap();
        Self {
            k1: vec![z; dim],
            k2: vec![z; dim],
            k3: vec![z; dim],
            k4: vec![z; dim],
            k5: vec![z; dim],
            k6: vec![z; dim],
            k7: vec![z; dim],
            tmp: vec![z; dim],
            next: vec![z; dim],
        }
    }

    /// Evaluates the six stages and writes the 5th order solution into `out`.
    fn stages(&mut self, system: &impl DynamicalSystem<T>, t0: T, state: &[T], dt: T, out: &mut [T]) {
        let c = |v: f64| T::from_f64(v).unwrap();

        let c2 = c(0.161);
        let c3 = c(0.327);
        let c4 = c(0.9);
        let c5 = c(0.9800255409045097);
        let c6 = c(1.0);

        let a21 = c(0.161);

        let a31 = c(-0.008480655492356989);
        let a32 = c(0.335480655492357);

        let a41 = c(2.897153057105493);
        let a42 = c(-6.359448489975075);
        let a43 = c(4.3622954328695815);

        let a51 = c(5.325864828439257);
        let a52 = c(-11.748883564062828);
        let a53 = c(7.4955393428898365);
        let a54 = c(-0.09249506636175525);

        let a61 = c(5.86145544294642);
        let a62 = c(-12.92096931784711);
        let a63 = c(8.159367898576159);
        let a64 = c(-0.071584973281401);
        let a65 = c(-0.028269050394068383);

        // b coefficients (5th order)
        let b1 = c(0.09646076681806523);
        let b2 = c(0.01);
        let b3 = c(0.4798896504144996);
        let b4 = c(1.379008574103742);
        let b5 = c(-3.290069515436081);
        let b6 = c(2.324710524099774);

        let n = state.len();

        system.apply(t0, state, &mut self.k1);

        for i in 0..n {
            self.tmp[i] = state[i] + dt * (a21 * self.k1[i]);
        }
        system.apply(t0 + c2 * dt, &self.tmp, &mut self.k2);

        for i in 0..n {
            self.tmp[i] = state[i] + dt * (a31 * self.k1[i] + a32 * self.k2[i]);
        }
        system.apply(t0 + c3 * dt, &self.tmp, &mut self.k3);

        for i in 0..n {
            self.tmp[i] = state[i] + dt * (a41 * self.k1[i] + a42 * self.k2[i] + a43 * self.k3[i]);
        }
        system.apply(t0 + c4 * dt, &self.tmp, &mut self.k4);

        for i in 0..n {
            self.tmp[i] = state[i]
                + dt * (a51 * self.k1[i] + a52 * self.k2[i] + a53 * self.k3[i] + a54 * self.k4[i]);
        }
        system.apply(t0 + c5 * dt, &self.tmp, &mut self.k5);

        for i in 0..n {
            self.tmp[i] = state[i]
                + dt * (a61 * self.k1[i]
                    + a62 * self.k2[i]
                    + a63 * self.k3[i]
                    + a64 * self.k4[i]
                    + a65 * self.k5[i]);
        }
        system.apply(t0 + c6 * dt, &self.tmp, &mut self.k6);

        for i in 0..n {
            out[i] = state[i]
                + dt * (b1 * self.k1[i]
                    + b2 * self.k2[i]
                    + b3 * self.k3[i]
                    + b4 * self.k4[i]
                    + b5 * self.k5[i]
                    + b6 * self.k6[i]);
        }
    }

    /// Trial step: 5th order candidate in `out`, embedded error estimate in `error`.
    /// `state` is left untouched so a rejected step costs nothing to undo.
    pub fn attempt(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t0: T,
        state: &[T],
        dt: T,
        out: &mut [T],
        error: &mut [T],
    ) {
        let c = |v: f64| T::from_f64(v).unwrap();
        let e1 = c(-0.00178001105222577714);
        let e2 = c(-0.0008164344596567469);
        let e3 = c(0.007880878010261995);
        let e4 = c(-0.1447110071732629);
        let e5 = c(0.5823571654525552);
        let e6 = c(-0.45808210592918697);
        let e7 = c(0.015151515151515152);

        self.stages(system, t0, state, dt, out);
        system.apply(t0 + dt, out, &mut self.k7);

        for i in 0..state.len() {
            error[i] = dt
                * (e1 * self.k1[i]
                    + e2 * self.k2[i]
                    + e3 * self.k3[i]
                    + e4 * self.k4[i]
                    + e5 * self.k5[i]
                    + e6 * self.k6[i]
                    + e7 * self.k7[i]);
        }
    }
}

impl<T: Scalar> Steppable<T> for Tsit5<T> {
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let t0 = *t;
        let mut next = std::mem::take(&mut self.next);
        self.stages(system, t0, state, dt, &mut next);
        state.copy_from_slice(&next);
        self.next = next;
        *t = t0 + dt;
    }
}

/// Tsit5 with embedded error control.
///
/// The last accepted step size is carried over between calls to `advance`,
/// so marching across a fine output grid does not restart the controller.
pub struct AdaptiveTsit5<T: Scalar> {
    kernel: Tsit5<T>,
    candidate: Vec<T>,
    error: Vec<T>,
    rtol: T,
    atol: T,
    min_step: T,
    max_steps: usize,
    h: Option<T>,
}

impl<T: Scalar> AdaptiveTsit5<T> {
    pub fn new(dim: usize, rtol: T, atol: T, min_step: T, max_steps: usize) -> Self {
        let z = T::zero();
        Self {
            kernel: Tsit5::new(dim),
            candidate: vec![z; dim],
            error: vec![z; dim],
            rtol,
            atol,
            min_step,
            max_steps,
            h: None,
        }
    }

    /// Scaled RMS norm of the error estimate; values <= 1 are acceptable.
    fn error_norm(&self, state: &[T]) -> T {
        let mut sum = T::zero();
        for i in 0..state.len() {
            let scale = self.atol + self.rtol * state[i].abs().max(self.candidate[i].abs());
            let ratio = self.error[i] / scale;
            sum = sum + ratio * ratio;
        }
        let n = T::from_usize(state.len().max(1)).unwrap();
        (sum / n).sqrt()
    }
}

impl<T: Scalar> Propagator<T> for AdaptiveTsit5<T> {
    fn advance(
        &mut self,
        system: &impl DynamicalSystem<T>,
        t: &mut T,
        state: &mut [T],
        t_end: T,
    ) -> Result<(), SolverError> {
        let safety = T::from_f64(0.9).unwrap();
        let min_factor = T::from_f64(0.2).unwrap();
        let max_factor = T::from_f64(5.0).unwrap();
        let exponent = T::from_f64(-0.2).unwrap();

        let mut h = self.h.unwrap_or(t_end - *t);
        let mut steps = 0usize;

        while *t < t_end {
            if steps >= self.max_steps {
                return Err(SolverError::StepBudgetExhausted {
                    t: to_f64(*t),
                    target: to_f64(t_end),
                    max_steps: self.max_steps,
                });
            }
            steps += 1;

            let remaining = t_end - *t;
            let last = h >= remaining;
            let dt = if last { remaining } else { h };

            self.kernel
                .attempt(system, *t, state, dt, &mut self.candidate, &mut self.error);
            let norm = self.error_norm(state);

            if norm <= T::one() {
                state.copy_from_slice(&self.candidate);
                *t = if last { t_end } else { *t + dt };

                let factor = if norm == T::zero() {
                    max_factor
                } else {
                    (safety * norm.powf(exponent)).max(min_factor).min(max_factor)
                };
                let proposal = dt * factor;
                // A step clipped to the interval end says little about the
                // step size the dynamics actually allow.
                h = if last && dt < h { h.max(proposal) } else { proposal };
            } else {
                // NaN norms (overflowing stages) fall through to the minimum factor.
                let factor = (safety * norm.powf(exponent)).max(min_factor).min(T::one());
                h = dt * factor;
                if h < self.min_step {
                    return Err(SolverError::StepSizeUnderflow {
                        t: to_f64(*t),
                        min_step: to_f64(self.min_step),
                    });
                }
            }
        }

        self.h = Some(h);
        Ok(())
    }
}

/// Drives any fixed-step kernel with step `dt`, shortening the final step so
/// the interval end is hit exactly.
pub struct FixedStep<S> {
    kernel: S,
    dt: f64,
    max_steps: usize,
}

impl<S> FixedStep<S> {
    pub fn new(kernel: S, dt: f64, max_steps: usize) -> Self {
        Self {
            kernel,
            dt,
            max_steps,
        }
    }
}

impl<S: Steppable<f64>> Propagator<f64> for FixedStep<S> {
    fn advance(
        &mut self,
        system: &impl DynamicalSystem<f64>,
        t: &mut f64,
        state: &mut [f64],
        t_end: f64,
    ) -> Result<(), SolverError> {
        let mut steps = 0usize;
        while *t < t_end {
            if steps >= self.max_steps {
                return Err(SolverError::StepBudgetExhausted {
                    t: *t,
                    target: t_end,
                    max_steps: self.max_steps,
                });
            }
            steps += 1;

            let remaining = t_end - *t;
            let last = remaining <= self.dt * (1.0 + 1e-9);
            let h = if last { remaining } else { self.dt };
            self.kernel.step(system, t, state, h);
            if last {
                *t = t_end;
            }
        }
        Ok(())
    }
}
