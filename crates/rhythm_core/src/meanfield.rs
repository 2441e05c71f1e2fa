//! Mean-field coupling for oscillator populations.
//!
//! Population states are block-concatenated: for `N` oscillators the state is
//! `[x_0, ..., x_{N-1}, y_0, ..., y_{N-1}]`.

use crate::error::{Result, RhythmError};
use crate::trajectory::Trajectory;

/// Arithmetic mean of one value per oscillator, `M = (1/N) * sum(x_i)`.
pub fn meanfield(count: usize, values: &[f64]) -> f64 {
    debug_assert_eq!(count, values.len(), "meanfield count must match values");
    values.iter().sum::<f64>() / count as f64
}

/// Slice of the x-block (`component == 0`) or y-block (`component == 1`).
pub fn component_block(state: &[f64], oscillators: usize, component: usize) -> &[f64] {
    &state[component * oscillators..(component + 1) * oscillators]
}

/// Cross-oscillator mean of one component at every time point.
pub fn population_mean(
    trajectory: &Trajectory,
    oscillators: usize,
    component: usize,
) -> Result<Vec<f64>> {
    if oscillators == 0 {
        return Err(RhythmError::invalid("population must contain at least one oscillator"));
    }
    if component > 1 {
        return Err(RhythmError::invalid(format!(
            "population component must be 0 (x) or 1 (y), got {component}"
        )));
    }
    if trajectory.dimension() != 2 * oscillators {
        return Err(RhythmError::invalid(format!(
            "trajectory has dimension {}, expected {} for {} oscillators",
            trajectory.dimension(),
            2 * oscillators,
            oscillators
        )));
    }

    let offset = component * oscillators;
    let columns = trajectory.states.columns(offset, oscillators);
    Ok(columns
        .row_iter()
        .map(|row| row.iter().sum::<f64>() / oscillators as f64)
        .collect())
}

/// Mean over independently integrated oscillators, one trajectory each.
pub fn ensemble_mean(trajectories: &[Trajectory], column: usize) -> Result<Vec<f64>> {
    let first = trajectories
        .first()
        .ok_or_else(|| RhythmError::invalid("ensemble must contain at least one trajectory"))?;
    let len = first.len();
    if trajectories
        .iter()
        .any(|traj| traj.len() != len || column >= traj.dimension())
    {
        return Err(RhythmError::invalid(
            "ensemble trajectories must share length and contain the requested column",
        ));
    }

    let mut values = vec![0.0; trajectories.len()];
    Ok((0..len)
        .map(|row| {
            for (slot, traj) in values.iter_mut().zip(trajectories) {
                *slot = traj.states[(row, column)];
            }
            meanfield(values.len(), &values)
        })
        .collect())
}
