//! Stroboscopic (Poincaré) sections of periodically forced systems.

use crate::error::{Result, RhythmError};
use crate::trajectory::Trajectory;
use serde::{Deserialize, Serialize};

/// State at the moment the forcing phase passed through an integer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionPoint {
    pub time: f64,
    pub state: Vec<f64>,
}

/// Samples the trajectory once per forcing period.
///
/// `phase_dim` is the column holding the phase accumulator (one unit per
/// period). Every crossing of an integer value between two samples yields a
/// point, linearly interpolated between them. The phase may run either way.
pub fn stroboscopic_section(trajectory: &Trajectory, phase_dim: usize) -> Result<Vec<SectionPoint>> {
    if phase_dim >= trajectory.dimension() {
        return Err(RhythmError::invalid(format!(
            "phase dimension {} out of range for a {}-dimensional trajectory",
            phase_dim,
            trajectory.dimension()
        )));
    }

    let mut section = Vec::new();
    if trajectory.is_empty() {
        return Ok(section);
    }

    let first = trajectory.states[(0, phase_dim)];
    if first.is_finite() && first.fract() == 0.0 {
        section.push(SectionPoint {
            time: trajectory.times[0],
            state: trajectory.row(0),
        });
    }

    for i in 1..trajectory.len() {
        let p0 = trajectory.states[(i - 1, phase_dim)];
        let p1 = trajectory.states[(i, phase_dim)];
        if !p0.is_finite() || !p1.is_finite() || p0 == p1 {
            continue;
        }

        // Integers in (p0, p1] going up, [p1, p0) going down.
        let crossings: Vec<f64> = if p1 > p0 {
            let lo = p0.floor() as i64 + 1;
            let hi = p1.floor() as i64;
            (lo..=hi).map(|m| m as f64).collect()
        } else {
            let lo = p1.ceil() as i64;
            let hi = p0.ceil() as i64 - 1;
            (lo..=hi).rev().map(|m| m as f64).collect()
        };

        let (t0, t1) = (trajectory.times[i - 1], trajectory.times[i]);
        for level in crossings {
            let s = (level - p0) / (p1 - p0);
            let state: Vec<f64> = (0..trajectory.dimension())
                .map(|j| {
                    if j == phase_dim {
                        level
                    } else {
                        let a = trajectory.states[(i - 1, j)];
                        let b = trajectory.states[(i, j)];
                        a + s * (b - a)
                    }
                })
                .collect();
            section.push(SectionPoint {
                time: t0 + s * (t1 - t0),
                state,
            });
        }
    }

    Ok(section)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear(times: &[f64], phase: impl Fn(f64) -> f64) -> Trajectory {
        let data: Vec<f64> = times.iter().flat_map(|&t| [t, phase(t)]).collect();
        Trajectory::from_rows(times.to_vec(), 2, &data).expect("trajectory")
    }

    #[test]
    fn increasing_phase_is_sampled_at_integers() {
        let times: Vec<f64> = (0..=30).map(|i| i as f64 * 0.3).collect();
        let traj = linear(&times, |t| 0.1 + t / 2.0);
        let section = stroboscopic_section(&traj, 1).expect("section");
        // Phase runs from 0.1 to 4.6.
        assert_eq!(section.len(), 4);
        for (k, point) in section.iter().enumerate() {
            let level = (k + 1) as f64;
            let expected_time = 2.0 * (level - 0.1);
            assert!((point.time - expected_time).abs() < 1e-12);
            assert!((point.state[0] - expected_time).abs() < 1e-12);
            assert_eq!(point.state[1], level);
        }
    }

    #[test]
    fn decreasing_phase_and_exact_start() {
        let times: Vec<f64> = (0..=10).map(|i| i as f64 * 0.5).collect();
        let traj = linear(&times, |t| -2.0 - t * 0.45);
        let section = stroboscopic_section(&traj, 1).expect("section");
        let levels: Vec<f64> = section.iter().map(|p| p.state[1]).collect();
        // -2.0 at t = 0, down to -4.25 at t = 5.
        assert_eq!(levels, vec![-2.0, -3.0, -4.0]);
        assert_eq!(section[0].time, 0.0);
    }

    #[test]
    fn out_of_range_phase_dimension_is_rejected() {
        let traj = linear(&[0.0, 1.0], |t| t);
        assert!(matches!(
            stroboscopic_section(&traj, 2),
            Err(RhythmError::InvalidConfiguration(_))
        ));
    }
}
