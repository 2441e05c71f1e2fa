use crate::error::{Result, RhythmError};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Uniform output grid `start, start + step, ...` with `stop` excluded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    pub start: f64,
    pub stop: f64,
    pub step: f64,
}

impl TimeGrid {
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self> {
        let grid = Self { start, stop, step };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.start.is_finite() || !self.stop.is_finite() || !self.step.is_finite() {
            return Err(RhythmError::invalid("time grid bounds must be finite"));
        }
        if self.step <= 0.0 {
            return Err(RhythmError::invalid(format!(
                "time grid step must be positive, got {}",
                self.step
            )));
        }
        if self.start >= self.stop {
            return Err(RhythmError::invalid(format!(
                "time grid must be increasing, got start {} >= stop {}",
                self.start, self.stop
            )));
        }
        if self.len() < 2 {
            return Err(RhythmError::invalid(
                "time grid must contain at least two points",
            ));
        }
        Ok(())
    }

    /// Number of points, `ceil((stop - start) / step)`.
    pub fn len(&self) -> usize {
        arange_len(self.start, self.stop, self.step)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn time(&self, index: usize) -> f64 {
        self.start + index as f64 * self.step
    }

    pub fn points(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.time(i)).collect()
    }

    /// Number of samples covering `duration`, e.g. the last 500 h of a run.
    pub fn samples_for(&self, duration: f64) -> usize {
        if duration <= 0.0 || !duration.is_finite() {
            return 0;
        }
        ((duration / self.step) as usize).min(self.len())
    }
}

/// Length of the half-open sequence `start + i * step < stop`.
pub(crate) fn arange_len(start: f64, stop: f64, step: f64) -> usize {
    if !(step > 0.0) || !(stop > start) {
        return 0;
    }
    ((stop - start) / step).ceil() as usize
}

/// Integrated states, one row per grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub times: Vec<f64>,
    pub states: DMatrix<f64>,
}

impl Trajectory {
    /// Builds a trajectory from row-major state data.
    pub fn from_rows(times: Vec<f64>, dimension: usize, data: &[f64]) -> Result<Self> {
        if data.len() != times.len() * dimension {
            return Err(RhythmError::invalid(format!(
                "trajectory data has {} values, expected {} rows x {} columns",
                data.len(),
                times.len(),
                dimension
            )));
        }
        let states = DMatrix::from_row_slice(times.len(), dimension, data);
        Ok(Self { times, states })
    }

    pub fn len(&self) -> usize {
        self.states.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.states.nrows() == 0
    }

    pub fn dimension(&self) -> usize {
        self.states.ncols()
    }

    pub fn row(&self, index: usize) -> Vec<f64> {
        self.states.row(index).iter().copied().collect()
    }

    pub fn column(&self, index: usize) -> Vec<f64> {
        self.states.column(index).iter().copied().collect()
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.len()).map(|i| self.row(i)).collect()
    }

    /// Checks a retained window against the available samples.
    pub fn check_window(&self, retained_window: usize) -> Result<()> {
        if retained_window == 0 {
            return Err(RhythmError::invalid("retained window must be positive"));
        }
        if retained_window > self.len() {
            return Err(RhythmError::invalid(format!(
                "retained window {} exceeds the {} available samples",
                retained_window,
                self.len()
            )));
        }
        Ok(())
    }

    /// The last `retained_window` rows.
    pub fn tail(&self, retained_window: usize) -> Result<Trajectory> {
        self.check_window(retained_window)?;
        let start = self.len() - retained_window;
        Ok(Trajectory {
            times: self.times[start..].to_vec(),
            states: self.states.rows(start, retained_window).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_length_follows_half_open_interval() {
        let grid = TimeGrid::new(0.0, 1.0, 0.25).expect("grid");
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.points(), vec![0.0, 0.25, 0.5, 0.75]);

        let grid = TimeGrid::new(0.0, 1.0, 0.3).expect("grid");
        assert_eq!(grid.len(), 4);
        assert!((grid.time(3) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn grid_rejects_degenerate_inputs() {
        assert!(TimeGrid::new(0.0, 1.0, 0.0).is_err());
        assert!(TimeGrid::new(0.0, 1.0, -0.1).is_err());
        assert!(TimeGrid::new(1.0, 1.0, 0.1).is_err());
        assert!(TimeGrid::new(2.0, 1.0, 0.1).is_err());
        assert!(TimeGrid::new(0.0, 1.0, 1.0).is_err());
        assert!(TimeGrid::new(0.0, f64::INFINITY, 0.1).is_err());
    }

    #[test]
    fn samples_for_converts_duration() {
        let grid = TimeGrid::new(0.0, 5000.0, 0.01).expect("grid");
        assert_eq!(grid.samples_for(500.0), 50_000);
        assert_eq!(grid.samples_for(1e9), grid.len());
        assert_eq!(grid.samples_for(-1.0), 0);
    }

    #[test]
    fn tail_keeps_last_rows() {
        let traj = Trajectory::from_rows(
            vec![0.0, 1.0, 2.0, 3.0],
            2,
            &[1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0],
        )
        .expect("trajectory");
        let tail = traj.tail(2).expect("tail");
        assert_eq!(tail.times, vec![2.0, 3.0]);
        assert_eq!(tail.row(0), vec![3.0, 30.0]);
        assert_eq!(tail.column(1), vec![30.0, 40.0]);
        assert!(traj.tail(0).is_err());
        assert!(traj.tail(5).is_err());
    }

    #[test]
    fn from_rows_rejects_mismatched_data() {
        let err = Trajectory::from_rows(vec![0.0, 1.0], 2, &[1.0, 2.0, 3.0]).expect_err("size");
        assert!(matches!(err, RhythmError::InvalidConfiguration(_)));
    }
}
