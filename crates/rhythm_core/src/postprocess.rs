//! Transient trimming, mean normalization and maxima-based period estimates.

use crate::error::{Result, RhythmError};
use crate::trajectory::Trajectory;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Retained window divided column-wise by its own means.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTrajectory {
    pub times: Vec<f64>,
    pub values: DMatrix<f64>,
    /// Column means of the raw window, one per state dimension.
    pub means: Vec<f64>,
}

impl NormalizedTrajectory {
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }

    pub fn dimension(&self) -> usize {
        self.values.ncols()
    }

    pub fn column(&self, index: usize) -> Vec<f64> {
        self.values.column(index).iter().copied().collect()
    }

    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.values
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }

    /// Multiplies the means back in, recovering the raw retained window.
    pub fn denormalize(&self) -> DMatrix<f64> {
        let mut raw = self.values.clone();
        for (j, mean) in self.means.iter().enumerate() {
            for value in raw.column_mut(j).iter_mut() {
                *value *= mean;
            }
        }
        raw
    }
}

/// Keeps the last `retained_window` rows and divides each column by its mean.
///
/// Columns whose mean is exactly zero (or not finite) cannot be normalized;
/// all of them are reported together in `DegenerateSignal`.
pub fn normalize(trajectory: &Trajectory, retained_window: usize) -> Result<NormalizedTrajectory> {
    let window = trajectory.tail(retained_window)?;
    let count = retained_window as f64;
    let means: Vec<f64> = window
        .states
        .column_iter()
        .map(|column| column.iter().sum::<f64>() / count)
        .collect();

    let degenerate: Vec<usize> = means
        .iter()
        .enumerate()
        .filter(|(_, mean)| **mean == 0.0 || !mean.is_finite())
        .map(|(index, _)| index)
        .collect();
    if !degenerate.is_empty() {
        return Err(RhythmError::DegenerateSignal {
            dimensions: degenerate,
        });
    }

    let mut values = window.states;
    for (j, mean) in means.iter().enumerate() {
        for value in values.column_mut(j).iter_mut() {
            *value /= mean;
        }
    }

    Ok(NormalizedTrajectory {
        times: window.times,
        values,
        means,
    })
}

/// Indices of local maxima.
///
/// A sample is a peak when it is strictly greater than both neighbours. A flat
/// top (equal samples bordered by smaller ones) counts once, at the middle of
/// the run. The first and last samples are never peaks.
pub fn find_maxima(series: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    let n = series.len();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    while i < n - 1 {
        if series[i - 1] < series[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && series[ahead] == series[i] {
                ahead += 1;
            }
            if series[ahead] < series[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Time of the vertex of the parabola through a peak and its two neighbours.
fn refined_peak_time(series: &[f64], times: &[f64], index: usize) -> f64 {
    let (a, b, c) = (series[index - 1], series[index], series[index + 1]);
    let curvature = a - 2.0 * b + c;
    if curvature >= 0.0 || !curvature.is_finite() {
        return times[index];
    }
    let offset = (0.5 * (a - c) / curvature).clamp(-0.5, 0.5);
    let spacing = if offset >= 0.0 {
        times[index + 1] - times[index]
    } else {
        times[index] - times[index - 1]
    };
    times[index] + offset * spacing
}

/// Mean spacing between consecutive maxima, `None` with fewer than two maxima.
///
/// Peak times are refined by parabolic interpolation so the estimate is not
/// quantized to the sampling step.
pub fn extract_period(series: &[f64], times: &[f64]) -> Option<f64> {
    debug_assert_eq!(series.len(), times.len());
    let peaks = find_maxima(series);
    if peaks.len() < 2 {
        return None;
    }
    let first = refined_peak_time(series, times, peaks[0]);
    let last = refined_peak_time(series, times, peaks[peaks.len() - 1]);
    Some((last - first) / (peaks.len() - 1) as f64)
}

/// Extremes and period of one normalized state dimension.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionSummary {
    pub max: f64,
    pub min: f64,
    /// `None` when the window holds fewer than two maxima.
    pub period: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSummary {
    pub normalized: NormalizedTrajectory,
    pub dimensions: Vec<DimensionSummary>,
}

pub fn summarize(normalized: &NormalizedTrajectory) -> Vec<DimensionSummary> {
    (0..normalized.dimension())
        .map(|j| {
            let series = normalized.column(j);
            let max = series.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let min = series.iter().copied().fold(f64::INFINITY, f64::min);
            DimensionSummary {
                max,
                min,
                period: extract_period(&series, &normalized.times),
            }
        })
        .collect()
}

/// Trim, normalize and summarize in one go.
pub fn analyze_window(trajectory: &Trajectory, retained_window: usize) -> Result<WindowSummary> {
    let normalized = normalize(trajectory, retained_window)?;
    let dimensions = summarize(&normalized);
    Ok(WindowSummary {
        normalized,
        dimensions,
    })
}
