//! FFT-based period estimate, a cross-check for the maxima-based one.

use num_complex::Complex;
use rustfft::FftPlanner;

/// Period of the strongest non-DC Fourier component of a uniformly sampled series.
///
/// The mean is removed before transforming and the peak bin is refined with a
/// parabola through its neighbours. Returns `None` for series that are too
/// short or carry no variation.
pub fn spectral_period(series: &[f64], dt: f64) -> Option<f64> {
    let n = series.len();
    if n < 4 || !(dt > 0.0) || series.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mean = series.iter().sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex<f64>> = series
        .iter()
        .map(|&v| Complex::new(v - mean, 0.0))
        .collect();
    if buffer.iter().all(|c| c.re == 0.0) {
        return None;
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let half = n / 2;
    let magnitudes: Vec<f64> = buffer[..=half].iter().map(|c| c.norm()).collect();
    let (peak, _) = magnitudes
        .iter()
        .enumerate()
        .skip(1)
        .fold((0, f64::NEG_INFINITY), |best, (k, &m)| {
            if m > best.1 {
                (k, m)
            } else {
                best
            }
        });
    if peak == 0 || magnitudes[peak] <= 0.0 {
        return None;
    }

    let mut bin = peak as f64;
    if peak < half {
        let (a, b, c) = (magnitudes[peak - 1], magnitudes[peak], magnitudes[peak + 1]);
        let curvature = a - 2.0 * b + c;
        if curvature < 0.0 {
            bin += (0.5 * (a - c) / curvature).clamp(-0.5, 0.5);
        }
    }

    let frequency = bin / (n as f64 * dt);
    Some(1.0 / frequency)
}
